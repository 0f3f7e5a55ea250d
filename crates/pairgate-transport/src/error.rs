// ============================================
// File: crates/pairgate-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for listener setup, connection reads and
//! response writes.
//!
//! ## Error Categories
//! 1. **Setup Errors**: bind failures, address in use (fatal at startup)
//! 2. **Connection Errors**: peer closed the stream (ends one connection task)
//! 3. **Delivery Errors**: write stalled past its budget, write failed
//!
//! ## ⚠️ Important Note for Next Developer
//! - `ConnectionClosed` is the normal end of a connection, not a failure
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Setup Errors
    // ========================================

    /// Failed to bind to address.
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    /// Listen address could not be parsed.
    #[error("Invalid address: {addr}")]
    InvalidAddress {
        /// The invalid address string
        addr: String,
    },

    // ========================================
    // Connection Errors
    // ========================================

    /// Peer closed the connection (EOF or reset).
    #[error("Connection closed by peer")]
    ConnectionClosed,

    // ========================================
    // Delivery Errors
    // ========================================

    /// Write did not complete within its retry budget.
    #[error("Write timed out after {attempts} attempts of {timeout_ms}ms")]
    WriteTimeout {
        /// Number of writability waits that elapsed
        attempts: u32,
        /// Per-attempt wait in milliseconds
        timeout_ms: u64,
    },

    /// Write failed for a reason other than a timeout.
    #[error("Failed to send: {reason}")]
    SendFailed {
        /// Why send failed
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What operation was being performed
        context: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates a `SendFailed` error.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed {
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Maps a read/write error, folding peer-gone kinds into `ConnectionClosed`.
    pub fn from_stream_error(context: impl Into<String>, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            _ => Self::io(context, source),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the peer is gone.
    #[must_use]
    pub const fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_mapping() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(TransportError::from_stream_error("read", eof).is_connection_closed());

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(TransportError::from_stream_error("read", reset).is_connection_closed());

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            TransportError::from_stream_error("read", other),
            TransportError::Io { .. }
        ));
    }

    #[test]
    fn test_error_display() {
        let timeout = TransportError::WriteTimeout {
            attempts: 3,
            timeout_ms: 500,
        };
        assert!(timeout.to_string().contains("500ms"));
        assert!(!timeout.is_connection_closed());

        assert!(TransportError::send_failed("boom").to_string().contains("boom"));
    }
}
