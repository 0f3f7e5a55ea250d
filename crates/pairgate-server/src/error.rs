// ============================================
// File: crates/pairgate-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Creation Reason
//! Collects the errors the server layer adds on top of core and
//! transport: configuration, registry lookups, response delivery,
//! operator commands and startup.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only config and startup errors are fatal, and only in the binary.
//!   Everything else is logged and the current message dropped.
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use pairgate_common::error::CommonError;
use pairgate_common::{ConnectionId, DeviceId};
use pairgate_core::error::CoreError;
use pairgate_transport::error::TransportError;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server-level errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// File path.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// Configuration parsed but failed validation.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No device record with this id.
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// No scan has been recorded for this static public key.
    #[error("No scan for static key {key_prefix}")]
    ScanNotFound {
        /// First bytes of the key, hex encoded.
        key_prefix: String,
    },

    /// The connection table has no sink for this connection.
    #[error("No writable connection for {0}")]
    ConnectionNotFound(ConnectionId),

    /// Writing a response frame failed.
    #[error("Failed to deliver response on {connection}: {source}")]
    ResponseDelivery {
        /// Target connection.
        connection: ConnectionId,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// All 2^32 device ids have been handed out.
    #[error("Device id space exhausted")]
    DeviceIdsExhausted,

    /// Operator command could not be parsed.
    #[error("Invalid command: {reason}")]
    InvalidCommand {
        /// Parse failure.
        reason: String,
    },

    /// The orchestrator task has exited and dropped its queues.
    #[error("Orchestrator is no longer running")]
    OrchestratorStopped,

    /// Startup failed before the accept loop ran.
    #[error("Server failed to start: {reason}")]
    StartupFailed {
        /// Failure description.
        reason: String,
    },

    /// Shared type error.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Protocol or crypto error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Raw I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a config load error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a config validation error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a scan-miss error, keeping only a short key prefix.
    #[must_use]
    pub fn scan_not_found(static_public_key: &[u8]) -> Self {
        let prefix = &static_public_key[..static_public_key.len().min(4)];
        Self::ScanNotFound {
            key_prefix: hex::encode(prefix),
        }
    }

    /// Creates an operator command error.
    pub fn invalid_command(reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            reason: reason.into(),
        }
    }

    /// Creates a startup error.
    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    /// Attack indicators: replayed counters and bad MACs.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        match self {
            Self::Core(e) => e.is_suspicious(),
            _ => false,
        }
    }
}
