// ============================================
// File: crates/pairgate-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the per-message error taxonomy of the pairing protocol. None
//! of these errors is ever sent back over the wire: the caller logs it
//! and drops the message.
//!
//! ## Error Categories
//! 1. **Protocol Errors**: bad payload type, bad length, bad access type
//! 2. **Crypto Errors**: randomness, key agreement, key derivation
//! 3. **Verification Errors**: stale counters, MAC mismatch
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material or MAC values in error messages
//! - Counter values are fine to log, they travel in clear text anyway
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CounterKind
// ============================================

/// Which replay counter failed a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    /// Gateway reboot counter.
    Reboot,
    /// Per-boot request counter.
    Request,
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reboot => write!(f, "reboot"),
            Self::Request => write!(f, "request"),
        }
    }
}

// ============================================
// CoreError
// ============================================

/// Core error types for protocol and cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Protocol Errors
    // ========================================

    /// Header carries a type code that is not an inbound request.
    #[error("Invalid payload type: {0}")]
    InvalidPayloadType(u8),

    /// Declared payload length does not fit the payload type.
    #[error("Invalid payload length for type {payload_type}: expected {expected}, got {actual}")]
    InvalidPayloadLen {
        /// Payload type code from the header
        payload_type: u8,
        /// Human readable requirement (e.g. `"46"`, `">= 98"`)
        expected: String,
        /// Declared length
        actual: usize,
    },

    /// Access type outside the known domain.
    #[error("Invalid access type: 0x{0:04x}")]
    InvalidAccessType(u16),

    /// Buffer is shorter than the structure being decoded.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Cryptographic Errors
    // ========================================

    /// The operating system RNG failed.
    #[error("Random number generation failed: {reason}")]
    Randomness {
        /// Why the RNG failed
        reason: String,
    },

    /// Diffie-Hellman produced an unusable shared secret.
    #[error("Key exchange failed: {reason}")]
    KeyExchange {
        /// Why key exchange failed
        reason: String,
    },

    /// HKDF or HMAC keying failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    // ========================================
    // Verification Errors
    // ========================================

    /// A replay counter went backwards.
    #[error("Replay detected: {counter} counter {received} below stored {stored}")]
    ReplayDetected {
        /// Which counter failed
        counter: CounterKind,
        /// Value carried by the request
        received: u32,
        /// Value stored for the device
        stored: u32,
    },

    /// MAC tag did not verify.
    #[error("Authentication failed: MAC mismatch")]
    AuthenticationFailed,
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidPayloadLen` error.
    pub fn invalid_len(payload_type: u8, expected: impl Into<String>, actual: usize) -> Self {
        Self::InvalidPayloadLen {
            payload_type,
            expected: expected.into(),
            actual,
        }
    }

    /// Creates a `MessageTooShort` error.
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates a `Randomness` error.
    pub fn randomness(reason: impl Into<String>) -> Self {
        Self::Randomness {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyExchange` error.
    pub fn key_exchange(reason: impl Into<String>) -> Self {
        Self::KeyExchange {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyDerivation` error.
    pub fn key_derivation(reason: impl Into<String>) -> Self {
        Self::KeyDerivation {
            reason: reason.into(),
        }
    }

    /// Creates a `ReplayDetected` error.
    pub const fn replay(counter: CounterKind, received: u32, stored: u32) -> Self {
        Self::ReplayDetected {
            counter,
            received,
            stored,
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error might indicate an attack.
    ///
    /// These are logged at warning level.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::ReplayDetected { .. } | Self::AuthenticationFailed
        )
    }
}

// ============================================
// Tests
// ============================================
