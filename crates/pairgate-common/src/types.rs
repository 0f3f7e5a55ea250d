// ============================================
// File: crates/pairgate-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Gives the two numeric identifiers in the system distinct types so a
//! device id can never be used where a connection id is expected.
//!
//! ## Main Functionality
//! - `DeviceId`: Sequentially assigned device identifier (u32 on the wire)
//! - `ConnectionId`: Identifier handed out by the listener per accepted stream
//! - `parse_key_hex`: Strict 32-byte hex key parsing for config and console
//!
//! ## ⚠️ Important Note for Next Developer
//! - `DeviceId` is assigned only by the orchestrator, never parsed off
//!   the wire into a registry without a lookup
//! - Key parsing is strict: exactly 64 hex digits, no padding, no truncation
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

// ============================================
// Constants
// ============================================

/// Size of X25519 public keys and pre-shared keys in bytes.
pub const KEY_SIZE: usize = 32;

// ============================================
// DeviceId
// ============================================

/// Identifier of a registered device.
///
/// # Wire Format
/// Encoded as a little-endian `u32` in signup responses and auth requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for DeviceId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| CommonError::invalid_input("device_id", e.to_string()))
    }
}

// ============================================
// ConnectionId
// ============================================

/// Identifier of an accepted network connection.
///
/// Assigned by the listener in accept order, never reused during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================
// Key Parsing
// ============================================

/// Parses a 32-byte key written as 64 hex digits.
///
/// # Arguments
/// * `field` - Name used in the error message (e.g. `"psk"`)
/// * `input` - Hex string, surrounding whitespace is ignored
///
/// # Errors
/// Returns `InvalidLength` if the string is not exactly 64 digits, or
/// `InvalidInput` if it contains non-hex characters.
pub fn parse_key_hex(field: &str, input: &str) -> Result<[u8; KEY_SIZE]> {
    let input = input.trim();
    if input.len() != KEY_SIZE * 2 {
        return Err(CommonError::invalid_length(field, KEY_SIZE * 2, input.len()));
    }

    let mut key = [0u8; KEY_SIZE];
    hex::decode_to_slice(input, &mut key)
        .map_err(|e| CommonError::invalid_input(field, e.to_string()))?;
    Ok(key)
}

// ============================================
// Tests
// ============================================
