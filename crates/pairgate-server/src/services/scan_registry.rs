// ============================================
// File: crates/pairgate-server/src/services/scan_registry.rs
// ============================================
//! # Scan Registry
//!
//! ## Creation Reason
//! A gateway may only sign up after an operator has "scanned" it, i.e.
//! entered its static public key and pre-shared key out of band.
//!
//! ## Main Functionality
//! - `ScanRecord`: (static public key, PSK) pair
//! - `ScanRegistry`: Lookup by static public key
//!
//! ## ⚠️ Important Note for Next Developer
//! - Re-submitting an identical key is a no-op, the first record wins
//! - Records are never removed, a scanned gateway may sign up again
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use std::collections::HashMap;

use pairgate_common::KEY_SIZE;
use pairgate_core::crypto::PresharedKey;

/// Out-of-band provisioning data for one gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Gateway static X25519 public key.
    pub static_public_key: [u8; KEY_SIZE],
    /// Pre-shared key mixed into the session key derivation.
    pub preshared_key: PresharedKey,
}

impl ScanRecord {
    /// Creates a scan record.
    #[must_use]
    pub const fn new(static_public_key: [u8; KEY_SIZE], preshared_key: PresharedKey) -> Self {
        Self {
            static_public_key,
            preshared_key,
        }
    }
}

/// Scans keyed by static public key.
#[derive(Debug, Default)]
pub struct ScanRegistry {
    records: HashMap<[u8; KEY_SIZE], ScanRecord>,
}

impl ScanRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a scan. Returns `false` if the key was already present,
    /// in which case the stored record is left untouched.
    pub fn insert(&mut self, record: ScanRecord) -> bool {
        if self.records.contains_key(&record.static_public_key) {
            return false;
        }
        self.records.insert(record.static_public_key, record);
        true
    }

    /// Finds the scan for a static public key.
    #[must_use]
    pub fn lookup(&self, static_public_key: &[u8; KEY_SIZE]) -> Option<&ScanRecord> {
        self.records.get(static_public_key)
    }

    /// Number of stored scans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no scans are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
