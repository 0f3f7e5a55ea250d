// ============================================
// File: crates/pairgate-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Every authentication request is stamped with its arrival time before
//! validation. The stamp is wall-clock time so operators can correlate
//! the audit log with gateway-side logs.
//!
//! ## Main Functionality
//! - `Timestamp`: Unix time in milliseconds, ordered and printable
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================
// Timestamp
// ============================================

/// Wall-clock instant with millisecond resolution.
///
/// Displays as `<seconds>.<millis>` since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Returns the current wall-clock time.
    ///
    /// A clock set before 1970 yields the epoch itself.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Creates a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Whole seconds since the epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

// ============================================
// Tests
// ============================================
