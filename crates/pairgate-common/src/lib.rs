// ============================================
// File: crates/pairgate-common/src/lib.rs
// ============================================
//! # Pairgate Common - Shared Types Library
//!
//! ## Creation Reason
//! Holds the small set of types every pairgate crate agrees on: device
//! and connection identifiers, 32-byte key parsing, and arrival
//! timestamps for the audit log.
//!
//! ## Main Functionality
//! - [`types`]: `DeviceId`, `ConnectionId`, hex key parsing
//! - [`time`]: Wall-clock `Timestamp` used for log entries
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              pairgate-server                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   pairgate-core        pairgate-transport           │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             pairgate-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies, keep external ones minimal
//! - Identifiers appear in logs, keys never do
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::Timestamp;
pub use types::{parse_key_hex, ConnectionId, DeviceId, KEY_SIZE};
