// ============================================
// File: crates/pairgate-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Holds the state and engines owned by the orchestrator.
//!
//! ## Main Functionality
//! - `ScanRegistry`: Operator-provided (static key, PSK) records
//! - `DeviceRegistry`: Registered devices and their auth state
//! - `ConnectionTable`: Write halves, keyed by connection
//! - `HandshakeService`: Signup staging
//! - `AuthService`: Authentication decisions
//!
//! ## ⚠️ Important Note for Next Developer
//! - None of these types are `Sync`-shared. They live inside the
//!   orchestrator task and are mutated only there.
//!
//! ## Last Modified
//! v0.1.0 - Initial services

pub mod auth;
pub mod connections;
pub mod device_registry;
pub mod handshake;
pub mod scan_registry;

pub use auth::{AuthOutcome, AuthService};
pub use connections::ConnectionTable;
pub use device_registry::{DeviceRecord, DeviceRegistry, DeviceSummary, LogEntry};
pub use handshake::{HandshakeService, StagedSignup};
pub use scan_registry::{ScanRecord, ScanRegistry};
