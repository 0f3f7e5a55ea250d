// ============================================
// File: crates/pairgate-transport/src/lib.rs
// ============================================
//! # Pairgate Transport - Network I/O Layer
//!
//! ## Creation Reason
//! Keeps socket handling out of the protocol crates: binding the
//! listener, reading exact byte counts, and writing response frames
//! without letting one slow peer stall the caller indefinitely.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `ResponseSink`, the write capability the orchestrator owns
//! - [`tcp`]: TCP listener, write-half sink, exact reads
//! - [`mock`]: In-memory sink for tests
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              pairgate-server                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   pairgate-core        pairgate-transport           │
//! │                        You are here ◄──             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connection Split
//! ```text
//!   TcpStream ──into_split──┬── OwnedReadHalf  ──► connection task
//!                           └── OwnedWriteHalf ──► TcpResponseSink ──► orchestrator
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A sink has exactly one owner; it is moved, never shared
//! - Writes are bounded by timeout × retries, see `TcpResponseSink`
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod mock;
pub mod tcp;
pub mod traits;

// Re-export commonly used items
pub use error::{Result, TransportError};
pub use mock::MockSink;
pub use tcp::{read_exact_or_closed, TcpResponseSink, TcpTransport, WritePolicy};
pub use traits::ResponseSink;
