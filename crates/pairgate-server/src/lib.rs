// ============================================
// File: crates/pairgate-server/src/lib.rs
// ============================================
//! # Pairgate Server - Pairing & Authentication Service
//!
//! ## Creation Reason
//! Runs the pairing protocol for a fleet of IoT gateways: registers
//! gateways through a scan-bootstrapped key agreement, then answers
//! their replay-protected authentication requests.
//!
//! ## Main Functionality
//! - [`orchestrator`]: The single task that owns all protocol state
//! - [`services`]: Scan/device registries, handshake and auth engines
//! - [`handlers`]: Per-connection read/decode/forward tasks
//! - [`console`]: Operator commands (scans, audit logs)
//! - [`server`]: Listener, task wiring, shutdown
//! - [`config`]: TOML configuration
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TcpTransport ──accept──► ConnectionTask (one per stream)   │
//! │                               │ read half                   │
//! │                               ▼                             │
//! │            ┌──── scan ────┬── signup ──┬── auth ──┐         │
//! │  Console ──┘   (bounded mpsc queues)   │          │         │
//! │            ▼              ▼            ▼          ▼         │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │                   Orchestrator                        │  │
//! │  │  ScanRegistry  DeviceRegistry  ConnectionTable        │  │
//! │  │  HandshakeService            AuthService              │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │                               │ write halves                │
//! │                               ▼                             │
//! │                      responses to gateways                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No lock guards protocol state: the orchestrator is the only owner.
//!   Keep it that way, talk to it through `OrchestratorHandle`.
//! - Protocol errors never produce bytes on the wire
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod console;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod server;
pub mod services;

// Re-export commonly used items
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use server::Server;
