// ============================================
// File: crates/pairgate-server/src/handlers/mod.rs
// ============================================
//! # Connection Handlers
//!
//! ## Creation Reason
//! One task per accepted gateway connection turns the byte stream into
//! typed requests for the orchestrator.
//!
//! ### Submodules
//! - [`connection`]: Read, validate, decode, forward
//!
//! ## Handler Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ConnectionTask                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  read half ──► header(3) ──► payload(len) ──► validate      │
//! │                                                  │          │
//! │                           invalid: drop, keep reading       │
//! │                                                  │          │
//! │                      SignupRequest ──► signup queue         │
//! │                      (+ write half, first time only)        │
//! │                      AuthRequest ───► auth queue            │
//! │                                      (+ arrival time)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The task never writes to the socket. Responses come from the
//!   orchestrator through the write half.
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod connection;

pub use connection::ConnectionTask;
