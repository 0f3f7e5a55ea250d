// ============================================
// File: crates/pairgate-core/src/lib.rs
// ============================================
//! # Pairgate Core - Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Everything that touches untrusted bytes or key material lives here,
//! free of I/O, so it can be tested exhaustively without sockets.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Header and payload definitions (signup/auth requests and responses)
//! - Binary codec with header validation and typed request dispatch
//!
//! ### Crypto Module ([`crypto`])
//! - X25519 ephemeral key pairs, session and pre-shared key types
//! - HKDF-SHA256 derivation of the two directional session keys
//! - HMAC-SHA256 tags for signup confirmation, auth requests and responses
//! - Server and gateway halves of the signup key agreement
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              pairgate-server                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   pairgate-core  ◄──   pairgate-transport           │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             pairgate-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Fixed suite: X25519 + HMAC-SHA256 + HKDF-SHA256, no negotiation
//! - MAC comparisons go through `subtle`, never `==`
//! - Key types are zeroized on drop and redact themselves in `Debug`
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod crypto;
pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use error::{CoreError, CounterKind, Result};
