// ============================================
// File: crates/pairgate-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the binary wire format spoken between gateways and the
//! pairing server.
//!
//! ## Main Functionality
//! - [`messages`]: Header, request and response structures
//! - [`codec`]: Encoding and decoding of headers and payloads
//!
//! ## Frame Layout
//! ```text
//! ┌──────────┬──────────────────┬──────────────────────────┐
//! │ type: u8 │ length: u16 (LE) │ payload (length bytes)   │
//! └──────────┴──────────────────┴──────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only SignupRequest (0) and AuthRequest (2) are accepted inbound
//! - Control (4) is reserved and has no payload definition
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod messages;

pub use codec::{Codec, ProtocolCodec};
pub use messages::{
    AccessType, AuthRequest, AuthResponse, Header, PayloadType, Request, SignupRequest,
    SignupResponse, AUTH_REQUEST_SIZE, AUTH_RESPONSE_SIZE, HEADER_SIZE,
    SIGNUP_REQUEST_MIN_SIZE, SIGNUP_RESPONSE_SIZE,
};
