// ============================================
// File: crates/pairgate-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes the fixed cryptographic suite of the pairing protocol,
//! built on RustCrypto and dalek implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: X25519 key pairs, session keys, pre-shared keys, nonces
//! - [`kdf`]: HKDF-SHA256 derivation of the directional session keys
//! - [`mac`]: HMAC-SHA256 tags and constant-time verification
//! - [`handshake`]: Server and gateway halves of the signup
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Signup Phase                             │
//! │  Gateway                                       Server       │
//! │    │                                              │         │
//! │    │  sPub, ePub, capability URI ─────────────►  │         │
//! │    │                           (psk from scan)    │         │
//! │    │                           x ← random         │         │
//! │    │                           s1 = DH(x, sPub)   │         │
//! │    │                           s2 = DH(x, ePub)   │         │
//! │    │                                              │         │
//! │    │ ◄──────────── devId, X, HMAC(psk, X‖ePub)    │         │
//! │    │                                              │         │
//! │    │   ikm = s1 ‖ s2 ‖ psk                        │         │
//! │    │   HKDF(salt=0¹⁶) ──► K_gw_s ("gw_s")         │         │
//! │    │                  ──► K_s_gw ("s_gw")         │         │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Authentication Phase                     │
//! │                                                             │
//! │  mac  = HMAC(K_gw_s, reboot ‖ request ‖ access ‖ lastNonce) │
//! │  resp = nonce ‖ HMAC(K_s_gw, nonce ‖ mac)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER roll your own primitives, everything here wraps audited crates
//! - ALL secret key types implement Zeroize
//! - Test vectors must keep matching deployed gateways
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod handshake;
pub mod kdf;
pub mod keys;
pub mod mac;

// Re-export primary types at module level
pub use handshake::{DefaultHandshakeCrypto, GatewayHandshake, HandshakeCrypto, HandshakeOutcome};
pub use keys::{generate_nonce, PresharedKey, SessionKey, SessionKeys, X25519KeyPair};

// ============================================
// Constants
// ============================================

/// Size of an HMAC-SHA256 tag in bytes.
pub const MAC_SIZE: usize = 32;

/// Size of the authentication challenge nonce in bytes.
pub const NONCE_SIZE: usize = 16;

/// Size of a derived session key in bytes.
pub const SESSION_KEY_SIZE: usize = 32;

/// HKDF-Extract salt: sixteen zero bytes.
pub const HKDF_SALT: [u8; 16] = [0u8; 16];

/// HKDF-Expand label for the gateway-to-server key.
pub const LABEL_GATEWAY_TO_SERVER: &[u8] = b"gw_s";

/// HKDF-Expand label for the server-to-gateway key.
pub const LABEL_SERVER_TO_GATEWAY: &[u8] = b"s_gw";
