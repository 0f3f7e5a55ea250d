// ============================================
// File: crates/pairgate-core/src/crypto/handshake.rs
// ============================================
//! # Handshake Cryptography
//!
//! ## Creation Reason
//! Provides both halves of the signup key agreement: the server side
//! used by the handshake service, and the gateway side used by tests and
//! by gateway implementations written against this crate.
//!
//! ## Main Functionality
//! - `HandshakeCrypto`: Trait for the server-side signup computation
//! - `DefaultHandshakeCrypto`: Production implementation (fresh key pair per signup)
//! - `GatewayHandshake`: Gateway-side key agreement and response check
//!
//! ## Handshake Flow
//! ```text
//! Gateway                                         Server
//!   │                                               │
//!   │  SignupRequest                                │
//!   │  ├─ static public key sPub                    │
//!   │  ├─ ephemeral public key ePub                 │
//!   │  └─ capability URI ─────────────────────────► │
//!   │                                               │
//!   │                      psk ← scan(sPub)         │
//!   │                      x, X ← X25519 keygen     │
//!   │                      s1 = DH(x, sPub)         │
//!   │                      s2 = DH(x, ePub)         │
//!   │                      keys = HKDF(s1‖s2‖psk)   │
//!   │                                               │
//!   │                               SignupResponse  │
//!   │  ◄──────────────────────── devId, X, tag      │
//!   │                                               │
//!   │  check tag = HMAC(psk, X‖ePub)                │
//!   │  s1 = DH(sPriv, X), s2 = DH(ePriv, X)         │
//!   │  keys = HKDF(s1‖s2‖psk)                       │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The SignupRequest MAC tag is not verified here; pairing is
//!   confirmed later by the first authentic AuthRequest
//! - A fresh server key pair per signup is what gives forward secrecy
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake crypto implementation

use tracing::trace;

use pairgate_common::KEY_SIZE;

use super::MAC_SIZE;
use crate::crypto::kdf::{derive_session_keys, key_material};
use crate::crypto::keys::{PresharedKey, SessionKeys, X25519KeyPair};
use crate::crypto::mac::{signup_confirmation_tag, tags_equal};
use crate::error::{CoreError, Result};
use crate::protocol::messages::{SignupRequest, SignupResponse};

// ============================================
// HandshakeOutcome
// ============================================

/// Result of the server-side signup computation.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    /// Server ephemeral public key `X`, sent back to the gateway.
    pub server_ephemeral_public_key: [u8; KEY_SIZE],
    /// Derived directional session keys.
    pub session_keys: SessionKeys,
    /// `HMAC(psk, X || ePub)`.
    pub confirmation_tag: [u8; MAC_SIZE],
}

// ============================================
// HandshakeCrypto Trait
// ============================================

/// Trait for the server-side signup computation.
///
/// # Purpose
/// Abstracts the key agreement so the handshake service can be tested
/// with deterministic or failing implementations.
pub trait HandshakeCrypto: Send + Sync {
    /// Runs key agreement and key derivation for a signup request.
    ///
    /// # Errors
    /// - `Randomness`: the server key pair could not be generated
    /// - `KeyExchange`: a gateway public key has low order
    /// - `KeyDerivation`: HKDF/HMAC failed
    fn respond(&self, request: &SignupRequest, psk: &PresharedKey) -> Result<HandshakeOutcome>;
}

// ============================================
// DefaultHandshakeCrypto
// ============================================

/// Production implementation: a fresh OS-random key pair per signup.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandshakeCrypto;

impl DefaultHandshakeCrypto {
    /// Creates a new instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs the server side of the signup with a caller-supplied key pair.
    pub fn respond_with(
        server_pair: &X25519KeyPair,
        request: &SignupRequest,
        psk: &PresharedKey,
    ) -> Result<HandshakeOutcome> {
        let static_shared = server_pair.diffie_hellman(&request.static_public_key)?;
        let ephemeral_shared = server_pair.diffie_hellman(&request.ephemeral_public_key)?;

        let ikm = key_material(&static_shared, &ephemeral_shared, psk);
        let session_keys = derive_session_keys(&ikm)?;

        let server_ephemeral_public_key = server_pair.public_key_bytes();
        let confirmation_tag = signup_confirmation_tag(
            psk,
            &server_ephemeral_public_key,
            &request.ephemeral_public_key,
        )?;

        trace!("Signup key agreement complete");

        Ok(HandshakeOutcome {
            server_ephemeral_public_key,
            session_keys,
            confirmation_tag,
        })
    }
}

impl HandshakeCrypto for DefaultHandshakeCrypto {
    fn respond(&self, request: &SignupRequest, psk: &PresharedKey) -> Result<HandshakeOutcome> {
        let server_pair = X25519KeyPair::generate()?;
        Self::respond_with(&server_pair, request, psk)
    }
}

// ============================================
// Gateway-side Handshake
// ============================================

/// Gateway half of the signup.
///
/// # Example
/// ```
/// use pairgate_core::crypto::{GatewayHandshake, PresharedKey};
///
/// let psk = PresharedKey::from_bytes([7u8; 32]);
/// let gateway = GatewayHandshake::generate(psk).unwrap();
/// let request = gateway.signup_request(1, b"/dev0".to_vec());
/// assert_eq!(request.static_public_key, gateway.static_public_key());
/// ```
#[derive(Debug)]
pub struct GatewayHandshake {
    static_pair: X25519KeyPair,
    ephemeral_pair: X25519KeyPair,
    psk: PresharedKey,
}

impl GatewayHandshake {
    /// Creates a gateway handshake from existing key pairs.
    #[must_use]
    pub const fn new(static_pair: X25519KeyPair, ephemeral_pair: X25519KeyPair, psk: PresharedKey) -> Self {
        Self {
            static_pair,
            ephemeral_pair,
            psk,
        }
    }

    /// Creates a gateway handshake with random key pairs.
    pub fn generate(psk: PresharedKey) -> Result<Self> {
        Ok(Self::new(X25519KeyPair::generate()?, X25519KeyPair::generate()?, psk))
    }

    /// Gateway static public key (the one scanned out of band).
    #[must_use]
    pub fn static_public_key(&self) -> [u8; KEY_SIZE] {
        self.static_pair.public_key_bytes()
    }

    /// Gateway ephemeral public key.
    #[must_use]
    pub fn ephemeral_public_key(&self) -> [u8; KEY_SIZE] {
        self.ephemeral_pair.public_key_bytes()
    }

    /// Builds the SignupRequest for this gateway.
    ///
    /// The MAC tag field is left zeroed; the server does not check it.
    #[must_use]
    pub fn signup_request(&self, device_type: u16, capability_uri: Vec<u8>) -> SignupRequest {
        SignupRequest {
            device_type,
            static_public_key: self.static_public_key(),
            ephemeral_public_key: self.ephemeral_public_key(),
            mac_tag: [0u8; MAC_SIZE],
            capability_uri,
        }
    }

    /// Checks the server's confirmation tag and derives the session keys.
    ///
    /// # Errors
    /// Returns `AuthenticationFailed` if the tag does not match, i.e. the
    /// server does not know this gateway's pre-shared key.
    pub fn complete(&self, response: &SignupResponse) -> Result<SessionKeys> {
        let expected = signup_confirmation_tag(
            &self.psk,
            &response.server_ephemeral_public_key,
            &self.ephemeral_public_key(),
        )?;
        if !tags_equal(&expected, &response.mac_tag) {
            return Err(CoreError::AuthenticationFailed);
        }

        let static_shared = self
            .static_pair
            .diffie_hellman(&response.server_ephemeral_public_key)?;
        let ephemeral_shared = self
            .ephemeral_pair
            .diffie_hellman(&response.server_ephemeral_public_key)?;

        let ikm = key_material(&static_shared, &ephemeral_shared, &self.psk);
        derive_session_keys(&ikm)
    }
}

// ============================================
// Tests
// ============================================
