// ============================================
// File: crates/pairgate-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types of the pairing protocol with proper security
//! properties (zeroize on drop, constant-time equality, redacted Debug).
//!
//! ## Main Functionality
//! - `X25519KeyPair`: Key agreement pair, reusable for several DH operations
//! - `PresharedKey`: Out-of-band secret bound to a gateway by a scan
//! - `SessionKey` / `SessionKeys`: The two derived directional keys
//! - `generate_nonce`: Fresh 16-byte authentication challenge
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  PresharedKey (per scan)                                   │
//! │  ├─ Entered by an operator or loaded from config           │
//! │  └─ Lives in the scan registry for the process lifetime    │
//! │                                                            │
//! │  X25519KeyPair (per signup, server side)                   │
//! │  ├─ Generated fresh for each signup                        │
//! │  ├─ Used for two DH operations (static and ephemeral peer) │
//! │  └─ Dropped once the session keys are derived              │
//! │                                                            │
//! │  SessionKeys (per device)                                  │
//! │  ├─ Derived once at signup                                 │
//! │  └─ Immutable for the device's lifetime                    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL secret types MUST implement Zeroize
//! - Secrets are never logged, `Debug` prints a placeholder
//! - The server key pair uses `StaticSecret` because it is used for
//!   two agreements; it must still be thrown away after one signup
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use pairgate_common::KEY_SIZE;

use super::{NONCE_SIZE, SESSION_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// X25519KeyPair
// ============================================

/// X25519 key pair for Diffie-Hellman key agreement.
///
/// # Security
/// - Private scalar is zeroed on drop
/// - Agreement results that are all zero (low-order peer point) are rejected
pub struct X25519KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl X25519KeyPair {
    /// Generates a new key pair from the operating system RNG.
    ///
    /// # Errors
    /// Returns `Randomness` if the RNG is unavailable.
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng
            .try_fill_bytes(&mut *seed)
            .map_err(|e| CoreError::randomness(e.to_string()))?;
        Ok(Self::from_secret_bytes(*seed))
    }

    /// Creates a key pair from a raw private scalar.
    #[must_use]
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Returns the public key bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Performs X25519 with a peer public key.
    ///
    /// # Errors
    /// Returns `KeyExchange` if the shared secret is non-contributory.
    pub fn diffie_hellman(&self, peer_public: &[u8; KEY_SIZE]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        if !shared.was_contributory() {
            return Err(CoreError::key_exchange("peer public key has low order"));
        }
        Ok(Zeroizing::new(shared.to_bytes()))
    }
}

impl fmt::Debug for X25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X25519KeyPair")
            .field("public", &self.public.as_bytes())
            .finish_non_exhaustive()
    }
}

// ============================================
// PresharedKey
// ============================================

/// Pre-shared key bound to a gateway's static public key by a scan.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PresharedKey([u8; KEY_SIZE]);

impl PresharedKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for PresharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PresharedKey {}

impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PresharedKey([REDACTED])")
    }
}

// ============================================
// SessionKey
// ============================================

/// One directional HMAC key derived at signup.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

// ============================================
// SessionKeys
// ============================================

/// The pair of directional keys shared by a gateway and the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// `K_gw_s`: authenticates gateway requests.
    pub gateway_to_server: SessionKey,
    /// `K_s_gw`: authenticates server responses.
    pub server_to_gateway: SessionKey,
}

// ============================================
// Nonces
// ============================================

/// Generates a fresh authentication challenge nonce.
///
/// # Errors
/// Returns `Randomness` if the RNG is unavailable.
pub fn generate_nonce() -> Result<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| CoreError::randomness(e.to_string()))?;
    Ok(nonce)
}

// ============================================
// Tests
// ============================================
