// ============================================
// File: crates/pairgate-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Creation Reason
//! Derives the two directional session keys from the signup key
//! agreement output and the pre-shared key.
//!
//! ## Main Functionality
//! - `key_material`: Builds `ikm = s1 || s2 || psk`
//! - `derive_session_keys`: HKDF-SHA256 with a 16-byte zero salt, one
//!   output block per label (`"gw_s"`, `"s_gw"`)
//!
//! ## ⚠️ Important Note for Next Developer
//! - One 32-byte block per label is exactly `HMAC(prk, label || 0x01)`,
//!   which is what deployed gateways compute. Do not request longer output.
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use pairgate_common::KEY_SIZE;

use super::{HKDF_SALT, LABEL_GATEWAY_TO_SERVER, LABEL_SERVER_TO_GATEWAY, SESSION_KEY_SIZE};
use crate::crypto::keys::{PresharedKey, SessionKey, SessionKeys};
use crate::error::{CoreError, Result};

// ============================================
// Key Derivation
// ============================================

/// Concatenates the two shared secrets and the pre-shared key.
#[must_use]
pub fn key_material(
    static_shared: &[u8; KEY_SIZE],
    ephemeral_shared: &[u8; KEY_SIZE],
    psk: &PresharedKey,
) -> Zeroizing<Vec<u8>> {
    let mut ikm = Zeroizing::new(Vec::with_capacity(KEY_SIZE * 3));
    ikm.extend_from_slice(static_shared);
    ikm.extend_from_slice(ephemeral_shared);
    ikm.extend_from_slice(psk.as_bytes());
    ikm
}

/// Derives `(K_gw_s, K_s_gw)` from input key material.
///
/// Deterministic: the same `ikm` always yields the same pair.
pub fn derive_session_keys(ikm: &[u8]) -> Result<SessionKeys> {
    let hk = Hkdf::<Sha256>::new(Some(&HKDF_SALT), ikm);

    let gateway_to_server = expand(&hk, LABEL_GATEWAY_TO_SERVER)?;
    let server_to_gateway = expand(&hk, LABEL_SERVER_TO_GATEWAY)?;

    Ok(SessionKeys {
        gateway_to_server,
        server_to_gateway,
    })
}

fn expand(hk: &Hkdf<Sha256>, label: &[u8]) -> Result<SessionKey> {
    let mut okm = Zeroizing::new([0u8; SESSION_KEY_SIZE]);
    hk.expand(label, &mut *okm)
        .map_err(|_| CoreError::key_derivation("HKDF expansion failed"))?;
    Ok(SessionKey::from_bytes(*okm))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use hmac::{Hmac, Mac};

    use super::*;

    fn hmac(key: &[u8], data: &[u8]) -> [u8; 32] {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).unwrap();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let ikm = [0x5Au8; 96];
        let a = derive_session_keys(&ikm).unwrap();
        let b = derive_session_keys(&ikm).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_directional_keys_differ() {
        let keys = derive_session_keys(&[0x01u8; 96]).unwrap();
        assert_ne!(keys.gateway_to_server, keys.server_to_gateway);
    }

    #[test]
    fn test_different_ikm_gives_different_keys() {
        let a = derive_session_keys(&[0x01u8; 96]).unwrap();
        let b = derive_session_keys(&[0x02u8; 96]).unwrap();
        assert_ne!(a.gateway_to_server, b.gateway_to_server);
    }

    #[test]
    fn test_matches_single_block_expand() {
        let ikm: Vec<u8> = (0u8..96).collect();
        let prk = hmac(&[0u8; 16], &ikm);

        let expected_gw_s = hmac(&prk, b"gw_s\x01");
        let expected_s_gw = hmac(&prk, b"s_gw\x01");

        let keys = derive_session_keys(&ikm).unwrap();
        assert_eq!(keys.gateway_to_server.as_bytes(), &expected_gw_s);
        assert_eq!(keys.server_to_gateway.as_bytes(), &expected_s_gw);
    }

    #[test]
    fn test_key_material_layout() {
        let psk = PresharedKey::from_bytes([3u8; 32]);
        let ikm = key_material(&[1u8; 32], &[2u8; 32], &psk);
        assert_eq!(ikm.len(), 96);
        assert_eq!(&ikm[..32], &[1u8; 32]);
        assert_eq!(&ikm[32..64], &[2u8; 32]);
        assert_eq!(&ikm[64..], &[3u8; 32]);
    }
}
