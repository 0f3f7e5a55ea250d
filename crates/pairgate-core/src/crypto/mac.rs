// ============================================
// File: crates/pairgate-core/src/crypto/mac.rs
// ============================================
//! # Message Authentication
//!
//! ## Creation Reason
//! Computes and verifies the three HMAC-SHA256 tags of the protocol.
//!
//! ## Main Functionality
//! - `signup_confirmation_tag`: `HMAC(psk, X || ePub)` in the signup response
//! - `auth_request_tag` / `verify_auth_request`: the chained request MAC
//! - `auth_response_tag`: `HMAC(K_s_gw, nonce || request MAC)`
//!
//! ## Request MAC Input
//! ```text
//! ┌───────────┬────────────┬───────────────┬──────────────────┐
//! │ reboot(4) │ request(4) │ accessType(2) │ lastNonce(16)    │
//! │   LE      │   LE       │   LE          │ (server issued)  │
//! └───────────┴────────────┴───────────────┴──────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Verification MUST stay constant-time (`subtle::ConstantTimeEq`)
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use pairgate_common::KEY_SIZE;

use super::{MAC_SIZE, NONCE_SIZE};
use crate::crypto::keys::{PresharedKey, SessionKey};
use crate::error::{CoreError, Result};
use crate::protocol::messages::{AccessType, AuthRequest};

type HmacSha256 = Hmac<Sha256>;

// ============================================
// Tag Computation
// ============================================

fn hmac_parts(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_SIZE]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| CoreError::key_derivation("invalid HMAC key length"))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Tag proving to the gateway that the server holds the pre-shared key.
pub fn signup_confirmation_tag(
    psk: &PresharedKey,
    server_ephemeral_public: &[u8; KEY_SIZE],
    gateway_ephemeral_public: &[u8; KEY_SIZE],
) -> Result<[u8; MAC_SIZE]> {
    hmac_parts(
        psk.as_bytes(),
        &[server_ephemeral_public, gateway_ephemeral_public],
    )
}

/// Computes the MAC a gateway attaches to an authentication request.
pub fn auth_request_tag(
    key: &SessionKey,
    reboot_counter: u32,
    request_counter: u32,
    access_type: AccessType,
    last_randomness: &[u8; NONCE_SIZE],
) -> Result<[u8; MAC_SIZE]> {
    hmac_parts(
        key.as_bytes(),
        &[
            &reboot_counter.to_le_bytes(),
            &request_counter.to_le_bytes(),
            &access_type.as_u16().to_le_bytes(),
            last_randomness,
        ],
    )
}

/// Verifies an authentication request MAC against the stored challenge.
///
/// # Errors
/// Returns `AuthenticationFailed` on mismatch.
pub fn verify_auth_request(
    key: &SessionKey,
    request: &AuthRequest,
    last_randomness: &[u8; NONCE_SIZE],
) -> Result<()> {
    let expected = auth_request_tag(
        key,
        request.reboot_counter,
        request.request_counter,
        request.access_type,
        last_randomness,
    )?;

    if tags_equal(&expected, &request.mac_tag) {
        Ok(())
    } else {
        Err(CoreError::AuthenticationFailed)
    }
}

/// Computes the tag binding a fresh nonce to the request it answers.
pub fn auth_response_tag(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    request_mac: &[u8; MAC_SIZE],
) -> Result<[u8; MAC_SIZE]> {
    hmac_parts(key.as_bytes(), &[nonce, request_mac])
}

/// Constant-time tag comparison.
#[must_use]
pub fn tags_equal(a: &[u8; MAC_SIZE], b: &[u8; MAC_SIZE]) -> bool {
    a.ct_eq(b).into()
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use pairgate_common::DeviceId;

    use super::*;

    fn request(key: &SessionKey, reboot: u32, req: u32, last: &[u8; 16]) -> AuthRequest {
        AuthRequest {
            device_id: DeviceId::new(0),
            reboot_counter: reboot,
            request_counter: req,
            access_type: AccessType::SampleSensor0,
            mac_tag: auth_request_tag(key, reboot, req, AccessType::SampleSensor0, last).unwrap(),
        }
    }

    #[test]
    fn test_verify_accepts_matching_tag() {
        let key = SessionKey::from_bytes([9; 32]);
        let last = [0u8; 16];
        let req = request(&key, 0, 1, &last);
        assert!(verify_auth_request(&key, &req, &last).is_ok());
    }

    #[test]
    fn test_verify_rejects_stale_randomness() {
        let key = SessionKey::from_bytes([9; 32]);
        let req = request(&key, 0, 1, &[0u8; 16]);
        let err = verify_auth_request(&key, &req, &[1u8; 16]).unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let key = SessionKey::from_bytes([9; 32]);
        let other = SessionKey::from_bytes([8; 32]);
        let last = [0u8; 16];
        let req = request(&key, 0, 1, &last);
        assert!(verify_auth_request(&other, &req, &last).is_err());
    }

    #[test]
    fn test_verify_rejects_tampered_counter() {
        let key = SessionKey::from_bytes([9; 32]);
        let last = [0u8; 16];
        let mut req = request(&key, 0, 1, &last);
        req.request_counter = 2;
        assert!(verify_auth_request(&key, &req, &last).is_err());
    }

    #[test]
    fn test_request_tag_input_layout() {
        let key = SessionKey::from_bytes([1; 32]);
        let last = [0xEE; 16];
        let tag = auth_request_tag(&key, 0x0102_0304, 5, AccessType::DummyPairingConfirmation, &last)
            .unwrap();

        let mut input = Vec::new();
        input.extend_from_slice(&[0x04, 0x03, 0x02, 0x01]);
        input.extend_from_slice(&[5, 0, 0, 0]);
        input.extend_from_slice(&[0x69, 0]);
        input.extend_from_slice(&last);
        assert_eq!(tag, hmac_parts(&[1; 32], &[input.as_slice()]).unwrap());
    }

    #[test]
    fn test_response_and_confirmation_tags() {
        let key = SessionKey::from_bytes([2; 32]);
        let a = auth_response_tag(&key, &[0; 16], &[1; 32]).unwrap();
        let b = auth_response_tag(&key, &[0; 16], &[2; 32]).unwrap();
        assert_ne!(a, b);

        let psk = PresharedKey::from_bytes([3; 32]);
        let tag = signup_confirmation_tag(&psk, &[4; 32], &[5; 32]).unwrap();
        let mut input = vec![4u8; 32];
        input.extend_from_slice(&[5u8; 32]);
        assert_eq!(tag, hmac_parts(&[3; 32], &[input.as_slice()]).unwrap());
    }
}
