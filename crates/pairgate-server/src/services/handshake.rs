// ============================================
// File: crates/pairgate-server/src/services/handshake.rs
// ============================================
//! # Handshake Service
//!
//! ## Creation Reason
//! Turns a signup request plus its scan into a staged device record and
//! the signup response frame, without touching the registry contents.
//!
//! ## Signup Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    HandshakeService::stage                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  1. Key agreement + HKDF (HandshakeCrypto)                   │
//! │     │  failure: nothing allocated                            │
//! │     ▼                                                        │
//! │  2. Allocate next device id (DeviceRegistry)                 │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  3. Build unpaired DeviceRecord + SignupResponse frame       │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  4. Return StagedSignup (orchestrator sends, then commits)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `stage` never inserts the record. The caller commits it only after
//!   the response frame was delivered.
//! - The gateway's signup MAC tag is not checked here. Key possession is
//!   proven by its first authentic auth request.
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake service

use std::sync::Arc;

use bytes::BytesMut;
use tracing::{debug, warn};

use pairgate_common::ConnectionId;
use pairgate_core::crypto::{DefaultHandshakeCrypto, HandshakeCrypto};
use pairgate_core::protocol::codec::encode_signup_response_frame;
use pairgate_core::protocol::{SignupRequest, SignupResponse};

use crate::error::Result;
use crate::services::device_registry::{DeviceRecord, DeviceRegistry};
use crate::services::scan_registry::ScanRecord;

/// A device record and its response frame, not yet committed.
#[derive(Debug)]
pub struct StagedSignup {
    /// Record to commit once the frame is delivered.
    pub record: DeviceRecord,
    /// Complete SignupResponse frame, header included.
    pub frame: BytesMut,
}

/// Server side of the signup handshake.
pub struct HandshakeService {
    crypto: Arc<dyn HandshakeCrypto>,
}

impl HandshakeService {
    /// Creates a service using OS randomness for server key pairs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_crypto(Arc::new(DefaultHandshakeCrypto::new()))
    }

    /// Creates a service around a custom crypto implementation.
    #[must_use]
    pub fn with_crypto(crypto: Arc<dyn HandshakeCrypto>) -> Self {
        Self { crypto }
    }

    /// Runs the key agreement and prepares the device record.
    ///
    /// Consumes a device id on success. A crypto failure allocates
    /// nothing.
    pub fn stage(
        &self,
        devices: &mut DeviceRegistry,
        connection: ConnectionId,
        request: &SignupRequest,
        scan: &ScanRecord,
    ) -> Result<StagedSignup> {
        let outcome = self
            .crypto
            .respond(request, &scan.preshared_key)
            .map_err(|e| {
                warn!(conn_id = %connection, error = %e, "Signup key agreement failed");
                e
            })?;

        let id = devices.allocate_id()?;

        let response = SignupResponse {
            device_id: id,
            server_ephemeral_public_key: outcome.server_ephemeral_public_key,
            mac_tag: outcome.confirmation_tag,
        };
        let frame = encode_signup_response_frame(&response);

        let record = DeviceRecord::new(
            id,
            request.device_type,
            request.capability_uri.clone(),
            outcome.session_keys,
            scan.clone(),
            connection,
        );

        debug!(conn_id = %connection, device_id = %id, "Signup staged");

        Ok(StagedSignup { record, frame })
    }
}

impl Default for HandshakeService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandshakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeService").finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use pairgate_common::DeviceId;
    use pairgate_core::crypto::{GatewayHandshake, HandshakeOutcome, PresharedKey};
    use pairgate_core::protocol::codec::decode_signup_response;
    use pairgate_core::protocol::HEADER_SIZE;
    use pairgate_core::CoreError;

    struct FailingCrypto;

    impl HandshakeCrypto for FailingCrypto {
        fn respond(
            &self,
            _request: &SignupRequest,
            _psk: &PresharedKey,
        ) -> pairgate_core::Result<HandshakeOutcome> {
            Err(CoreError::randomness("rng offline"))
        }
    }

    fn gateway() -> (GatewayHandshake, ScanRecord) {
        let psk = PresharedKey::from_bytes([5u8; 32]);
        let gateway = GatewayHandshake::generate(psk.clone()).unwrap();
        let scan = ScanRecord::new(gateway.static_public_key(), psk);
        (gateway, scan)
    }

    #[test]
    fn test_stage_produces_matching_keys() {
        let service = HandshakeService::new();
        let mut devices = DeviceRegistry::new();
        let (gateway, scan) = gateway();
        let request = gateway.signup_request(1, b"/dev0".to_vec());

        let staged = service
            .stage(&mut devices, ConnectionId::new(3), &request, &scan)
            .unwrap();

        assert_eq!(staged.frame.len(), 71);
        assert_eq!(&staged.frame[..HEADER_SIZE], &[1u8, 68, 0]);

        let response = decode_signup_response(&staged.frame[HEADER_SIZE..]).unwrap();
        assert_eq!(response.device_id, DeviceId::new(0));

        let gateway_keys = gateway.complete(&response).unwrap();
        assert_eq!(gateway_keys, staged.record.session_keys);

        assert_eq!(staged.record.connection, ConnectionId::new(3));
        assert_eq!(staged.record.capability_uri, b"/dev0");
        assert!(!staged.record.paired);
        // Staging leaves the registry untouched.
        assert!(devices.is_empty());
    }

    #[test]
    fn test_stage_consumes_ids() {
        let service = HandshakeService::new();
        let mut devices = DeviceRegistry::new();
        let (gateway, scan) = gateway();
        let request = gateway.signup_request(1, Vec::new());

        let first = service
            .stage(&mut devices, ConnectionId::new(0), &request, &scan)
            .unwrap();
        let second = service
            .stage(&mut devices, ConnectionId::new(0), &request, &scan)
            .unwrap();

        assert_eq!(first.record.id, DeviceId::new(0));
        assert_eq!(second.record.id, DeviceId::new(1));
        // Fresh server key pair per signup.
        assert_ne!(first.record.session_keys, second.record.session_keys);
    }

    #[test]
    fn test_crypto_failure_allocates_nothing() {
        let service = HandshakeService::with_crypto(Arc::new(FailingCrypto));
        let mut devices = DeviceRegistry::new();
        let (gateway, scan) = gateway();
        let request = gateway.signup_request(1, Vec::new());

        assert!(service
            .stage(&mut devices, ConnectionId::new(0), &request, &scan)
            .is_err());
        assert_eq!(devices.allocate_id().unwrap(), DeviceId::new(0));
    }
}
