// ============================================
// File: crates/pairgate-server/src/services/auth.rs
// ============================================
//! # Authentication Service
//!
//! ## Creation Reason
//! Decides what happens to an authentication request: silent drop,
//! pairing confirmation, or a fresh challenge response.
//!
//! ## Decision Flow
//! ```text
//! AuthRequest
//!     │
//!     ├── unknown device id ─────────────────► UnknownDevice (no log)
//!     ▼
//! append LogEntry (always)
//!     │
//!     ├── reboot < stored ───────────────────► ReplayDetected
//!     ├── request < stored ──────────────────► ReplayDetected
//!     ├── MAC(K_gw_s, .. lastRandomness) bad ► AuthenticationFailed
//!     │
//!     ├── dummy access type ─────────────────► paired = true, no reply
//!     ▼
//! new nonce, store counters + nonce
//!     │
//!     ▼
//! nonce || HMAC(K_s_gw, nonce || request MAC) ──► signup connection
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The two counter checks are independent. An equal counter passes;
//!   exact replays still fail because the MAC covers the rotated nonce.
//! - Every error returned here means "send nothing". Never map one to a
//!   negative acknowledgment on the wire.
//! - Dummy requests leave counters and `last_randomness` alone
//!
//! ## Last Modified
//! v0.1.0 - Initial authentication service

use bytes::BytesMut;
use tracing::{debug, info};

use pairgate_common::{ConnectionId, DeviceId, Timestamp};
use pairgate_core::crypto::mac::{auth_response_tag, verify_auth_request};
use pairgate_core::crypto::generate_nonce;
use pairgate_core::protocol::codec::encode_auth_response_frame;
use pairgate_core::protocol::{AuthRequest, AuthResponse};
use pairgate_core::{CoreError, CounterKind};

use crate::error::{Result, ServerError};
use crate::services::device_registry::DeviceRegistry;

/// What the orchestrator should do after an accepted request.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Send `frame` to `connection`.
    Respond {
        /// Device that was authenticated.
        device_id: DeviceId,
        /// Connection recorded at signup.
        connection: ConnectionId,
        /// Complete AuthResponse frame.
        frame: BytesMut,
    },
    /// Dummy request accepted, the device is now paired.
    Paired(DeviceId),
}

/// Stateless authentication engine over the device registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthService;

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Processes one authentication request.
    ///
    /// # Errors
    /// - `UnknownDevice`: no record, nothing logged
    /// - `Core(ReplayDetected)`: a counter went backwards
    /// - `Core(AuthenticationFailed)`: MAC mismatch
    /// - `Core(Randomness | KeyDerivation)`: nonce or tag generation failed
    ///
    /// State is only modified for accepted requests (plus the log entry).
    pub fn process(
        &self,
        devices: &mut DeviceRegistry,
        request: &AuthRequest,
        arrived_at: Timestamp,
    ) -> Result<AuthOutcome> {
        let device = devices
            .get_mut(request.device_id)
            .ok_or(ServerError::UnknownDevice(request.device_id))?;

        device.append_log(request, arrived_at);

        if request.reboot_counter < device.reboot_counter {
            return Err(CoreError::replay(
                CounterKind::Reboot,
                request.reboot_counter,
                device.reboot_counter,
            )
            .into());
        }
        if request.request_counter < device.request_counter {
            return Err(CoreError::replay(
                CounterKind::Request,
                request.request_counter,
                device.request_counter,
            )
            .into());
        }

        verify_auth_request(
            &device.session_keys.gateway_to_server,
            request,
            &device.last_randomness,
        )?;

        if request.access_type.is_dummy() {
            if !device.paired {
                info!(device_id = %device.id, "Device paired");
            }
            device.paired = true;
            return Ok(AuthOutcome::Paired(device.id));
        }

        // Nonce and tag first, so a failure here leaves the record as it was.
        let nonce = generate_nonce()?;
        let auth_tag = auth_response_tag(
            &device.session_keys.server_to_gateway,
            &nonce,
            &request.mac_tag,
        )?;

        device.reboot_counter = request.reboot_counter;
        device.request_counter = request.request_counter;
        device.last_randomness = nonce;

        debug!(
            device_id = %device.id,
            reboot = request.reboot_counter,
            request = request.request_counter,
            access = ?request.access_type,
            "Authentication accepted"
        );

        let frame = encode_auth_response_frame(&AuthResponse { nonce, auth_tag });
        Ok(AuthOutcome::Respond {
            device_id: device.id,
            connection: device.connection,
            frame,
        })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use pairgate_core::crypto::mac::auth_request_tag;
    use pairgate_core::crypto::{PresharedKey, SessionKey, SessionKeys};
    use pairgate_core::protocol::codec::decode_auth_response;
    use pairgate_core::protocol::{AccessType, HEADER_SIZE};

    use crate::services::device_registry::DeviceRecord;
    use crate::services::scan_registry::ScanRecord;

    fn keys() -> SessionKeys {
        SessionKeys {
            gateway_to_server: SessionKey::from_bytes([0x11; 32]),
            server_to_gateway: SessionKey::from_bytes([0x22; 32]),
        }
    }

    fn registry_with_device() -> (DeviceRegistry, DeviceId) {
        let mut devices = DeviceRegistry::new();
        let id = devices.allocate_id().unwrap();
        let scan = ScanRecord::new([0u8; 32], PresharedKey::from_bytes([0u8; 32]));
        devices.commit(DeviceRecord::new(
            id,
            1,
            Vec::new(),
            keys(),
            scan,
            ConnectionId::new(4),
        ));
        (devices, id)
    }

    fn signed(
        id: DeviceId,
        reboot: u32,
        request: u32,
        access: AccessType,
        last: &[u8; 16],
    ) -> AuthRequest {
        let mac_tag = auth_request_tag(&keys().gateway_to_server, reboot, request, access, last).unwrap();
        AuthRequest {
            device_id: id,
            reboot_counter: reboot,
            request_counter: request,
            access_type: access,
            mac_tag,
        }
    }

    fn now() -> Timestamp {
        Timestamp::from_millis(42)
    }

    #[test]
    fn test_accepted_request_rotates_challenge() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();
        let request = signed(id, 0, 1, AccessType::SampleSensor0, &[0u8; 16]);

        let outcome = service.process(&mut devices, &request, now()).unwrap();
        let AuthOutcome::Respond { connection, frame, .. } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(connection, ConnectionId::new(4));
        assert_eq!(frame.len(), 51);
        assert_eq!(&frame[..HEADER_SIZE], &[3u8, 48, 0]);

        let response = decode_auth_response(&frame[HEADER_SIZE..]).unwrap();
        let expected = auth_response_tag(&keys().server_to_gateway, &response.nonce, &request.mac_tag).unwrap();
        assert_eq!(response.auth_tag, expected);

        let device = devices.get(id).unwrap();
        assert_eq!(device.request_counter, 1);
        assert_eq!(device.last_randomness, response.nonce);
        // Only dummy requests flip the pairing flag.
        assert!(!device.paired);
    }

    #[test]
    fn test_next_request_needs_new_nonce() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();

        let first = signed(id, 0, 1, AccessType::SampleSensor1, &[0u8; 16]);
        service.process(&mut devices, &first, now()).unwrap();
        let nonce = devices.get(id).unwrap().last_randomness;

        let stale_chain = signed(id, 0, 2, AccessType::SampleSensor1, &[0u8; 16]);
        let result = service.process(&mut devices, &stale_chain, now());
        assert!(matches!(
            result,
            Err(ServerError::Core(CoreError::AuthenticationFailed))
        ));

        let chained = signed(id, 0, 2, AccessType::SampleSensor1, &nonce);
        assert!(service.process(&mut devices, &chained, now()).is_ok());
    }

    #[test]
    fn test_exact_replay_rejected() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();
        let request = signed(id, 0, 1, AccessType::ControlActuator0, &[0u8; 16]);

        service.process(&mut devices, &request, now()).unwrap();
        let before = devices.get(id).unwrap().last_randomness;

        let result = service.process(&mut devices, &request, now());
        assert!(result.is_err());
        assert_eq!(devices.get(id).unwrap().last_randomness, before);
    }

    #[test]
    fn test_stale_counters_rejected_even_with_valid_mac() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();

        let request = signed(id, 3, 5, AccessType::SampleSensor0, &[0u8; 16]);
        service.process(&mut devices, &request, now()).unwrap();
        let nonce = devices.get(id).unwrap().last_randomness;

        let old_request = signed(id, 3, 4, AccessType::SampleSensor0, &nonce);
        let result = service.process(&mut devices, &old_request, now());
        assert!(matches!(
            result,
            Err(ServerError::Core(CoreError::ReplayDetected {
                counter: CounterKind::Request,
                ..
            }))
        ));

        let old_reboot = signed(id, 2, 9, AccessType::SampleSensor0, &nonce);
        let result = service.process(&mut devices, &old_reboot, now());
        assert!(matches!(
            result,
            Err(ServerError::Core(CoreError::ReplayDetected {
                counter: CounterKind::Reboot,
                ..
            }))
        ));

        let device = devices.get(id).unwrap();
        assert_eq!(device.reboot_counter, 3);
        assert_eq!(device.request_counter, 5);
    }

    #[test]
    fn test_counters_checked_independently() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();

        let request = signed(id, 1, 10, AccessType::SampleSensor0, &[0u8; 16]);
        service.process(&mut devices, &request, now()).unwrap();
        let nonce = devices.get(id).unwrap().last_randomness;

        // A higher reboot counter does not reset the request baseline.
        let after_reboot = signed(id, 2, 0, AccessType::SampleSensor0, &nonce);
        assert!(service.process(&mut devices, &after_reboot, now()).is_err());
    }

    #[test]
    fn test_dummy_request_pairs_without_rotation() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();
        let request = signed(id, 7, 8, AccessType::DummyPairingConfirmation, &[0u8; 16]);

        let outcome = service.process(&mut devices, &request, now()).unwrap();
        assert!(matches!(outcome, AuthOutcome::Paired(paired) if paired == id));

        let device = devices.get(id).unwrap();
        assert!(device.paired);
        assert_eq!(device.reboot_counter, 0);
        assert_eq!(device.request_counter, 0);
        assert_eq!(device.last_randomness, [0u8; 16]);
    }

    #[test]
    fn test_unknown_device() {
        let service = AuthService::new();
        let (mut devices, _) = registry_with_device();
        let request = signed(DeviceId::new(999), 0, 0, AccessType::SampleSensor0, &[0u8; 16]);

        let result = service.process(&mut devices, &request, now());
        assert!(matches!(result, Err(ServerError::UnknownDevice(_))));
    }

    #[test]
    fn test_rejected_requests_are_logged() {
        let service = AuthService::new();
        let (mut devices, id) = registry_with_device();

        let mut forged = signed(id, 0, 1, AccessType::SampleSensor0, &[0u8; 16]);
        forged.mac_tag[0] ^= 0xff;
        assert!(service.process(&mut devices, &forged, now()).is_err());

        let dummy = signed(id, 0, 0, AccessType::DummyPairingConfirmation, &[0u8; 16]);
        service.process(&mut devices, &dummy, now()).unwrap();

        let log = devices.get(id).unwrap().log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].request, forged);
        assert!(!log[0].paired_at_arrival);
        assert!(!log[1].paired_at_arrival);
        assert_eq!(log[1].arrival_time, now());
    }
}
