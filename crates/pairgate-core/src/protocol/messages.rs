// ============================================
// File: crates/pairgate-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines every structure exchanged between a gateway and the pairing
//! server, plus the typed request union the connection tasks forward.
//!
//! ## Message Sizes
//! | Message | Payload size (bytes) |
//! |---------|----------------------|
//! | SignupRequest | >= 98 (capability URI is a suffix) |
//! | SignupResponse | 68 |
//! | AuthRequest | 46 |
//! | AuthResponse | 48 |
//!
//! ## Wire Format (Little Endian)
//! All multi-byte integers are encoded in little-endian byte order.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field order is fixed by deployed gateways, do not reorder
//! - `AccessType::DummyPairingConfirmation` is 0x69, not 4
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use pairgate_common::{DeviceId, KEY_SIZE};

use crate::crypto::{MAC_SIZE, NONCE_SIZE};

// ============================================
// Size Constants
// ============================================

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 3;

/// Minimum size of a SignupRequest payload (empty capability URI).
pub const SIGNUP_REQUEST_MIN_SIZE: usize = 2 + KEY_SIZE + KEY_SIZE + MAC_SIZE;

/// Exact size of an AuthRequest payload.
pub const AUTH_REQUEST_SIZE: usize = 4 + 4 + 4 + 2 + MAC_SIZE;

/// Exact size of a SignupResponse payload.
pub const SIGNUP_RESPONSE_SIZE: usize = 4 + KEY_SIZE + MAC_SIZE;

/// Exact size of an AuthResponse payload.
pub const AUTH_RESPONSE_SIZE: usize = NONCE_SIZE + MAC_SIZE;

// ============================================
// PayloadType
// ============================================

/// Payload type code carried in byte 0 of every frame.
///
/// # Values
/// | Value | Type | Direction |
/// |-------|------|-----------|
/// | 0 | SignupRequest | gateway → server |
/// | 1 | SignupResponse | server → gateway |
/// | 2 | AuthRequest | gateway → server |
/// | 3 | AuthResponse | server → gateway |
/// | 4 | Control | reserved |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadType {
    /// Gateway registration request.
    SignupRequest = 0,
    /// Server answer to a signup.
    SignupResponse = 1,
    /// Gateway authentication request.
    AuthRequest = 2,
    /// Server answer to an authentication.
    AuthResponse = 3,
    /// Reserved, never produced or accepted.
    Control = 4,
}

impl PayloadType {
    /// Converts a byte to a `PayloadType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::SignupRequest),
            1 => Some(Self::SignupResponse),
            2 => Some(Self::AuthRequest),
            3 => Some(Self::AuthResponse),
            4 => Some(Self::Control),
            _ => None,
        }
    }

    /// Converts to the wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns `true` for the two types a server accepts.
    #[must_use]
    pub const fn is_inbound(self) -> bool {
        matches!(self, Self::SignupRequest | Self::AuthRequest)
    }
}

// ============================================
// Header
// ============================================

/// Raw 3-byte frame header.
///
/// Kept unvalidated so a reader can always skip `payload_len` bytes,
/// whatever the type code says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload type code (not yet checked).
    pub type_code: u8,
    /// Declared payload length.
    pub payload_len: u16,
}

impl Header {
    /// Creates a header for an outbound payload.
    #[must_use]
    pub const fn new(payload_type: PayloadType, payload_len: u16) -> Self {
        Self {
            type_code: payload_type.as_byte(),
            payload_len,
        }
    }

    /// Parses the three header bytes. Never fails.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            type_code: bytes[0],
            payload_len: u16::from_le_bytes([bytes[1], bytes[2]]),
        }
    }

    /// Serializes to the three header bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let len = self.payload_len.to_le_bytes();
        [self.type_code, len[0], len[1]]
    }
}

// ============================================
// AccessType
// ============================================

/// What a gateway asks to do in an AuthRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AccessType {
    /// Read sensor 0.
    SampleSensor0 = 0,
    /// Read sensor 1.
    SampleSensor1 = 1,
    /// Drive actuator 0.
    ControlActuator0 = 2,
    /// Drive actuator 1.
    ControlActuator1 = 3,
    /// Proves key possession only. Never answered.
    DummyPairingConfirmation = 0x69,
}

impl AccessType {
    /// Converts a wire value to an `AccessType`.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::SampleSensor0),
            1 => Some(Self::SampleSensor1),
            2 => Some(Self::ControlActuator0),
            3 => Some(Self::ControlActuator1),
            0x69 => Some(Self::DummyPairingConfirmation),
            _ => None,
        }
    }

    /// Converts to the wire value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns `true` for the pairing-confirmation sentinel.
    #[must_use]
    pub const fn is_dummy(self) -> bool {
        matches!(self, Self::DummyPairingConfirmation)
    }
}

// ============================================
// SignupRequest
// ============================================

/// Gateway registration request.
///
/// # Wire Format
/// ```text
/// ┌────────────┬────────────┬──────────────┬─────────┬────────────────┐
/// │ devType(2) │ staticPub  │ ephemeralPub │ macTag  │ capabilityURI  │
/// │            │ (32)       │ (32)         │ (32)    │ (rest)         │
/// └────────────┴────────────┴──────────────┴─────────┴────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    /// Device type announced by the gateway.
    pub device_type: u16,
    /// Gateway static X25519 public key, matched against scans.
    pub static_public_key: [u8; KEY_SIZE],
    /// Gateway ephemeral X25519 public key.
    pub ephemeral_public_key: [u8; KEY_SIZE],
    /// Gateway MAC tag. Carried but not checked by the server.
    pub mac_tag: [u8; MAC_SIZE],
    /// Capability URI, raw bytes.
    pub capability_uri: Vec<u8>,
}

impl SignupRequest {
    /// Payload length on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        SIGNUP_REQUEST_MIN_SIZE + self.capability_uri.len()
    }
}

// ============================================
// AuthRequest
// ============================================

/// Gateway authentication request.
///
/// # Wire Format
/// ```text
/// ┌──────────┬───────────┬────────────┬───────────────┬─────────┐
/// │ devId(4) │ reboot(4) │ request(4) │ accessType(2) │ mac(32) │
/// └──────────┴───────────┴────────────┴───────────────┴─────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// Device the request claims to come from.
    pub device_id: DeviceId,
    /// Gateway reboot counter.
    pub reboot_counter: u32,
    /// Gateway request counter.
    pub request_counter: u32,
    /// Requested access.
    pub access_type: AccessType,
    /// HMAC over counters, access type and the last server nonce.
    pub mac_tag: [u8; MAC_SIZE],
}

// ============================================
// Responses
// ============================================

/// Server answer to a successful signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupResponse {
    /// Newly assigned device id.
    pub device_id: DeviceId,
    /// Server ephemeral public key `X`.
    pub server_ephemeral_public_key: [u8; KEY_SIZE],
    /// `HMAC(psk, X || gateway ephemeral public key)`.
    pub mac_tag: [u8; MAC_SIZE],
}

/// Server answer to an accepted, non-dummy authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// Fresh challenge nonce, required in the next request MAC.
    pub nonce: [u8; NONCE_SIZE],
    /// `HMAC(K_s_gw, nonce || request MAC)`.
    pub auth_tag: [u8; MAC_SIZE],
}

// ============================================
// Request
// ============================================

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Registration request.
    Signup(SignupRequest),
    /// Authentication request.
    Auth(AuthRequest),
}

// ============================================
// Tests
// ============================================
