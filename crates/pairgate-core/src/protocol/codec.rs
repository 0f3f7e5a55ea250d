// ============================================
// File: crates/pairgate-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Turns raw frame bytes from an untrusted socket into typed requests,
//! and typed responses back into frames.
//!
//! ## Main Functionality
//! - `Codec` trait: Generic encode/decode interface per payload struct
//! - `ProtocolCodec`: Header validation, request dispatch, frame encoding
//! - Convenience functions for the frames the server and gateways emit
//!
//! ## Parsing Strategy
//! 1. Read the 3 header bytes into an unvalidated [`Header`]
//! 2. `validate_header`: type must be inbound, length must fit the type
//! 3. Read exactly `payload_len` bytes
//! 4. `decode_request`: dispatch on the validated type, check field domains
//!
//! A header that fails step 2 still tells the reader how many bytes to
//! skip, which keeps the stream framed.
//!
//! ## ⚠️ Important Note for Next Developer
//! - AuthRequest length is exact (46), SignupRequest length is a lower bound
//! - No field is extracted before the length check has passed
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};

use pairgate_common::{DeviceId, KEY_SIZE};

use crate::crypto::{MAC_SIZE, NONCE_SIZE};
use crate::error::{CoreError, Result};
use crate::protocol::messages::{
    AccessType, AuthRequest, AuthResponse, Header, PayloadType, Request, SignupRequest,
    SignupResponse, AUTH_REQUEST_SIZE, AUTH_RESPONSE_SIZE, HEADER_SIZE,
    SIGNUP_REQUEST_MIN_SIZE, SIGNUP_RESPONSE_SIZE,
};

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding protocol payloads.
///
/// Implementations handle the payload only, never the frame header.
pub trait Codec<T> {
    /// Encodes a payload into a byte buffer.
    fn encode(&self, msg: &T, buf: &mut BytesMut);

    /// Decodes a payload from bytes.
    ///
    /// # Returns
    /// The decoded payload, or an error if the bytes are too short or a
    /// field is outside its domain.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// ProtocolCodec
// ============================================

/// Codec implementation for all protocol payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolCodec;

impl ProtocolCodec {
    /// Creates a new protocol codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks that a header announces an acceptable inbound payload.
    ///
    /// # Errors
    /// - `InvalidPayloadType` for any code other than 0 or 2
    /// - `InvalidPayloadLen` if an AuthRequest is not exactly 46 bytes or
    ///   a SignupRequest is shorter than 98 bytes
    pub fn validate_header(header: &Header) -> Result<PayloadType> {
        let payload_type = PayloadType::from_byte(header.type_code)
            .filter(|ty| ty.is_inbound())
            .ok_or(CoreError::InvalidPayloadType(header.type_code))?;

        let len = usize::from(header.payload_len);
        match payload_type {
            PayloadType::AuthRequest if len != AUTH_REQUEST_SIZE => Err(CoreError::invalid_len(
                header.type_code,
                AUTH_REQUEST_SIZE.to_string(),
                len,
            )),
            PayloadType::SignupRequest if len < SIGNUP_REQUEST_MIN_SIZE => {
                Err(CoreError::invalid_len(
                    header.type_code,
                    format!(">= {SIGNUP_REQUEST_MIN_SIZE}"),
                    len,
                ))
            }
            _ => Ok(payload_type),
        }
    }

    /// Decodes a payload whose header already passed [`Self::validate_header`].
    ///
    /// # Errors
    /// Returns `InvalidAccessType` for an unknown access type, or
    /// `InvalidPayloadType` if called with an outbound type.
    pub fn decode_request(&self, payload_type: PayloadType, mut payload: Bytes) -> Result<Request> {
        match payload_type {
            PayloadType::SignupRequest => {
                <Self as Codec<SignupRequest>>::decode(self, &mut payload).map(Request::Signup)
            }
            PayloadType::AuthRequest => {
                <Self as Codec<AuthRequest>>::decode(self, &mut payload).map(Request::Auth)
            }
            other => Err(CoreError::InvalidPayloadType(other.as_byte())),
        }
    }

    /// Encodes a payload preceded by its header.
    ///
    /// # Errors
    /// Returns `InvalidPayloadLen` if the payload does not fit in a `u16`.
    pub fn encode_frame<T>(&self, payload_type: PayloadType, msg: &T) -> Result<BytesMut>
    where
        Self: Codec<T>,
    {
        let mut payload = BytesMut::new();
        <Self as Codec<T>>::encode(self, msg, &mut payload);

        let payload_len = u16::try_from(payload.len()).map_err(|_| {
            CoreError::invalid_len(payload_type.as_byte(), format!("<= {}", u16::MAX), payload.len())
        })?;

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        frame.put_slice(&Header::new(payload_type, payload_len).to_bytes());
        frame.put_slice(&payload);
        Ok(frame)
    }
}

// ============================================
// SignupRequest Codec
// ============================================

impl Codec<SignupRequest> for ProtocolCodec {
    fn encode(&self, msg: &SignupRequest, buf: &mut BytesMut) {
        buf.reserve(msg.encoded_len());
        buf.put_u16_le(msg.device_type);
        buf.put_slice(&msg.static_public_key);
        buf.put_slice(&msg.ephemeral_public_key);
        buf.put_slice(&msg.mac_tag);
        buf.put_slice(&msg.capability_uri);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<SignupRequest> {
        if buf.len() < SIGNUP_REQUEST_MIN_SIZE {
            return Err(CoreError::too_short(SIGNUP_REQUEST_MIN_SIZE, buf.len()));
        }

        let device_type = buf.get_u16_le();

        let mut static_public_key = [0u8; KEY_SIZE];
        buf.copy_to_slice(&mut static_public_key);

        let mut ephemeral_public_key = [0u8; KEY_SIZE];
        buf.copy_to_slice(&mut ephemeral_public_key);

        let mut mac_tag = [0u8; MAC_SIZE];
        buf.copy_to_slice(&mut mac_tag);

        // Capability URI is whatever remains
        let capability_uri = buf.split_to(buf.len()).to_vec();

        Ok(SignupRequest {
            device_type,
            static_public_key,
            ephemeral_public_key,
            mac_tag,
            capability_uri,
        })
    }
}

// ============================================
// AuthRequest Codec
// ============================================

impl Codec<AuthRequest> for ProtocolCodec {
    fn encode(&self, msg: &AuthRequest, buf: &mut BytesMut) {
        buf.reserve(AUTH_REQUEST_SIZE);
        buf.put_u32_le(msg.device_id.value());
        buf.put_u32_le(msg.reboot_counter);
        buf.put_u32_le(msg.request_counter);
        buf.put_u16_le(msg.access_type.as_u16());
        buf.put_slice(&msg.mac_tag);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<AuthRequest> {
        if buf.len() < AUTH_REQUEST_SIZE {
            return Err(CoreError::too_short(AUTH_REQUEST_SIZE, buf.len()));
        }

        let device_id = DeviceId::new(buf.get_u32_le());
        let reboot_counter = buf.get_u32_le();
        let request_counter = buf.get_u32_le();

        let raw_access = buf.get_u16_le();
        let access_type =
            AccessType::from_u16(raw_access).ok_or(CoreError::InvalidAccessType(raw_access))?;

        let mut mac_tag = [0u8; MAC_SIZE];
        buf.copy_to_slice(&mut mac_tag);

        Ok(AuthRequest {
            device_id,
            reboot_counter,
            request_counter,
            access_type,
            mac_tag,
        })
    }
}

// ============================================
// SignupResponse Codec
// ============================================

impl Codec<SignupResponse> for ProtocolCodec {
    fn encode(&self, msg: &SignupResponse, buf: &mut BytesMut) {
        buf.reserve(SIGNUP_RESPONSE_SIZE);
        buf.put_u32_le(msg.device_id.value());
        buf.put_slice(&msg.server_ephemeral_public_key);
        buf.put_slice(&msg.mac_tag);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<SignupResponse> {
        if buf.len() < SIGNUP_RESPONSE_SIZE {
            return Err(CoreError::too_short(SIGNUP_RESPONSE_SIZE, buf.len()));
        }

        let device_id = DeviceId::new(buf.get_u32_le());

        let mut server_ephemeral_public_key = [0u8; KEY_SIZE];
        buf.copy_to_slice(&mut server_ephemeral_public_key);

        let mut mac_tag = [0u8; MAC_SIZE];
        buf.copy_to_slice(&mut mac_tag);

        Ok(SignupResponse {
            device_id,
            server_ephemeral_public_key,
            mac_tag,
        })
    }
}

// ============================================
// AuthResponse Codec
// ============================================

impl Codec<AuthResponse> for ProtocolCodec {
    fn encode(&self, msg: &AuthResponse, buf: &mut BytesMut) {
        buf.reserve(AUTH_RESPONSE_SIZE);
        buf.put_slice(&msg.nonce);
        buf.put_slice(&msg.auth_tag);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<AuthResponse> {
        if buf.len() < AUTH_RESPONSE_SIZE {
            return Err(CoreError::too_short(AUTH_RESPONSE_SIZE, buf.len()));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        buf.copy_to_slice(&mut nonce);

        let mut auth_tag = [0u8; MAC_SIZE];
        buf.copy_to_slice(&mut auth_tag);

        Ok(AuthResponse { nonce, auth_tag })
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Encodes a complete SignupResponse frame (71 bytes).
#[must_use]
pub fn encode_signup_response_frame(msg: &SignupResponse) -> BytesMut {
    fixed_frame(PayloadType::SignupResponse, SIGNUP_RESPONSE_SIZE, msg)
}

/// Encodes a complete AuthResponse frame (51 bytes).
#[must_use]
pub fn encode_auth_response_frame(msg: &AuthResponse) -> BytesMut {
    fixed_frame(PayloadType::AuthResponse, AUTH_RESPONSE_SIZE, msg)
}

/// Encodes a complete AuthRequest frame (49 bytes).
#[must_use]
pub fn encode_auth_request_frame(msg: &AuthRequest) -> BytesMut {
    fixed_frame(PayloadType::AuthRequest, AUTH_REQUEST_SIZE, msg)
}

/// Encodes a complete SignupRequest frame.
///
/// # Errors
/// Fails if the capability URI pushes the payload past `u16::MAX`.
pub fn encode_signup_request_frame(msg: &SignupRequest) -> Result<BytesMut> {
    ProtocolCodec.encode_frame(PayloadType::SignupRequest, msg)
}

/// Decodes a SignupResponse payload (header already stripped).
pub fn decode_signup_response(payload: &[u8]) -> Result<SignupResponse> {
    let mut bytes = Bytes::copy_from_slice(payload);
    ProtocolCodec.decode(&mut bytes)
}

/// Decodes an AuthResponse payload (header already stripped).
pub fn decode_auth_response(payload: &[u8]) -> Result<AuthResponse> {
    let mut bytes = Bytes::copy_from_slice(payload);
    ProtocolCodec.decode(&mut bytes)
}

fn fixed_frame<T>(payload_type: PayloadType, size: usize, msg: &T) -> BytesMut
where
    ProtocolCodec: Codec<T>,
{
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + size);
    let payload_len = u16::try_from(size).unwrap_or(u16::MAX);
    buf.put_slice(&Header::new(payload_type, payload_len).to_bytes());
    <ProtocolCodec as Codec<T>>::encode(&ProtocolCodec, msg, &mut buf);
    buf
}

// ============================================
// Tests
// ============================================
