// ============================================
// File: crates/pairgate-server/src/handlers/connection.rs
// ============================================
//! # Connection Task
//!
//! ## Creation Reason
//! Reads framed requests from one gateway connection and forwards them
//! to the orchestrator, in arrival order.
//!
//! ## Main Functionality
//! - Reads the 3-byte header, then exactly the declared payload
//! - Drops frames with an unknown type, a bad length or a bad field,
//!   and keeps reading
//! - Hands the write half over with the first signup request
//! - Stamps auth requests with their arrival time
//! - Reports the close to the orchestrator once the write half is gone
//!
//! ## ⚠️ Important Note for Next Developer
//! - The payload is always consumed, even for a rejected header, so the
//!   stream stays aligned on frame boundaries
//! - Queue sends wait when the orchestrator is busy. That backpressure
//!   reaches the gateway through TCP, requests are never dropped here.
//!
//! ## Last Modified
//! v0.1.0 - Initial connection task

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::AsyncRead;
use tracing::{debug, trace, warn};

use pairgate_common::{ConnectionId, Timestamp};
use pairgate_core::protocol::{Header, ProtocolCodec, Request, HEADER_SIZE};
use pairgate_transport::{read_exact_or_closed, ResponseSink};

use crate::error::{Result, ServerError};
use crate::orchestrator::{AuthEvent, OrchestratorHandle, SignupEvent};

/// Per-connection read loop.
pub struct ConnectionTask<R> {
    id: ConnectionId,
    peer: SocketAddr,
    reader: R,
    sink: Option<Box<dyn ResponseSink>>,
    handle: OrchestratorHandle,
    codec: ProtocolCodec,
}

impl<R> ConnectionTask<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Creates a task for an accepted connection.
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        reader: R,
        sink: Box<dyn ResponseSink>,
        handle: OrchestratorHandle,
    ) -> Self {
        Self {
            id,
            peer,
            reader,
            sink: Some(sink),
            handle,
            codec: ProtocolCodec::new(),
        }
    }

    /// Runs until the peer disconnects or the orchestrator stops.
    pub async fn run(mut self) {
        debug!(conn_id = %self.id, peer = %self.peer, "Connection task started");

        match self.read_loop().await {
            Err(ServerError::Transport(e)) if e.is_connection_closed() => {
                debug!(conn_id = %self.id, "Connection closed by peer");
            }
            Err(ServerError::OrchestratorStopped) => {
                debug!(conn_id = %self.id, "Orchestrator stopped, closing connection");
            }
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "Connection task ended");
            }
            Ok(()) => {}
        }

        // The orchestrator only holds a write half if we handed one over.
        if self.sink.is_none() {
            let _ = self.handle.connection_closed(self.id).await;
        }
    }

    async fn read_loop(&mut self) -> Result<()> {
        loop {
            if let Some(request) = self.read_request().await? {
                self.forward(request).await?;
            }
        }
    }

    /// Reads one frame. `Ok(None)` means the frame was read and dropped.
    async fn read_request(&mut self) -> Result<Option<Request>> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        read_exact_or_closed(&mut self.reader, &mut header_bytes).await?;
        let header = Header::from_bytes(header_bytes);

        let mut payload = vec![0u8; usize::from(header.payload_len)];
        read_exact_or_closed(&mut self.reader, &mut payload).await?;

        let payload_type = match ProtocolCodec::validate_header(&header) {
            Ok(payload_type) => payload_type,
            Err(e) => {
                warn!(
                    conn_id = %self.id,
                    type_code = header.type_code,
                    len = header.payload_len,
                    error = %e,
                    "Invalid header, frame dropped"
                );
                return Ok(None);
            }
        };

        match self.codec.decode_request(payload_type, Bytes::from(payload)) {
            Ok(request) => Ok(Some(request)),
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "Malformed payload, frame dropped");
                Ok(None)
            }
        }
    }

    async fn forward(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Signup(request) => {
                trace!(conn_id = %self.id, "Forwarding signup request");
                self.handle
                    .submit_signup(SignupEvent {
                        connection: self.id,
                        sink: self.sink.take(),
                        request,
                    })
                    .await
            }
            Request::Auth(request) => {
                trace!(conn_id = %self.id, device_id = %request.device_id, "Forwarding auth request");
                self.handle
                    .submit_auth(AuthEvent {
                        connection: self.id,
                        request,
                        arrived_at: Timestamp::now(),
                    })
                    .await
            }
        }
    }
}

impl<R> std::fmt::Debug for ConnectionTask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTask")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("holds_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use pairgate_common::DeviceId;
    use pairgate_core::crypto::{GatewayHandshake, PresharedKey};
    use pairgate_core::protocol::codec::{encode_auth_request_frame, encode_signup_request_frame};
    use pairgate_core::protocol::{AccessType, AuthRequest};
    use pairgate_transport::MockSink;
    use tokio::io::AsyncWriteExt;

    use crate::orchestrator::Orchestrator;
    use crate::services::ScanRecord;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_bad_frames_skipped_and_signup_forwarded() {
        let (orchestrator, handle) = Orchestrator::new(16);
        tokio::spawn(orchestrator.run());

        let psk = PresharedKey::from_bytes([3u8; 32]);
        let gateway = GatewayHandshake::generate(psk.clone()).unwrap();
        handle
            .submit_scan(ScanRecord::new(gateway.static_public_key(), psk))
            .await
            .unwrap();

        let (mut client, server) = tokio::io::duplex(4096);
        let sink = MockSink::new();
        let task = ConnectionTask::new(
            ConnectionId::new(0),
            peer(),
            server,
            Box::new(sink.clone()),
            handle.clone(),
        );
        let join = tokio::spawn(task.run());

        // Unknown type with a payload, then an auth request with the
        // wrong length, then a valid signup.
        client.write_all(&[7, 2, 0, 0xaa, 0xbb]).await.unwrap();
        client.write_all(&[2, 3, 0, 1, 2, 3]).await.unwrap();
        let signup = encode_signup_request_frame(&gateway.signup_request(1, b"/dev0".to_vec())).unwrap();
        client.write_all(&signup).await.unwrap();
        drop(client);
        join.await.unwrap();

        let devices = handle.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].capability_uri, "/dev0");
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_for_unknown_device_keeps_connection() {
        let (orchestrator, handle) = Orchestrator::new(16);
        tokio::spawn(orchestrator.run());

        let psk = PresharedKey::from_bytes([5u8; 32]);
        let gateway = GatewayHandshake::generate(psk.clone()).unwrap();
        handle
            .submit_scan(ScanRecord::new(gateway.static_public_key(), psk))
            .await
            .unwrap();

        let (mut client, server) = tokio::io::duplex(4096);
        let sink = MockSink::new();
        let task = ConnectionTask::new(
            ConnectionId::new(1),
            peer(),
            server,
            Box::new(sink.clone()),
            handle.clone(),
        );
        let join = tokio::spawn(task.run());

        let request = AuthRequest {
            device_id: DeviceId::new(999),
            reboot_counter: 0,
            request_counter: 0,
            access_type: AccessType::SampleSensor0,
            mac_tag: [0u8; 32],
        };
        client.write_all(&encode_auth_request_frame(&request)).await.unwrap();
        client.write_all(&encode_auth_request_frame(&request)).await.unwrap();

        // The same connection still carries a signup afterwards.
        let signup = encode_signup_request_frame(&gateway.signup_request(3, Vec::new())).unwrap();
        client.write_all(&signup).await.unwrap();
        drop(client);
        join.await.unwrap();

        let devices = handle.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_type, 3);
        // Only the signup response, nothing for the unknown device.
        assert_eq!(sink.sent_count(), 1);
        assert_eq!(sink.sent_frames()[0].len(), 71);
    }

    #[tokio::test]
    async fn test_bad_access_type_keeps_framing() {
        let (orchestrator, handle) = Orchestrator::new(16);
        tokio::spawn(orchestrator.run());

        let psk = PresharedKey::from_bytes([4u8; 32]);
        let gateway = GatewayHandshake::generate(psk.clone()).unwrap();
        handle
            .submit_scan(ScanRecord::new(gateway.static_public_key(), psk))
            .await
            .unwrap();

        let (mut client, server) = tokio::io::duplex(4096);
        let sink = MockSink::new();
        let task = ConnectionTask::new(
            ConnectionId::new(2),
            peer(),
            server,
            Box::new(sink.clone()),
            handle.clone(),
        );
        let join = tokio::spawn(task.run());

        // Correct length, access type 0x70 outside the domain.
        let mut frame = vec![2u8, 46, 0];
        frame.extend_from_slice(&[0u8; 12]);
        frame.extend_from_slice(&0x70u16.to_le_bytes());
        frame.extend_from_slice(&[0u8; 32]);
        client.write_all(&frame).await.unwrap();

        let signup = encode_signup_request_frame(&gateway.signup_request(2, Vec::new())).unwrap();
        client.write_all(&signup).await.unwrap();
        drop(client);
        join.await.unwrap();

        assert_eq!(handle.list_devices().await.unwrap().len(), 1);
        assert_eq!(sink.sent_count(), 1);
    }
}
