// ============================================
// File: crates/pairgate-server/tests/pairing_flow.rs
// ============================================
//! End-to-end pairing over loopback TCP: signup, dummy pairing
//! confirmation, then a chain of authenticated requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use pairgate_common::DeviceId;
use pairgate_core::crypto::mac::{auth_request_tag, auth_response_tag};
use pairgate_core::crypto::{GatewayHandshake, PresharedKey, SessionKeys, NONCE_SIZE};
use pairgate_core::protocol::codec::{
    decode_auth_response, decode_signup_response, encode_auth_request_frame,
    encode_signup_request_frame,
};
use pairgate_core::protocol::{AccessType, AuthRequest, HEADER_SIZE};
use pairgate_server::{Server, ServerConfig};

const NO_RESPONSE_WAIT: Duration = Duration::from_millis(200);

struct Gateway {
    stream: TcpStream,
    device_id: DeviceId,
    keys: SessionKeys,
    last_randomness: [u8; NONCE_SIZE],
}

impl Gateway {
    fn auth_request(&self, reboot: u32, request: u32, access_type: AccessType) -> AuthRequest {
        let mac_tag = auth_request_tag(
            &self.keys.gateway_to_server,
            reboot,
            request,
            access_type,
            &self.last_randomness,
        )
        .unwrap();
        AuthRequest {
            device_id: self.device_id,
            reboot_counter: reboot,
            request_counter: request,
            access_type,
            mac_tag,
        }
    }

    async fn send(&mut self, request: &AuthRequest) {
        self.stream
            .write_all(&encode_auth_request_frame(request))
            .await
            .unwrap();
    }

    /// Sends an authenticated request and checks the server's answer.
    async fn authenticate(&mut self, reboot: u32, request: u32) {
        let request = self.auth_request(reboot, request, AccessType::SampleSensor0);
        self.send(&request).await;

        let mut frame = [0u8; 51];
        tokio::time::timeout(Duration::from_secs(5), self.stream.read_exact(&mut frame))
            .await
            .expect("auth response timed out")
            .unwrap();
        assert_eq!(&frame[..HEADER_SIZE], &[3u8, 48, 0]);

        let response = decode_auth_response(&frame[HEADER_SIZE..]).unwrap();
        let expected = auth_response_tag(
            &self.keys.server_to_gateway,
            &response.nonce,
            &request.mac_tag,
        )
        .unwrap();
        assert_eq!(response.auth_tag, expected);
        assert_ne!(response.nonce, self.last_randomness);

        self.last_randomness = response.nonce;
    }

    async fn expect_silence(&mut self) {
        let mut byte = [0u8; 1];
        let read = tokio::time::timeout(NO_RESPONSE_WAIT, self.stream.read(&mut byte)).await;
        assert!(read.is_err(), "server answered a request that must be dropped");
    }
}

async fn start_server(handshake: &GatewayHandshake, psk: &PresharedKey) -> (Arc<Server>, std::net::SocketAddr) {
    let config: ServerConfig = format!(
        r#"
[network]
listen_addr = "127.0.0.1:0"

[console]
enabled = false

[[scans]]
static_public_key = "{}"
preshared_key = "{}"
"#,
        hex::encode(handshake.static_public_key()),
        hex::encode(psk.as_bytes()),
    )
    .parse()
    .unwrap();

    let server = Arc::new(Server::new(config));
    let transport = server.bind().await.unwrap();
    let addr = transport.local_addr();

    let serving = Arc::clone(&server);
    tokio::spawn(async move { serving.serve(transport).await });

    (server, addr)
}

async fn sign_up(addr: std::net::SocketAddr, handshake: &GatewayHandshake) -> Gateway {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // A frame with an unknown type is skipped without closing the socket.
    stream.write_all(&[9, 2, 0, 0xde, 0xad]).await.unwrap();

    let signup = handshake.signup_request(7, b"coap://gw/sensors".to_vec());
    stream
        .write_all(&encode_signup_request_frame(&signup).unwrap())
        .await
        .unwrap();

    let mut frame = [0u8; 71];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut frame))
        .await
        .expect("signup response timed out")
        .unwrap();
    assert_eq!(&frame[..HEADER_SIZE], &[1u8, 68, 0]);

    let response = decode_signup_response(&frame[HEADER_SIZE..]).unwrap();
    let keys = handshake.complete(&response).unwrap();

    Gateway {
        stream,
        device_id: response.device_id,
        keys,
        last_randomness: [0u8; NONCE_SIZE],
    }
}

#[tokio::test]
async fn test_pairing_and_authentication_over_tcp() {
    let psk = PresharedKey::from_bytes([0x5a; 32]);
    let handshake = GatewayHandshake::generate(psk.clone()).unwrap();
    let (server, addr) = start_server(&handshake, &psk).await;

    let mut gateway = sign_up(addr, &handshake).await;
    assert_eq!(gateway.device_id, DeviceId::new(0));

    // Dummy pairing confirmation is accepted silently.
    let dummy = gateway.auth_request(0, 0, AccessType::DummyPairingConfirmation);
    gateway.send(&dummy).await;
    gateway.expect_silence().await;

    gateway.authenticate(0, 1).await;
    gateway.authenticate(0, 2).await;

    // Unknown device: dropped, no answer, connection stays open.
    let mut stranger = gateway.auth_request(0, 3, AccessType::SampleSensor1);
    stranger.device_id = DeviceId::new(999);
    gateway.send(&stranger).await;
    gateway.expect_silence().await;

    // Replay of an old request counter: dropped.
    let replay = gateway.auth_request(0, 1, AccessType::SampleSensor0);
    gateway.send(&replay).await;
    gateway.expect_silence().await;

    // A reboot bumps the reboot counter; both counters must not go back.
    gateway.authenticate(1, 3).await;

    server.shutdown();
}

#[tokio::test]
async fn test_signup_without_scan_gets_no_answer() {
    let psk = PresharedKey::from_bytes([0x11; 32]);
    let scanned = GatewayHandshake::generate(psk.clone()).unwrap();
    let (server, addr) = start_server(&scanned, &psk).await;

    let unscanned = GatewayHandshake::generate(psk).unwrap();
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(&encode_signup_request_frame(&unscanned.signup_request(1, Vec::new())).unwrap())
        .await
        .unwrap();

    let mut byte = [0u8; 1];
    let read = tokio::time::timeout(NO_RESPONSE_WAIT, stream.read(&mut byte)).await;
    assert!(read.is_err());

    // The scanned gateway still signs up on its own connection.
    let gateway = sign_up(addr, &scanned).await;
    assert_eq!(gateway.device_id, DeviceId::new(0));

    server.shutdown();
}
