// ============================================
// File: crates/pairgate-server/src/orchestrator.rs
// ============================================
//! # Orchestrator
//!
//! ## Creation Reason
//! All protocol state (scans, devices, gateway write halves) is owned
//! by one task. Connection tasks and the console talk to it through
//! bounded queues, so no state is shared and no lock is needed.
//!
//! ## Main Functionality
//! - `Orchestrator`: The owning task, run with [`Orchestrator::run`]
//! - `OrchestratorHandle`: Cloneable producer side of the four queues
//! - `SignupEvent` / `AuthEvent` / `ControlEvent`: Queue payloads
//!
//! ## Event Loop
//! ```text
//!   scan_tx ──┐
//! signup_tx ──┤   biased select, one event at a time
//!   auth_tx ──┼──────────────────────────────────────► ProtocolState
//! control_tx ─┘   priority: scan > signup > auth > control
//!
//! signup:  register sink? ─► resolve scan ─► stage ─► send ─► commit
//!                               │                      │
//!                     lookup, drain, lookup      failure: discard
//! auth:    AuthService::process ─► send response (if any)
//! control: connection closed, console queries (oneshot replies)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Control is served last. A Connection Task enqueues its close
//!   notice after its last request, so a signup carrying the write half
//!   is always handled before the close notice for that connection.
//! - Responses are written inline. A stalled gateway holds the loop for
//!   at most the sink's write timeout times its retry count.
//! - The loop ends only when every handle has been dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial orchestrator

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use pairgate_common::{ConnectionId, DeviceId, KEY_SIZE, Timestamp};
use pairgate_core::crypto::HandshakeCrypto;
use pairgate_core::protocol::{AuthRequest, SignupRequest};
use pairgate_transport::ResponseSink;

use crate::error::{Result, ServerError};
use crate::services::{
    AuthOutcome, AuthService, ConnectionTable, DeviceRegistry, DeviceSummary, HandshakeService,
    LogEntry, ScanRecord, ScanRegistry,
};

// ============================================
// Events
// ============================================

/// A decoded signup request.
pub struct SignupEvent {
    /// Connection the request arrived on.
    pub connection: ConnectionId,
    /// Write half of that connection, present on its first signup only.
    pub sink: Option<Box<dyn ResponseSink>>,
    /// The request.
    pub request: SignupRequest,
}

impl fmt::Debug for SignupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupEvent")
            .field("connection", &self.connection)
            .field("has_sink", &self.sink.is_some())
            .field("request", &self.request)
            .finish()
    }
}

/// A decoded authentication request.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    /// Connection the request arrived on.
    pub connection: ConnectionId,
    /// The request.
    pub request: AuthRequest,
    /// When the Connection Task decoded it.
    pub arrived_at: Timestamp,
}

/// Housekeeping and console queries.
#[derive(Debug)]
pub enum ControlEvent {
    /// The Connection Task for this connection has ended.
    ConnectionClosed(ConnectionId),
    /// Audit log of one device.
    DeviceLog {
        /// Device to query.
        device_id: DeviceId,
        /// `None` if the device is unknown.
        reply: oneshot::Sender<Option<Vec<LogEntry>>>,
    },
    /// Summary of one device.
    DeviceSummary {
        /// Device to query.
        device_id: DeviceId,
        /// `None` if the device is unknown.
        reply: oneshot::Sender<Option<DeviceSummary>>,
    },
    /// Summaries of all devices.
    ListDevices {
        /// Summaries in id order.
        reply: oneshot::Sender<Vec<DeviceSummary>>,
    },
}

// ============================================
// OrchestratorHandle
// ============================================

/// Producer side of the orchestrator queues.
///
/// Every method waits while its queue is full.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    scan_tx: mpsc::Sender<ScanRecord>,
    signup_tx: mpsc::Sender<SignupEvent>,
    auth_tx: mpsc::Sender<AuthEvent>,
    control_tx: mpsc::Sender<ControlEvent>,
}

impl OrchestratorHandle {
    /// Enqueues a scan record.
    pub async fn submit_scan(&self, record: ScanRecord) -> Result<()> {
        self.scan_tx
            .send(record)
            .await
            .map_err(|_| ServerError::OrchestratorStopped)
    }

    /// Enqueues a signup request.
    pub async fn submit_signup(&self, event: SignupEvent) -> Result<()> {
        self.signup_tx
            .send(event)
            .await
            .map_err(|_| ServerError::OrchestratorStopped)
    }

    /// Enqueues an authentication request.
    pub async fn submit_auth(&self, event: AuthEvent) -> Result<()> {
        self.auth_tx
            .send(event)
            .await
            .map_err(|_| ServerError::OrchestratorStopped)
    }

    /// Reports that a connection has ended.
    pub async fn connection_closed(&self, connection: ConnectionId) -> Result<()> {
        self.control(ControlEvent::ConnectionClosed(connection)).await
    }

    /// Fetches a copy of a device's audit log.
    pub async fn device_log(&self, device_id: DeviceId) -> Result<Option<Vec<LogEntry>>> {
        let (reply, rx) = oneshot::channel();
        self.control(ControlEvent::DeviceLog { device_id, reply }).await?;
        rx.await.map_err(|_| ServerError::OrchestratorStopped)
    }

    /// Fetches a device summary.
    pub async fn device_summary(&self, device_id: DeviceId) -> Result<Option<DeviceSummary>> {
        let (reply, rx) = oneshot::channel();
        self.control(ControlEvent::DeviceSummary { device_id, reply })
            .await?;
        rx.await.map_err(|_| ServerError::OrchestratorStopped)
    }

    /// Fetches summaries of all devices.
    pub async fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        let (reply, rx) = oneshot::channel();
        self.control(ControlEvent::ListDevices { reply }).await?;
        rx.await.map_err(|_| ServerError::OrchestratorStopped)
    }

    async fn control(&self, event: ControlEvent) -> Result<()> {
        self.control_tx
            .send(event)
            .await
            .map_err(|_| ServerError::OrchestratorStopped)
    }
}

// ============================================
// Orchestrator
// ============================================

struct Inbox {
    scan_rx: mpsc::Receiver<ScanRecord>,
    signup_rx: mpsc::Receiver<SignupEvent>,
    auth_rx: mpsc::Receiver<AuthEvent>,
    control_rx: mpsc::Receiver<ControlEvent>,
}

/// The task that owns all protocol state.
pub struct Orchestrator {
    inbox: Inbox,
    state: ProtocolState,
}

impl Orchestrator {
    /// Creates the orchestrator and its handle. Each queue holds at most
    /// `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, OrchestratorHandle) {
        Self::with_handshake(capacity, HandshakeService::new())
    }

    /// Same as [`Orchestrator::new`] with a custom key agreement.
    #[must_use]
    pub fn with_crypto(
        capacity: usize,
        crypto: Arc<dyn HandshakeCrypto>,
    ) -> (Self, OrchestratorHandle) {
        Self::with_handshake(capacity, HandshakeService::with_crypto(crypto))
    }

    fn with_handshake(capacity: usize, handshake: HandshakeService) -> (Self, OrchestratorHandle) {
        let capacity = capacity.max(1);
        let (scan_tx, scan_rx) = mpsc::channel(capacity);
        let (signup_tx, signup_rx) = mpsc::channel(capacity);
        let (auth_tx, auth_rx) = mpsc::channel(capacity);
        let (control_tx, control_rx) = mpsc::channel(capacity);

        let orchestrator = Self {
            inbox: Inbox {
                scan_rx,
                signup_rx,
                auth_rx,
                control_rx,
            },
            state: ProtocolState {
                scans: ScanRegistry::new(),
                devices: DeviceRegistry::new(),
                connections: ConnectionTable::new(),
                handshake,
                auth: AuthService::new(),
                drain_limit: capacity,
            },
        };
        let handle = OrchestratorHandle {
            scan_tx,
            signup_tx,
            auth_tx,
            control_tx,
        };

        (orchestrator, handle)
    }

    /// Processes events until every handle is dropped.
    pub async fn run(self) {
        let Self {
            mut inbox,
            mut state,
        } = self;

        info!("Orchestrator started");

        loop {
            tokio::select! {
                biased;

                Some(record) = inbox.scan_rx.recv() => {
                    state.apply_scan(record);
                }
                Some(event) = inbox.signup_rx.recv() => {
                    let connection = event.connection;
                    if let Err(e) = state.handle_signup(event, &mut inbox.scan_rx).await {
                        log_dropped("signup", connection, &e);
                    }
                }
                Some(event) = inbox.auth_rx.recv() => {
                    let connection = event.connection;
                    if let Err(e) = state.handle_auth(event).await {
                        log_dropped("auth", connection, &e);
                    }
                }
                Some(event) = inbox.control_rx.recv() => {
                    state.handle_control(event);
                }
                else => break,
            }
        }

        info!(devices = state.devices.len(), "Orchestrator stopped");
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("scans", &self.state.scans.len())
            .field("devices", &self.state.devices.len())
            .field("connections", &self.state.connections)
            .finish()
    }
}

fn log_dropped(kind: &str, connection: ConnectionId, error: &ServerError) {
    match error {
        ServerError::UnknownDevice(_) | ServerError::ScanNotFound { .. } => {
            debug!(conn_id = %connection, error = %error, "Dropped {} request", kind);
        }
        e if e.is_suspicious() => {
            warn!(conn_id = %connection, error = %error, "Rejected {} request", kind);
        }
        _ => {
            warn!(conn_id = %connection, error = %error, "Failed to process {} request", kind);
        }
    }
}

// ============================================
// ProtocolState
// ============================================

struct ProtocolState {
    scans: ScanRegistry,
    devices: DeviceRegistry,
    connections: ConnectionTable,
    handshake: HandshakeService,
    auth: AuthService,
    drain_limit: usize,
}

impl ProtocolState {
    fn apply_scan(&mut self, record: ScanRecord) {
        let prefix = hex_prefix(&record.static_public_key);
        if self.scans.insert(record) {
            info!(key = %prefix, "Scan recorded");
        } else {
            debug!(key = %prefix, "Scan already known, ignored");
        }
    }

    /// Lookup, then one bounded drain of already queued scans, then
    /// lookup again.
    fn resolve_scan(
        &mut self,
        static_public_key: &[u8; KEY_SIZE],
        scan_rx: &mut mpsc::Receiver<ScanRecord>,
    ) -> Option<ScanRecord> {
        if let Some(record) = self.scans.lookup(static_public_key) {
            return Some(record.clone());
        }

        let mut drained = 0;
        while drained < self.drain_limit {
            match scan_rx.try_recv() {
                Ok(record) => {
                    self.apply_scan(record);
                    drained += 1;
                }
                Err(_) => break,
            }
        }
        if drained > 0 {
            trace!(drained, "Drained pending scans");
        }

        self.scans.lookup(static_public_key).cloned()
    }

    async fn handle_signup(
        &mut self,
        event: SignupEvent,
        scan_rx: &mut mpsc::Receiver<ScanRecord>,
    ) -> Result<()> {
        let SignupEvent {
            connection,
            sink,
            request,
        } = event;

        if let Some(sink) = sink {
            self.connections.register(connection, sink);
        }

        let scan = self
            .resolve_scan(&request.static_public_key, scan_rx)
            .ok_or_else(|| ServerError::scan_not_found(&request.static_public_key))?;

        let staged = self
            .handshake
            .stage(&mut self.devices, connection, &request, &scan)?;
        let device_id = staged.record.id;

        if let Err(e) = self.connections.send(connection, &staged.frame).await {
            warn!(
                conn_id = %connection,
                device_id = %device_id,
                "Signup response not delivered, record discarded"
            );
            return Err(e);
        }

        self.devices.commit(staged.record);
        info!(
            conn_id = %connection,
            device_id = %device_id,
            device_type = request.device_type,
            "Device registered"
        );
        Ok(())
    }

    async fn handle_auth(&mut self, event: AuthEvent) -> Result<()> {
        let outcome = self
            .auth
            .process(&mut self.devices, &event.request, event.arrived_at)?;

        match outcome {
            AuthOutcome::Paired(device_id) => {
                debug!(conn_id = %event.connection, device_id = %device_id, "Pairing confirmed");
            }
            AuthOutcome::Respond {
                device_id,
                connection,
                frame,
            } => {
                self.connections.send(connection, &frame).await?;
                info!(device_id = %device_id, "Authentication response sent");
            }
        }
        Ok(())
    }

    fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::ConnectionClosed(connection) => {
                if self.connections.remove(connection) {
                    debug!(conn_id = %connection, "Write half released");
                }
            }
            ControlEvent::DeviceLog { device_id, reply } => {
                let log = self.devices.get(device_id).map(|d| d.log().to_vec());
                let _ = reply.send(log);
            }
            ControlEvent::DeviceSummary { device_id, reply } => {
                let _ = reply.send(self.devices.get(device_id).map(|d| d.summary()));
            }
            ControlEvent::ListDevices { reply } => {
                let _ = reply.send(self.devices.summaries());
            }
        }
    }
}

fn hex_prefix(key: &[u8; KEY_SIZE]) -> String {
    hex::encode(&key[..4])
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use pairgate_common::parse_key_hex;
    use pairgate_core::crypto::mac::auth_request_tag;
    use pairgate_core::crypto::{
        GatewayHandshake, HandshakeOutcome, PresharedKey, SessionKeys, X25519KeyPair,
    };
    use pairgate_core::protocol::codec::{decode_auth_response, decode_signup_response};
    use pairgate_core::protocol::{AccessType, HEADER_SIZE};
    use pairgate_core::CoreError;
    use pairgate_transport::MockSink;

    const PRELOADED_KEY: &str = "50d2813e7611fe0177421385e193de017f2259a25c278645e3ed74f723808370";
    const PRELOADED_PSK: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    struct FailingCrypto;

    impl HandshakeCrypto for FailingCrypto {
        fn respond(
            &self,
            _request: &SignupRequest,
            _psk: &PresharedKey,
        ) -> pairgate_core::Result<HandshakeOutcome> {
            Err(CoreError::key_exchange("low order point"))
        }
    }

    struct Gateway {
        handshake: GatewayHandshake,
        keys: Option<SessionKeys>,
        device_id: DeviceId,
        last_randomness: [u8; 16],
    }

    impl Gateway {
        fn new() -> Self {
            let psk = PresharedKey::from_bytes([9u8; 32]);
            Self {
                handshake: GatewayHandshake::generate(psk).unwrap(),
                keys: None,
                device_id: DeviceId::new(0),
                last_randomness: [0u8; 16],
            }
        }

        fn scan(&self) -> ScanRecord {
            ScanRecord::new(
                self.handshake.static_public_key(),
                PresharedKey::from_bytes([9u8; 32]),
            )
        }

        fn signup(&self, connection: u64, sink: Option<MockSink>) -> SignupEvent {
            SignupEvent {
                connection: ConnectionId::new(connection),
                sink: sink.map(|s| Box::new(s) as Box<dyn ResponseSink>),
                request: self.handshake.signup_request(1, b"/dev0".to_vec()),
            }
        }

        fn accept_signup(&mut self, frame: &[u8]) {
            let response = decode_signup_response(&frame[HEADER_SIZE..]).unwrap();
            self.keys = Some(self.handshake.complete(&response).unwrap());
            self.device_id = response.device_id;
        }

        fn auth(&self, reboot: u32, request: u32, access: AccessType) -> AuthEvent {
            let keys = self.keys.as_ref().unwrap();
            let mac_tag = auth_request_tag(
                &keys.gateway_to_server,
                reboot,
                request,
                access,
                &self.last_randomness,
            )
            .unwrap();
            AuthEvent {
                connection: ConnectionId::new(0),
                request: AuthRequest {
                    device_id: self.device_id,
                    reboot_counter: reboot,
                    request_counter: request,
                    access_type: access,
                    mac_tag,
                },
                arrived_at: Timestamp::now(),
            }
        }
    }

    fn spawn(capacity: usize) -> OrchestratorHandle {
        let (orchestrator, handle) = Orchestrator::new(capacity);
        tokio::spawn(orchestrator.run());
        handle
    }

    /// Round trip through the control queue, which is served last, so
    /// everything queued before has been processed.
    async fn settle(handle: &OrchestratorHandle) -> Vec<DeviceSummary> {
        handle.list_devices().await.unwrap()
    }

    #[tokio::test]
    async fn test_signup_with_preloaded_scan() {
        let handle = spawn(16);
        let static_key = parse_key_hex("static_public_key", PRELOADED_KEY).unwrap();
        let psk = PresharedKey::from_bytes(parse_key_hex("preshared_key", PRELOADED_PSK).unwrap());
        handle.submit_scan(ScanRecord::new(static_key, psk)).await.unwrap();

        let ephemeral = X25519KeyPair::generate().unwrap();
        let sink = MockSink::new();
        handle
            .submit_signup(SignupEvent {
                connection: ConnectionId::new(0),
                sink: Some(Box::new(sink.clone())),
                request: SignupRequest {
                    device_type: 1,
                    static_public_key: static_key,
                    ephemeral_public_key: ephemeral.public_key_bytes(),
                    mac_tag: [0u8; 32],
                    capability_uri: b"/dev0".to_vec(),
                },
            })
            .await
            .unwrap();

        let devices = settle(&handle).await;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, DeviceId::new(0));
        assert!(!devices[0].paired);

        let frames = sink.sent_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 71);
        assert_eq!(&frames[0][..HEADER_SIZE], &[1u8, 68, 0]);
        assert_eq!(&frames[0][HEADER_SIZE..HEADER_SIZE + 4], &[0u8, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_signup_without_scan_is_silent() {
        let handle = spawn(16);
        let gateway = Gateway::new();
        let sink = MockSink::new();

        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();

        assert!(settle(&handle).await.is_empty());
        assert_eq!(sink.sent_count(), 0);

        // Rescan and retry on the same connection, sink already handed over.
        handle.submit_scan(gateway.scan()).await.unwrap();
        handle.submit_signup(gateway.signup(0, None)).await.unwrap();

        assert_eq!(settle(&handle).await.len(), 1);
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_signup_drains_pending_scans() {
        let (orchestrator, handle) = Orchestrator::new(16);
        let Orchestrator {
            mut inbox,
            mut state,
        } = orchestrator;

        let gateway = Gateway::new();
        let sink = MockSink::new();
        handle.submit_scan(gateway.scan()).await.unwrap();

        // The scan is still queued, not applied.
        assert!(state.scans.is_empty());

        state
            .handle_signup(gateway.signup(0, Some(sink.clone())), &mut inbox.scan_rx)
            .await
            .unwrap();

        assert_eq!(state.scans.len(), 1);
        assert_eq!(state.devices.len(), 1);
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_scan_keeps_first_psk() {
        let handle = spawn(16);
        let mut gateway = Gateway::new();
        let sink = MockSink::new();

        handle.submit_scan(gateway.scan()).await.unwrap();
        handle
            .submit_scan(ScanRecord::new(
                gateway.handshake.static_public_key(),
                PresharedKey::from_bytes([1u8; 32]),
            ))
            .await
            .unwrap();
        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();
        settle(&handle).await;

        // Completing verifies the tag under the original PSK.
        gateway.accept_signup(&sink.take_frames()[0]);
        assert!(gateway.keys.is_some());
    }

    #[tokio::test]
    async fn test_signup_auth_and_pairing() {
        let handle = spawn(16);
        let mut gateway = Gateway::new();
        let sink = MockSink::new();

        handle.submit_scan(gateway.scan()).await.unwrap();
        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();
        settle(&handle).await;
        gateway.accept_signup(&sink.take_frames()[0]);

        handle
            .submit_auth(gateway.auth(0, 0, AccessType::DummyPairingConfirmation))
            .await
            .unwrap();
        let summary = handle.device_summary(gateway.device_id).await.unwrap().unwrap();
        assert!(summary.paired);
        assert_eq!(sink.sent_count(), 0);

        handle
            .submit_auth(gateway.auth(0, 1, AccessType::SampleSensor0))
            .await
            .unwrap();
        settle(&handle).await;

        let frames = sink.take_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 51);
        let response = decode_auth_response(&frames[0][HEADER_SIZE..]).unwrap();
        gateway.last_randomness = response.nonce;

        handle
            .submit_auth(gateway.auth(0, 2, AccessType::ControlActuator1))
            .await
            .unwrap();
        let summary = handle.device_summary(gateway.device_id).await.unwrap().unwrap();
        assert_eq!(summary.request_counter, 2);
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_replayed_request_gets_no_response() {
        let handle = spawn(16);
        let mut gateway = Gateway::new();
        let sink = MockSink::new();

        handle.submit_scan(gateway.scan()).await.unwrap();
        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();
        settle(&handle).await;
        gateway.accept_signup(&sink.take_frames()[0]);

        let request = gateway.auth(0, 1, AccessType::SampleSensor0);
        handle.submit_auth(request.clone()).await.unwrap();
        handle.submit_auth(request).await.unwrap();
        settle(&handle).await;

        assert_eq!(sink.sent_count(), 1);
        let log = handle.device_log(gateway.device_id).await.unwrap().unwrap();
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_device_is_dropped() {
        let handle = spawn(16);
        let mut gateway = Gateway::new();
        let sink = MockSink::new();

        handle.submit_scan(gateway.scan()).await.unwrap();
        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();
        settle(&handle).await;
        gateway.accept_signup(&sink.take_frames()[0]);

        let mut stray = gateway.auth(0, 1, AccessType::SampleSensor0);
        stray.request.device_id = DeviceId::new(999);
        handle.submit_auth(stray).await.unwrap();

        assert!(handle.device_log(DeviceId::new(999)).await.unwrap().is_none());
        assert_eq!(sink.sent_count(), 0);

        // The real device is unaffected.
        handle
            .submit_auth(gateway.auth(0, 1, AccessType::SampleSensor0))
            .await
            .unwrap();
        settle(&handle).await;
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_discards_record_and_burns_id() {
        let handle = spawn(16);
        let first = Gateway::new();
        let mut second = Gateway::new();

        let broken = MockSink::new();
        broken.set_failing(true);
        handle.submit_scan(first.scan()).await.unwrap();
        handle
            .submit_signup(first.signup(0, Some(broken)))
            .await
            .unwrap();
        assert!(settle(&handle).await.is_empty());

        let sink = MockSink::new();
        handle.submit_scan(second.scan()).await.unwrap();
        handle
            .submit_signup(second.signup(1, Some(sink.clone())))
            .await
            .unwrap();
        let devices = settle(&handle).await;

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, DeviceId::new(1));
        second.accept_signup(&sink.take_frames()[0]);
        assert_eq!(second.device_id, DeviceId::new(1));
    }

    #[tokio::test]
    async fn test_crypto_failure_is_silent() {
        let (orchestrator, handle) = Orchestrator::with_crypto(16, Arc::new(FailingCrypto));
        tokio::spawn(orchestrator.run());
        let gateway = Gateway::new();
        let sink = MockSink::new();

        handle.submit_scan(gateway.scan()).await.unwrap();
        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();

        assert!(settle(&handle).await.is_empty());
        assert_eq!(sink.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_connection_close_releases_sink() {
        let handle = spawn(16);
        let mut gateway = Gateway::new();
        let sink = MockSink::new();

        handle.submit_scan(gateway.scan()).await.unwrap();
        handle
            .submit_signup(gateway.signup(0, Some(sink.clone())))
            .await
            .unwrap();
        handle.connection_closed(ConnectionId::new(0)).await.unwrap();
        settle(&handle).await;
        gateway.accept_signup(&sink.take_frames()[0]);

        // Accepted but undeliverable: state advances, nothing is written.
        handle
            .submit_auth(gateway.auth(0, 1, AccessType::SampleSensor0))
            .await
            .unwrap();
        let summary = handle.device_summary(gateway.device_id).await.unwrap().unwrap();
        assert_eq!(summary.request_counter, 1);
        assert_eq!(sink.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_handles_dropped() {
        let (orchestrator, handle) = Orchestrator::new(4);
        let task = tokio::spawn(orchestrator.run());
        drop(handle);
        task.await.unwrap();
    }
}
