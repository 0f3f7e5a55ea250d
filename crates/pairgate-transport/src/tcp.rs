// ============================================
// File: crates/pairgate-transport/src/tcp.rs
// ============================================
//! # TCP Transport
//!
//! ## Creation Reason
//! Gateways speak the pairing protocol over plain TCP streams.
//!
//! ## Main Functionality
//! - `TcpTransport`: Listener bound with `SO_REUSEADDR`
//! - `TcpResponseSink`: Bounded, non-blocking writer over an `OwnedWriteHalf`
//! - `read_exact_or_closed`: Exact read that reports EOF as `ConnectionClosed`
//!
//! ## Write Strategy
//! ```text
//! try_write ──► WouldBlock ──► wait writable (≤ timeout) ──► try_write ...
//!                                   │
//!                                   └── elapsed `retries` times ──► WriteTimeout
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The sink never blocks longer than `timeout × retries`; the caller is
//!   the single orchestrator task, so every stall delays all devices
//! - A partially written frame is not rolled back; the peer sees a
//!   truncated frame and must reconnect
//!
//! ## Last Modified
//! v0.1.0 - Initial TCP implementation

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::ResponseSink;

/// Pending-connection backlog passed to `listen(2)`.
const LISTEN_BACKLOG: i32 = 1024;

// ============================================
// TcpTransport
// ============================================

/// TCP listener for gateway connections.
///
/// # Example
/// ```ignore
/// let transport = TcpTransport::bind("0.0.0.0:1200").await?;
/// loop {
///     let (stream, peer) = transport.accept().await?;
///     // hand off to a connection task
/// }
/// ```
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Binds to an address string.
    ///
    /// # Errors
    /// - `InvalidAddress`: string is not a socket address
    /// - `AddressInUse` / `BindFailed`: binding failed
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self> {
        let addr_str = addr.as_ref();
        let socket_addr: SocketAddr = addr_str.parse().map_err(|_| TransportError::InvalidAddress {
            addr: addr_str.to_string(),
        })?;
        Self::bind_addr(socket_addr).await
    }

    /// Binds to a socket address.
    ///
    /// # Socket Options
    /// - `SO_REUSEADDR`: Enabled for quick rebinding after restart
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        info!("Binding TCP transport to {}", addr);

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| TransportError::io("creating TCP socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;

        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;

        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| TransportError::bind_failed(addr, e.to_string()))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| TransportError::io("converting to Tokio listener", e))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("TCP transport bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accepts the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::io("accepting connection", e))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, "Failed to set TCP_NODELAY: {}", e);
        }

        Ok((stream, peer))
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

// ============================================
// Exact Reads
// ============================================

/// Fills `buf` completely from `reader`.
///
/// # Errors
/// Returns `ConnectionClosed` if the stream ends (or is reset) first.
pub async fn read_exact_or_closed<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    reader
        .read_exact(buf)
        .await
        .map(|_| ())
        .map_err(|e| TransportError::from_stream_error("reading from connection", e))
}

// ============================================
// WritePolicy
// ============================================

/// Bounds on how long a response write may wait for a slow peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Maximum wait for writability per attempt.
    pub timeout: Duration,
    /// Number of elapsed waits tolerated before giving up.
    pub retries: u32,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            retries: 3,
        }
    }
}

// ============================================
// TcpResponseSink
// ============================================

/// Write capability for one TCP connection.
pub struct TcpResponseSink {
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    policy: WritePolicy,
}

impl TcpResponseSink {
    /// Wraps the write half of a split stream.
    #[must_use]
    pub const fn new(writer: OwnedWriteHalf, peer: SocketAddr, policy: WritePolicy) -> Self {
        Self {
            writer,
            peer,
            policy,
        }
    }
}

#[async_trait]
impl ResponseSink for TcpResponseSink {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut written = 0;
        let mut elapsed_waits = 0u32;

        while written < frame.len() {
            match self.writer.try_write(&frame[written..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    match timeout(self.policy.timeout, self.writer.writable()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            return Err(TransportError::from_stream_error("waiting for writability", e))
                        }
                        Err(_) => {
                            elapsed_waits += 1;
                            trace!(peer = %self.peer, attempt = elapsed_waits, "Write stalled");
                            if elapsed_waits >= self.policy.retries {
                                return Err(TransportError::WriteTimeout {
                                    attempts: elapsed_waits,
                                    timeout_ms: u64::try_from(self.policy.timeout.as_millis())
                                        .unwrap_or(u64::MAX),
                                });
                            }
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::from_stream_error("writing response", e)),
            }
        }

        trace!(peer = %self.peer, bytes = frame.len(), "Frame written");
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}

impl std::fmt::Debug for TcpResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpResponseSink")
            .field("peer", &self.peer)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
