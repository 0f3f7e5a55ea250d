// ============================================
// File: crates/pairgate-server/src/services/connections.rs
// ============================================
//! # Connection Table
//!
//! ## Creation Reason
//! The orchestrator is the only writer to gateway sockets. This table
//! holds the write halves it has been handed, keyed by connection id.
//!
//! ## ⚠️ Important Note for Next Developer
//! - A sink arrives with the first signup on its connection and leaves
//!   when the Connection Task reports the connection closed
//! - Writes are awaited inline, a stalled peer stalls the orchestrator
//!   for at most the configured write timeout times the retry count
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use std::collections::HashMap;

use tracing::{debug, trace};

use pairgate_common::ConnectionId;
use pairgate_transport::ResponseSink;

use crate::error::{Result, ServerError};

/// Write halves owned by the orchestrator.
#[derive(Default)]
pub struct ConnectionTable {
    sinks: HashMap<ConnectionId, Box<dyn ResponseSink>>,
}

impl ConnectionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a connection's write half.
    pub fn register(&mut self, connection: ConnectionId, sink: Box<dyn ResponseSink>) {
        debug!(conn_id = %connection, peer = ?sink.peer_addr(), "Write half handed to orchestrator");
        self.sinks.insert(connection, sink);
    }

    /// Drops a connection's write half. Returns whether one was held.
    pub fn remove(&mut self, connection: ConnectionId) -> bool {
        self.sinks.remove(&connection).is_some()
    }

    /// Returns true if a write half is held for the connection.
    #[must_use]
    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.sinks.contains_key(&connection)
    }

    /// Number of held write halves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if no write half is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Writes a complete frame to a connection.
    ///
    /// # Errors
    /// - `ConnectionNotFound`: no write half is held for `connection`
    /// - `ResponseDelivery`: the write failed or timed out
    pub async fn send(&mut self, connection: ConnectionId, frame: &[u8]) -> Result<()> {
        let sink = self
            .sinks
            .get_mut(&connection)
            .ok_or(ServerError::ConnectionNotFound(connection))?;

        sink.send_frame(frame)
            .await
            .map_err(|source| ServerError::ResponseDelivery { connection, source })?;

        trace!(conn_id = %connection, len = frame.len(), "Frame sent");
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTable")
            .field("connections", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}
