// ============================================
// File: crates/pairgate-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The orchestrator writes responses without knowing whether the other
//! end is a TCP socket or a test double.
//!
//! ## Main Functionality
//! - `ResponseSink`: Write capability for one connection
//!
//! ## ⚠️ Important Note for Next Developer
//! - `send_frame` takes `&mut self`: one writer per connection, enforced
//!   by ownership rather than a lock
//! - Implementations must bound how long `send_frame` can wait
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;

// ============================================
// ResponseSink Trait
// ============================================

/// Write side of one client connection.
///
/// # Example
/// ```ignore
/// async fn reply(sink: &mut dyn ResponseSink, frame: &[u8]) -> Result<()> {
///     sink.send_frame(frame).await
/// }
/// ```
#[async_trait]
pub trait ResponseSink: Send {
    /// Writes one complete frame.
    ///
    /// # Errors
    /// - `WriteTimeout`: peer did not drain its socket in time
    /// - `ConnectionClosed`: peer is gone
    async fn send_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Remote address, if the sink is backed by a socket.
    fn peer_addr(&self) -> Option<SocketAddr>;
}
