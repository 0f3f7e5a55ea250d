// ============================================
// File: crates/pairgate-transport/src/mock.rs
// ============================================
//! # Mock Response Sink
//!
//! ## Creation Reason
//! Lets the orchestrator and its services be tested without sockets.
//!
//! ## Main Functionality
//! - `MockSink`: Records every frame; can be switched to fail writes
//!
//! ## Usage in Tests
//! ```
//! use pairgate_transport::{MockSink, ResponseSink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = MockSink::new();
//! let probe = sink.clone();
//!
//! let mut boxed: Box<dyn ResponseSink> = Box::new(sink);
//! boxed.send_frame(&[1, 2, 3]).await.unwrap();
//!
//! assert_eq!(probe.sent_frames(), vec![vec![1, 2, 3]]);
//! # }
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, TransportError};
use crate::traits::ResponseSink;

// ============================================
// MockSink
// ============================================

/// In-memory response sink.
///
/// Clones share the same frame log, so a test keeps one clone as a
/// probe after handing the other away.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    failing: Arc<AtomicBool>,
}

impl MockSink {
    /// Creates an empty, healthy sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail with `SendFailed`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of all frames written so far.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    /// Removes and returns all frames written so far.
    pub fn take_frames(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.frames.lock())
    }

    /// Number of frames written so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.frames.lock().len()
    }
}

#[async_trait]
impl ResponseSink for MockSink {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::send_failed("mock sink set to fail"));
        }
        self.frames.lock().push(frame.to_vec());
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

// ============================================
// Tests
// ============================================
