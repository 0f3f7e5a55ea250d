// ============================================
// File: crates/pairgate-server/src/server.rs
// ============================================
//! # Server Lifecycle
//!
//! ## Creation Reason
//! Wires the listener, the orchestrator, the console and the per
//! connection tasks together and manages startup and shutdown.
//!
//! ## Main Functionality
//! - `Server`: Main server struct and lifecycle management
//! - Startup scans from the configuration
//! - Accept loop assigning connection ids
//! - Graceful shutdown on Ctrl+C or [`Server::shutdown`]
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────┐  accept   ┌───────────────────────────┐   │
//! │  │ TcpTransport │ ────────► │ ConnectionTask (JoinSet)  │   │
//! │  └──────────────┘  split    │  read half                │   │
//! │                             └─────────────┬─────────────┘   │
//! │  ┌──────────────┐                         │ events          │
//! │  │   Console    │ ────── scans, queries ──┤                 │
//! │  └──────────────┘                         ▼                 │
//! │  config [[scans]] ─────────────► ┌─────────────────────┐    │
//! │                                  │    Orchestrator     │    │
//! │                                  │  (owns write halves)│    │
//! │                                  └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Connection ids start at 0 and are never reused within a run
//! - On shutdown the connection tasks are aborted, which drops their
//!   handles and lets the orchestrator drain and stop
//! - The console task is aborted too. Its stdin thread may stay parked
//!   in a read until the process exits; it owns no orchestrator handle.
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use pairgate_common::ConnectionId;
use pairgate_transport::{TcpResponseSink, TcpTransport};

use crate::config::ServerConfig;
use crate::console::{spawn_stdin_reader, Console};
use crate::error::{Result, ServerError};
use crate::handlers::ConnectionTask;
use crate::orchestrator::Orchestrator;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The pairing server.
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown_tx,
        }
    }

    /// Runs the server until Ctrl+C.
    ///
    /// # Errors
    /// Returns error if the listener cannot be bound or the configured
    /// scans are invalid.
    pub async fn run(&self) -> Result<()> {
        info!("Starting pairgate server v{}", env!("CARGO_PKG_VERSION"));

        let transport = self.bind().await?;

        let serve = self.serve(transport);
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => return result,
            () = wait_for_ctrl_c() => {}
        }

        self.shutdown();
        serve.await
    }

    /// Binds the configured listen address.
    pub async fn bind(&self) -> Result<TcpTransport> {
        let addr = self.config.listen_addr();
        let transport = TcpTransport::bind_addr(addr)
            .await
            .map_err(|e| ServerError::startup_failed(format!("TCP bind failed: {e}")))?;

        info!("TCP transport listening on {}", transport.local_addr());
        Ok(transport)
    }

    /// Serves connections on `transport` until [`Server::shutdown`].
    pub async fn serve(&self, transport: TcpTransport) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let (orchestrator, handle) = Orchestrator::new(self.config.limits.channel_capacity);
        let orchestrator_task = tokio::spawn(orchestrator.run());

        let scans = self.config.scan_records()?;
        let scan_count = scans.len();
        for record in scans {
            handle.submit_scan(record).await?;
        }
        if scan_count > 0 {
            info!(count = scan_count, "Configured scans submitted");
        }

        let console_task = if self.config.console.enabled {
            match spawn_stdin_reader() {
                Ok(lines) => {
                    let console = Console::new(handle.clone());
                    Some(tokio::spawn(async move {
                        if let Err(e) = console.run(lines, tokio::io::stdout()).await {
                            warn!(error = %e, "Console stopped");
                        }
                    }))
                }
                Err(e) => {
                    warn!(error = %e, "Stdin reader failed to start, console disabled");
                    None
                }
            }
        } else {
            None
        };

        let policy = self.config.write_policy();
        let mut connections = JoinSet::new();
        let mut next_id: u64 = 0;

        info!("Server started successfully");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Accept loop received shutdown signal");
                    break;
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = transport.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = ConnectionId::new(next_id);
                        next_id += 1;

                        let (reader, writer) = stream.into_split();
                        let sink = TcpResponseSink::new(writer, peer, policy);
                        let task = ConnectionTask::new(id, peer, reader, Box::new(sink), handle.clone());
                        connections.spawn(task.run());

                        info!(conn_id = %id, peer = %peer, "Connection accepted");
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                    }
                },
            }
        }

        info!("Shutting down server...");

        connections.abort_all();
        while connections.join_next().await.is_some() {}
        if let Some(task) = console_task {
            task.abort();
        }
        drop(handle);

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, orchestrator_task).await {
            Ok(Ok(())) => debug!("Orchestrator completed"),
            Ok(Err(e)) => warn!("Orchestrator task failed: {}", e),
            Err(_) => warn!("Orchestrator timed out during shutdown"),
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen_addr", &self.config.network.listen_addr)
            .field("console", &self.config.console.enabled)
            .finish()
    }
}

/// Waits for Ctrl+C. If the signal handler cannot be installed the
/// server runs until stopped through [`Server::shutdown`].
async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
