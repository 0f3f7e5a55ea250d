// ============================================
// File: crates/pairgate-server/src/console.rs
// ============================================
//! # Administrative Console
//!
//! ## Creation Reason
//! Operators enter scans (gateway static key + PSK) and inspect device
//! audit logs from a line-based console.
//!
//! ## Commands
//! ```text
//! scan <static_public_key_hex> <preshared_key_hex>
//! log <device_id>
//! devices
//! help
//! ```
//!
//! ## Input Path
//! ```text
//! stdin ──► reader thread ──► mpsc<String> ──► Console::run ──► stdout
//!          (blocking reads)                        │
//!                                                  └──► OrchestratorHandle
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The console only talks to the orchestrator through its handle.
//!   Scans go through the same queue as configured scans.
//! - Bad input is reported on the output and never ends the console
//! - Stdin is read on its own OS thread. A blocking read there cannot be
//!   cancelled, but it also holds nothing the runtime waits for, so
//!   aborting the console task is enough to shut down.
//!
//! ## Last Modified
//! v0.1.0 - Initial console

use std::io::BufRead;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use pairgate_common::{parse_key_hex, DeviceId};
use pairgate_core::crypto::PresharedKey;

use crate::error::{Result, ServerError};
use crate::orchestrator::OrchestratorHandle;
use crate::services::{LogEntry, ScanRecord};

const HELP: &str = "\
Commands:
  scan <static_public_key_hex> <preshared_key_hex>   register a gateway scan
  log <device_id>                                    print a device's audit log
  devices                                            list registered devices
  help                                               show this message
";

// ============================================
// Parsing
// ============================================

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Enqueue a scan record.
    Scan(ScanRecord),
    /// Print a device's audit log.
    Log(DeviceId),
    /// List all devices.
    Devices,
    /// Print usage.
    Help,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let expect_args = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(ServerError::invalid_command(format!(
                "'{command}' takes {n} argument(s), got {}",
                args.len()
            )))
        }
    };

    let parsed = match command {
        "scan" => {
            expect_args(2)?;
            let static_public_key = parse_key_hex("static_public_key", args[0])?;
            let preshared_key = PresharedKey::from_bytes(parse_key_hex("preshared_key", args[1])?);
            ConsoleCommand::Scan(ScanRecord::new(static_public_key, preshared_key))
        }
        "log" => {
            expect_args(1)?;
            let id = args[0]
                .parse::<DeviceId>()
                .map_err(|e| ServerError::invalid_command(format!("bad device id: {e}")))?;
            ConsoleCommand::Log(id)
        }
        "devices" => {
            expect_args(0)?;
            ConsoleCommand::Devices
        }
        "help" => ConsoleCommand::Help,
        other => {
            return Err(ServerError::invalid_command(format!(
                "unknown command '{other}', try 'help'"
            )))
        }
    };

    Ok(Some(parsed))
}

/// Formats one audit log entry.
#[must_use]
pub fn format_log_entry(index: usize, entry: &LogEntry) -> String {
    format!(
        "Device ID: {}, Index: {}, Access Type: {:?} ({:#04x}), Arrival time: {}, Paired at arrival: {}",
        entry.device_id,
        index,
        entry.request.access_type,
        entry.request.access_type.as_u16(),
        entry.arrival_time,
        entry.paired_at_arrival,
    )
}

// ============================================
// Stdin Reader
// ============================================

/// Lines buffered between the stdin thread and the console task.
const STDIN_BUFFER: usize = 16;

/// Starts a detached thread that forwards stdin lines.
///
/// The thread ends at end of input, on a read error, or once the
/// receiver is dropped and the next line arrives.
pub fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(STDIN_BUFFER);

    std::thread::Builder::new()
        .name("pairgate-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;

    Ok(rx)
}

// ============================================
// Console
// ============================================

/// Line-based operator console.
#[derive(Debug, Clone)]
pub struct Console {
    handle: OrchestratorHandle,
}

impl Console {
    /// Creates a console bound to an orchestrator.
    #[must_use]
    pub const fn new(handle: OrchestratorHandle) -> Self {
        Self { handle }
    }

    /// Executes lines until the sender side is dropped.
    ///
    /// # Errors
    /// I/O errors on `output`, or `OrchestratorStopped`.
    pub async fn run<O>(&self, mut lines: mpsc::Receiver<String>, mut output: O) -> Result<()>
    where
        O: AsyncWrite + Unpin,
    {
        info!("Console started");

        while let Some(line) = lines.recv().await {
            match parse_command(&line) {
                Ok(Some(command)) => self.execute(command, &mut output).await?,
                Ok(None) => {}
                Err(e) => {
                    debug!(error = %e, "Console input rejected");
                    output.write_all(format!("Error: {e}\n").as_bytes()).await?;
                }
            }
            output.flush().await?;
        }

        info!("Console input closed");
        Ok(())
    }

    /// Executes one parsed command, writing the result to `output`.
    pub async fn execute<O>(&self, command: ConsoleCommand, output: &mut O) -> Result<()>
    where
        O: AsyncWrite + Unpin,
    {
        let text = match command {
            ConsoleCommand::Scan(record) => {
                self.handle.submit_scan(record).await?;
                "Scan received\n".to_string()
            }
            ConsoleCommand::Log(id) => match self.handle.device_log(id).await? {
                Some(entries) => {
                    let mut text = format!("Log entries for device {id}: {}\n", entries.len());
                    for (index, entry) in entries.iter().enumerate() {
                        text.push_str(&format_log_entry(index, entry));
                        text.push('\n');
                    }
                    text
                }
                None => format!("Device {id} not found\n"),
            },
            ConsoleCommand::Devices => {
                let devices = self.handle.list_devices().await?;
                let mut text = format!("{} device(s)\n", devices.len());
                for d in devices {
                    text.push_str(&format!(
                        "  {} type={} uri={:?} paired={} reboot={} request={} log={}\n",
                        d.id,
                        d.device_type,
                        d.capability_uri,
                        d.paired,
                        d.reboot_counter,
                        d.request_counter,
                        d.log_len
                    ));
                }
                text
            }
            ConsoleCommand::Help => HELP.to_string(),
        };

        output.write_all(text.as_bytes()).await?;
        Ok(())
    }
}

// ============================================
// Tests
// ============================================
