// ============================================
// File: crates/pairgate-server/src/services/device_registry.rs
// ============================================
//! # Device Registry
//!
//! ## Creation Reason
//! Stores every gateway that completed a signup, together with the
//! state the authentication engine needs: session keys, replay
//! counters, the last challenge nonce and the audit log.
//!
//! ## Main Functionality
//! - `DeviceRecord`: Per-device protocol state
//! - `LogEntry`: One received authentication request
//! - `DeviceRegistry`: Sequential id allocation and lookup
//!
//! ## Id Allocation
//! ```text
//! allocate_id() ──► 0, 1, 2, ...   (never reused)
//!       │
//!       ├── commit(record)          send succeeded
//!       └── (dropped)               send failed, id stays burned
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Ids are handed out by `allocate_id` before the record exists, so a
//!   gap in the id sequence is normal after a failed signup delivery
//! - The audit log is append-only, nothing removes entries
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use std::collections::BTreeMap;

use pairgate_common::{ConnectionId, DeviceId, Timestamp};
use pairgate_core::crypto::{SessionKeys, NONCE_SIZE};
use pairgate_core::protocol::AuthRequest;

use crate::error::{Result, ServerError};
use crate::services::scan_registry::ScanRecord;

// ============================================
// LogEntry
// ============================================

/// One authentication request as it arrived, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the Connection Task decoded the request.
    pub arrival_time: Timestamp,
    /// Device the request was addressed to.
    pub device_id: DeviceId,
    /// Pairing flag before this request was processed.
    pub paired_at_arrival: bool,
    /// The raw request.
    pub request: AuthRequest,
}

// ============================================
// DeviceRecord
// ============================================

/// Protocol state for one registered gateway.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Assigned id.
    pub id: DeviceId,
    /// Device type from the signup request.
    pub device_type: u16,
    /// Capability URI from the signup request.
    pub capability_uri: Vec<u8>,
    /// Highest accepted reboot counter.
    pub reboot_counter: u32,
    /// Highest accepted request counter.
    pub request_counter: u32,
    /// Nonce issued with the last accepted non-dummy request.
    pub last_randomness: [u8; NONCE_SIZE],
    /// Directional session keys.
    pub session_keys: SessionKeys,
    /// Set once the gateway proves possession of the session keys.
    pub paired: bool,
    /// Scan the signup was matched against.
    pub scan: ScanRecord,
    /// Connection whose write half receives this device's responses.
    pub connection: ConnectionId,
    log: Vec<LogEntry>,
}

impl DeviceRecord {
    /// Creates an unpaired record with zeroed counters and challenge.
    #[must_use]
    pub fn new(
        id: DeviceId,
        device_type: u16,
        capability_uri: Vec<u8>,
        session_keys: SessionKeys,
        scan: ScanRecord,
        connection: ConnectionId,
    ) -> Self {
        Self {
            id,
            device_type,
            capability_uri,
            reboot_counter: 0,
            request_counter: 0,
            last_randomness: [0u8; NONCE_SIZE],
            session_keys,
            paired: false,
            scan,
            connection,
            log: Vec::new(),
        }
    }

    /// Appends an audit entry for a request that just arrived.
    pub fn append_log(&mut self, request: &AuthRequest, arrival_time: Timestamp) {
        self.log.push(LogEntry {
            arrival_time,
            device_id: self.id,
            paired_at_arrival: self.paired,
            request: request.clone(),
        });
    }

    /// The audit log, oldest first.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Key-free snapshot for display.
    #[must_use]
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id,
            device_type: self.device_type,
            capability_uri: String::from_utf8_lossy(&self.capability_uri).into_owned(),
            reboot_counter: self.reboot_counter,
            request_counter: self.request_counter,
            paired: self.paired,
            log_len: self.log.len(),
        }
    }
}

/// Display-only view of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    /// Device id.
    pub id: DeviceId,
    /// Device type.
    pub device_type: u16,
    /// Capability URI, lossily decoded.
    pub capability_uri: String,
    /// Stored reboot counter.
    pub reboot_counter: u32,
    /// Stored request counter.
    pub request_counter: u32,
    /// Pairing flag.
    pub paired: bool,
    /// Number of audit entries.
    pub log_len: usize,
}

// ============================================
// DeviceRegistry
// ============================================

/// Registered devices keyed by id.
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, DeviceRecord>,
    next_id: Option<u32>,
}

impl DeviceRegistry {
    /// Creates an empty registry. The first id handed out is 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
            next_id: Some(0),
        }
    }

    /// Reserves the next device id.
    ///
    /// # Errors
    /// `DeviceIdsExhausted` once `u32::MAX` has been handed out.
    pub fn allocate_id(&mut self) -> Result<DeviceId> {
        let id = self.next_id.ok_or(ServerError::DeviceIdsExhausted)?;
        self.next_id = id.checked_add(1);
        Ok(DeviceId::new(id))
    }

    /// Inserts a record built around an id from `allocate_id`.
    pub fn commit(&mut self, record: DeviceRecord) {
        self.devices.insert(record.id, record);
    }

    /// Looks up a device.
    #[must_use]
    pub fn get(&self, id: DeviceId) -> Option<&DeviceRecord> {
        self.devices.get(&id)
    }

    /// Looks up a device for mutation.
    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut DeviceRecord> {
        self.devices.get_mut(&id)
    }

    /// Summaries of all devices in id order.
    #[must_use]
    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.devices.values().map(DeviceRecord::summary).collect()
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true if no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Tests
// ============================================
