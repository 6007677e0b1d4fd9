//! Sync link supervision
//!
//! Keeps one client connected to the editor. A down link is retried once
//! per device tick with no backoff. Each retry only advances a non-blocking
//! attempt, so a slow or silent editor never stalls the tick.

use std::io::{self, Write};

use tracing::{info, trace, warn};

use super::{ConnectProgress, ConnectionState, SyncCallbacks, SyncClient, SyncError};
use crate::codec;

/// Result of one link update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Up,
    Down,
}

/// Owner of the editor connection
pub struct SyncLink<C> {
    client: C,
    host: String,
    port: u16,
    state: ConnectionState,
    /// Failed reconnects since the link went down
    attempts: u64,
}

impl<C: SyncClient> SyncLink<C> {
    pub fn new(client: C, host: impl Into<String>, port: u16) -> Self {
        let state = if client.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };

        Self {
            client,
            host: host.into(),
            port,
            state,
            attempts: 0,
        }
    }

    /// Connect and wait for the editor, reporting failure to the caller
    pub fn connect(&mut self) -> Result<(), SyncError> {
        self.client.connect(&self.host, self.port)?;
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        Ok(())
    }

    /// Poll the editor and apply its commands through `callbacks`
    pub fn update(&mut self, row: f64, callbacks: &mut dyn SyncCallbacks) -> LinkOutcome {
        if self.state != ConnectionState::Connected {
            return LinkOutcome::Down;
        }

        match self.client.update(row, callbacks) {
            Ok(()) => LinkOutcome::Up,
            Err(e) => {
                warn!("🔌 Lost connection to editor: {}", e);
                self.state = ConnectionState::Disconnected;
                LinkOutcome::Down
            }
        }
    }

    /// Advance one reconnect attempt without waiting. Failures are only counted.
    pub fn reconnect(&mut self) -> bool {
        match self.client.poll_connect(&self.host, self.port) {
            Ok(ConnectProgress::Connected) => {
                self.state = ConnectionState::Connected;
                self.attempts = 0;
                info!("✅ Connected to editor at {}:{}", self.host, self.port);
                true
            }
            Ok(ConnectProgress::Pending) => {
                self.state = ConnectionState::Connecting;
                false
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                self.attempts += 1;
                trace!("Reconnect #{} to {}:{} failed: {}", self.attempts, self.host, self.port, e);
                false
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Drop the connection
    pub fn close(&mut self) {
        self.client.disconnect();
        self.state = ConnectionState::Disconnected;
    }
}

/// Encode a key record.
///
/// The first word packs `row * ticks_per_row` in the low 24 bits and the key
/// type in the high 8, the second is the Q15.16 value. Native byte order.
pub fn key_record(kind: u8, row: u32, value: f32, ticks_per_row: u32) -> [u8; 8] {
    let time_and_type = (row.wrapping_mul(ticks_per_row) & 0x00ff_ffff) | (u32::from(kind) << 24);
    let fixed = codec::to_fixed(value);

    let mut record = [0u8; 8];
    record[..4].copy_from_slice(&time_and_type.to_ne_bytes());
    record[4..].copy_from_slice(&fixed.to_ne_bytes());
    record
}

/// Write one key record to `out`
pub fn write_key<W: Write + ?Sized>(
    out: &mut W,
    kind: u8,
    row: u32,
    value: f32,
    ticks_per_row: u32,
) -> io::Result<()> {
    out.write_all(&key_record(kind, row, value, ticks_per_row))
}
