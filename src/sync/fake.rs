//! Scripted in-memory client for device tests

use std::io::{self, ErrorKind};

use super::{ConnectProgress, SyncCallbacks, SyncClient, SyncError, TrackId};
use crate::tracks::{Track, TrackKey};

/// Something the fake editor does on the next update
#[derive(Debug, Clone)]
pub(crate) enum EditorEvent {
    SetRow(i32),
    Pause(bool),
    SaveTracks,
    Hangup,
}

#[derive(Default)]
pub(crate) struct FakeClient {
    pub tracks: Vec<Track>,
    pub connected: bool,
    /// Whether `connect` succeeds
    pub reachable: bool,
    pub connect_calls: usize,
    /// Polls an attempt stays pending before the editor greets
    pub greet_after: usize,
    pub pending: Vec<EditorEvent>,
    /// Rows passed to `update`
    pub rows: Vec<f64>,
    /// Key records produced by `SaveTracks`
    pub saved: Vec<u8>,
}

impl FakeClient {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }

    pub fn set_key(&mut self, id: TrackId, key: TrackKey) {
        self.tracks[id.0].set_key(key);
    }
}

impl SyncClient for FakeClient {
    fn connect(&mut self, _host: &str, _port: u16) -> Result<(), SyncError> {
        self.connect_calls += 1;
        if !self.reachable {
            return Err(SyncError::Io(io::Error::from(ErrorKind::ConnectionRefused)));
        }
        self.connected = true;
        Ok(())
    }

    fn poll_connect(&mut self, _host: &str, _port: u16) -> Result<ConnectProgress, SyncError> {
        self.connect_calls += 1;
        if !self.reachable {
            return Err(SyncError::Io(io::Error::from(ErrorKind::ConnectionRefused)));
        }
        if self.greet_after > 0 {
            self.greet_after -= 1;
            return Ok(ConnectProgress::Pending);
        }
        self.connected = true;
        Ok(ConnectProgress::Connected)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn get_track(&mut self, name: &str, kind: i32) -> TrackId {
        if let Some(idx) = self.tracks.iter().position(|t| t.name() == name) {
            return TrackId(idx);
        }
        self.tracks.push(Track::new(name, kind));
        TrackId(self.tracks.len() - 1)
    }

    fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0)
    }

    fn update(&mut self, row: f64, callbacks: &mut dyn SyncCallbacks) -> Result<(), SyncError> {
        if !self.connected {
            return Err(SyncError::NotConnected);
        }
        self.rows.push(row);

        for event in std::mem::take(&mut self.pending) {
            match event {
                EditorEvent::SetRow(row) => callbacks.set_row(row),
                EditorEvent::Pause(flag) => callbacks.pause(flag),
                EditorEvent::SaveTracks => {
                    for track in &self.tracks {
                        for key in track.keys() {
                            callbacks.write_key(&mut self.saved, key.kind.as_u8(), key.row, key.value)?;
                        }
                    }
                }
                EditorEvent::Hangup => {
                    self.connected = false;
                    return Err(SyncError::Io(io::Error::from(ErrorKind::ConnectionReset)));
                }
            }
        }

        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
