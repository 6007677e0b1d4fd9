//! Timeline synchronization with a Rocket editor
//!
//! [`SyncClient`] is the seam to the sync library: it owns the tracks, the
//! socket and the wire protocol. [`SyncCallbacks`] is the capability set the
//! device hands back to it so editor commands can move the timeline.
//! [`SyncLink`] drives a client from the device tick and keeps reconnecting.

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;

use crate::tracks::Track;

pub mod link;
pub mod protocol;
pub mod rocket;

#[cfg(test)]
pub(crate) mod fake;

pub use link::{key_record, write_key, LinkOutcome, SyncLink};
pub use rocket::RocketClient;

/// Port a Rocket editor listens on
pub const DEFAULT_PORT: u16 = 1338;

/// Host the device connects to
pub const DEFAULT_HOST: &str = "localhost";

/// Index of a track inside its [`SyncClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

/// Sync link errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync socket error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected greeting from editor: {0:?}")]
    Handshake(Vec<u8>),

    #[error("unknown sync command 0x{0:02x}")]
    UnknownCommand(u8),

    #[error("editor referenced unknown track {0}")]
    UnknownTrack(u32),

    #[error("editor did not greet within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("not connected to an editor")]
    NotConnected,

    #[error("no address found for {0}")]
    Resolve(String),

    #[error("track prefix {0:?} cannot form a file name")]
    InvalidPrefix(String),
}

/// Connection state of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// An attempt is in flight, the editor has not greeted yet
    Connecting,
    Connected,
}

/// Progress of a non-blocking connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProgress {
    Pending,
    Connected,
}

/// Entry points the sync library uses to drive the device
pub trait SyncCallbacks {
    fn is_playing(&self) -> bool;

    /// `true` pauses playback, `false` resumes it
    fn pause(&mut self, flag: bool);

    /// Seek to an integer row
    fn set_row(&mut self, row: i32);

    /// Persist one key to `out` while the editor saves tracks
    fn write_key(&mut self, out: &mut dyn Write, kind: u8, row: u32, value: f32) -> io::Result<()>;
}

/// A sync library client
///
/// Implementations must never block [`SyncClient::update`] or
/// [`SyncClient::poll_connect`] on the network.
pub trait SyncClient {
    /// Connect and request every registered track, waiting for the editor
    fn connect(&mut self, host: &str, port: u16) -> Result<(), SyncError>;

    /// Start a connection attempt, or advance the one in flight.
    ///
    /// An error abandons the attempt; the next call starts a new one.
    fn poll_connect(&mut self, host: &str, port: u16) -> Result<ConnectProgress, SyncError>;

    fn is_connected(&self) -> bool;

    /// Register a track (or find an existing one) and request it from the editor
    fn get_track(&mut self, name: &str, kind: i32) -> TrackId;

    fn track(&self, id: TrackId) -> Option<&Track>;

    /// Process pending editor commands and report the playback row.
    ///
    /// An error means the link is down and the socket has been dropped.
    fn update(&mut self, row: f64, callbacks: &mut dyn SyncCallbacks) -> Result<(), SyncError>;

    fn disconnect(&mut self);
}
