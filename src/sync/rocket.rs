//! Rocket editor client over TCP
//!
//! Nothing here waits on the network. A connection attempt is a small state
//! machine ([`RocketClient::poll_connect`]) that advances once per call:
//! non-blocking connect, greeting out, greeting back, track requests out.
//! Afterwards [`RocketClient::update`] only drains what has already arrived
//! and queues what the socket will not take yet. Incomplete commands stay
//! buffered until the next tick.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use mio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use super::protocol::{ClientCommand, ServerCommand, CLIENT_GREET, SERVER_GREET};
use super::{ConnectProgress, SyncCallbacks, SyncClient, SyncError, TrackId};
use crate::tracks::Track;

/// Time from starting a connect to the editor's greeting
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause between polls while [`RocketClient::connect`] waits
const CONNECT_POLL: Duration = Duration::from_millis(1);
const READ_CHUNK: usize = 4096;

enum Session {
    Closed,
    Handshaking { stream: TcpStream, started: Instant },
    Open(TcpStream),
}

/// Client for the GNU Rocket editor protocol
pub struct RocketClient {
    prefix: String,
    tracks: Vec<Track>,
    session: Session,
    inbox: BytesMut,
    /// Bytes the socket has not accepted yet
    outbox: BytesMut,
    /// Last row reported to the editor while playing
    last_row: Option<u32>,
}

impl RocketClient {
    /// Create a client whose saved tracks are named `<prefix>_<track>.track`
    pub fn new(prefix: &str) -> Result<Self, SyncError> {
        if prefix.contains('\0') {
            return Err(SyncError::InvalidPrefix(prefix.to_string()));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            tracks: Vec::new(),
            session: Session::Closed,
            inbox: BytesMut::with_capacity(READ_CHUNK),
            outbox: BytesMut::new(),
            last_row: None,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// File a track is saved to
    pub fn track_path(&self, name: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}.track", self.prefix, encode_file_name(name)))
    }

    /// Issue a non-blocking connect and queue the greeting
    fn start(&mut self, host: &str, port: u16) -> Result<TcpStream, SyncError> {
        let addr = resolve(host, port)?;
        let stream = TcpStream::connect(addr)?;
        trace!("Connecting to editor at {}", addr);

        self.inbox.clear();
        self.outbox.clear();
        self.outbox.extend_from_slice(CLIENT_GREET);
        self.last_row = None;
        Ok(stream)
    }

    fn advance(
        &mut self,
        stream: &mut TcpStream,
        started: Instant,
    ) -> Result<ConnectProgress, SyncError> {
        if started.elapsed() >= HANDSHAKE_TIMEOUT {
            return Err(SyncError::HandshakeTimeout(HANDSHAKE_TIMEOUT));
        }
        if let Some(e) = stream.take_error()? {
            return Err(e.into());
        }
        match stream.peer_addr() {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotConnected => return Ok(ConnectProgress::Pending),
            Err(e) => return Err(e.into()),
        }

        flush(stream, &mut self.outbox)?;
        fill(stream, &mut self.inbox)?;
        if self.inbox.len() < SERVER_GREET.len() {
            return Ok(ConnectProgress::Pending);
        }

        let greet = self.inbox.split_to(SERVER_GREET.len());
        if greet[..] != *SERVER_GREET {
            return Err(SyncError::Handshake(greet.to_vec()));
        }
        stream.set_nodelay(true)?;

        // The editor resends every key it has for a requested track.
        for track in &mut self.tracks {
            track.clear();
            ClientCommand::GetTrack {
                name: track.name().to_string(),
            }
            .encode(&mut self.outbox);
        }
        flush(stream, &mut self.outbox)?;

        Ok(ConnectProgress::Connected)
    }

    fn pump(
        &mut self,
        stream: &mut TcpStream,
        row: f64,
        callbacks: &mut dyn SyncCallbacks,
    ) -> Result<(), SyncError> {
        fill(stream, &mut self.inbox)?;

        while let Some(command) = ServerCommand::decode(&mut self.inbox)? {
            self.apply(command, callbacks)?;
        }

        if callbacks.is_playing() {
            let row = row.floor() as i32 as u32;
            if self.last_row != Some(row) {
                ClientCommand::SetRow { row }.encode(&mut self.outbox);
                self.last_row = Some(row);
            }
        }

        flush(stream, &mut self.outbox)?;
        Ok(())
    }

    fn apply(
        &mut self,
        command: ServerCommand,
        callbacks: &mut dyn SyncCallbacks,
    ) -> Result<(), SyncError> {
        trace!(?command, "Editor command");

        match command {
            ServerCommand::SetKey { track, key } => {
                self.tracks
                    .get_mut(track as usize)
                    .ok_or(SyncError::UnknownTrack(track))?
                    .set_key(key);
            }
            ServerCommand::DeleteKey { track, row } => {
                self.tracks
                    .get_mut(track as usize)
                    .ok_or(SyncError::UnknownTrack(track))?
                    .delete_key(row);
            }
            ServerCommand::SetRow { row } => callbacks.set_row(row as i32),
            ServerCommand::Pause { flag } => callbacks.pause(flag),
            ServerCommand::SaveTracks => {
                if let Err(e) = self.save_tracks(callbacks) {
                    warn!("Failed to save tracks: {}", e);
                }
            }
        }

        Ok(())
    }

    fn save_tracks(&self, callbacks: &mut dyn SyncCallbacks) -> io::Result<()> {
        for track in &self.tracks {
            let path = self.track_path(track.name());
            let mut out = BufWriter::new(File::create(&path)?);
            for key in track.keys() {
                callbacks.write_key(&mut out, key.kind.as_u8(), key.row, key.value)?;
            }
            out.flush()?;
            debug!("Saved {} keys to {}", track.keys().len(), path.display());
        }

        info!("Saved {} tracks", self.tracks.len());
        Ok(())
    }
}

impl SyncClient for RocketClient {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), SyncError> {
        self.disconnect();

        loop {
            match self.poll_connect(host, port)? {
                ConnectProgress::Connected => return Ok(()),
                ConnectProgress::Pending => thread::sleep(CONNECT_POLL),
            }
        }
    }

    fn poll_connect(&mut self, host: &str, port: u16) -> Result<ConnectProgress, SyncError> {
        let (mut stream, started) = match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Open(stream) => {
                self.session = Session::Open(stream);
                return Ok(ConnectProgress::Connected);
            }
            Session::Handshaking { stream, started } => (stream, started),
            Session::Closed => (self.start(host, port)?, Instant::now()),
        };

        match self.advance(&mut stream, started) {
            Ok(ConnectProgress::Connected) => {
                self.session = Session::Open(stream);
                Ok(ConnectProgress::Connected)
            }
            Ok(ConnectProgress::Pending) => {
                self.session = Session::Handshaking { stream, started };
                Ok(ConnectProgress::Pending)
            }
            Err(err) => {
                let _ = stream.shutdown(Shutdown::Both);
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        matches!(self.session, Session::Open(_))
    }

    fn get_track(&mut self, name: &str, kind: i32) -> TrackId {
        if let Some(idx) = self.tracks.iter().position(|t| t.name() == name) {
            return TrackId(idx);
        }

        self.tracks.push(Track::new(name, kind));
        let id = TrackId(self.tracks.len() - 1);

        // A handshake in flight requests every track once the editor greets.
        if let Session::Open(stream) = &mut self.session {
            ClientCommand::GetTrack {
                name: name.to_string(),
            }
            .encode(&mut self.outbox);

            // A failed request drops the link; reconnecting requests it again.
            if let Err(e) = flush(stream, &mut self.outbox) {
                warn!("Failed to request track '{}': {}", name, e);
                let _ = stream.shutdown(Shutdown::Both);
                self.session = Session::Closed;
            }
        }

        id
    }

    fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0)
    }

    fn update(&mut self, row: f64, callbacks: &mut dyn SyncCallbacks) -> Result<(), SyncError> {
        let mut stream = match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Open(stream) => stream,
            other => {
                self.session = other;
                return Err(SyncError::NotConnected);
            }
        };

        match self.pump(&mut stream, row, callbacks) {
            Ok(()) => {
                self.session = Session::Open(stream);
                Ok(())
            }
            Err(err) => {
                let _ = stream.shutdown(Shutdown::Both);
                Err(err)
            }
        }
    }

    fn disconnect(&mut self) {
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Open(stream) | Session::Handshaking { stream, .. } => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            Session::Closed => {}
        }
    }
}

/// First address for `host`, IPv4 preferred
fn resolve(host: &str, port: u16) -> Result<SocketAddr, SyncError> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| SyncError::Resolve(format!("{}:{}", host, port)))
}

/// Drain whatever the socket has buffered into `inbox`
fn fill(stream: &mut TcpStream, inbox: &mut BytesMut) -> Result<(), SyncError> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => {
                return Err(SyncError::Io(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "editor closed the connection",
                )))
            }
            Ok(n) => inbox.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write as much of `outbox` as the socket takes now; the rest waits
fn flush(stream: &mut TcpStream, outbox: &mut BytesMut) -> io::Result<()> {
    while !outbox.is_empty() {
        match stream.write(&outbox[..]) {
            Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => outbox.advance(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Keep `[A-Za-z0-9._]` and escape everything else as `-XX`
fn encode_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("-{:02X}", byte));
        }
    }
    out
}
