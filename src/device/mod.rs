//! Rocket podule device
//!
//! The host owns the calling convention; it only needs [`PoduleDevice`] and
//! the `init`/`close` pair on [`DeviceController`]. Every call into one
//! device must be serialized by the host. Nothing here locks or spawns.

use std::io::{self, Write};

use tracing::info;

use crate::codec;
use crate::config::DeviceConfig;
use crate::error::InitError;
use crate::sync::{
    self, ConnectionState, LinkOutcome, RocketClient, SyncCallbacks, SyncClient, SyncLink,
};
use crate::timeline::TimelineState;
use crate::tracks::{load_track_list, TrackListEntry, TrackStore};

pub mod address;

use address::Region;

/// Interval the host should wait between `run` calls (10 ms)
pub const RUN_INTERVAL_US: u32 = 10 * 1000;

/// Bus cycle type of an access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoType {
    Ioc,
    Memc,
    Easi,
}

/// Host-facing entry points
///
/// Reads of unmapped addresses or non-MEMC cycles return all ones; writes to
/// them are ignored.
pub trait PoduleDevice {
    fn read_byte(&self, io: IoType, addr: u32) -> u8;

    fn read_word(&self, io: IoType, addr: u32) -> u16;

    fn write_byte(&mut self, io: IoType, addr: u32, val: u8);

    fn write_word(&mut self, io: IoType, addr: u32, val: u16);

    /// Service the device, returning microseconds until the next call
    fn run(&mut self, timeslice_us: u32) -> u32;
}

/// The podule: timeline registers, track samples and the editor link
pub struct DeviceController<C = RocketClient> {
    timeline: TimelineState,
    playing: bool,
    tracks: TrackStore,
    link: SyncLink<C>,
}

impl DeviceController<RocketClient> {
    /// Read the track list, connect to the editor and register every track
    pub fn init(config: &DeviceConfig) -> Result<Self, InitError> {
        info!("Opening track list '{}'", config.track_list.display());
        let entries = load_track_list(&config.track_list)?;
        info!("Found {} tracks in list", entries.len());

        info!("Creating Rocket device with prefix '{}'", config.prefix);
        let client = RocketClient::new(&config.prefix).map_err(|source| InitError::CreateDevice {
            prefix: config.prefix.clone(),
            source,
        })?;

        Self::with_client(config, &entries, client)
    }
}

impl<C: SyncClient> DeviceController<C> {
    /// Start a device on an already created client
    pub fn with_client(
        config: &DeviceConfig,
        entries: &[TrackListEntry],
        client: C,
    ) -> Result<Self, InitError> {
        let mut link = SyncLink::new(client, config.host.clone(), config.port);

        info!("Connecting to editor on {} at port {}", config.host, config.port);
        link.connect().map_err(|source| InitError::Connect {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        let tracks = TrackStore::build(link.client_mut(), entries);
        let timeline = TimelineState::new(config.ticks_per_row());

        info!(
            "Completed init with speed {} vsyncs per row",
            timeline.ticks_per_row()
        );

        Ok(Self {
            timeline,
            playing: false,
            tracks,
            link,
        })
    }

    pub fn timeline(&self) -> &TimelineState {
        &self.timeline
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn tracks(&self) -> &TrackStore {
        &self.tracks
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn link(&self) -> &SyncLink<C> {
        &self.link
    }

    /// Current value of track `index`, as the guest would see it
    pub fn sample(&self, index: usize) -> Option<f32> {
        let row = self.timeline.row_from_position();
        self.tracks.sample(self.link.client(), index, row).ok()
    }

    /// Shut the device down and release the editor connection
    pub fn close(mut self) {
        info!("Closing Rocket device");
        self.link.close();
    }

    /// One half-word of the Q15.16 sample of a track. Unknown tracks read 0.
    fn sample_word(&self, index: usize, high_word: bool) -> u16 {
        match self.sample(index) {
            Some(value) => codec::split_for_bus(codec::to_fixed(value), high_word),
            None => 0,
        }
    }
}

impl<C: SyncClient> PoduleDevice for DeviceController<C> {
    fn read_byte(&self, io: IoType, addr: u32) -> u8 {
        if io != IoType::Memc {
            return 0xff;
        }

        match address::decode(addr) {
            Region::Track {
                index,
                high_word,
                high_byte,
            } => codec::slice_byte(self.sample_word(index, high_word), high_byte),
            Region::Position { high_byte } => {
                codec::slice_byte(self.timeline.position() as u16, high_byte)
            }
            Region::Playing => u8::from(self.playing),
            Region::Unmapped => 0xff,
        }
    }

    fn read_word(&self, io: IoType, addr: u32) -> u16 {
        if io != IoType::Memc {
            return 0xffff;
        }

        match address::decode(addr) {
            Region::Track {
                index, high_word, ..
            } => self.sample_word(index, high_word),
            Region::Position { .. } => self.timeline.position() as u16,
            Region::Playing => u16::from(self.playing),
            Region::Unmapped => 0xffff,
        }
    }

    fn write_byte(&mut self, io: IoType, addr: u32, val: u8) {
        if io != IoType::Memc {
            return;
        }

        let position = self.timeline.position();
        match addr {
            address::POSITION_LOW => self
                .timeline
                .set_position((position & 0xff00) | i32::from(val)),
            address::POSITION_HIGH => self
                .timeline
                .set_position((i32::from(val) << 8) | (position & 0xff)),
            address::PLAYING => self.playing = val != 0,
            _ => {}
        }
    }

    fn write_word(&mut self, io: IoType, addr: u32, val: u16) {
        if io != IoType::Memc {
            return;
        }

        match addr {
            address::POSITION_LOW => self.timeline.set_position(i32::from(val)),
            address::PLAYING => self.playing = val != 0,
            _ => {}
        }
    }

    fn run(&mut self, _timeslice_us: u32) -> u32 {
        let row = self.timeline.row_from_position();
        let mut callbacks = DeviceCallbacks {
            timeline: &mut self.timeline,
            playing: &mut self.playing,
        };

        if self.link.update(row, &mut callbacks) == LinkOutcome::Down {
            self.link.reconnect();
        }

        RUN_INTERVAL_US
    }
}

/// Device state lent to the sync client for one update
struct DeviceCallbacks<'a> {
    timeline: &'a mut TimelineState,
    playing: &'a mut bool,
}

impl SyncCallbacks for DeviceCallbacks<'_> {
    fn is_playing(&self) -> bool {
        *self.playing
    }

    fn pause(&mut self, flag: bool) {
        *self.playing = !flag;
    }

    fn set_row(&mut self, row: i32) {
        self.timeline.set_row(row);
    }

    fn write_key(&mut self, out: &mut dyn Write, kind: u8, row: u32, value: f32) -> io::Result<()> {
        sync::write_key(out, kind, row, value, self.timeline.ticks_per_row())
    }
}
