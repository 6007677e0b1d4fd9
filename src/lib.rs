//! Rocket podule
//!
//! Emulated expansion card that exposes GNU Rocket sync tracks to the guest
//! through a 16 KiB register window, and follows the editor's playback
//! position over TCP.

pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod sync;
pub mod timeline;
pub mod tracks;

pub use config::{ConfigSource, DeviceConfig};
pub use device::{DeviceController, IoType, PoduleDevice, RUN_INTERVAL_US};
pub use error::InitError;
pub use sync::{ConnectProgress, ConnectionState, RocketClient, SyncClient};
pub use timeline::TimelineState;
pub use tracks::TrackStore;
