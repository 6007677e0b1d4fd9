//! Device initialization errors

use std::path::PathBuf;

use thiserror::Error;

use crate::sync::SyncError;

/// Reasons a device fails to start. The host must not use it afterwards.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to open track list '{}': {source}", .path.display())]
    TrackList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to create sync device with prefix '{prefix}': {source}")]
    CreateDevice {
        prefix: String,
        #[source]
        source: SyncError,
    },

    #[error("failed to connect to editor at {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: SyncError,
    },
}
