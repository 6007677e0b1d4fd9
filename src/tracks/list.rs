//! Track-list file reader
//!
//! One `name type` pair per line. Reading stops at the first line that is
//! not exactly two tokens with an integer second token; everything before
//! it is kept.

use std::path::Path;

use tracing::debug;

use crate::error::InitError;

/// A `(name, type)` pair from the track list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackListEntry {
    pub name: String,
    pub kind: i32,
}

/// Parse track-list text
pub fn parse_track_list(text: &str) -> Vec<TrackListEntry> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => continue,
            [name, kind] => match kind.parse::<i32>() {
                Ok(kind) => entries.push(TrackListEntry {
                    name: (*name).to_string(),
                    kind,
                }),
                Err(_) => break,
            },
            _ => break,
        }
    }

    entries
}

/// Read and parse a track-list file
pub fn load_track_list(path: &Path) -> Result<Vec<TrackListEntry>, InitError> {
    let text = std::fs::read_to_string(path).map_err(|source| InitError::TrackList {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = parse_track_list(&text);
    debug!("Found {} tracks in {}", entries.len(), path.display());
    Ok(entries)
}
