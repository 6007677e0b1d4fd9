//! Track storage
//!
//! The sync client owns the key data (the editor edits it live). The store
//! only remembers which client track sits at each bus index; the mapping is
//! sized once from the track list and never changes.

use thiserror::Error;
use tracing::debug;

use crate::sync::{SyncClient, TrackId};

pub mod curve;
pub mod list;

pub use curve::{KeyKind, Track, TrackKey};
pub use list::{load_track_list, parse_track_list, TrackListEntry};

/// Track index past the end of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("track index {index} out of range ({count} tracks)")]
pub struct OutOfRange {
    pub index: usize,
    pub count: usize,
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    kind: i32,
    id: TrackId,
}

/// Index-addressed tracks, in track-list order
#[derive(Debug, Clone)]
pub struct TrackStore {
    slots: Box<[Slot]>,
}

impl TrackStore {
    /// Register every entry with `client`
    pub fn build<C: SyncClient>(client: &mut C, entries: &[TrackListEntry]) -> Self {
        let slots = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                debug!("Getting track [{}] named '{}' with type {}", i, entry.name, entry.kind);
                Slot {
                    name: entry.name.clone(),
                    kind: entry.kind,
                    id: client.get_track(&entry.name, entry.kind),
                }
            })
            .collect();

        Self { slots }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.name.as_str())
    }

    pub fn kind(&self, index: usize) -> Option<i32> {
        self.slots.get(index).map(|s| s.kind)
    }

    /// Sample track `index` at a fractional row
    pub fn sample<C: SyncClient>(&self, client: &C, index: usize, row: f64) -> Result<f32, OutOfRange> {
        let out_of_range = OutOfRange {
            index,
            count: self.slots.len(),
        };
        let slot = self.slots.get(index).ok_or(out_of_range)?;
        let track = client.track(slot.id).ok_or(out_of_range)?;
        Ok(track.value_at(row) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::FakeClient;
    use crate::sync::RocketClient;

    fn store_for(text: &str) -> (RocketClient, TrackStore) {
        let mut client = RocketClient::new("").unwrap();
        let store = TrackStore::build(&mut client, &parse_track_list(text));
        (client, store)
    }

    #[test]
    fn test_count_from_track_list() {
        let (_, store) = store_for("kick 0\nsnare 1\n");
        assert_eq!(store.count(), 2);
        assert_eq!(store.name(1), Some("snare"));
        assert_eq!(store.kind(1), Some(1));

        let (_, store) = store_for("kick 0\nsnare 1\nbad");
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_sample_out_of_range() {
        let (client, store) = store_for("kick 0\n");
        assert_eq!(
            store.sample(&client, 1, 0.0),
            Err(OutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn test_sample_reads_client_keys() {
        let mut client = FakeClient::default();
        let store = TrackStore::build(&mut client, &parse_track_list("kick 0\nsnare 1\n"));
        client.set_key(TrackId(1), TrackKey { row: 0, value: 0.0, kind: KeyKind::Linear });
        client.set_key(TrackId(1), TrackKey { row: 8, value: 4.0, kind: KeyKind::Linear });

        assert_eq!(store.sample(&client, 0, 5.0), Ok(0.0));
        assert_eq!(store.sample(&client, 1, 5.0), Ok(2.5));
        assert_eq!(store.sample(&client, 1, 2.25), Ok(1.125));
    }

    #[test]
    fn test_duplicate_names_share_a_track() {
        let (_, store) = store_for("kick 0\nkick 0\n");
        assert_eq!(store.count(), 2);
        assert_eq!(store.slots[0].id, store.slots[1].id);
    }
}
