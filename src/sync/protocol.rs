//! Rocket editor wire protocol
//!
//! All integers are big-endian. Commands are a single opcode byte followed
//! by a fixed payload, except `GET_TRACK` which carries a length-prefixed
//! name.

use bytes::{Buf, BufMut, BytesMut};

use super::SyncError;
use crate::tracks::{KeyKind, TrackKey};

/// Sent by the device right after connecting
pub const CLIENT_GREET: &[u8] = b"hello, synctracker!";

/// Expected reply from the editor
pub const SERVER_GREET: &[u8] = b"hello, demo!";

pub const SET_KEY: u8 = 0;
pub const DELETE_KEY: u8 = 1;
pub const GET_TRACK: u8 = 2;
pub const SET_ROW: u8 = 3;
pub const PAUSE: u8 = 4;
pub const SAVE_TRACKS: u8 = 5;

/// Commands received from the editor
#[derive(Debug, Clone, PartialEq)]
pub enum ServerCommand {
    SetKey { track: u32, key: TrackKey },
    DeleteKey { track: u32, row: u32 },
    SetRow { row: u32 },
    Pause { flag: bool },
    SaveTracks,
}

impl ServerCommand {
    /// Decode one command from the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched while the command is
    /// still incomplete.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, SyncError> {
        let Some(&opcode) = buf.first() else {
            return Ok(None);
        };

        let payload = match opcode {
            SET_KEY => 13,
            DELETE_KEY => 8,
            SET_ROW => 4,
            PAUSE => 1,
            SAVE_TRACKS => 0,
            other => return Err(SyncError::UnknownCommand(other)),
        };

        if buf.len() < 1 + payload {
            return Ok(None);
        }
        buf.advance(1);

        let command = match opcode {
            SET_KEY => {
                let track = buf.get_u32();
                let row = buf.get_u32();
                let value = f32::from_bits(buf.get_u32());
                // Types newer editors add fall back to a hold.
                let kind = KeyKind::from_u8(buf.get_u8()).unwrap_or(KeyKind::Step);
                ServerCommand::SetKey {
                    track,
                    key: TrackKey { row, value, kind },
                }
            }
            DELETE_KEY => ServerCommand::DeleteKey {
                track: buf.get_u32(),
                row: buf.get_u32(),
            },
            SET_ROW => ServerCommand::SetRow { row: buf.get_u32() },
            PAUSE => ServerCommand::Pause {
                flag: buf.get_u8() != 0,
            },
            _ => ServerCommand::SaveTracks,
        };

        Ok(Some(command))
    }

    /// Encode as the editor would send it
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            ServerCommand::SetKey { track, key } => {
                buf.put_u8(SET_KEY);
                buf.put_u32(*track);
                buf.put_u32(key.row);
                buf.put_u32(key.value.to_bits());
                buf.put_u8(key.kind.as_u8());
            }
            ServerCommand::DeleteKey { track, row } => {
                buf.put_u8(DELETE_KEY);
                buf.put_u32(*track);
                buf.put_u32(*row);
            }
            ServerCommand::SetRow { row } => {
                buf.put_u8(SET_ROW);
                buf.put_u32(*row);
            }
            ServerCommand::Pause { flag } => {
                buf.put_u8(PAUSE);
                buf.put_u8(u8::from(*flag));
            }
            ServerCommand::SaveTracks => buf.put_u8(SAVE_TRACKS),
        }
    }
}

/// Commands sent to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    GetTrack { name: String },
    SetRow { row: u32 },
}

impl ClientCommand {
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            ClientCommand::GetTrack { name } => {
                buf.put_u8(GET_TRACK);
                buf.put_u32(name.len() as u32);
                buf.put_slice(name.as_bytes());
            }
            ClientCommand::SetRow { row } => {
                buf.put_u8(SET_ROW);
                buf.put_u32(*row);
            }
        }
    }

    /// Decode as the editor would read it
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, SyncError> {
        let Some(&opcode) = buf.first() else {
            return Ok(None);
        };

        match opcode {
            GET_TRACK => {
                if buf.len() < 5 {
                    return Ok(None);
                }
                let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
                if buf.len() < 5 + len {
                    return Ok(None);
                }
                buf.advance(5);
                let name = String::from_utf8_lossy(&buf.split_to(len)).into_owned();
                Ok(Some(ClientCommand::GetTrack { name }))
            }
            SET_ROW => {
                if buf.len() < 5 {
                    return Ok(None);
                }
                buf.advance(1);
                Ok(Some(ClientCommand::SetRow { row: buf.get_u32() }))
            }
            other => Err(SyncError::UnknownCommand(other)),
        }
    }
}
