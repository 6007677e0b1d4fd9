//! Podule address decoding
//!
//! ```text
//! 0x0000-0x3ff7  track samples, 8 bytes per track
//!                +0/+1 low half-word, +4/+5 high half-word
//! 0x3ff8/0x3ff9  vsync counter low/high byte
//! 0x3ffc         playback flag (mirrored over 0x3ffc-0x3fff)
//! ```

/// Size of the decoded window
pub const WINDOW_SIZE: u32 = 0x4000;

/// First control register
pub const CONTROL_BASE: u32 = 0x3ff8;

pub const POSITION_LOW: u32 = 0x3ff8;
pub const POSITION_HIGH: u32 = 0x3ff9;
pub const PLAYING: u32 = 0x3ffc;

/// What a bus address refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Track {
        index: usize,
        high_word: bool,
        high_byte: bool,
    },
    Position {
        high_byte: bool,
    },
    Playing,
    Unmapped,
}

pub fn decode(addr: u32) -> Region {
    if addr >= WINDOW_SIZE {
        return Region::Unmapped;
    }

    let high_word = addr & 4 != 0;
    let high_byte = addr & 1 != 0;

    if addr >= CONTROL_BASE {
        if high_word {
            Region::Playing
        } else {
            Region::Position { high_byte }
        }
    } else {
        Region::Track {
            index: (addr >> 3) as usize,
            high_word,
            high_byte,
        }
    }
}
