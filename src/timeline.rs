//! Playback position
//!
//! The guest advances a vsync counter through the control registers; rows
//! are derived from it. Seeking to a row snaps the counter to the start of
//! that row, so any phase within the previous row is lost.

/// Vsyncs per row when the configured speed is unusable
pub const DEFAULT_TICKS_PER_ROW: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineState {
    vsyncs: i32,
    ticks_per_row: u32,
}

impl TimelineState {
    /// Start at tick 0. A ratio of 0 falls back to the default.
    pub fn new(ticks_per_row: u32) -> Self {
        let ticks_per_row = if ticks_per_row > 0 {
            ticks_per_row
        } else {
            DEFAULT_TICKS_PER_ROW
        };

        Self {
            vsyncs: 0,
            ticks_per_row,
        }
    }

    pub fn ticks_per_row(&self) -> u32 {
        self.ticks_per_row
    }

    /// Fractional row at the current tick
    pub fn row_from_position(&self) -> f64 {
        f64::from(self.vsyncs) / f64::from(self.ticks_per_row)
    }

    pub fn position(&self) -> i32 {
        self.vsyncs
    }

    pub fn set_position(&mut self, vsyncs: i32) {
        self.vsyncs = vsyncs;
    }

    /// Seek to the first tick of `row`
    pub fn set_row(&mut self, row: i32) {
        self.vsyncs = row.wrapping_mul(self.ticks_per_row as i32);
    }

    pub fn advance(&mut self, delta_vsyncs: i32) {
        self.vsyncs = self.vsyncs.wrapping_add(delta_vsyncs);
    }
}

impl Default for TimelineState {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_ROW)
    }
}
