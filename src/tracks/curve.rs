//! Key curves
//!
//! A track is a sorted list of keys. Between two keys the value follows the
//! interpolation type of the earlier key.

/// Interpolation applied from a key up to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyKind {
    /// Hold the key value until the next key
    Step = 0,
    /// Straight line to the next key
    Linear = 1,
    /// Smoothstep (`t²(3 - 2t)`) to the next key
    Smooth = 2,
    /// Quadratic ease-in (`t²`) to the next key
    Ramp = 3,
}

impl KeyKind {
    /// Decode the wire type byte
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(KeyKind::Step),
            1 => Some(KeyKind::Linear),
            2 => Some(KeyKind::Smooth),
            3 => Some(KeyKind::Ramp),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A single authored edit point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackKey {
    pub row: u32,
    pub value: f32,
    pub kind: KeyKind,
}

/// A named, typed parameter curve
#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    kind: i32,
    keys: Vec<TrackKey>,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            keys: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag from the track list
    pub fn kind(&self) -> i32 {
        self.kind
    }

    /// Keys in ascending row order
    pub fn keys(&self) -> &[TrackKey] {
        &self.keys
    }

    /// Insert a key, replacing any key already at the same row
    pub fn set_key(&mut self, key: TrackKey) {
        match self.keys.binary_search_by_key(&key.row, |k| k.row) {
            Ok(idx) => self.keys[idx] = key,
            Err(idx) => self.keys.insert(idx, key),
        }
    }

    /// Remove the key at `row`, returning whether one existed
    pub fn delete_key(&mut self, row: u32) -> bool {
        match self.keys.binary_search_by_key(&row, |k| k.row) {
            Ok(idx) => {
                self.keys.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Sample the curve at a fractional row
    pub fn value_at(&self, row: f64) -> f64 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };

        let irow = row.floor();
        if irow < f64::from(first.row) {
            return f64::from(first.value);
        }
        if irow >= f64::from(last.row) {
            return f64::from(last.value);
        }

        // Index of the last key at or before `irow`; both bounds checked above.
        let idx = self.keys.partition_point(|k| f64::from(k.row) <= irow) - 1;
        let (a, b) = (&self.keys[idx], &self.keys[idx + 1]);

        let t = (row - f64::from(a.row)) / f64::from(b.row - a.row);
        let shaped = match a.kind {
            KeyKind::Step => return f64::from(a.value),
            KeyKind::Linear => t,
            KeyKind::Smooth => t * t * (3.0 - 2.0 * t),
            KeyKind::Ramp => t * t,
        };
        f64::from(a.value) + (f64::from(b.value) - f64::from(a.value)) * shaped
    }
}
