//! Fixed-point value codec
//!
//! Track samples travel over the bus as signed Q15.16 words. The guest reads
//! them 16 bits at a time (low half at `+0`, high half at `+4`) or one byte
//! at a time within a half.

/// Number of fractional bits in the wire format
pub const FRACTION_BITS: u32 = 16;

const ONE: f64 = (1u32 << FRACTION_BITS) as f64;

/// Convert a sample to Q15.16.
///
/// The magnitude is truncated toward zero and the sign re-applied, so
/// `to_fixed(-v) == -to_fixed(v)`. Values outside the 32-bit range saturate.
pub fn to_fixed(value: f32) -> i32 {
    let magnitude = (f64::from(value).abs() * ONE) as i32;
    if value < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Convert a Q15.16 value back to a float
pub fn from_fixed(fixed: i32) -> f32 {
    (f64::from(fixed) / ONE) as f32
}

/// Select the high (`fixed >> 16`) or low (`fixed & 0xffff`) half-word
pub fn split_for_bus(fixed: i32, want_high: bool) -> u16 {
    if want_high {
        (fixed >> 16) as u16
    } else {
        (fixed & 0xffff) as u16
    }
}

/// Extract one byte lane of a half-word
pub fn slice_byte(word: u16, want_high_byte: bool) -> u8 {
    if want_high_byte {
        (word >> 8) as u8
    } else {
        (word & 0xff) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_whole_numbers() {
        assert_eq!(to_fixed(0.0), 0);
        assert_eq!(to_fixed(1.0), 0x0001_0000);
        assert_eq!(to_fixed(-1.0), -0x0001_0000);
        assert_eq!(to_fixed(2.5), 0x0002_8000);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 1/3 * 65536 = 21845.33..
        assert_eq!(to_fixed(1.0 / 3.0), 21845);
        assert_eq!(to_fixed(-1.0 / 3.0), -21845);
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(to_fixed(-0.0), 0);
    }

    #[test]
    fn test_split_negative_value() {
        let fixed = to_fixed(-1.5); // 0xfffe8000
        assert_eq!(split_for_bus(fixed, true), 0xfffe);
        assert_eq!(split_for_bus(fixed, false), 0x8000);
    }

    #[test]
    fn test_slice_byte() {
        assert_eq!(slice_byte(0x3412, false), 0x12);
        assert_eq!(slice_byte(0x3412, true), 0x34);
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_one_lsb(v in -32767.99f32..32767.99f32) {
            let back = from_fixed(to_fixed(v));
            prop_assert!((f64::from(back) - f64::from(v)).abs() < 1.0 / ONE);
        }

        #[test]
        fn prop_sign_symmetry(v in -32767.99f32..32767.99f32) {
            prop_assert_eq!(to_fixed(-v), -to_fixed(v));
        }

        #[test]
        fn prop_halves_reassemble(fixed in any::<i32>()) {
            let high = split_for_bus(fixed, true) as u32;
            let low = split_for_bus(fixed, false) as u32;
            prop_assert_eq!(((high << 16) | low) as i32, fixed);
        }
    }
}
