// SPDX-License-Identifier: MPL-2.0
//! Time base arithmetic for the frame pipeline.
//!
//! Presentation timestamps are integers in a stream-specific time base. This
//! module provides the rational type used to describe those time bases and
//! exact integer rescaling between them, including the microsecond time base
//! FFmpeg uses for container-level seeks.

use serde::{Deserialize, Serialize};

/// Microseconds per second as f64 for calculations.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Time base of microsecond timestamps (FFmpeg's `AV_TIME_BASE_Q`).
pub const MICROS_TIME_BASE: Rational = Rational::new(1, 1_000_000);

/// A rational number, used as a time base (seconds per pts unit) or as a
/// frame rate (frames per second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    #[must_use]
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Returns true when both terms are strictly positive.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Returns the value as f64, or 0.0 for a zero denominator.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            f64::from(self.num) / f64::from(self.den)
        }
    }

    /// Returns the reciprocal (a frame rate becomes a frame period).
    #[must_use]
    pub fn invert(self) -> Self {
        Self::new(self.den, self.num)
    }
}

impl From<ffmpeg_next::Rational> for Rational {
    fn from(value: ffmpeg_next::Rational) -> Self {
        Self::new(value.numerator(), value.denominator())
    }
}

/// Rescales `value` from time base `from` to time base `to`, rounding to the
/// nearest integer (halves away from zero).
///
/// Returns 0 when either time base has a zero term.
///
/// # Examples
///
/// ```
/// use vidinspect::video_player::time_units::{rescale, Rational, MICROS_TIME_BASE};
///
/// let tb = Rational::new(1, 30);
/// assert_eq!(rescale(30, tb, MICROS_TIME_BASE), 1_000_000);
/// assert_eq!(rescale(1_000_000, MICROS_TIME_BASE, tb), 30);
/// ```
#[must_use]
pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    let num = i128::from(value) * i128::from(from.num) * i128::from(to.den);
    let den = i128::from(from.den) * i128::from(to.num);
    if den == 0 {
        return 0;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let quotient = if num >= 0 {
        (num + den / 2) / den
    } else {
        (num - den / 2) / den
    };
    i64::try_from(quotient).unwrap_or(if quotient < 0 { i64::MIN } else { i64::MAX })
}

/// Converts a timestamp in `time_base` units to microseconds.
///
/// # Examples
///
/// ```
/// use vidinspect::video_player::time_units::{pts_to_micros, Rational};
///
/// assert_eq!(pts_to_micros(1, Rational::new(1, 30)), 33_333);
/// assert_eq!(pts_to_micros(90_000, Rational::new(1, 90_000)), 1_000_000);
/// ```
#[inline]
#[must_use]
pub fn pts_to_micros(pts: i64, time_base: Rational) -> i64 {
    rescale(pts, time_base, MICROS_TIME_BASE)
}

/// Converts microseconds to a timestamp in `time_base` units.
#[inline]
#[must_use]
pub fn micros_to_pts(micros: i64, time_base: Rational) -> i64 {
    rescale(micros, MICROS_TIME_BASE, time_base)
}

/// Converts a timestamp in `time_base` units to seconds.
#[inline]
#[must_use]
pub fn pts_to_secs(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.as_f64()
}

/// Converts seconds to microseconds (f64 for display precision).
#[inline]
#[must_use]
pub fn secs_to_micros(secs: f64) -> f64 {
    secs * MICROS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_rounds_to_nearest() {
        let tb = Rational::new(1, 30);
        // 1/30 s = 33_333.33 µs
        assert_eq!(rescale(1, tb, MICROS_TIME_BASE), 33_333);
        // 2/30 s = 66_666.67 µs
        assert_eq!(rescale(2, tb, MICROS_TIME_BASE), 66_667);
    }

    #[test]
    fn rescale_handles_negative_values() {
        let tb = Rational::new(1, 30);
        assert_eq!(rescale(-1, tb, MICROS_TIME_BASE), -33_333);
        assert_eq!(rescale(-30, tb, MICROS_TIME_BASE), -1_000_000);
    }

    #[test]
    fn rescale_zero_time_base_returns_zero() {
        assert_eq!(rescale(10, Rational::new(0, 0), MICROS_TIME_BASE), 0);
        assert_eq!(rescale(10, MICROS_TIME_BASE, Rational::new(0, 1)), 0);
    }

    #[test]
    fn rescale_saturates_instead_of_wrapping() {
        let huge = Rational::new(i32::MAX, 1);
        assert_eq!(rescale(i64::MAX, huge, MICROS_TIME_BASE), i64::MAX);
        assert_eq!(rescale(i64::MIN, huge, MICROS_TIME_BASE), i64::MIN);
    }

    #[test]
    fn micros_round_trip_on_90khz_clock() {
        let tb = Rational::new(1, 90_000);
        for pts in [0, 1_500, 3_003, 90_000, 1_234_567] {
            let back = micros_to_pts(pts_to_micros(pts, tb), tb);
            assert!((back - pts).abs() <= 1, "pts {pts} came back as {back}");
        }
    }

    #[test]
    fn pts_to_secs_uses_time_base() {
        let tb = Rational::new(1, 25);
        assert!((pts_to_secs(50, tb) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rational_validity_and_inverse() {
        assert!(Rational::new(30, 1).is_valid());
        assert!(!Rational::new(0, 1).is_valid());
        assert!(!Rational::new(1, 0).is_valid());
        assert_eq!(Rational::new(30_000, 1_001).invert(), Rational::new(1_001, 30_000));
        assert_eq!(Rational::new(1, 0).as_f64(), 0.0);
    }

    #[test]
    fn secs_to_micros_converts_correctly() {
        assert_eq!(secs_to_micros(1.0), 1_000_000.0);
        assert_eq!(secs_to_micros(0.5), 500_000.0);
    }
}
