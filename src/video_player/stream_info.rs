// SPDX-License-Identifier: MPL-2.0
//! Immutable per-session stream metadata.
//!
//! `StreamInfo` is obtained once when a source is opened and never changes
//! afterwards. It owns the only mapping between playback progress (a
//! percentage) and presentation timestamps, and between timestamps and
//! wall-clock microseconds.

use super::time_units::{micros_to_pts, pts_to_micros, rescale, Rational};
use serde::{Deserialize, Serialize};

/// Bytes per pixel of the packed RGB24 output format.
pub const RGB24_BYTES_PER_PIXEL: usize = 3;

/// Metadata of the selected video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Seconds per pts unit.
    pub time_base: Rational,

    /// Timestamp of the first frame, in `time_base` units.
    pub start_pts: i64,

    /// Stream duration in `time_base` units (0 when unknown).
    pub duration_pts: i64,

    /// Number of frames reported by the container (0 when unknown).
    pub frame_count: i64,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Average frame rate, when the container reports one.
    pub frame_rate: Option<Rational>,
}

impl StreamInfo {
    /// Returns playback progress in percent for `pts`, clamped to `[0, 100]`.
    ///
    /// Streams with unknown duration always report 0.
    #[must_use]
    pub fn calc_progress(&self, pts: i64) -> f64 {
        if self.duration_pts <= 0 {
            return 0.0;
        }
        let offset = pts.saturating_sub(self.start_pts) as f64;
        (offset / self.duration_pts as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Converts a progress percentage to a timestamp. Out-of-range input is
    /// clamped to the stream bounds.
    #[must_use]
    pub fn progress_to_pts(&self, progress: f64) -> i64 {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 100.0)
        };
        let offset = (progress / 100.0 * self.duration_pts.max(0) as f64).round() as i64;
        self.start_pts.saturating_add(offset)
    }

    /// Converts an absolute timestamp to microseconds.
    #[must_use]
    pub fn pts_to_micros(&self, pts: i64) -> i64 {
        pts_to_micros(pts, self.time_base)
    }

    /// Converts microseconds to an absolute timestamp.
    #[must_use]
    pub fn micros_to_pts(&self, micros: i64) -> i64 {
        micros_to_pts(micros, self.time_base)
    }

    /// Timestamp one past the last frame.
    #[must_use]
    pub fn end_pts(&self) -> i64 {
        self.start_pts.saturating_add(self.duration_pts.max(0))
    }

    /// Timestamp of the last frame, estimated from the nominal frame
    /// duration and never before `start_pts`.
    #[must_use]
    pub fn last_frame_pts(&self) -> i64 {
        self.end_pts()
            .saturating_sub(self.nominal_frame_duration())
            .max(self.start_pts)
    }

    /// Nominal duration of one frame in `time_base` units, never below 1.
    ///
    /// Derived from the frame rate when known, otherwise from the frame count.
    #[must_use]
    pub fn nominal_frame_duration(&self) -> i64 {
        if let Some(rate) = self.frame_rate.filter(|rate| rate.is_valid()) {
            if self.time_base.is_valid() {
                return rescale(1, rate.invert(), self.time_base).max(1);
            }
        }
        if self.frame_count > 0 && self.duration_pts > 0 {
            return (self.duration_pts / self.frame_count).max(1);
        }
        1
    }

    /// Size in bytes of one packed RGB24 frame.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * RGB24_BYTES_PER_PIXEL
    }
}
