// SPDX-License-Identifier: MPL-2.0
//! Owned RGB24 frame buffers.
//!
//! An [`RgbFrame`] is a move-only handle: it is not `Clone`, so
//! a buffer can only be in one place at a time (the pool's free list, the
//! decoder, the loader's result slot, or the sliding window). Returning a
//! frame to the pool consumes the handle.

use super::stream_info::RGB24_BYTES_PER_PIXEL;

/// Timestamp value of a frame that is not bound to any stream position.
pub const NO_PTS: i64 = -1;

/// A decoded frame in packed RGB24 layout.
pub struct RgbFrame {
    data: Box<[u8]>,
    width: u32,
    height: u32,
    /// Presentation timestamp in stream time-base units, `NO_PTS` when free.
    pub pts: i64,
    /// Display duration in stream time-base units.
    pub duration: i64,
}

impl RgbFrame {
    /// Allocates a zeroed frame of the given geometry.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * RGB24_BYTES_PER_PIXEL;
        Self {
            data: vec![0u8; len].into_boxed_slice(),
            width,
            height,
            pts: NO_PTS,
            duration: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row (no padding).
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width as usize * RGB24_BYTES_PER_PIXEL
    }

    /// Packed pixel data, `width * height * 3` bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data for in-place conversion.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// First pts after this frame (`pts + duration`).
    #[must_use]
    pub fn end_pts(&self) -> i64 {
        self.pts.saturating_add(self.duration)
    }

    /// Returns true if `pts` lies within `[self.pts, self.pts + duration)`.
    #[must_use]
    pub fn contains_pts(&self, pts: i64) -> bool {
        self.has_pts() && self.pts <= pts && pts < self.end_pts()
    }

    /// Returns true once the frame carries a resolved timestamp.
    #[must_use]
    pub fn has_pts(&self) -> bool {
        self.pts != NO_PTS
    }

    /// Returns true if the frame has the given geometry.
    #[must_use]
    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Unbinds the frame from any stream position.
    pub fn reset(&mut self) {
        self.pts = NO_PTS;
        self.duration = 0;
    }

    /// Copies `height` rows of `stride`-spaced source data into the packed
    /// buffer. Returns false when the source is too short.
    pub fn copy_rows_from(&mut self, src: &[u8], src_stride: usize) -> bool {
        let row_len = self.stride();
        if src_stride < row_len {
            return false;
        }
        let rows = self.height as usize;
        if rows > 0 && src.len() < (rows - 1) * src_stride + row_len {
            return false;
        }
        for (row, dst) in self.data.chunks_exact_mut(row_len).enumerate() {
            let start = row * src_stride;
            dst.copy_from_slice(&src[start..start + row_len]);
        }
        true
    }
}

impl std::fmt::Debug for RgbFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pts", &self.pts)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_unbound_and_sized() {
        let frame = RgbFrame::new(4, 3);
        assert_eq!(frame.data().len(), 4 * 3 * 3);
        assert_eq!(frame.stride(), 12);
        assert!(!frame.has_pts());
        assert_eq!(frame.duration, 0);
    }

    #[test]
    fn contains_pts_is_half_open() {
        let mut frame = RgbFrame::new(1, 1);
        frame.pts = 10;
        frame.duration = 5;
        assert!(frame.contains_pts(10));
        assert!(frame.contains_pts(14));
        assert!(!frame.contains_pts(15));
        assert!(!frame.contains_pts(9));
        assert_eq!(frame.end_pts(), 15);
    }

    #[test]
    fn unbound_frame_contains_nothing() {
        let mut frame = RgbFrame::new(1, 1);
        frame.duration = 10;
        assert!(!frame.contains_pts(NO_PTS));
        assert!(!frame.contains_pts(0));
    }

    #[test]
    fn copy_rows_strips_padding() {
        let mut frame = RgbFrame::new(2, 2);
        // stride 8: 6 pixel bytes + 2 padding bytes per row
        let src = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        assert!(frame.copy_rows_from(&src, 8));
        assert_eq!(frame.data(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn copy_rows_rejects_short_source() {
        let mut frame = RgbFrame::new(2, 2);
        assert!(!frame.copy_rows_from(&[0u8; 10], 6));
        assert!(!frame.copy_rows_from(&[0u8; 64], 4));
    }

    #[test]
    fn reset_unbinds_frame() {
        let mut frame = RgbFrame::new(1, 1);
        frame.pts = 3;
        frame.duration = 1;
        frame.reset();
        assert_eq!(frame.pts, NO_PTS);
        assert_eq!(frame.duration, 0);
    }
}
