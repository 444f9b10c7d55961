// SPDX-License-Identifier: MPL-2.0
//! Deterministic in-memory frame source.
//!
//! Generates a stream of solid-color frames with exact, configurable
//! timestamps. Used by the test suite, the benchmarks and the CLI's
//! `--synthetic` mode to exercise the pipeline without a media file.
//!
//! Every pixel byte of frame `i` is `i % 256`, so callers can check which
//! frame they received with [`SyntheticSource::frame_index`].

use super::decoder::FrameSource;
use super::frame::{RgbFrame, NO_PTS};
use super::stream_info::StreamInfo;
use super::time_units::Rational;
use crate::error::{Result, VideoError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared read/seek counters, readable after the source moved to another
/// thread.
#[derive(Debug, Default)]
pub struct SourceCounters {
    reads: AtomicUsize,
    skipped: AtomicUsize,
    seeks: AtomicUsize,
}

impl SourceCounters {
    /// Frames converted and returned by `read`.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Frames discarded because they were before the skip target.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Calls to `seek`.
    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::SeqCst)
    }
}

/// A generated stream of `frame_count` frames.
#[derive(Debug)]
pub struct SyntheticSource {
    info: StreamInfo,
    frame_duration: i64,
    gop: usize,
    position: usize,
    read_delay: Option<Duration>,
    gap_after: Option<(usize, i64)>,
    missing_pts: HashSet<usize>,
    corrupt: HashSet<usize>,
    counters: Arc<SourceCounters>,
}

impl SyntheticSource {
    /// 16x8 frames at time base 1/30, one pts unit per frame, pts `0..frame_count`.
    #[must_use]
    pub fn new(frame_count: usize) -> Self {
        let frame_count = i64::try_from(frame_count).unwrap_or(i64::MAX);
        Self {
            info: StreamInfo {
                time_base: Rational::new(1, 30),
                start_pts: 0,
                duration_pts: frame_count,
                frame_count,
                width: 16,
                height: 8,
                frame_rate: Some(Rational::new(30, 1)),
            },
            frame_duration: 1,
            gop: 1,
            position: 0,
            read_delay: None,
            gap_after: None,
            missing_pts: HashSet::new(),
            corrupt: HashSet::new(),
            counters: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.info.width = width;
        self.info.height = height;
        self
    }

    /// Sets the time base and per-frame duration; the frame rate follows.
    #[must_use]
    pub fn with_timing(mut self, time_base: Rational, frame_duration: i64) -> Self {
        let frame_duration = frame_duration.max(1);
        self.info.time_base = time_base;
        self.info.duration_pts = self.info.frame_count * frame_duration;
        self.info.frame_rate = i32::try_from(frame_duration)
            .ok()
            .map(|d| Rational::new(time_base.den, time_base.num.saturating_mul(d)));
        self.frame_duration = frame_duration;
        self
    }

    /// Only every `gop`-th frame is a sync point; seeks land on the last sync
    /// point at or before the target.
    #[must_use]
    pub fn with_gop(mut self, gop: usize) -> Self {
        self.gop = gop.max(1);
        self
    }

    /// Sleeps this long in every successful `read`.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Shifts every frame after `index` by `extra` pts units.
    #[must_use]
    pub fn with_gap_after(mut self, index: usize, extra: i64) -> Self {
        self.gap_after = Some((index, extra));
        self.info.duration_pts += extra;
        self
    }

    /// Makes frame `index` come out without a timestamp.
    #[must_use]
    pub fn with_missing_pts(mut self, index: usize) -> Self {
        self.missing_pts.insert(index);
        self
    }

    /// Makes every read that reaches frame `index` fail with a decode error.
    /// The frame is consumed; the next read continues after it.
    #[must_use]
    pub fn with_corrupt(mut self, index: usize) -> Self {
        self.corrupt.insert(index);
        self
    }

    /// Handle to the source's counters.
    #[must_use]
    pub fn counters(&self) -> Arc<SourceCounters> {
        Arc::clone(&self.counters)
    }

    /// Number of generated frames.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.info.frame_count).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of frame `index`, ignoring missing-pts injection.
    #[must_use]
    pub fn pts_of(&self, index: usize) -> i64 {
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        let base = self.info.start_pts + index * self.frame_duration;
        match self.gap_after {
            Some((after, extra)) if index > i64::try_from(after).unwrap_or(i64::MAX) => {
                base + extra
            }
            _ => base,
        }
    }

    /// Frame index encoded in the pixels of a frame produced by this source.
    #[must_use]
    pub fn frame_index(frame: &RgbFrame) -> Option<u8> {
        frame.data().first().copied()
    }

    /// Index of the last frame starting at or before `pts`, 0 if none.
    fn index_at(&self, pts: i64) -> usize {
        (0..self.len())
            .take_while(|&index| self.pts_of(index) <= pts)
            .last()
            .unwrap_or(0)
    }
}

impl FrameSource for SyntheticSource {
    fn stream_info(&self) -> &StreamInfo {
        &self.info
    }

    fn read(&mut self, dest: &mut RgbFrame, skip_before: Option<i64>) -> Result<()> {
        while self.position < self.len() {
            let index = self.position;
            self.position += 1;

            let pts = if self.missing_pts.contains(&index) {
                NO_PTS
            } else {
                self.pts_of(index)
            };
            if skip_before.is_some_and(|skip| pts < skip) {
                self.counters.skipped.fetch_add(1, Ordering::SeqCst);
                continue;
            }

            if self.corrupt.contains(&index) {
                return Err(VideoError::DecodingFailed(format!("corrupt frame {index}")).into());
            }

            if !dest.has_size(self.info.width, self.info.height) {
                return Err(VideoError::FrameSizeMismatch {
                    expected: (self.info.width, self.info.height),
                    actual: (dest.width(), dest.height()),
                }
                .into());
            }

            if let Some(delay) = self.read_delay {
                std::thread::sleep(delay);
            }
            dest.data_mut().fill((index % 256) as u8);
            dest.pts = pts;
            dest.duration = self.frame_duration;
            self.counters.reads.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        Err(VideoError::EndOfStream.into())
    }

    fn seek(&mut self, pts: i64) -> Result<()> {
        self.counters.seeks.fetch_add(1, Ordering::SeqCst);
        let index = self.index_at(pts);
        self.position = index - index % self.gop;
        Ok(())
    }
}
