// SPDX-License-Identifier: MPL-2.0
//! Consumer-side sliding window of decoded frames.
//!
//! The window holds a few frames around a cursor so that single-frame steps
//! in either direction are served from memory. It is filled from a
//! [`FrameProducer`] one frame per call, at the back while loading forward
//! and at the front while loading backward.
//!
//! # Design
//!
//! - **Sorted**: frames are kept in ascending pts order
//! - **Backpressure**: when full, an end is only evicted if more than
//!   `margin` frames separate it from the cursor; otherwise the producer's
//!   frame is left where it is
//! - **Reversing**: stepping toward an end that is not being filled asks the
//!   producer to load in the other direction, starting next to that end
//! - **Permissive**: a pts gap between neighbors is logged and counted, and
//!   the frame is kept

use super::frame::{RgbFrame, NO_PTS};
use super::frame_loader::{FrameProducer, LoadDirection};
use super::frame_pool::FramePool;
use std::collections::VecDeque;
use std::sync::Arc;

/// Window counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    /// Frames accepted from the producer.
    pub insertions: u64,

    /// Frames evicted to make room, each recycled to the pool.
    pub evictions: u64,

    /// Insertions whose pts did not continue the neighbor frame.
    pub discontinuities: u64,
}

/// Fixed-capacity ordered frame cache with a cursor.
pub struct FrameWindow {
    frames: VecDeque<RgbFrame>,
    capacity: usize,
    margin: usize,
    selected: usize,
    direction: LoadDirection,
    pool: Arc<FramePool>,
    stats: WindowStats,
}

impl FrameWindow {
    /// Creates an empty, forward-filling window.
    ///
    /// `capacity` is raised to at least 2 and `margin` kept below half of it.
    #[must_use]
    pub fn new(capacity: usize, margin: usize, pool: Arc<FramePool>) -> Self {
        let capacity = capacity.max(2);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            margin: margin.min((capacity - 1) / 2),
            selected: 0,
            direction: LoadDirection::Forward,
            pool,
            stats: WindowStats::default(),
        }
    }

    /// Takes at most one frame from `producer` and inserts it at the end
    /// matching the fill direction.
    ///
    /// Returns whether a frame was accepted.
    pub fn fill_from(&mut self, producer: &dyn FrameProducer) -> bool {
        if self.is_full() && !self.can_evict() {
            return false;
        }
        let Some(frame) = producer.get_frame() else {
            return false;
        };

        if self.is_full() {
            self.evict();
        }

        match self.direction {
            LoadDirection::Forward => {
                let prev = self.frames.back().map(|back| (back.pts, back.end_pts()));
                if let Some((prev_pts, prev_end)) = prev {
                    self.check_contiguity(prev_pts, prev_end, frame.pts);
                }
                self.frames.push_back(frame);
            }
            LoadDirection::Backward => {
                if let Some(next_pts) = self.frames.front().map(|front| front.pts) {
                    self.check_contiguity(frame.pts, frame.end_pts(), next_pts);
                }
                let was_empty = self.frames.is_empty();
                self.frames.push_front(frame);
                if !was_empty {
                    self.selected += 1;
                }
            }
        }

        self.stats.insertions += 1;
        true
    }

    /// Moves the cursor one frame later. Returns whether it moved.
    pub fn seek_next_frame(&mut self, producer: &dyn FrameProducer) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        let moved = self.selected + 1 < self.frames.len();
        if moved {
            self.selected += 1;
        }

        let ahead = self.frames.len() - 1 - self.selected;
        if ahead <= self.margin && self.direction == LoadDirection::Backward {
            if let Some(back) = self.frames.iter().rev().find(|f| f.has_pts()) {
                let target = back.end_pts();
                log::debug!("window reversing to forward fill from pts {target}");
                producer.seek(LoadDirection::Forward, Some(target));
                self.direction = LoadDirection::Forward;
            }
        }
        moved
    }

    /// Moves the cursor one frame earlier. Returns whether it moved.
    pub fn seek_prev_frame(&mut self, producer: &dyn FrameProducer) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        let moved = self.selected > 0;
        if moved {
            self.selected -= 1;
        }

        if self.selected <= self.margin && self.direction == LoadDirection::Forward {
            // Frames without a timestamp cannot anchor a seek.
            if let Some(front) = self.frames.iter().find(|f| f.has_pts()) {
                let target = front.pts - 1;
                log::debug!("window reversing to backward fill before pts {}", front.pts);
                producer.seek(LoadDirection::Backward, Some(target));
                self.direction = LoadDirection::Backward;
            }
        }
        moved
    }

    /// Drops every frame and restarts forward loading at `pts`.
    pub fn seek_to(&mut self, producer: &dyn FrameProducer, pts: i64) {
        self.flush();
        producer.seek(LoadDirection::Forward, Some(pts));
    }

    /// Returns every frame to the pool and resets to an empty,
    /// forward-filling state. Counters are kept.
    pub fn flush(&mut self) {
        self.pool.put_all(self.frames.drain(..));
        self.selected = 0;
        self.direction = LoadDirection::Forward;
    }

    /// Frame under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&RgbFrame> {
        self.frames.get(self.selected)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn margin(&self) -> usize {
        self.margin
    }

    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Current fill direction.
    #[must_use]
    pub fn direction(&self) -> LoadDirection {
        self.direction
    }

    #[must_use]
    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Frames in ascending pts order.
    pub fn frames(&self) -> impl Iterator<Item = &RgbFrame> {
        self.frames.iter()
    }

    /// True when the cursor is on the last frame (or the window is empty).
    #[must_use]
    pub fn is_at_back(&self) -> bool {
        self.selected + 1 >= self.frames.len()
    }

    fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    /// Whether the end opposite the fill direction may be dropped.
    fn can_evict(&self) -> bool {
        match self.direction {
            LoadDirection::Forward => self.selected > self.margin,
            LoadDirection::Backward => self.frames.len() - 1 - self.selected > self.margin,
        }
    }

    fn evict(&mut self) {
        let evicted = match self.direction {
            LoadDirection::Forward => {
                let frame = self.frames.pop_front();
                self.selected = self.selected.saturating_sub(1);
                frame
            }
            LoadDirection::Backward => self.frames.pop_back(),
        };
        if let Some(frame) = evicted {
            log::trace!("window evicted pts {}", frame.pts);
            self.pool.put(frame);
            self.stats.evictions += 1;
        }
    }

    /// Counts a gap between a frame ending at `prev_end` and the next one.
    /// Frames without a timestamp are not checked.
    fn check_contiguity(&mut self, prev_pts: i64, prev_end: i64, next_pts: i64) {
        if prev_pts == NO_PTS || next_pts == NO_PTS || prev_end == next_pts {
            return;
        }
        log::warn!(
            "frame window discontinuity: frame at pts {prev_pts} ends at {prev_end}, next starts at {next_pts}"
        );
        self.stats.discontinuities += 1;
    }
}

impl Drop for FrameWindow {
    fn drop(&mut self) {
        self.flush();
    }
}

impl std::fmt::Debug for FrameWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWindow")
            .field("len", &self.frames.len())
            .field("capacity", &self.capacity)
            .field("margin", &self.margin)
            .field("selected", &self.selected)
            .field("direction", &self.direction)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Producer that hands out queued frames and records seeks.
    struct Scripted {
        pool: Arc<FramePool>,
        ready: RefCell<VecDeque<RgbFrame>>,
        seeks: RefCell<Vec<(LoadDirection, Option<i64>)>>,
    }

    impl Scripted {
        fn new(pool: &Arc<FramePool>) -> Self {
            Self {
                pool: Arc::clone(pool),
                ready: RefCell::new(VecDeque::new()),
                seeks: RefCell::new(Vec::new()),
            }
        }

        fn queue(&self, pts: i64, duration: i64) {
            let mut frame = self.pool.get();
            frame.pts = pts;
            frame.duration = duration;
            self.ready.borrow_mut().push_back(frame);
        }

        fn queue_range(&self, pts: std::ops::Range<i64>) {
            for p in pts {
                self.queue(p, 1);
            }
        }

        fn queue_descending(&self, pts: std::ops::Range<i64>) {
            for p in pts.rev() {
                self.queue(p, 1);
            }
        }

        fn last_seek(&self) -> Option<(LoadDirection, Option<i64>)> {
            self.seeks.borrow().last().copied()
        }
    }

    impl FrameProducer for Scripted {
        fn get_frame(&self) -> Option<RgbFrame> {
            self.ready.borrow_mut().pop_front()
        }

        fn seek(&self, direction: LoadDirection, target: Option<i64>) {
            self.seeks.borrow_mut().push((direction, target));
            self.pool.put_all(self.ready.borrow_mut().drain(..));
        }

        fn is_end_of_stream(&self) -> bool {
            false
        }
    }

    fn setup(capacity: usize, margin: usize) -> (Arc<FramePool>, FrameWindow, Scripted) {
        let pool = Arc::new(FramePool::new());
        pool.create_frames(capacity + 4, 2, 2);
        let window = FrameWindow::new(capacity, margin, Arc::clone(&pool));
        let producer = Scripted::new(&pool);
        (pool, window, producer)
    }

    fn fill_all(window: &mut FrameWindow, producer: &Scripted) -> usize {
        let mut accepted = 0;
        while window.fill_from(producer) {
            accepted += 1;
        }
        accepted
    }

    fn pts_list(window: &FrameWindow) -> Vec<i64> {
        window.frames().map(|f| f.pts).collect()
    }

    #[test]
    fn contiguous_forward_fill_has_no_discontinuity() {
        let (_pool, mut window, producer) = setup(10, 2);
        producer.queue_range(0..8);
        assert_eq!(fill_all(&mut window, &producer), 8);
        assert_eq!(pts_list(&window), (0..8).collect::<Vec<_>>());
        assert_eq!(window.stats().discontinuities, 0);
        assert_eq!(window.current().map(|f| f.pts), Some(0));
    }

    #[test]
    fn one_gap_counts_once_and_frame_is_kept() {
        let (_pool, mut window, producer) = setup(10, 2);
        producer.queue_range(0..3);
        producer.queue(5, 1);
        producer.queue(6, 1);
        fill_all(&mut window, &producer);
        assert_eq!(window.len(), 5);
        assert_eq!(window.stats().discontinuities, 1);
        assert_eq!(pts_list(&window), vec![0, 1, 2, 5, 6]);
    }

    #[test]
    fn frames_without_pts_skip_contiguity_check() {
        let (_pool, mut window, producer) = setup(10, 2);
        producer.queue(0, 1);
        producer.queue(NO_PTS, 0);
        fill_all(&mut window, &producer);
        assert_eq!(window.stats().discontinuities, 0);
    }

    #[test]
    fn full_window_applies_backpressure_near_cursor() {
        let (_pool, mut window, producer) = setup(4, 1);
        producer.queue_range(0..6);
        assert_eq!(fill_all(&mut window, &producer), 4);
        // Cursor at 0: evicting the front would leave no frame behind it.
        assert!(!window.fill_from(&producer));
        assert_eq!(window.len(), 4);
        assert_eq!(producer.ready.borrow().len(), 2);
    }

    #[test]
    fn eviction_keeps_cursor_on_same_frame_and_recycles() {
        let (pool, mut window, producer) = setup(4, 1);
        producer.queue_range(0..6);
        fill_all(&mut window, &producer);
        assert!(window.seek_next_frame(&producer));
        assert!(window.seek_next_frame(&producer));
        assert_eq!(window.current().map(|f| f.pts), Some(2));

        let free_before = pool.free_count();
        assert!(window.fill_from(&producer));
        assert_eq!(pool.free_count(), free_before + 1);
        assert_eq!(window.current().map(|f| f.pts), Some(2));
        assert_eq!(window.selected_index(), 1);
        assert_eq!(pts_list(&window), vec![1, 2, 3, 4]);
        assert_eq!(window.stats().evictions, 1);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let (_pool, mut window, producer) = setup(5, 2);
        producer.queue_range(0..40);
        for _ in 0..40 {
            window.fill_from(&producer);
            window.seek_next_frame(&producer);
            assert!(window.len() <= window.capacity());
        }
        assert!(window.stats().evictions > 0);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let (_pool, mut window, producer) = setup(4, 1);
        assert!(!window.seek_next_frame(&producer));
        assert!(!window.seek_prev_frame(&producer));
        producer.queue_range(0..2);
        fill_all(&mut window, &producer);
        assert!(window.seek_next_frame(&producer));
        assert!(!window.seek_next_frame(&producer));
        assert!(window.is_at_back());
    }

    #[test]
    fn stepping_back_near_front_reverses_to_backward_fill() {
        let (_pool, mut window, producer) = setup(6, 2);
        producer.queue_range(10..16);
        fill_all(&mut window, &producer);
        window.seek_next_frame(&producer);
        window.seek_next_frame(&producer);
        window.seek_next_frame(&producer);
        assert!(producer.last_seek().is_none());

        // Cursor 3 -> 2: now within the margin of the front.
        assert!(window.seek_prev_frame(&producer));
        assert_eq!(
            producer.last_seek(),
            Some((LoadDirection::Backward, Some(9)))
        );
        assert_eq!(window.direction(), LoadDirection::Backward);

        // Backward frames arrive newest first and are prepended, until only
        // `margin` frames remain after the cursor.
        producer.queue_descending(7..10);
        assert_eq!(fill_all(&mut window, &producer), 1);
        assert_eq!(pts_list(&window), vec![9, 10, 11, 12, 13, 14]);
        assert_eq!(window.current().map(|f| f.pts), Some(12));

        assert!(window.seek_prev_frame(&producer));
        assert_eq!(fill_all(&mut window, &producer), 1);
        assert_eq!(pts_list(&window), vec![8, 9, 10, 11, 12, 13]);
        assert_eq!(window.current().map(|f| f.pts), Some(11));
        assert_eq!(window.stats().discontinuities, 0);
        assert_eq!(window.stats().evictions, 2);
    }

    #[test]
    fn reversal_anchors_on_first_timestamped_frame() {
        let (_pool, mut window, producer) = setup(6, 2);
        producer.queue(NO_PTS, 0);
        producer.queue_range(11..16);
        fill_all(&mut window, &producer);
        for _ in 0..3 {
            window.seek_next_frame(&producer);
        }

        assert!(window.seek_prev_frame(&producer));
        assert_eq!(
            producer.last_seek(),
            Some((LoadDirection::Backward, Some(10)))
        );
    }

    #[test]
    fn no_reversal_without_any_timestamp() {
        let (_pool, mut window, producer) = setup(6, 2);
        for _ in 0..4 {
            producer.queue(NO_PTS, 0);
        }
        fill_all(&mut window, &producer);
        window.seek_next_frame(&producer);

        assert!(window.seek_prev_frame(&producer));
        assert!(producer.last_seek().is_none());
        assert_eq!(window.direction(), LoadDirection::Forward);
    }

    #[test]
    fn stepping_forward_near_back_reverses_to_forward_fill() {
        let (_pool, mut window, producer) = setup(6, 2);
        producer.queue_range(0..6);
        fill_all(&mut window, &producer);
        for _ in 0..3 {
            window.seek_next_frame(&producer);
        }
        window.seek_prev_frame(&producer);
        assert_eq!(window.direction(), LoadDirection::Backward);

        window.seek_next_frame(&producer);
        window.seek_next_frame(&producer);
        assert_eq!(
            producer.last_seek(),
            Some((LoadDirection::Forward, Some(6)))
        );
        assert_eq!(window.direction(), LoadDirection::Forward);
    }

    #[test]
    fn seek_to_flushes_and_requests_forward_load() {
        let (pool, mut window, producer) = setup(6, 2);
        producer.queue_range(0..4);
        fill_all(&mut window, &producer);
        let free_before = pool.free_count();

        window.seek_to(&producer, 42);
        assert!(window.is_empty());
        assert_eq!(pool.free_count(), free_before + 4);
        assert_eq!(
            producer.last_seek(),
            Some((LoadDirection::Forward, Some(42)))
        );
        assert!(window.current().is_none());
    }

    #[test]
    fn drop_returns_frames_to_pool() {
        let (pool, mut window, producer) = setup(6, 2);
        producer.queue_range(0..3);
        fill_all(&mut window, &producer);
        drop(window);
        drop(producer);
        assert_eq!(pool.stats().checked_out(), 0);
    }
}
