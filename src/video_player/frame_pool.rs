// SPDX-License-Identifier: MPL-2.0
//! Pooled allocator for RGB frame buffers.
//!
//! The pool is the long-term owner of frame memory. Components borrow a frame
//! with [`FramePool::get`] and hand it back with [`FramePool::put`]; in
//! between, the [`RgbFrame`] handle travels by move. `get` never blocks on
//! anything but the free-list mutex and never fails: an empty free list grows
//! the pool.
//!
//! # Geometry changes
//!
//! [`FramePool::create_frames`] switches the pool to a new frame size. Frames
//! of the old size that are still checked out are dropped when they come
//! back instead of being recycled.

use super::frame::RgbFrame;
use parking_lot::Mutex;

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Frames currently in the free list.
    pub free: usize,

    /// Frames of the current geometry that exist (free + checked out).
    pub allocated: usize,

    /// Number of `get` calls served from the free list.
    pub recycled: u64,

    /// Current frame width.
    pub width: u32,

    /// Current frame height.
    pub height: u32,
}

impl PoolStats {
    /// Frames currently owned by someone other than the pool.
    #[must_use]
    pub fn checked_out(&self) -> usize {
        self.allocated.saturating_sub(self.free)
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    free: Vec<RgbFrame>,
    width: u32,
    height: u32,
    allocated: usize,
    recycled: u64,
}

/// Thread-safe recycler of fixed-size RGB frames.
#[derive(Debug, Default)]
pub struct FramePool {
    inner: Mutex<PoolInner>,
}

impl FramePool {
    /// Creates an empty pool with 0x0 geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every free frame and allocates `count` frames of the new size.
    ///
    /// Consumers must be flushed first: frames still checked out under the
    /// old geometry are discarded on return.
    pub fn create_frames(&self, count: usize, width: u32, height: u32) {
        let frames: Vec<RgbFrame> = (0..count).map(|_| RgbFrame::new(width, height)).collect();
        let mut inner = self.inner.lock();
        inner.free = frames;
        inner.width = width;
        inner.height = height;
        inner.allocated = count;
        inner.recycled = 0;
        log::debug!("frame pool reset to {count} frames of {width}x{height}");
    }

    /// Returns a frame for writing, allocating one if the free list is empty.
    pub fn get(&self) -> RgbFrame {
        let mut inner = self.inner.lock();
        if let Some(frame) = inner.free.pop() {
            inner.recycled += 1;
            return frame;
        }
        inner.allocated += 1;
        let (width, height) = (inner.width, inner.height);
        drop(inner);
        log::trace!("frame pool grew to fit a new {width}x{height} frame");
        RgbFrame::new(width, height)
    }

    /// Unbinds `frame` and returns it to the free list.
    pub fn put(&self, mut frame: RgbFrame) {
        frame.reset();
        let mut inner = self.inner.lock();
        if frame.has_size(inner.width, inner.height) {
            inner.free.push(frame);
        } else {
            // Left over from a previous geometry; let it drop.
            log::trace!(
                "dropping stale {}x{} frame returned to the pool",
                frame.width(),
                frame.height()
            );
        }
    }

    /// Returns every frame of `frames` to the pool. `None` is a no-op.
    pub fn put_all<I>(&self, frames: I)
    where
        I: IntoIterator<Item = RgbFrame>,
    {
        for frame in frames {
            self.put(frame);
        }
    }

    /// Returns a snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            free: inner.free.len(),
            allocated: inner.allocated,
            recycled: inner.recycled,
            width: inner.width,
            height: inner.height,
        }
    }

    /// Number of frames in the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.inner.lock().free.len()
    }
}
