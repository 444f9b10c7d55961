// SPDX-License-Identifier: MPL-2.0
//! Background frame producer.
//!
//! A [`FrameLoader`] owns one decode thread and a small monitor shared with
//! the consumer: the requested direction, an optional one-shot seek target,
//! a single-frame result slot, and the end-of-stream / shutdown flags. All of
//! it lives behind one mutex with one condition variable.
//!
//! # Protocol
//!
//! ```text
//!  consumer                      monitor                      producer
//!  ────────                      ───────                      ────────
//!  seek(dir, target) ──────▶ direction, target,        ◀── wait while slot full
//!                            generation += 1               or at end of stream
//!                            stale slot recycled
//!                                                      ──▶ snapshot request
//!                                                          decode (unlocked)
//!  get_frame()       ◀────── slot.take()               ◀── publish if generation
//!                                                          unchanged, else recycle
//! ```
//!
//! The producer stays at most one frame ahead of the consumer. A decode in
//! flight is never interrupted; if the consumer changed the request while it
//! ran, the result is recycled to the pool instead of being published.

use super::decoder::FrameSource;
use super::frame::RgbFrame;
use super::frame_pool::FramePool;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Consecutive non-terminal read failures tolerated before the loader gives
/// up on the current direction.
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// Direction in which frames are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadDirection {
    #[default]
    Forward,
    Backward,
}

/// Consumer-facing side of a frame producer.
///
/// [`FrameLoader`] is the production implementation; the sliding window only
/// depends on this trait.
pub trait FrameProducer {
    /// Takes the produced frame, if one is ready. Never blocks on decoding.
    fn get_frame(&self) -> Option<RgbFrame>;

    /// Switches direction and optionally requests a seek. Any frame produced
    /// for the previous request is discarded.
    fn seek(&self, direction: LoadDirection, target: Option<i64>);

    /// True when the producer ran out of frames in the current direction.
    fn is_end_of_stream(&self) -> bool;
}

#[derive(Debug, Default)]
struct LoaderState {
    direction: LoadDirection,
    seek_target: Option<i64>,
    result: Option<RgbFrame>,
    finished: bool,
    end_of_stream: bool,
    generation: u64,
}

impl LoaderState {
    fn is_idle(&self) -> bool {
        self.result.is_some() || (self.end_of_stream && self.seek_target.is_none())
    }

    fn request(&self) -> Request {
        Request {
            generation: self.generation,
            direction: self.direction,
            seek_target: self.seek_target,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<LoaderState>,
    wake: Condvar,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        !state.finished && state.generation == generation
    }
}

/// Snapshot of the monitor taken before a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Request {
    generation: u64,
    direction: LoadDirection,
    seek_target: Option<i64>,
}

/// Outcome of one production cycle.
enum Produced {
    Frame(RgbFrame),
    /// Nothing more in this direction until the next seek.
    Exhausted,
    /// Transient failure; try again.
    Retry,
}

/// Fixed-capacity ring of frames decoded forward from a seek point, served
/// newest-first to emulate backward decoding.
struct BackwardCache {
    frames: VecDeque<RgbFrame>,
    capacity: usize,
}

impl BackwardCache {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Appends `frame`, recycling the oldest one when full.
    fn push(&mut self, frame: RgbFrame, pool: &FramePool) {
        if self.frames.len() == self.capacity {
            pool.put_all(self.frames.pop_front());
        }
        self.frames.push_back(frame);
    }

    /// Drops frames without a timestamp and sorts the rest by pts.
    fn settle(&mut self, pool: &FramePool) {
        let (keep, unresolved): (Vec<_>, Vec<_>) =
            self.frames.drain(..).partition(RgbFrame::has_pts);
        pool.put_all(unresolved);
        let mut keep = keep;
        keep.sort_by_key(|frame| frame.pts);
        self.frames.extend(keep);
    }

    fn pop_latest(&mut self) -> Option<RgbFrame> {
        self.frames.pop_back()
    }

    fn clear(&mut self, pool: &FramePool) {
        pool.put_all(self.frames.drain(..));
    }
}

/// State owned by the decode thread.
struct Producer {
    source: Box<dyn FrameSource>,
    pool: Arc<FramePool>,
    shared: Arc<Shared>,
    backward: BackwardCache,
    /// Generation the backward ring was filled for.
    generation: u64,
    last_known_pts: Option<i64>,
    failures: u32,
}

impl Producer {
    fn run(mut self) {
        log::debug!("frame loader started");
        while let Some(request) = self.wait_for_request() {
            if request.generation != self.generation {
                self.backward.clear(&self.pool);
                self.generation = request.generation;
                self.failures = 0;
            }

            let produced = self.produce(request);
            self.publish(request, produced);
        }
        self.backward.clear(&self.pool);
        log::debug!("frame loader stopped");
    }

    /// Blocks until there is work to do. Returns `None` on shutdown.
    fn wait_for_request(&self) -> Option<Request> {
        let mut state = self.shared.state.lock();
        loop {
            if state.finished {
                return None;
            }
            if !state.is_idle() {
                return Some(state.request());
            }
            self.shared.wake.wait(&mut state);
        }
    }

    fn publish(&mut self, request: Request, produced: Produced) {
        let mut state = self.shared.state.lock();
        if state.finished || state.generation != request.generation {
            drop(state);
            if let Produced::Frame(frame) = produced {
                log::trace!("discarding stale frame at pts {}", frame.pts);
                self.pool.put(frame);
            }
            return;
        }

        // A seek request is consumed by exactly one production cycle.
        if request.seek_target.is_some() {
            state.seek_target = None;
        }

        match produced {
            Produced::Frame(frame) => {
                self.failures = 0;
                self.last_known_pts = Some(frame.pts);
                state.result = Some(frame);
            }
            Produced::Exhausted => {
                state.end_of_stream = true;
            }
            Produced::Retry => {
                self.failures += 1;
                if self.failures >= MAX_CONSECUTIVE_FAILURES {
                    log::warn!("giving up after {} failed reads", self.failures);
                    state.end_of_stream = true;
                }
            }
        }
        self.shared.wake.notify_all();
    }

    fn produce(&mut self, request: Request) -> Produced {
        match request.direction {
            LoadDirection::Forward => self.produce_forward(request.seek_target),
            LoadDirection::Backward => self.produce_backward(request),
        }
    }

    fn produce_forward(&mut self, seek_target: Option<i64>) -> Produced {
        if let Some(target) = seek_target {
            if let Err(e) = self.source.seek(target) {
                log::warn!("forward seek to pts {target} failed: {e}");
                return Produced::Exhausted;
            }
        }

        let mut frame = self.pool.get();
        match self.source.read(&mut frame, seek_target) {
            Ok(()) => Produced::Frame(frame),
            Err(e) => {
                self.pool.put(frame);
                classify_read_error(&e)
            }
        }
    }

    fn produce_backward(&mut self, request: Request) -> Produced {
        let target = match request.seek_target {
            Some(target) => {
                self.backward.clear(&self.pool);
                Some(target)
            }
            // Near the stream start this can be negative; the source then
            // seeks to its earliest position and nothing brackets it.
            None if self.backward.is_empty() => Some(
                self.last_known_pts
                    .unwrap_or(self.source.stream_info().start_pts)
                    - 1,
            ),
            None => None,
        };

        if let Some(target) = target {
            if !self.fill_backward(target, request.generation) {
                return Produced::Exhausted;
            }
        }

        match self.backward.pop_latest() {
            Some(frame) => Produced::Frame(frame),
            None => Produced::Exhausted,
        }
    }

    /// Seeks to `target` and decodes forward until a frame covers it.
    ///
    /// On success the ring holds that frame and up to `capacity - 1`
    /// predecessors, sorted ascending.
    fn fill_backward(&mut self, target: i64, generation: u64) -> bool {
        if let Err(e) = self.source.seek(target) {
            log::warn!("backward seek to pts {target} failed: {e}");
            return false;
        }

        loop {
            if !self.shared.is_current(generation) {
                self.backward.clear(&self.pool);
                return false;
            }

            let mut frame = self.pool.get();
            if let Err(e) = self.source.read(&mut frame, None) {
                self.pool.put(frame);
                if !matches!(classify_read_error(&e), Produced::Exhausted) {
                    log::warn!("backward scan to pts {target} aborted: {e}");
                }
                self.backward.clear(&self.pool);
                return false;
            }

            if frame.contains_pts(target) {
                self.backward.push(frame, &self.pool);
                self.backward.settle(&self.pool);
                return true;
            }

            if frame.has_pts() && frame.pts > target {
                log::debug!("no frame covers pts {target}, passed it at {}", frame.pts);
                self.pool.put(frame);
                self.backward.clear(&self.pool);
                return false;
            }

            self.backward.push(frame, &self.pool);
        }
    }
}

fn classify_read_error(err: &Error) -> Produced {
    match err {
        Error::Video(video) if video.is_end_of_stream() => Produced::Exhausted,
        other => {
            log::warn!("frame read failed: {other}");
            Produced::Retry
        }
    }
}

/// Owner of the background decode thread.
///
/// Lifecycle: [`FrameLoader::start`] → use → [`FrameLoader::stop`] (or drop).
pub struct FrameLoader {
    shared: Arc<Shared>,
    pool: Arc<FramePool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameLoader {
    /// Spawns the decode thread, which starts producing forward frames from
    /// the source's current position.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start(
        source: Box<dyn FrameSource>,
        pool: Arc<FramePool>,
        backward_capacity: usize,
    ) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let producer = Producer {
            source,
            pool: Arc::clone(&pool),
            shared: Arc::clone(&shared),
            backward: BackwardCache::new(backward_capacity),
            generation: 0,
            last_known_pts: None,
            failures: 0,
        };

        let handle = std::thread::Builder::new()
            .name("frame-loader".into())
            .spawn(move || producer.run())?;

        Ok(Self {
            shared,
            pool,
            handle: Some(handle),
        })
    }

    /// Current production direction.
    #[must_use]
    pub fn direction(&self) -> LoadDirection {
        self.shared.state.lock().direction
    }

    /// Returns true while the decode thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops and joins the decode thread, recycling any frame still held.
    ///
    /// Blocks until the in-flight decode, if any, completes. Idempotent.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shared.state.lock().finished = true;
        self.shared.wake.notify_all();
        if handle.join().is_err() {
            log::error!("frame loader thread panicked");
        }
        let leftover = self.shared.state.lock().result.take();
        self.pool.put_all(leftover);
    }
}

impl FrameProducer for FrameLoader {
    fn get_frame(&self) -> Option<RgbFrame> {
        let frame = self.shared.state.lock().result.take();
        if frame.is_some() {
            self.shared.wake.notify_all();
        }
        frame
    }

    fn seek(&self, direction: LoadDirection, target: Option<i64>) {
        let stale = {
            let mut state = self.shared.state.lock();
            state.direction = direction;
            state.seek_target = target;
            state.generation += 1;
            state.end_of_stream = false;
            state.result.take()
        };
        self.shared.wake.notify_all();
        log::debug!("loader seek: {direction:?} to {target:?}");
        self.pool.put_all(stale);
    }

    fn is_end_of_stream(&self) -> bool {
        self.shared.state.lock().end_of_stream
    }
}

impl Drop for FrameLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for FrameLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("FrameLoader")
            .field("direction", &state.direction)
            .field("seek_target", &state.seek_target)
            .field("has_result", &state.result.is_some())
            .field("end_of_stream", &state.end_of_stream)
            .field("running", &self.handle.is_some())
            .finish()
    }
}
