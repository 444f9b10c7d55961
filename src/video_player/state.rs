// SPDX-License-Identifier: MPL-2.0
//! Player façade and playback state.
//!
//! [`Player`] composes the pool, the background loader and the sliding
//! window into the single object a render loop talks to:
//!
//! ```text
//! loop {
//!     if player.has_update(Instant::now()) {
//!         draw(player.current_frame());
//!     }
//!     // map input to pause / step / seek calls
//! }
//! ```
//!
//! Playback is paced by wall-clock time against frame durations. While
//! paused, each step or seek request produces exactly one update, as soon as
//! the requested frame is in the window.

use super::decoder::{FfmpegDecoder, FrameSource};
use super::frame::RgbFrame;
use super::frame_loader::{FrameLoader, FrameProducer, LoadDirection};
use super::frame_pool::{FramePool, PoolStats};
use super::frame_window::{FrameWindow, WindowStats};
use super::stream_info::StreamInfo;
use crate::config::PipelineConfig;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Display state derived from the frame on screen.
///
/// Never authoritative: everything here can be recomputed from the stream
/// info and the window's current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayState {
    /// Playback is stopped on the current frame.
    pub paused: bool,

    /// Position shown to the user, 0..=100.
    pub progress: f64,

    /// Direction of the last step, and of playback.
    pub direction: LoadDirection,

    /// Pts of the frame last reported by `has_update`.
    pub last_frame_pts: Option<i64>,

    /// Duration of that frame in stream units.
    pub last_frame_duration: i64,

    /// Wall-clock time of the last reported update.
    pub last_update: Option<Instant>,

    /// A held seek (scrub) is in progress.
    pub scrubbing: bool,
}

impl Default for PlayState {
    fn default() -> Self {
        Self {
            paused: true,
            progress: 0.0,
            direction: LoadDirection::Forward,
            last_frame_pts: None,
            last_frame_duration: 0,
            last_update: None,
            scrubbing: false,
        }
    }
}

/// Request waiting for its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    /// Show the first frame that lands in the (flushed) window.
    Display,
    /// Move the cursor one frame in the given direction.
    Step(LoadDirection),
}

/// Frame-accurate player over any [`FrameSource`].
pub struct Player {
    config: PipelineConfig,
    pool: Arc<FramePool>,
    window: FrameWindow,
    loader: Option<FrameLoader>,
    info: Option<StreamInfo>,
    state: PlayState,
    pending: Pending,
}

impl Player {
    /// Creates an idle player; call [`Player::open`] or [`Player::start`].
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let pool = Arc::new(FramePool::new());
        let window = FrameWindow::new(
            config.window_capacity.value(),
            config.window_margin,
            Arc::clone(&pool),
        );
        Self {
            config,
            pool,
            window,
            loader: None,
            info: None,
            state: PlayState::default(),
            pending: Pending::None,
        }
    }

    /// Opens a media file and starts a session on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for decoding. The
    /// current session, if any, keeps running.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<StreamInfo> {
        let path = path.as_ref();
        let decoder = FfmpegDecoder::open(path)?;
        log::debug!("opened {}", path.display());
        self.start(Box::new(decoder))
    }

    /// Replaces the current session with one reading from `source`.
    ///
    /// The player starts paused and shows the first frame as soon as it is
    /// decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the loader thread cannot be spawned.
    pub fn start(&mut self, source: Box<dyn FrameSource>) -> Result<StreamInfo> {
        self.stop();

        let info = *source.stream_info();
        self.pool
            .create_frames(self.config.pool_frames, info.width, info.height);
        self.loader = Some(FrameLoader::start(
            source,
            Arc::clone(&self.pool),
            self.config.backward_cache.value(),
        )?);
        self.info = Some(info);
        self.state = PlayState::default();
        self.pending = Pending::Display;
        log::debug!(
            "session started: {}x{}, {} frames",
            info.width,
            info.height,
            info.frame_count
        );
        Ok(info)
    }

    pub fn pause(&mut self) {
        self.state.paused = true;
    }

    /// Resumes forward playback.
    pub fn resume(&mut self) {
        self.play(LoadDirection::Forward);
    }

    /// Starts playing backward from the current frame.
    pub fn play_reverse(&mut self) {
        self.play(LoadDirection::Backward);
    }

    pub fn toggle_pause(&mut self) {
        if self.state.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Requests the next frame. Pauses playback.
    pub fn step_forward(&mut self) {
        self.request_step(LoadDirection::Forward);
    }

    /// Requests the previous frame. Pauses playback.
    pub fn step_backward(&mut self) {
        self.request_step(LoadDirection::Backward);
    }

    /// Seeks to a position given in percent of the stream duration.
    ///
    /// With `hold` set the seek is part of a scrub: the progress shown stays
    /// at `percent` and playback pacing is suspended until a seek with
    /// `hold == false` commits the position.
    pub fn seek_progress(&mut self, percent: f64, hold: bool) {
        let Some(info) = self.info else {
            return;
        };
        let pts = info.progress_to_pts(percent);
        // The end of the timeline is one past the last frame.
        self.seek_to(pts.min(info.last_frame_pts()), hold);
        self.state.progress = info.calc_progress(pts);
    }

    /// Seeks to a pts in stream time-base units.
    pub fn seek_pts(&mut self, pts: i64) {
        if let Some(info) = self.info {
            self.seek_to(pts.min(info.last_frame_pts()), false);
            self.state.progress = info.calc_progress(pts);
        }
    }

    /// Pulls decoded frames into the window and reports whether the frame
    /// to display changed.
    pub fn has_update(&mut self, now: Instant) -> bool {
        let Some(loader) = self.loader.as_ref() else {
            return false;
        };
        self.window.fill_from(loader);

        let advanced = match self.pending {
            Pending::Display => self.window.current().is_some(),
            Pending::Step(direction) => self.move_cursor(direction),
            Pending::None if self.state.paused || self.state.scrubbing => false,
            Pending::None => self.is_due(now) && self.move_cursor(self.state.direction),
        };
        if !advanced {
            return false;
        }

        self.pending = Pending::None;
        self.record_display(now);
        true
    }

    /// Frame under the window cursor.
    #[must_use]
    pub fn current_frame(&self) -> Option<&RgbFrame> {
        self.window.current()
    }

    #[must_use]
    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }

    #[must_use]
    pub fn play_state(&self) -> &PlayState {
        &self.state
    }

    /// True when the loader has nothing more to give and the cursor is on
    /// the last frame it produced.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.loader.as_ref().is_some_and(|loader| {
            loader.direction() == LoadDirection::Forward
                && loader.is_end_of_stream()
                && self.window.is_at_back()
        })
    }

    #[must_use]
    pub fn window_stats(&self) -> WindowStats {
        self.window.stats()
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Ends the session: stops the loader thread and releases every frame.
    pub fn stop(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            loader.stop();
            log::debug!("session stopped");
        }
        self.window.flush();
        self.info = None;
        self.pending = Pending::None;
    }

    fn play(&mut self, direction: LoadDirection) {
        if self.loader.is_none() {
            return;
        }
        self.state.paused = false;
        self.state.direction = direction;
        self.state.last_update = None;
        if self.pending != Pending::Display {
            self.pending = Pending::None;
        }
    }

    fn request_step(&mut self, direction: LoadDirection) {
        if self.loader.is_none() {
            return;
        }
        self.state.paused = true;
        self.state.direction = direction;
        self.pending = Pending::Step(direction);
    }

    fn seek_to(&mut self, pts: i64, hold: bool) {
        let Some(loader) = self.loader.as_ref() else {
            return;
        };
        self.window.seek_to(loader, pts);
        self.state.scrubbing = hold;
        self.state.last_update = None;
        self.pending = Pending::Display;
        log::debug!("player seek to pts {pts} (hold: {hold})");
    }

    fn move_cursor(&mut self, direction: LoadDirection) -> bool {
        let Some(loader) = self.loader.as_ref() else {
            return false;
        };
        match direction {
            LoadDirection::Forward => self.window.seek_next_frame(loader),
            LoadDirection::Backward => self.window.seek_prev_frame(loader),
        }
    }

    /// Whether the frame on screen has been shown for its full duration.
    fn is_due(&self, now: Instant) -> bool {
        let Some(last) = self.state.last_update else {
            return true;
        };
        now.saturating_duration_since(last) >= self.display_duration()
    }

    fn display_duration(&self) -> Duration {
        let Some(info) = self.info else {
            return Duration::ZERO;
        };
        let duration = if self.state.last_frame_duration > 0 {
            self.state.last_frame_duration
        } else {
            info.nominal_frame_duration()
        };
        let micros = u64::try_from(info.pts_to_micros(duration)).unwrap_or(0);
        Duration::from_micros(micros)
    }

    fn record_display(&mut self, now: Instant) {
        let Some(frame) = self.window.current() else {
            return;
        };
        let (pts, duration) = (frame.pts, frame.duration);
        self.state.last_frame_pts = Some(pts);
        self.state.last_frame_duration = duration;
        self.state.last_update = Some(now);
        if !self.state.scrubbing {
            if let Some(info) = self.info {
                self.state.progress = info.calc_progress(pts);
            }
        }
        log::trace!("displaying pts {pts}");
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("info", &self.info)
            .field("state", &self.state)
            .field("window", &self.window)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
