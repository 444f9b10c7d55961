// SPDX-License-Identifier: MPL-2.0
//! Frame pipeline for frame-accurate video inspection.
//!
//! A background thread decodes frames into pooled RGB24 buffers and hands
//! them, one at a time, to a sliding window on the consumer side. The
//! window serves single-frame steps in both directions and asks the loader
//! to reverse when the cursor nears an end it is not filling.
//!
//! ```text
//! FramePool ──get──▶ FrameSource::read ──▶ FrameLoader slot ──▶ FrameWindow ──▶ Player
//!     ▲                                                              │
//!     └───────────────────────────── put (eviction, flush) ──────────┘
//! ```

mod backward_cache_size;
mod decoder;
mod frame;
mod frame_loader;
mod frame_pool;
mod frame_window;
mod state;
mod stream_info;
pub mod synthetic;
pub mod time_units;
mod window_capacity;

pub use backward_cache_size::BackwardCacheSize;
pub use decoder::{init_ffmpeg, FfmpegDecoder, FrameSource};
pub use frame::{RgbFrame, NO_PTS};
pub use frame_loader::{FrameLoader, FrameProducer, LoadDirection};
pub use frame_pool::{FramePool, PoolStats};
pub use frame_window::{FrameWindow, WindowStats};
pub use state::{PlayState, Player};
pub use stream_info::{StreamInfo, RGB24_BYTES_PER_PIXEL};
pub use synthetic::SyntheticSource;
pub use time_units::Rational;
pub use window_capacity::WindowCapacity;
