// SPDX-License-Identifier: MPL-2.0
//! `vidinspect` is a frame-accurate video inspection engine.
//!
//! It decodes a video on a background thread into pooled RGB24 buffers and
//! lets a render loop play, pause, scrub and step through frames in both
//! directions without re-decoding from the start.

#![doc(html_root_url = "https://docs.rs/vidinspect/0.1.0")]

pub mod config;
pub mod error;
pub mod media;
pub mod video_player;
pub mod workspace;

#[cfg(test)]
mod test_utils;
