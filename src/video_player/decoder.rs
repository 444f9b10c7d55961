// SPDX-License-Identifier: MPL-2.0
//! Frame sources: the decoding side of the pipeline.
//!
//! [`FrameSource`] is the narrow interface the background loader drives:
//! read the next frame into a pooled buffer, optionally skipping everything
//! before a timestamp, and seek. [`FfmpegDecoder`] implements it on top of
//! FFmpeg's demuxer, decoder and software scaler.

use super::frame::{RgbFrame, NO_PTS};
use super::stream_info::StreamInfo;
use super::time_units::{rescale, Rational, MICROS_TIME_BASE};
use crate::error::{Error, Result, VideoError};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use std::path::Path;
use std::sync::Once;

/// Static flag to ensure FFmpeg is initialized only once.
static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg with appropriate log level.
///
/// Safe to call multiple times. Sets FFmpeg's own log level to ERROR so that
/// container warnings do not flood stderr; pipeline diagnostics go through
/// the `log` facade instead.
pub fn init_ffmpeg() -> Result<()> {
    let mut init_result: Result<()> = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(Error::Io(format!("FFmpeg initialization failed: {e}")));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// A seekable producer of decoded RGB frames.
///
/// Implementations are moved onto the loader thread, hence `Send`.
pub trait FrameSource: Send {
    /// Metadata of the opened stream.
    fn stream_info(&self) -> &StreamInfo;

    /// Decodes the next frame into `dest`.
    ///
    /// Frames whose timestamp is below `skip_before` are discarded without
    /// conversion. Returns [`VideoError::EndOfStream`] once the stream is
    /// exhausted; other errors fail this read only.
    fn read(&mut self, dest: &mut RgbFrame, skip_before: Option<i64>) -> Result<()>;

    /// Repositions the source at the nearest sync point at or before `pts`.
    ///
    /// Does not decode. Follow with a `read` using `skip_before = Some(pts)`
    /// to land exactly on `pts`.
    fn seek(&mut self, pts: i64) -> Result<()>;
}

/// FFmpeg-backed frame source for the best video stream of a file.
pub struct FfmpegDecoder {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    info: StreamInfo,
    /// Reusable decode target.
    decoded: ffmpeg_next::frame::Video,
    /// Reusable RGB24 conversion target (rows may be padded).
    converted: ffmpeg_next::frame::Video,
    /// True once the demuxer hit EOF and the decoder is being drained.
    draining: bool,
}

// SAFETY: the FFmpeg contexts are owned exclusively by this value and are
// only ever touched by one thread at a time: the decoder is opened on the
// caller's thread and then moved, whole, onto the loader thread.
unsafe impl Send for FfmpegDecoder {}

impl FfmpegDecoder {
    /// Opens `path` and prepares decoding of its best video stream to RGB24.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened, has no video stream, reports an
    /// empty geometry, or a codec/scaler context cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        init_ffmpeg()?;
        let path = path.as_ref();

        let input = ffmpeg_next::format::input(&path)
            .map_err(|e| VideoError::Open(format!("{}: {e}", path.display())))?;

        let (stream_index, time_base, start_time, stream_duration, frames, frame_rate, decoder) = {
            let stream = input
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or(VideoError::NoVideoStream)?;

            let context = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| VideoError::from_message(&format!("codec context: {e}")))?;
            let decoder = context
                .decoder()
                .video()
                .map_err(|e| VideoError::from_message(&format!("video decoder: {e}")))?;

            (
                stream.index(),
                Rational::from(stream.time_base()),
                stream.start_time(),
                stream.duration(),
                stream.frames(),
                Rational::from(stream.avg_frame_rate()),
                decoder,
            )
        };

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(VideoError::Open(format!(
                "invalid video dimensions: {width}x{height}"
            ))
            .into());
        }

        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| VideoError::DecodingFailed(format!("failed to create scaler: {e}")))?;

        let start_pts = if start_time == ffmpeg_next::ffi::AV_NOPTS_VALUE {
            0
        } else {
            start_time
        };
        let duration_pts = if stream_duration > 0 {
            stream_duration
        } else if input.duration() > 0 {
            rescale(input.duration(), MICROS_TIME_BASE, time_base)
        } else {
            0
        };
        let frame_rate = frame_rate.is_valid().then_some(frame_rate);
        let mut info = StreamInfo {
            time_base,
            start_pts,
            duration_pts,
            frame_count: frames.max(0),
            width,
            height,
            frame_rate,
        };
        if info.frame_count == 0 && duration_pts > 0 {
            info.frame_count = duration_pts / info.nominal_frame_duration();
        }

        log::debug!(
            "opened {} (stream #{stream_index}, {width}x{height}, time base {}/{}, {} frames)",
            path.display(),
            time_base.num,
            time_base.den,
            info.frame_count
        );

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            info,
            decoded: ffmpeg_next::frame::Video::empty(),
            converted: ffmpeg_next::frame::Video::new(Pixel::RGB24, width, height),
            draining: false,
        })
    }

    /// Best-effort timestamp, falling back to the raw decode pts.
    fn decoded_pts(&self) -> i64 {
        self.decoded
            .timestamp()
            .or_else(|| self.decoded.pts())
            .unwrap_or(NO_PTS)
    }

    fn decoded_duration(&self) -> i64 {
        // SAFETY: `decoded` wraps a valid, owned AVFrame.
        let duration = unsafe { (*self.decoded.as_ptr()).duration };
        if duration > 0 {
            duration
        } else {
            self.info.nominal_frame_duration()
        }
    }

    /// Converts the current decoded frame into `dest`.
    fn convert_into(&mut self, dest: &mut RgbFrame) -> Result<()> {
        let actual = (self.decoded.width(), self.decoded.height());
        let expected = (self.info.width, self.info.height);
        if actual != expected || !dest.has_size(expected.0, expected.1) {
            let err = VideoError::FrameSizeMismatch {
                expected,
                actual: if actual == expected {
                    (dest.width(), dest.height())
                } else {
                    actual
                },
            };
            log::warn!("{err}");
            return Err(err.into());
        }

        self.scaler
            .run(&self.decoded, &mut self.converted)
            .map_err(|e| VideoError::DecodingFailed(format!("scaling failed: {e}")))?;

        if !dest.copy_rows_from(self.converted.data(0), self.converted.stride(0)) {
            return Err(VideoError::DecodingFailed("converted frame is truncated".into()).into());
        }
        dest.pts = self.decoded_pts();
        dest.duration = self.decoded_duration();
        Ok(())
    }

    /// Feeds the next packet of the selected stream to the decoder, or
    /// switches to draining once the demuxer is exhausted.
    fn feed_packet(&mut self) -> Result<()> {
        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    self.draining = true;
                    if let Err(e) = self.decoder.send_eof() {
                        log::debug!("decoder refused end of stream: {e}");
                    }
                    return Ok(());
                }
                Err(e) => {
                    return Err(VideoError::DecodingFailed(format!("demux failed: {e}")).into());
                }
            }

            if packet.stream() != self.stream_index {
                continue;
            }

            match self.decoder.send_packet(&packet) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    // Corrupt packet: skip it and keep going.
                    log::warn!("packet rejected by decoder: {e}");
                }
            }
        }
    }
}

impl FrameSource for FfmpegDecoder {
    fn stream_info(&self) -> &StreamInfo {
        &self.info
    }

    fn read(&mut self, dest: &mut RgbFrame, skip_before: Option<i64>) -> Result<()> {
        loop {
            match self.decoder.receive_frame(&mut self.decoded) {
                Ok(()) => {
                    let pts = self.decoded_pts();
                    if skip_before.is_some_and(|skip| pts < skip) {
                        continue;
                    }
                    return self.convert_into(dest);
                }
                Err(ffmpeg_next::Error::Eof) => return Err(VideoError::EndOfStream.into()),
                Err(_) if self.draining => return Err(VideoError::EndOfStream.into()),
                // Decoder needs more input.
                Err(_) => {}
            }

            self.feed_packet()?;
        }
    }

    fn seek(&mut self, pts: i64) -> Result<()> {
        let target = self.info.pts_to_micros(pts).max(0);
        self.input
            .seek(target, ..target)
            .map_err(|e| VideoError::SeekFailed(format!("pts {pts}: {e}")))?;
        self.decoder.flush();
        self.draining = false;
        log::debug!("seeked to pts {pts} ({target} us)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_ffmpeg_is_idempotent() {
        assert!(init_ffmpeg().is_ok());
        assert!(init_ffmpeg().is_ok());
    }

    #[test]
    fn open_fails_for_nonexistent_file() {
        let result = FfmpegDecoder::open("/nonexistent/video.mp4");
        assert!(matches!(result, Err(Error::Video(VideoError::Open(_)))));
    }

    #[test]
    fn open_fails_for_non_video_data() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("fake.mp4");
        std::fs::write(&path, b"fake video data").unwrap();

        assert!(FfmpegDecoder::open(&path).is_err());
    }

    #[test]
    fn decodes_sample_in_order() {
        let path = "tests/data/sample.mp4";
        if !std::path::Path::new(path).exists() {
            eprintln!("Test video not found, skipping test");
            return;
        }

        let mut decoder = FfmpegDecoder::open(path).unwrap();
        let info = *decoder.stream_info();
        let mut frame = RgbFrame::new(info.width, info.height);
        let mut last = i64::MIN;
        for _ in 0..5 {
            decoder.read(&mut frame, None).unwrap();
            assert!(frame.pts > last, "timestamps must increase");
            assert!(frame.duration > 0);
            last = frame.pts;
        }
    }
}
