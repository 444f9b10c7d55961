// SPDX-License-Identifier: MPL-2.0
//! Frame export to still images.
//!
//! This module writes decoded RGB24 frames to PNG, JPEG or WebP files using
//! the `image` crate.

use crate::error::{Error, Result};
use crate::video_player::RgbFrame;
use image_rs::{ImageBuffer, ImageFormat, Rgb};
use std::path::Path;

/// Supported export formats for frame capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// PNG format (lossless, best quality).
    #[default]
    Png,
    /// JPEG format (lossy, smaller file size).
    Jpeg,
    /// WebP format (lossless).
    WebP,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Detects format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<ExportFormat> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "webp" => Some(ExportFormat::WebP),
            _ => None,
        }
    }

    /// Detects format from file path extension.
    pub fn from_path(path: &Path) -> Option<ExportFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Writes `frame` to `path`.
///
/// The format is taken from `format`, else from the path's extension, else
/// PNG. The parent directory must exist.
///
/// # Errors
///
/// Returns [`Error::Export`] if the frame buffer is inconsistent or the image
/// cannot be encoded or written.
pub fn export_frame<P: AsRef<Path>>(
    frame: &RgbFrame,
    path: P,
    format: Option<ExportFormat>,
) -> Result<()> {
    let path = path.as_ref();
    let format = format
        .or_else(|| ExportFormat::from_path(path))
        .unwrap_or_default();

    let img: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width(), frame.height(), frame.data()).ok_or_else(|| {
            Error::Export(format!(
                "frame buffer does not hold {}x{} RGB pixels",
                frame.width(),
                frame.height()
            ))
        })?;

    img.save_with_format(path, format.image_format())?;
    log::debug!("exported pts {} to {}", frame.pts, path.display());
    Ok(())
}

/// File name for an exported frame: `{stem}_frame_{pts}.{ext}`.
///
/// The pts is zero-padded to eight digits so names sort in stream order.
#[must_use]
pub fn frame_file_name(stem: &str, pts: i64, format: ExportFormat) -> String {
    let stem = if stem.is_empty() { "video" } else { stem };
    format!("{stem}_frame_{pts:08}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> RgbFrame {
        let mut frame = RgbFrame::new(width, height);
        for (i, byte) in frame.data_mut().iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        frame.pts = 7;
        frame
    }

    #[test]
    fn export_format_from_extension() {
        assert_eq!(ExportFormat::from_extension("png"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_extension("PNG"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_extension("jpeg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_extension("webp"), Some(ExportFormat::WebP));
        assert_eq!(ExportFormat::from_extension("bmp"), None);
    }

    #[test]
    fn frame_file_name_pads_pts() {
        assert_eq!(
            frame_file_name("clip", 42, ExportFormat::Png),
            "clip_frame_00000042.png"
        );
        assert_eq!(
            frame_file_name("", 3, ExportFormat::Jpeg),
            "video_frame_00000003.jpg"
        );
    }

    #[test]
    fn png_export_is_lossless() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("frame.png");
        let frame = gradient(6, 4);

        export_frame(&frame, &path, None).expect("export failed");

        let loaded = image_rs::open(&path).expect("failed to read back").to_rgb8();
        assert_eq!(loaded.dimensions(), (6, 4));
        assert_eq!(loaded.as_raw().as_slice(), frame.data());
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("frame.png");
        export_frame(&gradient(8, 8), &path, Some(ExportFormat::Jpeg)).expect("export failed");

        let bytes = std::fs::read(&path).expect("read");
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn webp_export_writes_file() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("frame.webp");
        export_frame(&gradient(4, 4), &path, None).expect("export failed");
        let bytes = std::fs::read(&path).expect("read");
        assert_eq!(&bytes[..4], b"RIFF");
    }

    #[test]
    fn missing_directory_is_an_export_error() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("missing").join("frame.png");
        let result = export_frame(&gradient(2, 2), &path, None);
        assert!(matches!(result, Err(Error::Export(_))));
    }
}
