// SPDX-License-Identifier: MPL-2.0
//! Still-image output for decoded frames.

pub mod frame_export;

pub use frame_export::{export_frame, frame_file_name, ExportFormat};
