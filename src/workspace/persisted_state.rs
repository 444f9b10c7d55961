// SPDX-License-Identifier: MPL-2.0
//! Workspace state persistence using CBOR format.
//!
//! This module handles state that should persist across sessions but is not
//! user-configurable (unlike preferences in `settings.toml`): window
//! geometry, recently used folders and the metadata of the last stream.
//!
//! The file starts with a `format_version`. A file written with another
//! version is ignored with a warning rather than half-read.
//!
//! # Path Resolution
//!
//! 1. Use `load_from()`/`save_to()` with explicit path override
//! 2. Pass `--data-dir` on the command line
//! 3. Set `VIDINSPECT_DATA_DIR` environment variable
//! 4. Falls back to platform-specific data directory

use super::paths;
use crate::video_player::StreamInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// State file name within the app data directory.
const STATE_FILE: &str = "state.cbor";

/// Version written by this build.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Number of folders kept in the recent list.
pub const MAX_RECENT_FOLDERS: usize = 10;

/// Position and size of the main window, in screen pixels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Workspace state that persists across sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceState {
    pub format_version: u32,

    #[serde(default)]
    pub window: Option<WindowGeometry>,

    /// Most recent first, without duplicates.
    #[serde(default)]
    pub recent_folders: Vec<PathBuf>,

    /// Metadata of the stream open when the state was saved.
    #[serde(default)]
    pub last_stream: Option<StreamInfo>,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            window: None,
            recent_folders: Vec::new(),
            last_stream: None,
        }
    }
}

impl WorkspaceState {
    /// Loads workspace state from the default location.
    ///
    /// Returns a tuple of (state, optional_warning). If loading fails, returns
    /// default state with a warning message explaining what went wrong.
    pub fn load() -> (Self, Option<String>) {
        Self::load_from(None)
    }

    /// Loads workspace state from a custom directory.
    pub fn load_from(base_dir: Option<PathBuf>) -> (Self, Option<String>) {
        let Some(path) = Self::state_file_path_with_override(base_dir) else {
            return (Self::default(), None);
        };

        if !path.exists() {
            return (Self::default(), None);
        }

        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                return (
                    Self::default(),
                    Some(format!("cannot read {}: {e}", path.display())),
                );
            }
        };

        match ciborium::from_reader::<Self, _>(BufReader::new(file)) {
            Ok(state) if state.format_version == STATE_FORMAT_VERSION => (state, None),
            Ok(state) => (
                Self::default(),
                Some(format!(
                    "ignoring {}: format version {} (expected {STATE_FORMAT_VERSION})",
                    path.display(),
                    state.format_version
                )),
            ),
            Err(e) => (
                Self::default(),
                Some(format!("cannot parse {}: {e}", path.display())),
            ),
        }
    }

    /// Saves workspace state to the default location.
    ///
    /// Returns an optional warning message if save failed.
    pub fn save(&self) -> Option<String> {
        self.save_to(None)
    }

    /// Saves workspace state to a custom directory, creating it if needed.
    pub fn save_to(&self, base_dir: Option<PathBuf>) -> Option<String> {
        let Some(path) = Self::state_file_path_with_override(base_dir) else {
            return Some("no data directory available".to_string());
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return Some(format!("cannot create {}: {e}", parent.display()));
            }
        }

        match fs::File::create(&path) {
            Ok(file) => {
                let writer = BufWriter::new(file);
                if let Err(e) = ciborium::into_writer(self, writer) {
                    return Some(format!("cannot write {}: {e}", path.display()));
                }
                None
            }
            Err(e) => Some(format!("cannot create {}: {e}", path.display())),
        }
    }

    fn state_file_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
        paths::get_app_data_dir_with_override(base_dir).map(|mut path| {
            path.push(STATE_FILE);
            path
        })
    }

    /// Moves `folder` to the front of the recent list.
    pub fn push_recent_folder(&mut self, folder: &Path) {
        self.recent_folders.retain(|existing| existing != folder);
        self.recent_folders.insert(0, folder.to_path_buf());
        self.recent_folders.truncate(MAX_RECENT_FOLDERS);
    }

    /// Records the folder containing `file_path`. Paths without a parent
    /// are ignored.
    pub fn push_recent_folder_of(&mut self, file_path: &Path) {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.push_recent_folder(parent);
        }
    }
}
