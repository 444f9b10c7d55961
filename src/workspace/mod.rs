// SPDX-License-Identifier: MPL-2.0
//! Application directories and state kept between sessions.

pub mod paths;
pub mod persisted_state;

pub use persisted_state::{WindowGeometry, WorkspaceState, MAX_RECENT_FOLDERS};
