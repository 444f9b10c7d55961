// SPDX-License-Identifier: MPL-2.0
//! Shared helpers for unit tests.
//!
//! Progress values are `f64` percentages computed from integer timestamps,
//! so they are compared with `approx` rather than `assert_eq!`.

pub use approx::assert_abs_diff_eq;

/// Tolerance for progress percentages derived from exact pts values.
pub const PROGRESS_EPSILON: f64 = 1e-9;
