// SPDX-License-Identifier: MPL-2.0
//! Backward cache size domain type.
//!
//! This module provides a type-safe wrapper for the capacity of the loader's
//! backward ring, used for reverse frame stepping.

use crate::config::{DEFAULT_BACKWARD_CACHE, MAX_BACKWARD_CACHE, MIN_BACKWARD_CACHE};

/// Frames decoded per backward seek and served newest-first.
///
/// Larger values mean fewer seeks while stepping backward, at the cost of
/// more frames checked out of the pool. Always within 2–32.
///
/// # Example
///
/// ```
/// use vidinspect::video_player::BackwardCacheSize;
///
/// let size = BackwardCacheSize::new(8);
/// assert_eq!(size.value(), 8);
///
/// // Values outside range are clamped
/// assert_eq!(BackwardCacheSize::new(0).value(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackwardCacheSize(usize);

impl BackwardCacheSize {
    /// Creates a new backward cache size, clamping to valid range.
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self(value.clamp(MIN_BACKWARD_CACHE, MAX_BACKWARD_CACHE))
    }

    #[must_use]
    pub fn value(self) -> usize {
        self.0
    }
}

impl Default for BackwardCacheSize {
    fn default() -> Self {
        Self(DEFAULT_BACKWARD_CACHE)
    }
}
