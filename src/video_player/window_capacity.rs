// SPDX-License-Identifier: MPL-2.0
//! Sliding window capacity domain type.
//!
//! This module provides a type-safe wrapper for the number of frames the
//! sliding window keeps around the cursor.

use crate::config::{DEFAULT_WINDOW_CAPACITY, MAX_WINDOW_CAPACITY, MIN_WINDOW_CAPACITY};

/// Number of frames held by the sliding window.
///
/// This newtype enforces validity at the type level, ensuring the value
/// is always within the valid range (2–64 frames).
///
/// # Example
///
/// ```
/// use vidinspect::video_player::WindowCapacity;
///
/// let capacity = WindowCapacity::new(12);
/// assert_eq!(capacity.value(), 12);
///
/// // Values outside range are clamped
/// let too_high = WindowCapacity::new(1000);
/// assert_eq!(too_high.value(), 64); // Clamped to max
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCapacity(usize);

impl WindowCapacity {
    /// Creates a new window capacity, clamping to valid range.
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self(value.clamp(MIN_WINDOW_CAPACITY, MAX_WINDOW_CAPACITY))
    }

    /// Returns the value as usize.
    #[must_use]
    pub fn value(self) -> usize {
        self.0
    }

    /// Largest margin that stays strictly below half the capacity.
    #[must_use]
    pub fn max_margin(self) -> usize {
        (self.0 - 1) / 2
    }

    /// Returns true if this is the minimum value.
    #[must_use]
    pub fn is_min(self) -> bool {
        self.0 <= MIN_WINDOW_CAPACITY
    }

    /// Returns true if this is the maximum value.
    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 >= MAX_WINDOW_CAPACITY
    }
}

impl Default for WindowCapacity {
    fn default() -> Self {
        Self(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_to_valid_range() {
        assert_eq!(WindowCapacity::new(0).value(), MIN_WINDOW_CAPACITY);
        assert_eq!(WindowCapacity::new(1000).value(), MAX_WINDOW_CAPACITY);
    }

    #[test]
    fn new_accepts_valid_values() {
        assert_eq!(WindowCapacity::new(2).value(), 2);
        assert_eq!(WindowCapacity::new(10).value(), 10);
        assert_eq!(WindowCapacity::new(64).value(), 64);
    }

    #[test]
    fn default_returns_expected_value() {
        assert_eq!(WindowCapacity::default().value(), DEFAULT_WINDOW_CAPACITY);
    }

    #[test]
    fn max_margin_stays_below_half() {
        assert_eq!(WindowCapacity::new(2).max_margin(), 0);
        assert_eq!(WindowCapacity::new(3).max_margin(), 1);
        assert_eq!(WindowCapacity::new(10).max_margin(), 4);
        assert_eq!(WindowCapacity::new(11).max_margin(), 5);
    }

    #[test]
    fn is_min_and_is_max_detect_bounds() {
        assert!(WindowCapacity::new(2).is_min());
        assert!(!WindowCapacity::new(10).is_min());
        assert!(WindowCapacity::new(64).is_max());
        assert!(!WindowCapacity::new(10).is_max());
    }
}
