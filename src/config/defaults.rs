// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module is the single source of truth for pipeline sizing. Constants
//! are organized by category.
//!
//! # Categories
//!
//! - **General**: Logging
//! - **Pool**: Frame buffer preallocation
//! - **Window**: Sliding frame window capacity and margin
//! - **Backward Cache**: Loader-side ring used for reverse stepping

// ==========================================================================
// General Defaults
// ==========================================================================

/// Default log filter installed by the binary when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ==========================================================================
// Pool Defaults
// ==========================================================================

/// Frames preallocated when a stream is opened.
pub const DEFAULT_POOL_FRAMES: usize = 16;

/// Upper bound on preallocated frames.
pub const MAX_POOL_FRAMES: usize = 256;

// ==========================================================================
// Window Defaults
// ==========================================================================

/// Default number of frames held by the sliding window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// Minimum window capacity.
pub const MIN_WINDOW_CAPACITY: usize = 2;

/// Maximum window capacity.
pub const MAX_WINDOW_CAPACITY: usize = 64;

/// Default number of frames kept between the cursor and an evicted end.
pub const DEFAULT_WINDOW_MARGIN: usize = 2;

// ==========================================================================
// Backward Cache Defaults
// ==========================================================================

/// Default capacity of the loader's backward ring.
pub const DEFAULT_BACKWARD_CACHE: usize = 5;

/// Minimum backward ring capacity.
pub const MIN_BACKWARD_CACHE: usize = 2;

/// Maximum backward ring capacity.
pub const MAX_BACKWARD_CACHE: usize = 32;

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    assert!(DEFAULT_POOL_FRAMES > 0);
    assert!(DEFAULT_POOL_FRAMES <= MAX_POOL_FRAMES);

    // Window validation
    assert!(MIN_WINDOW_CAPACITY >= 2);
    assert!(MAX_WINDOW_CAPACITY >= MIN_WINDOW_CAPACITY);
    assert!(DEFAULT_WINDOW_CAPACITY >= MIN_WINDOW_CAPACITY);
    assert!(DEFAULT_WINDOW_CAPACITY <= MAX_WINDOW_CAPACITY);
    assert!(DEFAULT_WINDOW_MARGIN < DEFAULT_WINDOW_CAPACITY / 2);

    // Backward cache validation
    assert!(MIN_BACKWARD_CACHE > 0);
    assert!(MAX_BACKWARD_CACHE >= MIN_BACKWARD_CACHE);
    assert!(DEFAULT_BACKWARD_CACHE >= MIN_BACKWARD_CACHE);
    assert!(DEFAULT_BACKWARD_CACHE <= MAX_BACKWARD_CACHE);
};
