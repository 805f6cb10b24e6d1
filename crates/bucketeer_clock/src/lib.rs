// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Time primitives for cache backends and refresh jobs.
//!
//! Expiry decisions, the archived-feature cut-off and DAU date keys all depend on the
//! current time. Reading it through a [`Clock`] instead of calling
//! [`jiff::Timestamp::now`] directly lets tests pin time with [`ClockControl`]
//! (feature `test-util`) and move it forward explicitly.
//!
//! # Examples
//!
//! ```
//! use bucketeer_clock::Clock;
//!
//! let clock = Clock::new_system();
//! let stopwatch = clock.stopwatch();
//! let now = clock.timestamp();
//! assert!(now.as_second() > 0);
//! let _elapsed = stopwatch.elapsed();
//! ```

mod clock;
#[cfg(any(feature = "test-util", test))]
mod clock_control;
mod stopwatch;

#[doc(inline)]
pub use clock::Clock;
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use clock_control::ClockControl;
#[doc(inline)]
pub use stopwatch::Stopwatch;
