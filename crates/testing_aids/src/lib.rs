// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An unpublished crate containing testing utilities for use within this repo.
//!
//! Refresh jobs report partial failures only through logs and metrics, so most of their
//! tests assert on one or the other. [`LogCapture`] and [`MetricTester`] make that cheap.

mod log;
mod metrics;

pub use log::*;
pub use metrics::*;
