// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process cache backend for Bucketeer.
//!
//! [`InMemoryBackend`] implements every capability trait of [`bucketeer_cache_tier`] on top
//! of a concurrent map. Expiration is absolute: a TTL is turned into a timestamp when the
//! entry is written and compared against the configured clock on every read. An optional
//! background evicter sweeps expired entries on a fixed interval.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use bucketeer_cache_memory::InMemoryBackend;
//! use bucketeer_cache_tier::{HyperLogLog, Pipeliner};
//!
//! # futures::executor::block_on(async {
//! let backend = InMemoryBackend::new();
//!
//! let mut pipe = backend.pipeline(false);
//! pipe.pf_add("env:ANDROID:dau:20260128", ["user-1", "user-2", "user-1"]);
//! backend.exec(pipe).await.unwrap();
//!
//! let count = backend.pf_count(&["env:ANDROID:dau:20260128".to_string()]).await.unwrap();
//! assert_eq!(count, 2);
//! # });
//! ```
//!
//! # Lifecycle
//!
//! The evicter is spawned on the Tokio runtime that is current when the backend is built
//! and stops when [`InMemoryBackend::destroy`] is called or the last clone is dropped.
//! Without a runtime the backend still works; expired entries are then removed lazily.

mod backend;
mod builder;

#[doc(inline)]
pub use backend::InMemoryBackend;
#[doc(inline)]
pub use builder::InMemoryBackendBuilder;
