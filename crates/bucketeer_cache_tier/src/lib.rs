// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions shared by Bucketeer cache backends.
//!
//! This crate defines the capability traits a backend implements, the [`Pipeline`] command
//! buffer, and the [`Error`] taxonomy returned to callers.
//!
//! # Overview
//!
//! A backend is a single addressable store. Several backends may hold the same logical
//! content for redundancy; they are written independently and none of them is a leader.
//! Values are opaque byte payloads and keys are plain strings.
//!
//! Callers depend only on the capabilities they use:
//!
//! | Trait | Commands |
//! |-------|----------|
//! | [`Getter`] / [`Putter`] | single value read/write with TTL |
//! | [`MultiGetter`] | batched reads |
//! | [`Scanner`] | cursor-based key enumeration |
//! | [`Deleter`] / [`Incrementer`] / [`Expirer`] | key maintenance and counters |
//! | [`Pipeliner`] | batched `PFADD` / `EXPIRE` / `SADD` |
//! | [`HyperLogLog`] | `PFCOUNT` / `PFMERGE` |
//! | [`SetReader`] | `SMEMBERS` |
//!
//! # Implementing a backend
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use bucketeer_cache_tier::{Error, Getter, Putter, Result};
//!
//! struct SimpleBackend(Mutex<HashMap<String, Vec<u8>>>);
//!
//! impl Getter for SimpleBackend {
//!     async fn get(&self, key: &str) -> Result<Vec<u8>> {
//!         self.0.lock().unwrap().get(key).cloned().ok_or(Error::NotFound)
//!     }
//! }
//!
//! impl Putter for SimpleBackend {
//!     async fn put(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<()> {
//!         self.0.lock().unwrap().insert(key.to_string(), value);
//!         Ok(())
//!     }
//! }
//! ```

mod capability;
pub mod error;
pub mod pattern;
mod pipeline;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use capability::{
    Deleter, Expirer, Getter, HyperLogLog, Incrementer, MultiGetter, NO_EXPIRATION, Pipeliner, Putter, Scanner, SetReader,
};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use pipeline::{Command, Pipeline};
