// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis cache backend for Bucketeer.
//!
//! [`RedisBackend`] implements every capability trait of [`bucketeer_cache_tier`] against one
//! Redis deployment. Keys and values go over the wire unchanged: values are the raw bytes
//! produced by the typed wrappers, with no envelope.
//!
//! Command mapping:
//!
//! | Capability | Redis |
//! |------------|-------|
//! | `get` / `put` | `GET`, `SET key value [PX ms]` |
//! | `get_multi` | `MGET` |
//! | `scan` | `SCAN cursor MATCH pattern COUNT n` |
//! | `delete` / `increment` | `DEL`, `INCR` |
//! | `expire` | `PEXPIRE`, or `PERSIST` for a zero TTL |
//! | `exec` | pipelined or `MULTI`/`EXEC` batch of `PFADD` / `SADD` / `PEXPIRE` |
//! | `pf_count` / `pf_merge` | `PFCOUNT`, `MULTI PFMERGE PEXPIRE EXEC` |
//! | `s_members` | `SMEMBERS` |
//!
//! `WRONGTYPE` replies and values that cannot be read as the requested shape surface as
//! [`Error::InvalidType`][bucketeer_cache_tier::Error::InvalidType]; a nil reply to `GET`
//! surfaces as [`Error::NotFound`][bucketeer_cache_tier::Error::NotFound]. `MGET` answers nil for
//! keys holding a set or sketch, so `get_multi` reports them as missing.

mod backend;
mod builder;
mod config;
mod telemetry;

#[doc(inline)]
pub use backend::RedisBackend;
#[doc(inline)]
pub use builder::RedisBackendBuilder;
#[doc(inline)]
pub use config::{DEFAULT_COMMAND_TIMEOUT, RedisConfig};
#[doc(inline)]
pub use telemetry::create_meter;
