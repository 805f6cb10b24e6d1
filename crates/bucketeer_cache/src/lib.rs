// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Typed caches for Bucketeer entities.
//!
//! Each wrapper owns the key layout, TTL and encoding of one entity kind and works over
//! any backend implementing the capabilities it needs. Values are plain protobuf
//! encodings of the [`bucketeer_proto`] messages.
//!
//! | Wrapper | Key | TTL | Capabilities |
//! |---------|-----|-----|--------------|
//! | [`FeaturesCache`] | `{env}:features` | none | get, put |
//! | [`ExperimentsCache`] | `{env}:experiments` | none | get, put |
//! | [`AutoOpsRulesCache`] | `{env}:autoOpsRule` | 1 minute | get, put |
//! | [`EnvironmentApiKeyCache`] | `environment_apikey:{key}` | 1 minute | get, put |
//! | [`SegmentUsersCache`] | `{env}:segment_users:{segment}` | none | get, put, scan + multi-get |
//! | [`EventCounterCache`] | caller-built | none | multi-get, incr, pipeline, HLL, delete |
//! | [`UserAttributesCache`] | `{env}:user_attr:{key}`, `{env}:user_attr_keys` | caller-provided | pipeline, set reads |
//! | [`MauCache`] | `{env}:{source}:dau:{yyyyMMdd}`, `{env}:{source}:mau:{yyyyMM}` | 60 days | pipeline, HLL |
//!
//! Read errors from the backend pass through unchanged: [`Error::NotFound`] means the
//! caller should fall back to the source of truth, [`Error::InvalidType`] and
//! [`Error::Decode`] mean the stored value is not what the wrapper expects.
//!
//! ```
//! use bucketeer_cache::FeaturesCache;
//! use bucketeer_cache_memory::InMemoryBackend;
//! use bucketeer_proto::feature::{Feature, Features};
//!
//! # futures::executor::block_on(async {
//! let cache = FeaturesCache::new(InMemoryBackend::new());
//! let features = Features {
//!     features: vec![Feature { id: "checkout".to_string(), ..Feature::default() }],
//!     id: "5417419487402937326".to_string(),
//! };
//!
//! cache.put(&features, "env-1").await?;
//! assert_eq!(cache.get("env-1").await?, features);
//! assert!(cache.get("env-2").await.unwrap_err().is_not_found());
//! # Ok::<(), bucketeer_cache_tier::Error>(())
//! # });
//! ```

mod api_key;
mod auto_ops_rules;
mod entity;
mod event_counter;
mod experiments;
mod features;
pub mod key;
mod mau;
mod segment_users;
mod user_attributes;

#[doc(inline)]
pub use api_key::{ENVIRONMENT_API_KEY_TTL, EnvironmentApiKeyCache};
#[doc(inline)]
pub use auto_ops_rules::{AUTO_OPS_RULES_TTL, AutoOpsRulesCache};
#[doc(no_inline)]
pub use bucketeer_cache_tier::{Error, Result};
#[doc(inline)]
pub use entity::EntityCache;
#[doc(inline)]
pub use event_counter::{EventCounterCache, user_count_key};
#[doc(inline)]
pub use experiments::ExperimentsCache;
#[doc(inline)]
pub use features::FeaturesCache;
#[doc(inline)]
pub use mau::{DAU_TTL, MauCache, dau_key, mau_key};
#[doc(inline)]
pub use segment_users::SegmentUsersCache;
#[doc(inline)]
pub use user_attributes::UserAttributesCache;
