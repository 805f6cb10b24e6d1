// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Refresh jobs that keep Bucketeer's caches filled.
//!
//! Each cacher reads one entity kind from its source of truth and writes per-environment
//! snapshots to every configured cache instance through a [`FanOut`]. Cachers hold no
//! state between runs; a scheduler outside this crate calls them periodically, and
//! mutation handlers may call the single-environment variants for faster propagation.
//!
//! | Cacher | Source | Cache |
//! |--------|--------|-------|
//! | [`FeatureFlagCacher`] | [`FeatureSource`] | [`FeaturesCache`](bucketeer_cache::FeaturesCache) |
//! | [`SegmentUserCacher`] | [`SegmentSource`] | [`SegmentUsersCache`](bucketeer_cache::SegmentUsersCache) |
//! | [`ApiKeyCacher`] | [`ApiKeySource`] | [`EnvironmentApiKeyCache`](bucketeer_cache::EnvironmentApiKeyCache) |
//! | [`ExperimentCacher`] | [`EnvironmentSource`] + [`ExperimentSource`] | [`ExperimentsCache`](bucketeer_cache::ExperimentsCache) |
//! | [`AutoOpsRulesCacher`] | [`EnvironmentSource`] + [`AutoOpsRuleSource`] | [`AutoOpsRulesCache`](bucketeer_cache::AutoOpsRulesCache) |
//!
//! # Failure handling
//!
//! Failing to list what should be cached aborts the cycle with [`Error::Source`] before
//! anything is written. Everything after that is best effort: a segment or environment
//! that cannot be fetched, or a cache instance that rejects a write, is logged and
//! skipped. The next cycle tries again.
//!
//! # Metrics
//!
//! Every cacher reports through the [`CacherTelemetry`] it is given: cycle outcomes and
//! durations, items cached per environment, and per-instance write outcomes.
//!
//! # Hot-path lookups
//!
//! [`AutoOpsRulesLookup`] reads auto-ops rules through the cache and coalesces concurrent
//! misses for one environment into a single upstream request.

mod api_key;
mod auto_ops_lookup;
mod auto_ops_rules;
mod error;
mod experiment;
mod fanout;
mod feature_flag;
mod segment_user;
mod source;
mod telemetry;

#[doc(inline)]
pub use api_key::ApiKeyCacher;
#[doc(inline)]
pub use auto_ops_lookup::AutoOpsRulesLookup;
#[doc(inline)]
pub use auto_ops_rules::AutoOpsRulesCacher;
#[doc(inline)]
pub use error::{Error, Result, SourceError};
#[doc(inline)]
pub use experiment::ExperimentCacher;
#[doc(inline)]
pub use fanout::FanOut;
#[doc(inline)]
pub use feature_flag::{FeatureFlagCacher, features_id};
#[doc(inline)]
pub use segment_user::SegmentUserCacher;
#[doc(inline)]
pub use source::{
    ApiKeySource, AutoOpsRuleSource, EnvironmentFeatures, EnvironmentSource, ExperimentSource, FeatureSource, InUseSegment,
    SegmentSource,
};
#[doc(inline)]
pub use telemetry::{CacherTelemetry, create_meter};
