// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-only access to the sources of truth that refresh jobs copy from.
//!
//! Implementations sit on top of the database or upstream services. Every list is
//! returned in full; paging is the implementation's concern.

use bucketeer_proto::account::EnvironmentApiKey;
use bucketeer_proto::autoops::AutoOpsRule;
use bucketeer_proto::environment::EnvironmentV2;
use bucketeer_proto::experiment::Experiment;
use bucketeer_proto::feature::Feature;
use bucketeer_proto::segment::SegmentUser;

use crate::SourceError;

/// The flags of one environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentFeatures {
    /// The environment.
    pub environment_id: String,
    /// Its flags.
    pub features: Vec<Feature>,
}

/// A segment referenced by at least one flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InUseSegment {
    /// The segment.
    pub segment_id: String,
    /// Environment the segment belongs to.
    pub environment_id: String,
    /// When the segment last changed, Unix seconds.
    pub updated_at: i64,
}

/// Feature flag storage.
pub trait FeatureSource: Send + Sync {
    /// Lists the flags of `environment_id`. An unknown environment has no flags.
    fn list_features_by_environment(&self, environment_id: &str) -> impl Future<Output = Result<Vec<Feature>, SourceError>> + Send;

    /// Lists the flags of every environment.
    fn list_all_environment_features(&self) -> impl Future<Output = Result<Vec<EnvironmentFeatures>, SourceError>> + Send;
}

/// Segment storage.
pub trait SegmentSource: Send + Sync {
    /// Lists the segments that flags currently reference, without their users.
    fn list_all_in_use_segments(&self) -> impl Future<Output = Result<Vec<InUseSegment>, SourceError>> + Send;

    /// Lists the users of one segment.
    fn list_segment_users_by_segment(
        &self,
        segment_id: &str,
        environment_id: &str,
    ) -> impl Future<Output = Result<Vec<SegmentUser>, SourceError>> + Send;
}

/// API key storage.
pub trait ApiKeySource: Send + Sync {
    /// Lists every API key with its environment.
    fn list_all_environment_api_keys(&self) -> impl Future<Output = Result<Vec<EnvironmentApiKey>, SourceError>> + Send;

    /// Looks up one API key by its key string.
    fn get_environment_api_key(&self, api_key: &str) -> impl Future<Output = Result<EnvironmentApiKey, SourceError>> + Send;
}

/// Environment directory.
pub trait EnvironmentSource: Send + Sync {
    /// Lists every environment.
    fn list_environments(&self) -> impl Future<Output = Result<Vec<EnvironmentV2>, SourceError>> + Send;
}

/// Experiment service.
pub trait ExperimentSource: Send + Sync {
    /// Lists the waiting and running experiments of `environment_id`.
    fn list_experiments(&self, environment_id: &str) -> impl Future<Output = Result<Vec<Experiment>, SourceError>> + Send;
}

/// Auto-ops service.
pub trait AutoOpsRuleSource: Send + Sync {
    /// Lists every auto-ops rule of `environment_id`, whatever flag it belongs to.
    fn list_auto_ops_rules(&self, environment_id: &str) -> impl Future<Output = Result<Vec<AutoOpsRule>, SourceError>> + Send;
}
