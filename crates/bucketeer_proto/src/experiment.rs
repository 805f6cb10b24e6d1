// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Experiments measuring goals across flag variations.

use crate::feature::Variation;

/// An experiment on one flag.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Experiment {
    /// Experiment identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Primary goal. Superseded by `goal_ids`.
    #[prost(string, tag = "2")]
    pub goal_id: String,
    /// Flag under test.
    #[prost(string, tag = "3")]
    pub feature_id: String,
    /// Flag version the experiment started on.
    #[prost(int32, tag = "4")]
    pub feature_version: i32,
    /// Variations of the flag at start time.
    #[prost(message, repeated, tag = "5")]
    pub variations: Vec<Variation>,
    /// Start time, Unix seconds.
    #[prost(int64, tag = "6")]
    pub start_at: i64,
    /// Scheduled stop time, Unix seconds.
    #[prost(int64, tag = "7")]
    pub stop_at: i64,
    /// Whether the experiment has been stopped.
    #[prost(bool, tag = "8")]
    pub stopped: bool,
    /// Actual stop time, Unix seconds.
    #[prost(int64, tag = "9")]
    pub stopped_at: i64,
    /// Creation time, Unix seconds.
    #[prost(int64, tag = "10")]
    pub created_at: i64,
    /// Last modification time, Unix seconds.
    #[prost(int64, tag = "11")]
    pub updated_at: i64,
    /// Soft-delete marker.
    #[prost(bool, tag = "12")]
    pub deleted: bool,
    /// Goals measured.
    #[prost(string, repeated, tag = "13")]
    pub goal_ids: Vec<String>,
    /// Display name.
    #[prost(string, tag = "14")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "15")]
    pub description: String,
    /// Variation the others are compared against.
    #[prost(string, tag = "16")]
    pub base_variation_id: String,
    /// Lifecycle state.
    #[prost(enumeration = "experiment::Status", tag = "18")]
    pub status: i32,
    /// Owner's email address.
    #[prost(string, tag = "19")]
    pub maintainer: String,
    /// Whether the experiment has been archived.
    #[prost(bool, tag = "20")]
    pub archived: bool,
}

/// Nested types of [`Experiment`].
pub mod experiment {
    /// Lifecycle state of an experiment.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Status {
        /// Scheduled and not started.
        Waiting = 0,
        /// Collecting data.
        Running = 1,
        /// Reached its stop time.
        Stopped = 2,
        /// Stopped early by a user.
        ForceStopped = 3,
    }
}

/// The experiments of one environment, cached as a single snapshot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Experiments {
    /// The experiments.
    #[prost(message, repeated, tag = "1")]
    pub experiments: Vec<Experiment>,
}
