// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Automated operations attached to feature flags.

/// A rule that changes a flag automatically, on a schedule or on an event rate.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AutoOpsRule {
    /// Rule identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Flag the rule operates on.
    #[prost(string, tag = "2")]
    pub feature_id: String,
    /// What triggers the rule.
    #[prost(enumeration = "OpsType", tag = "3")]
    pub ops_type: i32,
    /// Trigger conditions.
    #[prost(message, repeated, tag = "4")]
    pub clauses: Vec<Clause>,
    /// Creation time, Unix seconds.
    #[prost(int64, tag = "7")]
    pub created_at: i64,
    /// Last modification time, Unix seconds.
    #[prost(int64, tag = "8")]
    pub updated_at: i64,
    /// Soft-delete marker.
    #[prost(bool, tag = "9")]
    pub deleted: bool,
    /// Progress of the rule.
    #[prost(enumeration = "AutoOpsStatus", tag = "10")]
    pub auto_ops_status: i32,
    /// Name of the flag, denormalized for display.
    #[prost(string, tag = "11")]
    pub feature_name: String,
}

/// The rules of one environment, cached as a single snapshot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AutoOpsRules {
    /// The rules.
    #[prost(message, repeated, tag = "1")]
    pub auto_ops_rules: Vec<AutoOpsRule>,
}

/// A trigger condition. The concrete clause travels as a packed `Any`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Clause {
    /// Clause identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// The packed clause.
    #[prost(message, optional, tag = "2")]
    pub clause: Option<::prost_types::Any>,
}

/// Kind of trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OpsType {
    /// Not set.
    TypeUnknown = 0,
    /// Fires at fixed times.
    Schedule = 2,
    /// Fires when a goal event rate crosses a threshold.
    EventRate = 3,
}

/// Progress of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AutoOpsStatus {
    /// Not started.
    Waiting = 0,
    /// Started and not finished.
    Running = 1,
    /// Every clause has fired.
    Finished = 2,
    /// Stopped by a user.
    Stopped = 3,
}
