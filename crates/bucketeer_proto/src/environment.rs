// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Environments, the unit of tenancy.

/// An environment within a project.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnvironmentV2 {
    /// Environment identifier. Most cache keys are scoped by it.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// URL-safe short code.
    #[prost(string, tag = "3")]
    pub url_code: String,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
    /// Owning project.
    #[prost(string, tag = "5")]
    pub project_id: String,
    /// Whether the environment has been archived.
    #[prost(bool, tag = "6")]
    pub archived: bool,
    /// Creation time, Unix seconds.
    #[prost(int64, tag = "7")]
    pub created_at: i64,
    /// Last modification time, Unix seconds.
    #[prost(int64, tag = "8")]
    pub updated_at: i64,
    /// Owning organization.
    #[prost(string, tag = "9")]
    pub organization_id: String,
}
