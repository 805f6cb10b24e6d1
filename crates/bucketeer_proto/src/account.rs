// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! API keys.

use crate::environment::EnvironmentV2;

/// An API key issued to an SDK or service.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiKey {
    /// The key string presented by clients.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// What the key may do.
    #[prost(enumeration = "api_key::Role", tag = "3")]
    pub role: i32,
    /// Whether the key has been revoked.
    #[prost(bool, tag = "4")]
    pub disabled: bool,
    /// Creation time, Unix seconds.
    #[prost(int64, tag = "5")]
    pub created_at: i64,
    /// Last modification time, Unix seconds.
    #[prost(int64, tag = "6")]
    pub updated_at: i64,
}

/// Nested types of [`ApiKey`].
pub mod api_key {
    /// Permissions granted to a key.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Role {
        /// Not set.
        Unknown = 0,
        /// Client SDKs.
        SdkClient = 1,
        /// Server SDKs.
        SdkServer = 2,
        /// Public API, read only.
        PublicApiReadOnly = 3,
        /// Public API, write.
        PublicApiWrite = 4,
        /// Public API, administration.
        PublicApiAdmin = 5,
    }
}

/// An API key together with the environment it grants access to.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnvironmentApiKey {
    /// Legacy namespace of the environment.
    #[prost(string, tag = "1")]
    pub environment_namespace: String,
    /// The key.
    #[prost(message, optional, tag = "2")]
    pub api_key: Option<ApiKey>,
    /// Whether the environment has been disabled.
    #[prost(bool, tag = "3")]
    pub environment_disabled: bool,
    /// Project the environment belongs to.
    #[prost(string, tag = "4")]
    pub project_id: String,
    /// The environment.
    #[prost(message, optional, tag = "5")]
    pub environment: Option<EnvironmentV2>,
    /// URL code of the project.
    #[prost(string, tag = "6")]
    pub project_url_code: String,
}
