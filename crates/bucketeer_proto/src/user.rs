// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! User attributes observed in evaluation events.

/// Attributes seen for users of one environment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserAttributes {
    /// The environment.
    #[prost(string, tag = "1")]
    pub environment_id: String,
    /// Observed attributes.
    #[prost(message, repeated, tag = "2")]
    pub user_attributes: Vec<UserAttribute>,
}

/// One attribute key and the values observed for it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserAttribute {
    /// Attribute name.
    #[prost(string, tag = "1")]
    pub key: String,
    /// Distinct values.
    #[prost(string, repeated, tag = "2")]
    pub values: Vec<String>,
}
