// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache key layout.
//!
//! Keys are `{kind}:{id}` for global entries and `{environment}:{kind}:{id}` for entries
//! scoped to an environment. Kinds are fixed per entity type, which keeps keys of
//! different types and tenants apart.

const SEPARATOR: char = ':';

/// Kind of the per-environment feature snapshot.
pub const FEATURES_KIND: &str = "features";
/// Kind of the per-environment experiment snapshot.
pub const EXPERIMENTS_KIND: &str = "experiments";
/// Kind of the per-environment auto-ops rule snapshot.
pub const AUTO_OPS_RULES_KIND: &str = "autoOpsRule";
/// Kind of API key entries.
pub const ENVIRONMENT_API_KEY_KIND: &str = "environment_apikey";
/// Kind of per-segment user snapshots.
pub const SEGMENT_USERS_KIND: &str = "segment_users";
/// Kind of auto-ops goal user counters.
pub const AUTO_OPS_GOAL_KIND: &str = "autoops:goal";
/// Kind of user attribute value sets.
pub const USER_ATTRIBUTE_KIND: &str = "user_attr";
/// Kind of the per-environment user attribute index.
pub const USER_ATTRIBUTE_KEYS_KIND: &str = "user_attr_keys";

/// Builds the key of entity `id` of `kind` in `environment_id`.
///
/// An empty `environment_id` yields a global key, and an empty `id` names the
/// environment-wide entry of `kind`.
///
/// # Examples
///
/// ```
/// use bucketeer_cache::key::make_key;
///
/// assert_eq!(make_key("segment_users", "seg-1", "env-1"), "env-1:segment_users:seg-1");
/// assert_eq!(make_key("environment_apikey", "key-1", ""), "environment_apikey:key-1");
/// assert_eq!(make_key("features", "", "env-1"), "env-1:features");
/// ```
#[must_use]
pub fn make_key(kind: &str, id: &str, environment_id: &str) -> String {
    let mut key = String::with_capacity(environment_id.len() + kind.len() + id.len() + 2);
    if !environment_id.is_empty() {
        key.push_str(environment_id);
        key.push(SEPARATOR);
    }
    key.push_str(kind);
    if !id.is_empty() {
        key.push(SEPARATOR);
        key.push_str(id);
    }
    key
}

/// Builds the prefix shared by every key of `kind` in `environment_id`.
///
/// ```
/// use bucketeer_cache::key::make_key_prefix;
///
/// assert_eq!(make_key_prefix("segment_users", "env-1"), "env-1:segment_users:");
/// ```
#[must_use]
pub fn make_key_prefix(kind: &str, environment_id: &str) -> String {
    let mut prefix = make_key(kind, "", environment_id);
    prefix.push(SEPARATOR);
    prefix
}
