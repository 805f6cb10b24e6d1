// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Feature flags and their targeting configuration.

/// A feature flag as served to SDKs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Feature {
    /// Flag identifier, unique within an environment.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Whether targeting is active. A disabled flag serves its off variation.
    #[prost(bool, tag = "4")]
    pub enabled: bool,
    /// Soft-delete marker.
    #[prost(bool, tag = "5")]
    pub deleted: bool,
    /// Whether evaluation events for this flag must not be delayed.
    #[prost(bool, tag = "6")]
    pub evaluation_undelayable: bool,
    /// Client-side cache lifetime in seconds.
    #[prost(int32, tag = "7")]
    pub ttl: i32,
    /// Incremented on every change.
    #[prost(int32, tag = "8")]
    pub version: i32,
    /// Creation time, Unix seconds.
    #[prost(int64, tag = "9")]
    pub created_at: i64,
    /// Last modification time, Unix seconds.
    #[prost(int64, tag = "10")]
    pub updated_at: i64,
    /// Values the flag can serve.
    #[prost(message, repeated, tag = "11")]
    pub variations: Vec<Variation>,
    /// Individually targeted users per variation.
    #[prost(message, repeated, tag = "12")]
    pub targets: Vec<Target>,
    /// Targeting rules, evaluated in order.
    #[prost(message, repeated, tag = "13")]
    pub rules: Vec<Rule>,
    /// Strategy applied when no rule matches.
    #[prost(message, optional, tag = "14")]
    pub default_strategy: Option<Strategy>,
    /// Variation served while the flag is disabled. Empty when none is configured.
    #[prost(string, tag = "15")]
    pub off_variation: String,
    /// Tags used by SDKs to select the flags they fetch.
    #[prost(string, repeated, tag = "16")]
    pub tags: Vec<String>,
    /// Owner's email address.
    #[prost(string, tag = "18")]
    pub maintainer: String,
    /// Type shared by all variation values.
    #[prost(enumeration = "feature::VariationType", tag = "19")]
    pub variation_type: i32,
    /// Whether the flag has been archived.
    #[prost(bool, tag = "20")]
    pub archived: bool,
    /// Seed mixed into bucketing hashes.
    #[prost(string, tag = "22")]
    pub sampling_seed: String,
}

/// Nested types of [`Feature`].
pub mod feature {
    /// Type of the values a flag serves.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum VariationType {
        /// Plain strings.
        String = 0,
        /// `true` / `false`.
        Boolean = 1,
        /// Numbers.
        Number = 2,
        /// JSON documents.
        Json = 3,
    }
}

/// The flags of one environment, cached as a single snapshot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Features {
    /// The flags, in source order.
    #[prost(message, repeated, tag = "1")]
    pub features: Vec<Feature>,
    /// Content fingerprint that lets SDKs skip unchanged snapshots.
    #[prost(string, tag = "2")]
    pub id: String,
}

/// One value a flag can serve.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Variation {
    /// Variation identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Served value, encoded as text.
    #[prost(string, tag = "2")]
    pub value: String,
    /// Display name.
    #[prost(string, tag = "3")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
}

/// Users pinned to a variation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Target {
    /// Variation the users receive.
    #[prost(string, tag = "1")]
    pub variation: String,
    /// User identifiers.
    #[prost(string, repeated, tag = "2")]
    pub users: Vec<String>,
}

/// A targeting rule: when all clauses match, the strategy decides the variation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Rule {
    /// Rule identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Variation selection for matching users.
    #[prost(message, optional, tag = "2")]
    pub strategy: Option<Strategy>,
    /// Conditions, all of which must hold.
    #[prost(message, repeated, tag = "3")]
    pub clauses: Vec<Clause>,
}

/// A condition on one user attribute.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Clause {
    /// Clause identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// User attribute the clause inspects.
    #[prost(string, tag = "2")]
    pub attribute: String,
    /// Comparison applied to the attribute.
    #[prost(enumeration = "clause::Operator", tag = "3")]
    pub operator: i32,
    /// Operands of the comparison.
    #[prost(string, repeated, tag = "4")]
    pub values: Vec<String>,
}

/// Nested types of [`Clause`].
pub mod clause {
    /// Comparison applied by a clause.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Operator {
        /// Equal to one of the values.
        Equals = 0,
        /// Contained in the values.
        In = 1,
        /// Ends with one of the values.
        EndsWith = 2,
        /// Starts with one of the values.
        StartsWith = 3,
        /// The user belongs to one of the listed segments.
        Segment = 4,
        /// Greater than the value.
        Greater = 5,
        /// Greater than or equal to the value.
        GreaterOrEqual = 6,
        /// Less than the value.
        Less = 7,
        /// Less than or equal to the value.
        LessOrEqual = 8,
        /// Before the given time.
        BeforeTimestamp = 9,
        /// After the given time.
        AfterTimestamp = 10,
    }
}

/// How a variation is chosen.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Strategy {
    /// Which of the strategies below applies.
    #[prost(enumeration = "strategy::Type", tag = "1")]
    pub r#type: i32,
    /// Set when `type` is fixed.
    #[prost(message, optional, tag = "2")]
    pub fixed_strategy: Option<FixedStrategy>,
    /// Set when `type` is rollout.
    #[prost(message, optional, tag = "3")]
    pub rollout_strategy: Option<RolloutStrategy>,
}

/// Nested types of [`Strategy`].
pub mod strategy {
    /// Kind of strategy.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        /// Always the same variation.
        Fixed = 0,
        /// Weighted split across variations.
        Rollout = 1,
    }
}

/// Serves one variation to everybody.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FixedStrategy {
    /// The variation served.
    #[prost(string, tag = "1")]
    pub variation: String,
}

/// Splits users across variations by weight.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RolloutStrategy {
    /// Weighted variations.
    #[prost(message, repeated, tag = "1")]
    pub variations: Vec<rollout_strategy::Variation>,
}

/// Nested types of [`RolloutStrategy`].
pub mod rollout_strategy {
    /// A variation and its share of users.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Variation {
        /// The variation served.
        #[prost(string, tag = "1")]
        pub variation: String,
        /// Share in thousandths of a percent.
        #[prost(int32, tag = "2")]
        pub weight: i32,
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn default_feature_encodes_to_nothing() {
        assert!(Feature::default().encode_to_vec().is_empty());
    }

    #[test]
    fn variation_type_reads_back_as_enum() {
        let feature = Feature {
            variation_type: feature::VariationType::Json as i32,
            ..Feature::default()
        };
        assert_eq!(feature.variation_type(), feature::VariationType::Json);

        let unknown = Feature {
            variation_type: 42,
            ..Feature::default()
        };
        assert_eq!(unknown.variation_type(), feature::VariationType::String);
    }

    #[test]
    fn nested_rules_survive_encoding() {
        let feature = Feature {
            id: "checkout".to_string(),
            rules: vec![Rule {
                id: "rule-1".to_string(),
                strategy: Some(Strategy {
                    r#type: strategy::Type::Rollout as i32,
                    fixed_strategy: None,
                    rollout_strategy: Some(RolloutStrategy {
                        variations: vec![rollout_strategy::Variation {
                            variation: "on".to_string(),
                            weight: 100_000,
                        }],
                    }),
                }),
                clauses: vec![Clause {
                    id: "clause-1".to_string(),
                    attribute: "country".to_string(),
                    operator: clause::Operator::In as i32,
                    values: vec!["jp".to_string(), "us".to_string()],
                }],
            }],
            off_variation: "off".to_string(),
            tags: vec!["web".to_string()],
            ..Feature::default()
        };

        let decoded = Feature::decode(feature.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, feature);
        assert_eq!(decoded.rules[0].clauses[0].operator(), clause::Operator::In);
    }
}
