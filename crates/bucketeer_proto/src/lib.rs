// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Protobuf messages for the entities stored in Bucketeer caches.
//!
//! Cached values are the plain protobuf encoding of these messages. The field numbers
//! match the messages written by every other Bucketeer service, so a payload cached by one
//! process can be decoded by any other.
//!
//! Enumerations are stored as `i32`, as `prost` does; each such field has a generated
//! accessor that returns the enum and falls back to its default for unknown values.
//!
//! ```
//! use bucketeer_proto::autoops::{AutoOpsRule, AutoOpsRules, OpsType};
//! use prost::Message;
//!
//! let rules = AutoOpsRules {
//!     auto_ops_rules: vec![AutoOpsRule {
//!         id: "rule-1".to_string(),
//!         feature_id: "checkout".to_string(),
//!         ops_type: OpsType::EventRate as i32,
//!         ..AutoOpsRule::default()
//!     }],
//! };
//!
//! let decoded = AutoOpsRules::decode(rules.encode_to_vec().as_slice()).unwrap();
//! assert_eq!(decoded.auto_ops_rules[0].ops_type(), OpsType::EventRate);
//! ```

pub mod account;
pub mod autoops;
pub mod environment;
pub mod experiment;
pub mod feature;
pub mod segment;
pub mod user;

#[doc(no_inline)]
pub use prost::Message;
