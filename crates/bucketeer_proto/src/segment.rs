// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Segment membership.

/// One user's membership in a segment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SegmentUser {
    /// Membership identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Segment the user belongs to.
    #[prost(string, tag = "2")]
    pub segment_id: String,
    /// The user.
    #[prost(string, tag = "3")]
    pub user_id: String,
    /// Whether the user is included or excluded.
    #[prost(enumeration = "segment_user::State", tag = "4")]
    pub state: i32,
    /// Soft-delete marker.
    #[prost(bool, tag = "5")]
    pub deleted: bool,
}

/// Nested types of [`SegmentUser`].
pub mod segment_user {
    /// Membership state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum State {
        /// The user is a member.
        Included = 0,
        /// The user is explicitly excluded.
        Excluded = 1,
    }
}

/// Every user of one segment, cached as a single snapshot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SegmentUsers {
    /// The segment.
    #[prost(string, tag = "1")]
    pub segment_id: String,
    /// Its members.
    #[prost(message, repeated, tag = "2")]
    pub users: Vec<SegmentUser>,
    /// When the segment last changed, Unix seconds.
    #[prost(int64, tag = "3")]
    pub updated_at: i64,
}
