// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::borrow::Cow;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error from a cache backend operation.
///
/// [`Error::NotFound`] is always recoverable: callers fall through to the authoritative
/// source. [`Error::InvalidType`] signals that the stored value does not have the shape the
/// operation expects and is surfaced as-is. Anything else the store reports passes through
/// as [`Error::Backend`].
///
/// # Example
///
/// ```
/// use bucketeer_cache_tier::Error;
///
/// let error = Error::backend("connection reset").context("failed to record DAU");
/// assert_eq!(error.to_string(), "failed to record DAU: connection reset");
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The key is absent or has expired.
    #[error("cache: not found")]
    NotFound,

    /// The stored value cannot be read as the requested shape.
    #[error("cache: invalid type")]
    InvalidType,

    /// The backend did not answer before the deadline.
    #[error("cache: operation timed out after {0:?}")]
    Timeout(Duration),

    /// The stored payload could not be decoded.
    #[error("cache: failed to decode value")]
    Decode(#[source] BoxError),

    /// Any other failure reported by the store.
    #[error(transparent)]
    Backend(BoxError),

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted.
        context: Cow<'static, str>,
        /// The underlying error.
        #[source]
        source: Box<Self>,
    },
}

impl Error {
    /// Wraps a store-specific failure.
    pub fn backend(cause: impl Into<BoxError>) -> Self {
        Self::Backend(cause.into())
    }

    /// Wraps a payload decoding failure.
    pub fn decode(cause: impl Into<BoxError>) -> Self {
        Self::Decode(cause.into())
    }

    /// Prefixes this error with a description of the failed operation.
    #[must_use]
    pub fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any [`Error::Context`] layers.
    #[must_use]
    pub fn root(&self) -> &Self {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns `true` if the key was absent or expired.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound)
    }

    /// Returns `true` if the stored value had an unexpected shape.
    #[must_use]
    pub fn is_invalid_type(&self) -> bool {
        matches!(self.root(), Self::InvalidType)
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
