// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// A failure reported by a source of truth.
///
/// Cloning is cheap, which lets one failed upstream request be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct SourceError(SharedError);

impl SourceError {
    /// Wraps the failure of a source.
    pub fn new(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(Arc::from(cause.into()))
    }
}

/// An error that aborted a refresh cycle or lookup.
///
/// Cache failures never abort either: they are logged and the cycle or lookup carries on.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The list of entities to refresh could not be fetched, so nothing was written.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// A specialized [`Result`] type for refresh jobs.
pub type Result<T> = std::result::Result<T, Error>;
