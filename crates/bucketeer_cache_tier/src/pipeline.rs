// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Batched command buffers executed in a single round trip.

use std::time::Duration;

/// A single buffered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Adds members to the probabilistic set stored at `key`.
    PfAdd {
        /// Target key.
        key: String,
        /// Members to add.
        members: Vec<String>,
    },
    /// Sets the time-to-live of `key`.
    Expire {
        /// Target key.
        key: String,
        /// New time-to-live.
        ttl: Duration,
    },
    /// Adds members to the set stored at `key`.
    SAdd {
        /// Target key.
        key: String,
        /// Members to add.
        members: Vec<String>,
    },
}

/// An ordered buffer of commands for one backend instance.
///
/// Commands run in submission order when the pipeline is passed to
/// [`Pipeliner::exec`][crate::Pipeliner::exec]. A transactional pipeline is applied all-or-nothing
/// by the backend; a plain pipeline only saves round trips.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_cache_tier::{Command, Pipeline};
///
/// let mut pipe = Pipeline::new(false);
/// pipe.pf_add("env:ANDROID:dau:20260128", ["user-1"])
///     .expire("env:ANDROID:dau:20260128", Duration::from_secs(60));
///
/// assert_eq!(pipe.len(), 2);
/// assert!(matches!(pipe.commands()[0], Command::PfAdd { .. }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    transactional: bool,
    commands: Vec<Command>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(transactional: bool) -> Self {
        Self {
            transactional,
            commands: Vec::new(),
        }
    }

    /// Buffers a `PFADD`.
    pub fn pf_add<I, S>(&mut self, key: impl Into<String>, members: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(Command::PfAdd {
            key: key.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Buffers an expiry update.
    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> &mut Self {
        self.commands.push(Command::Expire { key: key.into(), ttl });
        self
    }

    /// Buffers an `SADD`.
    pub fn s_add<I, S>(&mut self, key: impl Into<String>, members: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(Command::SAdd {
            key: key.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Returns whether the pipeline runs as a transaction.
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Returns the buffered commands in submission order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consumes the pipeline and returns its commands.
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Returns the number of buffered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing has been buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
