// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process backend over a concurrent map.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bucketeer_cache_tier::{
    Command, Deleter, Error, Expirer, Getter, HyperLogLog, Incrementer, MultiGetter, Pipeline, Pipeliner, Putter, Result, Scanner,
    SetReader, pattern,
};
use bucketeer_clock::Clock;
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use jiff::Timestamp;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::builder::InMemoryBackendBuilder;

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Set(HashSet<String>),
    // Tracked exactly; cardinality is the set size.
    Hll(HashSet<String>),
}

impl Value {
    fn kind(&self) -> Kind {
        match self {
            Self::Bytes(_) => Kind::Bytes,
            Self::Set(_) => Kind::Set,
            Self::Hll(_) => Kind::Hll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bytes,
    Set,
    Hll,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Timestamp>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self { value, expires_at: None }
    }

    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn expiry(now: Timestamp, ttl: Duration) -> Option<Timestamp> {
    if ttl.is_zero() {
        None
    } else {
        // Overflowing the representable range means the entry outlives any reader.
        now.checked_add(ttl).ok()
    }
}

#[derive(Debug)]
struct Inner {
    entries: DashMap<String, Entry>,
    clock: Clock,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl Inner {
    fn now(&self) -> Timestamp {
        self.clock.timestamp()
    }

    /// Runs `f` on the live value at `key`, removing the entry if it has expired.
    fn read<R>(&self, key: &str, now: Timestamp, f: impl FnOnce(&Value) -> R) -> Option<R> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(f(&entry.value)),
            Some(_) => {}
            None => return None,
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Returns the live entry at `key`, replacing a missing or expired one with `init`.
    fn live_entry(&self, key: &str, now: Timestamp, init: impl Fn() -> Value) -> RefMut<'_, String, Entry> {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry::new(init()));
        if entry.is_expired(now) {
            *entry = Entry::new(init());
        }
        entry
    }

    fn live_kind(&self, key: &str, now: Timestamp) -> Option<Kind> {
        self.read(key, now, Value::kind)
    }

    fn apply(&self, command: Command, now: Timestamp) -> Result<()> {
        match command {
            Command::PfAdd { key, members } => match &mut self.live_entry(&key, now, || Value::Hll(HashSet::new())).value {
                Value::Hll(set) => set.extend(members),
                _ => return Err(Error::InvalidType),
            },
            Command::SAdd { key, members } => match &mut self.live_entry(&key, now, || Value::Set(HashSet::new())).value {
                Value::Set(set) => set.extend(members),
                _ => return Err(Error::InvalidType),
            },
            Command::Expire { key, ttl } => {
                self.set_expiry(&key, now, ttl);
            }
        }
        Ok(())
    }

    fn set_expiry(&self, key: &str, now: Timestamp, ttl: Duration) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = expiry(now, ttl);
                true
            }
            _ => false,
        }
    }

    /// Checks that no command of a transactional pipeline would hit a value of the wrong
    /// shape, so that the pipeline is applied completely or not at all.
    fn validate(&self, commands: &[Command], now: Timestamp) -> Result<()> {
        for command in commands {
            let (key, expected) = match command {
                Command::PfAdd { key, .. } => (key, Kind::Hll),
                Command::SAdd { key, .. } => (key, Kind::Set),
                Command::Expire { .. } => continue,
            };
            if self.live_kind(key, now).is_some_and(|kind| kind != expected) {
                return Err(Error::InvalidType);
            }
        }
        Ok(())
    }

    fn hll_union<'a>(&self, keys: impl IntoIterator<Item = &'a str>, now: Timestamp) -> Result<HashSet<String>> {
        let mut union = HashSet::new();
        for key in keys {
            let members = self.read(key, now, |value| match value {
                Value::Hll(set) => Ok(set.clone()),
                _ => Err(Error::InvalidType),
            });
            if let Some(members) = members {
                union.extend(members?);
            }
        }
        Ok(union)
    }

    fn evict_expired(&self) -> usize {
        let now = self.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

/// An in-process cache backend.
///
/// Entries carry an absolute expiration time computed from the configured [`Clock`] when
/// they are written. Reads never return an expired entry. When an eviction interval is
/// configured, a background task on the current Tokio runtime also sweeps expired entries
/// on every tick.
///
/// Probabilistic sets are tracked exactly, so [`HyperLogLog::pf_count`] returns the true
/// number of distinct members.
///
/// Cloning is cheap; clones share the same entries.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_cache_memory::InMemoryBackend;
/// use bucketeer_cache_tier::{Getter, Putter};
///
/// # futures::executor::block_on(async {
/// let backend = InMemoryBackend::new();
///
/// backend.put("key", b"value".to_vec(), Duration::from_secs(60)).await.unwrap();
/// assert_eq!(backend.get("key").await.unwrap(), b"value");
/// assert!(backend.get("other").await.unwrap_err().is_not_found());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates a backend on the system clock without background eviction.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a backend.
    #[must_use]
    pub fn builder() -> InMemoryBackendBuilder {
        InMemoryBackendBuilder::new()
    }

    pub(crate) fn from_builder(builder: InMemoryBackendBuilder) -> Self {
        let entries = builder
            .initial_capacity
            .map_or_else(DashMap::new, DashMap::with_capacity);

        let inner = Arc::new(Inner {
            entries,
            clock: builder.clock.unwrap_or_default(),
            stop: Mutex::new(None),
        });

        if let Some(interval) = builder.eviction_interval.filter(|interval| !interval.is_zero()) {
            *inner.stop.lock() = spawn_evicter(Arc::downgrade(&inner), interval);
        }

        Self { inner }
    }

    /// Stops the background evicter and removes every entry.
    ///
    /// Calling this more than once is harmless. The backend stays usable afterwards but no
    /// longer sweeps expired entries in the background.
    pub fn destroy(&self) {
        if let Some(stop) = self.inner.stop.lock().take() {
            // The evicter may already have exited; nothing to report then.
            let _ = stop.send(());
        }
        self.inner.entries.clear();
    }

    /// Returns the number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Removes every expired entry and returns how many were removed.
    ///
    /// This is what the background evicter runs on each tick.
    pub fn evict_expired(&self) -> usize {
        self.inner.evict_expired()
    }
}

fn spawn_evicter(inner: Weak<Inner>, interval: Duration) -> Option<oneshot::Sender<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(?interval, "no Tokio runtime available, background eviction is disabled");
        return None;
    };

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                // Fires on `destroy()` and when the backend is dropped with the sender.
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else {
                        break;
                    };
                    let removed = inner.evict_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "evicted expired cache entries");
                    }
                }
            }
        }
    });

    Some(stop_tx)
}

impl Getter for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let now = self.inner.now();
        self.inner
            .read(key, now, |value| match value {
                Value::Bytes(bytes) => Ok(bytes.clone()),
                _ => Err(Error::InvalidType),
            })
            .unwrap_or(Err(Error::NotFound))
    }
}

impl Putter for InMemoryBackend {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = self.inner.now();
        self.inner.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value),
                expires_at: expiry(now, ttl),
            },
        );
        Ok(())
    }
}

impl MultiGetter for InMemoryBackend {
    async fn get_multi(&self, keys: &[String], ignore_not_found: bool) -> Result<Vec<Option<Vec<u8>>>> {
        let now = self.inner.now();
        keys.iter()
            .map(|key| {
                // Like MGET, a key holding a set or sketch reads as missing.
                let value = self
                    .inner
                    .read(key, now, |value| match value {
                        Value::Bytes(bytes) => Some(bytes.clone()),
                        _ => None,
                    })
                    .flatten();
                match value {
                    Some(bytes) => Ok(Some(bytes)),
                    None if ignore_not_found => Ok(None),
                    None => Err(Error::NotFound),
                }
            })
            .collect()
    }
}

impl Scanner for InMemoryBackend {
    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<(u64, Vec<String>)> {
        let now = self.inner.now();
        let mut matching: Vec<String> = self
            .inner
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now) && pattern::matches(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        matching.sort_unstable();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(matching.len());
        let page = usize::try_from(count.max(1)).unwrap_or(usize::MAX);
        let end = start.saturating_add(page).min(matching.len());
        let next = if end >= matching.len() { 0 } else { end as u64 };

        matching.truncate(end);
        Ok((next, matching.split_off(start)))
    }
}

impl Deleter for InMemoryBackend {
    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.entries.remove(key);
        Ok(())
    }
}

impl Incrementer for InMemoryBackend {
    async fn increment(&self, key: &str) -> Result<i64> {
        let now = self.inner.now();
        let mut entry = self.inner.live_entry(key, now, || Value::Bytes(b"0".to_vec()));
        let Value::Bytes(bytes) = &mut entry.value else {
            return Err(Error::InvalidType);
        };
        let current: i64 = std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or(Error::InvalidType)?;
        let next = current.checked_add(1).ok_or(Error::InvalidType)?;
        *bytes = next.to_string().into_bytes();
        Ok(next)
    }
}

impl Expirer for InMemoryBackend {
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = self.inner.now();
        Ok(self.inner.set_expiry(key, now, ttl))
    }
}

impl Pipeliner for InMemoryBackend {
    async fn exec(&self, pipeline: Pipeline) -> Result<()> {
        let now = self.inner.now();
        if pipeline.is_transactional() {
            self.inner.validate(pipeline.commands(), now)?;
        }

        let mut first_error = None;
        for command in pipeline.into_commands() {
            if let Err(error) = self.inner.apply(command, now) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl HyperLogLog for InMemoryBackend {
    async fn pf_count(&self, keys: &[String]) -> Result<i64> {
        let now = self.inner.now();
        let union = self.inner.hll_union(keys.iter().map(String::as_str), now)?;
        Ok(i64::try_from(union.len()).unwrap_or(i64::MAX))
    }

    async fn pf_merge(&self, dest: &str, keys: &[String], ttl: Duration) -> Result<()> {
        let now = self.inner.now();
        let union = self
            .inner
            .hll_union(keys.iter().map(String::as_str).chain(std::iter::once(dest)), now)?;

        let mut entry = self.inner.live_entry(dest, now, || Value::Hll(HashSet::new()));
        entry.value = Value::Hll(union);
        if !ttl.is_zero() {
            entry.expires_at = expiry(now, ttl);
        }
        Ok(())
    }
}

impl SetReader for InMemoryBackend {
    async fn s_members(&self, key: &str) -> Result<Vec<String>> {
        let now = self.inner.now();
        let members = self.inner.read(key, now, |value| match value {
            Value::Set(set) => Ok(set.iter().cloned().collect()),
            _ => Err(Error::InvalidType),
        });
        members.unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use bucketeer_clock::ClockControl;
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn zero_ttl_never_expires() {
        let now = Timestamp::UNIX_EPOCH;
        assert_eq!(expiry(now, Duration::ZERO), None);
        assert!(expiry(now, Duration::from_secs(1)).is_some());
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let control = ClockControl::new();
        let backend = InMemoryBackend::builder().clock(control.to_clock()).build();

        block_on(backend.put("k", vec![1], Duration::from_secs(1))).unwrap();
        control.advance(Duration::from_secs(1));

        assert!(block_on(backend.get("k")).unwrap_err().is_not_found());
        assert_eq!(backend.entry_count(), 0);
    }

    #[test]
    fn transactional_pipeline_is_all_or_nothing() {
        let backend = InMemoryBackend::new();
        block_on(backend.put("bytes", vec![1], Duration::ZERO)).unwrap();

        let mut pipe = backend.pipeline(true);
        pipe.s_add("set", ["a"]).pf_add("bytes", ["u1"]);

        assert!(block_on(backend.exec(pipe)).unwrap_err().is_invalid_type());
        assert_eq!(block_on(backend.s_members("set")).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn plain_pipeline_applies_what_it_can() {
        let backend = InMemoryBackend::new();
        block_on(backend.put("bytes", vec![1], Duration::ZERO)).unwrap();

        let mut pipe = backend.pipeline(false);
        pipe.pf_add("bytes", ["u1"]).s_add("set", ["a"]);

        assert!(block_on(backend.exec(pipe)).unwrap_err().is_invalid_type());
        assert_eq!(block_on(backend.s_members("set")).unwrap(), vec!["a".to_string()]);
    }
}
