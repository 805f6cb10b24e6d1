// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock backend for testing.
//!
//! [`MockBackend`] keeps its data in memory, records every operation and can be told to
//! fail operations on demand, which makes it the backend of choice for exercising error
//! paths in wrappers and refresh jobs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{
    Command, Deleter, Error, Expirer, Getter, HyperLogLog, Incrementer, MultiGetter, Pipeline, Pipeliner, Putter, Result, Scanner,
    SetReader, pattern,
};

/// Recorded backend operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// A single read.
    Get(String),
    /// A single write.
    Put {
        /// The key written.
        key: String,
        /// The payload written.
        value: Vec<u8>,
        /// The time-to-live requested.
        ttl: Duration,
    },
    /// A batched read.
    GetMulti {
        /// The keys requested.
        keys: Vec<String>,
        /// Whether missing keys were tolerated.
        ignore_not_found: bool,
    },
    /// A page of a key scan.
    Scan {
        /// The cursor passed in.
        cursor: u64,
        /// The match pattern.
        pattern: String,
        /// The page size hint.
        count: u64,
    },
    /// A delete.
    Delete(String),
    /// A counter increment.
    Increment(String),
    /// A standalone expiry update.
    Expire {
        /// The key updated.
        key: String,
        /// The time-to-live requested.
        ttl: Duration,
    },
    /// A pipeline execution.
    Exec(Pipeline),
    /// A cardinality estimate.
    PfCount(Vec<String>),
    /// A merge of probabilistic sets.
    PfMerge {
        /// The destination key.
        dest: String,
        /// The source keys.
        keys: Vec<String>,
        /// The time-to-live applied to the destination.
        ttl: Duration,
    },
    /// A set read.
    SMembers(String),
}

/// A value held by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockValue {
    /// A plain byte payload.
    Bytes(Vec<u8>),
    /// A set of members.
    Set(BTreeSet<String>),
    /// A probabilistic set, tracked exactly.
    Hll(BTreeSet<String>),
}

type FailPredicate = Box<dyn Fn(&CacheOp) -> bool + Send + Sync>;

/// A configurable mock backend for testing.
///
/// Clones share data, recorded operations and the failure predicate. TTLs are recorded but
/// never enforced.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_cache_tier::testing::{CacheOp, MockBackend};
/// use bucketeer_cache_tier::{Getter, Putter};
///
/// # futures::executor::block_on(async {
/// let backend = MockBackend::new();
/// backend.put("key", b"value".to_vec(), Duration::ZERO).await.unwrap();
/// assert_eq!(backend.get("key").await.unwrap(), b"value");
///
/// backend.fail_when(|op| matches!(op, CacheOp::Get(_)));
/// assert!(backend.get("key").await.is_err());
/// # });
/// ```
#[derive(Clone)]
pub struct MockBackend {
    data: Arc<Mutex<BTreeMap<String, MockValue>>>,
    operations: Arc<Mutex<Vec<CacheOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates an empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(BTreeMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a mock backend holding the given plain values.
    #[must_use]
    pub fn with_data<I, K>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        let this = Self::new();
        this.data
            .lock()
            .extend(data.into_iter().map(|(k, v)| (k.into(), MockValue::Bytes(v))));
        this
    }

    /// Stores a raw value without recording an operation.
    pub fn insert_value(&self, key: impl Into<String>, value: MockValue) {
        self.data.lock().insert(key.into(), value);
    }

    /// Returns the raw value stored at `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<MockValue> {
        self.data.lock().get(key).cloned()
    }

    /// Returns the plain payload stored at `key`.
    #[must_use]
    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.value(key) {
            Some(MockValue::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Returns all stored keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.lock().keys().cloned().collect()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if `key` is stored.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Sets a predicate that decides which operations fail.
    ///
    /// Failing operations are still recorded and return [`Error::Backend`].
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketeer_cache_tier::testing::{CacheOp, MockBackend};
    ///
    /// let backend = MockBackend::new();
    ///
    /// // Fail every pipeline
    /// backend.fail_when(|op| matches!(op, CacheOp::Exec(_)));
    ///
    /// // Fail writes to one key
    /// backend.fail_when(|op| matches!(op, CacheOp::Put { key, .. } if key == "bad_key"));
    /// ```
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a copy of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp> {
        self.operations.lock().clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: CacheOp) -> Result<()> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        if fail {
            Err(Error::backend("injected failure"))
        } else {
            Ok(())
        }
    }

    fn apply(data: &mut BTreeMap<String, MockValue>, command: Command) -> Result<()> {
        match command {
            Command::PfAdd { key, members } => match data.entry(key).or_insert_with(|| MockValue::Hll(BTreeSet::new())) {
                MockValue::Hll(set) => set.extend(members),
                _ => return Err(Error::InvalidType),
            },
            Command::SAdd { key, members } => match data.entry(key).or_insert_with(|| MockValue::Set(BTreeSet::new())) {
                MockValue::Set(set) => set.extend(members),
                _ => return Err(Error::InvalidType),
            },
            Command::Expire { .. } => {}
        }
        Ok(())
    }
}

impl Getter for MockBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.record(CacheOp::Get(key.to_string()))?;
        match self.data.lock().get(key) {
            Some(MockValue::Bytes(bytes)) => Ok(bytes.clone()),
            Some(_) => Err(Error::InvalidType),
            None => Err(Error::NotFound),
        }
    }
}

impl Putter for MockBackend {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.record(CacheOp::Put {
            key: key.to_string(),
            value: value.clone(),
            ttl,
        })?;
        self.data.lock().insert(key.to_string(), MockValue::Bytes(value));
        Ok(())
    }
}

impl MultiGetter for MockBackend {
    async fn get_multi(&self, keys: &[String], ignore_not_found: bool) -> Result<Vec<Option<Vec<u8>>>> {
        self.record(CacheOp::GetMulti {
            keys: keys.to_vec(),
            ignore_not_found,
        })?;
        let data = self.data.lock();
        keys.iter()
            .map(|key| match data.get(key) {
                Some(MockValue::Bytes(bytes)) => Ok(Some(bytes.clone())),
                _ if ignore_not_found => Ok(None),
                _ => Err(Error::NotFound),
            })
            .collect()
    }
}

impl Scanner for MockBackend {
    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<(u64, Vec<String>)> {
        self.record(CacheOp::Scan {
            cursor,
            pattern: pattern.to_string(),
            count,
        })?;
        let matching: Vec<String> = self
            .data
            .lock()
            .keys()
            .filter(|key| pattern::matches(pattern, key))
            .cloned()
            .collect();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(matching.len());
        let page = usize::try_from(count.max(1)).unwrap_or(usize::MAX);
        let end = start.saturating_add(page).min(matching.len());
        let next = if end >= matching.len() { 0 } else { end as u64 };
        Ok((next, matching[start..end].to_vec()))
    }
}

impl Deleter for MockBackend {
    async fn delete(&self, key: &str) -> Result<()> {
        self.record(CacheOp::Delete(key.to_string()))?;
        self.data.lock().remove(key);
        Ok(())
    }
}

impl Incrementer for MockBackend {
    async fn increment(&self, key: &str) -> Result<i64> {
        self.record(CacheOp::Increment(key.to_string()))?;
        let mut data = self.data.lock();
        let current = match data.get(key) {
            Some(MockValue::Bytes(bytes)) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(Error::InvalidType)?,
            Some(_) => return Err(Error::InvalidType),
            None => 0,
        };
        let next = current + 1;
        data.insert(key.to_string(), MockValue::Bytes(next.to_string().into_bytes()));
        Ok(next)
    }
}

impl Expirer for MockBackend {
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.record(CacheOp::Expire { key: key.to_string(), ttl })?;
        Ok(self.data.lock().contains_key(key))
    }
}

impl Pipeliner for MockBackend {
    async fn exec(&self, pipeline: Pipeline) -> Result<()> {
        self.record(CacheOp::Exec(pipeline.clone()))?;
        let mut data = self.data.lock();
        for command in pipeline.into_commands() {
            Self::apply(&mut data, command)?;
        }
        Ok(())
    }
}

impl HyperLogLog for MockBackend {
    async fn pf_count(&self, keys: &[String]) -> Result<i64> {
        self.record(CacheOp::PfCount(keys.to_vec()))?;
        let data = self.data.lock();
        let mut union = BTreeSet::new();
        for key in keys {
            match data.get(key) {
                Some(MockValue::Hll(set)) => union.extend(set.iter().cloned()),
                Some(_) => return Err(Error::InvalidType),
                None => {}
            }
        }
        Ok(i64::try_from(union.len()).unwrap_or(i64::MAX))
    }

    async fn pf_merge(&self, dest: &str, keys: &[String], ttl: Duration) -> Result<()> {
        self.record(CacheOp::PfMerge {
            dest: dest.to_string(),
            keys: keys.to_vec(),
            ttl,
        })?;
        let mut data = self.data.lock();
        let mut union = BTreeSet::new();
        for key in keys.iter().map(String::as_str).chain(std::iter::once(dest)) {
            match data.get(key) {
                Some(MockValue::Hll(set)) => union.extend(set.iter().cloned()),
                Some(_) => return Err(Error::InvalidType),
                None => {}
            }
        }
        data.insert(dest.to_string(), MockValue::Hll(union));
        Ok(())
    }
}

impl SetReader for MockBackend {
    async fn s_members(&self, key: &str) -> Result<Vec<String>> {
        self.record(CacheOp::SMembers(key.to_string()))?;
        match self.data.lock().get(key) {
            Some(MockValue::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(Error::InvalidType),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn get_missing_key_is_not_found() {
        let backend = MockBackend::new();
        let err = block_on(backend.get("missing")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(backend.operations(), vec![CacheOp::Get("missing".to_string())]);
    }

    #[test]
    fn get_on_set_is_invalid_type() {
        let backend = MockBackend::new();
        backend.insert_value("set", MockValue::Set(BTreeSet::from(["a".to_string()])));
        assert!(block_on(backend.get("set")).unwrap_err().is_invalid_type());
    }

    #[test]
    fn failed_operations_are_still_recorded() {
        let backend = MockBackend::new();
        backend.fail_when(|op| matches!(op, CacheOp::Put { key, .. } if key == "bad"));

        assert!(block_on(backend.put("bad", vec![1], Duration::ZERO)).is_err());
        block_on(backend.put("good", vec![2], Duration::ZERO)).unwrap();

        assert_eq!(backend.operations().len(), 2);
        assert!(!backend.contains_key("bad"));
        assert_eq!(backend.bytes("good"), Some(vec![2]));

        backend.clear_failures();
        block_on(backend.put("bad", vec![1], Duration::ZERO)).unwrap();
        assert!(backend.contains_key("bad"));
    }

    #[test]
    fn get_multi_keeps_positions() {
        let backend = MockBackend::with_data([("a", vec![1]), ("c", vec![3])]);
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let values = block_on(backend.get_multi(&keys, true)).unwrap();
        assert_eq!(values, vec![Some(vec![1]), None, Some(vec![3])]);

        assert!(block_on(backend.get_multi(&keys, false)).unwrap_err().is_not_found());
    }

    #[test]
    fn get_multi_reads_sets_as_missing() {
        let backend = MockBackend::with_data([("a", vec![1])]);
        backend.insert_value("set", MockValue::Set(BTreeSet::from(["u1".to_string()])));
        let keys = vec!["a".to_string(), "set".to_string()];

        assert_eq!(block_on(backend.get_multi(&keys, true)).unwrap(), vec![Some(vec![1]), None]);
        assert!(block_on(backend.get_multi(&keys, false)).unwrap_err().is_not_found());
    }

    #[test]
    fn scan_pages_until_cursor_is_zero() {
        let backend = MockBackend::with_data([("p:1", vec![]), ("p:2", vec![]), ("p:3", vec![]), ("q:1", vec![])]);

        let (cursor, page) = block_on(backend.scan(0, "p:*", 2)).unwrap();
        assert_eq!(page, vec!["p:1".to_string(), "p:2".to_string()]);
        assert_eq!(cursor, 2);

        let (cursor, page) = block_on(backend.scan(cursor, "p:*", 2)).unwrap();
        assert_eq!(page, vec!["p:3".to_string()]);
        assert_eq!(cursor, 0);
    }

    #[test]
    fn increment_counts_from_zero_and_rejects_non_integers() {
        let backend = MockBackend::with_data([("text", b"abc".to_vec())]);
        assert_eq!(block_on(backend.increment("counter")).unwrap(), 1);
        assert_eq!(block_on(backend.increment("counter")).unwrap(), 2);
        assert!(block_on(backend.increment("text")).unwrap_err().is_invalid_type());
    }

    #[test]
    fn pipeline_applies_commands() {
        let backend = MockBackend::new();
        let mut pipe = backend.pipeline(false);
        pipe.pf_add("hll", ["u1", "u2"]).s_add("set", ["k"]).expire("hll", Duration::from_secs(1));
        block_on(backend.exec(pipe)).unwrap();

        assert_eq!(block_on(backend.pf_count(&["hll".to_string()])).unwrap(), 2);
        assert_eq!(block_on(backend.s_members("set")).unwrap(), vec!["k".to_string()]);
        assert!(block_on(backend.expire("hll", Duration::from_secs(5))).unwrap());
        assert!(!block_on(backend.expire("nope", Duration::from_secs(5))).unwrap());
    }

    #[test]
    fn pf_merge_unions_into_destination() {
        let backend = MockBackend::new();
        backend.insert_value("a", MockValue::Hll(BTreeSet::from(["u1".to_string(), "u2".to_string()])));
        backend.insert_value("b", MockValue::Hll(BTreeSet::from(["u2".to_string(), "u3".to_string()])));

        block_on(backend.pf_merge("dest", &["a".to_string(), "b".to_string()], Duration::ZERO)).unwrap();

        assert_eq!(block_on(backend.pf_count(&["dest".to_string()])).unwrap(), 3);
    }

    #[test]
    fn delete_removes_key() {
        let backend = MockBackend::with_data([("k", vec![0])]);
        block_on(backend.delete("k")).unwrap();
        block_on(backend.delete("k")).unwrap();
        assert_eq!(backend.entry_count(), 0);
    }
}
