// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;

use bucketeer_cache_tier::{Error, Getter, Putter, Result};
use prost::Message;

use crate::key::make_key;

/// A cache of protobuf messages of type `M` stored under one key kind.
///
/// This is the building block of the typed wrappers: it owns the key layout for its kind,
/// the TTL applied on writes and the protobuf encoding. Reads need a backend implementing
/// [`Getter`], writes one implementing [`Putter`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bucketeer_cache::EntityCache;
/// use bucketeer_cache_memory::InMemoryBackend;
/// use bucketeer_proto::user::UserAttribute;
///
/// # futures::executor::block_on(async {
/// let cache = EntityCache::<_, UserAttribute>::new(InMemoryBackend::new(), "attribute", Duration::ZERO);
/// let attribute = UserAttribute {
///     key: "country".to_string(),
///     values: vec!["jp".to_string()],
/// };
///
/// cache.put("country", "env-1", &attribute).await?;
/// assert_eq!(cache.get("country", "env-1").await?, attribute);
/// # Ok::<(), bucketeer_cache_tier::Error>(())
/// # });
/// ```
pub struct EntityCache<C, M> {
    backend: C,
    kind: &'static str,
    ttl: Duration,
    _message: PhantomData<fn() -> M>,
}

impl<C, M> EntityCache<C, M> {
    /// Creates a cache storing values under `kind` with the given `ttl`.
    pub fn new(backend: C, kind: &'static str, ttl: Duration) -> Self {
        Self {
            backend,
            kind,
            ttl,
            _message: PhantomData,
        }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Returns the key kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the TTL applied on writes.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the key of `id` in `environment_id`.
    #[must_use]
    pub fn key(&self, id: &str, environment_id: &str) -> String {
        make_key(self.kind, id, environment_id)
    }
}

impl<C, M> EntityCache<C, M>
where
    C: Getter,
    M: Message + Default,
{
    /// Reads and decodes entity `id` of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing is cached, [`Error::Decode`] if the payload is
    /// not a valid `M`, and any backend error unchanged.
    pub async fn get(&self, id: &str, environment_id: &str) -> Result<M> {
        let bytes = self.backend.get(&self.key(id, environment_id)).await?;
        decode(&bytes)
    }
}

impl<C, M> EntityCache<C, M>
where
    C: Putter,
    M: Message,
{
    /// Encodes `value` and stores it as entity `id` of `environment_id`.
    ///
    /// # Errors
    ///
    /// Returns any backend error unchanged.
    pub async fn put(&self, id: &str, environment_id: &str, value: &M) -> Result<()> {
        self.backend
            .put(&self.key(id, environment_id), value.encode_to_vec(), self.ttl)
            .await
    }
}

impl<C: Clone, M> Clone for EntityCache<C, M> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            kind: self.kind,
            ttl: self.ttl,
            _message: PhantomData,
        }
    }
}

impl<C: Debug, M> Debug for EntityCache<C, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache")
            .field("backend", &self.backend)
            .field("kind", &self.kind)
            .field("ttl", &self.ttl)
            .field("message", &std::any::type_name::<M>())
            .finish()
    }
}

pub(crate) fn decode<M: Message + Default>(bytes: &[u8]) -> Result<M> {
    M::decode(bytes).map_err(Error::decode)
}
