//! Cache-aside session cache with LRU eviction and TTL support.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use tempo_types::{Session, UserKey};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::store::SessionStore;
use crate::ttl::TtlTracker;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached snapshot, equal to the last value written to the store.
    pub session: Session,

    /// When this entry was inserted into cache.
    pub cached_at: Instant,
}

impl CacheEntry {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            cached_at: Instant::now(),
        }
    }
}

/// Read-throughs in progress for one user.
#[derive(Debug, Default)]
struct Loading {
    /// Bumped by every `put`, `invalidate` or `purge` for the user.
    generation: u64,
    readers: usize,
}

/// Users with a store read in flight.
type LoadMap = Mutex<HashMap<UserKey, Loading>>;

/// One in-flight read-through. Dropping it, even when the read is
/// cancelled, releases the user's entry in the load map.
struct LoadTicket<'a> {
    loads: &'a LoadMap,
    user: UserKey,
    generation: u64,
}

impl<'a> LoadTicket<'a> {
    fn begin(loads: &'a LoadMap, user: UserKey) -> Self {
        let mut map = loads.lock();
        let loading = map.entry(user).or_default();
        loading.readers += 1;
        Self {
            loads,
            user,
            generation: loading.generation,
        }
    }

    /// `true` if no write for the user happened since the ticket was taken.
    fn unchanged(&self) -> bool {
        self.loads
            .lock()
            .get(&self.user)
            .is_some_and(|loading| loading.generation == self.generation)
    }
}

impl Drop for LoadTicket<'_> {
    fn drop(&mut self) {
        let mut map = self.loads.lock();
        if let Some(loading) = map.get_mut(&self.user) {
            loading.readers = loading.readers.saturating_sub(1);
            if loading.readers == 0 {
                map.remove(&self.user);
            }
        }
    }
}

/// Inner state protected by RwLock.
struct CacheInner {
    lru: LruCache<UserKey, CacheEntry>,

    ttl: TtlTracker,

    /// Purged users. Read-throughs for them are served but not cached until
    /// the next `put`, or until the store reports the record gone.
    purged: HashSet<UserKey>,
}

impl CacheInner {
    fn install(&mut self, user: UserKey, session: Session) {
        if let Some((evicted, _)) = self.lru.push(user, CacheEntry::new(session)) {
            if evicted != user {
                debug!(user = %evicted, "Evicting LRU session to make room");
                self.ttl.remove(evicted);
            }
        }
        self.ttl.touch(user);
    }
}

/// Read-through session cache in front of a [`SessionStore`].
///
/// This cache provides:
/// - `get` with read-through on miss (`NotFound` results are never cached)
/// - `invalidate` / `put` for the writer's invalidate → write → put protocol
/// - LRU eviction when max capacity is reached
/// - Optional TTL-based expiration
///
/// The cache itself is safe for concurrent use. Ordering of writes for a
/// given user is the caller's job; the engine funnels them through one actor
/// per user.
pub struct SessionCache<S: SessionStore> {
    inner: Arc<RwLock<CacheInner>>,
    /// Locked after `inner` when both are held. A read-through only installs
    /// its value if no write for the same user happened while it was loading.
    loads: Arc<LoadMap>,
    store: Arc<S>,
    config: CacheConfig,
}

impl<S: SessionStore> SessionCache<S> {
    pub fn new(config: CacheConfig, store: Arc<S>) -> Self {

        let inner = CacheInner {
            lru: LruCache::new(config.capacity()),
            ttl: TtlTracker::new(config.ttl),
            purged: HashSet::new(),
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
            loads: Arc::new(Mutex::new(HashMap::new())),
            store,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The store this cache reads through to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.lru.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.lru.is_empty()
    }

    /// Get a session from cache or load it from the store.
    ///
    /// On a hit this marks the entry as recently used and resets its TTL.
    /// On a miss the store is consulted; a missing record is reported as
    /// [`Error::NotFound`] and nothing is cached. Loads for a
    /// [purged](Self::purge) user are returned but not cached.
    pub async fn get(&self, user: UserKey) -> Result<Session> {
        let ticket = {
            let mut inner = self.inner.write().await;

            if inner.ttl.is_expired(user) {
                if inner.lru.pop(&user).is_some() {
                    debug!(user = %user, "Session expired, removing from cache");
                }
                inner.ttl.remove(user);
            } else if let Some(entry) = inner.lru.get(&user) {
                trace!(user = %user, "Session found in cache");
                let session = entry.session.clone();
                inner.ttl.touch(user);
                return Ok(session);
            }

            LoadTicket::begin(&self.loads, user)
        };

        debug!(user = %user, "Session cache miss, loading from store");

        match self.store.load_by_user(user).await? {
            Some(session) => {
                let mut inner = self.inner.write().await;
                if inner.purged.contains(&user) {
                    debug!(user = %user, "Session purged, serving read without caching");
                } else if ticket.unchanged() {
                    inner.install(user, session.clone());
                    debug!(
                        user = %user,
                        cache_size = inner.lru.len(),
                        "Session loaded from store"
                    );
                } else {
                    debug!(
                        user = %user,
                        "Write raced with read-through, not caching loaded value"
                    );
                }
                Ok(session)
            }
            None => {
                self.inner.write().await.purged.remove(&user);
                Err(Error::NotFound(user))
            }
        }
    }

    /// Unconditionally overwrite the cached entry.
    pub async fn put(&self, user: UserKey, session: Session) {
        let mut inner = self.inner.write().await;
        self.record_write(user);
        inner.purged.remove(&user);
        inner.install(user, session);
        trace!(user = %user, cache_size = inner.lru.len(), "Session put into cache");
    }

    /// Remove any cached entry. Idempotent.
    pub async fn invalidate(&self, user: UserKey) {
        let mut inner = self.inner.write().await;
        self.record_write(user);
        inner.ttl.remove(user);
        if inner.lru.pop(&user).is_some() {
            debug!(user = %user, "Session invalidated from cache");
        }
    }

    /// Drop the user's entry and stop read-throughs from caching it again.
    ///
    /// For accounts being deleted: until the next `put`, reads still reach the
    /// store but their results are not cached.
    pub async fn purge(&self, user: UserKey) {
        let mut inner = self.inner.write().await;
        self.record_write(user);
        inner.ttl.remove(user);
        inner.lru.pop(&user);
        inner.purged.insert(user);
        debug!(user = %user, "Session purged from cache");
    }

    /// Called with `inner` write-locked so a racing read-through cannot
    /// install between its check and this write.
    fn record_write(&self, user: UserKey) {
        if let Some(loading) = self.loads.lock().get_mut(&user) {
            loading.generation = loading.generation.wrapping_add(1);
        }
    }

    /// Check if a user's session is cached (without loading).
    pub async fn contains(&self, user: UserKey) -> bool {
        let inner = self.inner.read().await;
        inner.lru.contains(&user) && !inner.ttl.is_expired(user)
    }

    /// Peek at a cached session without updating LRU order or TTL.
    pub async fn peek(&self, user: UserKey) -> Option<Session> {
        let inner = self.inner.read().await;
        if inner.ttl.is_expired(user) {
            None
        } else {
            inner.lru.peek(&user).map(|e| e.session.clone())
        }
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let expired = inner.ttl.drain_expired();
        let mut count = 0;

        for user in expired {
            if inner.lru.pop(&user).is_some() {
                count += 1;
            }
        }

        if count > 0 {
            debug!(count = count, "Cleaned up expired sessions");
        }

        count
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            size: inner.lru.len(),
            capacity: self.config.max_sessions,
            ttl_tracked: inner.ttl.len(),
        }
    }
}

impl<S: SessionStore> Clone for SessionCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            loads: Arc::clone(&self.loads),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Current number of cached sessions.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Number of entries being tracked for TTL.
    pub ttl_tracked: usize,
}
