//! Cache-aside session cache with LRU eviction and TTL support.
//!
//! This crate provides the read path for timer sessions:
//! - [`SessionCache`]: read-through cache keyed by [`UserKey`](tempo_types::UserKey)
//! - [`SessionStore`]: the durable storage seam the cache reads through
//! - [`MemoryStore`]: an in-process store for tests and ephemeral setups
//!
//! Writers follow invalidate → store write → put. The cache refuses to
//! install a read-through value if any write happened while that read was
//! in flight, so a slow reader can never resurrect a stale snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use tempo_session::{SessionCache, CacheConfig, MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let cache = SessionCache::new(CacheConfig::default().with_max_sessions(1000), store);
//! let session = cache.get(UserKey(1)).await?;
//! ```

mod cache;
mod config;
mod error;
mod store;
mod ttl;

pub use cache::{CacheEntry, CacheStats, SessionCache};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use store::{MemoryStore, SessionStore};
pub use ttl::TtlTracker;
