//! Configuration for the session cache.

use std::num::NonZeroUsize;
use std::time::Duration;

/// Default maximum number of cached timer snapshots.
/// A snapshot is a few dozen bytes, so this is mostly bookkeeping.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Default TTL for cached snapshots (none by default - entries don't expire).
pub const DEFAULT_TTL: Option<Duration> = None;

/// Default period of the expired-entry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the session cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of users whose snapshot is kept before LRU eviction.
    pub max_sessions: usize,

    /// Optional time-to-live for cached snapshots.
    /// Entries that haven't been read or written within this duration are
    /// dropped and re-read from the store on next access.
    pub ttl: Option<Duration>,

    /// Period of the background sweep that drops expired entries.
    /// `None` leaves expired entries to be dropped on access.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: DEFAULT_TTL,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many users' snapshots may be cached at once.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Expire snapshots not touched within `ttl`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Keep snapshots until evicted or overwritten.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Sweep expired snapshots every `interval`.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Never sweep; expired snapshots are dropped when next read.
    pub fn without_sweep(mut self) -> Self {
        self.sweep_interval = None;
        self
    }

    /// LRU capacity. A zero `max_sessions` still caches one user.
    pub fn capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_sessions).unwrap_or(NonZeroUsize::MIN)
    }

    /// Sweep period, if a sweep has anything to do.
    ///
    /// Without a TTL nothing ever expires, so no sweep is needed.
    pub fn effective_sweep_interval(&self) -> Option<Duration> {
        self.ttl.and(self.sweep_interval).filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new();
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
        assert!(config.ttl.is_none());
        assert_eq!(config.sweep_interval, Some(DEFAULT_SWEEP_INTERVAL));
    }

    #[test]
    fn test_sweep_needs_ttl() {
        let config = CacheConfig::new();
        assert_eq!(config.effective_sweep_interval(), None);

        let config = config.with_ttl(Duration::from_secs(300));
        assert_eq!(config.effective_sweep_interval(), Some(DEFAULT_SWEEP_INTERVAL));

        let config = config.without_sweep();
        assert_eq!(config.effective_sweep_interval(), None);

        let config = config.with_sweep_interval(Duration::ZERO);
        assert_eq!(config.effective_sweep_interval(), None);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(CacheConfig::new().with_max_sessions(0).capacity().get(), 1);
        assert_eq!(CacheConfig::new().with_max_sessions(8).capacity().get(), 8);
    }
}
