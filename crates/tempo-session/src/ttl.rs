//! TTL tracking for cache entry expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tempo_types::UserKey;

/// Tracks last access times for TTL-based expiration.
#[derive(Debug)]
pub struct TtlTracker {
    /// Last access time for each cached user.
    access_times: HashMap<UserKey, Instant>,

    /// TTL duration (None means no expiration).
    ttl: Option<Duration>,
}

impl TtlTracker {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            access_times: HashMap::new(),
            ttl,
        }
    }

    /// Record an access (resets the TTL timer).
    pub fn touch(&mut self, user: UserKey) {
        self.access_times.insert(user, Instant::now());
    }

    /// Check whether an entry has expired. Untracked entries count as expired
    /// when a TTL is configured.
    pub fn is_expired(&self, user: UserKey) -> bool {
        match self.ttl {
            None => false,
            Some(ttl) => match self.access_times.get(&user) {
                None => true,
                Some(last_access) => last_access.elapsed() > ttl,
            },
        }
    }

    pub fn remove(&mut self, user: UserKey) {
        self.access_times.remove(&user);
    }

    /// Remove all expired entries and return their keys.
    pub fn drain_expired(&mut self) -> Vec<UserKey> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };
        let now = Instant::now();
        let expired: Vec<UserKey> = self
            .access_times
            .iter()
            .filter(|(_, last_access)| now.duration_since(**last_access) > ttl)
            .map(|(user, _)| *user)
            .collect();
        for user in &expired {
            self.access_times.remove(user);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.access_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.access_times.is_empty()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_no_ttl_never_expires() {
        let mut tracker = TtlTracker::new(None);
        tracker.touch(UserKey(1));

        assert!(!tracker.is_expired(UserKey(1)));
        assert!(!tracker.is_expired(UserKey(2)));
        assert!(tracker.drain_expired().is_empty());
    }

    #[test]
    fn test_touch_resets_timer() {
        let mut tracker = TtlTracker::new(Some(Duration::from_millis(50)));
        tracker.touch(UserKey(1));

        thread::sleep(Duration::from_millis(30));
        tracker.touch(UserKey(1));
        thread::sleep(Duration::from_millis(30));

        assert!(!tracker.is_expired(UserKey(1)));
    }

    #[test]
    fn test_drain_expired() {
        let mut tracker = TtlTracker::new(Some(Duration::from_millis(10)));
        tracker.touch(UserKey(1));
        tracker.touch(UserKey(2));

        thread::sleep(Duration::from_millis(20));

        let mut expired = tracker.drain_expired();
        expired.sort();
        assert_eq!(expired, vec![UserKey(1), UserKey(2)]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_removed_entries_count_as_expired() {
        let mut tracker = TtlTracker::new(Some(Duration::from_secs(60)));
        tracker.touch(UserKey(1));
        tracker.touch(UserKey(2));

        tracker.remove(UserKey(1));

        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_expired(UserKey(1)));
        assert!(!tracker.is_expired(UserKey(2)));
    }
}
