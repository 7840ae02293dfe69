//! Tick delivery for running timers.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempo_session::SessionStore;
use tempo_types::UserKey;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::engine::SessionEngine;
use crate::error::EngineError;

/// Set of users whose timers are running.
///
/// Both operations are idempotent. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct TickRegistry {
    users: Arc<Mutex<HashSet<UserKey>>>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the user was not registered before.
    pub fn register(&self, user: UserKey) -> bool {
        self.users.lock().insert(user)
    }

    /// Returns `true` if the user was registered.
    pub fn unregister(&self, user: UserKey) -> bool {
        self.users.lock().remove(&user)
    }

    pub fn contains(&self, user: UserKey) -> bool {
        self.users.lock().contains(&user)
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }

    /// Registered users at this instant.
    pub fn snapshot(&self) -> Vec<UserKey> {
        self.users.lock().iter().copied().collect()
    }
}

/// Delivers one tick per interval to every registered user.
///
/// A user never has more than one tick outstanding. If the previous tick is
/// still in flight the user is skipped for this round, and missed rounds are
/// not replayed.
pub struct TickScheduler<S: SessionStore> {
    engine: SessionEngine<S>,
    in_flight: Arc<Mutex<HashSet<UserKey>>>,
}

impl<S: SessionStore> TickScheduler<S> {
    pub fn new(engine: SessionEngine<S>) -> Self {
        Self {
            engine,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let period = self.engine.config().tick_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = period.as_millis() as u64, "Tick scheduler started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.dispatch_round();
                }
            }
        }
        info!("Tick scheduler stopped");
    }

    /// Launch one tick for each registered user without one in flight.
    /// Returns how many were launched.
    pub fn dispatch_round(&self) -> usize {
        let timeout = self.engine.config().tick_timeout;
        let mut launched = 0;

        for user in self.engine.ticks().snapshot() {
            if !self.in_flight.lock().insert(user) {
                trace!(user = %user, "Previous tick still in flight, skipping round");
                continue;
            }

            let engine = self.engine.clone();
            let in_flight = Arc::clone(&self.in_flight);
            tokio::spawn(async move {
                deliver(&engine, user, timeout).await;
                in_flight.lock().remove(&user);
            });
            launched += 1;
        }

        launched
    }

    /// Users with a tick currently being delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

async fn deliver<S: SessionStore>(engine: &SessionEngine<S>, user: UserKey, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    match time::timeout(timeout, engine.tick_before(user, deadline)).await {
        Ok(Ok(_)) => {}
        Ok(Err(EngineError::ActorUnavailable(_))) => {
            debug!(user = %user, "Tick expired before the actor reached it");
        }
        Ok(Err(EngineError::NotFound(_))) => {
            debug!(user = %user, "Tick for a session that no longer exists");
        }
        Ok(Err(EngineError::ShuttingDown)) => {}
        Ok(Err(e)) => warn!(user = %user, error = %e, "Tick failed"),
        Err(_) => warn!(
            user = %user,
            timeout_ms = timeout.as_millis() as u64,
            "Tick delivery timed out, dropped"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use async_trait::async_trait;
    use tempo_session::{CacheConfig, MemoryStore};
    use tempo_types::{Phase, Session};

    /// Memory store whose writes take a configurable amount of (tokio) time.
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore,
        write_delay: Mutex<Duration>,
    }

    impl SlowStore {
        fn set_write_delay(&self, delay: Duration) {
            *self.write_delay.lock() = delay;
        }

        async fn pause(&self) {
            let delay = *self.write_delay.lock();
            if !delay.is_zero() {
                time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl SessionStore for SlowStore {
        async fn load_by_user(&self, user: UserKey) -> tempo_session::Result<Option<Session>> {
            self.inner.load_by_user(user).await
        }

        async fn insert(&self, session: &Session) -> tempo_session::Result<()> {
            self.pause().await;
            self.inner.insert(session).await
        }

        async fn save(&self, session: &Session) -> tempo_session::Result<()> {
            self.pause().await;
            self.inner.save(session).await
        }

        async fn list_running(&self) -> tempo_session::Result<Vec<UserKey>> {
            self.inner.list_running().await
        }
    }

    async fn running_engine() -> (SessionEngine<SlowStore>, Arc<SlowStore>) {
        let store = Arc::new(SlowStore::default());
        let config = EngineConfig::new().with_flush_every_ticks(1);
        let engine = SessionEngine::new(Arc::clone(&store), CacheConfig::new(), config);
        engine.provision(UserKey(1)).await.unwrap();
        engine.start_timer(UserKey(1), Phase::Work).await.unwrap();
        (engine, store)
    }

    #[test]
    fn test_registry_is_idempotent() {
        let registry = TickRegistry::new();
        assert!(registry.register(UserKey(1)));
        assert!(!registry.register(UserKey(1)));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(UserKey(1)));
        assert!(!registry.unregister(UserKey(1)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = TickRegistry::new();
        let other = registry.clone();
        registry.register(UserKey(7));
        assert!(other.contains(UserKey(7)));

        let mut users = other.snapshot();
        other.register(UserKey(3));
        users.push(UserKey(3));
        users.sort();
        let mut snapshot = registry.snapshot();
        snapshot.sort();
        assert_eq!(snapshot, users);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_tick_is_skipped() {
        let (engine, store) = running_engine().await;

        let err = engine.tick_before(UserKey(1), Instant::now()).await.unwrap_err();
        assert!(matches!(err, EngineError::ActorUnavailable(UserKey(1))));
        assert_eq!(store.inner.peek(UserKey(1)).unwrap().state.remaining_seconds, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_queued_behind_slow_write_is_dropped() {
        let (engine, store) = running_engine().await;
        store.set_write_delay(Duration::from_secs(2));

        let change = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.change_phase(UserKey(1), Phase::ShortBreak).await })
        };
        time::sleep(Duration::from_millis(10)).await;

        let timeout = Duration::from_millis(500);
        let delivery =
            time::timeout(timeout, engine.tick_before(UserKey(1), Instant::now() + timeout)).await;
        assert!(delivery.is_err(), "tick should time out behind the slow write");

        change.await.unwrap().unwrap();
        time::sleep(Duration::from_secs(1)).await;

        // The late tick was never applied.
        let stored = store.inner.peek(UserKey(1)).unwrap();
        assert_eq!(stored.state.phase, Phase::ShortBreak);
        assert_eq!(stored.state.remaining_seconds, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_tick_in_flight_per_user() {
        let (engine, store) = running_engine().await;
        store.set_write_delay(Duration::from_secs(2));
        let scheduler = TickScheduler::new(engine.clone());

        assert_eq!(scheduler.dispatch_round(), 1);
        assert_eq!(scheduler.in_flight(), 1);
        assert_eq!(scheduler.dispatch_round(), 0);

        // The delivery gives up after the tick timeout and frees the slot,
        // even though the actor is still busy writing.
        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.dispatch_round(), 1);

        // Let the first write land. The second tick expired in the mailbox.
        store.set_write_delay(Duration::ZERO);
        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(store.inner.peek(UserKey(1)).unwrap().state.remaining_seconds, 1499);
    }
}
