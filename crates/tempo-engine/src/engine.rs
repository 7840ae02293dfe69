//! Session engine: actor registry, command dispatch and background tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempo_session::{CacheConfig, SessionCache, SessionStore};
use tempo_types::{Phase, Session, SessionConfig, UserKey};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actor::{Command, Message, SessionActor};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::scheduler::{TickRegistry, TickScheduler};

/// State shared by the engine handle and every actor.
pub(crate) struct Shared<S: SessionStore> {
    pub(crate) cache: SessionCache<S>,
    pub(crate) ticks: TickRegistry,
    pub(crate) config: EngineConfig,
    /// Live actors. Messages are only ever sent while this lock is held.
    pub(crate) actors: Mutex<HashMap<UserKey, mpsc::UnboundedSender<Message>>>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to the timer engine. Cheap to clone.
///
/// Reads go straight to the cache. Every state change is routed to the
/// user's actor, spawned on first use, so commands for one user are applied
/// in the order they were sent.
pub struct SessionEngine<S: SessionStore> {
    shared: Arc<Shared<S>>,
}

impl<S: SessionStore> Clone for SessionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: SessionStore> SessionEngine<S> {
    pub fn new(store: Arc<S>, cache_config: CacheConfig, config: EngineConfig) -> Self {
        Self::with_cache(SessionCache::new(cache_config, store), config)
    }

    /// Build an engine around an existing cache.
    pub fn with_cache(cache: SessionCache<S>, config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache,
                ticks: TickRegistry::new(),
                config,
                actors: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn cache(&self) -> &SessionCache<S> {
        &self.shared.cache
    }

    pub fn store(&self) -> &Arc<S> {
        self.shared.cache.store()
    }

    /// Users currently receiving ticks.
    pub fn ticks(&self) -> &TickRegistry {
        &self.shared.ticks
    }

    /// Number of live actors.
    pub fn active_actors(&self) -> usize {
        self.shared.actors.lock().len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Spawn the tick scheduler and, when entries can expire, the cache
    /// sweep of expired cache entries. Both stop on [`shutdown`](Self::shutdown).
    pub fn start(&self) {
        let mut tasks = self.shared.tasks.lock();

        let scheduler = TickScheduler::new(self.clone());
        tasks.push(tokio::spawn(scheduler.run(self.shared.shutdown.clone())));

        if let Some(period) = self.shared.cache.config().effective_sweep_interval() {
            tasks.push(self.spawn_cache_sweep(period));
        }

        info!(
            tick_interval_ms = self.shared.config.tick_interval.as_millis() as u64,
            flush_every_ticks = self.shared.config.flush_every_ticks,
            "Session engine started"
        );
    }

    fn spawn_cache_sweep(&self, period: Duration) -> JoinHandle<()> {
        let cache = self.shared.cache.clone();
        let cancel = self.shared.shutdown.clone();

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = cache.cleanup_expired().await;
                        if removed > 0 {
                            debug!(removed, "Swept expired cache entries");
                        }
                    }
                }
            }
        })
    }

    /// Re-register every session the store says is running.
    ///
    /// Call once at startup, before or after [`start`](Self::start). Returns
    /// the number of sessions that resumed ticking.
    pub async fn recover_running(&self) -> Result<usize> {
        let users = self.store().list_running().await?;
        let mut recovered = 0;
        for user in users {
            if self.shared.ticks.register(user) {
                recovered += 1;
            }
        }
        if recovered > 0 {
            info!(count = recovered, "Resumed running timers");
        }
        Ok(recovered)
    }

    /// Stop background tasks, persist buffered ticks and release all actors.
    ///
    /// Running timers stay marked as running in the store so that
    /// [`recover_running`](Self::recover_running) picks them up next time.
    pub async fn shutdown(&self) {
        self.shared.shutdown.cancel();

        let tasks: Vec<_> = std::mem::take(&mut *self.shared.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        let actors: Vec<_> = self.shared.actors.lock().drain().collect();
        for (user, sender) in actors {
            let (reply, flushed) = oneshot::channel();
            if sender.send(Message::Flush { reply }).is_err() {
                continue;
            }
            drop(sender);
            match flushed.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(user = %user, error = %e, "Could not flush buffered ticks"),
                Err(_) => warn!(user = %user, "Session actor exited before flushing"),
            }
        }

        info!("Session engine stopped");
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// The user's session as last written, read through the cache.
    pub async fn get(&self, user: UserKey) -> Result<Session> {
        Ok(self.shared.cache.get(user).await?)
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Create the default record for a new user. Existing records are
    /// returned unchanged.
    pub async fn provision(&self, user: UserKey) -> Result<Session> {
        self.request(user, Command::Provision, None).await
    }

    /// Replace the user's durations and auto-transition flag, creating the
    /// session if there is none. Timer state is kept.
    pub async fn update_config(&self, user: UserKey, config: SessionConfig) -> Result<Session> {
        self.request(user, Command::UpdateConfig(config), None).await
    }

    pub async fn set_auto_transition(&self, user: UserKey, enabled: bool) -> Result<Session> {
        self.request(user, Command::SetAutoTransition(enabled), None).await
    }

    pub async fn start_timer(&self, user: UserKey, phase: Phase) -> Result<Session> {
        self.request(user, Command::Start(phase), None).await
    }

    pub async fn stop_timer(&self, user: UserKey) -> Result<Session> {
        self.request(user, Command::Stop, None).await
    }

    pub async fn change_phase(&self, user: UserKey, phase: Phase) -> Result<Session> {
        self.request(user, Command::ChangePhase(phase), None).await
    }

    pub async fn reset_completed(&self, user: UserKey) -> Result<Session> {
        self.request(user, Command::ResetCompletedInCycle, None).await
    }

    /// Apply one tick immediately, outside the scheduler.
    pub async fn tick(&self, user: UserKey) -> Result<Session> {
        self.request(user, Command::Tick, None).await
    }

    /// Apply one tick unless it is still queued at `deadline`.
    pub(crate) async fn tick_before(&self, user: UserKey, deadline: Instant) -> Result<Session> {
        self.request(user, Command::Tick, Some(deadline)).await
    }

    /// Forget everything held in memory for an account being deleted.
    ///
    /// May run before or after the store record is removed. The tick
    /// registration and cached entry are dropped, reads are no longer cached,
    /// and ticks still queued for the user fail with [`EngineError::NotFound`]
    /// instead of re-reading the record. The next successful non-tick command
    /// clears that state. The actor retires once idle.
    pub async fn purge(&self, user: UserKey) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.send(user, Message::Purge { reply })?;
        done.await.map_err(|_| EngineError::ActorUnavailable(user))
    }

    async fn request(
        &self,
        user: UserKey,
        command: Command,
        deadline: Option<Instant>,
    ) -> Result<Session> {
        let (reply, response) = oneshot::channel();
        self.send(
            user,
            Message::Command {
                command,
                deadline,
                reply,
            },
        )?;
        response
            .await
            .map_err(|_| EngineError::ActorUnavailable(user))?
    }

    /// Deliver `message` to the user's actor, spawning one if needed.
    fn send(&self, user: UserKey, message: Message) -> Result<()> {
        let mut actors = self.shared.actors.lock();
        if self.shared.shutdown.is_cancelled() {
            return Err(EngineError::ShuttingDown);
        }

        let message = match actors.get(&user) {
            Some(sender) => match sender.send(message) {
                Ok(()) => return Ok(()),
                // The actor died without deregistering.
                Err(mpsc::error::SendError(message)) => {
                    warn!(user = %user, "Replacing dead session actor");
                    message
                }
            },
            None => message,
        };

        let sender = self.spawn_actor(user);
        sender
            .send(message)
            .map_err(|_| EngineError::ActorUnavailable(user))?;
        actors.insert(user, sender);
        Ok(())
    }

    fn spawn_actor(&self, user: UserKey) -> mpsc::UnboundedSender<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = SessionActor::new(user, Arc::clone(&self.shared));
        tokio::spawn(actor.run(rx));
        tx
    }
}
