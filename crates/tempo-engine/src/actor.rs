//! Per-user session actor.
//!
//! One actor task per active user. It owns the user's working copy, applies
//! commands one at a time, and is the only code that writes the user's record.
//! Every write runs the cache-aside protocol: invalidate, store write, put.

use std::sync::Arc;

use tempo_session::SessionStore;
use tempo_types::{Phase, Session, SessionConfig, UserKey};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

use crate::engine::Shared;
use crate::error::{EngineError, Result};
use crate::machine::{self, TickOutcome};

/// A state-changing request for one user.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Provision,
    UpdateConfig(SessionConfig),
    SetAutoTransition(bool),
    Start(Phase),
    Stop,
    ChangePhase(Phase),
    ResetCompletedInCycle,
    Tick,
}

/// Mailbox envelope.
#[derive(Debug)]
pub(crate) enum Message {
    Command {
        command: Command,
        /// Commands still queued past this instant are discarded unanswered.
        deadline: Option<Instant>,
        reply: oneshot::Sender<Result<Session>>,
    },
    /// Account deletion: forget everything held for the user.
    Purge { reply: oneshot::Sender<()> },
    /// Persist any buffered ticks.
    Flush { reply: oneshot::Sender<Result<()>> },
}

pub(crate) struct SessionActor<S: SessionStore> {
    user: UserKey,
    shared: Arc<Shared<S>>,
    /// Latest state, possibly ahead of the store by `pending_ticks` ticks.
    /// `None` forces the next command to read through the cache.
    working: Option<Session>,
    pending_ticks: u32,
    /// Set by `Purge`. Ticks are refused until another command arrives, so a
    /// tick queued behind the purge cannot re-read a record that is about to
    /// be deleted.
    purged: bool,
}

impl<S: SessionStore> SessionActor<S> {
    pub(crate) fn new(user: UserKey, shared: Arc<Shared<S>>) -> Self {
        Self {
            user,
            shared,
            working: None,
            pending_ticks: 0,
            purged: false,
        }
    }

    /// Process messages until the mailbox closes or the actor retires.
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        debug!(user = %self.user, "Session actor started");
        let idle = self.shared.config.actor_idle_timeout;

        loop {
            match time::timeout(idle, rx.recv()).await {
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => break,
                Err(_) => {
                    self.flush_unregistered().await;
                    if self.try_retire(&rx) {
                        debug!(user = %self.user, "Session actor retired after idle period");
                        return;
                    }
                }
            }
        }

        debug!(user = %self.user, "Session actor stopped");
    }

    /// Persist buffered ticks of a user the scheduler no longer ticks.
    async fn flush_unregistered(&mut self) {
        if self.pending_ticks == 0 || self.shared.ticks.contains(self.user) {
            return;
        }
        if let Err(e) = self.flush().await {
            warn!(user = %self.user, error = %e, "Could not flush buffered ticks while idle");
        }
    }

    /// Leave the registry if nothing can still need us.
    ///
    /// Senders only push while holding the registry lock, so an empty mailbox
    /// observed under that lock stays empty once we are removed.
    fn try_retire(&self, rx: &mpsc::UnboundedReceiver<Message>) -> bool {
        if self.pending_ticks > 0 || self.shared.ticks.contains(self.user) {
            return false;
        }
        let mut actors = self.shared.actors.lock();
        if !rx.is_empty() {
            return false;
        }
        actors.remove(&self.user);
        true
    }

    async fn handle(&mut self, message: Message) {
        match message {
            Message::Command {
                command,
                deadline,
                reply,
            } => {
                if let Some(deadline) = deadline
                    && Instant::now() >= deadline
                {
                    debug!(user = %self.user, ?command, "Skipping expired command");
                    return;
                }
                let result = self.execute(command).await;
                let _ = reply.send(result);
            }
            Message::Purge { reply } => {
                self.purge().await;
                let _ = reply.send(());
            }
            Message::Flush { reply } => {
                let _ = reply.send(self.flush().await);
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Session> {
        if self.purged {
            if matches!(command, Command::Tick) {
                debug!(user = %self.user, "Refusing tick for purged session");
                return Err(EngineError::NotFound(self.user));
            }
            self.purged = false;
        }

        match command {
            Command::Provision => match self.load().await {
                Ok(session) => Ok(session),
                Err(EngineError::NotFound(_)) => {
                    self.create(Session::with_defaults(self.user)).await
                }
                Err(e) => Err(e),
            },

            Command::UpdateConfig(config) => {
                config.validate()?;
                let mut session = match self.load().await {
                    Ok(session) => session,
                    Err(EngineError::NotFound(_)) => {
                        return self.create(Session::with_config(self.user, config)).await;
                    }
                    Err(e) => return Err(e),
                };
                session.config = config;
                self.commit(session).await
            }

            Command::SetAutoTransition(enabled) => {
                let mut session = self.load().await?;
                session.config.auto_transition = enabled;
                self.commit(session).await
            }

            Command::Start(phase) => {
                let mut session = self.load().await?;
                machine::start(&mut session, phase)?;
                let session = self.commit(session).await?;
                if self.shared.ticks.register(self.user) {
                    info!(
                        user = %self.user,
                        phase = %session.state.phase,
                        remaining = session.state.remaining_seconds,
                        "Timer started"
                    );
                } else {
                    warn!(user = %self.user, "Timer started but user was already registered");
                }
                Ok(session)
            }

            Command::Stop => {
                let mut session = self.load().await?;
                machine::stop(&mut session)?;
                let session = self.commit(session).await?;
                self.shared.ticks.unregister(self.user);
                info!(
                    user = %self.user,
                    remaining = session.state.remaining_seconds,
                    "Timer stopped"
                );
                Ok(session)
            }

            Command::ChangePhase(phase) => {
                let mut session = self.load().await?;
                if !machine::change_phase(&mut session, phase) {
                    return Ok(session);
                }
                info!(user = %self.user, phase = %phase, "Phase changed");
                self.commit(session).await
            }

            Command::ResetCompletedInCycle => {
                let mut session = self.load().await?;
                machine::reset_completed(&mut session);
                self.commit(session).await
            }

            Command::Tick => self.tick().await,
        }
    }

    async fn tick(&mut self) -> Result<Session> {
        let mut session = self.load().await?;
        let config = &self.shared.config;

        match machine::tick(&mut session, config.seconds_per_tick, config.long_break_every) {
            TickOutcome::Idle => {
                if self.shared.ticks.unregister(self.user) {
                    debug!(user = %self.user, "Dropped tick registration for stopped timer");
                }
                Ok(session)
            }
            TickOutcome::Counted => {
                self.pending_ticks += 1;
                // Nothing else will flush for a user the scheduler does not tick.
                if self.pending_ticks >= config.flush_every_ticks
                    || !self.shared.ticks.contains(self.user)
                {
                    trace!(
                        user = %self.user,
                        ticks = self.pending_ticks,
                        "Flushing buffered ticks"
                    );
                    return self.commit(session).await;
                }
                self.working = Some(session.clone());
                Ok(session)
            }
            TickOutcome::PhaseEnded { finished, next } => {
                let session = self.commit(session).await?;
                match next {
                    Some(next) => info!(
                        user = %self.user,
                        finished = %finished,
                        next = %next,
                        completed = session.state.completed_in_cycle,
                        "Phase complete, moving on"
                    ),
                    None => {
                        self.shared.ticks.unregister(self.user);
                        info!(
                            user = %self.user,
                            finished = %finished,
                            completed = session.state.completed_in_cycle,
                            "Phase complete, timer stopped"
                        );
                    }
                }
                Ok(session)
            }
        }
    }

    /// Current state: the working copy if we have one, else read through the cache.
    async fn load(&mut self) -> Result<Session> {
        if let Some(session) = &self.working {
            return Ok(session.clone());
        }
        match self.shared.cache.get(self.user).await {
            Ok(session) => {
                self.working = Some(session.clone());
                Ok(session)
            }
            Err(tempo_session::Error::NotFound(_)) => {
                self.shared.ticks.unregister(self.user);
                Err(EngineError::NotFound(self.user))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `session` as the user's record and make it the cached value.
    async fn commit(&mut self, session: Session) -> Result<Session> {
        self.shared.cache.invalidate(self.user).await;
        if let Err(e) = self.shared.cache.store().save(&session).await {
            return Err(self.storage_failure(e));
        }
        self.shared.cache.put(self.user, session.clone()).await;
        self.working = Some(session.clone());
        self.pending_ticks = 0;
        Ok(session)
    }

    /// Insert a brand new record.
    async fn create(&mut self, session: Session) -> Result<Session> {
        self.shared.cache.invalidate(self.user).await;
        if let Err(e) = self.shared.cache.store().insert(&session).await {
            return Err(self.storage_failure(e));
        }
        self.shared.cache.put(self.user, session.clone()).await;
        self.working = Some(session.clone());
        self.pending_ticks = 0;
        info!(user = %self.user, "Timer session created");
        Ok(session)
    }

    fn storage_failure(&mut self, e: tempo_session::Error) -> EngineError {
        self.working = None;
        self.pending_ticks = 0;
        match e {
            tempo_session::Error::NotFound(_) => {
                warn!(user = %self.user, "Session record disappeared during write");
                self.shared.ticks.unregister(self.user);
                EngineError::NotFound(self.user)
            }
            other => {
                warn!(
                    user = %self.user,
                    error = %other,
                    "Store write failed, cache left invalidated"
                );
                other.into()
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending_ticks == 0 {
            return Ok(());
        }
        if let Some(session) = self.working.clone() {
            debug!(user = %self.user, ticks = self.pending_ticks, "Flushing buffered ticks");
            self.commit(session).await?;
        }
        Ok(())
    }

    async fn purge(&mut self) {
        self.purged = true;
        self.working = None;
        self.pending_ticks = 0;
        self.shared.ticks.unregister(self.user);
        self.shared.cache.purge(self.user).await;
        info!(user = %self.user, "Timer session purged");
    }
}
