//! Run command - drives a user's timer in the foreground.

use std::future::Future;

use anyhow::{Result, bail};
use clap::Args;
use tempo_engine::{EngineError, PhaseRequest, SessionApi, StatusView, UpdateSettingsRequest};
use tempo_session::SessionStore;
use tempo_types::{Phase, UserKey};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use super::{Context, format_clock, print_json};

/// Arguments for the run command.
///
/// Duration flags override the user's stored settings before the timer starts.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// User whose timer to run
    #[arg(short, long)]
    pub user: u64,

    /// Phase to start in: pomodoro, shortBreak or longBreak
    #[arg(long, default_value = "pomodoro")]
    pub phase: String,

    /// Work interval in minutes
    #[arg(long)]
    pub pomodoro: Option<i64>,

    /// Short break in minutes
    #[arg(long)]
    pub short_break: Option<i64>,

    /// Long break in minutes
    #[arg(long)]
    pub long_break: Option<i64>,

    /// Move to the next phase automatically when one ends
    #[arg(long)]
    pub auto_transition: Option<bool>,
}

impl RunArgs {
    fn has_overrides(&self) -> bool {
        self.pomodoro.is_some()
            || self.short_break.is_some()
            || self.long_break.is_some()
            || self.auto_transition.is_some()
    }
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let user = UserKey(args.user);
    let phase: Phase = args.phase.parse()?;
    let api = ctx.open_api()?;
    let engine = api.engine().clone();

    engine.recover_running().await?;
    engine.start();

    let current = api.provision(user).await?;
    if args.has_overrides() {
        api.update_settings(
            user,
            UpdateSettingsRequest {
                pomodoro: Some(args.pomodoro.unwrap_or(i64::from(current.pomodoro))),
                short_break: Some(args.short_break.unwrap_or(i64::from(current.short_break))),
                long_break: Some(args.long_break.unwrap_or(i64::from(current.long_break))),
                auto_transition: Some(args.auto_transition.unwrap_or(current.auto_transition)),
            },
        )
        .await?;
    }

    match api.start(user, PhaseRequest::new(phase)).await {
        Ok(timer) => info!(
            user = %user,
            phase = %timer.current_phase,
            remaining = timer.remaining_time,
            "Timer running, press Ctrl-C to stop"
        ),
        Err(EngineError::AlreadyRunning(_)) => {
            info!(user = %user, "Timer already running, following it")
        }
        Err(e) => {
            engine.shutdown().await;
            bail!(e);
        }
    }

    if let Err(e) = follow(&api, user, ctx, tokio::signal::ctrl_c()).await {
        engine.shutdown().await;
        return Err(e);
    }

    match api.stop(user).await {
        Ok(timer) => info!(remaining = %format_clock(timer.remaining_time), "Timer stopped"),
        Err(EngineError::NotRunning(_)) => {}
        Err(e) => warn!(error = %e, "Could not stop timer"),
    }
    engine.shutdown().await;
    Ok(())
}

/// How [`follow`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowEnd {
    Finished,
    Interrupted,
}

/// Report phase changes until the timer stops or `interrupt` resolves.
///
/// `interrupt` is polled for the whole loop, so it fires even if it
/// completes while a status read is in progress.
async fn follow<S, F>(
    api: &SessionApi<S>,
    user: UserKey,
    ctx: &Context,
    interrupt: F,
) -> Result<FollowEnd>
where
    S: SessionStore,
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(interrupt);

    let mut last = api.get_status(user).await?;
    report(&last, ctx)?;

    let mut poll = time::interval(api.engine().config().tick_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = &mut interrupt => {
                if let Err(e) = result {
                    warn!(error = %e, "Interrupt listener failed, stopping timer");
                } else {
                    info!("Interrupted, stopping timer");
                }
                return Ok(FollowEnd::Interrupted);
            }
            _ = poll.tick() => {
                let status = match api.get_status(user).await {
                    Ok(status) => status,
                    Err(e) if e.is_transient() => {
                        warn!(error = %e, "Status unavailable, retrying");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                if status.current_phase != last.current_phase
                    || status.is_running != last.is_running
                {
                    report(&status, ctx)?;
                }
                let finished = !status.is_running;
                last = status;
                if finished {
                    info!(user = %user, "Timer finished");
                    return Ok(FollowEnd::Finished);
                }
            }
        }
    }
}

fn report(status: &StatusView, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        return print_json(status);
    }
    let state = if status.is_running { "running" } else { "stopped" };
    println!(
        "{} {} ({} left, {} completed)",
        status.current_phase,
        state,
        format_clock(status.remaining_time),
        status.completed_pomodoros
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use tempo_config::TempoConfig;
    use tempo_engine::{EngineConfig, SessionEngine};
    use tempo_session::{CacheConfig, MemoryStore};

    const USER: UserKey = UserKey(3);

    fn context() -> Context {
        Context {
            config: TempoConfig::default(),
            database: PathBuf::from("unused.db"),
            json_output: true,
            verbose: false,
        }
    }

    async fn seeded_api() -> SessionApi<MemoryStore> {
        let config = EngineConfig::new().with_tick_interval(Duration::from_millis(10));
        let engine = SessionEngine::new(Arc::new(MemoryStore::new()), CacheConfig::new(), config);
        let api = SessionApi::new(engine);
        api.provision(USER).await.unwrap();
        api
    }

    #[tokio::test]
    async fn test_follow_stops_on_interrupt() {
        let api = seeded_api().await;
        api.start(USER, PhaseRequest::new(Phase::Work)).await.unwrap();

        // No scheduler runs, so the timer never finishes by itself.
        let interrupt = async {
            time::sleep(Duration::from_millis(50)).await;
            Ok::<(), std::io::Error>(())
        };
        let end = time::timeout(Duration::from_secs(5), follow(&api, USER, &context(), interrupt))
            .await
            .expect("follow returned")
            .unwrap();
        assert_eq!(end, FollowEnd::Interrupted);
    }

    #[tokio::test]
    async fn test_follow_ends_when_timer_is_stopped() {
        let api = seeded_api().await;
        let end = follow(&api, USER, &context(), std::future::pending())
            .await
            .unwrap();
        assert_eq!(end, FollowEnd::Finished);
    }

    #[tokio::test]
    async fn test_follow_surfaces_missing_session() {
        let api = seeded_api().await;
        let result = follow(&api, UserKey(99), &context(), std::future::pending()).await;
        assert!(result.is_err());
    }
}
