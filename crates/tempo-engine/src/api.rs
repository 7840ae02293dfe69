//! Request-shaped façade over the engine.
//!
//! Transport layers deserialize requests into the types here, call
//! [`SessionApi`], and serialize the returned views. Field names match the
//! JSON clients already send and expect (`shortBreak`, `remainingTime`, ...).

use serde::{Deserialize, Serialize};
use tempo_session::SessionStore;
use tempo_types::{Phase, Session, SessionConfig, UserKey};

use crate::engine::SessionEngine;
use crate::error::{EngineError, Result};

/// Body of a settings update. Durations are in minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub pomodoro: Option<i64>,
    pub short_break: Option<i64>,
    pub long_break: Option<i64>,
    /// Absent means off.
    pub auto_transition: Option<bool>,
}

impl UpdateSettingsRequest {
    /// Check presence and range of every field.
    pub fn into_config(self) -> Result<SessionConfig> {
        let pomodoro = required(self.pomodoro, "pomodoro")?;
        let short_break = required(self.short_break, "shortBreak")?;
        let long_break = required(self.long_break, "longBreak")?;
        Ok(SessionConfig::try_new(
            pomodoro,
            short_break,
            long_break,
            self.auto_transition.unwrap_or(false),
        )?)
    }
}

/// Body naming a phase, for start and phase changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRequest {
    pub phase: Option<String>,
}

impl PhaseRequest {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase: Some(phase.as_str().to_string()),
        }
    }

    pub fn parse(&self) -> Result<Phase> {
        Ok(required(self.phase.as_deref(), "phase")?.parse::<Phase>()?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTransitionRequest {
    pub auto_transition: Option<bool>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| EngineError::InvalidArgument(format!("missing field '{field}'")))
}

/// Durations plus the live timer, as shown on a settings screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub pomodoro: u32,
    pub short_break: u32,
    pub long_break: u32,
    pub remaining_time: u32,
    pub is_running: bool,
    pub current_phase: Phase,
    pub auto_transition: bool,
}

impl From<&Session> for SettingsView {
    fn from(session: &Session) -> Self {
        Self {
            pomodoro: session.config.pomodoro_minutes,
            short_break: session.config.short_break_minutes,
            long_break: session.config.long_break_minutes,
            remaining_time: session.state.remaining_seconds,
            is_running: session.state.running,
            current_phase: session.state.phase,
            auto_transition: session.config.auto_transition,
        }
    }
}

/// Timer state with progress counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub remaining_time: u32,
    pub is_running: bool,
    pub current_phase: Phase,
    pub completed_pomodoros: u32,
    pub total_completed_pomodoros: u32,
    pub auto_transition: bool,
}

impl From<&Session> for StatusView {
    fn from(session: &Session) -> Self {
        Self {
            remaining_time: session.state.remaining_seconds,
            is_running: session.state.running,
            current_phase: session.state.phase,
            completed_pomodoros: session.state.completed_in_cycle,
            total_completed_pomodoros: session.state.total_completed,
            auto_transition: session.config.auto_transition,
        }
    }
}

/// Minimal timer state returned by start, stop and phase changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub current_phase: Phase,
    pub remaining_time: u32,
    pub is_running: bool,
}

impl From<&Session> for TimerView {
    fn from(session: &Session) -> Self {
        Self {
            current_phase: session.state.phase,
            remaining_time: session.state.remaining_seconds,
            is_running: session.state.running,
        }
    }
}

/// Session operations keyed by the authenticated user.
pub struct SessionApi<S: SessionStore> {
    engine: SessionEngine<S>,
}

impl<S: SessionStore> Clone for SessionApi<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<S: SessionStore> SessionApi<S> {
    pub fn new(engine: SessionEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SessionEngine<S> {
        &self.engine
    }

    pub async fn get_config(&self, user: UserKey) -> Result<SessionConfig> {
        Ok(self.engine.get(user).await?.config)
    }

    pub async fn get_settings(&self, user: UserKey) -> Result<SettingsView> {
        Ok(SettingsView::from(&self.engine.get(user).await?))
    }

    pub async fn get_status(&self, user: UserKey) -> Result<StatusView> {
        Ok(StatusView::from(&self.engine.get(user).await?))
    }

    /// Create the default session for a new account.
    pub async fn provision(&self, user: UserKey) -> Result<SettingsView> {
        Ok(SettingsView::from(&self.engine.provision(user).await?))
    }

    pub async fn update_settings(
        &self,
        user: UserKey,
        request: UpdateSettingsRequest,
    ) -> Result<SettingsView> {
        let config = request.into_config()?;
        Ok(SettingsView::from(
            &self.engine.update_config(user, config).await?,
        ))
    }

    pub async fn update_auto_transition(
        &self,
        user: UserKey,
        request: AutoTransitionRequest,
    ) -> Result<SettingsView> {
        let enabled = required(request.auto_transition, "autoTransition")?;
        Ok(SettingsView::from(
            &self.engine.set_auto_transition(user, enabled).await?,
        ))
    }

    pub async fn start(&self, user: UserKey, request: PhaseRequest) -> Result<TimerView> {
        let phase = request.parse()?;
        Ok(TimerView::from(&self.engine.start_timer(user, phase).await?))
    }

    pub async fn stop(&self, user: UserKey) -> Result<TimerView> {
        Ok(TimerView::from(&self.engine.stop_timer(user).await?))
    }

    pub async fn change_phase(&self, user: UserKey, request: PhaseRequest) -> Result<TimerView> {
        let phase = request.parse()?;
        Ok(TimerView::from(&self.engine.change_phase(user, phase).await?))
    }

    pub async fn reset_completed(&self, user: UserKey) -> Result<StatusView> {
        Ok(StatusView::from(&self.engine.reset_completed(user).await?))
    }

    /// Drop in-memory state for a deleted account.
    pub async fn purge(&self, user: UserKey) -> Result<()> {
        self.engine.purge(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use serde_json::json;
    use std::sync::Arc;
    use tempo_session::{CacheConfig, MemoryStore};

    fn api() -> SessionApi<MemoryStore> {
        let engine = SessionEngine::new(
            Arc::new(MemoryStore::new()),
            CacheConfig::new(),
            EngineConfig::new(),
        );
        SessionApi::new(engine)
    }

    #[test]
    fn test_settings_request_wire_names() {
        let request: UpdateSettingsRequest = serde_json::from_value(json!({
            "pomodoro": 50,
            "shortBreak": 10,
            "longBreak": 30,
            "autoTransition": true
        }))
        .unwrap();
        let config = request.into_config().unwrap();
        assert_eq!(config.pomodoro_minutes, 50);
        assert_eq!(config.short_break_minutes, 10);
        assert_eq!(config.long_break_minutes, 30);
        assert!(config.auto_transition);
    }

    #[test]
    fn test_settings_request_missing_field() {
        let request: UpdateSettingsRequest =
            serde_json::from_value(json!({ "pomodoro": 25, "longBreak": 15 })).unwrap();
        let err = request.into_config().unwrap_err();
        assert!(err.to_string().contains("shortBreak"));
    }

    #[test]
    fn test_settings_request_out_of_range() {
        let request = UpdateSettingsRequest {
            pomodoro: Some(25),
            short_break: Some(-5),
            long_break: Some(15),
            auto_transition: None,
        };
        assert!(matches!(
            request.into_config(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_phase_request() {
        assert_eq!(PhaseRequest::new(Phase::LongBreak).parse().unwrap(), Phase::LongBreak);

        let unknown = PhaseRequest {
            phase: Some("nap".into()),
        };
        assert!(matches!(unknown.parse(), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(
            PhaseRequest::default().parse(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_status_view_wire_names() {
        let mut session = Session::with_defaults(UserKey(1));
        session.state.completed_in_cycle = 2;
        session.state.total_completed = 9;
        session.enter_phase(Phase::ShortBreak);

        let value = serde_json::to_value(StatusView::from(&session)).unwrap();
        assert_eq!(
            value,
            json!({
                "remainingTime": 300,
                "isRunning": false,
                "currentPhase": "shortBreak",
                "completedPomodoros": 2,
                "totalCompletedPomodoros": 9,
                "autoTransition": false
            })
        );
    }

    #[tokio::test]
    async fn test_provision_then_read() {
        let api = api();
        assert!(matches!(
            api.get_status(UserKey(4)).await,
            Err(EngineError::NotFound(UserKey(4)))
        ));

        let settings = api.provision(UserKey(4)).await.unwrap();
        assert_eq!(settings.pomodoro, 25);
        assert_eq!(settings.current_phase, Phase::Work);

        // Provisioning again leaves the record alone.
        api.update_settings(
            UserKey(4),
            UpdateSettingsRequest {
                pomodoro: Some(40),
                short_break: Some(5),
                long_break: Some(15),
                auto_transition: Some(true),
            },
        )
        .await
        .unwrap();
        let again = api.provision(UserKey(4)).await.unwrap();
        assert_eq!(again.pomodoro, 40);
        assert_eq!(api.get_config(UserKey(4)).await.unwrap().pomodoro_minutes, 40);
    }

    #[tokio::test]
    async fn test_update_auto_transition_requires_flag_and_session() {
        let api = api();
        let err = api
            .update_auto_transition(UserKey(2), AutoTransitionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let err = api
            .update_auto_transition(
                UserKey(2),
                AutoTransitionRequest {
                    auto_transition: Some(true),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(UserKey(2))));

        api.provision(UserKey(2)).await.unwrap();
        let settings = api
            .update_auto_transition(
                UserKey(2),
                AutoTransitionRequest {
                    auto_transition: Some(true),
                },
            )
            .await
            .unwrap();
        assert!(settings.auto_transition);
        assert_eq!(settings.pomodoro, 25);
    }

    #[tokio::test]
    async fn test_start_stop_views() {
        let api = api();
        api.provision(UserKey(1)).await.unwrap();

        let started = api
            .start(UserKey(1), PhaseRequest::new(Phase::Work))
            .await
            .unwrap();
        assert_eq!(
            started,
            TimerView {
                current_phase: Phase::Work,
                remaining_time: 1500,
                is_running: true
            }
        );

        let stopped = api.stop(UserKey(1)).await.unwrap();
        assert!(!stopped.is_running);
        assert_eq!(stopped.remaining_time, 1500);
        assert!(matches!(
            api.stop(UserKey(1)).await,
            Err(EngineError::NotRunning(UserKey(1)))
        ));
    }
}
