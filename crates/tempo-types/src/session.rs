//! Timer session records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::phase::Phase;

/// Shortest accepted phase duration in minutes.
pub const MIN_DURATION_MINUTES: u32 = 1;

/// Longest accepted phase duration in minutes.
pub const MAX_DURATION_MINUTES: u32 = 60;

pub const DEFAULT_POMODORO_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;

/// Identity of the user owning a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(pub u64);

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserKey {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// User-chosen timer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub pomodoro_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub auto_transition: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pomodoro_minutes: DEFAULT_POMODORO_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            auto_transition: false,
        }
    }
}

impl SessionConfig {
    /// Build a config from raw request values, rejecting out-of-range durations.
    pub fn try_new(
        pomodoro: i64,
        short_break: i64,
        long_break: i64,
        auto_transition: bool,
    ) -> Result<Self> {
        Ok(Self {
            pomodoro_minutes: check_duration(Phase::Work, pomodoro)?,
            short_break_minutes: check_duration(Phase::ShortBreak, short_break)?,
            long_break_minutes: check_duration(Phase::LongBreak, long_break)?,
            auto_transition,
        })
    }

    /// Re-check an already constructed config.
    pub fn validate(&self) -> Result<()> {
        for phase in Phase::ALL {
            check_duration(phase, i64::from(self.minutes_for(phase)))?;
        }
        Ok(())
    }

    /// Configured duration of `phase` in minutes.
    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.pomodoro_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        }
    }

    /// Configured duration of `phase` in seconds.
    pub fn seconds_for(&self, phase: Phase) -> u32 {
        self.minutes_for(phase) * 60
    }
}

fn check_duration(phase: Phase, value: i64) -> Result<u32> {
    let min = MIN_DURATION_MINUTES;
    let max = MAX_DURATION_MINUTES;
    if value < i64::from(min) || value > i64::from(max) {
        return Err(ValidationError::DurationOutOfRange {
            phase,
            value,
            min,
            max,
        });
    }
    Ok(value as u32)
}

/// Continuously mutated timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub running: bool,
    /// Work intervals completed since the last counter reset.
    pub completed_in_cycle: u32,
    /// Lifetime count of completed work intervals.
    pub total_completed: u32,
}

/// One user's timer: settings plus live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_key: UserKey,
    pub config: SessionConfig,
    pub state: SessionState,
}

impl Session {
    /// A session with default settings and an idle, never-started state.
    pub fn with_defaults(user_key: UserKey) -> Self {
        Self::with_config(user_key, SessionConfig::default())
    }

    pub fn with_config(user_key: UserKey, config: SessionConfig) -> Self {
        Self {
            user_key,
            config,
            state: SessionState::default(),
        }
    }

    /// Switch to `phase` and re-arm its full duration.
    pub fn enter_phase(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.state.remaining_seconds = self.config.seconds_for(phase);
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }
}
