//! Timer phases and the auto-transition policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of completed work intervals that earn a long break.
pub const DEFAULT_LONG_BREAK_EVERY: u32 = 4;

/// The interval type a session is currently in.
///
/// Serialized with the names clients already use: `pomodoro`, `shortBreak`,
/// `longBreak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    #[serde(rename = "pomodoro")]
    Work,
    #[serde(rename = "shortBreak")]
    ShortBreak,
    #[serde(rename = "longBreak")]
    LongBreak,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::ShortBreak, Phase::LongBreak];

    /// Wire/storage name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "pomodoro",
            Phase::ShortBreak => "shortBreak",
            Phase::LongBreak => "longBreak",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" | "work" => Ok(Phase::Work),
            "shortBreak" | "short_break" => Ok(Phase::ShortBreak),
            "longBreak" | "long_break" => Ok(Phase::LongBreak),
            other => Err(ValidationError::UnknownPhase(other.to_string())),
        }
    }
}

/// Phase that follows `finished` when auto-transition is on.
///
/// `completed_in_cycle` is the counter *after* the finished phase was
/// accounted for. Work leads to a long break on every `long_break_every`-th
/// completion and to a short break otherwise; every break leads back to work.
pub fn next_phase(finished: Phase, completed_in_cycle: u32, long_break_every: u32) -> Phase {
    match finished {
        Phase::Work => {
            let every = long_break_every.max(1);
            if completed_in_cycle > 0 && completed_in_cycle % every == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Phase::Work,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("pomodoro".parse::<Phase>().unwrap(), Phase::Work);
        assert_eq!("shortBreak".parse::<Phase>().unwrap(), Phase::ShortBreak);
        assert_eq!("longBreak".parse::<Phase>().unwrap(), Phase::LongBreak);
        assert!(matches!(
            "lunch".parse::<Phase>(),
            Err(ValidationError::UnknownPhase(name)) if name == "lunch"
        ));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Phase::ShortBreak).unwrap();
        assert_eq!(json, "\"shortBreak\"");
        let phase: Phase = serde_json::from_str("\"pomodoro\"").unwrap();
        assert_eq!(phase, Phase::Work);
    }

    #[test]
    fn test_work_cycle_policy() {
        let every = DEFAULT_LONG_BREAK_EVERY;
        assert_eq!(next_phase(Phase::Work, 1, every), Phase::ShortBreak);
        assert_eq!(next_phase(Phase::Work, 2, every), Phase::ShortBreak);
        assert_eq!(next_phase(Phase::Work, 3, every), Phase::ShortBreak);
        assert_eq!(next_phase(Phase::Work, 4, every), Phase::LongBreak);
        assert_eq!(next_phase(Phase::Work, 5, every), Phase::ShortBreak);
        assert_eq!(next_phase(Phase::Work, 8, every), Phase::LongBreak);
    }

    #[test]
    fn test_breaks_return_to_work() {
        for completed in 0..10 {
            assert_eq!(next_phase(Phase::ShortBreak, completed, 4), Phase::Work);
            assert_eq!(next_phase(Phase::LongBreak, completed, 4), Phase::Work);
        }
    }

    #[test]
    fn test_zero_interval_is_treated_as_one() {
        assert_eq!(next_phase(Phase::Work, 1, 0), Phase::LongBreak);
    }
}
