//! Pure session state transitions.
//!
//! Nothing here touches the cache, the store or the scheduler. The actor
//! applies these to its working copy and then decides what to persist.

use tempo_types::{Phase, Session, next_phase};

use crate::error::{EngineError, Result};

/// What a single tick did to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed.
    Idle,
    /// Time was taken off the clock and the phase continues.
    Counted,
    /// The phase ran out. `next` is the phase auto-transition moved to, or
    /// `None` if the timer stopped.
    PhaseEnded { finished: Phase, next: Option<Phase> },
}

impl TickOutcome {
    /// Boundary outcomes must be written through immediately.
    pub fn is_boundary(&self) -> bool {
        matches!(self, TickOutcome::PhaseEnded { .. })
    }
}

/// Start the timer in `requested`.
///
/// A different phase is entered with its full duration. The current phase
/// resumes where it stopped, unless its clock is at zero, in which case it
/// is re-armed.
pub fn start(session: &mut Session, requested: Phase) -> Result<()> {
    if session.state.running {
        return Err(EngineError::AlreadyRunning(session.user_key));
    }
    if requested != session.state.phase || session.state.remaining_seconds == 0 {
        session.enter_phase(requested);
    }
    session.state.running = true;
    Ok(())
}

/// Stop the timer, keeping phase and remaining time.
pub fn stop(session: &mut Session) -> Result<()> {
    if !session.state.running {
        return Err(EngineError::NotRunning(session.user_key));
    }
    session.state.running = false;
    Ok(())
}

/// Switch to `phase` with its full duration. Returns `false` if the session
/// was already in that phase, in which case nothing changes.
pub fn change_phase(session: &mut Session, phase: Phase) -> bool {
    if session.state.phase == phase {
        return false;
    }
    session.enter_phase(phase);
    true
}

/// Zero the per-cycle counter. The lifetime total is kept.
pub fn reset_completed(session: &mut Session) {
    session.state.completed_in_cycle = 0;
}

/// Advance the clock by `seconds`, handling the end of a phase.
pub fn tick(session: &mut Session, seconds: u32, long_break_every: u32) -> TickOutcome {
    if !session.state.running {
        return TickOutcome::Idle;
    }

    let state = &mut session.state;
    state.remaining_seconds = state.remaining_seconds.saturating_sub(seconds);
    if state.remaining_seconds > 0 {
        return TickOutcome::Counted;
    }

    let finished = state.phase;
    if finished == Phase::Work {
        state.completed_in_cycle += 1;
        state.total_completed += 1;
    }

    if !session.config.auto_transition {
        session.state.running = false;
        return TickOutcome::PhaseEnded {
            finished,
            next: None,
        };
    }

    let next = next_phase(finished, session.state.completed_in_cycle, long_break_every);
    session.enter_phase(next);
    TickOutcome::PhaseEnded {
        finished,
        next: Some(next),
    }
}
