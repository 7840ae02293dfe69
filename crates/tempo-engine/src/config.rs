//! Engine configuration.

use std::time::Duration;

use tempo_types::DEFAULT_LONG_BREAK_EVERY;

/// Default scheduler cadence (1 second).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of non-boundary ticks buffered before a store write.
pub const DEFAULT_FLUSH_EVERY_TICKS: u32 = 10;

/// Default time a tick may spend waiting on a busy actor (500 ms).
pub const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_millis(500);

/// Default time an idle, stopped actor lingers before retiring (5 minutes).
pub const DEFAULT_ACTOR_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the scheduler delivers a tick to each running session.
    pub tick_interval: Duration,

    /// Seconds taken off the clock per tick. Normally the tick interval in
    /// whole seconds; tests and demos run a faster clock by keeping this at
    /// one while shortening the interval.
    pub seconds_per_tick: u32,

    /// Non-boundary ticks held in the actor before they are persisted.
    /// Phase boundaries and every other command write through immediately.
    pub flush_every_ticks: u32,

    /// Bound on a single tick delivery. Late ticks are dropped, not replayed.
    pub tick_timeout: Duration,

    /// Idle period after which an actor with no running timer retires.
    pub actor_idle_timeout: Duration,

    /// Completed work intervals per long break.
    pub long_break_every: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            seconds_per_tick: 1,
            flush_every_ticks: DEFAULT_FLUSH_EVERY_TICKS,
            tick_timeout: DEFAULT_TICK_TIMEOUT,
            actor_idle_timeout: DEFAULT_ACTOR_IDLE_TIMEOUT,
            long_break_every: DEFAULT_LONG_BREAK_EVERY,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick cadence. Also resets `seconds_per_tick` to the interval
    /// rounded to whole seconds.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self.seconds_per_tick = ((interval.as_millis() + 500) / 1000).max(1) as u32;
        self
    }

    pub fn with_seconds_per_tick(mut self, seconds: u32) -> Self {
        self.seconds_per_tick = seconds.max(1);
        self
    }

    pub fn with_flush_every_ticks(mut self, ticks: u32) -> Self {
        self.flush_every_ticks = ticks.max(1);
        self
    }

    pub fn with_tick_timeout(mut self, timeout: Duration) -> Self {
        self.tick_timeout = timeout;
        self
    }

    pub fn with_actor_idle_timeout(mut self, timeout: Duration) -> Self {
        self.actor_idle_timeout = timeout;
        self
    }

    pub fn with_long_break_every(mut self, every: u32) -> Self {
        self.long_break_every = every.max(1);
        self
    }
}
