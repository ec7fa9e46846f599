//! # Fixed-Step Clock
//!
//! Turns elapsed wall time into a whole number of fixed steps. Every step
//! hands systems the same delta, so a slow frame is paid back with extra
//! steps instead of a larger `dt`.
//!
//! ```rust,ignore
//! let mut clock = TickLoop::from_config(&config);
//! loop {
//!     world.drain_inbox(&inbox);
//!     world.run_due_ticks(&mut clock);
//!     std::thread::sleep(clock.time_until_next_tick());
//! }
//! ```
//!
//! At most [`MAX_CATCH_UP_TICKS`] steps are owed at once. Time beyond that
//! is dropped and counted in [`TickStats::dropped_ticks`].

use std::time::{Duration, Instant};

use crate::config::{EcsConfig, DEFAULT_TICK_RATE};

/// Most steps a single poll may report.
pub const MAX_CATCH_UP_TICKS: u32 = 5;

/// Fixed-timestep clock.
pub struct TickLoop {
    step: Duration,
    last_poll: Instant,
    /// Elapsed time not yet turned into steps. Always below `step` after a poll.
    owed: Duration,
    tick_count: u64,
    stats: TickStats,
}

/// Step timing, accumulated since creation or the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Steps measured.
    pub total_ticks: u64,
    /// Sum of measured step durations.
    pub total_tick_us: u64,
    /// Shortest step.
    pub min_tick_us: u64,
    /// Longest step.
    pub max_tick_us: u64,
    /// Steps that overran the fixed step duration.
    pub late_ticks: u64,
    /// Steps skipped because the clock fell too far behind.
    pub dropped_ticks: u64,
}

impl TickStats {
    /// Mean step duration, zero before the first step.
    #[must_use]
    pub fn mean_tick_us(&self) -> u64 {
        self.total_tick_us.checked_div(self.total_ticks).unwrap_or(0)
    }

    fn record(&mut self, elapsed_us: u64, late: bool) {
        self.min_tick_us = if self.total_ticks == 0 {
            elapsed_us
        } else {
            self.min_tick_us.min(elapsed_us)
        };
        self.max_tick_us = self.max_tick_us.max(elapsed_us);
        self.total_tick_us = self.total_tick_us.saturating_add(elapsed_us);
        self.total_ticks += 1;
        self.late_ticks += u64::from(late);
    }
}

impl TickLoop {
    /// Creates a clock stepping `tick_rate` times per second. A rate of zero
    /// is treated as 1 Hz.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let step = (Duration::from_secs(1) / tick_rate.max(1)).max(Duration::from_nanos(1));
        Self {
            step,
            last_poll: Instant::now(),
            owed: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::default(),
        }
    }

    /// Creates a clock stepping at `config.tick_rate`.
    #[must_use]
    pub fn from_config(config: &EcsConfig) -> Self {
        tracing::debug!("fixed step at {} Hz", config.tick_rate);
        Self::new(config.tick_rate)
    }

    /// Number of steps that became due since the previous poll.
    pub fn due_ticks(&mut self) -> u32 {
        self.due_ticks_at(Instant::now())
    }

    pub(crate) fn due_ticks_at(&mut self, now: Instant) -> u32 {
        self.owed += now.saturating_duration_since(self.last_poll);
        self.last_poll = self.last_poll.max(now);

        let step_ns = self.step.as_nanos();
        let owed_ns = self.owed.as_nanos();
        let whole = owed_ns / step_ns;
        self.owed = Duration::from_nanos(u64::try_from(owed_ns % step_ns).unwrap_or(0));

        let due = u32::try_from(whole)
            .unwrap_or(u32::MAX)
            .min(MAX_CATCH_UP_TICKS);
        let dropped = u64::try_from(whole - u128::from(due)).unwrap_or(u64::MAX);
        if dropped > 0 {
            self.stats.dropped_ticks = self.stats.dropped_ticks.saturating_add(dropped);
            tracing::debug!("clock fell behind, dropping {} steps", dropped);
        }
        due
    }

    /// Time left until the next step is due.
    #[must_use]
    pub fn time_until_next_tick(&self) -> Duration {
        self.step
            .saturating_sub(self.owed + self.last_poll.elapsed())
    }

    /// Marks the start of a step and returns the start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.tick_count += 1;
        Instant::now()
    }

    /// Records the duration of the step begun at `start`.
    pub fn end_tick(&mut self, start: Instant) {
        let elapsed = start.elapsed();
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let late = elapsed > self.step;
        self.stats.record(elapsed_us, late);
        if late {
            tracing::debug!(
                "step {} took {}us, budget {:?}",
                self.tick_count,
                elapsed_us,
                self.step
            );
        }
    }

    /// Fixed delta handed to systems, in seconds.
    #[inline]
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Steps begun so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Step timing.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Fixed step duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.step
    }

    /// Clears step timing.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::default();
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}
