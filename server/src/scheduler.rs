//! Converts wall-clock time into whole fixed simulation steps.

use log::warn;
use std::time::{Duration, Instant};

/// Most steps run for a single wake-up. Anything beyond is dropped so a
/// stalled process does not fast-forward the round.
pub const MAX_CATCH_UP_STEPS: u32 = 5;

/// Fixed-timestep accumulator.
///
/// Wake-ups from `tokio::time::interval` jitter; the clock banks the real
/// elapsed time and releases it one fixed step at a time.
#[derive(Debug)]
pub struct TickClock {
    step: Duration,
    accumulated: Duration,
    last: Instant,
    max_steps: u32,
}

impl TickClock {
    pub fn new(tick_rate: u32) -> Self {
        Self::with_start(tick_rate, Instant::now())
    }

    pub fn with_start(tick_rate: u32, start: Instant) -> Self {
        Self {
            step: Duration::from_secs(1) / tick_rate.max(1),
            accumulated: Duration::ZERO,
            last: start,
            max_steps: MAX_CATCH_UP_STEPS,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Steps owed at `now`, capped at `MAX_CATCH_UP_STEPS`.
    pub fn advance(&mut self, now: Instant) -> u32 {
        self.accumulated += now.saturating_duration_since(self.last);
        self.last = now;

        let mut steps = 0;
        while self.accumulated >= self.step && steps < self.max_steps {
            self.accumulated -= self.step;
            steps += 1;
        }

        if self.accumulated >= self.step {
            let skipped = self.accumulated.as_nanos() / self.step.as_nanos().max(1);
            warn!("Tick loop fell behind, skipping {} steps", skipped);
            self.accumulated = Duration::ZERO;
        }

        steps
    }
}
