use std::time::{Duration, Instant};

/// Timing handed to a frame step.
///
/// `now` is measured from the start of the run (not wall-clock epoch) so state that stores
/// deadlines stays serializable and replayable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTick {
    pub now: Duration,
    pub dt: Duration,
}

/// Converts `Instant`s delivered by a windowed loop into [`FrameTick`]s.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    started: Instant,
    last: Instant,
    max_dt: Duration,
}

impl FrameClock {
    // Long stalls (window drag, debugger, suspended tab) would otherwise arrive as one giant
    // frame delta.
    pub const DEFAULT_MAX_DT: Duration = Duration::from_millis(250);

    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            last: now,
            max_dt: Self::DEFAULT_MAX_DT,
        }
    }

    pub fn with_max_dt(mut self, max_dt: Duration) -> Self {
        self.max_dt = max_dt;
        self
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let dt = now.saturating_duration_since(self.last).min(self.max_dt);
        self.last = now;
        FrameTick {
            now: self.elapsed_at(now),
            dt,
        }
    }
}
