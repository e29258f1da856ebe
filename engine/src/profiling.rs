use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct StepTimings {
    pub step: Duration,
    pub record: Duration,
    pub total: Duration,
}

/// Optional hook for capturing per-frame step timings.
pub trait Profiler {
    fn on_step(&mut self, _frame: usize, _timings: StepTimings) {}
}

/// Logs frames whose step exceeds a budget.
#[derive(Debug, Clone, Copy)]
pub struct SlowFrameLogger {
    pub budget: Duration,
    pub slow_frames: usize,
}

impl SlowFrameLogger {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            slow_frames: 0,
        }
    }
}

impl Profiler for SlowFrameLogger {
    fn on_step(&mut self, frame: usize, timings: StepTimings) {
        if timings.total > self.budget {
            self.slow_frames += 1;
            tracing::warn!(
                frame,
                step_us = timings.step.as_micros() as u64,
                total_us = timings.total.as_micros() as u64,
                "frame exceeded budget"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_frame_logger_counts_only_over_budget() {
        let mut logger = SlowFrameLogger::new(Duration::from_millis(16));
        logger.on_step(
            1,
            StepTimings {
                total: Duration::from_millis(4),
                ..StepTimings::default()
            },
        );
        logger.on_step(
            2,
            StepTimings {
                total: Duration::from_millis(30),
                ..StepTimings::default()
            },
        );
        assert_eq!(logger.slow_frames, 1);
    }
}
