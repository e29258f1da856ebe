pub mod app;
pub mod canvas;
pub mod clock;
pub mod profiling;
pub mod surface;

use std::{
    fs, io,
    path::Path,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use clock::FrameTick;

/// Recorded frame history with a movable cursor.
///
/// Recording while rewound drops the "future" frames and branches from the cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeMachine<State> {
    states: Vec<State>,
    frame: usize,
}

impl<State> TimeMachine<State> {
    pub fn new(initial_state: State) -> Self {
        Self {
            states: vec![initial_state],
            frame: 0,
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self) -> &State {
        &self.states[self.frame]
    }

    pub fn state_at(&self, frame: usize) -> Option<&State> {
        self.states.get(frame)
    }

    pub fn history(&self) -> &[State] {
        &self.states
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames);
        self.frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let max_frame = self.states.len().saturating_sub(1);
        self.frame = (self.frame + frames).min(max_frame);
        self.frame
    }

    pub fn record(&mut self, state: State) -> usize {
        if self.frame + 1 < self.states.len() {
            self.states.truncate(self.frame + 1);
        }
        self.states.push(state);
        self.frame += 1;
        self.frame
    }
}

impl<State: Serialize + DeserializeOwned> TimeMachine<State> {
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }

    pub fn load_json_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let tm: Self = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if tm.states.is_empty() || tm.frame >= tm.states.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "timemachine frame {} out of range for {} states",
                    tm.frame,
                    tm.states.len()
                ),
            ));
        }
        Ok(tm)
    }
}

/// Pure per-frame simulation: the next state is a function of the previous one, the
/// frame's input, and the frame's timing.
pub trait FrameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;
    fn step(&self, state: &Self::State, input: Self::Input, tick: FrameTick) -> Self::State;
}

/// Drives a [`FrameLogic`] without a window, advancing a virtual clock by a fixed
/// frame interval unless a step supplies its own delta.
#[derive(Debug)]
pub struct HeadlessRunner<G: FrameLogic> {
    logic: G,
    timemachine: TimeMachine<G::State>,
    /// Virtual clock reading at each recorded frame, indexed like the history.
    timeline: Vec<Duration>,
    frame_interval: Duration,
    elapsed: Duration,
}

impl<G: FrameLogic> HeadlessRunner<G> {
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

    pub fn new(logic: G) -> Self {
        Self::with_frame_interval(logic, Self::DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_frame_interval(logic: G, frame_interval: Duration) -> Self {
        let initial_state = logic.initial_state();
        Self {
            logic,
            timemachine: TimeMachine::new(initial_state),
            timeline: vec![Duration::ZERO],
            frame_interval,
            elapsed: Duration::ZERO,
        }
    }

    pub fn logic(&self) -> &G {
        &self.logic
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn history(&self) -> &[G::State] {
        self.timemachine.history()
    }

    pub fn timemachine(&self) -> &TimeMachine<G::State> {
        &self.timemachine
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        self.step_with_dt(input, self.frame_interval)
    }

    pub fn step_with_dt(&mut self, input: G::Input, dt: Duration) -> usize {
        self.elapsed = self.elapsed.saturating_add(dt);
        let tick = FrameTick {
            now: self.elapsed,
            dt,
        };
        let next_state = self.logic.step(self.timemachine.state(), input, tick);
        let frame = self.timemachine.record(next_state);
        self.record_elapsed(frame);
        frame
    }

    fn record_elapsed(&mut self, frame: usize) {
        self.timeline.truncate(frame);
        self.timeline.push(self.elapsed);
    }

    fn sync_elapsed(&mut self) {
        if let Some(&at) = self.timeline.get(self.timemachine.frame()) {
            self.elapsed = at;
        }
    }

    pub fn step_profiled<P: profiling::Profiler>(
        &mut self,
        input: G::Input,
        profiler: &mut P,
    ) -> usize {
        let total_start = Instant::now();
        self.elapsed = self.elapsed.saturating_add(self.frame_interval);
        let tick = FrameTick {
            now: self.elapsed,
            dt: self.frame_interval,
        };

        let step_start = Instant::now();
        let next_state = self.logic.step(self.timemachine.state(), input, tick);
        let step_dt = step_start.elapsed();

        let record_start = Instant::now();
        let frame = self.timemachine.record(next_state);
        self.record_elapsed(frame);
        let record_dt = record_start.elapsed();

        profiler.on_step(
            frame,
            profiling::StepTimings {
                step: step_dt,
                record: record_dt,
                total: total_start.elapsed(),
            },
        );
        frame
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last_frame = self.frame();
        for input in inputs {
            last_frame = self.step(input);
        }
        last_frame
    }

    /// Moves the cursor back; the virtual clock follows it, so the next step branches
    /// with the time the rewound frame was recorded at.
    pub fn rewind(&mut self, frames: usize) -> usize {
        let frame = self.timemachine.rewind(frames);
        self.sync_elapsed();
        frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let frame = self.timemachine.forward(frames);
        self.sync_elapsed();
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::{Profiler, StepTimings};

    struct Accumulate;

    impl FrameLogic for Accumulate {
        type State = (i32, Duration);
        type Input = i32;

        fn initial_state(&self) -> Self::State {
            (0, Duration::ZERO)
        }

        fn step(&self, state: &Self::State, input: Self::Input, tick: FrameTick) -> Self::State {
            (state.0 + input, tick.now)
        }
    }

    #[test]
    fn timemachine_rewind_and_branch() {
        let mut tm = TimeMachine::new(0);
        tm.record(1);
        tm.record(2);
        assert_eq!(tm.state(), &2);

        tm.rewind(1);
        assert_eq!(tm.state(), &1);

        tm.record(99);
        assert_eq!(tm.history(), &[0, 1, 99]);
        assert_eq!(tm.frame(), 2);
    }

    #[test]
    fn runner_advances_virtual_clock_per_step() {
        let mut runner =
            HeadlessRunner::with_frame_interval(Accumulate, Duration::from_millis(10));
        runner.run([1, 2, 3]);
        assert_eq!(runner.frame(), 3);
        assert_eq!(runner.state(), &(6, Duration::from_millis(30)));

        runner.step_with_dt(4, Duration::from_millis(100));
        assert_eq!(runner.state(), &(10, Duration::from_millis(130)));

        runner.rewind(2);
        assert_eq!(runner.state().0, 3);
        assert_eq!(runner.elapsed(), Duration::from_millis(20));

        runner.forward(2);
        assert_eq!(runner.elapsed(), Duration::from_millis(130));
    }

    #[test]
    fn branch_after_rewind_resumes_from_rewound_time() {
        let mut runner =
            HeadlessRunner::with_frame_interval(Accumulate, Duration::from_millis(10));
        runner.run([1, 1, 1, 1]);
        runner.rewind(3);
        runner.step(5);
        assert_eq!(runner.state(), &(6, Duration::from_millis(20)));

        // The abandoned future is gone from the clock too.
        runner.forward(5);
        assert_eq!(runner.frame(), 2);
        assert_eq!(runner.elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn runner_step_profiled_calls_profiler_hook() {
        #[derive(Default)]
        struct Capture {
            frames: Vec<usize>,
            timings: Vec<StepTimings>,
        }

        impl Profiler for Capture {
            fn on_step(&mut self, frame: usize, timings: StepTimings) {
                self.frames.push(frame);
                self.timings.push(timings);
            }
        }

        let mut runner = HeadlessRunner::new(Accumulate);
        let mut capture = Capture::default();

        let frame = runner.step_profiled(1, &mut capture);
        assert_eq!(frame, 1);
        assert_eq!(runner.state().0, 1);
        assert_eq!(capture.frames, vec![1]);

        let t = capture.timings[0];
        assert!(t.total >= t.step);
        assert!(t.total >= t.record);
    }
}
