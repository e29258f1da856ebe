use std::time::Duration;

use engine::canvas::{Canvas, parse_hex_color};
use engine::clock::FrameClock;
use engine::profiling::SlowFrameLogger;
use engine::surface::{RgbaBufferSurface, SurfaceSize};
use engine::{FrameLogic, FrameTick, HeadlessRunner};

/// Coasting point: velocity decays by friction every frame, thrust adds to it.
struct Coast {
    friction: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Body {
    position: f32,
    velocity: f32,
    now: Duration,
}

impl FrameLogic for Coast {
    type State = Body;
    type Input = f32;

    fn initial_state(&self) -> Body {
        Body {
            position: 0.0,
            velocity: 0.0,
            now: Duration::ZERO,
        }
    }

    fn step(&self, state: &Body, thrust: f32, tick: FrameTick) -> Body {
        let velocity = (state.velocity + thrust) * self.friction;
        Body {
            position: state.position + velocity,
            velocity,
            now: tick.now,
        }
    }
}

#[test]
fn runner_records_every_frame_and_advances_virtual_clock() {
    let mut runner = HeadlessRunner::with_frame_interval(
        Coast { friction: 0.5 },
        Duration::from_millis(10),
    );
    let last = runner.run([1.0, 0.0, 0.0]);

    assert_eq!(last, 3);
    assert_eq!(runner.history().len(), 4);
    assert_eq!(runner.elapsed(), Duration::from_millis(30));
    assert_eq!(runner.state().now, Duration::from_millis(30));
    assert_eq!(runner.state().velocity, 0.125);
    assert_eq!(runner.state().position, 0.875);
}

#[test]
fn rewind_then_step_branches_history() {
    let mut runner = HeadlessRunner::new(Coast { friction: 1.0 });
    runner.run([1.0, 1.0, 1.0]);
    runner.rewind(2);
    assert_eq!(runner.state().velocity, 1.0);

    runner.step(-1.0);
    assert_eq!(runner.frame(), 2);
    assert_eq!(runner.history().len(), 3);
    assert_eq!(runner.state().velocity, 0.0);
    assert_eq!(
        runner.state().now,
        HeadlessRunner::<Coast>::DEFAULT_FRAME_INTERVAL * 2
    );
    assert_eq!(runner.elapsed(), runner.state().now);
}

#[test]
fn custom_dt_steps_feed_the_tick() {
    let mut runner = HeadlessRunner::new(Coast { friction: 1.0 });
    runner.step_with_dt(0.0, Duration::from_millis(100));
    runner.step_with_dt(0.0, Duration::from_millis(5));
    assert_eq!(runner.state().now, Duration::from_millis(105));
}

#[test]
fn profiled_steps_stay_within_generous_budget() {
    let mut runner = HeadlessRunner::new(Coast { friction: 0.9 });
    let mut logger = SlowFrameLogger::new(Duration::from_secs(1));
    for _ in 0..10 {
        runner.step_profiled(1.0, &mut logger);
    }
    assert_eq!(runner.frame(), 10);
    assert_eq!(logger.slow_frames, 0);
}

#[test]
fn frame_clock_caps_stalls() {
    let start = std::time::Instant::now();
    let mut clock = FrameClock::start(start);
    let tick = clock.tick(start + Duration::from_secs(3));
    assert_eq!(tick.dt, FrameClock::DEFAULT_MAX_DT);
    assert_eq!(tick.now, Duration::from_secs(3));
}

#[test]
fn canvas_draws_into_buffer_surface() {
    let size = SurfaceSize::new(16, 8);
    let mut surface = RgbaBufferSurface::new(size);
    let teal = parse_hex_color("#1abc9c").expect("valid color");
    {
        let mut canvas = Canvas::new(surface.frame_mut(), size);
        canvas.clear([0, 0, 0, 255]);
        canvas.fill_rect(14, 6, 10, 10, teal);
    }
    assert_eq!(surface.pixel(15, 7), Some(teal));
    assert_eq!(surface.pixel(13, 7), Some([0, 0, 0, 255]));
    assert_eq!(surface.pixel(16, 7), None);
}
