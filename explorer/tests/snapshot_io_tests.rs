use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use engine::{FrameLogic, FrameTick, HeadlessRunner, TimeMachine};

use explorer::input::{DeviceClass, DriveKey, KeySet};
use explorer::orientation::SensorPlatform;
use explorer::registry::Registry;
use explorer::scene::{ExplorerLogic, FrameInput, SceneSnapshot};
use explorer::settings::ExplorerSettings;

const INTERVAL: Duration = Duration::from_millis(20);

fn unique_temp_json_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("explorer_test_{tag}_{nanos}.json"))
}

fn logic() -> ExplorerLogic {
    ExplorerLogic::new(
        ExplorerSettings::default(),
        Registry::portfolio(45.0).expect("portfolio registry"),
        DeviceClass::Desktop,
        SensorPlatform {
            requires_permission: false,
        },
    )
}

fn scripted_input(frame: usize) -> FrameInput {
    let keys = if frame % 40 < 25 {
        vec![DriveKey::Forward]
    } else {
        vec![DriveKey::Forward, DriveKey::Left]
    };
    FrameInput::keys(KeySet::from_keys(keys))
}

#[test]
fn recorded_run_round_trips_through_json() {
    let mut runner = HeadlessRunner::with_frame_interval(logic(), INTERVAL);
    runner.run((0..120).map(scripted_input));

    let out = unique_temp_json_path("recording");
    runner.timemachine().save_json_file(&out).expect("save recording");
    let loaded = TimeMachine::<SceneSnapshot>::load_json_file(&out).expect("load recording");

    assert_eq!(loaded.frame(), runner.frame());
    assert_eq!(loaded.history(), runner.history());

    let _ = fs::remove_file(out);
}

#[test]
fn loaded_snapshot_replays_deterministically() {
    let logic = logic();
    let mut runner = HeadlessRunner::with_frame_interval(logic.clone(), INTERVAL);
    runner.run((0..30).map(scripted_input));

    let text = serde_json::to_string(runner.timemachine()).expect("serialize");
    let loaded: TimeMachine<SceneSnapshot> = serde_json::from_str(&text).expect("deserialize");

    let from = loaded.state_at(10).expect("frame 10");
    let tick = FrameTick {
        now: INTERVAL * 11,
        dt: INTERVAL,
    };
    // Frame 11 was produced by input index 10.
    let replayed = logic.step(from, scripted_input(10), tick);
    assert_eq!(Some(&replayed), runner.timemachine().state_at(11));
}

#[test]
fn snapshot_json_stores_clock_readings_in_microseconds() {
    let logic = logic();
    let state = logic.step(&logic.initial_state(), FrameInput::default(), FrameTick {
        now: Duration::from_millis(40),
        dt: INTERVAL,
    });
    let value = serde_json::to_value(&state).expect("serialize snapshot");
    assert_eq!(value["elapsed"], 40_000);
    assert_eq!(value["triggers"]["state"]["last_check"], 40_000);
    assert_eq!(value["orientation"]["state"]["permission"], "not_required");
}

#[test]
fn default_interval_recording_replays_exactly_after_reload() {
    let logic = logic();
    let mut runner = HeadlessRunner::new(logic.clone());
    // Long enough to reach the contact point and hold its popup deadline.
    runner.run((0..300).map(|_| FrameInput::keys(KeySet::from_keys([DriveKey::Forward]))));

    let text = serde_json::to_string(runner.timemachine()).expect("serialize");
    let loaded: TimeMachine<SceneSnapshot> = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(loaded.history(), runner.history());

    let interval = HeadlessRunner::<ExplorerLogic>::DEFAULT_FRAME_INTERVAL;
    for frame in 1..loaded.history().len() {
        let from = loaded.state_at(frame - 1).expect("previous frame");
        let tick = FrameTick {
            now: interval * frame as u32,
            dt: interval,
        };
        let replayed =
            logic.step(from, FrameInput::keys(KeySet::from_keys([DriveKey::Forward])), tick);
        assert_eq!(Some(&replayed), loaded.state_at(frame), "frame {frame}");
    }
}
