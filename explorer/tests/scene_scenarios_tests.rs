use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use engine::{FrameLogic, FrameTick, HeadlessRunner};

use explorer::input::{DeviceClass, DriveKey, KeySet};
use explorer::orientation::{
    Permission, PermissionError, PermissionGate, PermissionResponse, SensorPlatform, TiltReading,
};
use explorer::registry::Registry;
use explorer::scene::{Explorer, ExplorerLogic, FrameInput};
use explorer::sensor_feed::SensorEvent;
use explorer::settings::ExplorerSettings;
use explorer::triggers::PopupState;

fn logic(device: DeviceClass, requires_permission: bool) -> ExplorerLogic {
    ExplorerLogic::new(
        ExplorerSettings::default(),
        Registry::portfolio(45.0).expect("portfolio registry"),
        device,
        SensorPlatform {
            requires_permission,
        },
    )
}

fn tick(ms: u64) -> FrameTick {
    FrameTick {
        now: Duration::from_millis(ms),
        dt: Duration::from_millis(16),
    }
}

fn forward() -> FrameInput {
    FrameInput::keys(KeySet::from_keys([DriveKey::Forward]))
}

#[test]
fn driving_forward_from_origin_reaches_contact() {
    let mut runner = HeadlessRunner::new(logic(DeviceClass::Desktop, false));
    let mut opened_at = None;
    for _ in 0..600 {
        runner.step(forward());
        if runner.state().triggers.popup_state() != PopupState::Idle {
            opened_at = Some(runner.frame());
            break;
        }
    }

    assert!(opened_at.is_some(), "contact should be reached");
    assert_eq!(runner.state().triggers.popup_state(), PopupState::ContactPopup);
    let z = runner.state().vehicle.position.z;
    assert!(z > 17.0 && z < 23.0, "z = {z}");
    assert!(runner.state().vehicle.position.x.abs() < 1e-4);
}

#[test]
fn open_popup_ignores_controls_and_coasts() {
    let logic = logic(DeviceClass::Desktop, false);
    let mut state = logic.initial_state();
    state.vehicle.position.z = 19.0;
    state.vehicle.velocity.z = 0.1;
    let state = logic.step(&state, FrameInput::default(), tick(0));
    assert_eq!(state.triggers.popup_state(), PopupState::ContactPopup);

    let turn_and_thrust = FrameInput::keys(KeySet::from_keys([DriveKey::Forward, DriveKey::Right]));
    let next = logic.step(&state, turn_and_thrust, tick(16));
    assert_eq!(next.vehicle.heading, state.vehicle.heading);
    assert!(next.vehicle.velocity.z < state.vehicle.velocity.z);
    assert!(next.vehicle.position.z > state.vehicle.position.z);
}

#[test]
fn closed_popup_stays_closed_while_suppressed() {
    let logic = logic(DeviceClass::Desktop, false);
    let mut state = logic.initial_state();
    state.vehicle.position.z = 19.5;

    let state = logic.step(&state, FrameInput::default(), tick(0));
    assert_eq!(state.triggers.popup_state(), PopupState::ContactPopup);

    let state = logic.step(&state, FrameInput::close(), tick(1_000));
    assert_eq!(state.triggers.popup_state(), PopupState::Idle);

    // Parked inside the radius: no reopen at +1000ms.
    let state = logic.step(&state, FrameInput::default(), tick(2_000));
    assert_eq!(state.triggers.popup_state(), PopupState::Idle);

    // Reopens once both cooldowns have lapsed.
    let state = logic.step(&state, FrameInput::default(), tick(6_100));
    assert_eq!(state.triggers.popup_state(), PopupState::ContactPopup);
}

#[test]
fn rotation_recenters_tilt_after_settling() {
    let logic = logic(DeviceClass::Mobile, false);
    let state = logic.initial_state();

    let reading = |beta, gamma, angle| {
        FrameInput::tilt(vec![SensorEvent::new(TiltReading::beta_gamma(beta, gamma), angle)])
    };
    let state = logic.step(&state, reading(40.0, 0.0, 0), tick(0));
    assert!(state.signal.is_neutral());

    // Device turned to landscape while held differently; old reference still applies.
    let state = logic.step(&state, reading(40.0, 15.0, 90), tick(100));
    assert!((state.signal.forward - 0.5).abs() < 1e-6);

    let state = logic.step(&state, FrameInput::default(), tick(400));
    assert!(!state.signal.is_neutral());

    let state = logic.step(&state, FrameInput::default(), tick(700));
    assert!(state.signal.is_neutral());
    assert!(!state.orientation.has_pending_recalibration());
}

struct ScriptedGate {
    answers: Vec<Result<PermissionResponse, PermissionError>>,
}

impl PermissionGate for ScriptedGate {
    fn request(&mut self) -> Result<PermissionResponse, PermissionError> {
        if self.answers.is_empty() {
            return Err(PermissionError::NotUserGesture);
        }
        self.answers.remove(0)
    }
}

#[test]
fn permission_outcomes_reach_watchers() {
    let mut explorer = Explorer::new(logic(DeviceClass::Mobile, true));
    assert_eq!(explorer.output().permission, Permission::NotRequested);

    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = Rc::clone(&seen);
        explorer.subscribe_permission(move |granted| seen.borrow_mut().push(granted));
    }

    let mut gate = ScriptedGate {
        answers: vec![
            Ok(PermissionResponse::Denied),
            Ok(PermissionResponse::Granted),
        ],
    };
    assert!(!explorer.request_permission(&mut gate));
    assert_eq!(explorer.output().permission, Permission::Denied);

    let tx = explorer.attach_sensor_feed();
    tx.try_send(SensorEvent::new(TiltReading::beta_gamma(10.0, 0.0), 0));
    assert!(!explorer.frame(tick(16)).calibrated);

    // A new gesture may ask again.
    assert!(explorer.request_permission(&mut gate));
    tx.try_send(SensorEvent::new(TiltReading::beta_gamma(10.0, 0.0), 0));
    let out = explorer.frame(tick(32));
    assert!(out.calibrated);
    assert_eq!(out.permission, Permission::Granted);

    // Already listening: no prompt, no repeat notification.
    assert!(explorer.request_permission(&mut gate));
    assert_eq!(&*seen.borrow(), &[false, true]);
}

#[test]
fn repeated_requests_without_consent_step_stay_silent() {
    let mut explorer = Explorer::new(logic(DeviceClass::Mobile, false));
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = Rc::clone(&seen);
        explorer.subscribe_permission(move |granted| seen.borrow_mut().push(granted));
    }

    let mut gate = ScriptedGate { answers: vec![] };
    for _ in 0..3 {
        assert!(explorer.request_permission(&mut gate));
    }
    assert!(seen.borrow().is_empty());
    assert_eq!(explorer.output().permission, Permission::NotRequired);
}

#[test]
fn focus_loss_releases_held_keys() {
    let mut explorer = Explorer::new(logic(DeviceClass::Desktop, false));
    explorer.set_keys(KeySet::from_keys([DriveKey::Forward]));
    let out = explorer.frame(tick(16));
    assert_eq!(out.signal.forward, 1.0);

    explorer.release_keys();
    let out = explorer.frame(tick(32));
    assert!(out.signal.is_neutral());
}
