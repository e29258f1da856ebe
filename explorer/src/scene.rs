//! Per-frame composition of input, motion, triggers and calibration.
//!
//! [`ExplorerLogic`] is the pure step over a [`SceneSnapshot`], usable from the engine's
//! headless runner. [`Explorer`] wraps it with the parts that cannot live in a snapshot:
//! the sensor feed receiver, held keys and permission watchers.

use std::time::Duration;

use engine::{FrameLogic, FrameTick};
use serde::{Deserialize, Serialize};

use crate::camera::{self, CameraConfig, FollowCamera};
use crate::input::{self, ControlScheme, ControlSignal, DeviceClass, InputAggregator, KeySet};
use crate::motion::{MotionIntegrator, VehicleState};
use crate::orientation::{
    OrientationService, Permission, PermissionGate, PermissionWatchers, SensorPlatform, WatcherId,
};
use crate::registry::{PointOfInterest, Registry};
use crate::sensor_feed::{self, SensorEvent, SensorReceiver, SensorSender};
use crate::settings::ExplorerSettings;
use crate::triggers::{ActivePopup, PopupState, TriggerManager};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub vehicle: VehicleState,
    pub triggers: TriggerManager,
    pub orientation: OrientationService,
    pub camera: FollowCamera,
    /// Signal that produced `vehicle`.
    pub signal: ControlSignal,
    #[serde(with = "crate::serde_duration::micros")]
    pub elapsed: Duration,
}

/// Everything one frame consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub keys: KeySet,
    pub sensor_events: Vec<SensorEvent>,
    pub close_popup: bool,
    pub recalibrate: bool,
}

impl FrameInput {
    pub fn keys(keys: KeySet) -> Self {
        Self {
            keys,
            ..Self::default()
        }
    }

    pub fn tilt(events: Vec<SensorEvent>) -> Self {
        Self {
            sensor_events: events,
            ..Self::default()
        }
    }

    pub fn close() -> Self {
        Self {
            close_popup: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointGlow {
    pub identity: String,
    pub glow: f32,
}

/// What the presentation layer renders after a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub vehicle: VehicleState,
    pub popup: PopupState,
    pub active_point: Option<PointOfInterest>,
    pub navigation_disabled: bool,
    pub glow: Vec<PointGlow>,
    pub camera: FollowCamera,
    pub render_altitude: f32,
    pub signal: ControlSignal,
    pub permission: Permission,
    pub calibrated: bool,
}

#[derive(Debug, Clone)]
pub struct ExplorerLogic {
    registry: Registry,
    integrator: MotionIntegrator,
    scheme: ControlScheme,
    settings: ExplorerSettings,
    platform: SensorPlatform,
}

impl ExplorerLogic {
    pub fn new(
        settings: ExplorerSettings,
        registry: Registry,
        device: DeviceClass,
        platform: SensorPlatform,
    ) -> Self {
        let settings = settings.sanitized();
        Self {
            registry,
            integrator: MotionIntegrator::new(settings.motion),
            scheme: ControlScheme::for_device(device),
            settings,
            platform,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scheme(&self) -> ControlScheme {
        self.scheme
    }

    pub fn settings(&self) -> &ExplorerSettings {
        &self.settings
    }

    pub fn camera_config(&self) -> &CameraConfig {
        &self.settings.camera
    }

    pub fn output(&self, snapshot: &SceneSnapshot) -> FrameOutput {
        let vehicle = snapshot.vehicle;
        let active_point = snapshot
            .triggers
            .active()
            .and_then(|popup| self.registry.get(&popup.identity))
            .cloned();
        let glow = self
            .registry
            .points()
            .iter()
            .map(|poi| PointGlow {
                identity: poi.identity.clone(),
                glow: camera::proximity_glow(vehicle.position, poi.position),
            })
            .collect();
        FrameOutput {
            vehicle,
            popup: snapshot.triggers.popup_state(),
            active_point,
            navigation_disabled: snapshot.triggers.navigation_disabled(),
            glow,
            camera: snapshot.camera,
            render_altitude: camera::render_altitude(vehicle.position.y, snapshot.elapsed),
            signal: snapshot.signal,
            permission: snapshot.orientation.permission(),
            calibrated: snapshot.orientation.is_calibrated(),
        }
    }
}

impl FrameLogic for ExplorerLogic {
    type State = SceneSnapshot;
    type Input = FrameInput;

    fn initial_state(&self) -> SceneSnapshot {
        let vehicle = self.integrator.initial_state();
        let mut orientation = OrientationService::new(self.settings.orientation, self.platform);
        if self.scheme == ControlScheme::Mobile {
            orientation.start();
        }
        SceneSnapshot {
            vehicle,
            triggers: TriggerManager::new(self.settings.triggers),
            orientation,
            camera: FollowCamera::snapped(&self.settings.camera, &vehicle),
            signal: ControlSignal::NEUTRAL,
            elapsed: Duration::ZERO,
        }
    }

    fn step(&self, state: &SceneSnapshot, input: FrameInput, tick: FrameTick) -> SceneSnapshot {
        let mut next = state.clone();
        next.elapsed = tick.now;

        if input.close_popup {
            next.triggers.close(tick.now);
        }

        for event in input.sensor_events {
            next.orientation
                .handle_reading(event.reading, event.screen_angle, tick.now);
        }
        next.orientation.poll(tick.now);
        if input.recalibrate {
            next.orientation.recalibrate();
        }

        let signal = input::sample_signal(self.scheme, &input.keys, &next.orientation);
        next.signal = signal;
        next.vehicle = self.integrator.step(
            &state.vehicle,
            signal,
            self.scheme,
            next.triggers.navigation_disabled(),
            tick.dt,
        );

        next.triggers
            .check(next.vehicle.position, &self.registry, tick.now);
        next.camera = state.camera.follow(&self.settings.camera, &next.vehicle);
        next
    }
}

/// Live scene: owns the snapshot and the non-serializable plumbing around it.
pub struct Explorer {
    logic: ExplorerLogic,
    aggregator: InputAggregator,
    state: SceneSnapshot,
    feed: Option<SensorReceiver>,
    watchers: PermissionWatchers,
    close_requested: bool,
    recalibrate_requested: bool,
}

impl Explorer {
    pub fn new(logic: ExplorerLogic) -> Self {
        let state = logic.initial_state();
        tracing::info!(
            scheme = ?logic.scheme(),
            points = logic.registry().len(),
            "explorer ready"
        );
        Self {
            aggregator: InputAggregator::new(logic.scheme()),
            logic,
            state,
            feed: None,
            watchers: PermissionWatchers::default(),
            close_requested: false,
            recalibrate_requested: false,
        }
    }

    pub fn logic(&self) -> &ExplorerLogic {
        &self.logic
    }

    pub fn snapshot(&self) -> &SceneSnapshot {
        &self.state
    }

    pub fn output(&self) -> FrameOutput {
        self.logic.output(&self.state)
    }

    /// Creates the sensor channel; the sender goes to the platform callback.
    pub fn attach_sensor_feed(&mut self) -> SensorSender {
        let capacity = self.logic.settings().orientation.channel_capacity;
        let (tx, rx) = sensor_feed::sensor_channel(capacity);
        self.feed = Some(rx);
        tx
    }

    pub fn set_keys(&mut self, keys: KeySet) {
        self.aggregator.set_keys(keys);
    }

    pub fn release_keys(&mut self) {
        self.aggregator.release_all();
    }

    pub fn watchers_mut(&mut self) -> &mut PermissionWatchers {
        &mut self.watchers
    }

    pub fn subscribe_permission<F: FnMut(bool) + 'static>(&mut self, watcher: F) -> WatcherId {
        self.watchers.subscribe(watcher)
    }

    /// Call from a user gesture. Watchers hear the outcome unless the listener was
    /// already attached, in which case nothing changed.
    pub fn request_permission<G: PermissionGate + ?Sized>(&mut self, gate: &mut G) -> bool {
        if self.state.orientation.is_listening() {
            return true;
        }
        let granted = self.state.orientation.request_permission(gate);
        self.watchers.notify(granted);
        granted
    }

    /// Queues a close for the next frame. Returns whether a popup is open.
    pub fn close_popup(&mut self) -> bool {
        let open = self.state.triggers.active().is_some();
        self.close_requested |= open;
        open
    }

    pub fn recalibrate(&mut self) {
        self.recalibrate_requested = true;
    }

    /// Stops the listener and drops all input; a later frame starts from neutral.
    pub fn detach(&mut self) {
        self.state.orientation.stop();
        self.aggregator.release_all();
        self.feed = None;
        self.close_requested = false;
        self.recalibrate_requested = false;
        tracing::debug!("explorer detached");
    }

    pub fn frame(&mut self, tick: FrameTick) -> FrameOutput {
        let sensor_events = self
            .feed
            .as_mut()
            .map(SensorReceiver::drain)
            .unwrap_or_default();
        let input = FrameInput {
            keys: self.aggregator.keys().clone(),
            sensor_events,
            close_popup: std::mem::take(&mut self.close_requested),
            recalibrate: std::mem::take(&mut self.recalibrate_requested),
        };

        let before = self.state.triggers.active().cloned();
        self.state = self.logic.step(&self.state, input, tick);
        self.log_popup_transition(before, self.state.triggers.active());
        self.output()
    }

    fn log_popup_transition(&self, before: Option<ActivePopup>, after: Option<&ActivePopup>) {
        match (before.as_ref(), after) {
            (None, Some(opened)) => {
                tracing::info!(identity = %opened.identity, kind = ?opened.kind, "reached point of interest");
            }
            (Some(closed), None) => {
                tracing::info!(identity = %closed.identity, "popup dismissed");
            }
            _ => {}
        }
    }
}
