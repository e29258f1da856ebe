//! Device tilt to relative control signal.
//!
//! The service owns the whole calibration lifecycle: permission handshake, listener
//! attachment, reference capture, screen-rotation remapping and the delayed recalibration
//! after a rotation. It holds no timers; deadlines are checked whenever a reading arrives
//! or the frame loop calls [`OrientationService::poll`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One sensor event, angles in degrees. Platforms report `None` for axes they cannot
/// measure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TiltReading {
    pub alpha: Option<f32>,
    pub beta: Option<f32>,
    pub gamma: Option<f32>,
}

impl TiltReading {
    pub fn new(alpha: Option<f32>, beta: Option<f32>, gamma: Option<f32>) -> Self {
        Self { alpha, beta, gamma }
    }

    pub fn beta_gamma(beta: f32, gamma: f32) -> Self {
        Self {
            alpha: None,
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    fn valid(self) -> Option<RawReading> {
        let beta = self.beta.filter(|v| v.is_finite())?;
        let gamma = self.gamma.filter(|v| v.is_finite())?;
        Some(RawReading {
            beta,
            gamma,
            alpha: self.alpha.filter(|v| v.is_finite()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub beta: f32,
    pub gamma: f32,
    pub alpha: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceReading {
    pub beta: f32,
    pub gamma: f32,
}

impl From<RawReading> for ReferenceReading {
    fn from(raw: RawReading) -> Self {
        Self {
            beta: raw.beta,
            gamma: raw.gamma,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenRotation {
    Portrait,
    LandscapeLeft,
    PortraitUpsideDown,
    LandscapeRight,
}

impl ScreenRotation {
    /// Accepts both `screen.orientation.angle` style (0..270) and legacy signed angles
    /// (-90..180), snapping to the nearest quarter turn.
    pub fn from_angle(angle: i32) -> Self {
        let snapped = (angle.rem_euclid(360) + 45) / 90 % 4;
        match snapped {
            1 => ScreenRotation::LandscapeLeft,
            2 => ScreenRotation::PortraitUpsideDown,
            3 => ScreenRotation::LandscapeRight,
            _ => ScreenRotation::Portrait,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            ScreenRotation::Portrait => 0,
            ScreenRotation::LandscapeLeft => 90,
            ScreenRotation::PortraitUpsideDown => 180,
            ScreenRotation::LandscapeRight => 270,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    NotRequired,
    NotRequested,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    Granted,
    Denied,
}

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("permission prompt failed: {0}")]
    Prompt(String),
    #[error("permission must be requested from a user gesture")]
    NotUserGesture,
}

/// Platform consent prompt for motion sensors.
pub trait PermissionGate {
    fn request(&mut self) -> Result<PermissionResponse, PermissionError>;
}

/// Whether sensor access sits behind an explicit consent prompt on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPlatform {
    pub requires_permission: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    #[serde(with = "crate::serde_duration")]
    pub settle_delay: Duration,
    pub forward_divisor: f32,
    pub side_divisor: f32,
    pub channel_capacity: usize,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            forward_divisor: 30.0,
            side_divisor: 50.0,
            channel_capacity: 64,
        }
    }
}

impl OrientationConfig {
    pub fn sanitized(mut self) -> Self {
        self.settle_delay = self.settle_delay.min(Duration::from_secs(5));
        self.forward_divisor = sanitize_divisor(self.forward_divisor, 30.0);
        self.side_divisor = sanitize_divisor(self.side_divisor, 50.0);
        self.channel_capacity = self.channel_capacity.clamp(1, 4096);
        self
    }
}

fn sanitize_divisor(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v.clamp(1.0, 180.0) } else { fallback }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TiltSignal {
    pub tilt_forward: f32,
    pub tilt_side: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub raw: Option<RawReading>,
    pub reference: Option<ReferenceReading>,
    pub screen_rotation: Option<ScreenRotation>,
    pub calibrated: bool,
    pub permission: Permission,
    pub listening: bool,
    #[serde(with = "crate::serde_duration::micros::option")]
    pub pending_recalibration_at: Option<Duration>,
}

impl CalibrationState {
    fn new(platform: SensorPlatform) -> Self {
        Self {
            raw: None,
            reference: None,
            screen_rotation: None,
            calibrated: false,
            permission: if platform.requires_permission {
                Permission::NotRequested
            } else {
                Permission::NotRequired
            },
            listening: false,
            pending_recalibration_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationService {
    config: OrientationConfig,
    state: CalibrationState,
}

impl Default for OrientationService {
    fn default() -> Self {
        Self::new(
            OrientationConfig::default(),
            SensorPlatform {
                requires_permission: false,
            },
        )
    }
}

impl OrientationService {
    pub fn new(config: OrientationConfig, platform: SensorPlatform) -> Self {
        Self {
            config: config.sanitized(),
            state: CalibrationState::new(platform),
        }
    }

    pub fn config(&self) -> &OrientationConfig {
        &self.config
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn permission(&self) -> Permission {
        self.state.permission
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.calibrated
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening
    }

    pub fn has_pending_recalibration(&self) -> bool {
        self.state.pending_recalibration_at.is_some()
    }

    /// Attaches the listener when no consent is needed (or it was already granted).
    pub fn start(&mut self) -> bool {
        if matches!(
            self.state.permission,
            Permission::NotRequired | Permission::Granted
        ) && !self.state.listening
        {
            self.state.listening = true;
            tracing::debug!(permission = ?self.state.permission, "orientation listener attached");
        }
        self.state.listening
    }

    /// Detaches the listener and forgets all calibration; nothing stays scheduled.
    pub fn stop(&mut self) {
        let permission = self.state.permission;
        self.state = CalibrationState {
            permission,
            ..CalibrationState::new(SensorPlatform {
                requires_permission: true,
            })
        };
        tracing::debug!("orientation listener detached");
    }

    /// Runs the platform handshake. Must be driven by a user gesture on platforms that
    /// gate sensors; a failing prompt counts as a denial.
    pub fn request_permission<G: PermissionGate + ?Sized>(&mut self, gate: &mut G) -> bool {
        if self.state.listening {
            return true;
        }
        if self.state.permission == Permission::NotRequired {
            return self.start();
        }

        match gate.request() {
            Ok(PermissionResponse::Granted) => {
                self.state.permission = Permission::Granted;
                self.start()
            }
            Ok(PermissionResponse::Denied) => {
                tracing::warn!("orientation permission denied");
                self.state.permission = Permission::Denied;
                false
            }
            Err(err) => {
                tracing::warn!("orientation permission request failed: {err}");
                self.state.permission = Permission::Denied;
                false
            }
        }
    }

    pub fn handle_reading(&mut self, reading: TiltReading, screen_angle: i32, now: Duration) {
        if !self.state.listening {
            return;
        }
        let Some(raw) = reading.valid() else {
            tracing::trace!(?reading, "ignoring incomplete tilt reading");
            return;
        };

        // A settle deadline that passed before this reading commits the reading that was
        // current at the deadline.
        self.poll(now);
        self.state.raw = Some(raw);

        let rotation = ScreenRotation::from_angle(screen_angle);
        if let Some(last) = self.state.screen_rotation {
            if last != rotation {
                self.state.pending_recalibration_at = Some(now + self.config.settle_delay);
                tracing::debug!(
                    from = last.degrees(),
                    to = rotation.degrees(),
                    "screen rotated; recalibration scheduled"
                );
            }
        }
        self.state.screen_rotation = Some(rotation);

        if !self.state.calibrated {
            self.state.reference = Some(raw.into());
            self.state.calibrated = true;
            tracing::debug!(beta = raw.beta, gamma = raw.gamma, "orientation calibrated");
        }
    }

    /// Commits a due post-rotation recalibration. Returns whether one was committed.
    pub fn poll(&mut self, now: Duration) -> bool {
        let Some(deadline) = self.state.pending_recalibration_at else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.state.pending_recalibration_at = None;
        let Some(raw) = self.state.raw else {
            return false;
        };
        self.state.reference = Some(raw.into());
        tracing::debug!(
            beta = raw.beta,
            gamma = raw.gamma,
            "recalibrated after screen rotation"
        );
        true
    }

    /// Makes the latest reading the neutral pose immediately.
    pub fn recalibrate(&mut self) -> bool {
        let Some(raw) = self.state.raw else {
            return false;
        };
        self.state.reference = Some(raw.into());
        self.state.pending_recalibration_at = None;
        tracing::debug!(beta = raw.beta, gamma = raw.gamma, "recalibrated by user");
        true
    }

    pub fn calibrated_orientation(&self) -> TiltSignal {
        let (Some(raw), Some(reference)) = (self.state.raw, self.state.reference) else {
            return TiltSignal::default();
        };
        if !self.state.calibrated {
            return TiltSignal::default();
        }

        let mut delta_beta = raw.beta - reference.beta;
        let delta_gamma = raw.gamma - reference.gamma;
        if delta_beta > 90.0 {
            delta_beta = 180.0 - delta_beta;
        }
        if delta_beta < -90.0 {
            delta_beta = -180.0 - delta_beta;
        }

        let fwd = self.config.forward_divisor;
        let side = self.config.side_divisor;
        let ratio = |v: f32, divisor: f32| (v / divisor).clamp(-1.0, 1.0);

        let rotation = self.state.screen_rotation.unwrap_or(ScreenRotation::Portrait);
        let (tilt_forward, tilt_side) = match rotation {
            ScreenRotation::LandscapeLeft => (ratio(delta_gamma, fwd), ratio(delta_beta, side)),
            ScreenRotation::LandscapeRight => {
                (ratio(-delta_gamma, fwd), ratio(-delta_beta, side))
            }
            ScreenRotation::Portrait | ScreenRotation::PortraitUpsideDown => {
                (ratio(-delta_beta, fwd), ratio(delta_gamma, side))
            }
        };
        TiltSignal {
            tilt_forward,
            tilt_side,
        }
    }
}

/// Observers of permission outcomes, e.g. UI affordances.
#[derive(Default)]
pub struct PermissionWatchers {
    next_id: u64,
    watchers: Vec<(u64, Box<dyn FnMut(bool)>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherId(u64);

impl PermissionWatchers {
    pub fn subscribe<F: FnMut(bool) + 'static>(&mut self, watcher: F) -> WatcherId {
        let id = self.next_id;
        self.next_id += 1;
        self.watchers.push((id, Box::new(watcher)));
        WatcherId(id)
    }

    pub fn unsubscribe(&mut self, id: WatcherId) {
        self.watchers.retain(|(wid, _)| *wid != id.0);
    }

    pub fn notify(&mut self, granted: bool) {
        for (_, watcher) in &mut self.watchers {
            watcher(granted);
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}
