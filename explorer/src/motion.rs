use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::{PlanarVelocity, Vec3};
use crate::input::{ControlScheme, ControlSignal};

pub const DEFAULT_ALTITUDE: f32 = 2.0;

/// Per-scheme thrust and turn tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub acceleration: f32,
    pub rotation_speed: f32,
    /// Axis magnitudes at or below this are treated as zero.
    pub deadzone: f32,
}

impl MotionProfile {
    pub const DESKTOP: MotionProfile = MotionProfile {
        acceleration: 0.015,
        rotation_speed: 0.04,
        deadzone: 0.0,
    };

    // Tilt covers a shallower usable range than a held key.
    pub const MOBILE: MotionProfile = MotionProfile {
        acceleration: 0.025,
        rotation_speed: 0.06,
        deadzone: 0.05,
    };

    fn sanitized(self, fallback: MotionProfile) -> Self {
        let finite_or = |v: f32, f: f32| if v.is_finite() { v } else { f };
        Self {
            acceleration: finite_or(self.acceleration, fallback.acceleration).clamp(0.0, 1.0),
            rotation_speed: finite_or(self.rotation_speed, fallback.rotation_speed)
                .clamp(0.0, 1.0),
            deadzone: finite_or(self.deadzone, fallback.deadzone).clamp(0.0, 0.5),
        }
    }
}

/// How a frame's wall-clock delta feeds the integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IntegrationMode {
    /// One step per frame callback regardless of its duration. Constants are tuned for
    /// roughly 60 callbacks per second.
    FrameCoupled,
    /// Constants are scaled by `dt / reference`. Stored as `reference_us`.
    DeltaScaled {
        #[serde(rename = "reference_us", with = "crate::serde_duration::micros")]
        reference: Duration,
    },
}

impl IntegrationMode {
    fn step_scale(self, dt: Duration) -> f32 {
        match self {
            IntegrationMode::FrameCoupled => 1.0,
            IntegrationMode::DeltaScaled { reference } => {
                if reference.is_zero() {
                    1.0
                } else {
                    (dt.as_secs_f32() / reference.as_secs_f32()).min(15.0)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub desktop: MotionProfile,
    pub mobile: MotionProfile,
    pub friction: f32,
    pub max_speed: f32,
    pub boundary: f32,
    pub altitude: f32,
    pub integration: IntegrationMode,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            desktop: MotionProfile::DESKTOP,
            mobile: MotionProfile::MOBILE,
            friction: 0.92,
            max_speed: 0.3,
            boundary: 45.0,
            altitude: DEFAULT_ALTITUDE,
            integration: IntegrationMode::FrameCoupled,
        }
    }
}

impl MotionConfig {
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.desktop = self.desktop.sanitized(defaults.desktop);
        self.mobile = self.mobile.sanitized(defaults.mobile);
        // Friction must stay strictly below one for the vehicle to coast to rest.
        self.friction = if self.friction.is_finite() {
            self.friction.clamp(0.0, 0.999)
        } else {
            defaults.friction
        };
        self.max_speed = if self.max_speed.is_finite() && self.max_speed > 0.0 {
            self.max_speed.min(10.0)
        } else {
            defaults.max_speed
        };
        self.boundary = if self.boundary.is_finite() && self.boundary > 0.0 {
            self.boundary
        } else {
            defaults.boundary
        };
        if !self.altitude.is_finite() {
            self.altitude = defaults.altitude;
        }
        self
    }

    pub fn profile(&self, scheme: ControlScheme) -> MotionProfile {
        match scheme {
            ControlScheme::Desktop => self.desktop,
            ControlScheme::Mobile => self.mobile,
        }
    }
}

/// Authoritative pose, replaced wholesale every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    /// Radians, accumulated without wrapping.
    pub heading: f32,
    pub velocity: PlanarVelocity,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::at_rest(Vec3::new(0.0, DEFAULT_ALTITUDE, 0.0), 0.0)
    }
}

impl VehicleState {
    pub fn at_rest(position: Vec3, heading: f32) -> Self {
        Self {
            position,
            heading,
            velocity: PlanarVelocity::ZERO,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.speed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionIntegrator {
    config: MotionConfig,
}

impl Default for MotionIntegrator {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl MotionIntegrator {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn initial_state(&self) -> VehicleState {
        VehicleState::at_rest(Vec3::new(0.0, self.config.altitude, 0.0), 0.0)
    }

    /// Advances the vehicle by one frame.
    ///
    /// With `navigation_disabled` no thrust or turn is applied but friction, clamping and
    /// integration still run, so the vehicle drifts to a stop.
    pub fn step(
        &self,
        prev: &VehicleState,
        signal: ControlSignal,
        scheme: ControlScheme,
        navigation_disabled: bool,
        dt: Duration,
    ) -> VehicleState {
        let cfg = &self.config;
        let k = cfg.integration.step_scale(dt);
        let mut heading = prev.heading;
        let mut velocity = prev.velocity;

        if !navigation_disabled {
            let profile = cfg.profile(scheme);
            let forward = apply_deadzone(signal.forward, profile.deadzone);
            let side = apply_deadzone(signal.side, profile.deadzone);

            heading -= side * profile.rotation_speed * k;
            let thrust = forward * profile.acceleration * k;
            velocity.x += heading.sin() * thrust;
            velocity.z += heading.cos() * thrust;
        }

        velocity = velocity.scaled(cfg.friction.powf(k));

        let speed = velocity.speed();
        if speed > cfg.max_speed {
            velocity = velocity.scaled(cfg.max_speed / speed);
        }

        // Velocity is kept as-is when the position is pinned at the boundary.
        let b = cfg.boundary;
        let position = Vec3 {
            x: (prev.position.x + velocity.x * k).clamp(-b, b),
            y: cfg.altitude,
            z: (prev.position.z + velocity.z * k).clamp(-b, b),
        };

        VehicleState {
            position,
            heading,
            velocity,
        }
    }
}

fn apply_deadzone(v: f32, deadzone: f32) -> f32 {
    if v.abs() <= deadzone { 0.0 } else { v }
}
