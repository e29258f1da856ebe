//! Presentation-side helpers: chase camera, hover bounce and proximity glow.
//!
//! None of this feeds back into the vehicle state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;
use crate::motion::VehicleState;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub distance: f32,
    pub height: f32,
    pub lerp: f32,
    pub look_offset: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 12.0,
            height: 8.0,
            lerp: 0.05,
            look_offset: 1.0,
        }
    }
}

impl CameraConfig {
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !self.distance.is_finite() || self.distance < 0.0 {
            self.distance = d.distance;
        }
        if !self.height.is_finite() {
            self.height = d.height;
        }
        self.lerp = if self.lerp.is_finite() {
            self.lerp.clamp(0.0, 1.0)
        } else {
            d.lerp
        };
        if !self.look_offset.is_finite() {
            self.look_offset = d.look_offset;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowCamera {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl FollowCamera {
    /// Camera placed exactly at its target for `vehicle`.
    pub fn snapped(config: &CameraConfig, vehicle: &VehicleState) -> Self {
        let (position, look_at) = targets(config, vehicle);
        Self { position, look_at }
    }

    pub fn follow(&self, config: &CameraConfig, vehicle: &VehicleState) -> Self {
        let (position, look_at) = targets(config, vehicle);
        Self {
            position: self.position.lerp(position, config.lerp),
            look_at: self.look_at.lerp(look_at, config.lerp),
        }
    }
}

fn targets(config: &CameraConfig, vehicle: &VehicleState) -> (Vec3, Vec3) {
    let p = vehicle.position;
    let h = vehicle.heading;
    let position = Vec3::new(
        p.x - h.sin() * config.distance,
        p.y + config.height,
        p.z - h.cos() * config.distance,
    );
    let look_at = Vec3::new(p.x, p.y + config.look_offset, p.z);
    (position, look_at)
}

/// Drawn height of the shuttle; a gentle hover around `base_y`.
pub fn render_altitude(base_y: f32, elapsed: Duration) -> f32 {
    base_y + (elapsed.as_secs_f32() * 2.0).sin() * 0.1
}

pub const GLOW_RADIUS: f32 = 15.0;

/// `1` on top of a point, fading linearly to `0` at [`GLOW_RADIUS`].
pub fn proximity_glow(vehicle: Vec3, point: Vec3) -> f32 {
    (1.0 - vehicle.horizontal_distance(point) / GLOW_RADIUS).max(0.0)
}
