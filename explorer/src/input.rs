//! Per-frame control signal from either the keyboard or the tilt sensor.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use winit::event::VirtualKeyCode;

use crate::orientation::OrientationService;

/// Desired thrust and turn, each in `[-1, 1]`.
///
/// `side > 0` steers right, matching a device tilted to the right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlSignal {
    pub forward: f32,
    pub side: f32,
}

impl ControlSignal {
    pub const NEUTRAL: ControlSignal = ControlSignal {
        forward: 0.0,
        side: 0.0,
    };

    /// Clamps both axes, mapping non-finite values to zero.
    pub fn new(forward: f32, side: f32) -> Self {
        Self {
            forward: sanitize_axis(forward),
            side: sanitize_axis(side),
        }
    }

    pub fn is_neutral(self) -> bool {
        self.forward == 0.0 && self.side == 0.0
    }
}

fn sanitize_axis(v: f32) -> f32 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlScheme {
    Desktop,
    Mobile,
}

impl ControlScheme {
    pub fn for_device(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Desktop => ControlScheme::Desktop,
            DeviceClass::Mobile => ControlScheme::Mobile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    const MOBILE_TOKENS: [&'static str; 8] = [
        "android",
        "webos",
        "iphone",
        "ipad",
        "ipod",
        "blackberry",
        "iemobile",
        "opera mini",
    ];

    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if Self::MOBILE_TOKENS.iter().any(|token| ua.contains(token)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(DeviceClass::Desktop),
            "mobile" => Some(DeviceClass::Mobile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveKey {
    Forward,
    Backward,
    Left,
    Right,
}

pub fn map_key_to_drive(key: VirtualKeyCode) -> Option<DriveKey> {
    match key {
        VirtualKeyCode::Up | VirtualKeyCode::W => Some(DriveKey::Forward),
        VirtualKeyCode::Down | VirtualKeyCode::S => Some(DriveKey::Backward),
        VirtualKeyCode::Left | VirtualKeyCode::A => Some(DriveKey::Left),
        VirtualKeyCode::Right | VirtualKeyCode::D => Some(DriveKey::Right),
        _ => None,
    }
}

/// Drive keys currently held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    held: HashSet<DriveKey>,
}

impl KeySet {
    pub fn from_keys<I: IntoIterator<Item = DriveKey>>(keys: I) -> Self {
        Self {
            held: keys.into_iter().collect(),
        }
    }

    /// Keeps only recognized keys from a raw key-down set.
    pub fn from_virtual_keys<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a VirtualKeyCode>,
    {
        Self::from_keys(keys.into_iter().filter_map(|&k| map_key_to_drive(k)))
    }

    pub fn press(&mut self, key: DriveKey) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: DriveKey) {
        self.held.remove(&key);
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: DriveKey) -> bool {
        self.held.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn signal(&self) -> ControlSignal {
        let axis = |pos: DriveKey, neg: DriveKey| match (self.is_held(pos), self.is_held(neg)) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        ControlSignal::new(
            axis(DriveKey::Forward, DriveKey::Backward),
            axis(DriveKey::Right, DriveKey::Left),
        )
    }
}

/// Picks one channel at startup and samples it once per frame.
#[derive(Debug, Clone)]
pub struct InputAggregator {
    scheme: ControlScheme,
    keys: KeySet,
}

impl InputAggregator {
    pub fn new(scheme: ControlScheme) -> Self {
        Self {
            scheme,
            keys: KeySet::default(),
        }
    }

    pub fn scheme(&self) -> ControlScheme {
        self.scheme
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn set_keys(&mut self, keys: KeySet) {
        self.keys = keys;
    }

    /// Forgets held keys; used on focus loss and detach.
    pub fn release_all(&mut self) {
        self.keys.clear();
    }

    pub fn sample(&self, orientation: &OrientationService) -> ControlSignal {
        sample_signal(self.scheme, &self.keys, orientation)
    }
}

/// The active channel's signal for one frame; the other channel is ignored.
pub fn sample_signal(
    scheme: ControlScheme,
    keys: &KeySet,
    orientation: &OrientationService,
) -> ControlSignal {
    match scheme {
        ControlScheme::Desktop => keys.signal(),
        ControlScheme::Mobile => {
            let tilt = orientation.calibrated_orientation();
            ControlSignal::new(tilt.tilt_forward, tilt.tilt_side)
        }
    }
}
