//! Proximity popups.
//!
//! At most one popup is open at a time. A closed point is suppressed for a while so the
//! shuttle can leave its trigger radius without the popup flickering back open.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;
use crate::registry::{PoiKind, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub collision_distance: f32,
    #[serde(with = "crate::serde_duration")]
    pub check_interval: Duration,
    #[serde(with = "crate::serde_duration")]
    pub suppression: Duration,
    #[serde(with = "crate::serde_duration")]
    pub retrigger_guard: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            collision_distance: 3.0,
            check_interval: Duration::from_millis(100),
            suppression: Duration::from_millis(5000),
            retrigger_guard: Duration::from_millis(3000),
        }
    }
}

impl TriggerConfig {
    pub fn sanitized(mut self) -> Self {
        if !self.collision_distance.is_finite() || self.collision_distance <= 0.0 {
            self.collision_distance = Self::default().collision_distance;
        }
        self.check_interval = self.check_interval.min(Duration::from_secs(1));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePopup {
    pub identity: String,
    pub kind: PoiKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiring {
    pub identity: String,
    #[serde(with = "crate::serde_duration::micros")]
    pub expires_at: Duration,
}

impl Expiring {
    fn is_live(&self, now: Duration) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerState {
    pub active: Option<ActivePopup>,
    pub last_triggered: Option<Expiring>,
    pub suppressed: Vec<Expiring>,
    #[serde(with = "crate::serde_duration::micros::option")]
    pub last_check: Option<Duration>,
}

/// Which popup the presentation layer should mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupState {
    Idle,
    EmployerPopup(String),
    SocialPopup(String),
    ContactPopup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerManager {
    config: TriggerConfig,
    state: TriggerState,
}

impl Default for TriggerManager {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}

impl TriggerManager {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config: config.sanitized(),
            state: TriggerState::default(),
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActivePopup> {
        self.state.active.as_ref()
    }

    /// Thrust and turn are ignored while any popup is open.
    pub fn navigation_disabled(&self) -> bool {
        self.state.active.is_some()
    }

    pub fn popup_state(&self) -> PopupState {
        match &self.state.active {
            None => PopupState::Idle,
            Some(ActivePopup {
                identity,
                kind: PoiKind::Employer,
            }) => PopupState::EmployerPopup(identity.clone()),
            Some(ActivePopup {
                identity,
                kind: PoiKind::SocialLink,
            }) => PopupState::SocialPopup(identity.clone()),
            Some(ActivePopup {
                kind: PoiKind::Contact,
                ..
            }) => PopupState::ContactPopup,
        }
    }

    pub fn is_suppressed(&self, identity: &str, now: Duration) -> bool {
        self.state
            .suppressed
            .iter()
            .any(|s| s.identity == identity && s.is_live(now))
    }

    fn is_recent(&self, identity: &str, now: Duration) -> bool {
        self.state
            .last_triggered
            .as_ref()
            .is_some_and(|l| l.identity == identity && l.is_live(now))
    }

    fn expire(&mut self, now: Duration) {
        self.state.suppressed.retain(|s| s.is_live(now));
        if self
            .state
            .last_triggered
            .as_ref()
            .is_some_and(|l| !l.is_live(now))
        {
            self.state.last_triggered = None;
        }
    }

    /// Throttled proximity scan. Returns the popup opened by this call, if any.
    pub fn check(
        &mut self,
        position: Vec3,
        registry: &Registry,
        now: Duration,
    ) -> Option<ActivePopup> {
        if let Some(last) = self.state.last_check {
            if now.saturating_sub(last) < self.config.check_interval {
                return None;
            }
        }
        self.state.last_check = Some(now);
        self.expire(now);

        if self.state.active.is_some() {
            return None;
        }

        let threshold = self.config.collision_distance * self.config.collision_distance;
        let hit = registry.points().iter().find(|poi| {
            position.horizontal_distance_sq(poi.position) < threshold
                && !self.is_suppressed(&poi.identity, now)
                && !self.is_recent(&poi.identity, now)
        })?;

        let popup = ActivePopup {
            identity: hit.identity.clone(),
            kind: hit.kind,
        };
        self.state.last_triggered = Some(Expiring {
            identity: hit.identity.clone(),
            expires_at: now + self.config.retrigger_guard,
        });
        self.state.active = Some(popup.clone());
        tracing::debug!(identity = %popup.identity, kind = ?popup.kind, "popup opened");
        Some(popup)
    }

    /// Dismisses the open popup and starts its cooldowns.
    pub fn close(&mut self, now: Duration) -> Option<ActivePopup> {
        let popup = self.state.active.take()?;
        self.state.suppressed.retain(|s| s.identity != popup.identity);
        self.state.suppressed.push(Expiring {
            identity: popup.identity.clone(),
            expires_at: now + self.config.suppression,
        });
        self.state.last_triggered = Some(Expiring {
            identity: popup.identity.clone(),
            expires_at: now + self.config.retrigger_guard,
        });
        tracing::debug!(identity = %popup.identity, "popup closed");
        Some(popup)
    }
}
