use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::CameraConfig;
use crate::input::DeviceClass;
use crate::motion::MotionConfig;
use crate::orientation::OrientationConfig;
use crate::triggers::TriggerConfig;

pub const SETTINGS_PATH_VAR: &str = "EXPLORER_SETTINGS_PATH";
pub const FORCE_DEVICE_VAR: &str = "EXPLORER_FORCE_DEVICE";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSettings {
    #[serde(default)]
    pub forced: Option<DeviceClass>,
}

impl DeviceSettings {
    /// Env override, then the configured class, then the user agent. Desktop otherwise.
    pub fn resolve(&self, env_override: Option<&str>, user_agent: Option<&str>) -> DeviceClass {
        if let Some(class) = env_override.and_then(DeviceClass::parse) {
            return class;
        }
        if let Some(class) = self.forced {
            return class;
        }
        user_agent
            .map(DeviceClass::from_user_agent)
            .unwrap_or(DeviceClass::Desktop)
    }

    pub fn resolve_from_env(&self, user_agent: Option<&str>) -> DeviceClass {
        let forced = std::env::var(FORCE_DEVICE_VAR).ok();
        self.resolve(forced.as_deref(), user_agent)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplorerSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub orientation: OrientationConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub device: DeviceSettings,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            motion: MotionConfig::default(),
            triggers: TriggerConfig::default(),
            orientation: OrientationConfig::default(),
            camera: CameraConfig::default(),
            device: DeviceSettings::default(),
        }
    }
}

impl ExplorerSettings {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.motion = self.motion.sanitized();
        self.triggers = self.triggers.sanitized();
        self.orientation = self.orientation.sanitized();
        self.camera = self.camera.sanitized();
        self
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os(SETTINGS_PATH_VAR) {
            return Self {
                path: PathBuf::from(explicit),
            };
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("shuttle-explorer");
        path.push("settings.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file is not an error; it yields defaults.
    pub fn try_load(&self) -> Result<ExplorerSettings, SettingsError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(ExplorerSettings::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice::<ExplorerSettings>(&bytes)
            .map(ExplorerSettings::sanitized)
            .map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    pub fn load(&self) -> ExplorerSettings {
        self.try_load().unwrap_or_else(|err| {
            tracing::warn!("{err}; using default settings");
            ExplorerSettings::default()
        })
    }

    pub fn save(&self, settings: &ExplorerSettings) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let text = serde_json::to_string_pretty(settings).map_err(|source| {
            SettingsError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::motion::IntegrationMode;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("explorer-settings-{}-{name}", std::process::id()));
        p.push("settings.json");
        p
    }

    #[test]
    fn serde_defaults_fill_missing_sections() {
        let parsed: ExplorerSettings =
            serde_json::from_str(r#"{"version":1,"motion":{"friction":0.9}}"#)
                .expect("settings JSON should parse");
        assert_eq!(parsed.motion.friction, 0.9);
        assert_eq!(parsed.motion.max_speed, 0.3);
        assert_eq!(parsed.triggers, TriggerConfig::default());
        assert_eq!(parsed.camera, CameraConfig::default());
        assert_eq!(parsed.device.forced, None);
    }

    #[test]
    fn sanitized_clamps_nested_sections() {
        let settings = ExplorerSettings {
            version: 7,
            motion: MotionConfig {
                friction: 2.0,
                ..MotionConfig::default()
            },
            camera: CameraConfig {
                lerp: 4.0,
                ..CameraConfig::default()
            },
            ..ExplorerSettings::default()
        }
        .sanitized();
        assert_eq!(settings.version, 1);
        assert!(settings.motion.friction < 1.0);
        assert_eq!(settings.camera.lerp, 1.0);
    }

    #[test]
    fn device_resolution_order() {
        let configured = DeviceSettings {
            forced: Some(DeviceClass::Mobile),
        };
        let iphone = Some("Mozilla/5.0 (iPhone)");
        assert_eq!(configured.resolve(Some("desktop"), iphone), DeviceClass::Desktop);
        assert_eq!(configured.resolve(Some("bogus"), None), DeviceClass::Mobile);
        assert_eq!(DeviceSettings::default().resolve(None, iphone), DeviceClass::Mobile);
        assert_eq!(DeviceSettings::default().resolve(None, None), DeviceClass::Desktop);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let path = temp_path("roundtrip");
        let store = SettingsStore::new(&path);
        let settings = ExplorerSettings {
            motion: MotionConfig {
                integration: IntegrationMode::DeltaScaled {
                    reference: Duration::from_micros(16_667),
                },
                ..MotionConfig::default()
            },
            device: DeviceSettings {
                forced: Some(DeviceClass::Mobile),
            },
            ..ExplorerSettings::default()
        };
        store.save(&settings).expect("save settings");
        let loaded = store.try_load().expect("load settings");
        assert_eq!(loaded.device, settings.device);
        assert_eq!(loaded.motion.integration, settings.motion.integration);
        let _ = fs::remove_dir_all(path.parent().expect("parent dir"));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().expect("parent dir")).expect("create dir");
        fs::write(&path, "{ not json").expect("write file");
        let store = SettingsStore::new(&path);
        assert!(matches!(store.try_load(), Err(SettingsError::Parse { .. })));
        assert_eq!(store.load(), ExplorerSettings::default());
        let _ = fs::remove_dir_all(path.parent().expect("parent dir"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path("missing"));
        assert_eq!(store.try_load().expect("missing is ok"), ExplorerSettings::default());
    }
}
