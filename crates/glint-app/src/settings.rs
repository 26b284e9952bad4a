use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::preprocess::MAX_STAGES;

pub const MAX_DOWNSCALE: u32 = 8;

/// Sampler filter used when upscaling the channel onto the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeFilter {
    #[default]
    Nearest,
    Linear,
}

impl CompositeFilter {
    pub fn filter_mode(self) -> wgpu::FilterMode {
        match self {
            Self::Nearest => wgpu::FilterMode::Nearest,
            Self::Linear => wgpu::FilterMode::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: [f32; 3],
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: [2.285_664, 3.737_782, -8.859_721],
            pitch: 0.3,
            yaw: -0.34,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub version: u32,
    pub downscale: u32,
    pub composite_filter: CompositeFilter,
    pub max_stages: usize,
    pub move_speed: f32,
    pub turn_speed: f32,
    pub camera: CameraPose,
    pub debounce_ms: u64,
    pub prune_unreferenced: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            downscale: 1,
            composite_filter: CompositeFilter::Nearest,
            max_stages: MAX_STAGES,
            move_speed: 0.1,
            turn_speed: 0.02,
            camera: CameraPose::default(),
            debounce_ms: 100,
            prune_unreferenced: false,
        }
    }
}

impl SettingsConfig {
    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("glint").join("settings.json"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Self::default(),
        }
    }

    /// Parse settings, falling back to defaults on malformed JSON and
    /// clamping out-of-range values.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Self>(json) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                log::warn!("Ignoring malformed settings: {e}");
                Self::default()
            }
        }
    }

    pub fn sanitized(mut self) -> Self {
        self.downscale = self.downscale.clamp(1, MAX_DOWNSCALE);
        self.max_stages = self.max_stages.clamp(1, MAX_STAGES);
        self.debounce_ms = self.debounce_ms.max(1);
        self
    }

    pub fn save(&self) {
        let Some(path) = Self::path() else {
            return;
        };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("Failed to save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Failed to serialize settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s = SettingsConfig::from_json(r#"{ "downscale": 3 }"#);
        assert_eq!(s.downscale, 3);
        assert_eq!(s.max_stages, 4);
        assert_eq!(s.composite_filter, CompositeFilter::Nearest);
        assert_eq!(s.camera, CameraPose::default());
        assert!(!s.prune_unreferenced);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let s = SettingsConfig::from_json(r#"{ "downscale": 0, "max_stages": 9 }"#);
        assert_eq!(s.downscale, 1);
        assert_eq!(s.max_stages, 4);
        let s = SettingsConfig::from_json(r#"{ "downscale": 99, "max_stages": 0 }"#);
        assert_eq!(s.downscale, MAX_DOWNSCALE);
        assert_eq!(s.max_stages, 1);
    }

    #[test]
    fn malformed_json_gives_defaults() {
        let s = SettingsConfig::from_json("{ not json");
        assert_eq!(s.downscale, 1);
        assert_eq!(s.debounce_ms, 100);
    }

    #[test]
    fn filter_names_are_lowercase() {
        let s = SettingsConfig::from_json(r#"{ "composite_filter": "linear" }"#);
        assert_eq!(s.composite_filter, CompositeFilter::Linear);
        let json = serde_json::to_string(&SettingsConfig::default()).unwrap();
        assert!(json.contains(r#""composite_filter":"nearest""#));
    }

    #[test]
    fn roundtrip_preserves_camera() {
        let mut s = SettingsConfig::default();
        s.camera.yaw = 1.25;
        let back = SettingsConfig::from_json(&serde_json::to_string(&s).unwrap());
        assert_eq!(back.camera.yaw, 1.25);
    }
}
