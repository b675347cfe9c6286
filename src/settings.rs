//! Player preferences and audio configuration
//!
//! Persisted in LocalStorage on the web and as a JSON file natively.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::SAMPLE_RATE;

/// Errors reading or writing a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write settings to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings JSON")]
    Parse(#[from] serde_json::Error),
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Volume ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Tone and sound effect volume (0.0 - 1.0)
    pub effects_volume: f32,
    /// Speech and clip volume (0.0 - 1.0)
    pub speech_volume: f32,
    /// Silence everything without touching the volume levels
    pub muted: bool,

    // === Speech ===
    /// Speaking rate (1.0 = normal)
    pub speech_rate: f32,

    // === Synthesis ===
    /// Output sample rate for generated tones
    pub sample_rate: u32,

    // === Gameplay ===
    /// Spawn RNG seed; random per session when unset
    pub seed: Option<u64>,

    // === Assets and native playback ===
    /// JSON manifest of pre-recorded clips
    pub clip_manifest: Option<PathBuf>,
    /// Directory scanned for clips when no manifest is given
    pub clip_dir: Option<PathBuf>,
    /// Where rendered tone files are cached
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            effects_volume: 1.0,
            speech_volume: 1.0,
            muted: false,

            speech_rate: 1.0,

            sample_rate: SAMPLE_RATE,

            seed: None,

            clip_manifest: None,
            clip_dir: None,
            cache_dir: None,
        }
    }
}

impl Settings {
    /// LocalStorage key
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "lane_sums_settings";

    /// Environment variable naming the native settings file
    pub const ENV_PATH: &'static str = "LANE_SUMS_SETTINGS";

    /// Default native settings file, relative to the working directory
    pub const DEFAULT_PATH: &'static str = "lane-sums.json";

    /// Effective gain for tones and effects
    pub fn effect_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.effects_volume).clamp(0.0, 1.0)
        }
    }

    /// Effective gain for speech and clips
    pub fn speech_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.speech_volume).clamp(0.0, 1.0)
        }
    }

    /// Clamp out-of-range values from hand-edited files
    pub fn sanitized(mut self) -> Self {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.effects_volume = self.effects_volume.clamp(0.0, 1.0);
        self.speech_volume = self.speech_volume.clamp(0.0, 1.0);
        self.speech_rate = self.speech_rate.clamp(0.25, 4.0);
        if self.sample_rate == 0 {
            self.sample_rate = SAMPLE_RATE;
        }
        self
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read settings from a JSON file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Write settings to a JSON file
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Native settings file location
    pub fn default_path() -> PathBuf {
        std::env::var_os(Self::ENV_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_PATH))
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Load settings from the native settings file, falling back to defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to the native settings file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        let path = Self::default_path();
        match self.save_to(&path) {
            Ok(()) => log::info!("Settings saved to {}", path.display()),
            Err(e) => log::warn!("Failed to save settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gains() {
        let settings = Settings {
            master_volume: 0.5,
            effects_volume: 0.5,
            speech_volume: 1.0,
            ..Settings::default()
        };
        assert_eq!(settings.effect_gain(), 0.25);
        assert_eq!(settings.speech_gain(), 0.5);

        let muted = Settings {
            muted: true,
            ..settings
        };
        assert_eq!(muted.effect_gain(), 0.0);
        assert_eq!(muted.speech_gain(), 0.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{"seed": 42, "muted": true}"#).unwrap();
        assert_eq!(settings.seed, Some(42));
        assert!(settings.muted);
        assert_eq!(settings.sample_rate, SAMPLE_RATE);
        assert_eq!(settings.master_volume, 0.8);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let settings =
            Settings::from_json(r#"{"master_volume": 3.0, "speech_rate": 0.0, "sample_rate": 0}"#)
                .unwrap();
        assert_eq!(settings.master_volume, 1.0);
        assert_eq!(settings.speech_rate, 0.25);
        assert_eq!(settings.sample_rate, SAMPLE_RATE);
    }

    #[test]
    fn test_corrupt_json() {
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            seed: Some(7),
            cache_dir: Some(dir.path().join("tones")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Settings::load_from(&dir.path().join("absent.json")),
            Err(SettingsError::Read { .. })
        ));
    }
}
