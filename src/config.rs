use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::FfmpegConfig;
use crate::playback::DEFAULT_FRAME_OVERHEAD_MS;

/// Name of the configuration file looked up by [`AppConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "cascii-play.json";

/// Playback size and rate preset
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

fn default_overhead_ms() -> u64 {
    DEFAULT_FRAME_OVERHEAD_MS
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffplay() -> String {
    "ffplay".to_string()
}

/// Application configuration with presets and external tool names
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub presets: HashMap<String, Preset>,
    pub default_preset: String,
    #[serde(default = "default_overhead_ms")]
    pub frame_overhead_ms: u64,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffplay")]
    pub ffplay: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let default_json = r#"{
            "presets": {
                "default": {"width": 480, "height": 360, "fps": 30},
                "small":   {"width": 160, "height": 120, "fps": 24},
                "large":   {"width": 640, "height": 480, "fps": 30}
            },
            "default_preset": "default"
        }"#;
        serde_json::from_str(default_json).expect("built-in config is valid json")
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config json {}", path.display()))?;
        config.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Look for the config in the app data dir, then the current dir, and
    /// fall back to the built-in defaults.
    pub fn discover() -> Result<Self> {
        for p in Self::search_paths() {
            if p.exists() {
                log::debug!("using config {}", p.display());
                return Self::from_file(&p);
            }
        }
        Ok(Self::default())
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut tried: Vec<PathBuf> = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push("cascii-play");
            d.push(CONFIG_FILE_NAME);
            tried.push(d);
        }
        tried.push(PathBuf::from(CONFIG_FILE_NAME));
        tried
    }

    fn validate(&self) -> Result<()> {
        if !self.presets.contains_key(&self.default_preset) {
            return Err(anyhow!("default preset '{}' is not defined", self.default_preset));
        }
        for (name, preset) in &self.presets {
            if preset.fps == 0 {
                return Err(anyhow!("preset '{}' has fps 0", name));
            }
            if preset.width < 2 || preset.height < 2 {
                return Err(anyhow!("preset '{}' must be at least 2x2", name));
            }
        }
        Ok(())
    }

    /// Get a preset by name
    pub fn preset(&self, name: &str) -> Result<&Preset> {
        self.presets
            .get(name)
            .ok_or_else(|| anyhow!("Preset '{}' not found", name))
    }

    pub fn ffmpeg_config(&self) -> FfmpegConfig {
        FfmpegConfig {
            ffmpeg: self.ffmpeg.clone(),
            ffplay: self.ffplay.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.default_preset, "default");
        assert_eq!(
            *cfg.preset("default").unwrap(),
            Preset { width: 480, height: 360, fps: 30 }
        );
        assert!(cfg.preset("small").is_ok());
        assert!(cfg.preset("huge").is_err());
        assert_eq!(cfg.frame_overhead_ms, 5);
        assert_eq!(cfg.ffmpeg_config(), FfmpegConfig::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{"presets": {"tiny": {"width": 32, "height": 24, "fps": 12}},
                "default_preset": "tiny", "ffmpeg": "/opt/ffmpeg/bin/ffmpeg"}"#,
        )
        .unwrap();

        let cfg = AppConfig::from_file(&path).unwrap();
        assert_eq!(cfg.preset("tiny").unwrap().fps, 12);
        assert_eq!(cfg.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(cfg.ffplay, "ffplay");
    }

    #[test]
    fn test_rejects_bad_presets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&path, r#"{"presets": {}, "default_preset": "missing"}"#).unwrap();
        assert!(AppConfig::from_file(&path).is_err());

        fs::write(
            &path,
            r#"{"presets": {"x": {"width": 10, "height": 10, "fps": 0}}, "default_preset": "x"}"#,
        )
        .unwrap();
        assert!(AppConfig::from_file(&path).is_err());

        fs::write(&path, "not json").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }
}
