use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::engine::EngineConfig;
use crate::fx::order::DspOrder;
use crate::fx::queue::DEFAULT_CAPACITY;
use crate::fx::stages::ProcessSpec;

impl std::fmt::Display for AudioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sample Rate: {}", self.sample_rate)?;
        writeln!(f, "Block Size: {}", self.block_size)?;
        writeln!(f, "Channels: {}", self.channels)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 128,
            channels: 2,
        }
    }
}

impl std::fmt::Display for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Order Queue Capacity: {}", self.order_queue_capacity)?;
        writeln!(f, "Parameter Smoothing: {} ms", self.param_smoothing_ms)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub order_queue_capacity: usize,
    /// 0 disables smoothing
    pub param_smoothing_ms: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            order_queue_capacity: DEFAULT_CAPACITY,
            param_smoothing_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub engine: EngineSettings,
    pub preset_dir: String,
    /// Comma-separated stage list, e.g. `phaser,chorus,overdrive,ladder,filter`
    pub default_order: String,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;

        writeln!(f, "Audio Settings:")?;
        writeln!(f, "{}", self.audio)?;

        writeln!(f, "Engine Settings:")?;
        writeln!(f, "{}", self.engine)?;

        writeln!(f, "Settings:")?;
        writeln!(f, "Preset Directory: {}", self.preset_dir)?;
        writeln!(f, "Default Order: {}", self.default_order)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            engine: EngineSettings::default(),
            preset_dir: "./presets".to_string(),
            default_order: "phaser,chorus,overdrive,ladder,filter".to_string(),
        }
    }
}

impl Settings {
    /// Load from the user config directory, falling back to defaults when the
    /// file does not exist yet.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path();

        if settings_path.exists() {
            Self::load_from(&settings_path)
        } else {
            info!("No settings file found, using defaults");
            let settings = Self::default();
            if let Err(e) = settings.save() {
                warn!("Could not write default settings: {e:#}");
            }
            Ok(settings)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents).context("failed to parse settings")?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;

        fs::write(path, json)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;

        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn default_order(&self) -> Result<DspOrder> {
        self.default_order
            .parse()
            .with_context(|| format!("invalid default_order '{}'", self.default_order))
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            order_queue_capacity: self.engine.order_queue_capacity,
            param_smoothing_ms: self.engine.param_smoothing_ms,
            initial_order: self.default_order()?,
        })
    }

    pub fn process_spec(&self) -> ProcessSpec {
        ProcessSpec::new(
            self.audio.sample_rate as f32,
            self.audio.block_size,
            self.audio.channels,
        )
    }

    pub fn get_settings_path() -> PathBuf {
        const SETTINGS_FILENAME: &str = "settings.json";

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join("chainfx")
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("chainfx")
                .join(SETTINGS_FILENAME)
        } else {
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }
}
