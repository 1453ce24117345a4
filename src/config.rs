use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::engine::render::{palette, Rgba};
use crate::engine::Crosshair;
use crate::error::AimResult;
use crate::sensitivity::SensitivityConfig;
use crate::session::{TrainingConfig, TrainingMode};

pub const MIN_CROSSHAIR_SIZE: u16 = 5;
pub const MAX_CROSSHAIR_SIZE: u16 = 25;

/// Everything the trainer remembers between launches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub sensitivity: SensitivityConfig,
    /// `#rrggbb`
    pub crosshair_color: String,
    pub crosshair_size: u16,
    pub training: TrainingConfig,
    pub mode: TrainingMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity: SensitivityConfig::default(),
            crosshair_color: palette::WHITE.to_hex(),
            crosshair_size: 10,
            training: TrainingConfig::default(),
            mode: TrainingMode::Gridshot,
        }
    }
}

impl Settings {
    /// Crosshair to hand the engine; an unreadable colour falls back to white.
    pub fn crosshair(&self) -> Crosshair {
        let color = Rgba::from_hex(&self.crosshair_color).unwrap_or(palette::WHITE);
        let size = self
            .crosshair_size
            .clamp(MIN_CROSSHAIR_SIZE, MAX_CROSSHAIR_SIZE);
        Crosshair {
            color,
            size: size as f64,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> AimResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("aimforge_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Settings {
        let Ok(bytes) = fs::read(&self.path) else {
            return Settings::default();
        };
        match serde_json::from_slice::<Settings>(&bytes) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "unreadable settings, using defaults");
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> AimResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
