use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use log::debug;

use crate::SpeedRecorderError;
use crate::recording::source::DEFAULT_REPLAY_INTERVAL_MS;

const APP_DIR_NAME: &str = "speed-recorder";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Where export directories are created. Falls back to the user's documents directory.
    pub export_root: Option<PathBuf>,
    pub replay_interval_ms: u64,
    /// Ask before writing an export
    pub confirm_export: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export_root: None,
            replay_interval_ms: DEFAULT_REPLAY_INTERVAL_MS,
            confirm_export: true,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, SpeedRecorderError> {
        Ok(dirs::config_dir()
            .ok_or(SpeedRecorderError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Loads the config from the user's config directory, `None` if there is no config file yet.
    pub fn from_local_file() -> Result<Option<Self>, SpeedRecorderError> {
        match Self::default_path() {
            Ok(config_path) => Self::from_file(&config_path),
            Err(_) => Ok(None),
        }
    }

    pub fn from_file(config_path: &Path) -> Result<Option<Self>, SpeedRecorderError> {
        if !config_path.exists() {
            debug!("No config file at {:?}", config_path);
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .map_err(|e| SpeedRecorderError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| SpeedRecorderError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<PathBuf, SpeedRecorderError> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), SpeedRecorderError> {
        if let Some(parent) = config_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SpeedRecorderError::ConfigIOError { source: e })?;
            }
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| SpeedRecorderError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| SpeedRecorderError::ConfigSerializeError { source: e })
    }

    /// The directory exports go under: the configured root, or the user's documents directory.
    pub fn export_root(&self) -> Result<PathBuf, SpeedRecorderError> {
        match &self.export_root {
            Some(root) => Ok(root.clone()),
            None => dirs::document_dir().ok_or(SpeedRecorderError::NoDocumentsDir),
        }
    }
}
