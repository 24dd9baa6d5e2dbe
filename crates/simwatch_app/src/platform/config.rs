//! Optional RON configuration file for the `simwatch` binary.
//!
//! Looked up at `./simwatch.ron` unless `--config` names another file.
//! Every field is optional; CLI flags win over file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use simwatch_engine::EngineSettings;

pub const DEFAULT_CONFIG_FILENAME: &str = "simwatch.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub output_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            base_url: engine.base_url,
            connect_timeout_secs: engine.connect_timeout.as_secs(),
            read_timeout_secs: engine.read_timeout.as_secs(),
            download_timeout_secs: engine.download_timeout.as_secs(),
            output_dir: engine.output_dir,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            output_dir: self.output_dir.clone(),
            ..EngineSettings::default()
        }
    }
}

/// Loads the config file.
///
/// An explicitly named file must exist and parse. The default file is
/// optional: when absent, defaults are used.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
    };

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            return Ok(AppConfig::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    parse(&content).map_err(|message| ConfigError::Parse { path, message })
}

fn parse(content: &str) -> Result<AppConfig, String> {
    let config: AppConfig = ron::from_str(content).map_err(|err| err.to_string())?;
    if config.read_timeout_secs == 0 {
        engine_warn!("read_timeout_secs must be positive; using the default");
        return Ok(AppConfig {
            read_timeout_secs: AppConfig::default().read_timeout_secs,
            ..config
        });
    }
    engine_info!("Loaded config for service {}", config.base_url);
    Ok(config)
}
