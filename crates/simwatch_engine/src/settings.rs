use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::{FailureKind, TransportError};

const SIMULATION_PATH: &str = "run-simulation/";
const DOWNLOAD_PATH: &str = "download/";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Service root, e.g. `http://localhost:5000`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two body chunks of the status
    /// stream. The stream as a whole has no deadline.
    pub read_timeout: Duration,
    /// Deadline for a whole artifact download.
    pub download_timeout: Duration,
    pub max_download_bytes: u64,
    pub output_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(300),
            download_timeout: Duration::from_secs(600),
            max_download_bytes: 2 * 1024 * 1024 * 1024,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl EngineSettings {
    pub fn simulation_url(&self) -> Result<Url, TransportError> {
        self.base()?
            .join(SIMULATION_PATH)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    pub fn download_url(&self, filename: &str) -> Result<Url, TransportError> {
        self.base()?
            .join(DOWNLOAD_PATH)
            .and_then(|url| url.join(filename))
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn base(&self) -> Result<Url, TransportError> {
        // A trailing slash keeps `join` from replacing the last path segment.
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}
