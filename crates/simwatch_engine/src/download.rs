use std::path::PathBuf;

use engine_logging::{engine_info, engine_warn};
use futures_util::StreamExt;

use crate::interpret::is_artifact_name;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::stream::map_reqwest_error;
use crate::{EngineSettings, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error("refusing to download suspicious artifact name {0:?}")]
    InvalidFilename(String),
    #[error("download failed with http status {0}")]
    HttpStatus(u16),
    #[error("artifact exceeds {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("download transport error: {0}")]
    Transport(TransportError),
    #[error("could not save artifact: {0}")]
    Persist(String),
}

impl From<PersistError> for DownloadError {
    fn from(err: PersistError) -> Self {
        DownloadError::Persist(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Fetches `filename` and returns where it was saved.
    async fn download(&self, filename: &str) -> Result<PathBuf, DownloadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDownloader {
    settings: EngineSettings,
}

impl ReqwestDownloader {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, DownloadError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.download_timeout)
            .build()
            .map_err(|err| DownloadError::Transport(map_reqwest_error(err)))
    }
}

#[async_trait::async_trait]
impl Downloader for ReqwestDownloader {
    async fn download(&self, filename: &str) -> Result<PathBuf, DownloadError> {
        if !is_artifact_name(filename) {
            return Err(DownloadError::InvalidFilename(filename.to_string()));
        }
        let url = self
            .settings
            .download_url(filename)
            .map_err(DownloadError::Transport)?;
        let client = self.build_client()?;

        engine_info!("Downloading artifact from {}", url);
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| DownloadError::Transport(map_reqwest_error(err)))?;

        let status = response.status();
        if !status.is_success() {
            engine_warn!("Artifact download of {} failed: {}", filename, status);
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_download_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > max_bytes)
        {
            return Err(DownloadError::TooLarge { max_bytes });
        }

        let writer = AtomicFileWriter::new(self.settings.output_dir.clone());
        let mut file = writer.begin(filename)?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| DownloadError::Transport(map_reqwest_error(err)))?;
            if file.written() + chunk.len() as u64 > max_bytes {
                return Err(DownloadError::TooLarge { max_bytes });
            }
            file.append(&chunk)?;
        }

        let written = file.written();
        let path = file.commit()?;
        engine_info!("Saved artifact {} ({} bytes) to {:?}", filename, written, path);
        Ok(path)
    }
}
