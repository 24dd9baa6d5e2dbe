use chrono::Utc;
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;

use crate::frame::FrameDecoder;
use crate::interpret::interpret_frame;
use crate::{EngineEvent, EngineSettings, FailureKind, RunId, StreamEnd, TransportError};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Opens a simulation and streams its status updates into a sink.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// Runs until end-of-data, cancellation or a transport failure.
    ///
    /// Cancellation is observed at every suspension point and is reported
    /// as `Ok(StreamEnd::Cancelled)`, never as an error.
    async fn stream(
        &self,
        run_id: RunId,
        body: &serde_json::Value,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<StreamEnd, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestStatusSource {
    settings: EngineSettings,
}

impl ReqwestStatusSource {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .read_timeout(self.settings.read_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl StatusSource for ReqwestStatusSource {
    async fn stream(
        &self,
        run_id: RunId,
        body: &serde_json::Value,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<StreamEnd, TransportError> {
        let url = self.settings.simulation_url()?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| TransportError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let client = self.build_client()?;

        engine_info!("Run {} posting simulation request to {}", run_id, url);
        let request = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/plain")
            .body(payload)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            response = request => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let detail = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };
            engine_warn!("Run {} rejected with {}: {}", run_id, status, detail);
            return Err(TransportError::new(
                FailureKind::HttpStatus(status.as_u16()),
                detail,
            ));
        }

        let mut decoder = FrameDecoder::new();
        let mut chunks = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    engine_info!("Run {} stream cancelled", run_id);
                    return Ok(StreamEnd::Cancelled);
                }
                next = chunks.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(map_reqwest_error)?;
            engine_debug!("Run {} received {} bytes", run_id, chunk.len());

            for frame in decoder.push_bytes(&chunk) {
                sink.emit(EngineEvent::Status {
                    run_id,
                    update: interpret_frame(&frame),
                    received_at: Utc::now(),
                });
            }
        }

        decoder.finish();
        engine_info!("Run {} stream reached end of data", run_id);
        Ok(StreamEnd::Ended)
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
