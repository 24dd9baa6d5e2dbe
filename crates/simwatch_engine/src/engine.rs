use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_debug, engine_error, engine_info};
use tokio_util::sync::CancellationToken;

use crate::download::{DownloadError, Downloader, ReqwestDownloader};
use crate::stream::{EventSink, ReqwestStatusSource, StatusSource};
use crate::ticker::{run_ticker, TICK_PERIOD};
use crate::{EngineEvent, EngineSettings, FailureKind, RunId, TransportError};

enum EngineCommand {
    StartStream {
        run_id: RunId,
        body: serde_json::Value,
    },
    CancelStream {
        run_id: RunId,
    },
    StartTicker {
        run_id: RunId,
    },
    StopTicker {
        run_id: RunId,
    },
    Download {
        run_id: RunId,
        filename: String,
    },
}

/// Handle to the engine thread that owns the async runtime.
///
/// Commands are processed in order on a single thread, which also owns the
/// per-run cancellation tokens, so at most one stream and one ticker are
/// ever live.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, sink: Arc<dyn EventSink>) -> Self {
        let source = Arc::new(ReqwestStatusSource::new(settings.clone()));
        let downloader = Arc::new(ReqwestDownloader::new(settings));
        Self::with_parts(source, downloader, sink)
    }

    /// Builds an engine over explicit stream and download implementations.
    pub fn with_parts(
        source: Arc<dyn StatusSource>,
        downloader: Arc<dyn Downloader>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::spawn(tokio::runtime::Runtime::new, source, downloader, sink)
    }

    fn spawn<F>(
        build_runtime: F,
        source: Arc<dyn StatusSource>,
        downloader: Arc<dyn Downloader>,
        sink: Arc<dyn EventSink>,
    ) -> Self
    where
        F: FnOnce() -> io::Result<tokio::runtime::Runtime> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match build_runtime() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start engine runtime: {}", err);
                    let reason = format!("engine runtime unavailable: {err}");
                    while let Ok(command) = cmd_rx.recv() {
                        reject(sink.as_ref(), command, &reason);
                    }
                    return;
                }
            };
            let mut worker = Worker {
                source,
                downloader,
                sink,
                streams: HashMap::new(),
                tickers: HashMap::new(),
            };
            while let Ok(command) = cmd_rx.recv() {
                worker.handle(&runtime, command);
            }
            worker.shutdown();
        });

        Self { cmd_tx }
    }

    pub fn start_stream(&self, run_id: RunId, body: serde_json::Value) {
        let _ = self.cmd_tx.send(EngineCommand::StartStream { run_id, body });
    }

    pub fn cancel_stream(&self, run_id: RunId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelStream { run_id });
    }

    pub fn start_ticker(&self, run_id: RunId) {
        let _ = self.cmd_tx.send(EngineCommand::StartTicker { run_id });
    }

    pub fn stop_ticker(&self, run_id: RunId) {
        let _ = self.cmd_tx.send(EngineCommand::StopTicker { run_id });
    }

    pub fn download(&self, run_id: RunId, filename: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Download {
            run_id,
            filename: filename.into(),
        });
    }
}

struct Worker {
    source: Arc<dyn StatusSource>,
    downloader: Arc<dyn Downloader>,
    sink: Arc<dyn EventSink>,
    streams: HashMap<RunId, CancellationToken>,
    tickers: HashMap<RunId, CancellationToken>,
}

impl Worker {
    fn handle(&mut self, runtime: &tokio::runtime::Runtime, command: EngineCommand) {
        match command {
            EngineCommand::StartStream { run_id, body } => {
                // A new run supersedes whatever is still attached to older ones.
                cancel_all(&mut self.streams);
                let cancel = CancellationToken::new();
                self.streams.insert(run_id, cancel.clone());

                let source = self.source.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = source.stream(run_id, &body, &cancel, sink.as_ref()).await;
                    sink.emit(EngineEvent::StreamFinished { run_id, result });
                });
            }
            EngineCommand::CancelStream { run_id } => match self.streams.remove(&run_id) {
                Some(cancel) => {
                    engine_info!("Cancelling stream for run {}", run_id);
                    cancel.cancel();
                }
                None => engine_debug!("No live stream for run {}", run_id),
            },
            EngineCommand::StartTicker { run_id } => {
                cancel_all(&mut self.tickers);
                let stop = CancellationToken::new();
                self.tickers.insert(run_id, stop.clone());

                let sink = self.sink.clone();
                runtime.spawn(async move {
                    run_ticker(run_id, TICK_PERIOD, stop, sink.as_ref()).await;
                });
            }
            EngineCommand::StopTicker { run_id } => {
                if let Some(stop) = self.tickers.remove(&run_id) {
                    stop.cancel();
                }
                // The stream is over; its token is no longer needed.
                self.streams.remove(&run_id);
            }
            EngineCommand::Download { run_id, filename } => {
                let downloader = self.downloader.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = downloader.download(&filename).await;
                    sink.emit(EngineEvent::DownloadFinished { run_id, result });
                });
            }
        }
    }

    fn shutdown(&mut self) {
        cancel_all(&mut self.streams);
        cancel_all(&mut self.tickers);
    }
}

/// Answers a command that cannot run, so whoever waits on it still sees an end.
fn reject(sink: &dyn EventSink, command: EngineCommand, reason: &str) {
    match command {
        EngineCommand::StartStream { run_id, .. } => sink.emit(EngineEvent::StreamFinished {
            run_id,
            result: Err(TransportError::new(FailureKind::Network, reason)),
        }),
        EngineCommand::Download { run_id, .. } => sink.emit(EngineEvent::DownloadFinished {
            run_id,
            result: Err(DownloadError::Transport(TransportError::new(
                FailureKind::Network,
                reason,
            ))),
        }),
        EngineCommand::CancelStream { .. }
        | EngineCommand::StartTicker { .. }
        | EngineCommand::StopTicker { .. } => {}
    }
}

fn cancel_all(tokens: &mut HashMap<RunId, CancellationToken>) {
    for (_, token) in tokens.drain() {
        token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::EngineHandle;
    use crate::download::{DownloadError, Downloader};
    use crate::stream::{EventSink, StatusSource};
    use crate::{EngineEvent, FailureKind, RunId, StreamEnd, TransportError};

    struct Unused;

    #[async_trait::async_trait]
    impl StatusSource for Unused {
        async fn stream(
            &self,
            _run_id: RunId,
            _body: &serde_json::Value,
            _cancel: &CancellationToken,
            _sink: &dyn EventSink,
        ) -> Result<StreamEnd, TransportError> {
            Ok(StreamEnd::Ended)
        }
    }

    #[async_trait::async_trait]
    impl Downloader for Unused {
        async fn download(&self, _filename: &str) -> Result<PathBuf, DownloadError> {
            Ok(PathBuf::new())
        }
    }

    struct Forward(mpsc::Sender<EngineEvent>);

    impl EventSink for Forward {
        fn emit(&self, event: EngineEvent) {
            let _ = self.0.send(event);
        }
    }

    #[test]
    fn runtime_failure_still_finishes_every_run() {
        let (tx, rx) = mpsc::channel();
        let engine = EngineHandle::spawn(
            || Err(io::Error::other("no threads left")),
            Arc::new(Unused),
            Arc::new(Unused),
            Arc::new(Forward(tx)),
        );

        engine.start_ticker(1);
        engine.start_stream(1, serde_json::json!({}));
        engine.download(1, "run-001.nc");

        let wait = Duration::from_secs(5);
        match rx.recv_timeout(wait).unwrap() {
            EngineEvent::StreamFinished {
                run_id: 1,
                result: Err(err),
            } => {
                assert_eq!(err.kind, FailureKind::Network);
                assert!(err.message.contains("no threads left"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            rx.recv_timeout(wait).unwrap(),
            EngineEvent::DownloadFinished {
                run_id: 1,
                result: Err(DownloadError::Transport(_)),
            }
        ));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
