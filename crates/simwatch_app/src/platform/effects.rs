use std::sync::{mpsc, Arc};

use engine_logging::{engine_error, engine_info, engine_warn};
use simwatch_core::{Effect, Msg, StatusRecord, StreamOutcome};
use simwatch_engine::{EngineEvent, EngineHandle, EngineSettings, EventSink, StreamEnd};

/// Executes core effects against the engine.
pub struct EffectRunner {
    engine: EngineHandle,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings, msg_tx: mpsc::Sender<Msg>) -> Self {
        let sink = Arc::new(MsgSink {
            msg_tx: msg_tx.clone(),
        });
        Self {
            engine: EngineHandle::new(settings, sink),
            msg_tx,
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartStream { run_id, request } => match serde_json::to_value(&request) {
                    Ok(body) => {
                        engine_info!("StartStream run_id={} date={}", run_id, request.date);
                        self.engine.start_stream(run_id, body);
                    }
                    Err(err) => {
                        engine_error!("Could not encode request for run {}: {}", run_id, err);
                        let _ = self.msg_tx.send(Msg::StreamFinished {
                            run_id,
                            outcome: StreamOutcome::Failed(format!("invalid request: {err}")),
                        });
                    }
                },
                Effect::CancelStream { run_id } => self.engine.cancel_stream(run_id),
                Effect::StartTicker { run_id } => self.engine.start_ticker(run_id),
                Effect::StopTicker { run_id } => self.engine.stop_ticker(run_id),
                Effect::DownloadArtifact { run_id, filename } => {
                    engine_info!("DownloadArtifact run_id={} filename={}", run_id, filename);
                    self.engine.download(run_id, filename);
                }
            }
        }
    }
}

/// Forwards engine events into the app's message loop.
struct MsgSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.msg_tx.send(to_msg(event));
    }
}

pub(crate) fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Status {
            run_id,
            update,
            received_at,
        } => Msg::StatusReceived {
            run_id,
            record: StatusRecord {
                status: update.percent,
                message: update.message,
            },
            artifact: update.artifact,
            at: received_at,
        },
        EngineEvent::StreamFinished { run_id, result } => {
            let outcome = match result {
                Ok(StreamEnd::Ended) => StreamOutcome::Ended,
                Ok(StreamEnd::Cancelled) => StreamOutcome::Cancelled,
                Err(err) => {
                    engine_warn!("Run {} failed: {}", run_id, err);
                    StreamOutcome::Failed(err.to_string())
                }
            };
            Msg::StreamFinished { run_id, outcome }
        }
        EngineEvent::Tick { run_id, now } => Msg::Tick { run_id, now },
        EngineEvent::DownloadFinished { run_id, result } => Msg::DownloadFinished {
            run_id,
            result: result.map_err(|err| {
                engine_warn!("Download for run {} failed: {}", run_id, err);
                err.to_string()
            }),
        },
    }
}
