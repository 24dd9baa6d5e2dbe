use crate::{AppState, DownloadState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages tagged with a run id other than the live run are stale and
/// ignored, so a run's log is never touched once it has ended.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested { request, now } => {
            if state.run_state().is_running() {
                return (state, Vec::new());
            }
            let run_id = state.begin_run(now);
            vec![
                Effect::StartStream { run_id, request },
                Effect::StartTicker { run_id },
            ]
        }
        Msg::StatusReceived {
            run_id,
            record,
            artifact,
            at,
        } => {
            // Once stop is requested nothing else is decoded into the log.
            if state.is_live(run_id) && !state.is_stopping() {
                state.apply_status(record, artifact, at);
            }
            Vec::new()
        }
        Msg::StreamFinished { run_id, outcome } => {
            if !state.is_live(run_id) {
                return (state, Vec::new());
            }
            state.finish_run(outcome);
            vec![Effect::StopTicker { run_id }]
        }
        Msg::StopRequested => {
            if state.run_state().is_running() && !state.is_stopping() {
                state.request_stop();
                vec![Effect::CancelStream {
                    run_id: state.run_id(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::Tick { run_id, now } => {
            if state.is_live(run_id) {
                state.refresh_timing(now);
            }
            Vec::new()
        }
        Msg::DownloadRequested => {
            let busy = *state.download() == DownloadState::InProgress;
            match state.artifact().map(ToOwned::to_owned) {
                Some(filename) if state.artifact_ready() && !busy => {
                    state.begin_download();
                    vec![Effect::DownloadArtifact {
                        run_id: state.run_id(),
                        filename,
                    }]
                }
                _ => Vec::new(),
            }
        }
        Msg::DownloadFinished { run_id, result } => {
            if run_id == state.run_id() && *state.download() == DownloadState::InProgress {
                state.finish_download(result);
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
