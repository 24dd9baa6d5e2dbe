use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::view_model::{AppViewModel, LogRowView, RunPhase};
use crate::{compute_timing, EventLog, StatusRecord, StreamOutcome, TimingSnapshot, STOPPED_MESSAGE};

pub type RunId = u64;

/// Lifecycle phase of the current simulation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running {
        started_at: DateTime<Utc>,
        /// Stop was requested; the token is signalled and the stream driver
        /// has not yet reported how the stream ended.
        stopping: bool,
    },
    Completed,
    Stopped,
    Failed {
        cause: String,
    },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Stopped | RunState::Failed { .. }
        )
    }
}

/// Artifact download progress for the current run. Never affects [`RunState`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    NotRequested,
    InProgress,
    Saved {
        path: PathBuf,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    run_id: RunId,
    run_state: RunState,
    log: EventLog,
    artifact: Option<String>,
    timing: TimingSnapshot,
    download: DownloadState,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn artifact(&self) -> Option<&str> {
        self.artifact.as_deref()
    }

    pub fn timing(&self) -> TimingSnapshot {
        self.timing
    }

    pub fn download(&self) -> &DownloadState {
        &self.download
    }

    /// The run finished naturally at 100%, so its output can be fetched.
    ///
    /// Only a natural end of stream counts; progress hitting 100 mid-stream
    /// does not. Whether an artifact name was reported is a separate matter,
    /// see [`AppState::artifact`].
    pub fn artifact_ready(&self) -> bool {
        self.run_state == RunState::Completed && self.log.latest().status == Some(100.0)
    }

    pub fn view(&self) -> AppViewModel {
        let phase = match &self.run_state {
            RunState::Idle => RunPhase::Idle,
            RunState::Running { stopping: false, .. } => RunPhase::Running,
            RunState::Running { stopping: true, .. } => RunPhase::Stopping,
            RunState::Completed => RunPhase::Completed,
            RunState::Stopped => RunPhase::Stopped,
            RunState::Failed { .. } => RunPhase::Failed,
        };
        let failure = match &self.run_state {
            RunState::Failed { cause } => Some(cause.clone()),
            _ => None,
        };

        AppViewModel {
            run_id: self.run_id,
            phase,
            progress_percent: self.log.current_percentage(),
            elapsed_seconds: self.timing.elapsed_seconds,
            estimated_remaining_seconds: self.timing.estimated_remaining_seconds,
            logs: self
                .log
                .records()
                .iter()
                .map(|record| LogRowView {
                    status: record.status,
                    message: record.message.clone(),
                })
                .collect(),
            artifact: self.artifact.clone(),
            artifact_ready: self.artifact_ready(),
            failure,
            download: self.download.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_live(&self, run_id: RunId) -> bool {
        run_id == self.run_id && self.run_state.is_running()
    }

    pub(crate) fn is_stopping(&self) -> bool {
        matches!(self.run_state, RunState::Running { stopping: true, .. })
    }

    /// Resets all per-run data and enters `Running`. Returns the new run id.
    pub(crate) fn begin_run(&mut self, now: DateTime<Utc>) -> RunId {
        self.run_id += 1;
        self.log.clear();
        self.artifact = None;
        self.download = DownloadState::NotRequested;
        self.timing = TimingSnapshot::default();
        self.run_state = RunState::Running {
            started_at: now,
            stopping: false,
        };
        self.dirty = true;
        self.run_id
    }

    pub(crate) fn apply_status(
        &mut self,
        record: StatusRecord,
        artifact: Option<String>,
        at: DateTime<Utc>,
    ) {
        if self.artifact.is_none() {
            self.artifact = artifact;
        }
        self.log.append(record);
        self.refresh_timing(at);
        self.dirty = true;
    }

    pub(crate) fn refresh_timing(&mut self, now: DateTime<Utc>) {
        if let RunState::Running { started_at, .. } = self.run_state {
            let timing = compute_timing(started_at, self.log.current_percentage(), now);
            if timing != self.timing {
                self.timing = timing;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn request_stop(&mut self) {
        if let RunState::Running { stopping, .. } = &mut self.run_state {
            *stopping = true;
            self.dirty = true;
        }
    }

    pub(crate) fn finish_run(&mut self, outcome: StreamOutcome) {
        self.run_state = match outcome {
            StreamOutcome::Ended => RunState::Completed,
            StreamOutcome::Cancelled => {
                self.log.append(StatusRecord::note(STOPPED_MESSAGE));
                RunState::Stopped
            }
            StreamOutcome::Failed(cause) => RunState::Failed { cause },
        };
        self.dirty = true;
    }

    pub(crate) fn begin_download(&mut self) {
        self.download = DownloadState::InProgress;
        self.dirty = true;
    }

    pub(crate) fn finish_download(&mut self, result: Result<PathBuf, String>) {
        self.download = match result {
            Ok(path) => DownloadState::Saved { path },
            Err(reason) => DownloadState::Failed { reason },
        };
        self.dirty = true;
    }
}
