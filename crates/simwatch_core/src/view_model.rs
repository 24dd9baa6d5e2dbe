use crate::{DownloadState, RunId};

/// Display-level phase; `Stopping` is a running run whose token was signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Stopping,
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub run_id: RunId,
    pub phase: RunPhase,
    pub progress_percent: f64,
    pub elapsed_seconds: u64,
    pub estimated_remaining_seconds: Option<u64>,
    pub logs: Vec<LogRowView>,
    pub artifact: Option<String>,
    pub artifact_ready: bool,
    pub failure: Option<String>,
    pub download: DownloadState,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRowView {
    pub status: Option<f64>,
    pub message: String,
}
