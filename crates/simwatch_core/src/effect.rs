use crate::{RunId, SimulationRequest};

/// Side effects requested by [`crate::update`]; executed outside the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the remote status stream for a new run.
    StartStream {
        run_id: RunId,
        request: SimulationRequest,
    },
    /// Signal the run's cancellation token.
    CancelStream { run_id: RunId },
    /// Begin the one-second timing tick bound to this run.
    StartTicker { run_id: RunId },
    /// The run left `Running`; its tick must stop.
    StopTicker { run_id: RunId },
    /// Fetch the run's artifact from the download endpoint.
    DownloadArtifact { run_id: RunId, filename: String },
}
