use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{RunId, SimulationRequest, StatusRecord};

/// How the remote status stream ended, as observed by the stream driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Natural end of data.
    Ended,
    /// The run's cancellation token aborted the pending read.
    Cancelled,
    /// Transport or HTTP failure not caused by the token.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked for a new run with an already validated request.
    StartRequested {
        request: SimulationRequest,
        now: DateTime<Utc>,
    },
    /// One interpreted status frame from the stream.
    StatusReceived {
        run_id: RunId,
        record: StatusRecord,
        /// Artifact filename found in the record's message, if any.
        artifact: Option<String>,
        at: DateTime<Utc>,
    },
    /// The stream for `run_id` is over.
    StreamFinished {
        run_id: RunId,
        outcome: StreamOutcome,
    },
    /// User clicked Stop (or pressed Ctrl-C).
    StopRequested,
    /// Periodic timing tick.
    Tick { run_id: RunId, now: DateTime<Utc> },
    /// User asked to download the finished run's artifact.
    DownloadRequested,
    /// Artifact download finished, with the saved path or a reason.
    DownloadFinished {
        run_id: RunId,
        result: Result<PathBuf, String>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
