use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::interpret::StatusUpdate;
use crate::DownloadError;

pub type RunId = u64;

/// How a status stream ended when no transport error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The response body reached end-of-data.
    Ended,
    /// The run's cancellation token aborted the pending read.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One interpreted status frame.
    Status {
        run_id: RunId,
        update: StatusUpdate,
        received_at: DateTime<Utc>,
    },
    StreamFinished {
        run_id: RunId,
        result: Result<StreamEnd, TransportError>,
    },
    Tick {
        run_id: RunId,
        now: DateTime<Utc>,
    },
    DownloadFinished {
        run_id: RunId,
        result: Result<PathBuf, DownloadError>,
    },
}

/// Transport-level failure of the status stream; never caused by cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidRequest => write!(f, "invalid request body"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
