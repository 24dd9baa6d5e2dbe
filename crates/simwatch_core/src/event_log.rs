/// Message of the synthetic entry appended when a run is stopped by the user.
pub const STOPPED_MESSAGE: &str = "Simulation Stopped.";

/// One interpreted progress/log entry.
///
/// `status` is a percentage (0..=100). It is `None` for entries that carry
/// no progress value, such as the synthetic stop entry or a frame whose
/// `status` field was missing.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub status: Option<f64>,
    pub message: String,
}

impl StatusRecord {
    pub fn new(status: f64, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A log entry without a progress value.
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

static ZERO_PROGRESS: StatusRecord = StatusRecord {
    status: Some(0.0),
    message: String::new(),
};

/// Append-only, arrival-ordered history of one run's status records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    records: Vec<StatusRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: StatusRecord) {
        self.records.push(record);
    }

    /// Most recently appended record, or a zero-progress record when empty.
    pub fn latest(&self) -> &StatusRecord {
        self.records.last().unwrap_or(&ZERO_PROGRESS)
    }

    /// Progress of the most recent record that carries a status value.
    pub fn current_percentage(&self) -> f64 {
        self.records
            .iter()
            .rev()
            .find_map(|record| record.status)
            .unwrap_or(0.0)
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[StatusRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
