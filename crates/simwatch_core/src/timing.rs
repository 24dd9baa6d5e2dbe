use chrono::{DateTime, Utc};

/// Elapsed and estimated-remaining time of a run, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingSnapshot {
    pub elapsed_seconds: u64,
    pub estimated_remaining_seconds: Option<u64>,
}

/// Derives timing from the run start, the current percentage and `now`.
///
/// The estimate extrapolates linearly from the progress rate so far and is
/// only available once both progress and elapsed time are positive.
pub fn compute_timing(
    started_at: DateTime<Utc>,
    current_percentage: f64,
    now: DateTime<Utc>,
) -> TimingSnapshot {
    let elapsed_ms = (now - started_at).num_milliseconds().max(0);
    let elapsed_seconds = (elapsed_ms / 1000) as u64;

    let estimated_remaining_seconds = if current_percentage > 0.0 && elapsed_seconds > 0 {
        let remaining =
            (elapsed_seconds as f64 / current_percentage) * (100.0 - current_percentage);
        Some(remaining.round().max(0.0) as u64)
    } else {
        None
    };

    TimingSnapshot {
        elapsed_seconds,
        estimated_remaining_seconds,
    }
}

/// Formats seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
