//! Simwatch core: pure run lifecycle state machine and view-model helpers.
mod effect;
mod event_log;
mod msg;
mod request;
mod state;
mod timing;
mod update;
mod view_model;

pub use effect::Effect;
pub use event_log::{EventLog, StatusRecord, STOPPED_MESSAGE};
pub use msg::{Msg, StreamOutcome};
pub use request::{SimulationRequest, ValidationError};
pub use state::{AppState, DownloadState, RunId, RunState};
pub use timing::{compute_timing, format_clock, TimingSnapshot};
pub use update::update;
pub use view_model::{AppViewModel, LogRowView, RunPhase};
