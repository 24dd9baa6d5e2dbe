use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::stream::EventSink;
use crate::{EngineEvent, RunId};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Emits `EngineEvent::Tick` every `period` until `stop` is cancelled.
///
/// The first tick fires one period after the call, not immediately.
pub async fn run_ticker(
    run_id: RunId,
    period: Duration,
    stop: CancellationToken,
    sink: &dyn EventSink,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticks.tick() => {
                sink.emit(EngineEvent::Tick { run_id, now: Utc::now() });
            }
        }
    }
}
