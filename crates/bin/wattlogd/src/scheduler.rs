//! Periodic collection runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use wattlog_app::collection::CollectionJob;
use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};

/// Run `job` every `period`, starting immediately. Never returns.
///
/// A slow run delays the next tick instead of triggering a burst of
/// catch-up runs.
pub async fn run<MR, RR, TS>(job: Arc<CollectionJob<MR, RR, TS>>, period: Duration)
where
    MR: MeterRepository + 'static,
    RR: ReadingRepository + 'static,
    TS: TelemetrySource + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match job.run().await {
            Ok(report) if report.is_complete() => {
                tracing::debug!(processed = report.meters_processed, "scheduled run complete");
            }
            Ok(report) => {
                tracing::warn!(
                    processed = report.meters_processed,
                    failed = report.errors.len(),
                    "scheduled run finished with failures"
                );
            }
            Err(err) => {
                tracing::error!(error = ?err, "scheduled run aborted");
            }
        }
    }
}
