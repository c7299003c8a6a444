use tracing::info;

use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::snapshot_service;

/// Entry point for the periodic fare snapshot job.
///
/// One run:
/// 1. Loads watches that have at least one subscriber and a future departure
/// 2. Snapshots the confirmed cheapest offer for each
/// 3. Evaluates deals and emails subscribers on new lows
pub async fn run_fare_snapshots(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("Starting fare snapshot job");

    let report = snapshot_service::run_snapshot_pass(&ctx).await;

    if report.skipped > 0 {
        info!("{} watches skipped this pass", report.skipped);
    }

    Ok(JobResult {
        items_processed: report.saved,
        items_failed: report.failed,
    })
}
