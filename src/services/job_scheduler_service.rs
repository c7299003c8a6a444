use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::errors::AppError;
use crate::external::price_source::PriceSource;
use crate::jobs::snapshot_job;
use crate::services::notifier::Notifier;

/// Context passed to job functions.
#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub price_source: Arc<dyn PriceSource>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Settings,
    /// External stop signal, checked between watches.
    pub shutdown: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self { scheduler, context })
    }

    /// Start all scheduled jobs. Non-overlap of runs is this scheduler's
    /// responsibility: the default 12-hour interval dwarfs any realistic pass.
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        let test_mode = std::env::var("JOB_SCHEDULER_TEST_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        if test_mode {
            info!("⚠️  JOB SCHEDULER IN TEST MODE - Jobs will run every minute!");
        }

        let requested_hours = self.context.settings.poll_interval_hours;
        let interval_hours = normalize_interval(requested_hours);
        if interval_hours != requested_hours {
            warn!(
                "⚠️  POLL_INTERVAL_HOURS={} does not divide 24; running every {} hours instead",
                requested_hours, interval_hours
            );
        }
        let snapshot_schedule = if test_mode {
            "0 */1 * * * *".to_string()
        } else {
            format!("0 0 */{} * * *", interval_hours)
        };
        let snapshot_desc = if test_mode {
            "Every minute (TEST MODE)".to_string()
        } else {
            format!("Every {} hours", interval_hours)
        };

        self.schedule_job(
            &snapshot_schedule,
            "fare_snapshots",
            &snapshot_desc,
            snapshot_job::run_fare_snapshots,
        )
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully.
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    /// Helper to schedule a job with outcome logging.
    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        job_name: &'static str,
        description: &str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async(schedule, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            Box::pin(async move {
                run_logged(job_name, context, job_fn).await;
            })
        })
        .map_err(|e| AppError::External(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        info!("📅 Scheduled: {} - {} [cron: {}]", job_name, description, schedule);
        Ok(())
    }
}

/// The snapshot cadence is expressed as an hour-of-day cron step, which only
/// fires evenly when the interval divides 24. Other values would bunch runs
/// around midnight, so they round down to the nearest divisor.
fn normalize_interval(hours: u32) -> u32 {
    let hours = hours.clamp(1, 24);
    (1..=hours).rev().find(|d| 24 % d == 0).unwrap_or(1)
}

async fn run_logged<F, Fut>(job_name: &str, context: JobContext, job_fn: Arc<F>)
where
    F: Fn(JobContext) -> Fut,
    Fut: std::future::Future<Output = Result<JobResult, AppError>>,
{
    info!("🏃 Starting job: {}", job_name);
    let started_at = Utc::now();

    let result = job_fn(context).await;
    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );
        }
        Err(e) => {
            error!("❌ Job failed: {} - {}", job_name, e);
        }
    }
}
