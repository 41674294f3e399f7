use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::error::{AppError, Result};
use crate::service::MembershipLifecycle;

/// Daily at 09:00 UTC: renewal reminders, then the expiry sweep.
const DAILY_SCHEDULE: &str = "0 0 9 * * *";

/// First of the month at midnight UTC: auto-renewal run.
const MONTHLY_SCHEDULE: &str = "0 0 0 1 * *";

/// Starts the background jobs and hands back the running scheduler; dropping
/// it stops the jobs. Runs never overlap: a job that finds the previous one
/// still going skips its slot.
pub async fn start(lifecycle: Arc<MembershipLifecycle>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

    let guard = Arc::new(tokio::sync::Mutex::new(()));

    let daily_lifecycle = lifecycle.clone();
    let daily_guard = guard.clone();
    let daily = Job::new_async(DAILY_SCHEDULE, move |_id, _sched| {
        let lifecycle = daily_lifecycle.clone();
        let guard = daily_guard.clone();
        Box::pin(async move {
            let Ok(_lock) = guard.try_lock() else {
                tracing::warn!("Previous membership job still running, skipping daily run");
                return;
            };

            if let Err(e) = lifecycle.send_renewal_reminders().await {
                tracing::error!("Renewal reminder run failed: {}", e);
            }
            if let Err(e) = lifecycle.expire_overdue().await {
                tracing::error!("Expiry sweep failed: {}", e);
            }
        })
    })
    .map_err(scheduler_error)?;

    let monthly_lifecycle = lifecycle;
    let monthly_guard = guard;
    let monthly = Job::new_async(MONTHLY_SCHEDULE, move |_id, _sched| {
        let lifecycle = monthly_lifecycle.clone();
        let guard = monthly_guard.clone();
        Box::pin(async move {
            let Ok(_lock) = guard.try_lock() else {
                tracing::warn!("Previous membership job still running, skipping auto-renewal run");
                return;
            };

            if let Err(e) = lifecycle.run_auto_renewals().await {
                tracing::error!("Auto-renewal run failed: {}", e);
            }
        })
    })
    .map_err(scheduler_error)?;

    scheduler.add(daily).await.map_err(scheduler_error)?;
    scheduler.add(monthly).await.map_err(scheduler_error)?;
    scheduler.start().await.map_err(scheduler_error)?;

    tracing::info!(
        daily = DAILY_SCHEDULE,
        monthly = MONTHLY_SCHEDULE,
        "Background jobs scheduled"
    );

    Ok(scheduler)
}

fn scheduler_error(e: JobSchedulerError) -> AppError {
    AppError::Internal(format!("Scheduler error: {}", e))
}
