//! Background job scheduler.
//!
//! Registers the hourly share-link cleanup at server startup.

use chrono::{Duration, Utc};
use gscdash_db::SHARE_LINK_RETENTION_DAYS;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(pool: PgPool) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_share_link_prune_job(&scheduler, pool).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Hourly at minute zero (`0 0 * * * *`).
async fn register_share_link_prune_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let pool = pool.clone();
        Box::pin(async move {
            run_share_link_prune(&pool).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_share_link_prune(pool: &PgPool) {
    let cutoff = Utc::now() - Duration::days(SHARE_LINK_RETENTION_DAYS);
    match gscdash_db::prune_share_links(pool, cutoff).await {
        Ok(0) => tracing::debug!("scheduler: no stale share links"),
        Ok(deleted) => tracing::info!(deleted, "scheduler: pruned stale share links"),
        Err(e) => tracing::error!(error = %e, "scheduler: share link prune failed"),
    }
}
