//! Database maintenance commands.

use chrono::{Duration, Utc};
use gscdash_db::{PoolConfig, SHARE_LINK_RETENTION_DAYS};

pub(crate) async fn run_migrate(database_url: &str) -> anyhow::Result<()> {
    let pool = gscdash_db::connect_pool(database_url, PoolConfig::default()).await?;
    let applied = gscdash_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Same cutoff as the server's hourly job.
pub(crate) async fn run_prune_share_links(
    database_url: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let pool = gscdash_db::connect_pool(database_url, PoolConfig::default()).await?;
    let cutoff = Utc::now() - Duration::days(SHARE_LINK_RETENTION_DAYS);

    if dry_run {
        let stale = gscdash_db::count_prunable_share_links(&pool, cutoff).await?;
        println!("{stale} share link(s) would be deleted (cutoff {cutoff})");
        return Ok(());
    }

    let deleted = gscdash_db::prune_share_links(&pool, cutoff).await?;
    tracing::info!(deleted, %cutoff, "share links pruned");
    println!("deleted {deleted} share link(s)");
    Ok(())
}
