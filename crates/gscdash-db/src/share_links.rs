//! Database operations for `share_links`.
//!
//! Raw share tokens never reach the database; rows are keyed by the
//! SHA-256 of the token.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Expired or revoked links are kept this long before pruning.
pub const SHARE_LINK_RETENTION_DAYS: i64 = 7;

const SHARE_LINK_COLUMNS: &str = "id, public_id, token_hash, owner_email, site_url, label, \
     range_days, owner_refresh_token, expires_at, revoked_at, created_at";

/// A row from the `share_links` table.
#[derive(Clone, sqlx::FromRow)]
pub struct ShareLinkRow {
    pub id: i64,
    pub public_id: Uuid,
    pub token_hash: String,
    pub owner_email: String,
    pub site_url: String,
    pub label: Option<String>,
    pub range_days: i32,
    pub owner_refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShareLinkRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLinkRow")
            .field("id", &self.id)
            .field("public_id", &self.public_id)
            .field("owner_email", &self.owner_email)
            .field("site_url", &self.site_url)
            .field("label", &self.label)
            .field("range_days", &self.range_days)
            .field("owner_refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("revoked_at", &self.revoked_at)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl ShareLinkRow {
    /// Usable at `now`: not revoked and not past its expiry.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Clone)]
pub struct NewShareLink<'a> {
    pub owner_email: &'a str,
    pub site_url: &'a str,
    pub label: Option<&'a str>,
    pub range_days: i32,
    pub owner_refresh_token: &'a str,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Lowercase hex SHA-256 of a raw share token.
#[must_use]
pub fn hash_share_token(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

/// Stores a new link under the hash of `raw_token`.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] on a token hash collision, or
/// [`DbError::Sqlx`] for any other failure.
pub async fn create_share_link(
    pool: &PgPool,
    link: &NewShareLink<'_>,
    raw_token: &str,
) -> Result<ShareLinkRow, DbError> {
    let sql = format!(
        "INSERT INTO share_links \
         (public_id, token_hash, owner_email, site_url, label, range_days, \
          owner_refresh_token, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {SHARE_LINK_COLUMNS}"
    );
    sqlx::query_as::<_, ShareLinkRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(hash_share_token(raw_token))
        .bind(link.owner_email)
        .bind(link.site_url)
        .bind(link.label)
        .bind(link.range_days)
        .bind(link.owner_refresh_token)
        .bind(link.expires_at)
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::from_write(e, "share link"))
}

/// The owner's links that are neither revoked nor expired at `now`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_share_links(
    pool: &PgPool,
    owner_email: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ShareLinkRow>, DbError> {
    let sql = format!(
        "SELECT {SHARE_LINK_COLUMNS} FROM share_links \
         WHERE owner_email = $1 AND revoked_at IS NULL \
           AND (expires_at IS NULL OR expires_at > $2) \
         ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ShareLinkRow>(&sql)
        .bind(owner_email)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Looks up an active link by its raw token.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for unknown, revoked or expired tokens, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn resolve_share_link(
    pool: &PgPool,
    raw_token: &str,
    now: DateTime<Utc>,
) -> Result<ShareLinkRow, DbError> {
    let sql = format!(
        "SELECT {SHARE_LINK_COLUMNS} FROM share_links \
         WHERE token_hash = $1 AND revoked_at IS NULL \
           AND (expires_at IS NULL OR expires_at > $2)"
    );
    sqlx::query_as::<_, ShareLinkRow>(&sql)
        .bind(hash_share_token(raw_token))
        .bind(now)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Marks one of the owner's links revoked. Revoking twice is `NotFound`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when no unrevoked link with `public_id`
/// belongs to `owner_email`, or [`DbError::Sqlx`] if the update fails.
pub async fn revoke_share_link(
    pool: &PgPool,
    owner_email: &str,
    public_id: Uuid,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE share_links SET revoked_at = NOW() \
         WHERE public_id = $1 AND owner_email = $2 AND revoked_at IS NULL",
    )
    .bind(public_id)
    .bind(owner_email)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

const PRUNABLE_FILTER: &str = "(expires_at IS NOT NULL AND expires_at < $1) \
     OR (revoked_at IS NOT NULL AND revoked_at < $1)";

/// Number of links [`prune_share_links`] would delete for `cutoff`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_prunable_share_links(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<i64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM share_links WHERE {PRUNABLE_FILTER}");
    let count = sqlx::query_scalar::<_, i64>(&sql)
        .bind(cutoff)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Deletes links that expired or were revoked before `cutoff`. Returns the
/// number of rows removed.
///
/// Callers normally pass `now - SHARE_LINK_RETENTION_DAYS`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_share_links(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
    let sql = format!("DELETE FROM share_links WHERE {PRUNABLE_FILTER}");
    let result = sqlx::query(&sql).bind(cutoff).execute(pool).await?;
    Ok(result.rows_affected())
}
