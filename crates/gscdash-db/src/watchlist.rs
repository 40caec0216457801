//! Database operations for `index_watchlist`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `index_watchlist` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WatchlistRow {
    pub id: i64,
    pub public_id: Uuid,
    pub owner_email: String,
    pub site_url: String,
    pub page_url: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWatchlistEntry<'a> {
    pub owner_email: &'a str,
    pub site_url: &'a str,
    pub page_url: &'a str,
    pub note: Option<&'a str>,
}

/// Lists an owner's watched URLs, newest first, optionally for one site.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_watchlist(
    pool: &PgPool,
    owner_email: &str,
    site_url: Option<&str>,
) -> Result<Vec<WatchlistRow>, DbError> {
    let rows = sqlx::query_as::<_, WatchlistRow>(
        "SELECT id, public_id, owner_email, site_url, page_url, note, created_at \
         FROM index_watchlist \
         WHERE owner_email = $1 AND ($2::TEXT IS NULL OR site_url = $2) \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(owner_email)
    .bind(site_url)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Adds a URL to the owner's watchlist.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] when the owner already watches this URL on
/// this site, or [`DbError::Sqlx`] for any other failure.
pub async fn insert_watchlist_entry(
    pool: &PgPool,
    entry: &NewWatchlistEntry<'_>,
) -> Result<WatchlistRow, DbError> {
    sqlx::query_as::<_, WatchlistRow>(
        "INSERT INTO index_watchlist (public_id, owner_email, site_url, page_url, note) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, public_id, owner_email, site_url, page_url, note, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(entry.owner_email)
    .bind(entry.site_url)
    .bind(entry.page_url)
    .bind(entry.note)
    .fetch_one(pool)
    .await
    .map_err(|e| DbError::from_write(e, "watchlist entry"))
}

/// Removes one of the owner's entries.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when no entry with `public_id` belongs to
/// `owner_email`, or [`DbError::Sqlx`] if the delete fails.
pub async fn delete_watchlist_entry(
    pool: &PgPool,
    owner_email: &str,
    public_id: Uuid,
) -> Result<(), DbError> {
    let result =
        sqlx::query("DELETE FROM index_watchlist WHERE public_id = $1 AND owner_email = $2")
            .bind(public_id)
            .bind(owner_email)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
