use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use gscdash_db::{NewWatchlistEntry, WatchlistRow};
use gscdash_gsc::IndexStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::session::Session;

use super::{
    map_db_error, map_gsc_error, parse_body, require_param, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

const MAX_NOTE_LEN: usize = 500;

#[derive(Debug, Deserialize)]
pub(super) struct SiteQuery {
    site: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateWatchlistRequest {
    site: String,
    page_url: String,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct WatchlistItem {
    id: Uuid,
    site: String,
    page_url: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WatchlistRow> for WatchlistItem {
    fn from(row: WatchlistRow) -> Self {
        Self {
            id: row.public_id,
            site: row.site_url,
            page_url: row.page_url,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SignalItem {
    id: Uuid,
    page_url: String,
    needs_attention: bool,
    inspection_link: Option<String>,
    #[serde(flatten)]
    status: IndexStatus,
}

/// GET /api/watchlist?site
pub(super) async fn list_watchlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Query(query): Query<SiteQuery>,
) -> Result<Json<ApiResponse<Vec<WatchlistItem>>>, ApiError> {
    let site = query.site.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let rows = gscdash_db::list_watchlist(&state.pool, &session.email, site)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(WatchlistItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/watchlist
pub(super) async fn create_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    body: Result<Json<CreateWatchlistRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<WatchlistItem>>), ApiError> {
    let rid = &req_id.0;
    let body = parse_body(rid, body)?;

    let site = require_param(rid, "site", Some(body.site.as_str()))?;
    let page_url = require_param(rid, "page_url", Some(body.page_url.as_str()))?;
    if !(page_url.starts_with("https://") || page_url.starts_with("http://")) {
        return Err(ApiError::new(
            rid.clone(),
            "validation_error",
            "page_url must be an absolute http(s) URL",
        ));
    }
    let note = body.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if note.is_some_and(|n| n.chars().count() > MAX_NOTE_LEN) {
        return Err(ApiError::new(
            rid.clone(),
            "validation_error",
            format!("note must be at most {MAX_NOTE_LEN} characters"),
        ));
    }

    let row = gscdash_db::insert_watchlist_entry(
        &state.pool,
        &NewWatchlistEntry {
            owner_email: &session.email,
            site_url: &site,
            page_url: &page_url,
            note,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// DELETE /api/watchlist/{id}
pub(super) async fn delete_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let public_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::new(req_id.0.clone(), "not_found", "watchlist entry not found"))?;
    gscdash_db::delete_watchlist_entry(&state.pool, &session.email, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/watchlist/signals?site: URL Inspection results for each watched
/// URL, fetched with bounded concurrency and returned in watchlist order.
pub(super) async fn signals(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Query(query): Query<SiteQuery>,
) -> Result<Json<ApiResponse<Vec<SignalItem>>>, ApiError> {
    let rid = req_id.0;
    let site = require_param(&rid, "site", query.site.as_deref())?;
    let rows = gscdash_db::list_watchlist(&state.pool, &session.email, Some(&site))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let concurrency = state.config.watchlist_concurrency.max(1);
    let gsc = &state.gsc;
    let token = session.access_token.as_str();
    let site_ref = site.as_str();

    let items: Vec<SignalItem> = stream::iter(rows)
        .map(|row| async move {
            let inspection = gsc.inspect_url(token, site_ref, &row.page_url).await?;
            Ok::<_, gscdash_gsc::GscError>(SignalItem {
                id: row.public_id,
                needs_attention: inspection.needs_attention(),
                page_url: inspection.url,
                inspection_link: inspection.result_link,
                status: inspection.status,
            })
        })
        .buffered(concurrency)
        .try_collect()
        .await
        .map_err(|e| map_gsc_error(rid.clone(), &e, "failed to inspect watched urls"))?;

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(rid),
    }))
}
