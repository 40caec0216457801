use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use gscdash_core::DateRange;
use gscdash_db::{NewShareLink, ShareLinkRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::session::Session;

use super::analytics::{build_overview, OverviewData};
use super::{
    map_db_error, map_gsc_error, parse_body, require_param, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

const DEFAULT_RANGE_DAYS: i32 = 28;
const MAX_RANGE_DAYS: i32 = 480;
const MAX_EXPIRES_IN_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub(super) struct CreateShareLinkRequest {
    site: String,
    label: Option<String>,
    range_days: Option<i32>,
    expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ShareLinkItem {
    id: Uuid,
    site: String,
    label: Option<String>,
    range_days: i32,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ShareLinkRow> for ShareLinkItem {
    fn from(row: ShareLinkRow) -> Self {
        Self {
            id: row.public_id,
            site: row.site_url,
            label: row.label,
            range_days: row.range_days,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Returned once on creation; the raw token is not recoverable afterwards.
#[derive(Debug, Serialize)]
pub(super) struct CreatedShareLink {
    token: String,
    url: String,
    #[serde(flatten)]
    link: ShareLinkItem,
}

#[derive(Debug, Serialize)]
pub(super) struct SharedView {
    label: Option<String>,
    range_days: i32,
    overview: OverviewData,
}

fn new_share_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub(super) fn validate_range_days(request_id: &str, value: Option<i32>) -> Result<i32, ApiError> {
    let days = value.unwrap_or(DEFAULT_RANGE_DAYS);
    if !(1..=MAX_RANGE_DAYS).contains(&days) {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("range_days must be between 1 and {MAX_RANGE_DAYS}"),
        ));
    }
    Ok(days)
}

pub(super) fn expiry_from(
    request_id: &str,
    expires_in_days: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    match expires_in_days {
        None => Ok(None),
        Some(days) if (1..=MAX_EXPIRES_IN_DAYS).contains(&days) => {
            Ok(Some(now + Duration::days(days)))
        }
        Some(_) => Err(ApiError::new(
            request_id,
            "validation_error",
            format!("expires_in_days must be between 1 and {MAX_EXPIRES_IN_DAYS}"),
        )),
    }
}

/// GET /api/share-links
pub(super) async fn list_share_links(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<ShareLinkItem>>>, ApiError> {
    let rows = gscdash_db::list_active_share_links(&state.pool, &session.email, Utc::now())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ShareLinkItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/share-links
pub(super) async fn create_share_link(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    body: Result<Json<CreateShareLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedShareLink>>), ApiError> {
    let rid = &req_id.0;
    let body = parse_body(rid, body)?;

    let site = require_param(rid, "site", Some(body.site.as_str()))?;
    let range_days = validate_range_days(rid, body.range_days)?;
    let expires_at = expiry_from(rid, body.expires_in_days, Utc::now())?;
    let label = body.label.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let Some(refresh_token) = session.refresh_token.as_deref() else {
        return Err(ApiError::new(
            rid.clone(),
            "validation_error",
            "session has no refresh token; sign in again to create share links",
        ));
    };

    let token = new_share_token();
    let row = gscdash_db::create_share_link(
        &state.pool,
        &NewShareLink {
            owner_email: &session.email,
            site_url: &site,
            label,
            range_days,
            owner_refresh_token: refresh_token,
            expires_at,
        },
        &token,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;
    tracing::info!(
        email = %session.email,
        site = %site,
        link = %row.public_id,
        "share link created"
    );

    let url = format!("{}/share/{token}", state.config.public_base_url);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CreatedShareLink {
                token,
                url,
                link: row.into(),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// DELETE /api/share-links/{id}
pub(super) async fn revoke_share_link(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let public_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::new(req_id.0.clone(), "not_found", "share link not found"))?;
    gscdash_db::revoke_share_link(&state.pool, &session.email, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/share/{token}: public read-only overview for the link's rolling
/// window, fetched with the owner's credentials.
pub(super) async fn view_shared(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<SharedView>>, ApiError> {
    let rid = req_id.0;
    let now = Utc::now();
    let link = gscdash_db::resolve_share_link(&state.pool, &token, now)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let days = u32::try_from(link.range_days).unwrap_or(1);
    let range = DateRange::trailing(days, now.date_naive())
        .map_err(|e| ApiError::new(rid.clone(), "internal_error", e.to_string()))?;
    let previous = range
        .previous_period()
        .map_err(|e| ApiError::new(rid.clone(), "internal_error", e.to_string()))?;

    let tokens = state
        .oauth
        .refresh(&link.owner_refresh_token)
        .await
        .map_err(|e| {
            tracing::warn!(
                error = %e,
                link = %link.public_id,
                "share link owner token refresh failed"
            );
            ApiError::new(rid.clone(), "upstream_error", "shared report is unavailable")
        })?;

    let overview = build_overview(
        &state.gsc,
        &tokens.access_token,
        &link.site_url,
        &range,
        &previous,
    )
    .await
    .map_err(|e| {
        let err = map_gsc_error(rid.clone(), &e, "failed to fetch search analytics");
        if err.error.code == "unauthorized" {
            ApiError::new(rid.clone(), "upstream_error", "shared report is unavailable")
        } else {
            err
        }
    })?;

    Ok(Json(ApiResponse {
        data: SharedView {
            label: link.label,
            range_days: link.range_days,
            overview,
        },
        meta: ResponseMeta::new(rid),
    }))
}
