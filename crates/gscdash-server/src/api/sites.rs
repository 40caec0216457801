use axum::{extract::State, Extension, Json};
use gscdash_gsc::SiteEntry;

use crate::middleware::RequestId;
use crate::session::Session;

use super::{map_gsc_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// GET /api/sites: properties the signed-in user can read, sorted by URL.
pub(super) async fn list_sites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<SiteEntry>>>, ApiError> {
    let mut sites: Vec<SiteEntry> = state
        .gsc
        .list_sites(&session.access_token)
        .await
        .map_err(|e| map_gsc_error(req_id.0.clone(), &e, "failed to list sites"))?
        .into_iter()
        .filter(SiteEntry::is_readable)
        .collect();
    sites.sort_by(|a, b| a.site_url.cmp(&b.site_url));

    Ok(Json(ApiResponse {
        data: sites,
        meta: ResponseMeta::new(req_id.0),
    }))
}
