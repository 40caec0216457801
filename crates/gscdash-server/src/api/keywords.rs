use axum::{
    extract::{Query, State},
    Extension, Json,
};
use gscdash_analytics::KeywordDelta;
use gscdash_serprobot::{avg_rank_delta, TrackedKeyword};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{require_param, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct KeywordsQuery {
    project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct KeywordsData {
    keywords: Vec<TrackedKeyword>,
    avg_rank_delta: Option<f64>,
    /// Keywords with a known 7-day delta, shaped for `/api/insights/footer`.
    footer_keywords: Vec<KeywordDelta>,
}

/// GET /api/keywords?projectId
pub(super) async fn list_keywords(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<KeywordsQuery>,
) -> Result<Json<ApiResponse<KeywordsData>>, ApiError> {
    let rid = req_id.0;
    let Some(client) = state.serprobot.as_ref() else {
        return Err(ApiError::new(
            rid,
            "not_configured",
            "keyword tracking is not configured",
        ));
    };
    let project_id = require_param(&rid, "projectId", query.project_id.as_deref())?;

    let data = client.project_keywords(&project_id).await.map_err(|e| {
        tracing::error!(error = %e, project_id = %project_id, "serprobot request failed");
        ApiError::new(rid.clone(), "upstream_error", "failed to fetch tracked keywords")
    })?;

    let keywords = data.keywords().to_vec();
    Ok(Json(ApiResponse {
        data: KeywordsData {
            avg_rank_delta: avg_rank_delta(&keywords),
            footer_keywords: data.keyword_deltas(),
            keywords,
        },
        meta: ResponseMeta::new(rid),
    }))
}
