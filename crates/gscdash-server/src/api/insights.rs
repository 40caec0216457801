use axum::{extract::rejection::JsonRejection, Extension, Json};
use gscdash_analytics::{
    momentum_score, select_footer_insight, FooterInsightInput, MomentumInput, MomentumResult,
    StructuredInsight,
};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{parse_body, ApiError, ApiResponse, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct FooterData {
    insight: Option<StructuredInsight>,
}

/// POST /api/insights/momentum
pub(super) async fn momentum(
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<MomentumInput>, JsonRejection>,
) -> Result<Json<ApiResponse<MomentumResult>>, ApiError> {
    let input = parse_body(&req_id.0, body)?;
    Ok(Json(ApiResponse {
        data: momentum_score(&input),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/insights/footer: `insight` is `null` when no signal clears its
/// threshold.
pub(super) async fn footer(
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<FooterInsightInput>, JsonRejection>,
) -> Result<Json<ApiResponse<FooterData>>, ApiError> {
    let input = parse_body(&req_id.0, body)?;
    Ok(Json(ApiResponse {
        data: FooterData {
            insight: select_footer_insight(&input),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
