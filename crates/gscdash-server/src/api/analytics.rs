use axum::{
    extract::{Query, State},
    Extension, Json,
};
use gscdash_analytics::{
    detect_conflicts, momentum_score, CannibalisationConflict, MetricRow, MomentumResult,
    PeriodSummary, QueryIntent, SummaryDeltas,
};
use gscdash_core::DateRange;
use gscdash_gsc::{Dimension, GscError, SearchAnalyticsRow, SearchConsoleClient};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::session::Session;

use super::{map_gsc_error, require_site_range, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_ROW_LIMIT: i64 = 100;
const MAX_ROW_LIMIT: i64 = 1_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RangeQuery {
    site: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PerformanceQuery {
    site: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    dimension: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct PeriodBlock {
    start_date: String,
    end_date: String,
    #[serde(flatten)]
    summary: PeriodSummary,
}

impl PeriodBlock {
    fn new(range: &DateRange, summary: PeriodSummary) -> Self {
        Self {
            start_date: range.start_str(),
            end_date: range.end_str(),
            summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OverviewData {
    pub site: String,
    pub current: PeriodBlock,
    pub previous: PeriodBlock,
    pub deltas: SummaryDeltas,
    pub momentum: MomentumResult,
}

#[derive(Debug, Serialize)]
pub(super) struct PerformanceRow {
    key: String,
    clicks: u64,
    impressions: u64,
    ctr: f64,
    position: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<QueryIntent>,
}

#[derive(Debug, Serialize)]
pub(super) struct PerformanceData {
    dimension: Dimension,
    rows: Vec<PerformanceRow>,
}

/// The cannibalisation route answers `{ conflicts, meta }` rather than the
/// usual `{ data, meta }` envelope.
#[derive(Debug, Serialize)]
pub(super) struct CannibalisationResponse {
    conflicts: Vec<CannibalisationConflict>,
    meta: ResponseMeta,
}

pub(super) fn normalize_row_limit(limit: Option<i64>) -> u32 {
    let clamped = limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT);
    u32::try_from(clamped).unwrap_or(1)
}

/// Current and previous period totals, their deltas and the momentum score.
/// `previous` is normally `range.previous_period()`.
pub(super) async fn build_overview(
    gsc: &SearchConsoleClient,
    access_token: &str,
    site: &str,
    range: &DateRange,
    previous: &DateRange,
) -> Result<OverviewData, GscError> {
    let (current_summary, previous_summary) = tokio::try_join!(
        period_summary(gsc, access_token, site, range),
        period_summary(gsc, access_token, site, previous),
    )?;

    let deltas = SummaryDeltas::between(&current_summary, &previous_summary);
    let momentum = momentum_score(&deltas.momentum_input());

    Ok(OverviewData {
        site: site.to_string(),
        current: PeriodBlock::new(range, current_summary),
        previous: PeriodBlock::new(previous, previous_summary),
        deltas,
        momentum,
    })
}

async fn period_summary(
    gsc: &SearchConsoleClient,
    access_token: &str,
    site: &str,
    range: &DateRange,
) -> Result<PeriodSummary, GscError> {
    let (totals, query_rows) = tokio::try_join!(
        gsc.totals(access_token, site, range),
        gsc.search_analytics(access_token, site, range, &[Dimension::Query]),
    )?;
    let metrics: Vec<MetricRow> = query_rows.iter().map(SearchAnalyticsRow::metrics).collect();
    Ok(PeriodSummary::from_rows(totals.as_ref(), &metrics))
}

/// GET /api/analytics/overview
pub(super) async fn overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<OverviewData>>, ApiError> {
    let rid = req_id.0;
    let (site, range) = require_site_range(
        &rid,
        query.site.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )?;

    let previous = range
        .previous_period()
        .map_err(|e| ApiError::new(rid.clone(), "validation_error", e.to_string()))?;

    let data = build_overview(&state.gsc, &session.access_token, &site, &range, &previous)
        .await
        .map_err(|e| map_gsc_error(rid.clone(), &e, "failed to fetch search analytics"))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(rid),
    }))
}

/// GET /api/analytics/performance
pub(super) async fn performance(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<ApiResponse<PerformanceData>>, ApiError> {
    let rid = req_id.0;
    let (site, range) = require_site_range(
        &rid,
        query.site.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )?;
    let dimension = match query.dimension.as_deref() {
        None => Dimension::Query,
        Some(raw) => Dimension::parse(raw).ok_or_else(|| {
            ApiError::new(
                rid.clone(),
                "validation_error",
                "dimension must be one of query, page, date, device, country",
            )
        })?,
    };
    let limit = normalize_row_limit(query.limit);

    let rows = state
        .gsc
        .query_rows(&session.access_token, &site, &range, dimension, limit)
        .await
        .map_err(|e| map_gsc_error(rid.clone(), &e, "failed to fetch search analytics"))?;

    let rows = rows
        .iter()
        .map(|row| {
            let key = row.keys.first().cloned().unwrap_or_default();
            let metrics = row.metrics();
            let intent =
                (dimension == Dimension::Query).then(|| state.classifier.classify(&site, &key));
            PerformanceRow {
                key,
                clicks: metrics.clicks,
                impressions: metrics.impressions,
                ctr: row.ctr,
                position: row.position,
                intent,
            }
        })
        .collect();

    Ok(Json(ApiResponse {
        data: PerformanceData { dimension, rows },
        meta: ResponseMeta::new(rid),
    }))
}

/// GET /api/analytics/cannibalisation
pub(super) async fn cannibalisation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<CannibalisationResponse>, ApiError> {
    let rid = req_id.0;
    let (site, range) = require_site_range(
        &rid,
        query.site.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )?;

    let pairs = state
        .gsc
        .query_page_pairs(&session.access_token, &site, &range)
        .await
        .map_err(|e| map_gsc_error(rid.clone(), &e, "failed to fetch search analytics"))?;
    let conflicts = detect_conflicts(&pairs);
    tracing::debug!(
        site = %site,
        rows = pairs.len(),
        conflicts = conflicts.len(),
        "cannibalisation computed"
    );

    Ok(Json(CannibalisationResponse {
        conflicts,
        meta: ResponseMeta::new(rid),
    }))
}
