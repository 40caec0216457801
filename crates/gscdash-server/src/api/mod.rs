mod analytics;
mod auth;
mod insights;
mod keywords;
mod share_links;
mod sites;
mod watchlist;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use gscdash_analytics::QueryClassifier;
use gscdash_core::{AppConfig, DateRange};
use gscdash_gsc::{GoogleOAuthClient, GscError, OAuthConfig, SearchConsoleClient};
use gscdash_serprobot::SerpRobotClient;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_session, RateLimitState, RequestId,
};
use crate::session::SessionKey;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub gsc: SearchConsoleClient,
    pub oauth: GoogleOAuthClient,
    /// `None` when `SERPROBOT_API_KEY` is not configured.
    pub serprobot: Option<SerpRobotClient>,
    pub classifier: Arc<QueryClassifier>,
    pub session_key: SessionKey,
}

impl AppState {
    /// Builds the production clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be constructed.
    pub fn from_config(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let timeout = config.http_timeout_secs;
        let serprobot = config
            .serprobot_api_key
            .as_deref()
            .map(|key| SerpRobotClient::new(key, timeout))
            .transpose()?;
        if serprobot.is_none() {
            tracing::info!("SERPROBOT_API_KEY not set; keyword routes will answer 503");
        }

        Ok(Self {
            gsc: SearchConsoleClient::new(timeout)?,
            oauth: GoogleOAuthClient::new(OAuthConfig::from(config.as_ref()), timeout)?,
            serprobot,
            classifier: Arc::new(QueryClassifier::new(config.query_cache_capacity)),
            session_key: SessionKey::derive(&config.session_secret),
            pool,
            config,
        })
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.config.env.requires_secure_cookies()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "not_configured" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &gscdash_db::DbError) -> ApiError {
    match error {
        gscdash_db::DbError::NotFound => ApiError::new(request_id, "not_found", "not found"),
        gscdash_db::DbError::Duplicate(what) => {
            ApiError::new(request_id, "conflict", format!("{what} already exists"))
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Google rejecting the caller's token is a 401; anything else is an opaque
/// 502 carrying `message`.
pub(super) fn map_gsc_error(request_id: String, error: &GscError, message: &str) -> ApiError {
    if error.is_unauthorized() {
        tracing::warn!(error = %error, "google rejected access token");
        return ApiError::new(request_id, "unauthorized", "google session expired; sign in again");
    }
    tracing::error!(error = %error, "{message}");
    ApiError::new(request_id, "upstream_error", message)
}

/// Unwraps a JSON body, turning axum's rejection into a `validation_error`.
pub(super) fn parse_body<T>(
    request_id: &str,
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::new(request_id, "validation_error", e.body_text()))
}

/// Validates the `site` / `startDate` / `endDate` triple shared by the
/// analytics routes.
pub(super) fn require_site_range(
    request_id: &str,
    site: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<(String, DateRange), ApiError> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|s| !s.is_empty())
    }
    let (Some(site), Some(start), Some(end)) =
        (present(site), present(start_date), present(end_date))
    else {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "site, startDate and endDate are required",
        ));
    };
    let range = DateRange::parse(start, end)
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?;
    Ok((site.to_string(), range))
}

pub(super) fn require_param(
    request_id: &str,
    name: &str,
    value: Option<&str>,
) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ApiError::new(request_id, "validation_error", format!("{name} is required")))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(state: AppState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/sites", get(sites::list_sites))
        .route("/api/analytics/overview", get(analytics::overview))
        .route("/api/analytics/performance", get(analytics::performance))
        .route(
            "/api/analytics/cannibalisation",
            get(analytics::cannibalisation),
        )
        .route("/api/insights/momentum", post(insights::momentum))
        .route("/api/insights/footer", post(insights::footer))
        .route("/api/keywords", get(keywords::list_keywords))
        .route(
            "/api/watchlist",
            get(watchlist::list_watchlist).post(watchlist::create_entry),
        )
        .route("/api/watchlist/signals", get(watchlist::signals))
        .route("/api/watchlist/{id}", delete(watchlist::delete_entry))
        .route(
            "/api/share-links",
            get(share_links::list_share_links).post(share_links::create_share_link),
        )
        .route(
            "/api/share-links/{id}",
            delete(share_links::revoke_share_link),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(state, require_session))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
}

/// The public share view is limited per peer address.
fn shared_view_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/share/{token}", get(share_links::view_shared))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me));

    Router::new()
        .merge(public_routes)
        .merge(shared_view_router(rate_limit.clone()))
        .merge(protected_router(state.clone(), rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match gscdash_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests;
