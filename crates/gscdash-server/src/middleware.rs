use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::session::{session_cookie, session_from_headers, Session};

/// Windows tracked before stale ones are swept.
const SWEEP_THRESHOLD: usize = 1024;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter with one window per caller.
///
/// Callers are keyed by session email when the session middleware has run,
/// otherwise by peer address.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `key`; `false` once the window is full.
    async fn admit(&self, key: String) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started_at) < self.window);
        }

        let window = windows.entry(key).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });
        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }

    #[cfg(test)]
    pub(crate) async fn tracked_windows(&self) -> usize {
        self.windows.lock().await.len()
    }
}

fn rate_limit_key(req: &Request) -> String {
    if let Some(session) = req.extensions().get::<Session>() {
        return format!("user:{}", session.email);
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "addr:unknown".to_string(), |ci| format!("addr:{}", ci.0.ip()))
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware requiring a valid session cookie.
///
/// The verified [`crate::session::Session`] is inserted into request
/// extensions. An access token within a minute of expiry is refreshed first
/// and the re-sealed cookie is appended to the response.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let rid = request_id_of(&req);
    let Some(session) = session_from_headers(req.headers(), &state.session_key) else {
        return ApiError::new(rid, "unauthorized", "sign in required").into_response();
    };

    let now = Utc::now().timestamp();
    let mut reissue = None;
    let session = if session.needs_refresh(now) {
        let Some(refresh_token) = session.refresh_token.clone() else {
            if session.is_expired(now) {
                return ApiError::new(rid, "unauthorized", "session expired").into_response();
            }
            req.extensions_mut().insert(session);
            return next.run(req).await;
        };
        match state.oauth.refresh(&refresh_token).await {
            Ok(tokens) => {
                let refreshed = session.refreshed(tokens, now);
                match state.session_key.seal(&refreshed) {
                    Ok(sealed) => reissue = Some(session_cookie(&sealed, state.secure_cookies())),
                    Err(e) => tracing::error!(error = %e, "failed to seal refreshed session"),
                }
                refreshed
            }
            Err(e) => {
                tracing::warn!(error = %e, email = %session.email, "access token refresh failed");
                return ApiError::new(rid, "unauthorized", "session expired").into_response();
            }
        }
    } else {
        session
    };

    req.extensions_mut().insert(session);
    let mut res = next.run(req).await;
    if let Some(cookie) = reissue {
        res.headers_mut().append(SET_COOKIE, cookie);
    }
    res
}

/// Middleware enforcing a fixed request-per-window limit per caller.
///
/// Layer it inside [`require_session`] so signed-in callers get their own
/// budget.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(&req);
    if !rate_limit.admit(key).await {
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }
    next.run(req).await
}
