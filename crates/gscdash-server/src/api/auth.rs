use axum::{
    extract::{Query, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{AppendHeaders, IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::session::{
    clear_oauth_state_cookie, clear_session_cookie, oauth_state_cookie, read_cookie,
    session_cookie, session_from_headers, state_matches, Session, OAUTH_STATE_COOKIE,
};

use super::{map_gsc_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct MeData {
    email: String,
    expires_at: Option<DateTime<Utc>>,
}

fn location_header(url: &str) -> HeaderValue {
    HeaderValue::from_str(url).unwrap_or(HeaderValue::from_static("/"))
}

/// GET /api/auth/login: redirect to Google's consent screen.
pub(super) async fn login(State(state): State<AppState>) -> Response {
    let oauth_state = Uuid::new_v4().simple().to_string();
    let location = state.oauth.authorize_url(&oauth_state);
    (
        StatusCode::FOUND,
        AppendHeaders([
            (LOCATION, location_header(&location)),
            (SET_COOKIE, oauth_state_cookie(&oauth_state, state.secure_cookies())),
        ]),
    )
        .into_response()
}

/// GET /api/auth/callback: finish the authorization-code flow and set the
/// session cookie.
pub(super) async fn callback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let rid = req_id.0;
    if let Some(error) = query.error.as_deref() {
        tracing::info!(error, "google authorization was not granted");
        return Err(ApiError::new(rid, "validation_error", "authorization was denied"));
    }
    let (Some(code), Some(given_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        return Err(ApiError::new(rid, "validation_error", "code and state are required"));
    };
    let expected = read_cookie(&headers, OAUTH_STATE_COOKIE).unwrap_or_default();
    if expected.is_empty() || !state_matches(expected, given_state) {
        return Err(ApiError::new(rid, "validation_error", "oauth state mismatch"));
    }

    let tokens = state
        .oauth
        .exchange_code(code)
        .await
        .map_err(|e| map_gsc_error(rid.clone(), &e, "failed to complete google sign-in"))?;
    let email = state
        .oauth
        .user_email(&tokens.access_token)
        .await
        .map_err(|e| map_gsc_error(rid.clone(), &e, "failed to complete google sign-in"))?;

    let session = Session::from_tokens(email, tokens, Utc::now().timestamp());
    let sealed = state.session_key.seal(&session).map_err(|e| {
        tracing::error!(error = %e, "failed to seal session");
        ApiError::new(rid.clone(), "internal_error", "failed to create session")
    })?;
    tracing::info!(email = %session.email, "user signed in");

    let secure = state.secure_cookies();
    let home = format!("{}/", state.config.public_base_url);
    Ok((
        StatusCode::FOUND,
        AppendHeaders([
            (LOCATION, location_header(&home)),
            (SET_COOKIE, session_cookie(&sealed, secure)),
            (SET_COOKIE, clear_oauth_state_cookie(secure)),
        ]),
    )
        .into_response())
}

/// POST /api/auth/logout: clear the session cookie.
pub(super) async fn logout(State(state): State<AppState>) -> Response {
    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies()))],
    )
        .into_response()
}

/// GET /api/auth/me: who is signed in.
pub(super) async fn me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MeData>>, ApiError> {
    let session = session_from_headers(&headers, &state.session_key)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "unauthorized", "sign in required"))?;

    Ok(Json(ApiResponse {
        data: MeData {
            email: session.email,
            expires_at: DateTime::from_timestamp(session.expires_at, 0),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
