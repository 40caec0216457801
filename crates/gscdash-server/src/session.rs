//! Signed session cookies.
//!
//! A cookie value is `base64url(json) "." base64url(mac)`, where the MAC is a
//! BLAKE3 keyed hash of the encoded payload. Tokens are signed, not
//! encrypted; the cookie is `HttpOnly` so page scripts never see them.

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gscdash_gsc::TokenSet;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

pub const SESSION_COOKIE: &str = "gscdash_session";
pub const OAUTH_STATE_COOKIE: &str = "gscdash_oauth_state";

/// 30 days.
pub const SESSION_MAX_AGE_SECS: i64 = 2_592_000;
const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

/// Access tokens this close to expiry are refreshed before use.
pub const REFRESH_LEEWAY_SECS: i64 = 60;

const KEY_CONTEXT: &str = "gscdash 2024-10 session cookie mac";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds at which `access_token` expires.
    pub expires_at: i64,
}

impl Session {
    #[must_use]
    pub fn from_tokens(email: String, tokens: TokenSet, now: i64) -> Self {
        Self {
            email,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: now.saturating_add(tokens.expires_in),
        }
    }

    #[must_use]
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.expires_at - now <= REFRESH_LEEWAY_SECS
    }

    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Applies a refresh result, keeping the current refresh token when
    /// Google did not issue a new one.
    #[must_use]
    pub fn refreshed(self, tokens: TokenSet, now: i64) -> Self {
        Self {
            email: self.email,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.or(self.refresh_token),
            expires_at: now.saturating_add(tokens.expires_in),
        }
    }
}

/// MAC key derived from `GSCDASH_SESSION_SECRET`.
#[derive(Clone)]
pub struct SessionKey([u8; 32]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([redacted])")
    }
}

impl SessionKey {
    #[must_use]
    pub fn derive(secret: &str) -> Self {
        Self(blake3::derive_key(KEY_CONTEXT, secret.as_bytes()))
    }

    fn mac(&self, payload: &str) -> blake3::Hash {
        blake3::keyed_hash(&self.0, payload.as_bytes())
    }

    /// Serializes and signs a session.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the session cannot be serialized.
    pub fn seal(&self, session: &Session) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(session)?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mac = URL_SAFE_NO_PAD.encode(self.mac(&payload).as_bytes());
        Ok(format!("{payload}.{mac}"))
    }

    /// Verifies and decodes a cookie value. Any malformed or forged value is
    /// `None`.
    #[must_use]
    pub fn open(&self, value: &str) -> Option<Session> {
        let (payload, mac) = value.split_once('.')?;
        let given = URL_SAFE_NO_PAD.decode(mac).ok()?;
        let expected = self.mac(payload);
        if !bool::from(expected.as_bytes().as_slice().ct_eq(given.as_slice())) {
            return None;
        }
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// First value of cookie `name` across all `Cookie` headers.
#[must_use]
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Verified session from the request's cookie, if any.
#[must_use]
pub fn session_from_headers(headers: &HeaderMap, key: &SessionKey) -> Option<Session> {
    read_cookie(headers, SESSION_COOKIE).and_then(|v| key.open(v))
}

fn cookie_header(name: &str, value: &str, path: &str, max_age: i64, secure: bool) -> HeaderValue {
    let mut cookie =
        format!("{name}={value}; HttpOnly; SameSite=Lax; Path={path}; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    // names and values are base64url, hex or empty
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[must_use]
pub fn session_cookie(sealed: &str, secure: bool) -> HeaderValue {
    cookie_header(SESSION_COOKIE, sealed, "/", SESSION_MAX_AGE_SECS, secure)
}

#[must_use]
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    cookie_header(SESSION_COOKIE, "", "/", 0, secure)
}

#[must_use]
pub fn oauth_state_cookie(state: &str, secure: bool) -> HeaderValue {
    cookie_header(
        OAUTH_STATE_COOKIE,
        state,
        "/api/auth",
        OAUTH_STATE_MAX_AGE_SECS,
        secure,
    )
}

#[must_use]
pub fn clear_oauth_state_cookie(secure: bool) -> HeaderValue {
    cookie_header(OAUTH_STATE_COOKIE, "", "/api/auth", 0, secure)
}

/// Constant-time string comparison for OAuth `state` values.
#[must_use]
pub fn state_matches(expected: &str, given: &str) -> bool {
    bool::from(expected.as_bytes().ct_eq(given.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            email: "owner@example.com".to_string(),
            access_token: "ya29.a".to_string(),
            refresh_token: Some("1//r".to_string()),
            expires_at: 1_700_000_000,
        }
    }

    fn key() -> SessionKey {
        SessionKey::derive("0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn seal_then_open_recovers_session() {
        let sealed = key().seal(&session()).unwrap();
        assert_eq!(key().open(&sealed), Some(session()));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let sealed = key().seal(&session()).unwrap();
        let (_, mac) = sealed.split_once('.').unwrap();
        let mut forged = session();
        forged.email = "attacker@example.com".to_string();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert_eq!(key().open(&format!("{forged_payload}.{mac}")), None);
    }

    #[test]
    fn other_secret_is_rejected() {
        let sealed = key().seal(&session()).unwrap();
        let other = SessionKey::derive("another-secret-that-is-32-bytes!!");
        assert_eq!(other.open(&sealed), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(key().open(""), None);
        assert_eq!(key().open("no-dot"), None);
        assert_eq!(key().open("a.b"), None);
    }

    #[test]
    fn refresh_window() {
        let s = session();
        assert!(!s.needs_refresh(s.expires_at - 61));
        assert!(s.needs_refresh(s.expires_at - 60));
        assert!(s.is_expired(s.expires_at));
    }

    #[test]
    fn refreshed_keeps_refresh_token_when_not_rotated() {
        let tokens = TokenSet {
            access_token: "ya29.b".to_string(),
            refresh_token: None,
            expires_in: 3600,
        };
        let s = session().refreshed(tokens, 100);
        assert_eq!(s.access_token, "ya29.b");
        assert_eq!(s.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(s.expires_at, 3700);
    }

    #[test]
    fn read_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; gscdash_session=abc.def; other=1"),
        );
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), Some("abc.def"));
        assert_eq!(read_cookie(&headers, OAUTH_STATE_COOKIE), None);
    }

    #[test]
    fn cookie_attributes_follow_environment() {
        let dev = session_cookie("v", false);
        let prod = session_cookie("v", true);
        let dev = dev.to_str().unwrap();
        assert!(dev.contains("HttpOnly"));
        assert!(dev.contains("SameSite=Lax"));
        assert!(dev.contains("Max-Age=2592000"));
        assert!(!dev.contains("Secure"));
        assert!(prod.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn state_comparison() {
        assert!(state_matches("abc", "abc"));
        assert!(!state_matches("abc", "abd"));
        assert!(!state_matches("abc", "ab"));
    }
}
