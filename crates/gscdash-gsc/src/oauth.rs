//! Google OAuth 2.0 authorization-code flow.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::client::api_error;
use crate::error::GscError;

/// Scopes requested at consent time.
pub const GOOGLE_SCOPES: &str = "openid email https://www.googleapis.com/auth/webmasters.readonly";

#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl From<&gscdash_core::AppConfig> for OAuthConfig {
    fn from(config: &gscdash_core::AppConfig) -> Self {
        Self {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_url: config.oauth_redirect_url.clone(),
        }
    }
}

/// Google endpoint URLs; overridden in tests.
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }
}

/// Tokens returned by the token endpoint.
///
/// `refresh_token` is only present on the first exchange after consent.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: Client,
    config: OAuthConfig,
    endpoints: OAuthEndpoints,
}

impl GoogleOAuthClient {
    /// # Errors
    ///
    /// Returns [`GscError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: OAuthConfig, timeout_secs: u64) -> Result<Self, GscError> {
        Self::with_endpoints(config, OAuthEndpoints::default(), timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`GscError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`GscError::InvalidBaseUrl`] if the authorization URL does not parse.
    pub fn with_endpoints(
        config: OAuthConfig,
        endpoints: OAuthEndpoints,
        timeout_secs: u64,
    ) -> Result<Self, GscError> {
        Url::parse(&endpoints.auth_url).map_err(|e| GscError::InvalidBaseUrl {
            url: endpoints.auth_url.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("gscdash/0.1")
            .build()?;
        Ok(Self {
            client,
            config,
            endpoints,
        })
    }

    /// Consent URL carrying `state`, requesting offline access so Google
    /// issues a refresh token.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = match Url::parse(&self.endpoints.auth_url) {
            Ok(url) => url,
            // validated in the constructor
            Err(_) => return self.endpoints.auth_url.clone(),
        };
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("include_granted_scopes", "true")
            .append_pair("state", state);
        url.into()
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - [`GscError::OAuth`] when Google rejects the code.
    /// - [`GscError::Http`] on network failure.
    /// - [`GscError::Deserialize`] if the body does not match.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, GscError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", &self.config.redirect_url),
        ])
        .await
    }

    /// Obtains a fresh access token. The returned set carries the original
    /// refresh token when Google does not rotate it.
    ///
    /// # Errors
    ///
    /// Same as [`GoogleOAuthClient::exchange_code`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, GscError> {
        let mut tokens = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    /// Email address of the access token's owner.
    ///
    /// # Errors
    ///
    /// - [`GscError::Api`] on a non-2xx response.
    /// - [`GscError::OAuth`] if the account has no verified email.
    /// - [`GscError::Http`] / [`GscError::Deserialize`] as usual.
    pub async fn user_email(&self, access_token: &str) -> Result<String, GscError> {
        let response = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        let info: UserInfo = serde_json::from_str(&body).map_err(|e| GscError::Deserialize {
            context: "userinfo".to_string(),
            source: e,
        })?;
        match (info.email, info.email_verified) {
            (Some(email), Some(true) | None) if !email.trim().is_empty() => Ok(email),
            _ => Err(GscError::OAuth("account has no verified email".to_string())),
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, GscError> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorBody>(&body).map_or_else(
                |_| format!("token endpoint returned {status}"),
                |e| match e.error_description {
                    Some(desc) => format!("{}: {desc}", e.error),
                    None => e.error,
                },
            );
            return Err(GscError::OAuth(reason));
        }
        serde_json::from_str(&body).map_err(|e| GscError::Deserialize {
            context: "oauth token".to_string(),
            source: e,
        })
    }
}
