use thiserror::Error;

/// Errors returned by the Google API clients.
#[derive(Debug, Error)]
pub enum GscError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google answered with a non-2xx status.
    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The OAuth token or userinfo endpoint rejected the request.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Search Analytics pagination did not finish within the page cap.
    #[error("search analytics for {site} exceeded {max_pages} pages")]
    PaginationLimit { site: String, max_pages: usize },
}

impl GscError {
    /// `true` when Google rejected the caller's credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GscError::Api { status: 401, .. })
    }
}
