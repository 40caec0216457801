use thiserror::Error;

/// Errors returned by the SerpRobot client.
#[derive(Debug, Error)]
pub enum SerpRobotError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SerpRobot answered with a non-2xx status or an `error` field.
    #[error("SerpRobot API error: {0}")]
    Api(String),

    /// The response body was not JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
