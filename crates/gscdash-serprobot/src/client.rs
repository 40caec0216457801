//! HTTP client for the SerpRobot API.
//!
//! The API is a single endpoint selected by `action`; the key travels as a
//! query parameter.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::SerpRobotError;
use crate::types::{parse_project, KeywordData};

const DEFAULT_BASE_URL: &str = "https://api.serprobot.com/v1/api.php";

#[derive(Clone)]
pub struct SerpRobotClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl std::fmt::Debug for SerpRobotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpRobotClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SerpRobotClient {
    /// # Errors
    ///
    /// Returns [`SerpRobotError::Http`] if the `reqwest::Client` cannot be
    /// built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, SerpRobotError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SerpRobotError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`SerpRobotError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SerpRobotError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("gscdash/0.1")
            .build()?;
        let base_url = Url::parse(base_url).map_err(|e| SerpRobotError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Fetches the tracked keywords of one project.
    ///
    /// # Errors
    ///
    /// - [`SerpRobotError::Api`] on a non-2xx status or an `error` body.
    /// - [`SerpRobotError::Http`] on network failure.
    /// - [`SerpRobotError::Deserialize`] if the body is not JSON.
    pub async fn project_keywords(&self, project_id: &str) -> Result<KeywordData, SerpRobotError> {
        let url = self.build_url("project", &[("project_id", project_id)]);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SerpRobotError::Api(format!("status {status}")));
        }
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| SerpRobotError::Deserialize {
                context: format!("project(project_id={project_id})"),
                source: e,
            })?;
        let data = parse_project(&value)?;
        if data == KeywordData::NoData {
            tracing::debug!(project_id, "serprobot project returned no keywords");
        }
        Ok(data)
    }

    fn build_url(&self, action: &str, extra: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            pairs.append_pair("action", action);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }
}
