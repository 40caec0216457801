//! HTTP client for the Search Console Search Analytics and URL Inspection APIs.
//!
//! Every call takes the caller's OAuth access token; the client itself holds
//! no credentials. Non-2xx responses are surfaced as [`GscError::Api`] with
//! the message from Google's error envelope.

use std::time::Duration;

use gscdash_analytics::{MetricRow, QueryPagePair};
use gscdash_core::DateRange;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::GscError;
use crate::types::{
    Dimension, GoogleErrorBody, InspectionRequest, InspectionResponse, SearchAnalyticsRequest,
    SearchAnalyticsResponse, SearchAnalyticsRow, SiteEntry, SitesResponse, UrlInspection,
};

const DEFAULT_WEBMASTERS_URL: &str = "https://www.googleapis.com/webmasters/v3/";
const DEFAULT_INSPECTION_URL: &str = "https://searchconsole.googleapis.com/v1/";

/// Largest `rowLimit` the Search Analytics API accepts.
pub const MAX_ROW_LIMIT: u32 = 25_000;

/// Upper bound on `startRow` pages fetched for one query.
pub const MAX_PAGES: usize = 20;

/// Dimensions for cannibalisation input. `date` keeps one row per day so
/// position volatility can be measured.
const PAIR_DIMENSIONS: &[Dimension] = &[Dimension::Query, Dimension::Page, Dimension::Date];

/// Client for the Search Console APIs.
///
/// Use [`SearchConsoleClient::new`] for production or
/// [`SearchConsoleClient::with_base_urls`] to point at a mock server.
#[derive(Clone)]
pub struct SearchConsoleClient {
    client: Client,
    webmasters_url: Url,
    inspection_url: Url,
    row_limit: u32,
}

impl SearchConsoleClient {
    /// # Errors
    ///
    /// Returns [`GscError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64) -> Result<Self, GscError> {
        Self::with_base_urls(timeout_secs, DEFAULT_WEBMASTERS_URL, DEFAULT_INSPECTION_URL)
    }

    /// # Errors
    ///
    /// Returns [`GscError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`GscError::InvalidBaseUrl`] if either URL does not parse.
    pub fn with_base_urls(
        timeout_secs: u64,
        webmasters_url: &str,
        inspection_url: &str,
    ) -> Result<Self, GscError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("gscdash/0.1")
            .build()?;

        Ok(Self {
            client,
            webmasters_url: parse_base(webmasters_url)?,
            inspection_url: parse_base(inspection_url)?,
            row_limit: MAX_ROW_LIMIT,
        })
    }

    /// Overrides the page size used when paginating Search Analytics results.
    #[must_use]
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit.clamp(1, MAX_ROW_LIMIT);
        self
    }

    /// Lists the Search Console properties the token's owner can see.
    ///
    /// # Errors
    ///
    /// - [`GscError::Api`] on a non-2xx response.
    /// - [`GscError::Http`] on network failure.
    /// - [`GscError::Deserialize`] if the body does not match.
    pub async fn list_sites(&self, access_token: &str) -> Result<Vec<SiteEntry>, GscError> {
        let url = self.webmasters_endpoint("sites")?;
        let request = self.client.get(url).bearer_auth(access_token);
        let body: SitesResponse = Self::send(request, "sites.list").await?;
        Ok(body.site_entry)
    }

    /// Fetches every `(query, page, date)` row in `range` as cannibalisation
    /// input. All pages are fetched or the call fails.
    ///
    /// # Errors
    ///
    /// See [`SearchConsoleClient::search_analytics`].
    pub async fn query_page_pairs(
        &self,
        access_token: &str,
        site: &str,
        range: &DateRange,
    ) -> Result<Vec<QueryPagePair>, GscError> {
        let rows = self
            .search_analytics(access_token, site, range, PAIR_DIMENSIONS)
            .await?;
        Ok(rows
            .iter()
            .filter_map(SearchAnalyticsRow::to_query_page_pair)
            .collect())
    }

    /// Site-level totals for `range`. `None` when Google has no data.
    ///
    /// # Errors
    ///
    /// See [`SearchConsoleClient::search_analytics`].
    pub async fn totals(
        &self,
        access_token: &str,
        site: &str,
        range: &DateRange,
    ) -> Result<Option<MetricRow>, GscError> {
        let rows = self
            .fetch_page(access_token, site, range, &[], 1, 0)
            .await?;
        Ok(rows.first().map(SearchAnalyticsRow::metrics))
    }

    /// One page of rows grouped by `dimension`, at most `limit` long.
    ///
    /// # Errors
    ///
    /// See [`SearchConsoleClient::search_analytics`].
    pub async fn query_rows(
        &self,
        access_token: &str,
        site: &str,
        range: &DateRange,
        dimension: Dimension,
        limit: u32,
    ) -> Result<Vec<SearchAnalyticsRow>, GscError> {
        let limit = limit.clamp(1, MAX_ROW_LIMIT);
        self.fetch_page(access_token, site, range, &[dimension], limit, 0)
            .await
    }

    /// Runs a Search Analytics query, following `startRow` pagination until a
    /// short page is returned.
    ///
    /// # Errors
    ///
    /// - [`GscError::Api`] on a non-2xx response.
    /// - [`GscError::Http`] on network failure.
    /// - [`GscError::Deserialize`] if a page does not match.
    /// - [`GscError::PaginationLimit`] if [`MAX_PAGES`] pages are all full.
    pub async fn search_analytics(
        &self,
        access_token: &str,
        site: &str,
        range: &DateRange,
        dimensions: &[Dimension],
    ) -> Result<Vec<SearchAnalyticsRow>, GscError> {
        let mut rows = Vec::new();
        for page in 0..MAX_PAGES {
            let start_row = u32::try_from(rows.len()).unwrap_or(u32::MAX);
            let batch = self
                .fetch_page(access_token, site, range, dimensions, self.row_limit, start_row)
                .await?;
            let short = batch.len() < self.row_limit as usize;
            rows.extend(batch);
            if short {
                tracing::debug!(
                    site,
                    pages = page + 1,
                    rows = rows.len(),
                    "search analytics fetched"
                );
                return Ok(rows);
            }
        }
        Err(GscError::PaginationLimit {
            site: site.to_string(),
            max_pages: MAX_PAGES,
        })
    }

    /// Inspects one URL's index status within `site`.
    ///
    /// # Errors
    ///
    /// - [`GscError::Api`] on a non-2xx response.
    /// - [`GscError::Http`] on network failure.
    /// - [`GscError::Deserialize`] if the body does not match.
    pub async fn inspect_url(
        &self,
        access_token: &str,
        site: &str,
        page_url: &str,
    ) -> Result<UrlInspection, GscError> {
        let url = join(&self.inspection_url, "urlInspection/index:inspect")?;
        let request = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&InspectionRequest {
                inspection_url: page_url,
                site_url: site,
            });
        let context = format!("urlInspection({page_url})");
        let body: InspectionResponse = Self::send(request, &context).await?;

        Ok(UrlInspection {
            url: page_url.to_string(),
            result_link: body.inspection_result.inspection_result_link,
            status: body.inspection_result.index_status_result.unwrap_or_default(),
        })
    }

    async fn fetch_page(
        &self,
        access_token: &str,
        site: &str,
        range: &DateRange,
        dimensions: &[Dimension],
        row_limit: u32,
        start_row: u32,
    ) -> Result<Vec<SearchAnalyticsRow>, GscError> {
        let path = format!("sites/{}/searchAnalytics/query", encode_site(site));
        let url = self.webmasters_endpoint(&path)?;
        let payload = SearchAnalyticsRequest {
            start_date: range.start_str(),
            end_date: range.end_str(),
            dimensions,
            row_limit,
            start_row,
            search_type: "web",
        };
        let request = self.client.post(url).bearer_auth(access_token).json(&payload);
        let context = format!("searchAnalytics({site}, startRow={start_row})");
        let body: SearchAnalyticsResponse = Self::send(request, &context).await?;
        Ok(body.rows)
    }

    fn webmasters_endpoint(&self, path: &str) -> Result<Url, GscError> {
        join(&self.webmasters_url, path)
    }

    async fn send<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, GscError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| GscError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}

/// Builds a [`GscError::Api`] from a Google error envelope, falling back to
/// the raw body when it is not one.
pub(crate) fn api_error(status: u16, body: &str) -> GscError {
    let message = serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.chars().take(200).collect());
    GscError::Api { status, message }
}

/// Percent-encodes a property identifier (`sc-domain:x` or a URL prefix) so
/// it fits in one path segment.
fn encode_site(site: &str) -> String {
    utf8_percent_encode(site, NON_ALPHANUMERIC).to_string()
}

fn parse_base(raw: &str) -> Result<Url, GscError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| GscError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn join(base: &Url, path: &str) -> Result<Url, GscError> {
    base.join(path).map_err(|e| GscError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}
