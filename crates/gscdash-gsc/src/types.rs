//! Request and response shapes for the Search Console APIs.

use gscdash_analytics::{MetricRow, QueryPagePair};
use serde::{Deserialize, Serialize};

/// Search Analytics grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Query,
    Page,
    Date,
    Device,
    Country,
}

impl Dimension {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Query => "query",
            Dimension::Page => "page",
            Dimension::Date => "date",
            Dimension::Device => "device",
            Dimension::Country => "country",
        }
    }

    /// Parses a request value, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "query" => Some(Dimension::Query),
            "page" => Some(Dimension::Page),
            "date" => Some(Dimension::Date),
            "device" => Some(Dimension::Device),
            "country" => Some(Dimension::Country),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchAnalyticsRequest<'a> {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: &'a [Dimension],
    pub row_limit: u32,
    pub start_row: u32,
    #[serde(rename = "type")]
    pub search_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Vec<SearchAnalyticsRow>,
}

/// One row of a Search Analytics response.
///
/// `keys` holds one value per requested dimension, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAnalyticsRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

impl SearchAnalyticsRow {
    /// Clicks and impressions arrive as JSON numbers; they are whole counts.
    #[must_use]
    pub fn metrics(&self) -> MetricRow {
        MetricRow {
            clicks: to_count(self.clicks),
            impressions: to_count(self.impressions),
            position: self.position,
        }
    }

    /// Converts a `[query, page, ...]` row. Rows with fewer keys yield `None`.
    #[must_use]
    pub fn to_query_page_pair(&self) -> Option<QueryPagePair> {
        let [query, page, ..] = self.keys.as_slice() else {
            return None;
        };
        Some(QueryPagePair {
            query: query.clone(),
            page: page.clone(),
            impressions: to_count(self.impressions),
            clicks: to_count(self.clicks),
            position: self.position,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SitesResponse {
    #[serde(default)]
    pub site_entry: Vec<SiteEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    pub site_url: String,
    pub permission_level: String,
}

impl SiteEntry {
    /// Unverified properties are listed but cannot be queried.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.permission_level != "siteUnverifiedUser"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InspectionRequest<'a> {
    pub inspection_url: &'a str,
    pub site_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InspectionResponse {
    pub inspection_result: InspectionResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InspectionResult {
    pub inspection_result_link: Option<String>,
    pub index_status_result: Option<IndexStatus>,
}

/// Index coverage details for one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub verdict: Option<String>,
    pub coverage_state: Option<String>,
    pub robots_txt_state: Option<String>,
    pub indexing_state: Option<String>,
    pub page_fetch_state: Option<String>,
    pub last_crawl_time: Option<String>,
    pub google_canonical: Option<String>,
    pub user_canonical: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlInspection {
    pub url: String,
    pub result_link: Option<String>,
    pub status: IndexStatus,
}

impl UrlInspection {
    /// A URL is flagged when Google's verdict is anything other than `PASS`.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        self.status.verdict.as_deref() != Some("PASS")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorBody {
    pub error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorDetail {
    pub message: Option<String>,
}
