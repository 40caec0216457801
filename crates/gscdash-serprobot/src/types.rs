//! Typed view of a SerpRobot project response.

use gscdash_analytics::KeywordDelta;
use serde::Serialize;
use serde_json::Value;

use crate::error::SerpRobotError;

/// One tracked keyword with its current and week-old ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedKeyword {
    pub keyword: String,
    pub url: Option<String>,
    pub position: Option<f64>,
    pub position_7d_ago: Option<f64>,
    /// `position - position_7d_ago`; positive means the keyword slipped.
    #[serde(rename = "delta7d")]
    pub delta_7d: Option<f64>,
}

impl TrackedKeyword {
    #[must_use]
    pub fn new(
        keyword: String,
        url: Option<String>,
        position: Option<f64>,
        position_7d_ago: Option<f64>,
    ) -> Self {
        let delta_7d = match (position, position_7d_ago) {
            (Some(now), Some(then)) => Some(now - then),
            _ => None,
        };
        Self {
            keyword,
            url,
            position,
            position_7d_ago,
            delta_7d,
        }
    }
}

/// Result of parsing a project response.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordData {
    Keywords(Vec<TrackedKeyword>),
    /// The project exists but has no keyword rows, or the body is not a
    /// project payload at all.
    NoData,
}

impl KeywordData {
    #[must_use]
    pub fn keywords(&self) -> &[TrackedKeyword] {
        match self {
            KeywordData::Keywords(k) => k,
            KeywordData::NoData => &[],
        }
    }

    /// Keywords with a known 7-day delta, as footer insight input.
    #[must_use]
    pub fn keyword_deltas(&self) -> Vec<KeywordDelta> {
        self.keywords()
            .iter()
            .filter_map(|k| {
                k.delta_7d.map(|delta_7d| KeywordDelta {
                    keyword: k.keyword.clone(),
                    delta_7d,
                })
            })
            .collect()
    }
}

/// Parses a `action=project` response body.
///
/// An `error` field is an API failure. A `keywords` array yields the rows
/// that carry a non-blank `keyword`; anything else is [`KeywordData::NoData`].
///
/// # Errors
///
/// Returns [`SerpRobotError::Api`] when the body carries an `error` message.
pub fn parse_project(body: &Value) -> Result<KeywordData, SerpRobotError> {
    if let Some(message) = body.get("error").and_then(error_message) {
        return Err(SerpRobotError::Api(message));
    }

    let Some(rows) = body.get("keywords").and_then(Value::as_array) else {
        return Ok(KeywordData::NoData);
    };

    let keywords: Vec<TrackedKeyword> = rows.iter().filter_map(parse_keyword).collect();
    if keywords.is_empty() {
        Ok(KeywordData::NoData)
    } else {
        Ok(KeywordData::Keywords(keywords))
    }
}

fn parse_keyword(row: &Value) -> Option<TrackedKeyword> {
    let keyword = row.get("keyword")?.as_str()?.trim();
    if keyword.is_empty() {
        return None;
    }
    let url = row
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(ToString::to_string);
    Some(TrackedKeyword::new(
        keyword.to_string(),
        url,
        row.get("position").and_then(parse_position),
        row.get("position_7d").and_then(parse_position),
    ))
}

/// Ranks arrive as numbers or numeric strings; `"-"`, `">100"` and zero mean
/// "not ranking".
fn parse_position(value: &Value) -> Option<f64> {
    let position = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (position.is_finite() && position > 0.0).then_some(position)
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(o) => o
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        Value::Bool(true) => Some("request rejected".to_string()),
        _ => None,
    }
}

/// Mean `delta7d` over keywords that have one.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn avg_rank_delta(keywords: &[TrackedKeyword]) -> Option<f64> {
    let deltas: Vec<f64> = keywords.iter().filter_map(|k| k.delta_7d).collect();
    if deltas.is_empty() {
        None
    } else {
        Some(deltas.iter().sum::<f64>() / deltas.len() as f64)
    }
}
