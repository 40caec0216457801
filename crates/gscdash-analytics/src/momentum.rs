//! Momentum score: one number summarising period-over-period movement.

use serde::{Deserialize, Serialize};

const CLICKS_WEIGHT: f64 = 0.4;
const POSITION_WEIGHT: f64 = 0.3;
const QUERIES_WEIGHT: f64 = 0.2;
const TOP10_WEIGHT: f64 = 0.1;

const STRONG_ABOVE: f64 = 30.0;
const MODERATE_ABOVE: f64 = 10.0;
const DECLINING_BELOW: f64 = -10.0;

/// Percentage changes between the current and the previous period.
///
/// Missing or non-finite clicks / position / queries deltas count as zero.
/// A missing top-10 delta is handled by renormalising the other weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumInput {
    #[serde(default)]
    pub clicks_change_percent: Option<f64>,
    /// Change in average position. Positive means the position number grew,
    /// i.e. rankings got worse.
    #[serde(default)]
    pub position_change_percent: Option<f64>,
    #[serde(default)]
    pub queries_change_percent: Option<f64>,
    #[serde(default)]
    pub top10_change_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MomentumLabel {
    Strong,
    Moderate,
    Neutral,
    Declining,
}

impl MomentumLabel {
    fn from_score(score: f64) -> Self {
        if score > STRONG_ABOVE {
            Self::Strong
        } else if score > MODERATE_ABOVE {
            Self::Moderate
        } else if score < DECLINING_BELOW {
            Self::Declining
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MomentumResult {
    /// Weighted score in `[-100, 100]`.
    pub score: i32,
    pub label: MomentumLabel,
    pub subline: String,
}

/// Compute the momentum score for a set of deltas.
///
/// `score = (0.4·clicks + 0.3·(−position) + 0.2·queries + 0.1·top10) / w`
/// where `w` is `1.0`, or `0.9` when the top-10 delta is absent. The result
/// is clamped to `[-100, 100]` and rounded.
#[must_use]
pub fn momentum_score(input: &MomentumInput) -> MomentumResult {
    let clicks = finite_or_zero(input.clicks_change_percent);
    let position_improve = -finite_or_zero(input.position_change_percent);
    let queries = finite_or_zero(input.queries_change_percent);
    let top10 = input.top10_change_percent.filter(|v| v.is_finite());

    let mut weighted =
        CLICKS_WEIGHT * clicks + POSITION_WEIGHT * position_improve + QUERIES_WEIGHT * queries;
    let mut total_weight = 1.0;
    match top10 {
        Some(t) => weighted += TOP10_WEIGHT * t,
        None => total_weight -= TOP10_WEIGHT,
    }

    let clamped = (weighted / total_weight).clamp(-100.0, 100.0);
    let rounded = if clamped.is_nan() { 0.0 } else { clamped.round() };

    #[allow(clippy::cast_possible_truncation)]
    let score = rounded as i32;

    MomentumResult {
        score,
        label: MomentumLabel::from_score(rounded),
        subline: subline(input),
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn subline(input: &MomentumInput) -> String {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let mut parts = Vec::new();

    if let Some(c) = finite(input.clicks_change_percent) {
        parts.push(format!("Clicks {c:+.0}%"));
    }
    if let Some(p) = finite(input.position_change_percent) {
        let part = if p.round() == 0.0 {
            "Avg position steady".to_string()
        } else if p < 0.0 {
            format!("Avg position improved {:.0}%", p.abs())
        } else {
            format!("Avg position slipped {p:.0}%")
        };
        parts.push(part);
    }
    if let Some(q) = finite(input.queries_change_percent) {
        parts.push(format!("Queries {q:+.0}%"));
    }
    if let Some(t) = finite(input.top10_change_percent) {
        parts.push(format!("Top 10 {t:+.0}%"));
    }

    if parts.is_empty() {
        "Not enough data to compare periods".to_string()
    } else {
        parts.join(" · ")
    }
}
