//! Footer insight: the single most telling signal for the dashboard footer.
//!
//! Signals are checked in a fixed priority order and the first one that
//! clears its threshold wins. Rank deltas follow rank-tracker convention:
//! a positive delta means the position number grew, so the keyword lost
//! ground.

use serde::{Deserialize, Serialize};

const TRAFFIC_THRESHOLD_PCT: f64 = 10.0;
const AVG_RANK_THRESHOLD: f64 = 0.5;
const KEYWORD_THRESHOLD: f64 = 0.8;
const FLAT_CLICKS_PCT: f64 = 5.0;
const MAX_SENTENCE_CHARS: usize = 110;

const UP: char = '▲';
const DOWN: char = '▼';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDelta {
    pub keyword: String,
    #[serde(rename = "delta7d")]
    pub delta_7d: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterInsightInput {
    pub clicks_change_percent: f64,
    pub impressions_change_percent: f64,
    #[serde(default)]
    pub avg_tracked_rank_delta: Option<f64>,
    #[serde(default)]
    pub keywords: Vec<KeywordDelta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantSignal {
    KeywordTraffic,
    TrafficOnly,
    KeywordOnly,
    AvgRankOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredInsight {
    pub dominant: DominantSignal,
    pub sentence: String,
    /// The keyword the sentence is about, when it names one.
    pub keyword: Option<String>,
}

/// Which rank movement a sentence refers to.
enum RankSignal<'a> {
    Keyword(&'a KeywordDelta),
    Average(f64),
}

/// Pick the dominant footer signal, or `None` when nothing is notable.
#[must_use]
pub fn select_footer_insight(input: &FooterInsightInput) -> Option<StructuredInsight> {
    let clicks = finite(input.clicks_change_percent);
    let impressions = finite(input.impressions_change_percent);
    let avg_rank = input.avg_tracked_rank_delta.filter(|d| d.is_finite());
    let largest = largest_keyword(&input.keywords);

    let has_traffic = clicks.abs().max(impressions.abs()) >= TRAFFIC_THRESHOLD_PCT;
    let has_avg_rank = avg_rank.is_some_and(|d| d.abs() >= AVG_RANK_THRESHOLD);
    let has_keyword = largest.is_some_and(|k| k.delta_7d.abs() >= KEYWORD_THRESHOLD);
    let clicks_flat = clicks.abs() < FLAT_CLICKS_PCT;

    let rank_signal = match (largest, avg_rank) {
        (Some(k), _) if has_keyword => Some(RankSignal::Keyword(k)),
        (_, Some(d)) if has_avg_rank => Some(RankSignal::Average(d)),
        _ => None,
    };

    let aligned = rank_signal.as_ref().is_some_and(|signal| {
        let delta = match signal {
            RankSignal::Keyword(k) => k.delta_7d,
            RankSignal::Average(d) => *d,
        };
        (delta > 0.0 && clicks < -FLAT_CLICKS_PCT) || (delta < 0.0 && clicks > FLAT_CLICKS_PCT)
    });

    let (dominant, sentence, keyword) = match rank_signal {
        Some(signal) if has_traffic && aligned => {
            let (sentence, keyword) = match signal {
                RankSignal::Keyword(k) => (
                    format!(
                        "\"{}\" {} {} positions this week as clicks {} {}.",
                        k.keyword,
                        rank_arrow(k.delta_7d),
                        positions(k.delta_7d),
                        traffic_arrow(clicks),
                        percent(clicks),
                    ),
                    Some(k.keyword.clone()),
                ),
                RankSignal::Average(d) => (
                    format!(
                        "Tracked keywords {} {} positions on average as clicks {} {}.",
                        rank_arrow(d),
                        positions(d),
                        traffic_arrow(clicks),
                        percent(clicks),
                    ),
                    None,
                ),
            };
            (DominantSignal::KeywordTraffic, sentence, keyword)
        }
        _ if has_traffic => (
            DominantSignal::TrafficOnly,
            format!(
                "Clicks {} {} and impressions {} {} vs the previous period.",
                traffic_arrow(clicks),
                percent(clicks),
                traffic_arrow(impressions),
                percent(impressions),
            ),
            None,
        ),
        _ => match largest {
            Some(k) if has_keyword && clicks_flat => (
                DominantSignal::KeywordOnly,
                format!(
                    "\"{}\" {} {} positions this week while clicks held steady.",
                    k.keyword,
                    rank_arrow(k.delta_7d),
                    positions(k.delta_7d),
                ),
                Some(k.keyword.clone()),
            ),
            _ => match avg_rank {
                Some(d) if has_avg_rank => (
                    DominantSignal::AvgRankOnly,
                    format!(
                        "Tracked keywords {} {} positions on average this week.",
                        rank_arrow(d),
                        positions(d),
                    ),
                    None,
                ),
                _ => return None,
            },
        },
    };

    Some(StructuredInsight {
        dominant,
        sentence: truncate_sentence(&sentence),
        keyword,
    })
}

/// Keyword with the largest absolute 7-day move; the first one wins ties.
fn largest_keyword(keywords: &[KeywordDelta]) -> Option<&KeywordDelta> {
    keywords
        .iter()
        .filter(|k| k.delta_7d.is_finite())
        .fold(None, |best: Option<&KeywordDelta>, k| match best {
            Some(b) if b.delta_7d.abs() >= k.delta_7d.abs() => Some(b),
            _ => Some(k),
        })
}

fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn traffic_arrow(change_pct: f64) -> char {
    if change_pct >= 0.0 {
        UP
    } else {
        DOWN
    }
}

/// Rank deltas are inverted: a smaller position number is an improvement.
fn rank_arrow(delta: f64) -> char {
    if delta <= 0.0 {
        UP
    } else {
        DOWN
    }
}

fn percent(change_pct: f64) -> String {
    format!("{:.0}%", change_pct.abs())
}

fn positions(delta: f64) -> String {
    format!("{:.1}", delta.abs())
}

/// Cap a sentence at [`MAX_SENTENCE_CHARS`] characters, keeping the final period.
fn truncate_sentence(sentence: &str) -> String {
    if sentence.chars().count() <= MAX_SENTENCE_CHARS {
        return sentence.to_string();
    }
    let head: String = sentence.chars().take(MAX_SENTENCE_CHARS - 1).collect();
    let mut out = head
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | '"'))
        .to_string();
    out.push('.');
    out
}
