//! Overview-card totals and period-over-period deltas.

use serde::Serialize;

use crate::momentum::MomentumInput;

/// Queries ranking at this position or better count towards the top-10 total.
const TOP10_POSITION: f64 = 10.0;

/// Clicks, impressions and average position for one Search Analytics row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricRow {
    pub clicks: u64,
    pub impressions: u64,
    pub position: f64,
}

/// Totals for one reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    pub query_count: u64,
    pub top10_count: u64,
}

impl PeriodSummary {
    /// Build a summary from the site totals row and the per-query rows.
    ///
    /// Search Console returns no totals row for a period without data; in
    /// that case clicks, impressions and an impression-weighted position are
    /// derived from the query rows instead.
    #[must_use]
    pub fn from_rows(totals: Option<&MetricRow>, query_rows: &[MetricRow]) -> Self {
        let totals = totals.copied().unwrap_or_else(|| sum_rows(query_rows));
        let query_count = query_rows.len() as u64;
        let top10_count = query_rows
            .iter()
            .filter(|r| r.position > 0.0 && r.position <= TOP10_POSITION)
            .count() as u64;

        Self {
            clicks: totals.clicks,
            impressions: totals.impressions,
            ctr: ctr(totals.clicks, totals.impressions),
            position: totals.position,
            query_count,
            top10_count,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn sum_rows(rows: &[MetricRow]) -> MetricRow {
    let clicks = rows.iter().map(|r| r.clicks).sum();
    let impressions: u64 = rows.iter().map(|r| r.impressions).sum();
    let weighted: f64 = rows
        .iter()
        .map(|r| r.position * r.impressions as f64)
        .sum();
    let position = if impressions > 0 {
        weighted / impressions as f64
    } else {
        0.0
    };
    MetricRow {
        clicks,
        impressions,
        position,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ctr(clicks: u64, impressions: u64) -> f64 {
    if impressions > 0 {
        clicks as f64 / impressions as f64
    } else {
        0.0
    }
}

/// Percentage change from `previous` to `current`.
///
/// A zero `previous` is replaced by 1 so the result stays finite.
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    let base = if previous == 0.0 { 1.0 } else { previous };
    (current - previous) / base * 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryDeltas {
    pub clicks_change_percent: f64,
    pub impressions_change_percent: f64,
    pub ctr_change_percent: f64,
    pub position_change_percent: f64,
    pub query_count_change_percent: f64,
    pub top10_change_percent: f64,
}

impl SummaryDeltas {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn between(current: &PeriodSummary, previous: &PeriodSummary) -> Self {
        Self {
            clicks_change_percent: percent_change(current.clicks as f64, previous.clicks as f64),
            impressions_change_percent: percent_change(
                current.impressions as f64,
                previous.impressions as f64,
            ),
            ctr_change_percent: percent_change(current.ctr, previous.ctr),
            position_change_percent: percent_change(current.position, previous.position),
            query_count_change_percent: percent_change(
                current.query_count as f64,
                previous.query_count as f64,
            ),
            top10_change_percent: percent_change(
                current.top10_count as f64,
                previous.top10_count as f64,
            ),
        }
    }

    #[must_use]
    pub fn momentum_input(&self) -> MomentumInput {
        MomentumInput {
            clicks_change_percent: Some(self.clicks_change_percent),
            position_change_percent: Some(self.position_change_percent),
            queries_change_percent: Some(self.query_count_change_percent),
            top10_change_percent: Some(self.top10_change_percent),
        }
    }
}
