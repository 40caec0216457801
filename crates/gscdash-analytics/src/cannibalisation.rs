//! Keyword cannibalisation detection.
//!
//! A query is a conflict when two or more pages of the same site collect
//! impressions for it. Conflicts are scored so that wide exposure, unstable
//! rankings and many competing URLs all push a query up the list:
//!
//! ```text
//! score = impressions * (1 + volatility) * (1 + (urls - 1) * 0.25)
//! ```
//!
//! where `volatility` is the spread between the best and worst position seen
//! for the query across every page and every day in the range.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Queries with fewer total impressions than this are ignored.
pub const MIN_IMPRESSIONS: u64 = 50;

/// Queries whose best position is worse than this are ignored.
pub const MAX_BEST_POSITION: f64 = 30.0;

/// Maximum number of conflicts returned.
pub const CONFLICT_CAP: usize = 50;

/// Score multiplier added per competing URL beyond the first.
const EXTRA_URL_WEIGHT: f64 = 0.25;

/// One Search Analytics row for a `(query, page)` pair.
///
/// Rows are not pre-aggregated: the same pair may appear several times (for
/// example once per day) and is merged during detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPagePair {
    pub query: String,
    pub page: String,
    pub impressions: u64,
    pub clicks: u64,
    pub position: f64,
}

/// Per-page totals inside a conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictUrl {
    pub page: String,
    /// Sum of clicks across the page's rows.
    pub clicks: u64,
    /// Unweighted mean of the page's row positions.
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CannibalisationConflict {
    pub query: String,
    pub impressions: u64,
    pub clicks: u64,
    #[serde(rename = "numUrls")]
    pub num_urls: usize,
    #[serde(rename = "bestPosition")]
    pub best_position: f64,
    pub score: f64,
    pub urls: Vec<ConflictUrl>,
    pub primary_url: String,
}

/// Detect cannibalisation conflicts in a set of query/page rows.
///
/// Returns at most [`CONFLICT_CAP`] conflicts ordered by score, highest
/// first. Queries that are blank, served by a single page, below
/// [`MIN_IMPRESSIONS`] or never better than [`MAX_BEST_POSITION`] are
/// excluded. The output depends only on the input rows and their order.
#[must_use]
pub fn detect_conflicts(rows: &[QueryPagePair]) -> Vec<CannibalisationConflict> {
    let mut conflicts: Vec<CannibalisationConflict> = group_by_query(rows)
        .into_iter()
        .filter_map(|(query, group)| score_group(query, &group))
        .collect();

    // Stable sort keeps first-seen query order for equal scores.
    conflicts.sort_by(|a, b| b.score.total_cmp(&a.score));
    conflicts.truncate(CONFLICT_CAP);
    conflicts
}

/// Group rows by trimmed query, keeping queries in first-seen order.
///
/// Rows with a blank query or a non-finite position are dropped.
fn group_by_query(rows: &[QueryPagePair]) -> Vec<(&str, Vec<&QueryPagePair>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&QueryPagePair>)> = Vec::new();

    for row in rows {
        let query = row.query.trim();
        if query.is_empty() || !row.position.is_finite() {
            continue;
        }
        match index.get(query) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(query, groups.len());
                groups.push((query, vec![row]));
            }
        }
    }

    groups
}

struct PageTotals<'a> {
    page: &'a str,
    clicks: u64,
    position_sum: f64,
    rows: usize,
}

fn score_group(query: &str, rows: &[&QueryPagePair]) -> Option<CannibalisationConflict> {
    let first_page = rows.first()?.page.clone();

    let mut page_index: HashMap<&str, usize> = HashMap::new();
    let mut pages: Vec<PageTotals<'_>> = Vec::new();
    let mut impressions = 0u64;
    let mut clicks = 0u64;
    let mut best_position = f64::INFINITY;
    let mut worst_position = f64::NEG_INFINITY;

    for row in rows {
        impressions = impressions.saturating_add(row.impressions);
        clicks = clicks.saturating_add(row.clicks);
        best_position = best_position.min(row.position);
        worst_position = worst_position.max(row.position);

        let i = *page_index.entry(row.page.as_str()).or_insert_with(|| {
            pages.push(PageTotals {
                page: row.page.as_str(),
                clicks: 0,
                position_sum: 0.0,
                rows: 0,
            });
            pages.len() - 1
        });
        let totals = &mut pages[i];
        totals.clicks = totals.clicks.saturating_add(row.clicks);
        totals.position_sum += row.position;
        totals.rows += 1;
    }

    let num_urls = pages.len();
    if num_urls < 2 || impressions < MIN_IMPRESSIONS || best_position > MAX_BEST_POSITION {
        return None;
    }

    let volatility = worst_position - best_position;
    #[allow(clippy::cast_precision_loss)]
    let score = impressions as f64
        * (1.0 + volatility)
        * (1.0 + (num_urls - 1) as f64 * EXTRA_URL_WEIGHT);

    #[allow(clippy::cast_precision_loss)]
    let mut urls: Vec<ConflictUrl> = pages
        .into_iter()
        .map(|p| ConflictUrl {
            page: p.page.to_string(),
            clicks: p.clicks,
            position: p.position_sum / p.rows as f64,
        })
        .collect();
    urls.sort_by(|a, b| {
        b.clicks
            .cmp(&a.clicks)
            .then(a.position.total_cmp(&b.position))
    });

    let primary_url = pick_primary(&urls).unwrap_or(first_page);

    Some(CannibalisationConflict {
        query: query.to_string(),
        impressions,
        clicks,
        num_urls,
        best_position,
        score,
        urls,
        primary_url,
    })
}

/// The page with the most clicks; ties go to the better (lower) mean position.
fn pick_primary(urls: &[ConflictUrl]) -> Option<String> {
    urls.iter()
        .reduce(|best, candidate| {
            let more_clicks = candidate.clicks > best.clicks;
            let same_clicks_better_rank =
                candidate.clicks == best.clicks && candidate.position < best.position;
            if more_clicks || same_clicks_better_rank {
                candidate
            } else {
                best
            }
        })
        .map(|u| u.page.clone())
}
