//! Query intent classification with a bounded memo cache.

use std::sync::LazyLock;

use moka::sync::Cache;
use regex::Regex;
use serde::Serialize;

static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(who|what|when|where|why|how|can|does|do|is|are|should|which)\b")
        .expect("valid question regex")
});

static LOCAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnear me\b|\bnearby\b").expect("valid local regex"));

static COMMERCIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(buy|price|prices|pricing|cheap|best|review|reviews|vs|deal|deals|discount|coupon)\b")
        .expect("valid commercial regex")
});

/// Second-level labels that sit under a country code (`example.co.uk`).
const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Branded,
    Question,
    Local,
    Commercial,
    Informational,
}

/// Classifies search queries per site, memoising results.
///
/// The cache is keyed by `(site, normalised query)` and holds at most
/// `capacity` entries; moka evicts with a TinyLFU policy once full.
pub struct QueryClassifier {
    cache: Cache<(String, String), QueryIntent>,
}

impl QueryClassifier {
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Classify `query` in the context of `site` (a Search Console property).
    pub fn classify(&self, site: &str, query: &str) -> QueryIntent {
        let normalised = normalise(query);
        self.cache
            .get_with((site.to_string(), normalised.clone()), || {
                classify_uncached(&brand_terms_for_site(site), &normalised)
            })
    }

    /// Number of memoised classifications.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn classify_uncached(brand_terms: &[String], query: &str) -> QueryIntent {
    if brand_terms.iter().any(|t| query.contains(t.as_str())) {
        QueryIntent::Branded
    } else if QUESTION_RE.is_match(query) {
        QueryIntent::Question
    } else if LOCAL_RE.is_match(query) {
        QueryIntent::Local
    } else if COMMERCIAL_RE.is_match(query) {
        QueryIntent::Commercial
    } else {
        QueryIntent::Informational
    }
}

fn normalise(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Brand spellings derived from a Search Console property.
///
/// `sc-domain:acme-shoes.co.uk` and `https://www.acme-shoes.co.uk/` both
/// yield `["acme-shoes", "acme shoes", "acmeshoes"]`. Labels shorter than
/// three characters are ignored.
#[must_use]
pub fn brand_terms_for_site(site: &str) -> Vec<String> {
    let host = site
        .trim()
        .trim_start_matches("sc-domain:")
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let mut labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.first() == Some(&"www") {
        labels.remove(0);
    }
    // drop the TLD, then a second-level suffix such as `co` in `co.uk`
    labels.pop();
    if labels.len() >= 2 && labels.last().is_some_and(|l| SECOND_LEVEL_SUFFIXES.contains(l)) {
        labels.pop();
    }

    let Some(brand) = labels.last().copied() else {
        return Vec::new();
    };
    if brand.len() < 3 {
        return Vec::new();
    }

    let mut terms = vec![brand.to_string()];
    if brand.contains('-') {
        terms.push(brand.replace('-', " "));
        terms.push(brand.replace('-', ""));
    }
    terms
}
