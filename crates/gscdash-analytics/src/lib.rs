//! Search analytics heuristics for the gscdash API.
//!
//! Everything here is a pure transform over rows that have already been
//! fetched from Search Console or SerpRobot: cannibalisation detection,
//! period summaries, the momentum score, the footer insight selector and
//! query intent classification.

pub mod cannibalisation;
pub mod classify;
pub mod footer_insight;
pub mod momentum;
pub mod summary;

pub use cannibalisation::{
    detect_conflicts, CannibalisationConflict, ConflictUrl, QueryPagePair, CONFLICT_CAP,
    MAX_BEST_POSITION, MIN_IMPRESSIONS,
};
pub use classify::{brand_terms_for_site, QueryClassifier, QueryIntent};
pub use footer_insight::{
    select_footer_insight, DominantSignal, FooterInsightInput, KeywordDelta, StructuredInsight,
};
pub use momentum::{momentum_score, MomentumInput, MomentumLabel, MomentumResult};
pub use summary::{percent_change, MetricRow, PeriodSummary, SummaryDeltas};
