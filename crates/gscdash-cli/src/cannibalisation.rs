//! One-off cannibalisation report against the live Search Console API.

use gscdash_analytics::detect_conflicts;
use gscdash_core::DateRange;
use gscdash_gsc::SearchConsoleClient;

/// Fetches every `(query, page, date)` row for `site` in the range and
/// prints the detected conflicts as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if the dates are invalid, the Search Console request
/// fails, or the result cannot be serialised.
pub(crate) async fn run(
    site: &str,
    start_date: &str,
    end_date: &str,
    access_token: &str,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let range = DateRange::parse(start_date, end_date)?;
    let client = SearchConsoleClient::new(timeout_secs)?;

    let pairs = client.query_page_pairs(access_token, site, &range).await?;
    let conflicts = detect_conflicts(&pairs);
    tracing::info!(
        site,
        rows = pairs.len(),
        conflicts = conflicts.len(),
        "cannibalisation computed"
    );

    println!("{}", serde_json::to_string_pretty(&conflicts)?);
    Ok(())
}
