use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::Config;
use crate::record::{normalize, Record};
use crate::{db, extract, fetch};

/// Outcome of one pipeline run.
pub struct RunReport {
    pub extracted: usize,
    pub inserted: usize,
    /// True when the live fetch failed and the built-in fallback listing
    /// was ingested instead.
    pub used_fallback: bool,
}

/// Fetch the source page and turn it into canonical records.
///
/// Fetch failure does not abort the run: the built-in fallback listing is
/// substituted, loudly. Extraction failure (bad selector configuration)
/// does abort.
pub async fn scrape(client: &Client, cfg: &Config) -> Result<(Vec<Record>, bool)> {
    let (html, used_fallback) = match fetch::fetch_page(client, &cfg.source_url).await {
        Ok(body) => (body, false),
        Err(e) => {
            warn!("fetch of {} failed ({e}), using fallback content", cfg.source_url);
            (fetch::FALLBACK_HTML.to_string(), true)
        }
    };

    let today = Utc::now().date_naive();
    let records = extract::extract(&html, &cfg.selectors)?
        .iter()
        .map(|item| normalize(item, &cfg.source_url, today))
        .collect();
    Ok((records, used_fallback))
}

/// One full run: fetch, extract, normalize, upsert.
pub async fn run(client: &Client, cfg: &Config, conn: &Connection) -> Result<RunReport> {
    let (records, used_fallback) = scrape(client, cfg).await?;
    let extracted = records.len();
    let inserted = db::upsert_many(conn, &records)?;
    info!(
        "scraped {}: {} extracted, {} new{}",
        cfg.source_url,
        extracted,
        inserted,
        if used_fallback { " (fallback content)" } else { "" }
    );
    Ok(RunReport { extracted, inserted, used_fallback })
}
