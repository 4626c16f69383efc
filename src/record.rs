use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::extract::RawItem;

/// A canonical record ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub title: String,
    pub url: String,
    pub published_at: NaiveDate,
    pub source: String,
    pub fingerprint: String,
}

/// SHA-256 hex digest used as the dedup key.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Strict ISO 8601 calendar date (`YYYY-MM-DD`), anything else is None.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// Turn a raw extracted item into a canonical record.
///
/// `today` is the ingestion date, substituted when the source date is missing
/// or unparseable. Identity is the hash of the href, falling back to the title
/// for items without a link.
pub fn normalize(item: &RawItem, source: &str, today: NaiveDate) -> Record {
    let title = item.title.trim().to_string();
    let published_at = parse_date(&item.date_text).unwrap_or(today);
    let key = if item.href.is_empty() { &title } else { &item.href };

    Record {
        fingerprint: fingerprint(key),
        title,
        url: item.href.clone(),
        published_at,
        source: source.to_string(),
    }
}
