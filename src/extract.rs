use anyhow::{anyhow, Result};
use scraper::{Html, Selector};

use crate::config::Selectors;

/// Placeholder title for items whose title selector matches nothing.
pub const UNTITLED: &str = "(untitled)";

/// One matched item container, fields as found in the markup.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub title: String,
    pub href: String,
    pub date_text: String,
}

/// Extract raw items from listing markup, one per container match,
/// in document order. No container match yields an empty vec.
///
/// An invalid selector string is a configuration error and propagates;
/// a missing title/link/date inside a container does not.
pub fn extract(html: &str, selectors: &Selectors) -> Result<Vec<RawItem>> {
    let item_sel = parse_selector(&selectors.item)?;
    let title_sel = parse_selector(&selectors.title)?;
    let link_sel = parse_selector(&selectors.link)?;
    let date_sel = parse_selector(&selectors.date)?;

    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for container in document.select(&item_sel) {
        let title = container
            .select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_else(|| UNTITLED.to_string());
        let href = container
            .select(&link_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .unwrap_or("")
            .to_string();
        let date_text = container
            .select(&date_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();

        items.push(RawItem { title, href, date_text });
    }

    Ok(items)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("invalid selector {s:?}: {e}"))
}
