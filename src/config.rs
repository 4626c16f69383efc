use std::env;

const DEFAULT_SOURCE_URL: &str = "https://example.com/tenders";
const DEFAULT_DB_PATH: &str = "tenders.sqlite";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// CSS selectors describing where records live in the listing markup.
///
/// `title`, `link` and `date` are scoped to each `item` container match.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub item: String,
    pub title: String,
    pub link: String,
    pub date: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            item: ".tender-item".to_string(),
            title: ".tender-title".to_string(),
            link: "a".to_string(),
            date: ".tender-date".to_string(),
        }
    }
}

/// Immutable runtime configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    pub db_path: String,
    pub bind_addr: String,
    /// Shared secret for the manual trigger endpoint. `None` disables the check.
    pub scrape_token: Option<String>,
    pub selectors: Selectors,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        // Accept connection-string style paths like sqlite://tenders.sqlite
        let db_path = db_path
            .strip_prefix("sqlite://")
            .unwrap_or(&db_path)
            .to_string();

        Self {
            source_url: env::var("SOURCE_URL")
                .unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string()),
            db_path,
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            scrape_token: env::var("SCRAPE_TOKEN").ok().filter(|t| !t.is_empty()),
            selectors: Selectors::default(),
            user_agent: concat!("tender_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
