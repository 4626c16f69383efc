use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use thiserror::Error;

use crate::config::Config;

/// Built-in two-item listing used when the live fetch fails.
///
/// Substituting this is an explicit pipeline decision, never done here;
/// callers see the real failure and the run report records the substitution.
pub const FALLBACK_HTML: &str = r#"
<html><body>
<div class="tender-item"><a href="https://demo/1" class="tender-title">Natječaj 1</a><div class="tender-date">2025-08-01</div></div>
<div class="tender-item"><a href="https://demo/2" class="tender-title">Natječaj 2</a><div class="tender-date">2025-08-18</div></div>
</body></html>
"#;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("empty response body")]
    EmptyBody,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Build the HTTP client once: fixed user-agent, fixed timeout.
pub fn build_client(cfg: &Config) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&cfg.user_agent)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch the listing page. Requires a 200 with a non-empty body.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }
    Ok(body)
}
