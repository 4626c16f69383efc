use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::db::{self, StoredRecord};
use crate::pipeline;

/// Shared handler state. The connection mutex is only held across the
/// synchronous store calls, never across an await point.
#[derive(Clone)]
pub struct AppState {
    pub conn: Arc<Mutex<Connection>>,
    pub cfg: Arc<Config>,
    pub client: Client,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/scrape-now", get(scrape_now))
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let bind = state.cfg.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("listening on http://{bind}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ── Handlers ──

type HandlerError = (StatusCode, String);

fn internal(message: impl std::fmt::Display) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

#[derive(Debug, Deserialize)]
struct IndexParams {
    q: Option<String>,
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Html<String>, HandlerError> {
    let rows = {
        let conn = state.conn.lock().map_err(|_| internal("store lock poisoned"))?;
        db::list_all(&conn).map_err(internal)?
    };
    let rows = filter_by_title(rows, params.q.as_deref());
    Ok(Html(render_index(&rows)))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct TriggerParams {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    extracted: usize,
    inserted: usize,
    used_fallback: bool,
}

async fn scrape_now(
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> Result<Json<TriggerResponse>, HandlerError> {
    if let Some(expected) = &state.cfg.scrape_token {
        if params.token.as_deref() != Some(expected.as_str()) {
            return Err((StatusCode::UNAUTHORIZED, "unauthorized".to_string()));
        }
    }

    let (records, used_fallback) = pipeline::scrape(&state.client, &state.cfg)
        .await
        .map_err(internal)?;
    let inserted = {
        let conn = state.conn.lock().map_err(|_| internal("store lock poisoned"))?;
        db::upsert_many(&conn, &records).map_err(internal)?
    };

    Ok(Json(TriggerResponse {
        extracted: records.len(),
        inserted,
        used_fallback,
    }))
}

// ── Rendering ──

/// Case-insensitive title substring filter; no query keeps everything.
fn filter_by_title(rows: Vec<StoredRecord>, q: Option<&str>) -> Vec<StoredRecord> {
    match q {
        Some(q) if !q.is_empty() => {
            let needle = q.to_lowercase();
            rows.into_iter()
                .filter(|r| r.title.to_lowercase().contains(&needle))
                .collect()
        }
        _ => rows,
    }
}

fn render_index(rows: &[StoredRecord]) -> String {
    let mut html = String::from(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
         <title>Tender Scraper</title></head><body>\
         <h1>Tender Scraper</h1>\
         <p><a href=\"/scrape-now\">Scrape now</a></p>\
         <table><tr><th>Title</th><th>Published</th><th>Link</th></tr>",
    );
    for r in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td><a href=\"{}\">link</a></td></tr>",
            escape(&r.title),
            r.published_at,
            escape(&r.url),
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(title: &str) -> StoredRecord {
        StoredRecord {
            id: 1,
            title: title.to_string(),
            url: "https://demo/1".to_string(),
            published_at: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            source: "src".to_string(),
            fingerprint: "f".to_string(),
            created_at: "2025-08-24 00:00:00".to_string(),
        }
    }

    #[test]
    fn filter_is_case_insensitive() {
        let rows = vec![row("Natječaj 1"), row("Other")];
        let hits = filter_by_title(rows, Some("natječaj"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Natječaj 1");
    }

    #[test]
    fn filter_without_match_is_empty() {
        let rows = vec![row("Natječaj 1"), row("Natječaj 2")];
        assert!(filter_by_title(rows, Some("missing")).is_empty());
    }

    #[test]
    fn no_query_keeps_everything() {
        let rows = vec![row("A"), row("B")];
        assert_eq!(filter_by_title(rows, None).len(), 2);
        let rows = vec![row("A"), row("B")];
        assert_eq!(filter_by_title(rows, Some("")).len(), 2);
    }

    #[test]
    fn trigger_response_shape() {
        let body = serde_json::to_string(&TriggerResponse {
            extracted: 2,
            inserted: 1,
            used_fallback: true,
        })
        .unwrap();
        assert!(body.contains("\"inserted\":1"));
        assert!(body.contains("\"used_fallback\":true"));
    }

    #[test]
    fn titles_are_escaped() {
        let html = render_index(&[row("<script>alert(1)</script>")]);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }
}
