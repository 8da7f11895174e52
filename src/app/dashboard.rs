//! Query log dashboard.
//!
//! `GET /` renders the latest entries as an HTML table and `GET /download`
//! returns the same entries as a CSV attachment. The bot process reuses
//! [`health_router`] when its host requires a bound port.

use crate::adapters::query_log::to_csv;
use crate::domain::model::QueryLogEntry;
use crate::domain::ports::QueryLog;
use crate::utils::error::IfscError;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// 儀表板顯示的筆數上限
pub const DASHBOARD_LIMIT: usize = 100;

pub type SharedQueryLog = Arc<dyn QueryLog>;

pub fn router(query_log: SharedQueryLog) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/download", get(download))
        .with_state(query_log)
}

pub fn health_router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/healthz", get(health))
}

async fn health() -> &'static str {
    "OK"
}

fn error_response(e: IfscError) -> Response {
    tracing::error!("❌ Dashboard failed to read query log: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.user_friendly_message()).into_response()
}

async fn index(State(query_log): State<SharedQueryLog>) -> Response {
    match query_log.recent(DASHBOARD_LIMIT).await {
        Ok(entries) => Html(render_page(&entries)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn download(State(query_log): State<SharedQueryLog>) -> Response {
    let csv = match query_log.recent(DASHBOARD_LIMIT).await.and_then(|e| to_csv(&e)) {
        Ok(csv) => csv,
        Err(e) => return error_response(e),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"queries_log.csv\"",
            ),
        ],
        csv,
    )
        .into_response()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Queries Log Dashboard</title>
    <style>
        body { font-family: Arial, sans-serif; padding: 20px; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        .download-btn {
            display: inline-block;
            margin: 20px 0;
            padding: 10px 15px;
            background: green;
            color: white;
            text-decoration: none;
            border-radius: 5px;
        }
    </style>
</head>
<body>
    <h2>📊 Queries Log Dashboard</h2>
    <a href="/download" class="download-btn">⬇ Download CSV</a>
"#;

pub fn render_page(entries: &[QueryLogEntry]) -> String {
    let mut html = String::from(PAGE_HEAD);
    html.push_str("    <table>\n        <tr>");
    for column in QueryLogEntry::COLUMNS {
        html.push_str("<th>");
        html.push_str(column);
        html.push_str("</th>");
    }
    html.push_str("</tr>\n");

    for entry in entries {
        html.push_str("        <tr>");
        for cell in entry.cells() {
            html.push_str("<td>");
            html.push_str(&escape_html(&cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }

    html.push_str("    </table>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::QueryOutcome;
    use chrono::Utc;

    fn entry(id: u64, username: &str) -> QueryLogEntry {
        QueryLogEntry {
            id,
            timestamp: Utc::now(),
            chat_id: 100 + id as i64,
            user_id: None,
            username: Some(username.to_string()),
            state: Some("BIHAR".to_string()),
            bank: None,
            branch: None,
            ifsc: None,
            outcome: QueryOutcome::BankNotFound,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape_html("PATNA"), "PATNA");
    }

    #[test]
    fn test_render_page_lists_columns_and_rows() {
        let html = render_page(&[entry(2, "<script>"), entry(1, "ravi")]);
        assert!(html.contains("<th>outcome</th>"));
        assert!(html.contains("<td>&lt;script&gt;</td>"));
        assert!(!html.contains("<td><script></td>"));
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.find("<td>2</td>").unwrap() < html.find("<td>1</td>").unwrap());
    }
}
