//! Spreadsheet CSV export retrieval.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::util::user_agent::{build_headers, FETCH_USER_AGENT};

/// Fetches the published CSV export of a spreadsheet tab.
#[derive(Clone)]
pub struct SheetFetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl SheetFetcher {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Build `<base>/spreadsheets/d/<id>/export?format=csv&gid=<gid>`.
    pub fn export_url(&self, spreadsheet_id: &str, gid: u64) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::InvalidArgument(format!("invalid spreadsheet host {}: {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                Error::InvalidArgument(format!("invalid spreadsheet host {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["spreadsheets", "d", spreadsheet_id, "export"]);

        url.query_pairs_mut()
            .append_pair("format", "csv")
            .append_pair("gid", &gid.to_string());

        Ok(url)
    }

    /// Download the export as text.
    ///
    /// Fails with `InvalidArgument` for a blank id, `FetchFailed` for transport
    /// errors and non-success statuses, and `NotPublic` when the host serves
    /// an HTML page (the sharing gate) instead of CSV.
    pub async fn fetch_csv(&self, spreadsheet_id: &str, gid: u64) -> Result<String> {
        let id = spreadsheet_id.trim();
        if id.is_empty() {
            return Err(Error::InvalidArgument(
                "spreadsheet id was not provided".to_string(),
            ));
        }

        let url = self.export_url(id, gid)?;
        info!(spreadsheet_id = %id, gid = gid, "sheet_fetch_start");

        let mut request = self.client.get(url).timeout(self.timeout);
        for (key, value) in build_headers(FETCH_USER_AGENT) {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            warn!(spreadsheet_id = %id, error = %e, "sheet_fetch_transport_error");
            Error::FetchFailed {
                status: None,
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(spreadsheet_id = %id, status_code = status.as_u16(), "sheet_fetch_bad_status");
            return Err(Error::FetchFailed {
                status: Some(status.as_u16()),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response.text().await.map_err(|e| Error::FetchFailed {
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;

        if looks_like_html(&body) {
            warn!(spreadsheet_id = %id, body_length = body.len(), "sheet_fetch_not_public");
            return Err(Error::NotPublic);
        }

        info!(spreadsheet_id = %id, body_length = body.len(), "sheet_fetch_complete");
        Ok(body)
    }
}

/// Detect an HTML document where CSV was expected.
pub fn looks_like_html(body: &str) -> bool {
    let trimmed = body.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace());
    trimmed.starts_with("<!")
        || trimmed.starts_with("<html")
        || trimmed.to_lowercase().contains("<!doctype")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fetcher(base_url: &str) -> SheetFetcher {
        SheetFetcher::new(Client::new(), base_url, Duration::from_secs(5))
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<!DOCTYPE html><html>...</html>"));
        assert!(looks_like_html("  \n<html><body>login</body></html>"));
        assert!(looks_like_html("<!-- comment -->"));
        assert!(looks_like_html("junk before <!doctype html>"));
        assert!(!looks_like_html("Name,Email\nAna,ana@example.com\n"));
        assert!(!looks_like_html(""));
    }

    #[test]
    fn test_looks_like_html_after_byte_order_mark() {
        assert!(looks_like_html("\u{feff}<html><body>Sign in</body></html>"));
        assert!(looks_like_html("\u{feff}  <!DOCTYPE html>"));
        assert!(!looks_like_html("\u{feff}Name,Email\nAna,ana@example.com\n"));
    }

    #[test]
    fn test_export_url_shape() {
        let url = fetcher("https://docs.google.com")
            .export_url("abc123", 42)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=42"
        );
    }

    #[tokio::test]
    async fn test_fetch_blank_id_is_invalid_argument() {
        let result = fetcher("http://127.0.0.1:9").fetch_csv("   ", 0).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_fetch_csv_success() {
        let app = Router::new().route(
            "/spreadsheets/d/sheet-1/export",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("format").map(String::as_str), Some("csv"));
                format!("Email\nana@example.com\n# gid={}", q["gid"])
            }),
        );
        let base = serve(app).await;

        let body = fetcher(&base).fetch_csv("sheet-1", 7).await.unwrap();
        assert!(body.starts_with("Email\nana@example.com"));
        assert!(body.ends_with("gid=7"));
    }

    #[tokio::test]
    async fn test_fetch_html_is_not_public() {
        let app = Router::new().route(
            "/spreadsheets/d/private/export",
            get(|| async { "<!DOCTYPE html><html>...</html>" }),
        );
        let base = serve(app).await;

        let result = fetcher(&base).fetch_csv("private", 0).await;
        assert!(matches!(result, Err(Error::NotPublic)));
    }

    #[tokio::test]
    async fn test_fetch_bad_status() {
        let app = Router::new().route(
            "/spreadsheets/d/missing/export",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        );
        let base = serve(app).await;

        match fetcher(&base).fetch_csv("missing", 0).await {
            Err(Error::FetchFailed { status, reason }) => {
                assert_eq!(status, Some(404));
                assert_eq!(reason, "Not Found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
