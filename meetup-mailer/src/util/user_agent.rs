//! Request header helpers for outbound HTTP calls.

/// User agent sent with spreadsheet export requests.
pub const FETCH_USER_AGENT: &str = "Mozilla/5.0 (compatible; Meetup-MCP-Demo/1.0)";

/// Build standard headers for HTTP requests.
pub fn build_headers(user_agent: &str) -> Vec<(String, String)> {
    vec![
        ("User-Agent".to_string(), user_agent.to_string()),
        ("Accept".to_string(), "text/csv,*/*;q=0.8".to_string()),
    ]
}
