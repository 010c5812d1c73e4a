//! Web search client
//!
//! Plain-HTTP search against the DuckDuckGo HTML endpoint. Results are
//! extracted with regexes rather than a DOM; good enough for the snippet
//! quality the research agent needs.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default request timeout in milliseconds
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Search endpoint
const SEARCH_URL: &str = "https://duckduckgo.com/html/";
/// User agent sent with search requests
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// One search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub relevance: f32,
}

/// HTTP search client
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
}

impl SearchClient {
    /// Create a new search client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()?;
        Ok(Self { client })
    }

    /// Search the web and return up to `limit` results
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        tracing::info!(query = %query, limit, "Searching web");

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("kl", "us-en")])
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("search backend returned {}", status);
        }

        let html = response.text().await?;
        Ok(Self::extract_results(&html, limit))
    }

    /// Pull result blocks out of the response HTML.
    ///
    /// Each DuckDuckGo result carries a `result__a` anchor and a
    /// `result__snippet` element; anything that doesn't match both is
    /// skipped.
    fn extract_results(html: &str, limit: usize) -> Vec<SearchHit> {
        static LINK_RE: OnceLock<Regex> = OnceLock::new();
        static SNIPPET_RE: OnceLock<Regex> = OnceLock::new();

        let link_re = LINK_RE.get_or_init(|| {
            Regex::new(r#"(?s)<a[^>]*class="[^"]*result__a[^"]*"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
                .expect("static regex")
        });
        let snippet_re = SNIPPET_RE.get_or_init(|| {
            Regex::new(r#"(?s)class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</"#)
                .expect("static regex")
        });

        let snippets: Vec<String> = snippet_re
            .captures_iter(html)
            .map(|c| strip_tags(&c[1]))
            .collect();

        link_re
            .captures_iter(html)
            .take(limit)
            .enumerate()
            .map(|(i, caps)| SearchHit {
                title: strip_tags(&caps[2]),
                url: caps[1].to_string(),
                snippet: snippets.get(i).cloned().unwrap_or_default(),
                // Rank-based score, highest first
                relevance: 1.0 - (i as f32) * 0.05,
            })
            .collect()
    }
}

/// Remove markup and collapse whitespace in extracted text
fn strip_tags(raw: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"));

    let text = tag_re.replace_all(raw, "");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        <div class="result">
          <a class="result__a" href="https://example.com/rust">The <b>Rust</b> Book</a>
          <a class="result__snippet" href="#">Learn systems programming with Rust.</a>
        </div>
        <div class="result">
          <a class="result__a" href="https://example.org/tokio">Tokio</a>
          <a class="result__snippet" href="#">Async runtime for Rust.</a>
        </div>
    "##;

    #[test]
    fn test_extract_results() {
        let hits = SearchClient::extract_results(SAMPLE, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "The Rust Book");
        assert_eq!(hits[0].url, "https://example.com/rust");
        assert_eq!(hits[0].snippet, "Learn systems programming with Rust.");
        assert!(hits[0].relevance > hits[1].relevance);
    }

    #[test]
    fn test_extract_respects_limit() {
        let hits = SearchClient::extract_results(SAMPLE, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_extract_empty_page() {
        let hits = SearchClient::extract_results("<html></html>", 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("a <b>bold</b>  move"), "a bold move");
        assert_eq!(strip_tags("Fish &amp; Chips"), "Fish & Chips");
    }
}
