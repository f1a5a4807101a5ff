//! Default `SitemapSource` adapter (spec §6 "Sitemap source (inbound)").
//!
//! Sitemap discovery/parsing proper is an explicit Non-goal of this
//! crate's core (spec §1) — the engine only depends on the
//! [`SitemapSource`] trait. This is a minimal, best-effort default
//! implementation so the CLI binary has something to drive without a
//! caller having to supply their own; it is not a general sitemap-index
//! crawler (no nested `<sitemapindex>` recursion, no `lastmod`/priority
//! filtering). Callers who need that should implement `SitemapSource`
//! themselves, the same "bring your own adapter" shape
//! `riptide-spider::SitemapParser` follows for its richer cousin.

use async_trait::async_trait;
use audit_types::{AuditError, Result, SitemapSource};
use regex::Regex;
use std::time::Duration;

pub struct HttpSitemapSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSitemapSource {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("auditmysite/0.1")
            .build()
            .unwrap_or_default();
        Self { url: url.into(), client }
    }
}

#[async_trait]
impl SitemapSource for HttpSitemapSource {
    async fn urls(&self) -> Result<Vec<String>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuditError::Other(anyhow::anyhow!("failed to fetch sitemap {}: {e}", self.url)))?
            .text()
            .await
            .map_err(|e| AuditError::Other(anyhow::anyhow!("failed to read sitemap body: {e}")))?;

        Ok(extract_locs(&body))
    }
}

/// Pulls every `<loc>...</loc>` entry out of a sitemap document. Good
/// enough for a flat `<urlset>`; a `<sitemapindex>` of sitemaps just
/// yields the child sitemap URLs themselves rather than recursing —
/// callers with that need should implement `SitemapSource` directly.
fn extract_locs(xml: &str) -> Vec<String> {
    let re = Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").expect("static regex is valid");
    re.captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_loc_entries_from_a_urlset() {
        let xml = r#"<?xml version="1.0"?>
            <urlset>
              <url><loc>https://example.com/</loc></url>
              <url><loc>https://example.com/about</loc></url>
            </urlset>"#;
        assert_eq!(
            extract_locs(xml),
            vec!["https://example.com/".to_string(), "https://example.com/about".to_string()]
        );
    }

    #[test]
    fn empty_document_yields_no_urls() {
        assert!(extract_locs("<urlset></urlset>").is_empty());
    }
}
