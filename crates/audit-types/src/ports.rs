//! External-interface traits (spec §4, Non-goals) — callers supply an
//! implementation; the crates in this workspace only depend on the trait.
//!
//! Mirrors the port/adapter split the browser crates use for their own
//! external boundaries: a trait in the shared types crate, a concrete
//! adapter living wherever it's actually wired up.

use crate::error::Result;
use crate::result::PageResult;
use async_trait::async_trait;

/// Supplies the set of URLs to audit without the engine needing to know
/// whether they came from a sitemap, a crawl, or a static list.
#[async_trait]
pub trait SitemapSource: Send + Sync {
    async fn urls(&self) -> Result<Vec<String>>;
}

/// A static list of URLs, for callers that already have them.
pub struct StaticUrlList(pub Vec<String>);

#[async_trait]
impl SitemapSource for StaticUrlList {
    async fn urls(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// What the work queue (spec §4.F) calls to turn one URL into a
/// [`PageResult`]. The queue only depends on this trait, never on the
/// orchestrator concretely — `audit-engine` is what wires a real
/// `PageAnalysisOrchestrator` in as the implementation, the same
/// port/adapter split `SitemapSource` uses above.
#[async_trait]
pub trait UrlProcessor: Send + Sync {
    async fn process(&self, url: &str) -> Result<PageResult>;
}
