//! The uniform interface all five analyzers implement (spec §4.D).

use crate::context::PageContext;
use crate::outcome::AnalyzerOutcome;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Analyzer: Send + Sync {
    type Output: Send;

    fn name(&self) -> &'static str;

    /// Upper bound on how long this analyzer may run before the
    /// orchestrator treats it as failed (spec §4.E).
    fn default_timeout(&self) -> Duration;

    /// Whether this analyzer needs its own isolated page rather than
    /// running concurrently against the shared one (spec §4.D) — the
    /// mobile analyzer resizes the viewport, which would corrupt any
    /// other analyzer reading layout at the same time.
    fn requires_isolated_page(&self) -> bool {
        false
    }

    async fn analyze(&self, ctx: &PageContext<'_>) -> AnalyzerOutcome<Self::Output>;
}
