//! Engine Facade (spec §4.H): the single public entry point. Wires the
//! Work Queue (F) to the Page Analysis Orchestrator (E), which in turn
//! pulls from the Browser Pool (A) and the Analyzer Set (D), and
//! publishes every lifecycle signal on the Event Bus (G).

use crate::options::EngineOptions;
use crate::summary::{RunResult, RunSummary};
use audit_events::{EventBus, EventHandler, LegacyCallbackAdapter};
use audit_orchestrator::PageAnalysisOrchestrator;
use audit_pool::BrowserPool;
use audit_queue::WorkQueue;
use audit_types::{AuditError, Result, SitemapSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Owns the event bus that every run publishes to and lets a caller
/// register canonical or legacy subscribers before calling
/// [`EngineFacade::run`]. One facade can drive multiple runs; each
/// `run` call is an independent [`WorkQueue`] batch.
pub struct EngineFacade {
    bus: Arc<EventBus>,
}

impl Default for EngineFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFacade {
    pub fn new() -> Self {
        Self { bus: Arc::new(EventBus::new()) }
    }

    /// Canonical subscription (spec §4.G).
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        self.bus.subscribe(handler);
    }

    /// Adapts a legacy `(event_name, payload_json)` callback block onto
    /// the canonical bus, emitting a one-time deprecation notice the
    /// first time it fires (spec §4.G, §9).
    pub fn subscribe_legacy<F>(&self, callback: F)
    where
        F: Fn(&str, serde_json::Value) + Send + Sync + 'static,
    {
        self.bus.subscribe(Arc::new(LegacyCallbackAdapter::new(callback)));
    }

    /// Canonical subscription built from a plain closure, for callers
    /// who don't need a named [`EventHandler`] type.
    pub fn subscribe_fn<F>(&self, f: F)
    where
        F: Fn(&audit_types::Event) + Send + Sync + 'static,
    {
        self.bus.subscribe_fn(f);
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// `run(options) -> RunResult` (spec §4.H). Discovers URLs via the
    /// caller-supplied [`SitemapSource`], applies `maxPages`, launches a
    /// browser pool, builds the orchestrator, and drives it all through
    /// one [`WorkQueue`] batch.
    #[instrument(skip(self, sitemap, options), fields(max_concurrent = options.max_concurrent))]
    pub async fn run(&self, sitemap: Arc<dyn SitemapSource>, options: EngineOptions) -> Result<RunResult> {
        let started = Instant::now();

        let mut urls = sitemap.urls().await?;
        if let Some(max_pages) = options.max_pages {
            urls.truncate(max_pages);
        }
        let discovered = urls.len();
        info!(discovered, "discovered urls for audit run");

        let pool = Arc::new(
            BrowserPool::warm_up(options.pool_config())
                .await
                .map_err(|e| AuditError::ResourceExhausted(e.to_string()))?,
        );

        let orchestrator_result = PageAnalysisOrchestrator::new(
            Arc::clone(&pool),
            options.orchestrator_config(),
            Arc::clone(&self.bus),
        );
        let orchestrator = match orchestrator_result {
            Ok(o) => Arc::new(o),
            Err(e) => {
                // Engine-fatal: best-effort cleanup before re-raising (spec §7).
                let _ = pool.shutdown().await;
                return Err(AuditError::Fatal(e.to_string()));
            }
        };

        let queue = WorkQueue::new(urls, options.queue_config(), orchestrator, Arc::clone(&self.bus));
        let run = queue.run().await;

        // §4.E/§7: leases are guaranteed released by orchestrator
        // try/finally discipline before this point; shutdown here just
        // tears down the pool itself once the batch has fully drained.
        if let Err(e) = pool.shutdown().await {
            tracing::warn!(error = %e, "browser pool shutdown reported an error");
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let summary = RunSummary::from_pages(&run.pages, run.skipped_urls.len());

        let mut metadata = HashMap::new();
        metadata.insert("discoveredUrls".to_string(), discovered.to_string());
        metadata.insert("maxConcurrent".to_string(), options.max_concurrent.to_string());

        Ok(RunResult {
            summary,
            pages: run.pages,
            skipped_urls: run.skipped_urls,
            duration_ms,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_types::StaticUrlList;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// `pool_size: 0` fails `BrowserPoolConfig::validate()` before any
    /// browser process launches, so this exercises the
    /// `ResourceExhausted` mapping without needing a real browser
    /// binary in the test environment.
    #[tokio::test]
    async fn invalid_pool_size_surfaces_as_resource_exhausted() {
        let facade = EngineFacade::new();
        let events_seen = Arc::new(AtomicUsize::new(0));
        let events_seen_clone = events_seen.clone();
        facade.subscribe_fn(move |_| {
            events_seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        let options = EngineOptions { pool_size: 0, max_concurrent: 0, ..EngineOptions::default() };
        let result = facade
            .run(Arc::new(StaticUrlList(vec![])), options)
            .await;
        assert!(matches!(result, Err(AuditError::ResourceExhausted(_))));
        assert_eq!(events_seen.load(Ordering::SeqCst), 0);
    }
}
