//! Page Analysis Orchestrator (spec §4.E): per-URL pipeline wiring
//! together the browser pool, the redirect detector, the fixed
//! analyzer set, and the Result Factory. Implements
//! [`UrlProcessor`](audit_types::UrlProcessor) so the work queue can
//! drive it without knowing any of that.

use crate::config::OrchestratorConfig;
use crate::redirect::RedirectDetector;
use async_trait::async_trait;
use audit_analyzers::{
    AccessibilityAnalyzer, Analyzer, AnalyzerOutcome, ContentWeightAnalyzer, MobileAnalyzer, PageContext,
    PerformanceAnalyzer, SeoAnalyzer,
};
use audit_events::EventBus;
use audit_pool::{BrowserCheckout, BrowserPool};
use audit_types::{result_factory, AuditError, EventPayload, PageResult, PageStatus, Result, UrlProcessor};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

pub struct PageAnalysisOrchestrator {
    pool: Arc<BrowserPool>,
    config: OrchestratorConfig,
    redirect_detector: RedirectDetector,
    bus: Arc<EventBus>,
    accessibility: AccessibilityAnalyzer,
    performance: PerformanceAnalyzer,
    seo: SeoAnalyzer,
    content_weight: ContentWeightAnalyzer,
    mobile: MobileAnalyzer,
}

impl PageAnalysisOrchestrator {
    pub fn new(pool: Arc<BrowserPool>, config: OrchestratorConfig, bus: Arc<EventBus>) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        let redirect_detector = RedirectDetector::new(config.redirect_probe_timeout)?;
        let content_weight = ContentWeightAnalyzer::new(config.budget_template);
        Ok(Self {
            pool,
            config,
            redirect_detector,
            bus,
            accessibility: AccessibilityAnalyzer,
            performance: PerformanceAnalyzer,
            seo: SeoAnalyzer,
            content_weight,
            mobile: MobileAnalyzer,
        })
    }

    /// Steps 1-3 of §4.E: probe for a redirect before spending a browser
    /// lease on a page the run may just skip, then dispatch to either
    /// the redirect/HTTP-error short-circuit or the full analysis path.
    async fn run_one(&self, url: &str, started: Instant) -> Result<PageResult> {
        let redirect = self
            .redirect_detector
            .detect(url)
            .await
            .map_err(|e| AuditError::navigation(url, format!("redirect probe failed: {e}")))?;

        if redirect.is_redirect && self.config.skip_redirects {
            return Ok(result_factory::create_redirect_skip(&redirect, elapsed_ms(started)));
        }
        if let Some(status) = redirect.status_code {
            if status >= 400 {
                return Ok(result_factory::create_http_error(url, status, elapsed_ms(started)));
            }
        }

        let checkout = self
            .pool
            .acquire()
            .await
            .map_err(|e| AuditError::ResourceExhausted(e.to_string()))?;

        // §4.E step 7: the lease is always released, success or failure.
        let outcome = self.analyze_with_page(url, &redirect.final_url, &checkout, started).await;
        if let Err(e) = checkout.release().await {
            warn!(url, error = %e, "failed to release browser checkout");
        }
        outcome
    }

    async fn analyze_with_page(
        &self,
        url: &str,
        probed_final_url: &str,
        checkout: &BrowserCheckout,
        started: Instant,
    ) -> Result<PageResult> {
        let page = checkout
            .new_page(url)
            .await
            .map_err(|e| AuditError::navigation(url, e.to_string()))?;

        let html = page
            .content()
            .await
            .map_err(|e| AuditError::navigation(url, format!("failed to read page content: {e}")))?;
        let live_final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| probed_final_url.to_string());
        let title = extract_title(&html);

        let ctx = PageContext {
            url,
            final_url: &live_final_url,
            html: &html,
            page: &page,
        };

        if self.config.capture_screenshots {
            if let Some(dir) = &self.config.screenshot_dir {
                let stem = format!("{}-desktop", crate::screenshot::sanitize_for_filename(url));
                crate::screenshot::capture(&page, dir, &stem).await;
            }
        }

        // Accessibility runs first and alone: its success or failure
        // decides the page's overall pass/fail status (spec §3, §4.E).
        let accessibility = if self.config.enable_accessibility {
            self.run_analyzer(&self.accessibility, &ctx, url, self.remaining_budget(started))
                .await
        } else {
            None
        };
        let status = if accessibility.is_some() {
            PageStatus::Passed
        } else {
            PageStatus::Failed
        };

        // The rest run concurrently against the shared page context.
        let (performance, seo, content_weight) = tokio::join!(
            self.maybe_run(
                &self.performance,
                self.config.enable_performance,
                &ctx,
                url,
                self.remaining_budget(started)
            ),
            self.maybe_run(&self.seo, self.config.enable_seo, &ctx, url, self.remaining_budget(started)),
            self.maybe_run(
                &self.content_weight,
                self.config.enable_content_weight,
                &ctx,
                url,
                self.remaining_budget(started)
            ),
        );

        let mobile = if self.config.enable_mobile {
            self.run_mobile(checkout, url, &live_final_url, &html, started).await
        } else {
            None
        };

        Ok(result_factory::create_ok(
            url,
            live_final_url,
            title,
            status,
            elapsed_ms(started),
            result_factory::OkSections {
                accessibility,
                performance,
                seo,
                content_weight,
                mobile,
            },
        ))
    }

    /// The mobile analyzer resizes the viewport, so it needs its own
    /// page rather than sharing the one every other analyzer just read
    /// (spec §4.D `requiresIsolatedPage`).
    async fn run_mobile(
        &self,
        checkout: &BrowserCheckout,
        url: &str,
        final_url: &str,
        fallback_html: &str,
        started: Instant,
    ) -> Option<audit_types::MobileSection> {
        let isolated_page = match checkout.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                self.emit_analyzer_warning(url, self.mobile.name(), &format!("failed to open isolated page: {e}"));
                return None;
            }
        };
        let isolated_html = isolated_page
            .content()
            .await
            .unwrap_or_else(|_| fallback_html.to_string());
        let ctx = PageContext {
            url,
            final_url,
            html: &isolated_html,
            page: &isolated_page,
        };
        let section = self.run_analyzer(&self.mobile, &ctx, url, self.remaining_budget(started)).await;

        // The mobile analyzer resizes the viewport as a side effect of
        // running, so a post-analysis capture sees the phone layout.
        if self.config.capture_screenshots {
            if let Some(dir) = &self.config.screenshot_dir {
                let stem = format!("{}-mobile", crate::screenshot::sanitize_for_filename(url));
                crate::screenshot::capture(&isolated_page, dir, &stem).await;
            }
        }

        section
    }

    async fn maybe_run<A: Analyzer>(
        &self,
        analyzer: &A,
        enabled: bool,
        ctx: &PageContext<'_>,
        url: &str,
        budget: Duration,
    ) -> Option<A::Output> {
        if !enabled {
            return None;
        }
        self.run_analyzer(analyzer, ctx, url, budget).await
    }

    /// Runs one analyzer under the lesser of its own declared timeout
    /// and whatever's left of the page's overall deadline (spec §4.E).
    /// Any non-`Ok` outcome — skip, failure, or timeout — is folded to
    /// `None` here; failures and timeouts additionally emit an
    /// analyzer-warning event so the section's absence is traceable.
    async fn run_analyzer<A: Analyzer>(&self, analyzer: &A, ctx: &PageContext<'_>, url: &str, budget: Duration) -> Option<A::Output> {
        let timeout = analyzer.default_timeout().min(budget);
        if timeout.is_zero() {
            self.emit_analyzer_warning(url, analyzer.name(), "overall page deadline exhausted before this analyzer ran");
            return None;
        }
        match tokio::time::timeout(timeout, analyzer.analyze(ctx)).await {
            Ok(AnalyzerOutcome::Ok(value)) => Some(value),
            Ok(AnalyzerOutcome::Skipped { reason }) => {
                tracing::debug!(url, analyzer = analyzer.name(), reason, "analyzer skipped");
                None
            }
            Ok(AnalyzerOutcome::Failed { error }) => {
                self.emit_analyzer_warning(url, analyzer.name(), &error);
                None
            }
            Err(_) => {
                self.emit_analyzer_warning(url, analyzer.name(), "timed out");
                None
            }
        }
    }

    fn remaining_budget(&self, started: Instant) -> Duration {
        self.config.overall_deadline.saturating_sub(started.elapsed())
    }

    fn emit_analyzer_warning(&self, url: &str, analyzer: &str, message: &str) {
        self.bus.publish(EventPayload::AnalyzerWarning {
            url: url.to_string(),
            analyzer: analyzer.to_string(),
            message: message.to_string(),
        });
    }
}

#[async_trait]
impl UrlProcessor for PageAnalysisOrchestrator {
    async fn process(&self, url: &str) -> Result<PageResult> {
        let started = Instant::now();
        self.run_one(url, started).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("title").ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_text_and_trims_whitespace() {
        let html = "<html><head><title>\n  Example Site  \n</title></head></html>";
        assert_eq!(extract_title(html), Some("Example Site".to_string()));
    }

    #[test]
    fn missing_title_is_none() {
        assert_eq!(extract_title("<html><head></head></html>"), None);
    }

    #[test]
    fn remaining_budget_never_panics_once_deadline_has_passed() {
        let config = OrchestratorConfig {
            overall_deadline: Duration::from_millis(1),
            ..OrchestratorConfig::default()
        };
        let started = Instant::now() - Duration::from_secs(5);
        let remaining = config.overall_deadline.saturating_sub(started.elapsed());
        assert_eq!(remaining, Duration::ZERO);
    }
}
