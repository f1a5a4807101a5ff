//! Core Web Vitals analyzer. Derives LCP/FCP/TTFB from the Navigation
//! and Paint Timing APIs, which are always available post-load with no
//! setup. CLS/TBT/FID/INP come from `window.__cwvMetrics`, populated by
//! a `PerformanceObserver` the browser pool installs via
//! `evaluate_on_new_document` before every navigation (see
//! `audit_pool::pool::CWV_OBSERVER_JS`) so the observers are attached
//! before the target page's first paint. SI has no synchronous observer
//! equivalent (it needs frame-by-frame visual-progress sampling) and is
//! not collected; it scores as `0`/`Good` by the `rate()` fallback same
//! as any other metric a page genuinely never reports.

use crate::context::PageContext;
use crate::outcome::AnalyzerOutcome;
use crate::trait_def::Analyzer;
use async_trait::async_trait;
use audit_types::{Grade, PerformanceSection, Rating, VitalMeasurement};
use serde::Deserialize;
use std::time::Duration;

const COLLECT_METRICS_JS: &str = r#"
(() => {
  const nav = performance.getEntriesByType('navigation')[0];
  const paint = performance.getEntriesByType('paint');
  const fcpEntry = paint.find(p => p.name === 'first-contentful-paint');
  const collected = window.__cwvMetrics || {};
  return {
    lcp: collected.lcp ?? null,
    fcp: fcpEntry ? fcpEntry.startTime : (collected.fcp ?? null),
    cls: collected.cls ?? 0,
    inp: collected.inp ?? null,
    ttfb: nav ? nav.responseStart - nav.requestStart : (collected.ttfb ?? null),
    fid: collected.fid ?? null,
    tbt: collected.tbt ?? 0,
    si: collected.si ?? null,
  };
})()
"#;

#[derive(Debug, Deserialize, Default)]
struct RawMetrics {
    lcp: Option<f64>,
    fcp: Option<f64>,
    cls: Option<f64>,
    inp: Option<f64>,
    ttfb: Option<f64>,
    fid: Option<f64>,
    tbt: Option<f64>,
    si: Option<f64>,
}

pub struct PerformanceAnalyzer;

#[async_trait]
impl Analyzer for PerformanceAnalyzer {
    type Output = PerformanceSection;

    fn name(&self) -> &'static str {
        "performance"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    async fn analyze(&self, ctx: &PageContext<'_>) -> AnalyzerOutcome<Self::Output> {
        let raw = match ctx.page.evaluate(COLLECT_METRICS_JS).await {
            Ok(result) => result.into_value::<RawMetrics>().unwrap_or_default(),
            Err(e) => return AnalyzerOutcome::failed(format!("failed to collect metrics: {e}")),
        };

        let section = build_section(&raw);
        AnalyzerOutcome::ok(section)
    }
}

/// web.dev's Core Web Vitals thresholds. A measurement that's missing
/// (the browser never reported it, e.g. no interaction for INP/FID)
/// rates as `Good` with a `0` value rather than dragging the score
/// down for a metric that genuinely doesn't apply to this page load.
fn rate(value: Option<f64>, good_at_most: f64, poor_above: f64) -> VitalMeasurement {
    let value = value.unwrap_or(0.0);
    let rating = if value <= good_at_most {
        Rating::Good
    } else if value > poor_above {
        Rating::Poor
    } else {
        Rating::NeedsImprovement
    };
    VitalMeasurement { value, rating }
}

fn build_section(raw: &RawMetrics) -> PerformanceSection {
    let lcp = rate(raw.lcp, 2500.0, 4000.0);
    let fcp = rate(raw.fcp, 1800.0, 3000.0);
    let cls = rate(raw.cls, 0.1, 0.25);
    let inp = rate(raw.inp, 200.0, 500.0);
    let ttfb = rate(raw.ttfb, 800.0, 1800.0);
    let fid = rate(raw.fid, 100.0, 300.0);
    let tbt = rate(raw.tbt, 200.0, 600.0);
    let si = rate(raw.si, 3400.0, 5800.0);

    let ratings = [lcp.rating, fcp.rating, cls.rating, inp.rating, ttfb.rating, tbt.rating, si.rating];
    let score = score_from_ratings(&ratings);

    PerformanceSection {
        lcp,
        fcp,
        cls,
        inp,
        ttfb,
        fid,
        tbt,
        si,
        score,
        grade: Grade::from_score(score),
    }
}

/// Each Good rating is worth full credit, NeedsImprovement half, Poor
/// none, averaged over the rated vitals. FID is excluded from scoring
/// since it's being phased out in favor of INP and is frequently
/// unavailable.
fn score_from_ratings(ratings: &[Rating]) -> u8 {
    let total: f64 = ratings
        .iter()
        .map(|r| match r {
            Rating::Good => 100.0,
            Rating::NeedsImprovement => 50.0,
            Rating::Poor => 0.0,
        })
        .sum();
    (total / ratings.len() as f64).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_good_vitals_score_100() {
        let raw = RawMetrics {
            lcp: Some(1000.0),
            fcp: Some(500.0),
            cls: Some(0.0),
            inp: Some(50.0),
            ttfb: Some(100.0),
            fid: Some(10.0),
            tbt: Some(0.0),
            si: Some(1000.0),
        };
        let section = build_section(&raw);
        assert_eq!(section.score, 100);
        assert_eq!(section.grade, Grade::A);
    }

    #[test]
    fn all_poor_vitals_score_0() {
        let raw = RawMetrics {
            lcp: Some(9000.0),
            fcp: Some(9000.0),
            cls: Some(1.0),
            inp: Some(9000.0),
            ttfb: Some(9000.0),
            fid: Some(9000.0),
            tbt: Some(9000.0),
            si: Some(9000.0),
        };
        let section = build_section(&raw);
        assert_eq!(section.score, 0);
        assert_eq!(section.grade, Grade::F);
    }

    #[test]
    fn missing_metrics_default_to_good() {
        let section = build_section(&RawMetrics::default());
        assert_eq!(section.lcp.rating, Rating::Good);
        assert_eq!(section.score, 100);
    }
}
