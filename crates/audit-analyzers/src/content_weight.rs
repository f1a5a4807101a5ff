//! Content-weight analyzer: bytes transferred per resource type,
//! scored against budget templates (spec §4.D).

use crate::context::PageContext;
use crate::outcome::AnalyzerOutcome;
use crate::trait_def::Analyzer;
use async_trait::async_trait;
use audit_types::{BudgetTemplate, ContentWeightSection, ResourceBytes};
use serde::Deserialize;
use std::time::Duration;

const COLLECT_RESOURCES_JS: &str = r#"
(() => {
  const bytesByType = { html: 0, css: 0, javascript: 0, images: 0, fonts: 0, other: 0 };
  const entries = performance.getEntriesByType('resource');
  for (const e of entries) {
    const size = e.transferSize || e.encodedBodySize || 0;
    switch (e.initiatorType) {
      case 'css': case 'link': bytesByType.css += size; break;
      case 'script': bytesByType.javascript += size; break;
      case 'img': case 'image': bytesByType.images += size; break;
      case 'css-font-face-rule': case 'font': bytesByType.fonts += size; break;
      default: bytesByType.other += size;
    }
  }
  bytesByType.html = document.documentElement.outerHTML.length;
  return bytesByType;
})()
"#;

#[derive(Debug, Deserialize, Default)]
struct RawBytes {
    html: f64,
    css: f64,
    javascript: f64,
    images: f64,
    fonts: f64,
    other: f64,
}

/// Scores total page weight against a [`BudgetTemplate`]'s thresholds
/// (spec §4.D.4). Defaults to [`BudgetTemplate::Default`] when the run
/// doesn't pick one.
pub struct ContentWeightAnalyzer {
    pub template: BudgetTemplate,
}

impl Default for ContentWeightAnalyzer {
    fn default() -> Self {
        Self {
            template: BudgetTemplate::default(),
        }
    }
}

impl ContentWeightAnalyzer {
    pub fn new(template: BudgetTemplate) -> Self {
        Self { template }
    }
}

#[async_trait]
impl Analyzer for ContentWeightAnalyzer {
    type Output = ContentWeightSection;

    fn name(&self) -> &'static str {
        "content-weight"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    async fn analyze(&self, ctx: &PageContext<'_>) -> AnalyzerOutcome<Self::Output> {
        let raw = match ctx.page.evaluate(COLLECT_RESOURCES_JS).await {
            Ok(result) => result.into_value::<RawBytes>().unwrap_or_default(),
            Err(e) => return AnalyzerOutcome::failed(format!("failed to collect resource sizes: {e}")),
        };

        let bytes = ResourceBytes {
            html: raw.html as u64,
            css: raw.css as u64,
            javascript: raw.javascript as u64,
            images: raw.images as u64,
            fonts: raw.fonts as u64,
            other: raw.other as u64,
        };
        let total_bytes = bytes.total();
        let text_to_code_ratio = text_to_code_ratio(ctx.html, bytes.html);
        let score = score_weight(total_bytes, self.template);

        AnalyzerOutcome::ok(ContentWeightSection {
            bytes,
            total_bytes,
            text_to_code_ratio,
            score,
        })
    }
}

fn text_to_code_ratio(html: &str, html_bytes: u64) -> f64 {
    if html_bytes == 0 {
        return 0.0;
    }
    let text_bytes = scraper::Html::parse_document(html)
        .root_element()
        .text()
        .map(|t| t.len())
        .sum::<usize>() as f64;
    (text_bytes / html_bytes as f64).clamp(0.0, 1.0)
}

fn score_weight(total_bytes: u64, template: BudgetTemplate) -> u8 {
    let (good_bytes, needs_improvement_bytes) = template.total_bytes_thresholds();
    if total_bytes <= good_bytes {
        100
    } else if total_bytes <= needs_improvement_bytes {
        let over = (total_bytes - good_bytes) as f64;
        let span = (needs_improvement_bytes - good_bytes) as f64;
        (90.0 - 40.0 * (over / span)).round().clamp(50.0, 90.0) as u8
    } else {
        let over = (total_bytes - needs_improvement_bytes) as f64;
        (50.0 - (over / 100_000.0)).round().clamp(0.0, 50.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_budget_scores_100() {
        assert_eq!(score_weight(500_000, BudgetTemplate::Default), 100);
    }

    #[test]
    fn over_good_budget_scores_between_50_and_90() {
        let score = score_weight(2_000_000, BudgetTemplate::Default);
        assert!((50..=90).contains(&score));
    }

    #[test]
    fn far_over_budget_scores_near_zero() {
        assert_eq!(score_weight(10_000_000, BudgetTemplate::Default), 0);
    }

    #[test]
    fn same_page_weight_scores_better_under_a_looser_template() {
        let bytes = 2_800_000;
        let blog_score = score_weight(bytes, BudgetTemplate::Blog);
        let ecommerce_score = score_weight(bytes, BudgetTemplate::Ecommerce);
        assert!(ecommerce_score > blog_score);
    }

    #[test]
    fn text_to_code_ratio_is_bounded() {
        let html = "<html><body><p>hello world</p></body></html>";
        let ratio = text_to_code_ratio(html, html.len() as u64);
        assert!((0.0..=1.0).contains(&ratio));
    }
}
