//! Mobile-friendliness analyzer. Resizes the viewport to a phone size
//! to measure layout, which is why it needs an isolated page — any
//! other analyzer reading layout concurrently would see the resized
//! viewport too (spec §4.D).

use crate::context::PageContext;
use crate::outcome::AnalyzerOutcome;
use crate::trait_def::Analyzer;
use async_trait::async_trait;
use audit_types::MobileSection;
use scraper::{Html, Selector};
use serde::Deserialize;
use spider_chrome::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use std::time::Duration;

const MEASURE_LAYOUT_JS: &str = r#"
(() => {
  const smallTextThreshold = 12;
  const touchTargetMin = 44;
  let totalText = 0;
  let smallText = 0;
  let totalTargets = 0;
  let smallTargets = 0;

  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT);
  let node = walker.currentNode;
  while (node) {
    const style = window.getComputedStyle(node);
    const fontSize = parseFloat(style.fontSize) || 16;
    const text = node.textContent ? node.textContent.trim() : '';
    if (text.length > 0 && node.children.length === 0) {
      totalText += 1;
      if (fontSize < smallTextThreshold) smallText += 1;
    }
    if (['A', 'BUTTON', 'INPUT', 'SELECT'].includes(node.tagName)) {
      const rect = node.getBoundingClientRect();
      totalTargets += 1;
      if (rect.width < touchTargetMin || rect.height < touchTargetMin) smallTargets += 1;
    }
    node = walker.nextNode();
  }

  return {
    smallTextFraction: totalText > 0 ? smallText / totalText : 0,
    touchTargetViolationFraction: totalTargets > 0 ? smallTargets / totalTargets : 0,
    horizontalOverflow: document.documentElement.scrollWidth > window.innerWidth,
  };
})()
"#;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawLayout {
    small_text_fraction: f64,
    touch_target_violation_fraction: f64,
    horizontal_overflow: bool,
}

pub struct MobileAnalyzer;

#[async_trait]
impl Analyzer for MobileAnalyzer {
    type Output = MobileSection;

    fn name(&self) -> &'static str {
        "mobile"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn requires_isolated_page(&self) -> bool {
        true
    }

    async fn analyze(&self, ctx: &PageContext<'_>) -> AnalyzerOutcome<Self::Output> {
        let viewport_present = has_viewport_meta(ctx.html);

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(375)
            .height(667)
            .device_scale_factor(2.0)
            .mobile(true)
            .build()
            .expect("static viewport params are always valid");
        if let Err(e) = ctx.page.execute(metrics).await {
            return AnalyzerOutcome::failed(format!("failed to resize viewport: {e}"));
        }

        let raw = match ctx.page.evaluate(MEASURE_LAYOUT_JS).await {
            Ok(result) => result.into_value::<RawLayout>().unwrap_or_default(),
            Err(e) => return AnalyzerOutcome::failed(format!("failed to measure layout: {e}")),
        };

        let touch_target_score = (100.0 * (1.0 - raw.touch_target_violation_fraction))
            .round()
            .clamp(0.0, 100.0) as u8;
        let typography_score = (100.0 * (1.0 - raw.small_text_fraction)).round().clamp(0.0, 100.0) as u8;
        let content_sizing_score = if raw.horizontal_overflow { 40 } else { 100 };

        let score = score_mobile(viewport_present, touch_target_score, typography_score, content_sizing_score);

        AnalyzerOutcome::ok(MobileSection {
            viewport_present,
            touch_target_score,
            typography_score,
            content_sizing_score,
            small_text_fraction: raw.small_text_fraction,
            horizontal_overflow: raw.horizontal_overflow,
            score,
        })
    }
}

fn has_viewport_meta(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse(r#"meta[name="viewport"]"#) else {
        return false;
    };
    document.select(&sel).next().is_some()
}

/// Viewport presence is weighted heaviest — a page with no viewport
/// meta tag is almost never usable on a phone regardless of anything
/// else measured here.
fn score_mobile(viewport_present: bool, touch: u8, typography: u8, sizing: u8) -> u8 {
    let viewport_score = if viewport_present { 100.0 } else { 0.0 };
    let weighted = viewport_score * 0.4 + touch as f64 * 0.25 + typography as f64 * 0.15 + sizing as f64 * 0.2;
    weighted.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_viewport_caps_score_low() {
        let score = score_mobile(false, 100, 100, 100);
        assert!(score <= 60);
    }

    #[test]
    fn good_everything_scores_100() {
        assert_eq!(score_mobile(true, 100, 100, 100), 100);
    }

    #[test]
    fn viewport_meta_detection_matches_presence() {
        assert!(has_viewport_meta(r#"<html><head><meta name="viewport" content="width=device-width"></head></html>"#));
        assert!(!has_viewport_meta("<html><head></head></html>"));
    }
}
