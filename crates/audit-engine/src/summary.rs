//! `RunResult` / summary aggregation (spec §4.H: `RunResult = {
//! summary, pages[], skippedUrls[], durationMs, metadata }`).

use audit_types::{Grade, PageResult, PageStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_pages: usize,
    pub passed: usize,
    pub failed: usize,
    pub crashed: usize,
    pub http_errors: usize,
    pub skipped_redirects: usize,
    pub average_composite_score: Option<u8>,
    pub overall_grade: Option<Grade>,
}

impl RunSummary {
    pub fn from_pages(pages: &[PageResult], skipped_count: usize) -> Self {
        let mut summary = RunSummary { skipped_redirects: skipped_count, ..RunSummary::default() };
        summary.total_pages = pages.len() + skipped_count;

        let mut score_sum = 0u64;
        let mut scored = 0u64;
        for page in pages {
            match page.status {
                PageStatus::Passed => summary.passed += 1,
                PageStatus::Failed => summary.failed += 1,
                PageStatus::Crashed => summary.crashed += 1,
                PageStatus::HttpError => summary.http_errors += 1,
                PageStatus::SkippedRedirect => summary.skipped_redirects += 1,
            }
            if let Some(score) = page.composite_score {
                score_sum += score as u64;
                scored += 1;
            }
        }

        if scored > 0 {
            let average = (score_sum / scored) as u8;
            summary.average_composite_score = Some(average);
            summary.overall_grade = Some(Grade::from_score(average));
        }

        summary
    }
}

/// Public result of [`crate::run`] (spec §4.H).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub summary: RunSummary,
    pub pages: Vec<PageResult>,
    pub skipped_urls: Vec<String>,
    pub duration_ms: u64,
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_types::result_factory;

    #[test]
    fn summary_counts_statuses_and_averages_scores() {
        let ok = result_factory::create_ok(
            "https://a",
            "https://a",
            None,
            PageStatus::Passed,
            5,
            result_factory::OkSections {
                accessibility: Some(audit_types::AccessibilitySection {
                    issues: vec![],
                    score: 80,
                    images_without_alt: 0,
                    buttons_without_label: 0,
                    headings_count: 1,
                }),
                performance: None,
                seo: None,
                content_weight: None,
                mobile: None,
            },
        );
        let crash = result_factory::create_crash("https://b", "boom", 5);

        let summary = RunSummary::from_pages(&[ok, crash], 1);
        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.crashed, 1);
        assert_eq!(summary.skipped_redirects, 1);
        assert_eq!(summary.average_composite_score, Some(80));
    }

    #[test]
    fn empty_run_has_no_average_score() {
        let summary = RunSummary::from_pages(&[], 0);
        assert!(summary.average_composite_score.is_none());
        assert_eq!(summary.total_pages, 0);
    }
}
