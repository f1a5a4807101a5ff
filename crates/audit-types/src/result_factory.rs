//! Result Factory (spec §4.C) — the one place every terminal
//! [`PageResult`] shape gets built, so the queue, the orchestrator, and
//! every error path produce byte-identical records for equivalent
//! conditions instead of each hand-rolling their own partial struct
//! literal.

use crate::redirect::RedirectInfo;
use crate::result::{PageResult, PageStatus};
use chrono::Utc;

fn blank(url: impl Into<String>, final_url: impl Into<String>, status: PageStatus, duration_ms: u64) -> PageResult {
    PageResult {
        url: url.into(),
        final_url: final_url.into(),
        title: None,
        status,
        duration_ms,
        timestamp: Utc::now(),
        error: None,
        accessibility: None,
        performance: None,
        seo: None,
        content_weight: None,
        mobile: None,
        composite_score: None,
        grade: None,
    }
}

/// A minimal record for a URL that never made it past navigation setup
/// — no sections, no score, just enough identity to report on.
pub fn create_minimal(url: impl Into<String>, title: Option<String>) -> PageResult {
    let url = url.into();
    let mut result = blank(url.clone(), url, PageStatus::Failed, 0);
    result.title = title;
    result
}

/// spec §3 invariant: `finalUrl != url`, no analyzer sections.
pub fn create_redirect_skip(redirect: &RedirectInfo, duration_ms: u64) -> PageResult {
    blank(
        redirect.original_url.clone(),
        redirect.final_url.clone(),
        PageStatus::SkippedRedirect,
        duration_ms,
    )
}

pub fn create_http_error(url: impl Into<String>, status_code: u16, duration_ms: u64) -> PageResult {
    let url = url.into();
    let mut result = blank(url.clone(), url, PageStatus::HttpError, duration_ms);
    result.error = Some(format!("http {status_code}"));
    result
}

/// spec §3 invariant: non-empty error, no analyzer sections. Used both
/// by the orchestrator (browser crash, navigation failure) and by the
/// work queue once retries are exhausted on a retriable error (spec
/// §7: URL-level failures never propagate past the queue worker).
pub fn create_crash(url: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> PageResult {
    let url = url.into();
    let mut result = blank(url.clone(), url, PageStatus::Crashed, duration_ms);
    result.error = Some(error.into());
    debug_assert!(result.is_well_formed_crash());
    result
}

/// The full composite build-up. Sections are passed in as whatever the
/// orchestrator collected (each already `None` if its analyzer was
/// disabled, skipped, or timed out) and the composite score/grade are
/// (re)computed from whichever ones are present.
pub struct OkSections {
    pub accessibility: Option<crate::result::AccessibilitySection>,
    pub performance: Option<crate::result::PerformanceSection>,
    pub seo: Option<crate::result::SeoSection>,
    pub content_weight: Option<crate::result::ContentWeightSection>,
    pub mobile: Option<crate::result::MobileSection>,
}

pub fn create_ok(
    url: impl Into<String>,
    final_url: impl Into<String>,
    title: Option<String>,
    status: PageStatus,
    duration_ms: u64,
    sections: OkSections,
) -> PageResult {
    let mut result = blank(url, final_url, status, duration_ms);
    result.title = title;
    result.accessibility = sections.accessibility;
    result.performance = sections.performance;
    result.seo = sections.seo;
    result.content_weight = sections.content_weight;
    result.mobile = sections.mobile;
    result.recompute_composite();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::RedirectType;

    #[test]
    fn redirect_skip_has_different_final_url_and_no_sections() {
        let info = RedirectInfo {
            is_redirect: true,
            status_code: Some(301),
            original_url: "https://x/old".into(),
            final_url: "https://x/new".into(),
            url_changed: true,
            has_redirect_chain: true,
            redirect_type: Some(RedirectType::Http),
        };
        let result = create_redirect_skip(&info, 120);
        assert!(result.is_well_formed_redirect_skip());
    }

    #[test]
    fn crash_carries_nonempty_error_and_no_sections() {
        let result = create_crash("https://x/", "navigation timeout", 500);
        assert!(result.is_well_formed_crash());
    }

    #[test]
    fn http_error_has_no_sections_and_records_status_code() {
        let result = create_http_error("https://x/missing", 404, 80);
        assert_eq!(result.status, PageStatus::HttpError);
        assert!(result.error.unwrap().contains("404"));
        assert!(result.accessibility.is_none());
    }

    #[test]
    fn ok_with_no_sections_has_no_composite_score() {
        let result = create_ok(
            "https://x/",
            "https://x/",
            Some("Title".into()),
            PageStatus::Failed,
            1000,
            OkSections {
                accessibility: None,
                performance: None,
                seo: None,
                content_weight: None,
                mobile: None,
            },
        );
        assert!(result.composite_score.is_none());
    }
}
