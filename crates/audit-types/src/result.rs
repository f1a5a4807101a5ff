//! Page Result composite and analyzer sections (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of a single page test (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageStatus {
    Passed,
    Failed,
    Crashed,
    SkippedRedirect,
    HttpError,
}

/// Letter grade derived from a 0..100 score using the canonical
/// thresholds: A >= 90, B >= 80, C >= 70, D >= 60, else F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=100 => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

/// Rating bucket for a single Core Web Vital, against the thresholds
/// in spec §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueSeverity {
    Error,
    Warning,
    Notice,
}

/// A single accessibility finding, shaped to match what the external
/// rule engine contract (spec §6) returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessibilityIssue {
    pub code: String,
    pub message: String,
    pub severity: IssueSeverity,
    pub selector: String,
    pub context: String,
    pub help_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessibilitySection {
    /// All findings, in engine-reported order. `errors()`/`warnings()`/
    /// `notices()` are severity-filtered views over this single list —
    /// the spec's `errors[]`/`warnings[]`/`notices[]` partitions are
    /// derivable rather than stored redundantly (see DESIGN.md).
    pub issues: Vec<AccessibilityIssue>,
    pub score: u8,
    pub images_without_alt: u32,
    pub buttons_without_label: u32,
    pub headings_count: u32,
}

impl AccessibilitySection {
    pub fn errors(&self) -> impl Iterator<Item = &AccessibilityIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &AccessibilityIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
    }

    pub fn notices(&self) -> impl Iterator<Item = &AccessibilityIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Notice)
    }
}

/// One Core Web Vital measurement plus its rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VitalMeasurement {
    pub value: f64,
    pub rating: Rating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSection {
    pub lcp: VitalMeasurement,
    pub fcp: VitalMeasurement,
    pub cls: VitalMeasurement,
    pub inp: VitalMeasurement,
    pub ttfb: VitalMeasurement,
    pub fid: VitalMeasurement,
    pub tbt: VitalMeasurement,
    pub si: VitalMeasurement,
    pub score: u8,
    pub grade: Grade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaTag {
    pub present: bool,
    pub length: u32,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: u32,
    pub h2: u32,
    pub h3: u32,
    pub h4: u32,
    pub h5: u32,
    pub h6: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCounts {
    pub internal: u32,
    pub external: u32,
}

/// Open Graph / Twitter card presence, folded into the extended SEO
/// signals rather than a separate top-level section (spec is silent on
/// exact shape; see SPEC_FULL.md §2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialTags {
    pub open_graph_present: bool,
    pub twitter_card_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoSection {
    pub title: MetaTag,
    pub description: MetaTag,
    pub keywords: Option<String>,
    pub headings: HeadingCounts,
    pub readability_score: u8,
    pub word_count: u32,
    pub links: LinkCounts,
    pub social: SocialTags,
    pub semantic_topics: Vec<String>,
    pub score: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceBytes {
    pub html: u64,
    pub css: u64,
    pub javascript: u64,
    pub images: u64,
    pub fonts: u64,
    pub other: u64,
}

impl ResourceBytes {
    pub fn total(&self) -> u64 {
        self.html + self.css + self.javascript + self.images + self.fonts + self.other
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentWeightSection {
    pub bytes: ResourceBytes,
    pub total_bytes: u64,
    pub text_to_code_ratio: f64,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileSection {
    pub viewport_present: bool,
    pub touch_target_score: u8,
    pub typography_score: u8,
    pub content_sizing_score: u8,
    pub small_text_fraction: f64,
    pub horizontal_overflow: bool,
    pub score: u8,
}

/// Weights from spec §3 used to derive the composite score from
/// whichever sections are present.
pub mod weights {
    pub const ACCESSIBILITY: u32 = 25;
    pub const PERFORMANCE: u32 = 25;
    pub const SEO: u32 = 25;
    pub const CONTENT: u32 = 15;
    pub const MOBILE: u32 = 10;
}

/// The canonical per-page result record. All five constructors in
/// `audit-orchestrator`'s Result Factory build this same shape so the
/// queue, orchestrator, and error paths never diverge (spec §4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub final_url: String,
    pub title: Option<String>,
    pub status: PageStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,

    pub accessibility: Option<AccessibilitySection>,
    pub performance: Option<PerformanceSection>,
    pub seo: Option<SeoSection>,
    pub content_weight: Option<ContentWeightSection>,
    pub mobile: Option<MobileSection>,

    pub composite_score: Option<u8>,
    pub grade: Option<Grade>,
}

impl PageResult {
    /// Recomputes `composite_score`/`grade` from whichever sections are
    /// present, per the weights in spec §3. A no-op (leaves both
    /// `None`) when no section is present.
    pub fn recompute_composite(&mut self) {
        let mut weighted_sum = 0f64;
        let mut weight_total = 0u32;

        if let Some(ref s) = self.accessibility {
            weighted_sum += s.score as f64 * weights::ACCESSIBILITY as f64;
            weight_total += weights::ACCESSIBILITY;
        }
        if let Some(ref s) = self.performance {
            weighted_sum += s.score as f64 * weights::PERFORMANCE as f64;
            weight_total += weights::PERFORMANCE;
        }
        if let Some(ref s) = self.seo {
            weighted_sum += s.score as f64 * weights::SEO as f64;
            weight_total += weights::SEO;
        }
        if let Some(ref s) = self.content_weight {
            weighted_sum += s.score as f64 * weights::CONTENT as f64;
            weight_total += weights::CONTENT;
        }
        if let Some(ref s) = self.mobile {
            weighted_sum += s.score as f64 * weights::MOBILE as f64;
            weight_total += weights::MOBILE;
        }

        if weight_total == 0 {
            self.composite_score = None;
            self.grade = None;
            return;
        }

        let score = (weighted_sum / weight_total as f64).round().clamp(0.0, 100.0) as u8;
        self.composite_score = Some(score);
        self.grade = Some(Grade::from_score(score));
    }

    /// Spec §3 invariant: a redirect-skip result omits every analyzer
    /// section and carries a different final URL.
    pub fn is_well_formed_redirect_skip(&self) -> bool {
        self.status == PageStatus::SkippedRedirect
            && self.final_url != self.url
            && self.accessibility.is_none()
            && self.performance.is_none()
            && self.seo.is_none()
            && self.content_weight.is_none()
            && self.mobile.is_none()
    }

    /// Spec §3 invariant: a crash result carries a non-empty error and
    /// no analyzer sections.
    pub fn is_well_formed_crash(&self) -> bool {
        self.status == PageStatus::Crashed
            && self.error.as_deref().is_some_and(|e| !e.is_empty())
            && self.accessibility.is_none()
            && self.performance.is_none()
            && self.seo.is_none()
            && self.content_weight.is_none()
            && self.mobile.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(score: u8) -> AccessibilitySection {
        AccessibilitySection {
            issues: vec![],
            score,
            images_without_alt: 0,
            buttons_without_label: 0,
            headings_count: 1,
        }
    }

    fn base_result() -> PageResult {
        PageResult {
            url: "https://example.com".into(),
            final_url: "https://example.com".into(),
            title: Some("Example".into()),
            status: PageStatus::Passed,
            duration_ms: 100,
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

    #[test]
    fn composite_absent_when_no_sections_present() {
        let mut r = base_result();
        r.recompute_composite();
        assert!(r.composite_score.is_none());
        assert!(r.grade.is_none());
    }

    #[test]
    fn composite_equals_single_section_score_when_only_one_present() {
        let mut r = base_result();
        r.accessibility = Some(section(80));
        r.recompute_composite();
        assert_eq!(r.composite_score, Some(80));
        assert_eq!(r.grade, Some(Grade::B));
    }

    #[test]
    fn composite_score_in_bounds_for_mixed_sections() {
        let mut r = base_result();
        r.accessibility = Some(section(100));
        r.seo = Some(SeoSection {
            title: MetaTag { present: true, length: 10, content: Some("t".into()) },
            description: MetaTag { present: true, length: 50, content: Some("d".into()) },
            keywords: None,
            headings: HeadingCounts { h1: 1, h2: 2, h3: 0, h4: 0, h5: 0, h6: 0 },
            readability_score: 70,
            word_count: 500,
            links: LinkCounts { internal: 10, external: 2 },
            social: SocialTags::default(),
            semantic_topics: vec![],
            score: 0,
        });
        r.recompute_composite();
        let score = r.composite_score.unwrap();
        assert!(score <= 100);
        // weighted: (100*25 + 0*25) / 50 = 50
        assert_eq!(score, 50);
    }

    #[test]
    fn grade_thresholds_match_spec() {
        assert_eq!(Grade::from_score(95), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::C);
        assert_eq!(Grade::from_score(60), Grade::D);
        assert_eq!(Grade::from_score(59), Grade::F);
    }

    #[test]
    fn redirect_skip_and_crash_shape_checks() {
        let mut r = base_result();
        r.status = PageStatus::SkippedRedirect;
        r.final_url = "https://example.com/new".into();
        assert!(r.is_well_formed_redirect_skip());

        let mut c = base_result();
        c.status = PageStatus::Crashed;
        c.error = Some("navigation timeout".into());
        assert!(c.is_well_formed_crash());

        let mut bad = base_result();
        bad.status = PageStatus::Crashed;
        bad.error = None;
        assert!(!bad.is_well_formed_crash());
    }
}
