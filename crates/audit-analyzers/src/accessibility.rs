//! Built-in accessibility analyzer: a heuristic DOM scan, not a full
//! WCAG rule engine. Callers who need one can plug in their own
//! implementation of [`audit_types::ports`]-style trait; this is the
//! default so the engine works with zero configuration.

use crate::context::PageContext;
use crate::outcome::AnalyzerOutcome;
use crate::trait_def::Analyzer;
use async_trait::async_trait;
use audit_types::{AccessibilityIssue, AccessibilitySection, IssueSeverity};
use scraper::{Html, Selector};
use std::time::Duration;

pub struct AccessibilityAnalyzer;

#[async_trait]
impl Analyzer for AccessibilityAnalyzer {
    type Output = AccessibilitySection;

    fn name(&self) -> &'static str {
        "accessibility"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    async fn analyze(&self, ctx: &PageContext<'_>) -> AnalyzerOutcome<Self::Output> {
        let document = Html::parse_document(ctx.html);
        let mut issues = Vec::new();

        let mut images_without_alt = 0u32;
        if let Ok(sel) = Selector::parse("img") {
            for img in document.select(&sel) {
                let has_alt = img
                    .value()
                    .attr("alt")
                    .map(|a| !a.trim().is_empty())
                    .unwrap_or(false);
                if !has_alt {
                    images_without_alt += 1;
                    issues.push(AccessibilityIssue {
                        code: "image-alt".into(),
                        message: "Image is missing alt text".into(),
                        severity: IssueSeverity::Error,
                        selector: "img".into(),
                        context: img.html(),
                        help_url: Some("https://www.w3.org/WAI/tutorials/images/".into()),
                    });
                }
            }
        }

        let mut buttons_without_label = 0u32;
        if let Ok(sel) = Selector::parse("button") {
            for button in document.select(&sel) {
                let text = button.text().collect::<String>();
                let has_label = !text.trim().is_empty()
                    || button.value().attr("aria-label").is_some()
                    || button.value().attr("aria-labelledby").is_some();
                if !has_label {
                    buttons_without_label += 1;
                    issues.push(AccessibilityIssue {
                        code: "button-name".into(),
                        message: "Button has no discernible text".into(),
                        severity: IssueSeverity::Error,
                        selector: "button".into(),
                        context: button.html(),
                        help_url: None,
                    });
                }
            }
        }

        let headings_count = count_headings(&document, &mut issues);

        if let Ok(sel) = Selector::parse("html") {
            let missing_lang = document
                .select(&sel)
                .next()
                .map(|el| el.value().attr("lang").is_none())
                .unwrap_or(true);
            if missing_lang {
                issues.push(AccessibilityIssue {
                    code: "html-has-lang".into(),
                    message: "<html> element is missing a lang attribute".into(),
                    severity: IssueSeverity::Warning,
                    selector: "html".into(),
                    context: String::new(),
                    help_url: None,
                });
            }
        }

        if let Ok(sel) = Selector::parse("a") {
            for link in document.select(&sel) {
                let text = link.text().collect::<String>();
                let has_aria = link.value().attr("aria-label").is_some();
                if text.trim().is_empty() && !has_aria {
                    issues.push(AccessibilityIssue {
                        code: "link-name".into(),
                        message: "Link has no discernible text".into(),
                        severity: IssueSeverity::Notice,
                        selector: "a".into(),
                        context: link.html(),
                        help_url: None,
                    });
                }
            }
        }

        // The rule engine is this module's DOM scan; it "fails entirely"
        // only when there was nothing to scan at all (an empty or
        // unparseable document), in which case the coarse counters are
        // all that's left to score from.
        let rule_engine_ran = document.root_element().children().next().is_some();
        let score = if rule_engine_ran {
            score_from_issues(&issues)
        } else {
            score_from_counters(&issues, images_without_alt, buttons_without_label, headings_count)
        };

        AnalyzerOutcome::ok(AccessibilitySection {
            issues,
            score,
            images_without_alt,
            buttons_without_label,
            headings_count,
        })
    }
}

fn count_headings(document: &Html, issues: &mut Vec<AccessibilityIssue>) -> u32 {
    let Ok(sel) = Selector::parse("h1, h2, h3, h4, h5, h6") else {
        return 0;
    };
    let mut count = 0u32;
    let mut last_level = 0u8;
    let mut seen_h1 = false;
    for heading in document.select(&sel) {
        count += 1;
        let level: u8 = heading
            .value()
            .name()
            .trim_start_matches('h')
            .parse()
            .unwrap_or(1);
        if level == 1 {
            seen_h1 = true;
        }
        if last_level != 0 && level > last_level + 1 {
            issues.push(AccessibilityIssue {
                code: "heading-order".into(),
                message: format!("Heading level jumps from h{} to h{}", last_level, level),
                severity: IssueSeverity::Warning,
                selector: format!("h{}", level),
                context: heading.html(),
                help_url: None,
            });
        }
        last_level = level;
    }
    if count > 0 && !seen_h1 {
        issues.push(AccessibilityIssue {
            code: "page-has-heading-one".into(),
            message: "Page has no top-level h1".into(),
            severity: IssueSeverity::Warning,
            selector: "h1".into(),
            context: String::new(),
            help_url: None,
        });
    }
    count
}

/// Primary scoring path: deduct per issue, each severity's total
/// deduction capped separately so a page riddled with one kind of
/// issue doesn't also zero out the budget the other severities get.
fn score_from_issues(issues: &[AccessibilityIssue]) -> u8 {
    let errors = issues.iter().filter(|i| i.severity == IssueSeverity::Error).count() as f64;
    let warnings = issues.iter().filter(|i| i.severity == IssueSeverity::Warning).count() as f64;
    let notices = issues.iter().filter(|i| i.severity == IssueSeverity::Notice).count() as f64;

    let deductions = (errors * 2.5).min(20.0) + (warnings * 1.0).min(10.0) + (notices * 0.5).min(5.0);
    (100.0 - deductions).round().clamp(0.0, 100.0) as u8
}

/// Fallback path for when the rule engine produces no issues to score
/// from at all — a coarser estimate built only from the counters this
/// scan always collects regardless of whether issue extraction worked.
fn score_from_counters(
    issues: &[AccessibilityIssue],
    images_without_alt: u32,
    buttons_without_label: u32,
    headings_count: u32,
) -> u8 {
    let errors = issues.iter().filter(|i| i.severity == IssueSeverity::Error).count() as f64;
    let warnings = issues.iter().filter(|i| i.severity == IssueSeverity::Warning).count() as f64;

    let mut deductions = errors * 15.0 + warnings * 5.0 + images_without_alt as f64 * 3.0 + buttons_without_label as f64 * 5.0;
    if headings_count == 0 {
        deductions += 20.0;
    }
    (100.0 - deductions).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_page_scores_perfectly() {
        let issues = vec![];
        assert_eq!(score_from_issues(&issues), 100);
    }

    #[test]
    fn errors_cost_more_than_warnings_or_notices() {
        let error = AccessibilityIssue {
            code: "x".into(),
            message: "x".into(),
            severity: IssueSeverity::Error,
            selector: "x".into(),
            context: "".into(),
            help_url: None,
        };
        let warning = AccessibilityIssue {
            severity: IssueSeverity::Warning,
            ..error.clone()
        };
        assert!(score_from_issues(&[error]) < score_from_issues(&[warning]));
    }

    #[test]
    fn score_never_goes_below_zero() {
        let issue = AccessibilityIssue {
            code: "x".into(),
            message: "x".into(),
            severity: IssueSeverity::Error,
            selector: "x".into(),
            context: "".into(),
            help_url: None,
        };
        let many = vec![issue; 50];
        assert_eq!(score_from_issues(&many), 0);
    }

    #[test]
    fn error_deduction_is_capped_at_twenty() {
        let error = AccessibilityIssue {
            code: "x".into(),
            message: "x".into(),
            severity: IssueSeverity::Error,
            selector: "x".into(),
            context: "".into(),
            help_url: None,
        };
        // 9 errors at 2.5 each would be 22.5 uncapped; the cap holds it to 20.
        let score = score_from_issues(&vec![error; 9]);
        assert_eq!(score, 80);
    }

    #[test]
    fn fallback_counters_zero_headings_costs_twenty() {
        let with_headings = score_from_counters(&[], 0, 0, 1);
        let without_headings = score_from_counters(&[], 0, 0, 0);
        assert_eq!(with_headings, 100);
        assert_eq!(without_headings, 80);
    }
}
