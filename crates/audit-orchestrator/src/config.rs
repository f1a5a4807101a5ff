//! Page Analysis Orchestrator configuration (spec §4.E, §6 options table).

use audit_types::BudgetTemplate;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Timeout for the redirect-detection HTTP preflight (§4.B).
    pub redirect_probe_timeout: Duration,
    /// Overall per-URL deadline (§4.E step 8): analyzers still pending
    /// when this elapses are capped to a zero timeout and counted as
    /// unavailable rather than aborting the whole page.
    pub overall_deadline: Duration,
    /// `skipRedirects` (§6): when true, a detected redirect short-circuits
    /// straight to a `SkippedRedirect` result without ever opening a page.
    pub skip_redirects: bool,
    pub budget_template: BudgetTemplate,
    pub enable_accessibility: bool,
    pub enable_performance: bool,
    pub enable_seo: bool,
    pub enable_content_weight: bool,
    pub enable_mobile: bool,
    /// `captureScreenshots` (§4.H): desktop + mobile capture toggle. A
    /// side artifact written next to the run, not part of the Page
    /// Result shape (spec §3 is silent on screenshots). `None` disables
    /// capture outright regardless of the flag.
    pub capture_screenshots: bool,
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            redirect_probe_timeout: Duration::from_secs(10),
            overall_deadline: Duration::from_secs(75),
            skip_redirects: true,
            budget_template: BudgetTemplate::default(),
            enable_accessibility: true,
            enable_performance: true,
            enable_seo: true,
            enable_content_weight: true,
            enable_mobile: true,
            capture_screenshots: false,
            screenshot_dir: None,
        }
    }
}

impl OrchestratorConfig {
    /// Applies environment overrides, mirroring the hook every other
    /// config in this workspace exposes. Unset or unparsable variables
    /// are ignored.
    pub fn from_env(mut self) -> Self {
        if let Ok(v) = std::env::var("AUDITMYSITE_SKIP_REDIRECTS") {
            if let Ok(b) = v.parse() {
                self.skip_redirects = b;
            }
        }
        if let Ok(v) = std::env::var("AUDITMYSITE_BUDGET_TEMPLATE") {
            if let Some(t) = BudgetTemplate::from_option_str(&v) {
                self.budget_template = t;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.overall_deadline.is_zero() {
            return Err("overall_deadline must be greater than zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_every_analyzer() {
        let config = OrchestratorConfig::default();
        assert!(config.enable_accessibility);
        assert!(config.enable_performance);
        assert!(config.enable_seo);
        assert!(config.enable_content_weight);
        assert!(config.enable_mobile);
    }

    #[test]
    fn zero_deadline_fails_validation() {
        let mut config = OrchestratorConfig::default();
        config.overall_deadline = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
