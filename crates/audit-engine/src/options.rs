//! `run(options)` input shape (spec §4.H options table).

use audit_orchestrator::OrchestratorConfig;
use audit_pool::BrowserPoolConfig;
use audit_queue::WorkQueueConfig;
use audit_types::BudgetTemplate;
use std::time::Duration;

/// Accessibility rule set (spec §6 `pa11yStandard`). The built-in
/// heuristic accessibility analyzer doesn't vary its scan by standard —
/// it isn't a full WCAG rule engine — but the option is threaded
/// through so a caller's own [`audit_types::ports`]-style rule engine
/// can honor it (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessibilityStandard {
    Wcag2A,
    Wcag2AA,
    Wcag2AAA,
    Section508,
}

impl Default for AccessibilityStandard {
    fn default() -> Self {
        AccessibilityStandard::Wcag2AA
    }
}

impl AccessibilityStandard {
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "WCAG2A" => Some(Self::Wcag2A),
            "WCAG2AA" => Some(Self::Wcag2AA),
            "WCAG2AAA" => Some(Self::Wcag2AAA),
            "Section508" => Some(Self::Section508),
            _ => None,
        }
    }
}

/// clap-facing mirror of [`BudgetTemplate`] — kept separate so
/// `audit-types` doesn't need a `clap` dependency just for a CLI enum.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum BudgetTemplateArg {
    Default,
    Ecommerce,
    Blog,
    Corporate,
}

impl From<BudgetTemplateArg> for BudgetTemplate {
    fn from(arg: BudgetTemplateArg) -> Self {
        match arg {
            BudgetTemplateArg::Default => BudgetTemplate::Default,
            BudgetTemplateArg::Ecommerce => BudgetTemplate::Ecommerce,
            BudgetTemplateArg::Blog => BudgetTemplate::Blog,
            BudgetTemplateArg::Corporate => BudgetTemplate::Corporate,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

/// Full `run(options)` input (spec §4.H). Fields map 1:1 onto the
/// options table; defaults match the spec's stated defaults.
#[derive(Clone)]
pub struct EngineOptions {
    pub max_pages: Option<usize>,
    pub max_concurrent: usize,
    pub timeout_ms: u64,
    pub pa11y_standard: AccessibilityStandard,
    pub enable_accessibility: bool,
    pub enable_performance: bool,
    pub enable_seo: bool,
    pub enable_content_weight: bool,
    pub enable_mobile: bool,
    pub skip_redirects: bool,
    pub budget_template: BudgetTemplate,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub capture_screenshots: bool,
    pub screenshot_dir: Option<std::path::PathBuf>,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub progress_interval_ms: u64,
    pub pool_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_concurrent: 4,
            timeout_ms: 75_000,
            pa11y_standard: AccessibilityStandard::default(),
            enable_accessibility: true,
            enable_performance: true,
            enable_seo: true,
            enable_content_weight: true,
            enable_mobile: true,
            skip_redirects: true,
            budget_template: BudgetTemplate::default(),
            viewport: Viewport::default(),
            user_agent: None,
            capture_screenshots: false,
            screenshot_dir: None,
            max_retries: 3,
            retry_backoff_base_ms: 2000,
            progress_interval_ms: 2_000,
            pool_size: 3,
        }
    }
}

impl EngineOptions {
    /// Accessibility is always on regardless of the flag (spec §4.H:
    /// "accessibility always on").
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            overall_deadline: Duration::from_millis(self.timeout_ms),
            skip_redirects: self.skip_redirects,
            budget_template: self.budget_template,
            enable_accessibility: true,
            enable_performance: self.enable_performance,
            enable_seo: self.enable_seo,
            enable_content_weight: self.enable_content_weight,
            enable_mobile: self.enable_mobile,
            capture_screenshots: self.capture_screenshots,
            screenshot_dir: self.screenshot_dir.clone(),
            ..OrchestratorConfig::default()
        }
    }

    pub fn pool_config(&self) -> BrowserPoolConfig {
        BrowserPoolConfig {
            pool_size: self.pool_size.max(self.max_concurrent),
            viewport_width: self.viewport.width,
            viewport_height: self.viewport.height,
            user_agent: self.user_agent.clone(),
            navigation_timeout: Duration::from_millis(self.timeout_ms),
            ..BrowserPoolConfig::default()
        }
        .from_env()
    }

    pub fn queue_config(&self) -> WorkQueueConfig {
        WorkQueueConfig {
            max_concurrent: self.max_concurrent,
            max_retries: self.max_retries,
            retry_backoff_base_ms: self.retry_backoff_base_ms,
            per_task_timeout_ms: self.timeout_ms,
            progress_interval_ms: self.progress_interval_ms,
            ..WorkQueueConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessibility_standard_parses_enumerated_values() {
        assert_eq!(AccessibilityStandard::from_str_opt("WCAG2AA"), Some(AccessibilityStandard::Wcag2AA));
        assert_eq!(AccessibilityStandard::from_str_opt("bogus"), None);
    }

    #[test]
    fn orchestrator_config_forces_accessibility_on_even_when_disabled() {
        let options = EngineOptions { enable_accessibility: false, ..EngineOptions::default() };
        assert!(options.orchestrator_config().enable_accessibility);
    }

    #[test]
    fn pool_config_is_at_least_max_concurrent() {
        let options = EngineOptions { max_concurrent: 10, pool_size: 3, ..EngineOptions::default() };
        assert_eq!(options.pool_config().pool_size, 10);
    }
}
