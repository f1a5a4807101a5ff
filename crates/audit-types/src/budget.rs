//! Budget templates (spec §4.D.4, §6 `budgetTemplate` option) — the
//! thresholds the content-weight analyzer scores total page bytes
//! against. Each template skews the "good"/"needs improvement"
//! boundaries toward what's realistic for that kind of site rather
//! than applying one generic budget everywhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetTemplate {
    Default,
    Ecommerce,
    Blog,
    Corporate,
}

impl Default for BudgetTemplate {
    fn default() -> Self {
        BudgetTemplate::Default
    }
}

impl BudgetTemplate {
    /// `(good_bytes, needs_improvement_bytes)` — at or under the first,
    /// score is 100; beyond the second, score decays toward 0.
    ///
    /// Ecommerce product pages carry heavier image galleries and
    /// checkout scripting, so they get the most headroom. Blogs are
    /// mostly text and get the tightest budget; corporate sites sit
    /// between blog and the generic default.
    pub fn total_bytes_thresholds(self) -> (u64, u64) {
        match self {
            BudgetTemplate::Default => (1_600_000, 3_000_000),
            BudgetTemplate::Ecommerce => (2_500_000, 4_500_000),
            BudgetTemplate::Blog => (1_200_000, 2_200_000),
            BudgetTemplate::Corporate => (1_800_000, 3_200_000),
        }
    }

    pub fn from_option_str(s: &str) -> Option<Self> {
        match s {
            "default" => Some(BudgetTemplate::Default),
            "ecommerce" => Some(BudgetTemplate::Ecommerce),
            "blog" => Some(BudgetTemplate::Blog),
            "corporate" => Some(BudgetTemplate::Corporate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecommerce_allows_more_bytes_than_blog() {
        let (eco_good, _) = BudgetTemplate::Ecommerce.total_bytes_thresholds();
        let (blog_good, _) = BudgetTemplate::Blog.total_bytes_thresholds();
        assert!(eco_good > blog_good);
    }

    #[test]
    fn unknown_option_string_is_none() {
        assert!(BudgetTemplate::from_option_str("nonsense").is_none());
    }

    #[test]
    fn every_template_round_trips_its_option_string() {
        for (s, template) in [
            ("default", BudgetTemplate::Default),
            ("ecommerce", BudgetTemplate::Ecommerce),
            ("blog", BudgetTemplate::Blog),
            ("corporate", BudgetTemplate::Corporate),
        ] {
            assert_eq!(BudgetTemplate::from_option_str(s), Some(template));
        }
    }
}
