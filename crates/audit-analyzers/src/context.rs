//! Everything an analyzer needs about the page it's scoring.

use spider_chrome::Page;

/// Snapshot handed to each analyzer after navigation completes. `html`
/// is captured once by the orchestrator and shared across every
/// analyzer that only needs static DOM; analyzers that need live page
/// state (e.g. a resize for the mobile check) use `page` directly.
pub struct PageContext<'a> {
    pub url: &'a str,
    pub final_url: &'a str,
    pub html: &'a str,
    pub page: &'a Page,
}
