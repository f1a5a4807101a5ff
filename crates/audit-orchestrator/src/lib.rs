//! Redirect detection, the Result Factory wiring, and the per-page
//! analysis pipeline (spec §4.B, §4.C, §4.E). The Result Factory
//! itself lives in `audit-types` since every crate that produces a
//! terminal [`PageResult`](audit_types::PageResult) — not just this
//! orchestrator — needs it; this crate re-exports it for convenience.

pub mod config;
pub mod orchestrator;
pub mod redirect;
pub mod screenshot;

pub use audit_types::result_factory;
pub use config::OrchestratorConfig;
pub use orchestrator::PageAnalysisOrchestrator;
pub use redirect::RedirectDetector;
