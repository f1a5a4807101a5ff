//! Error taxonomy shared across the audit engine (spec §7).
//!
//! Every crate in the workspace maps its own failures onto
//! [`AuditError`] at its public boundary, mirroring how the teacher
//! workspace funnels crate-local errors into a single `RiptideError`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

/// The eight error kinds from spec §7, kept as *kinds* (not one enum
/// variant per call site) so retry/terminal classification stays a
/// single match in the work queue.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Network/timeout/DNS failure during navigation. Retriable.
    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    /// Response status >= 400. Terminal for that URL.
    #[error("http error {status} for {url}")]
    Http { url: String, status: u16 },

    /// Browser context destroyed or browser disconnected.
    #[error("browser crashed: {0}")]
    BrowserCrash(String),

    /// One analyzer threw or timed out; contained at the orchestrator.
    #[error("analyzer '{analyzer}' failed: {message}")]
    AnalyzerFailure { analyzer: String, message: String },

    /// Pool could not hand out a lease.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Run cancelled externally.
    #[error("cancelled")]
    Cancelled,

    /// Internal invariant violated; must abort the run.
    #[error("fatal engine error: {0}")]
    Fatal(String),

    /// Escape hatch for infrastructure errors (I/O, serialization) that
    /// don't carry audit-specific semantics.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuditError {
    /// §7 / §4.F: classifies whether the work queue may re-enqueue the
    /// task that produced this error.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AuditError::Navigation { .. }
                | AuditError::BrowserCrash(_)
                | AuditError::ResourceExhausted(_)
        ) || matches!(self, AuditError::Http { status, .. } if *status == 408 || *status == 429)
    }

    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    pub fn analyzer_failure(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AnalyzerFailure {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_and_crash_and_resource_exhausted_are_retriable() {
        assert!(AuditError::navigation("u", "timeout").is_retriable());
        assert!(AuditError::BrowserCrash("gone".into()).is_retriable());
        assert!(AuditError::ResourceExhausted("pool full".into()).is_retriable());
    }

    #[test]
    fn http_4xx_is_terminal_except_408_429() {
        assert!(!AuditError::http("u", 404).is_retriable());
        assert!(!AuditError::http("u", 403).is_retriable());
        assert!(AuditError::http("u", 408).is_retriable());
        assert!(AuditError::http("u", 429).is_retriable());
    }

    #[test]
    fn cancelled_and_fatal_are_terminal() {
        assert!(!AuditError::Cancelled.is_retriable());
        assert!(!AuditError::Fatal("bug".into()).is_retriable());
    }
}
