//! Three-way result an analyzer can produce (spec §4.D, §4.E).
//!
//! Distinguishing `Skipped` from `Failed` matters downstream: a skip
//! (the caller turned the analyzer off, or it doesn't apply to this
//! page) is not an error and shouldn't count against the page's
//! composite; a failure is logged as an analyzer-warning event and the
//! section is simply omitted from the result.

#[derive(Debug, Clone)]
pub enum AnalyzerOutcome<T> {
    Ok(T),
    Skipped { reason: String },
    Failed { error: String },
}

impl<T> AnalyzerOutcome<T> {
    pub fn ok(value: T) -> Self {
        AnalyzerOutcome::Ok(value)
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        AnalyzerOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        AnalyzerOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            AnalyzerOutcome::Ok(v) => Some(v),
            _ => None,
        }
    }
}
