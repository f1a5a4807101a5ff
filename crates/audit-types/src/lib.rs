//! Shared data model, error taxonomy, and port traits for the audit
//! engine. Every other crate in the workspace depends on this one;
//! it depends on nothing else in the workspace.

pub mod budget;
pub mod error;
pub mod events;
pub mod ports;
pub mod redirect;
pub mod result;
pub mod result_factory;
pub mod stats;
pub mod task;

pub use budget::BudgetTemplate;
pub use error::{AuditError, Result};
pub use events::{Event, EventPayload};
pub use ports::{SitemapSource, StaticUrlList, UrlProcessor};
pub use redirect::{canonicalize_url, RedirectInfo, RedirectType};
pub use result::*;
pub use stats::QueueStatistics;
pub use task::{TaskId, TaskState, UrlTask};
