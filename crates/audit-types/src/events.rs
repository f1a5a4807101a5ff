//! Event shapes for the Event Bus (spec §3, §4.G).
//!
//! The bus implementation itself lives in `audit-events`; this crate
//! only defines the wire shape so every crate that emits or consumes
//! events agrees on it without a dependency on the bus.

use crate::stats::QueueStatistics;
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventPayload {
    UrlStarted {
        task_id: TaskId,
        url: String,
        attempt: u32,
    },
    UrlCompleted {
        task_id: TaskId,
        url: String,
        duration_ms: u64,
    },
    UrlFailed {
        task_id: TaskId,
        url: String,
        error: String,
        /// `true` when the queue will re-enqueue this task; `false` for
        /// the terminal failure (spec §4.F).
        retriable: bool,
    },
    Progress(QueueStatistics),
    QueueEmpty,
    ResourceWarning {
        /// e.g. "memory", "cpu".
        resource: String,
        /// `true` on entering the paused/backpressure state, `false` on
        /// leaving it (spec §4.F).
        entering: bool,
        detail: String,
    },
    AnalyzerWarning {
        url: String,
        analyzer: String,
        message: String,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::UrlStarted { .. } => "url-started",
            EventPayload::UrlCompleted { .. } => "url-completed",
            EventPayload::UrlFailed { .. } => "url-failed",
            EventPayload::Progress(_) => "progress",
            EventPayload::QueueEmpty => "queue-empty",
            EventPayload::ResourceWarning { .. } => "resource-warning",
            EventPayload::AnalyzerWarning { .. } => "analyzer-warning",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }
}
