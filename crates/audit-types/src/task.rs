//! URL Task (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a [`UrlTask`], stable across retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a [`UrlTask`]. Transitions are enforced by the
/// work queue worker that owns the task (spec §3 invariant):
/// `pending -> in-flight -> (completed | retrying | failed | cancelled)`,
/// `retrying -> in-flight`, and `pending`/`retrying` can also be
/// force-finalized straight to `cancelled`/`failed` by a run-wide
/// cancellation or resource abort rather than by the task's own worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Pending,
    InFlight,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    /// Whether `self -> next` is a legal transition per spec §3.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, InFlight)
                | (InFlight, Completed)
                | (InFlight, Retrying)
                | (InFlight, Failed)
                | (InFlight, Cancelled)
                | (Retrying, InFlight)
                // A task waiting to be dispatched or waiting out a
                // retry backoff can still be cancelled directly, or
                // lose its last retry slot while still in backoff.
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Retrying, Cancelled)
                | (Retrying, Failed)
        )
    }
}

/// A single URL's journey through the work queue.
///
/// Created by the facade, mutated only by the queue worker that owns
/// it (spec §3) — callers outside `audit-queue` should treat this as
/// read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlTask {
    pub id: TaskId,
    pub url: String,
    pub attempts: u32,
    pub state: TaskState,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl UrlTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            url: url.into(),
            attempts: 0,
            state: TaskState::Pending,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }

    /// Apply a state transition, panicking in debug builds if the
    /// transition violates spec §3 — callers (the queue worker) are
    /// expected to only ever request legal transitions.
    pub fn transition(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal task transition {:?} -> {:?}",
            self.state,
            next
        );
        if next == TaskState::InFlight {
            self.attempts += 1;
            self.started_at = Some(Utc::now());
        }
        if matches!(
            next,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        ) {
            self.finished_at = Some(Utc::now());
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        assert!(TaskState::Pending.can_transition_to(TaskState::InFlight));
        assert!(TaskState::InFlight.can_transition_to(TaskState::Retrying));
        assert!(TaskState::Retrying.can_transition_to(TaskState::InFlight));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Completed));
        assert!(!TaskState::Completed.can_transition_to(TaskState::InFlight));
    }

    #[test]
    fn transition_increments_attempts_on_in_flight() {
        let mut task = UrlTask::new("https://example.com");
        assert_eq!(task.attempts, 0);
        task.transition(TaskState::InFlight);
        assert_eq!(task.attempts, 1);
        task.transition(TaskState::Retrying);
        task.transition(TaskState::InFlight);
        assert_eq!(task.attempts, 2);
    }

    #[test]
    fn terminal_transitions_stamp_finished_at() {
        let mut task = UrlTask::new("https://example.com");
        task.transition(TaskState::InFlight);
        assert!(task.finished_at.is_none());
        task.transition(TaskState::Completed);
        assert!(task.finished_at.is_some());
    }
}
