//! The work queue itself: `maxConcurrent` worker loops pulling from a
//! shared FIFO, with retry/backoff, progress reporting, backpressure,
//! and cancellation (spec §4.F).

use crate::backoff::backoff_duration;
use crate::config::WorkQueueConfig;
use crate::resources::ResourceMonitor;
use audit_events::EventBus;
use audit_types::{AuditError, EventPayload, PageResult, QueueStatistics, TaskId, TaskState, UrlProcessor, UrlTask};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Outcome of a completed [`WorkQueue::run`]: every submitted URL ends
/// up in exactly one of `pages` or `skipped_urls` (spec §8 property 4)
/// — redirect-skips are reported by URL rather than as a full page
/// record, matching how the enclosing report/CLI surfaces them.
pub struct QueueRun {
    pub pages: Vec<PageResult>,
    pub skipped_urls: Vec<String>,
}

struct Shared {
    config: WorkQueueConfig,
    tasks: DashMap<TaskId, UrlTask>,
    submitted_order: Vec<TaskId>,
    ready: Mutex<VecDeque<TaskId>>,
    notify: Notify,
    results: DashMap<TaskId, PageResult>,
    total: usize,
    in_flight: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    retrying: AtomicUsize,
    cancelled: AtomicBool,
    paused: AtomicBool,
    aborted: AtomicBool,
    queue_empty_emitted: AtomicBool,
    processor: Arc<dyn UrlProcessor>,
    bus: Arc<EventBus>,
    resources: ResourceMonitor,
}

impl Shared {
    fn remaining(&self) -> usize {
        self.total
            - self.completed.load(Ordering::Relaxed)
            - self.failed.load(Ordering::Relaxed)
    }

    fn is_drained(&self) -> bool {
        self.remaining() == 0
            && self.in_flight.load(Ordering::Relaxed) == 0
            && self.retrying.load(Ordering::Relaxed) == 0
    }

    /// Snapshot for `progress` events and external inspection (spec §3
    /// Queue Statistics — a derived view, computed on demand).
    fn snapshot(&self) -> QueueStatistics {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let in_flight = self.in_flight.load(Ordering::Relaxed);
        let retrying = self.retrying.load(Ordering::Relaxed);
        let pending = self.total.saturating_sub(completed + failed + in_flight + retrying);

        let finished = completed + failed;
        let progress_percent = if self.total == 0 {
            100
        } else {
            ((finished * 100) / self.total).min(100) as u8
        };

        let average_duration_ms = if finished > 0 {
            let total_ms: u64 = self
                .results
                .iter()
                .map(|entry| entry.value().duration_ms)
                .sum();
            total_ms / finished.max(1) as u64
        } else {
            0
        };
        let estimated_remaining_ms = average_duration_ms
            * (pending + in_flight + retrying) as u64
            / self.config.max_concurrent.max(1) as u64;

        let sample = self.resources.sample();

        QueueStatistics {
            total: self.total,
            pending,
            in_flight,
            completed,
            failed,
            retrying,
            progress_percent,
            average_duration_ms,
            estimated_remaining_ms,
            active_workers: in_flight.min(self.config.max_concurrent),
            memory_usage_mb: sample.memory_mb,
            cpu_usage_percent: sample.cpu_percent,
        }
    }

    fn emit_queue_empty_if_drained(&self) {
        if self.is_drained()
            && self
                .queue_empty_emitted
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.bus.publish(EventPayload::QueueEmpty);
            self.notify.notify_waiters();
        }
    }
}

/// Bounded-concurrency FIFO scheduler over a list of URL tasks (spec
/// §4.F). One `WorkQueue` runs exactly one batch, built with the full
/// URL list up front via [`WorkQueue::new`] — cloning the handle (cheap,
/// it's an `Arc`) lets a caller hold on to it for [`cancel`](Self::cancel)
/// or [`snapshot_stats`](Self::snapshot_stats) while [`run`](Self::run)
/// is in flight elsewhere.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    pub fn new(
        urls: Vec<String>,
        config: WorkQueueConfig,
        processor: Arc<dyn UrlProcessor>,
        bus: Arc<EventBus>,
    ) -> Self {
        let tasks = DashMap::new();
        let mut submitted_order = Vec::with_capacity(urls.len());
        for url in urls {
            let task = UrlTask::new(url);
            submitted_order.push(task.id);
            tasks.insert(task.id, task);
        }
        let ready = Mutex::new(submitted_order.iter().copied().collect::<VecDeque<_>>());

        let shared = Arc::new(Shared {
            config,
            total: submitted_order.len(),
            tasks,
            submitted_order,
            ready,
            notify: Notify::new(),
            results: DashMap::new(),
            in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            retrying: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            queue_empty_emitted: AtomicBool::new(false),
            processor,
            bus,
            resources: ResourceMonitor::new(),
        });
        Self { shared }
    }

    /// Runs the batch to completion (or cancellation). Spawns
    /// `max_concurrent` worker loops plus a progress ticker and a
    /// resource-backpressure ticker, and returns once every task has
    /// reached a terminal state.
    pub async fn run(&self) -> QueueRun {
        let shared = Arc::clone(&self.shared);

        if shared.total == 0 {
            shared.bus.publish(EventPayload::QueueEmpty);
            return QueueRun { pages: Vec::new(), skipped_urls: Vec::new() };
        }

        info!(total = shared.total, max_concurrent = shared.config.max_concurrent, "starting work queue run");

        let mut handles = Vec::with_capacity(shared.config.max_concurrent + 3);
        for _ in 0..shared.config.max_concurrent {
            handles.push(tokio::spawn(worker_loop(Arc::clone(&shared))));
        }
        handles.push(tokio::spawn(progress_ticker(Arc::clone(&shared))));
        handles.push(tokio::spawn(backpressure_ticker(Arc::clone(&shared))));
        handles.push(tokio::spawn(cancellation_watcher(Arc::clone(&shared))));

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "work queue background task panicked");
            }
        }

        shared.emit_queue_empty_if_drained();

        let mut pages = Vec::new();
        let mut skipped_urls = Vec::new();
        for task_id in &shared.submitted_order {
            if let Some((_, result)) = shared.results.remove(task_id) {
                if result.status == audit_types::PageStatus::SkippedRedirect {
                    skipped_urls.push(result.url.clone());
                } else {
                    pages.push(result);
                }
            }
        }

        QueueRun { pages, skipped_urls }
    }

    /// Stops new task dispatch; in-flight tasks run to completion up
    /// to `cancellation_grace`, then are forced terminal (spec §4.F).
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
    }

    pub fn snapshot_stats(&self) -> QueueStatistics {
        self.shared.snapshot()
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        if shared.is_drained() {
            return;
        }

        // Cancellation/hard-abort only blocks *new* dispatch; a task
        // already popped off `ready` by this worker still runs to
        // completion below. `run()` spawns a single dedicated task that
        // force-finalizes whatever is left pending once the grace
        // period elapses, so workers don't race each other over it.
        if shared.cancelled.load(Ordering::Relaxed) || shared.aborted.load(Ordering::Relaxed) {
            return;
        }

        if shared.paused.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(100)).await;
            continue;
        }

        let next = shared.ready.lock().pop_front();
        let Some(task_id) = next else {
            if shared.is_drained() {
                return;
            }
            tokio::select! {
                _ = shared.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            continue;
        };

        shared.in_flight.fetch_add(1, Ordering::Relaxed);
        process_one(&shared, task_id).await;
        shared.in_flight.fetch_sub(1, Ordering::Relaxed);
        shared.emit_queue_empty_if_drained();
    }
}

async fn process_one(shared: &Arc<Shared>, task_id: TaskId) {
    let (url, attempt) = {
        let mut task = shared.tasks.get_mut(&task_id).expect("task exists");
        task.transition(TaskState::InFlight);
        (task.url.clone(), task.attempts)
    };
    shared.bus.publish(EventPayload::UrlStarted { task_id, url: url.clone(), attempt });

    let start = Instant::now();
    let timeout = Duration::from_millis(shared.config.per_task_timeout_ms);
    let outcome = tokio::time::timeout(timeout, shared.processor.process(&url)).await;

    match outcome {
        Ok(Ok(result)) => {
            let duration_ms = result.duration_ms;
            shared.results.insert(task_id, result);
            shared.tasks.get_mut(&task_id).expect("task exists").transition(TaskState::Completed);
            shared.completed.fetch_add(1, Ordering::Relaxed);
            shared.bus.publish(EventPayload::UrlCompleted { task_id, url, duration_ms });
        }
        Ok(Err(err)) => handle_failure(shared, task_id, url, err, start).await,
        Err(_elapsed) => {
            let err = AuditError::navigation(&url, "per-task timeout exceeded");
            handle_failure(shared, task_id, url, err, start).await;
        }
    }
}

async fn handle_failure(shared: &Arc<Shared>, task_id: TaskId, url: String, err: AuditError, start: Instant) {
    let attempts = shared.tasks.get(&task_id).expect("task exists").attempts;
    let retriable = err.is_retriable()
        && attempts < shared.config.max_retries
        && !shared.cancelled.load(Ordering::Relaxed)
        && !shared.aborted.load(Ordering::Relaxed);

    shared.bus.publish(EventPayload::UrlFailed {
        task_id,
        url: url.clone(),
        error: err.to_string(),
        retriable,
    });

    if retriable {
        shared.retrying.fetch_add(1, Ordering::Relaxed);
        shared.tasks.get_mut(&task_id).expect("task exists").transition(TaskState::Retrying);

        let shared = Arc::clone(shared);
        let backoff = backoff_duration(shared.config.retry_backoff_base_ms, attempts);
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            shared.retrying.fetch_sub(1, Ordering::Relaxed);
            if shared.cancelled.load(Ordering::Relaxed) || shared.aborted.load(Ordering::Relaxed) {
                // Cancelled/aborted while waiting out the backoff: the
                // task never gets a second chance, but still needs a
                // terminal record.
                finalize_as_crash(&shared, task_id, &url, "cancelled before retry", 0, TaskState::Cancelled);
                return;
            }
            shared.ready.lock().push_back(task_id);
            shared.notify.notify_waiters();
        });
    } else {
        let duration_ms = start.elapsed().as_millis() as u64;
        finalize_as_crash(shared, task_id, &url, &err.to_string(), duration_ms, TaskState::Failed);
    }
}

/// Force-finalizes a task as crashed/cancelled. Idempotent: a task can
/// reach here from two independent paths (the retry-backoff task waking
/// up into a cancelled queue, and `cancellation_watcher`/`abort_remaining`
/// force-finalizing the same still-`Retrying` task first), and only the
/// first to arrive should count. The state check and the transition
/// happen under one `DashMap` shard lock so the two callers can't both
/// pass the check before either commits.
fn finalize_as_crash(
    shared: &Arc<Shared>,
    task_id: TaskId,
    url: &str,
    error: &str,
    duration_ms: u64,
    target_state: TaskState,
) {
    {
        let mut task = shared.tasks.get_mut(&task_id).expect("task exists");
        if matches!(
            task.state,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        ) {
            return;
        }
        task.last_error = Some(error.to_string());
        task.transition(target_state);
    }
    let result = audit_types::result_factory::create_crash(url, error, duration_ms);
    shared.results.insert(task_id, result);
    shared.failed.fetch_add(1, Ordering::Relaxed);
    shared.bus.publish(EventPayload::UrlFailed {
        task_id,
        url: url.to_string(),
        error: error.to_string(),
        retriable: false,
    });
}

/// Waits for `cancel()` to be called, gives in-flight work
/// `cancellation_grace` to finish on its own, then force-finalizes
/// whatever is still pending or retrying (spec §4.F cancellation).
async fn cancellation_watcher(shared: Arc<Shared>) {
    loop {
        if shared.is_drained() {
            return;
        }
        if shared.cancelled.load(Ordering::Relaxed) {
            break;
        }
        tokio::select! {
            _ = shared.notify.notified() => {}
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
    }

    tokio::time::sleep(shared.config.cancellation_grace).await;
    shared.ready.lock().clear();
    for task_id in &shared.submitted_order {
        let state = shared.tasks.get(task_id).map(|t| t.state);
        if matches!(state, Some(TaskState::Pending) | Some(TaskState::Retrying)) {
            let url = shared.tasks.get(task_id).expect("task exists").url.clone();
            finalize_as_crash(&shared, *task_id, &url, "cancelled", 0, TaskState::Cancelled);
        }
    }
    shared.notify.notify_waiters();
}

async fn progress_ticker(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(Duration::from_millis(shared.config.progress_interval_ms));
    loop {
        interval.tick().await;
        if shared.is_drained() {
            return;
        }
        shared.bus.publish(EventPayload::Progress(shared.snapshot()));
    }
}

async fn backpressure_ticker(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(Duration::from_millis(500));
    let mut hard_breach_since: Option<Instant> = None;
    loop {
        interval.tick().await;
        if shared.is_drained() {
            return;
        }

        let sample = shared.resources.sample();
        let soft_breached = sample.memory_mb > shared.config.memory_soft_ceiling_mb
            || sample.cpu_percent > shared.config.cpu_soft_ceiling_percent;
        let hard_breached = sample.memory_mb > shared.config.memory_soft_ceiling_mb * 2;

        let was_paused = shared.paused.swap(soft_breached, Ordering::SeqCst);
        if soft_breached && !was_paused {
            shared.bus.publish(EventPayload::ResourceWarning {
                resource: "memory".into(),
                entering: true,
                detail: format!("{}MB in use, soft ceiling {}MB", sample.memory_mb, shared.config.memory_soft_ceiling_mb),
            });
        } else if !soft_breached && was_paused {
            shared.bus.publish(EventPayload::ResourceWarning {
                resource: "memory".into(),
                entering: false,
                detail: "resource usage back under soft ceiling".into(),
            });
        }

        if hard_breached {
            let since = *hard_breach_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= shared.config.hard_ceiling_grace && !shared.aborted.swap(true, Ordering::SeqCst) {
                warn!(memory_mb = sample.memory_mb, "hard memory ceiling breached; aborting remaining work");
                abort_remaining(&shared);
            }
        } else {
            hard_breach_since = None;
        }
    }
}

fn abort_remaining(shared: &Arc<Shared>) {
    let pending_ids: Vec<TaskId> = shared
        .submitted_order
        .iter()
        .filter(|id| matches!(shared.tasks.get(id).map(|t| t.state), Some(TaskState::Pending)))
        .copied()
        .collect();
    shared.ready.lock().clear();
    for task_id in pending_ids {
        let url = shared.tasks.get(&task_id).expect("task exists").url.clone();
        finalize_as_crash(shared, task_id, &url, "resource_exhausted", 0, TaskState::Failed);
    }
    shared.notify.notify_waiters();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use audit_types::{PageStatus, Result as AuditResult};
    use std::sync::atomic::AtomicU32;

    struct AlwaysOk;
    #[async_trait]
    impl UrlProcessor for AlwaysOk {
        async fn process(&self, url: &str) -> AuditResult<PageResult> {
            Ok(audit_types::result_factory::create_ok(
                url,
                url,
                Some("Title".into()),
                PageStatus::Passed,
                10,
                audit_types::result_factory::OkSections {
                    accessibility: None,
                    performance: None,
                    seo: None,
                    content_weight: None,
                    mobile: None,
                },
            ))
        }
    }

    struct FailsNTimes {
        remaining_failures: AtomicU32,
    }
    #[async_trait]
    impl UrlProcessor for FailsNTimes {
        async fn process(&self, url: &str) -> AuditResult<PageResult> {
            if self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            }).is_ok()
            {
                return Err(AuditError::navigation(url, "transient failure"));
            }
            Ok(audit_types::result_factory::create_ok(
                url,
                url,
                None,
                PageStatus::Passed,
                5,
                audit_types::result_factory::OkSections {
                    accessibility: None,
                    performance: None,
                    seo: None,
                    content_weight: None,
                    mobile: None,
                },
            ))
        }
    }

    struct AlwaysHttpError;
    #[async_trait]
    impl UrlProcessor for AlwaysHttpError {
        async fn process(&self, _url: &str) -> AuditResult<PageResult> {
            Err(AuditError::http("https://x/missing", 404))
        }
    }

    #[tokio::test]
    async fn happy_path_completes_all_urls() {
        let bus = Arc::new(EventBus::new());
        let queue = WorkQueue::new(
            vec!["https://a/".into(), "https://a/b".into(), "https://a/c".into()],
            WorkQueueConfig { max_concurrent: 2, ..WorkQueueConfig::default() },
            Arc::new(AlwaysOk),
            bus,
        );
        let run = queue.run().await;
        assert_eq!(run.pages.len(), 3);
        assert!(run.skipped_urls.is_empty());
        assert!(run.pages.iter().all(|p| p.status == PageStatus::Passed));
    }

    #[tokio::test]
    async fn transient_failures_retry_then_succeed() {
        let bus = Arc::new(EventBus::new());
        let processor = Arc::new(FailsNTimes { remaining_failures: AtomicU32::new(2) });
        let queue = WorkQueue::new(
            vec!["https://flaky/".into()],
            WorkQueueConfig {
                max_concurrent: 1,
                retry_backoff_base_ms: 5,
                max_retries: 3,
                ..WorkQueueConfig::default()
            },
            processor,
            bus,
        );
        let run = queue.run().await;
        assert_eq!(run.pages.len(), 1);
        assert_eq!(run.pages[0].status, PageStatus::Passed);
    }

    #[tokio::test]
    async fn terminal_http_error_is_not_retried() {
        let bus = Arc::new(EventBus::new());
        let queue = WorkQueue::new(
            vec!["https://x/missing".into()],
            WorkQueueConfig { max_concurrent: 1, ..WorkQueueConfig::default() },
            Arc::new(AlwaysHttpError),
            bus,
        );
        let run = queue.run().await;
        assert_eq!(run.pages.len(), 1);
        assert_eq!(run.pages[0].status, PageStatus::Crashed);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_max_concurrent() {
        use std::sync::atomic::AtomicUsize as Au;
        struct Tracking {
            current: Arc<Au>,
            max_seen: Arc<Au>,
        }
        #[async_trait]
        impl UrlProcessor for Tracking {
            async fn process(&self, url: &str) -> AuditResult<PageResult> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(audit_types::result_factory::create_ok(
                    url,
                    url,
                    None,
                    PageStatus::Passed,
                    20,
                    audit_types::result_factory::OkSections {
                        accessibility: None,
                        performance: None,
                        seo: None,
                        content_weight: None,
                        mobile: None,
                    },
                ))
            }
        }

        let current = Arc::new(Au::new(0));
        let max_seen = Arc::new(Au::new(0));
        let bus = Arc::new(EventBus::new());
        let urls = (0..6).map(|i| format!("https://x/{i}")).collect();
        let queue = WorkQueue::new(
            urls,
            WorkQueueConfig { max_concurrent: 2, ..WorkQueueConfig::default() },
            Arc::new(Tracking { current: current.clone(), max_seen: max_seen.clone() }),
            bus,
        );
        let run = queue.run().await;
        assert_eq!(run.pages.len(), 6);
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_input_emits_queue_empty_and_returns_nothing() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen_clone = seen.clone();
        bus.subscribe_fn(move |event| {
            if matches!(event.payload, EventPayload::QueueEmpty) {
                seen_clone.store(true, Ordering::SeqCst);
            }
        });
        let queue = WorkQueue::new(vec![], WorkQueueConfig::default(), Arc::new(AlwaysOk), bus);
        let run = queue.run().await;
        assert!(run.pages.is_empty());
        assert!(seen.load(Ordering::SeqCst));
    }

    struct NeverFinishes;
    #[async_trait]
    impl UrlProcessor for NeverFinishes {
        async fn process(&self, _url: &str) -> AuditResult<PageResult> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("cancelled before this would resolve")
        }
    }

    #[tokio::test]
    async fn cancel_force_finalizes_pending_work_after_grace() {
        let bus = Arc::new(EventBus::new());
        let urls = (0..4).map(|i| format!("https://slow/{i}")).collect();
        let queue = WorkQueue::new(
            urls,
            WorkQueueConfig {
                max_concurrent: 1,
                per_task_timeout_ms: 30,
                max_retries: 0,
                cancellation_grace: Duration::from_millis(10),
                ..WorkQueueConfig::default()
            },
            Arc::new(NeverFinishes),
            bus,
        );
        let handle = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.run().await })
        };
        tokio::time::sleep(Duration::from_millis(15)).await;
        queue.cancel();
        let run = handle.await.unwrap();
        assert_eq!(run.pages.len(), 4);
        assert!(run.pages.iter().all(|p| p.status == PageStatus::Crashed));
    }
}
