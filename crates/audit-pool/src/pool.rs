//! The pool itself: a bounded set of warm browsers, a background
//! task doing tiered health checks and recycling, and checkout/checkin
//! operations gated by a semaphore (spec §4.A).

use crate::browser::{BrowserHealth, PooledBrowser};
use crate::checkout::BrowserCheckout;
use crate::config::BrowserPoolConfig;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock, Semaphore};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Installed via `evaluate_on_new_document` ahead of every navigation so
/// `PerformanceAnalyzer` (audit-analyzers) can read `window.__cwvMetrics`
/// for the vitals the Navigation/Paint Timing APIs don't cover on their
/// own: CLS accumulates from every non-user-initiated layout shift, INP/FID
/// come off the first qualifying input, and TBT sums blocking time from
/// long tasks. SI is intentionally left unset — it needs frame-by-frame
/// visual-progress sampling no synchronous observer API provides.
const CWV_OBSERVER_JS: &str = r#"
(() => {
  const metrics = { cls: 0, tbt: 0 };
  window.__cwvMetrics = metrics;
  try {
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        if (!entry.hadRecentInput) metrics.cls += entry.value;
      }
    }).observe({ type: 'layout-shift', buffered: true });
  } catch (e) {}
  try {
    new PerformanceObserver((list) => {
      const entries = list.getEntries();
      const last = entries[entries.length - 1];
      if (last) metrics.lcp = last.renderTime || last.loadTime;
    }).observe({ type: 'largest-contentful-paint', buffered: true });
  } catch (e) {}
  try {
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        const duration = entry.duration - 50;
        if (duration > 0) metrics.tbt += duration;
      }
    }).observe({ type: 'longtask', buffered: true });
  } catch (e) {}
  try {
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        metrics.fid = entry.processingStart - entry.startTime;
      }
    }).observe({ type: 'first-input', buffered: true });
  } catch (e) {}
  try {
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        if (entry.interactionId) metrics.inp = Math.max(metrics.inp || 0, entry.duration);
      }
    }).observe({ type: 'event', buffered: true, durationThreshold: 16 });
  } catch (e) {}
})();
"#;

#[derive(Debug, Clone)]
pub enum PoolEvent {
    BrowserCreated { id: String },
    BrowserRemoved { id: String, reason: String },
    BrowserCheckedOut { id: String },
    BrowserCheckedIn { id: String },
    HealthCheckCompleted { healthy: usize, unhealthy: usize },
}

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub available: usize,
    pub in_use: usize,
    pub total_capacity: usize,
}

pub struct BrowserPool {
    config: BrowserPoolConfig,
    /// Every registered browser, whether idle, partially leased, or
    /// fully leased up to `max_pages_per_browser`. Unlike an
    /// available/in-use split, one entry here can back several
    /// concurrent leases at once (spec §4.A: the concurrency bound is
    /// `maxBrowsers * maxPagesPerBrowser`, not one lease per browser).
    browsers: Arc<RwLock<HashMap<String, PooledBrowser>>>,
    semaphore: Arc<Semaphore>,
    event_sender: mpsc::UnboundedSender<PoolEvent>,
    event_receiver: Mutex<mpsc::UnboundedReceiver<PoolEvent>>,
    shutdown_sender: mpsc::Sender<()>,
    management_task: tokio::task::JoinHandle<()>,
}

impl BrowserPool {
    /// Launches `config.pool_size` browsers up front (spec §4.A
    /// `warmUp`). Launch failures are logged and tolerated — the pool
    /// runs at reduced capacity rather than failing outright, since a
    /// single flaky browser shouldn't abort an entire audit run.
    pub async fn warm_up(config: BrowserPoolConfig) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;
        info!(
            pool_size = config.pool_size,
            max_pages_per_browser = config.max_pages_per_browser,
            "warming up browser pool"
        );

        let browsers = Arc::new(RwLock::new(HashMap::new()));
        let semaphore = Arc::new(Semaphore::new(config.pool_size * config.max_pages_per_browser));
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (shutdown_sender, mut shutdown_receiver) = mpsc::channel(1);

        let mut launched = HashMap::new();
        let mut failed = 0usize;
        for _ in 0..config.pool_size {
            match PooledBrowser::launch(&config).await {
                Ok(browser) => {
                    let _ = event_sender.send(PoolEvent::BrowserCreated {
                        id: browser.id.clone(),
                    });
                    launched.insert(browser.id.clone(), browser);
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "failed to launch browser during warm-up");
                }
            }
        }
        if launched.is_empty() {
            return Err(anyhow!("failed to launch any browser ({} attempts)", failed));
        }
        *browsers.write().await = launched;

        let management_task = {
            let config = config.clone();
            let browsers = browsers.clone();
            let event_sender = event_sender.clone();
            tokio::spawn(async move {
                let mut fast_tick = interval(config.fast_check_interval);
                let mut full_tick = interval(config.full_check_interval);
                loop {
                    tokio::select! {
                        _ = fast_tick.tick() => {
                            Self::run_fast_checks(&browsers, &event_sender).await;
                        }
                        _ = full_tick.tick() => {
                            Self::run_full_checks(&config, &browsers, &event_sender).await;
                            Self::recycle_expired(&config, &browsers, &event_sender).await;
                            Self::refill(&config, &browsers, &event_sender).await;
                        }
                        _ = shutdown_receiver.recv() => {
                            debug!("browser pool management task shutting down");
                            break;
                        }
                    }
                }
            })
        };

        Ok(Self {
            config,
            browsers,
            semaphore,
            event_sender,
            event_receiver: Mutex::new(event_receiver),
            shutdown_sender,
            management_task,
        })
    }

    /// Blocks until a lease is available, launching a browser on demand
    /// if the pool is below `pool_size` (spec §4.A `acquire`). Up to
    /// `max_pages_per_browser` leases can share one browser
    /// concurrently — the semaphore (sized to
    /// `pool_size * max_pages_per_browser`) is the only thing bounding
    /// total outstanding leases; browser *count* is bounded separately
    /// by `pool_size` inside the retry loop below.
    pub async fn acquire(self: &Arc<Self>) -> Result<BrowserCheckout> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| anyhow!("failed to acquire pool permit: {}", e))?;

        const MAX_ATTEMPTS: u32 = 50;
        for attempt in 0..MAX_ATTEMPTS {
            if let Some(id) = self.try_claim_existing().await {
                let _ = self.event_sender.send(PoolEvent::BrowserCheckedOut { id: id.clone() });
                return Ok(BrowserCheckout::new(id, Arc::clone(self), permit));
            }

            if self.browsers.read().await.len() < self.config.pool_size {
                match PooledBrowser::launch(&self.config).await {
                    Ok(browser) => {
                        let id = browser.id.clone();
                        let mut guard = self.browsers.write().await;
                        if guard.len() < self.config.pool_size {
                            guard.insert(id.clone(), browser);
                            drop(guard);
                            let _ = self.event_sender.send(PoolEvent::BrowserCreated { id: id.clone() });
                            // Claim it on the next loop iteration so the
                            // claim itself always goes through the same
                            // single code path as a reused browser.
                            continue;
                        }
                        // Lost the race to another concurrent acquire;
                        // this one is surplus, don't exceed pool_size.
                        drop(guard);
                        let mut browser = browser;
                        browser.cleanup().await;
                    }
                    Err(e) => {
                        warn!(error = %e, attempt, "failed to launch browser on demand");
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Err(anyhow!(
            "timed out waiting for a browser slot ({} attempts)",
            MAX_ATTEMPTS
        ))
    }

    /// Finds a healthy, under-quota, under-capacity browser and claims
    /// one lease against it atomically under a single write-lock
    /// section. Returns `None` if no eligible browser exists right now.
    async fn try_claim_existing(&self) -> Option<String> {
        let mut guard = self.browsers.write().await;
        let candidate = guard
            .values()
            .filter(|b| {
                b.health == BrowserHealth::Healthy
                    && b.active_leases < self.config.max_pages_per_browser
                    && !b.has_served_quota(self.config.max_pages_per_browser)
            })
            .min_by_key(|b| b.active_leases)
            .map(|b| b.id.clone())?;

        let browser = guard.get_mut(&candidate).expect("candidate just selected from this map");
        browser.active_leases += 1;
        browser.mark_used();
        Some(candidate)
    }

    pub(crate) async fn new_page(&self, browser_id: &str, url: &str) -> Result<spider_chrome::Page> {
        let guard = self.browsers.read().await;
        let browser = guard
            .get(browser_id)
            .ok_or_else(|| anyhow!("browser {} not found in pool", browser_id))?;
        // Open blank first so the CWV observer script (spec §4.D.2) is
        // installed via CDP before the target document's own scripts run —
        // a PerformanceObserver attached after `goto` returns would have
        // missed any layout shift or paint that already happened.
        let page = browser.browser.new_page("about:blank").await?;
        if let Err(e) = page.evaluate_on_new_document(CWV_OBSERVER_JS).await {
            warn!(browser_id, error = %e, "failed to install CWV observer script");
        }
        page.goto(url).await?;
        Ok(page)
    }

    /// Releases one lease against `browser_id`. Spec §4.A: a browser
    /// that crashed, disconnected, or has now served its
    /// `max_pages_per_browser` quota is discarded rather than returned
    /// to the idle set — but only once its *last* active lease lets go,
    /// so a browser serving several concurrent leases keeps serving the
    /// others until they release too.
    pub(crate) async fn release(&self, browser_id: &str) -> Result<()> {
        let retired = {
            let mut guard = self.browsers.write().await;
            let Some(browser) = guard.get_mut(browser_id) else {
                return Err(anyhow!("browser {} not found in pool", browser_id));
            };
            browser.active_leases = browser.active_leases.saturating_sub(1);
            if browser.active_leases > 0 {
                let _ = self.event_sender.send(PoolEvent::BrowserCheckedIn {
                    id: browser_id.to_string(),
                });
                return Ok(());
            }
            guard.remove(browser_id).expect("checked above")
        };

        let mut browser = retired;
        let health = browser.full_health_check(&self.config).await;
        let over_quota = browser.has_served_quota(self.config.max_pages_per_browser);

        if health == BrowserHealth::Healthy && !over_quota {
            self.browsers.write().await.insert(browser_id.to_string(), browser);
            let _ = self.event_sender.send(PoolEvent::BrowserCheckedIn {
                id: browser_id.to_string(),
            });
        } else {
            browser.cleanup().await;
            let reason = if over_quota {
                format!("served-quota-reached ({})", self.config.max_pages_per_browser)
            } else {
                format!("{:?}", health)
            };
            let _ = self.event_sender.send(PoolEvent::BrowserRemoved {
                id: browser_id.to_string(),
                reason,
            });
        }
        Ok(())
    }

    pub async fn stats(&self) -> PoolStats {
        let guard = self.browsers.read().await;
        let in_use = guard.values().filter(|b| b.active_leases > 0).count();
        PoolStats {
            available: guard.len() - in_use,
            in_use,
            total_capacity: self.config.pool_size * self.config.max_pages_per_browser,
        }
    }

    /// Drains pending [`PoolEvent`]s without blocking.
    pub async fn drain_events(&self) -> Vec<PoolEvent> {
        let mut receiver = self.event_receiver.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.shutdown_sender.send(()).await;
        let mut browsers = self.browsers.write().await;
        for (_, mut browser) in browsers.drain() {
            browser.cleanup().await;
        }
        Ok(())
    }

    /// Fast liveness sweep. Only probes idle browsers — one on active
    /// leases is, by definition, answering CDP calls for its caller
    /// right now, and probing it here would just add contention.
    async fn run_fast_checks(
        browsers: &Arc<RwLock<HashMap<String, PooledBrowser>>>,
        event_sender: &mpsc::UnboundedSender<PoolEvent>,
    ) {
        let guard = browsers.read().await;
        let idle: Vec<&PooledBrowser> = guard.values().filter(|b| b.active_leases == 0).collect();
        let mut unhealthy = 0usize;
        for browser in &idle {
            if !browser.fast_health_check().await {
                unhealthy += 1;
            }
        }
        if unhealthy > 0 {
            let _ = event_sender.send(PoolEvent::HealthCheckCompleted {
                healthy: idle.len() - unhealthy,
                unhealthy,
            });
        }
    }

    /// Full health sweep over idle browsers; an unhealthy one is
    /// discarded immediately rather than left for the next `release`.
    async fn run_full_checks(
        config: &BrowserPoolConfig,
        browsers: &Arc<RwLock<HashMap<String, PooledBrowser>>>,
        event_sender: &mpsc::UnboundedSender<PoolEvent>,
    ) {
        let idle_ids: Vec<String> = browsers
            .read()
            .await
            .values()
            .filter(|b| b.active_leases == 0)
            .map(|b| b.id.clone())
            .collect();

        let mut healthy = 0usize;
        let mut unhealthy = 0usize;
        for id in idle_ids {
            let mut guard = browsers.write().await;
            // Re-check active_leases: a lease may have been claimed
            // between the snapshot above and taking the write lock.
            let Some(browser) = guard.get_mut(&id).filter(|b| b.active_leases == 0) else {
                continue;
            };
            match browser.full_health_check(config).await {
                BrowserHealth::Healthy => {
                    healthy += 1;
                }
                health => {
                    unhealthy += 1;
                    let mut browser = guard.remove(&id).expect("checked above");
                    drop(guard);
                    browser.cleanup().await;
                    let _ = event_sender.send(PoolEvent::BrowserRemoved {
                        id,
                        reason: format!("{:?}", health),
                    });
                }
            }
        }
        let _ = event_sender.send(PoolEvent::HealthCheckCompleted { healthy, unhealthy });
    }

    async fn recycle_expired(
        config: &BrowserPoolConfig,
        browsers: &Arc<RwLock<HashMap<String, PooledBrowser>>>,
        event_sender: &mpsc::UnboundedSender<PoolEvent>,
    ) {
        let expired_ids: Vec<String> = browsers
            .read()
            .await
            .values()
            .filter(|b| {
                b.active_leases == 0
                    && (b.is_expired(config.max_lifetime) || b.is_idle(config.idle_timeout))
            })
            .map(|b| b.id.clone())
            .collect();

        for id in expired_ids {
            let removed = {
                let mut guard = browsers.write().await;
                guard.remove(&id).filter(|b| b.active_leases == 0)
            };
            let Some(mut browser) = removed else { continue };
            browser.cleanup().await;
            let _ = event_sender.send(PoolEvent::BrowserRemoved {
                id,
                reason: "expired-or-idle".into(),
            });
        }
    }

    async fn refill(
        config: &BrowserPoolConfig,
        browsers: &Arc<RwLock<HashMap<String, PooledBrowser>>>,
        event_sender: &mpsc::UnboundedSender<PoolEvent>,
    ) {
        let current = browsers.read().await.len();
        for _ in current..config.pool_size {
            match PooledBrowser::launch(config).await {
                Ok(browser) => {
                    let id = browser.id.clone();
                    browsers.write().await.insert(id.clone(), browser);
                    let _ = event_sender.send(PoolEvent::BrowserCreated { id });
                }
                Err(e) => {
                    warn!(error = %e, "failed to refill browser pool");
                    break;
                }
            }
        }
    }
}

impl Drop for BrowserPool {
    fn drop(&mut self) {
        self.management_task.abort();
    }
}
