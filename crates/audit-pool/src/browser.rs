//! A single pooled browser instance and its health state.

use crate::config::BrowserPoolConfig;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use spider_chrome::{Browser, BrowserConfig};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserHealth {
    Healthy,
    Unhealthy,
    Crashed,
    MemoryExceeded,
    Timeout,
}

#[derive(Clone, Debug, Default)]
pub struct BrowserStats {
    pub total_uses: u64,
    pub memory_usage_mb: u64,
    pub crashes: u32,
    pub timeouts: u32,
}

/// A launched browser plus the bookkeeping the pool needs to decide
/// when to recycle it. Each instance gets its own profile directory —
/// Chrome's SingletonLock means two instances can never share one,
/// regardless of CDP library.
pub struct PooledBrowser {
    pub id: String,
    pub browser: Browser,
    pub created_at: Instant,
    pub last_used: Instant,
    pub stats: BrowserStats,
    pub health: BrowserHealth,
    /// Number of leases currently checked out against this browser
    /// (spec §4.A `maxPagesPerBrowser` is a concurrency bound, not a
    /// one-lease-per-browser rule — several workers may share one
    /// browser process at once, up to the configured limit). Mutated
    /// only while the owning registry's write lock is held.
    pub active_leases: usize,
    handler_task: tokio::task::JoinHandle<()>,
    _profile_dir: TempDir,
}

impl std::fmt::Debug for PooledBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBrowser")
            .field("id", &self.id)
            .field("health", &self.health)
            .field("active_leases", &self.active_leases)
            .field("total_uses", &self.stats.total_uses)
            .finish()
    }
}

impl PooledBrowser {
    pub async fn launch(config: &BrowserPoolConfig) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        debug!(browser_id = %id, "launching browser instance");

        let profile_dir = if let Some(base) = config.profile_base_dir.as_deref() {
            TempDir::new_in(base)
                .map_err(|e| anyhow!("failed to create profile dir in {:?}: {}", base, e))?
        } else {
            TempDir::new().map_err(|e| anyhow!("failed to create profile dir: {}", e))?
        };

        let mut browser_config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-backgrounding-occluded-windows")
            .arg("--disable-renderer-backgrounding")
            .window_size(config.viewport_width, config.viewport_height)
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {}", e))?;
        browser_config.user_data_dir = Some(profile_dir.path().to_path_buf());

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| anyhow!("failed to launch browser {}: {}", id, e))?;

        let handler_id = id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(browser_id = %handler_id, error = %e, "browser event error");
                }
            }
            debug!(browser_id = %handler_id, "browser event handler ended");
        });

        let now = Instant::now();
        Ok(Self {
            id,
            browser,
            created_at: now,
            last_used: now,
            stats: BrowserStats::default(),
            health: BrowserHealth::Healthy,
            active_leases: 0,
            handler_task,
            _profile_dir: profile_dir,
        })
    }

    pub fn is_expired(&self, max_lifetime: Duration) -> bool {
        self.created_at.elapsed() > max_lifetime
    }

    pub fn is_idle(&self, idle_timeout: Duration) -> bool {
        self.active_leases == 0 && self.last_used.elapsed() > idle_timeout
    }

    /// True once this browser has served its lifetime quota of
    /// contexts (spec §4.A) and must not be handed out again — it
    /// drains (finishes whatever leases are still active) rather than
    /// being yanked mid-use, and is discarded on its last release.
    pub fn has_served_quota(&self, max_pages_per_browser: usize) -> bool {
        self.stats.total_uses as usize >= max_pages_per_browser
    }

    pub fn mark_used(&mut self) {
        self.stats.total_uses += 1;
        self.last_used = Instant::now();
    }

    /// Cheap liveness probe — just confirms the browser still answers
    /// a CDP round trip (spec §4.A tiered health checks).
    pub async fn fast_health_check(&self) -> bool {
        timeout(Duration::from_millis(500), self.browser.pages())
            .await
            .is_ok()
    }

    /// Comprehensive probe: page count plus memory against the soft
    /// and hard ceilings.
    pub async fn full_health_check(&mut self, config: &BrowserPoolConfig) -> BrowserHealth {
        match timeout(Duration::from_secs(5), self.browser.pages()).await {
            Ok(Ok(pages)) => {
                let page_count = pages.len();
                self.health = if self.stats.memory_usage_mb > config.memory_hard_limit_mb {
                    error!(
                        browser_id = %self.id,
                        memory_mb = self.stats.memory_usage_mb,
                        page_count,
                        "browser exceeded hard memory limit"
                    );
                    BrowserHealth::MemoryExceeded
                } else {
                    if self.stats.memory_usage_mb > config.memory_soft_limit_mb {
                        warn!(
                            browser_id = %self.id,
                            memory_mb = self.stats.memory_usage_mb,
                            "browser exceeded soft memory limit"
                        );
                    }
                    BrowserHealth::Healthy
                };
            }
            Ok(Err(e)) => {
                error!(browser_id = %self.id, error = %e, "health check failed");
                self.health = BrowserHealth::Unhealthy;
                self.stats.crashes += 1;
            }
            Err(_) => {
                error!(browser_id = %self.id, "health check timed out");
                self.health = BrowserHealth::Timeout;
                self.stats.timeouts += 1;
            }
        }
        self.health.clone()
    }

    pub async fn cleanup(&mut self) {
        self.handler_task.abort();
        if let Err(e) = self.browser.close().await {
            warn!(browser_id = %self.id, error = %e, "error closing browser during cleanup");
        }
    }
}

impl Drop for PooledBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
