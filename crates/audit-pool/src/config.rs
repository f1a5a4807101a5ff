//! Browser pool configuration (spec §4.A, §6 options table).

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct BrowserPoolConfig {
    /// Number of browser instances to keep warm; also the hard ceiling
    /// on concurrently open browsers. Driven by the engine's
    /// `maxConcurrent` option.
    pub pool_size: usize,
    /// Maximum number of contexts (leases) a single browser may serve
    /// concurrently before it's excluded from selection, and the
    /// lifetime quota after which it's discarded rather than returned
    /// to the idle set (spec §4.A `maxPagesPerBrowser`). The lease
    /// semaphore is sized to `pool_size * max_pages_per_browser`, so
    /// this is what lets `acquire` admit more outstanding leases than
    /// there are browser processes.
    pub max_pages_per_browser: usize,
    /// Idle timeout before an unused browser is recycled.
    pub idle_timeout: Duration,
    /// Maximum lifetime of a single browser instance before forced
    /// recycling, regardless of health.
    pub max_lifetime: Duration,
    /// Fast liveness probe interval — cheap, just checks the browser
    /// still answers the CDP `pages` call.
    pub fast_check_interval: Duration,
    /// Full health probe interval — checks memory and page count.
    pub full_check_interval: Duration,
    pub memory_soft_limit_mb: u64,
    pub memory_hard_limit_mb: u64,
    pub navigation_timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
    /// Custom base directory for per-browser profile temp dirs.
    pub profile_base_dir: Option<std::path::PathBuf>,
    pub cleanup_timeout: Duration,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            max_pages_per_browser: 5,
            idle_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(600),
            fast_check_interval: Duration::from_secs(2),
            full_check_interval: Duration::from_secs(15),
            memory_soft_limit_mb: 400,
            memory_hard_limit_mb: 500,
            navigation_timeout: Duration::from_secs(30),
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: None,
            profile_base_dir: None,
            cleanup_timeout: Duration::from_secs(5),
        }
    }
}

impl BrowserPoolConfig {
    /// Applies environment overrides on top of whatever the caller
    /// already set, mirroring the override hook other configs in this
    /// workspace expose. Unset or unparsable variables are ignored.
    pub fn from_env(mut self) -> Self {
        if let Ok(v) = std::env::var("AUDITMYSITE_POOL_SIZE") {
            if let Ok(n) = v.parse() {
                self.pool_size = n;
            }
        }
        if let Ok(v) = std::env::var("AUDITMYSITE_NAV_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.navigation_timeout = Duration::from_millis(ms);
            }
        }
        if let Ok(v) = std::env::var("AUDITMYSITE_MAX_PAGES_PER_BROWSER") {
            if let Ok(n) = v.parse() {
                self.max_pages_per_browser = n;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be at least 1".into());
        }
        if self.max_pages_per_browser == 0 {
            return Err("max_pages_per_browser must be at least 1".into());
        }
        if self.memory_soft_limit_mb > self.memory_hard_limit_mb {
            return Err("memory_soft_limit_mb must not exceed memory_hard_limit_mb".into());
        }
        Ok(())
    }
}
