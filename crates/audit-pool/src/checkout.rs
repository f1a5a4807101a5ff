//! A leased browser with automatic release semantics.

use crate::pool::BrowserPool;
use anyhow::Result;
use spider_chrome::Page;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, warn};

/// RAII handle to a checked-out browser. Call [`release`](Self::release)
/// when finished; dropping without releasing still returns the browser
/// to the pool via a best-effort background task, but logs a warning —
/// callers in the orchestrator are expected to release explicitly in a
/// `finally`-style path (spec §4.E step 7).
pub struct BrowserCheckout {
    browser_id: String,
    pool: Arc<BrowserPool>,
    permit: Option<OwnedSemaphorePermit>,
}

impl BrowserCheckout {
    pub(crate) fn new(browser_id: String, pool: Arc<BrowserPool>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            browser_id,
            pool,
            permit: Some(permit),
        }
    }

    pub fn browser_id(&self) -> &str {
        &self.browser_id
    }

    pub async fn new_page(&self, url: &str) -> Result<Page> {
        self.pool.new_page(&self.browser_id, url).await
    }

    /// Returns the browser to the pool. Idempotent — calling this more
    /// than once (or letting drop run afterward) is a no-op the second
    /// time since the permit is consumed here.
    pub async fn release(mut self) -> Result<()> {
        let result = self.pool.release(&self.browser_id).await;
        self.permit.take();
        result
    }
}

impl Drop for BrowserCheckout {
    fn drop(&mut self) {
        if self.permit.is_some() {
            warn!(
                browser_id = %self.browser_id,
                "browser checkout dropped without explicit release"
            );
            let browser_id = self.browser_id.clone();
            let pool = Arc::clone(&self.pool);
            tokio::spawn(async move {
                if let Err(e) = pool.release(&browser_id).await {
                    error!(browser_id = %browser_id, error = %e, "failed to release browser during drop");
                }
            });
        }
    }
}
