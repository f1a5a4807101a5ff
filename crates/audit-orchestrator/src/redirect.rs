//! Redirect Detector (spec §4.B): classifies whether a navigation is a
//! real redirect the orchestrator should skip.
//!
//! The spec describes subscribing to every network response during
//! navigation and inspecting the transport's redirect chain. This
//! implementation does the equivalent with a lightweight HTTP probe
//! ahead of the browser navigation — following the redirect chain
//! manually with `reqwest` (redirects disabled on the client so every
//! hop's status is observed) rather than hooking CDP network events —
//! grounded in the teacher's own reqwest-based HTTP adapters
//! (`riptide-fetch::adapters::reqwest_http_client`,
//! `riptide-reliability::http_client`). See DESIGN.md for the tradeoff.

use audit_types::{canonicalize_url, RedirectInfo, RedirectType};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

const MAX_HOPS: usize = 10;

pub struct RedirectDetector {
    client: Client,
}

impl RedirectDetector {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Follows the chain up to [`MAX_HOPS`], then classifies per §4.B /
    /// §9: a real redirect requires both an observed 3xx hop and a
    /// canonicalized URL change — an http->https or www toggle alone is
    /// not a redirect.
    pub async fn detect(&self, url: &str) -> anyhow::Result<RedirectInfo> {
        let mut current = url.to_string();
        let mut saw_3xx = false;
        let mut hops = 0usize;
        let mut last_status = None;

        loop {
            let response = self.client.get(&current).send().await?;
            let status = response.status();
            last_status = Some(status.as_u16());

            if status.is_redirection() {
                saw_3xx = true;
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let Some(location) = location else {
                    debug!(url = %current, "3xx response carried no Location header");
                    break;
                };
                current = resolve(&current, &location)?;
                hops += 1;
                if hops >= MAX_HOPS {
                    break;
                }
                continue;
            }
            break;
        }

        Ok(classify(url, &current, saw_3xx, hops, last_status))
    }
}

fn resolve(base: &str, location: &str) -> anyhow::Result<String> {
    match Url::parse(location) {
        Ok(absolute) => Ok(absolute.to_string()),
        Err(_) => Ok(Url::parse(base)?.join(location)?.to_string()),
    }
}

/// Pure classification, split out from [`RedirectDetector::detect`] so
/// it's testable without a network round trip.
fn classify(original: &str, final_url: &str, saw_3xx: bool, hops: usize, status: Option<u16>) -> RedirectInfo {
    let url_changed = canonicalize_url(original) != canonicalize_url(final_url);
    let is_redirect = saw_3xx && url_changed;

    RedirectInfo {
        is_redirect,
        status_code: status,
        original_url: original.to_string(),
        final_url: final_url.to_string(),
        url_changed,
        has_redirect_chain: hops > 0,
        redirect_type: is_redirect.then_some(RedirectType::Http),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_with_url_change_is_a_real_redirect() {
        let info = classify("https://x/old", "https://x/new", true, 1, Some(301));
        assert!(info.is_redirect);
    }

    #[test]
    fn http_to_https_toggle_alone_is_not_a_redirect() {
        let info = classify("http://example.com/", "https://example.com/", true, 1, Some(301));
        assert!(!info.is_redirect, "canonicalization should absorb the scheme change");
    }

    #[test]
    fn www_toggle_alone_is_not_a_redirect() {
        let info = classify("https://www.example.com/", "https://example.com/", true, 1, Some(301));
        assert!(!info.is_redirect);
    }

    #[test]
    fn no_3xx_observed_is_not_a_redirect_even_if_url_differs() {
        // e.g. a client-side (JS/meta) navigation the HTTP probe never saw.
        let info = classify("https://x/a", "https://x/b", false, 0, Some(200));
        assert!(!info.is_redirect);
    }

    #[test]
    fn redirect_to_canonically_equal_url_is_not_a_redirect() {
        let info = classify("https://example.com/page", "https://example.com/page/", true, 1, Some(301));
        assert!(!info.is_redirect, "trailing slash alone should canonicalize equal");
    }
}
