//! Redirect detection output shape (spec §4.B).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectType {
    Http,
    Meta,
    Javascript,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectInfo {
    pub is_redirect: bool,
    pub status_code: Option<u16>,
    pub original_url: String,
    pub final_url: String,
    pub url_changed: bool,
    pub has_redirect_chain: bool,
    pub redirect_type: Option<RedirectType>,
}

/// Strips trailing `/`, protocol, and leading `www.` (spec §4.B / §9).
/// Two URLs equal after this are *not* treated as a redirect even if an
/// HTTP hop occurred between them.
pub fn canonicalize_url(url: &str) -> String {
    let without_protocol = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let without_www = without_protocol
        .strip_prefix("www.")
        .unwrap_or(without_protocol);
    without_www.strip_suffix('/').unwrap_or(without_www).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_protocol_www_and_trailing_slash() {
        assert_eq!(canonicalize_url("https://www.example.com/"), "example.com");
        assert_eq!(canonicalize_url("http://example.com"), "example.com");
        assert_eq!(canonicalize_url("https://example.com/"), "example.com");
    }

    #[test]
    fn http_to_https_and_www_toggle_canonicalize_equal() {
        assert_eq!(
            canonicalize_url("http://example.com/"),
            canonicalize_url("https://www.example.com")
        );
    }

    #[test]
    fn distinct_paths_stay_distinct() {
        assert_ne!(
            canonicalize_url("https://example.com/a"),
            canonicalize_url("https://example.com/b")
        );
    }
}
