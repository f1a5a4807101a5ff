//! Desktop/mobile screenshot capture (spec §4.H `captureScreenshots`).
//!
//! A side artifact written next to the run, not part of the Page
//! Result shape — spec §3 is silent on screenshots, so this writes
//! straight to disk rather than growing the composite record. Grounded
//! in the teacher's CDP screenshot wrapper
//! (`riptide-browser::cdp::spider_impl::screenshot`).

use spider_chrome::cdp::browser_protocol::page::CaptureScreenshotFormat;
use spider_chrome::page::ScreenshotParams;
use spider_chrome::Page;
use std::path::{Path, PathBuf};
use tracing::warn;

pub async fn capture(page: &Page, dir: &Path, file_stem: &str) -> Option<PathBuf> {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(true)
        .build();

    let bytes = match page.screenshot(params).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, file_stem, "screenshot capture failed");
            return None;
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(error = %e, dir = %dir.display(), "failed to create screenshot directory");
        return None;
    }

    let path = dir.join(format!("{file_stem}.png"));
    match tokio::fs::write(&path, &bytes).await {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to write screenshot");
            None
        }
    }
}

/// Turns a URL into a filesystem-safe file stem.
pub fn sanitize_for_filename(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_scheme_and_path_separators() {
        let sanitized = sanitize_for_filename("https://example.com/a/b?c=1");
        assert!(!sanitized.contains('/'));
        assert!(!sanitized.contains(':'));
    }
}
