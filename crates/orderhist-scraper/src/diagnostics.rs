//! Failure artifacts written for post-mortem inspection.
//!
//! Captures are best-effort: a screenshot that cannot be written must never
//! mask the error that prompted it, so failures here are logged and
//! swallowed.

use std::path::{Path, PathBuf};

use crate::driver::PageDriver;

/// Well-known artifact names under the diagnostics directory.
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Screenshot taken when the email field cannot be located.
    pub fn login_email_screenshot(&self) -> PathBuf {
        self.dir.join("order-login-email.png")
    }

    /// Screenshot taken when post-submit verification fails.
    pub fn login_fail_screenshot(&self) -> PathBuf {
        self.dir.join("order-login-fail.png")
    }

    /// Full page HTML dumped when extraction finds zero order containers.
    pub fn empty_history_dump(&self) -> PathBuf {
        self.dir.join("order-history-page.html")
    }

    /// Captures a full-page screenshot at `path`, logging instead of failing.
    pub async fn capture_screenshot(&self, driver: &dyn PageDriver, path: &Path) {
        if let Err(error) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), %error, "diagnostics dir unavailable");
            return;
        }
        match driver.screenshot(path).await {
            Ok(()) => tracing::info!(path = %path.display(), "diagnostic screenshot saved"),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "diagnostic screenshot failed");
            }
        }
    }

    /// Dumps the current page HTML at `path`, logging instead of failing.
    pub async fn capture_html(&self, driver: &dyn PageDriver, path: &Path) {
        if let Err(error) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), %error, "diagnostics dir unavailable");
            return;
        }
        match driver.save_html(path).await {
            Ok(()) => tracing::info!(path = %path.display(), "page html saved"),
            Err(error) => tracing::warn!(path = %path.display(), %error, "page html dump failed"),
        }
    }
}
