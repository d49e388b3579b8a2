//! Persistent browser-profile session store.
//!
//! The profile directory holds cookies and local storage across runs, so a
//! scrape that authenticated yesterday usually short-circuits straight to
//! extraction today. One [`BrowserSession`] owns browser, event handler, and
//! page together — closing (or dropping) the session releases all of them.

use std::path::{Path, PathBuf};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::Handler;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::driver::{CdpDriver, DriverError};
use crate::error::ScrapeError;

/// On-disk browser profile, created on first use and reused afterwards.
/// Deleting the directory forces a fresh login on the next scrape.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensures the profile directory exists, launches the browser over it,
    /// and opens the single page the scrape will drive.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Session`] when the profile directory cannot be
    /// created and [`ScrapeError::Scrape`] when the browser fails to launch.
    pub async fn open(&self, headless: bool) -> Result<BrowserSession, ScrapeError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ScrapeError::Session {
            path: self.dir.clone(),
            source,
        })?;
        cleanup_profile_lock_artifacts(&self.dir);

        let (browser, handler) = launch_browser(&self.dir, headless).await?;
        let handler_task = tokio::spawn(drain_handler(handler));

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(DriverError::Cdp)?;

        tracing::debug!(profile = %self.dir.display(), headless, "browser session opened");
        Ok(BrowserSession {
            browser,
            handler_task,
            driver: CdpDriver::new(page),
        })
    }
}

/// Browser + CDP event handler + page, owned as one resource.
///
/// Prefer [`BrowserSession::close`] for orderly teardown; `Drop` aborts the
/// handler task so a cancelled scrape still releases the browser process.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    driver: CdpDriver,
}

impl BrowserSession {
    #[must_use]
    pub fn driver(&self) -> &CdpDriver {
        &self.driver
    }

    /// Closes the browser and stops the event handler.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cdp`] if the browser refuses the close command;
    /// the handler task is stopped regardless.
    pub async fn close(mut self) -> Result<(), DriverError> {
        let result = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        result.map(|_| ()).map_err(DriverError::Cdp)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

async fn drain_handler(mut handler: Handler) {
    while let Some(event) = handler.next().await {
        if let Err(err) = event {
            tracing::debug!(error = %err, "browser event error");
        }
    }
}

async fn launch_browser(
    profile_dir: &Path,
    headless: bool,
) -> Result<(Browser, Handler), DriverError> {
    let mut builder = BrowserConfig::builder()
        .user_data_dir(profile_dir)
        .window_size(1280, 720)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");

    if let Some(chrome) = find_chrome() {
        builder = builder.chrome_executable(chrome);
    }
    if !headless {
        builder = builder.with_head();
    }

    let config = builder.build().map_err(DriverError::Launch)?;
    Ok(Browser::launch(config).await?)
}

/// Locates a Chrome/Chromium executable, preferring whatever `which` finds.
fn find_chrome() -> Option<String> {
    for name in ["google-chrome", "chromium"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    candidates
        .iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(|candidate| (*candidate).to_string())
}

/// A crashed prior run can leave the profile locked; Chrome then refuses to
/// reuse it.
fn cleanup_profile_lock_artifacts(profile_dir: &Path) {
    for name in ["SingletonLock", "SingletonSocket"] {
        let _ = std::fs::remove_file(profile_dir.join(name));
    }
}
