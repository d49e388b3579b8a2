//! Thin capability traits over a single browser page, plus the chromiumoxide
//! implementation.
//!
//! The login state machine and the paginated extractor only ever see
//! [`PageDriver`] / [`PageElement`]; the real browser stays behind this seam
//! so flows can be exercised against a scripted fake in tests. Element
//! absence is a typed `None`, never an error — fallback chains depend on
//! probing selectors that usually miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser protocol error: {0}")]
    Cdp(#[from] CdpError),

    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout {
        what: &'static str,
        timeout: Duration,
    },

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A handle to one element on the page. Scoped queries (`query`/`query_all`)
/// search only within this element's subtree.
#[async_trait]
pub trait PageElement: Send + Sync {
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;
    async fn inner_text(&self) -> Result<Option<String>, DriverError>;
    async fn fill(&self, text: &str) -> Result<(), DriverError>;
    async fn click(&self) -> Result<(), DriverError>;
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, DriverError>;
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError>;
}

/// The single page the scrape drives. Every wait is bounded; none of these
/// methods hangs past its timeout.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates and waits for the DOM to be loaded, up to `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Full rendered markup of the current page.
    async fn content(&self) -> Result<String, DriverError>;

    /// First element matching `selector`, or `None` when nothing matches.
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, DriverError>;

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError>;

    /// Polls until the current URL contains `marker`. Returns `Ok(false)` on
    /// timeout — the caller decides whether that is fatal.
    async fn wait_for_url(&self, marker: &str, timeout: Duration) -> Result<bool, DriverError>;

    /// Waits for in-flight navigation/network activity to settle. A timeout
    /// here is tolerated (the page may simply be idle already).
    async fn wait_for_ready(&self, timeout: Duration);

    /// Unconditional fixed delay; the target page renders content well after
    /// the navigation completes.
    async fn settle(&self, duration: Duration);

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError>;

    async fn save_html(&self, path: &Path) -> Result<(), DriverError>;
}

/// [`PageDriver`] over a real chromiumoxide [`Page`].
pub struct CdpDriver {
    page: Page,
}

impl CdpDriver {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

/// Maps "element not there" protocol outcomes to `None`; anything else is a
/// real driver failure.
fn absence_to_none<T>(result: Result<T, CdpError>) -> Result<Option<T>, DriverError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CdpError::NotFound) => Ok(None),
        Err(CdpError::Chrome(err)) => {
            tracing::debug!(error = %err, "element lookup rejected by browser");
            Ok(None)
        }
        Err(other) => Err(other.into()),
    }
}

fn boxed(elements: Vec<Element>) -> Vec<Box<dyn PageElement>> {
    elements
        .into_iter()
        .map(|el| Box::new(CdpElement { element: el }) as Box<dyn PageElement>)
        .collect()
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(DriverError::Timeout {
                what: "navigation",
                timeout,
            }),
        }
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.page.content().await?)
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, DriverError> {
        let found = absence_to_none(self.page.find_element(selector).await)?;
        Ok(found.map(|el| Box::new(CdpElement { element: el }) as Box<dyn PageElement>))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        let found = absence_to_none(self.page.find_elements(selector).await)?;
        Ok(boxed(found.unwrap_or_default()))
    }

    async fn wait_for_url(&self, marker: &str, timeout: Duration) -> Result<bool, DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.current_url().await?.contains(marker) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn wait_for_ready(&self, timeout: Duration) {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "wait_for_navigation failed; continuing");
            }
            Err(_) => {
                tracing::debug!(?timeout, "page did not reach idle within timeout; continuing");
            }
        }
    }

    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        self.page
            .save_screenshot(
                ScreenshotParams::builder().full_page(true).build(),
                path,
            )
            .await?;
        Ok(())
    }

    async fn save_html(&self, path: &Path) -> Result<(), DriverError> {
        let html = self.content().await?;
        tokio::fs::write(path, html)
            .await
            .map_err(|source| DriverError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

struct CdpElement {
    element: Element,
}

#[async_trait]
impl PageElement for CdpElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.element.attribute(name).await?)
    }

    async fn inner_text(&self) -> Result<Option<String>, DriverError> {
        Ok(self.element.inner_text().await?)
    }

    async fn fill(&self, text: &str) -> Result<(), DriverError> {
        self.element.focus().await?;
        self.element.type_str(text).await?;
        Ok(())
    }

    async fn click(&self) -> Result<(), DriverError> {
        self.element.click().await?;
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, DriverError> {
        let found = absence_to_none(self.element.find_element(selector).await)?;
        Ok(found.map(|el| Box::new(CdpElement { element: el }) as Box<dyn PageElement>))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        let found = absence_to_none(self.element.find_elements(selector).await)?;
        Ok(boxed(found.unwrap_or_default()))
    }
}
