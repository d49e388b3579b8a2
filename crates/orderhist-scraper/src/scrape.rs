//! Scrape orchestration: session open, login, extraction, flattening, and
//! the error split callers depend on.

use std::path::PathBuf;
use std::time::Duration;

use orderhist_core::{flatten_orders, AppConfig, Credentials, OrderRow};

use crate::diagnostics::Diagnostics;
use crate::driver::PageDriver;
use crate::error::ScrapeError;
use crate::extract::Extractor;
use crate::login::LoginFlow;
use crate::session::SessionStore;

/// Tunables for one scraper instance. [`Default`] carries the production
/// values; tests shrink the waits to near zero.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub orders_url: String,
    pub signin_url: String,
    /// URL substring treated as proof of an authenticated history page.
    pub order_history_marker: String,
    /// URL substring for the signed-in account area, the weaker second tier.
    pub account_url_marker: String,
    /// Page-content marker used when both URL checks are inconclusive.
    pub authenticated_marker: String,
    pub session_dir: PathBuf,
    pub diagnostics_dir: PathBuf,
    pub headless: bool,
    pub max_pages: usize,
    pub nav_timeout: Duration,
    pub verify_timeout: Duration,
    pub ready_timeout: Duration,
    /// Pause after navigations and form submits, letting scripts settle.
    pub settle: Duration,
    /// Longer pause after a history page loads; the order list renders late.
    pub post_load_settle: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            orders_url: orderhist_core::DEFAULT_ORDERS_URL.to_string(),
            signin_url: orderhist_core::DEFAULT_SIGNIN_URL.to_string(),
            order_history_marker: "order-history".to_string(),
            account_url_marker: "/gp/your-account/".to_string(),
            authenticated_marker: "Your Orders".to_string(),
            session_dir: PathBuf::from(".orderhist/session"),
            diagnostics_dir: std::env::temp_dir(),
            headless: true,
            max_pages: 5,
            nav_timeout: Duration::from_secs(30),
            verify_timeout: Duration::from_secs(15),
            ready_timeout: Duration::from_secs(10),
            settle: Duration::from_secs(2),
            post_load_settle: Duration::from_secs(5),
        }
    }
}

impl ScraperConfig {
    /// Builds a scraper config from the application config, keeping the
    /// markers and settle times at their defaults.
    #[must_use]
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            orders_url: app.orders_url.clone(),
            signin_url: app.signin_url.clone(),
            session_dir: app.session_dir.clone(),
            diagnostics_dir: app.diagnostics_dir.clone(),
            headless: app.headless,
            max_pages: app.max_pages,
            nav_timeout: Duration::from_secs(app.nav_timeout_secs),
            verify_timeout: Duration::from_secs(app.verify_timeout_secs),
            ..Self::default()
        }
    }
}

/// The top-level entry point: owns a config, opens one browser session per
/// scrape, and returns flattened rows.
pub struct OrderScraper {
    config: ScraperConfig,
}

impl OrderScraper {
    #[must_use]
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Runs a full scrape: open the persisted session, authenticate, extract
    /// up to `max_orders` rows, and tear the browser down whether or not the
    /// scrape succeeded.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Authentication`] when login reaches a terminal failure,
    /// [`ScrapeError::Session`] when the profile directory is unusable, and
    /// [`ScrapeError::Scrape`] for driver/transport failures. An empty order
    /// history is `Ok(vec![])`, never an error.
    pub async fn scrape_orders(
        &self,
        credentials: &Credentials,
        max_orders: usize,
    ) -> Result<Vec<OrderRow>, ScrapeError> {
        let store = SessionStore::new(&self.config.session_dir);
        let session = store.open(self.config.headless).await?;

        let result = self
            .scrape_with_driver(session.driver(), credentials, max_orders)
            .await;

        if let Err(error) = session.close().await {
            tracing::warn!(%error, "browser session close failed");
        }
        result
    }

    /// Scrape against an already-open page. Split out from
    /// [`Self::scrape_orders`] so the flow can run against any
    /// [`PageDriver`] implementation.
    pub async fn scrape_with_driver(
        &self,
        driver: &dyn PageDriver,
        credentials: &Credentials,
        max_orders: usize,
    ) -> Result<Vec<OrderRow>, ScrapeError> {
        let diagnostics = Diagnostics::new(&self.config.diagnostics_dir);

        let login = LoginFlow::new(&self.config, &diagnostics);
        match login.run(driver, credentials).await? {
            Ok(outcome) => tracing::info!(?outcome, "authenticated"),
            Err(failure) => return Err(ScrapeError::Authentication { failure }),
        }

        // Login verification can leave the page anywhere in the account
        // area; always land on the history page before extracting.
        driver.goto(&self.config.orders_url, self.config.nav_timeout).await?;
        driver.wait_for_ready(self.config.ready_timeout).await;
        driver.settle(self.config.post_load_settle).await;

        let extractor = Extractor::new(&self.config, &diagnostics);
        let records = extractor.extract(driver, max_orders).await?;
        tracing::info!(orders = records.len(), "extraction complete");

        let mut rows = flatten_orders(records);
        rows.truncate(max_orders);
        Ok(rows)
    }
}
