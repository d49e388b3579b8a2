//! Login flow: a small state machine that walks the sign-in form, with an
//! already-authenticated short-circuit and two-tier verification of the
//! result.
//!
//! The flow deliberately starts at the order-history URL rather than the
//! sign-in page: an authenticated session is redirected nowhere and the
//! whole form walk is skipped.

use orderhist_core::Credentials;

use crate::diagnostics::Diagnostics;
use crate::driver::{DriverError, PageDriver};
use crate::scrape::ScraperConfig;
use crate::selectors::{self, EMAIL_SELECTORS, PASSWORD_SELECTORS, SUBMIT_SELECTOR};

/// How an authenticated session was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The persisted profile was still signed in; no form was touched.
    AlreadyAuthenticated,
    /// The full email/password walk completed and verified.
    LoggedIn,
}

/// Terminal login failures, each tied to the diagnostic artifact captured
/// alongside it.
#[derive(Debug, thiserror::Error)]
pub enum LoginFailure {
    #[error("email field not found on sign-in page (url: {url})")]
    EmailFieldNotFound { url: String },
    #[error("login verification failed; landed on {url}")]
    VerificationFailed { url: String },
}

enum LoginState {
    NavigateToOrders,
    CheckAuthenticated,
    SubmitEmail,
    SubmitPassword,
    Verify,
}

pub(crate) struct LoginFlow<'a> {
    config: &'a ScraperConfig,
    diagnostics: &'a Diagnostics,
}

impl<'a> LoginFlow<'a> {
    pub(crate) fn new(config: &'a ScraperConfig, diagnostics: &'a Diagnostics) -> Self {
        Self {
            config,
            diagnostics,
        }
    }

    /// Drives the state machine to an authenticated session or a terminal
    /// [`LoginFailure`].
    ///
    /// # Errors
    ///
    /// Returns `Ok(Err(failure))` for login-level failures (wrong page
    /// shape, verification miss) and `Err` only for transport-level driver
    /// errors.
    pub(crate) async fn run(
        &self,
        driver: &dyn PageDriver,
        credentials: &Credentials,
    ) -> Result<Result<LoginOutcome, LoginFailure>, DriverError> {
        let mut state = LoginState::NavigateToOrders;
        loop {
            state = match state {
                LoginState::NavigateToOrders => {
                    tracing::info!(url = %self.config.orders_url, "navigating to order history");
                    match driver
                        .goto(&self.config.orders_url, self.config.nav_timeout)
                        .await
                    {
                        Ok(()) => {}
                        Err(DriverError::Timeout { .. }) => {
                            tracing::warn!(
                                url = %self.config.signin_url,
                                "order history navigation timed out, falling back to sign-in page"
                            );
                            driver
                                .goto(&self.config.signin_url, self.config.nav_timeout)
                                .await?;
                        }
                        Err(other) => return Err(other),
                    }
                    driver.wait_for_ready(self.config.ready_timeout).await;
                    driver.settle(self.config.settle).await;
                    LoginState::CheckAuthenticated
                }
                LoginState::CheckAuthenticated => {
                    let url = driver.current_url().await?;
                    if self.url_is_authenticated(&url) {
                        tracing::info!("existing session still authenticated");
                        return Ok(Ok(LoginOutcome::AlreadyAuthenticated));
                    }
                    if driver
                        .content()
                        .await?
                        .contains(&self.config.authenticated_marker)
                    {
                        tracing::info!("existing session authenticated by page content");
                        return Ok(Ok(LoginOutcome::AlreadyAuthenticated));
                    }
                    tracing::info!(%url, "session expired, walking sign-in form");
                    LoginState::SubmitEmail
                }
                LoginState::SubmitEmail => {
                    let Some((selector, field)) =
                        selectors::first_match(driver, EMAIL_SELECTORS).await?
                    else {
                        let url = driver.current_url().await?;
                        tracing::warn!(%url, "no email field matched");
                        self.diagnostics
                            .capture_screenshot(
                                driver,
                                &self.diagnostics.login_email_screenshot(),
                            )
                            .await;
                        return Ok(Err(LoginFailure::EmailFieldNotFound { url }));
                    };
                    tracing::debug!(selector, "email field located");
                    field.fill(&credentials.email).await?;
                    self.submit(driver).await?;
                    driver.settle(self.config.settle).await;
                    LoginState::SubmitPassword
                }
                LoginState::SubmitPassword => {
                    match selectors::first_match(driver, PASSWORD_SELECTORS).await? {
                        Some((selector, field)) => {
                            tracing::debug!(selector, "password field located");
                            field.fill(&credentials.password).await?;
                            self.submit(driver).await?;
                        }
                        // Some flows auto-advance past the password step;
                        // only verification is authoritative.
                        None => tracing::warn!("no password field matched, proceeding to verify"),
                    }
                    LoginState::Verify
                }
                LoginState::Verify => {
                    return Ok(self.verify(driver).await?.map(|()| LoginOutcome::LoggedIn));
                }
            };
        }
    }

    /// Clicks the submit control if one is present. Absence is tolerated
    /// with a warning; some forms auto-advance on input.
    async fn submit(&self, driver: &dyn PageDriver) -> Result<(), DriverError> {
        match driver.query(SUBMIT_SELECTOR).await? {
            Some(button) => {
                button.click().await?;
            }
            None => tracing::warn!("no submit control matched, relying on auto-advance"),
        }
        Ok(())
    }

    /// Two-tier post-submit verification: first wait on the URL to carry the
    /// order-history marker, then fall back to re-navigating and checking
    /// the landed page.
    async fn verify(
        &self,
        driver: &dyn PageDriver,
    ) -> Result<Result<(), LoginFailure>, DriverError> {
        if driver
            .wait_for_url(&self.config.order_history_marker, self.config.verify_timeout)
            .await?
        {
            tracing::info!("login verified by url");
            return Ok(Ok(()));
        }

        tracing::debug!("url check timed out, re-navigating to confirm");
        driver
            .goto(&self.config.orders_url, self.config.nav_timeout)
            .await?;
        driver.wait_for_ready(self.config.ready_timeout).await;
        driver.settle(self.config.settle).await;

        let url = driver.current_url().await?;
        if self.url_is_authenticated(&url) {
            tracing::info!("login verified by re-navigation");
            return Ok(Ok(()));
        }
        let content = driver.content().await?;
        if content.contains(&self.config.authenticated_marker) {
            tracing::info!("login verified by page content");
            return Ok(Ok(()));
        }

        tracing::warn!(%url, "login verification failed");
        self.diagnostics
            .capture_screenshot(driver, &self.diagnostics.login_fail_screenshot())
            .await;
        Ok(Err(LoginFailure::VerificationFailed { url }))
    }

    fn url_is_authenticated(&self, url: &str) -> bool {
        url.contains(&self.config.order_history_marker)
            || url.contains(&self.config.account_url_marker)
    }
}
