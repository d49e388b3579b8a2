use std::path::PathBuf;

use thiserror::Error;

use crate::driver::DriverError;
use crate::login::LoginFailure;

/// Failures surfaced to callers of [`crate::OrderScraper`].
///
/// `Authentication` and everything else are deliberately distinct variants:
/// callers branch on "bad credentials" versus "site changed / transient
/// failure" without knowing anything about transport. An empty extraction is
/// NOT an error — it is an empty `Vec` plus an HTML dump on disk.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("authentication failed: {failure}")]
    Authentication { failure: LoginFailure },

    #[error("session store error at {path}: {source}")]
    Session {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scrape failed: {0}")]
    Scrape(#[from] DriverError),
}

impl ScrapeError {
    /// `true` when the scrape failed because login did not produce an
    /// authenticated page.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
