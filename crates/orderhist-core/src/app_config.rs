use std::path::PathBuf;

/// Application configuration resolved from the environment.
///
/// Everything here is a knob on the scrape itself; the credential pair is
/// loaded separately (see [`crate::config::load_credentials`]) so it never
/// rides along in config logs or `Debug` output.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Browser profile directory; cookies and local storage persist here
    /// across runs so a prior login can be reused.
    pub session_dir: PathBuf,
    /// Where failure screenshots and HTML dumps are written.
    pub diagnostics_dir: PathBuf,
    pub headless: bool,
    pub max_orders: usize,
    /// Hard cap on pages visited per scrape, independent of `max_orders`.
    pub max_pages: usize,
    pub orders_url: String,
    pub signin_url: String,
    pub nav_timeout_secs: u64,
    pub verify_timeout_secs: u64,
}
