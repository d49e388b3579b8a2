pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod extract;
pub mod login;
mod parse;
pub mod scrape;
mod selectors;
pub mod session;

pub use driver::{DriverError, PageDriver, PageElement};
pub use error::ScrapeError;
pub use login::{LoginFailure, LoginOutcome};
pub use scrape::{OrderScraper, ScraperConfig};
pub use session::{BrowserSession, SessionStore};
