//! Selector-fallback chains for the target page's login and order-history
//! markup, plus the helpers that walk them.
//!
//! Each chain is an ordered list of alternative lookups; the first match
//! wins, deterministically. The chains themselves are the brittle part of
//! this system (the markup changes without notice and carries no version
//! marker), so they live here as plain data — a drift fix is a one-line
//! edit.

use crate::driver::{DriverError, PageDriver, PageElement};

/// Email-input candidates, most specific first.
pub(crate) const EMAIL_SELECTORS: &[&str] = &[
    "#ap_email",
    "input[name='email']",
    "input[type='email']",
    "input[autocomplete='username']",
];

/// Password-input candidates, most specific first.
pub(crate) const PASSWORD_SELECTORS: &[&str] = &[
    "#ap_password",
    "input[name='password']",
    "input[type='password']",
    "input[autocomplete='current-password']",
];

/// Generic submit control used for both the continue and sign-in steps.
pub(crate) const SUBMIT_SELECTOR: &str = "input[type='submit']";

/// Order-container candidates; the first selector yielding a non-empty match
/// set wins for the whole page.
pub(crate) const ORDER_CARD_SELECTORS: &[&str] = &[
    "div.a-box.group.order",
    ".order-card",
    "[data-order-id]",
    "div.order",
];

/// Order-date candidates, scoped to one order card.
pub(crate) const DATE_SELECTORS: &[&str] =
    &["span.order-date-invoice-item", ".order-info .a-color-secondary"];

/// Item-anchor candidates, scoped to one order card.
pub(crate) const ITEM_SELECTORS: &[&str] = &[
    ".shipment .a-link-normal",
    "a[href*='/dp/']",
    "a[href*='/gp/product']",
];

/// Price candidates, scoped to one order card (not one item: the card-level
/// total is the only reliably present value).
pub(crate) const PRICE_SELECTORS: &[&str] = &[".a-color-price", ".a-row .a-color-secondary .value"];

/// Pagination control; only a non-disabled one advances the loop.
pub(crate) const NEXT_PAGE_SELECTOR: &str = ".pagination-next:not(.disabled)";

/// Returns the first element matching any selector in `chain`, together with
/// the selector that matched. `None` means the whole chain is exhausted.
pub(crate) async fn first_match(
    driver: &dyn PageDriver,
    chain: &[&'static str],
) -> Result<Option<(&'static str, Box<dyn PageElement>)>, DriverError> {
    for selector in chain {
        if let Some(element) = driver.query(selector).await? {
            return Ok(Some((selector, element)));
        }
    }
    Ok(None)
}

/// Returns the first non-empty match set produced by any selector in
/// `chain`, for page-level container lookups. The page is assumed to be
/// structurally consistent within itself, so one winning selector covers all
/// containers.
pub(crate) async fn first_non_empty_set(
    driver: &dyn PageDriver,
    chain: &[&'static str],
) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
    for selector in chain {
        let matches = driver.query_all(selector).await?;
        if !matches.is_empty() {
            tracing::debug!(selector, count = matches.len(), "order containers matched");
            return Ok(matches);
        }
    }
    Ok(Vec::new())
}

/// Scoped variant of [`first_non_empty_set`] that searches within one
/// element.
pub(crate) async fn first_non_empty_set_in(
    scope: &dyn PageElement,
    chain: &[&'static str],
) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
    for selector in chain {
        let matches = scope.query_all(selector).await?;
        if !matches.is_empty() {
            return Ok(matches);
        }
    }
    Ok(Vec::new())
}

/// Scoped variant of [`first_match`] that searches within one element.
pub(crate) async fn first_match_in(
    scope: &dyn PageElement,
    chain: &[&'static str],
) -> Result<Option<Box<dyn PageElement>>, DriverError> {
    for selector in chain {
        if let Some(element) = scope.query(selector).await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}
