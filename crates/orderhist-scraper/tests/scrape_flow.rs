//! End-to-end flow tests against a scripted in-memory page driver.
//!
//! The fake models the target site as a set of pages keyed by URL, with
//! selector-to-element tables per page, one-shot redirects for the
//! logged-out bounce, and navigation side effects on clicks. No browser is
//! involved.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orderhist_core::Credentials;
use orderhist_scraper::{
    DriverError, LoginFailure, OrderScraper, PageDriver, PageElement, ScrapeError, ScraperConfig,
};

const ORDERS_URL: &str = "https://www.example-shop.test/gp/css/order-history";
const ORDERS_URL_PAGE2: &str = "https://www.example-shop.test/gp/css/order-history?page=2";
const ORDERS_URL_PAGE3: &str = "https://www.example-shop.test/gp/css/order-history?page=3";
const SIGNIN_URL: &str = "https://www.example-shop.test/ap/signin";
const SIGNIN_PASSWORD_URL: &str = "https://www.example-shop.test/ap/signin?step=password";

#[derive(Clone, Default)]
struct ElementSpec {
    text: String,
    attrs: Vec<(&'static str, String)>,
    children: Vec<(&'static str, Vec<ElementSpec>)>,
    /// URL the driver navigates to when this element is clicked.
    click_nav: Option<String>,
    /// Label recorded when this element is filled, for assertions.
    fill_label: Option<&'static str>,
}

#[derive(Clone, Default)]
struct PageSpec {
    content: String,
    elements: Vec<(&'static str, Vec<ElementSpec>)>,
}

#[derive(Default)]
struct State {
    pages: HashMap<String, PageSpec>,
    current: String,
    /// Queue per URL; each navigation to the key consumes one entry.
    redirect_once: HashMap<String, Vec<String>>,
    visits: Vec<String>,
    fills: Vec<(&'static str, String)>,
}

#[derive(Clone, Default)]
struct FakeDriver {
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    fn add_page(&self, url: &str, page: PageSpec) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
    }

    fn redirect_once(&self, from: &str, to: &str) {
        self.state
            .lock()
            .unwrap()
            .redirect_once
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
    }

    fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    fn fills(&self) -> Vec<(&'static str, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    fn current_page(&self) -> PageSpec {
        let state = self.state.lock().unwrap();
        state.pages.get(&state.current).cloned().unwrap_or_default()
    }

    fn handle(&self, spec: ElementSpec) -> Box<dyn PageElement> {
        Box::new(FakeElement {
            state: Arc::clone(&self.state),
            spec,
        })
    }
}

struct FakeElement {
    state: Arc<Mutex<State>>,
    spec: ElementSpec,
}

impl FakeElement {
    fn scoped(&self, spec: ElementSpec) -> Box<dyn PageElement> {
        Box::new(FakeElement {
            state: Arc::clone(&self.state),
            spec,
        })
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self
            .spec
            .attrs
            .iter()
            .find(|(attr, _)| *attr == name)
            .map(|(_, value)| value.clone()))
    }

    async fn inner_text(&self) -> Result<Option<String>, DriverError> {
        Ok(Some(self.spec.text.clone()))
    }

    async fn fill(&self, text: &str) -> Result<(), DriverError> {
        let label = self.spec.fill_label.unwrap_or("unlabeled");
        self.state
            .lock()
            .unwrap()
            .fills
            .push((label, text.to_string()));
        Ok(())
    }

    async fn click(&self) -> Result<(), DriverError> {
        if let Some(target) = &self.spec.click_nav {
            let mut state = self.state.lock().unwrap();
            state.current = target.clone();
            state.visits.push(target.clone());
        }
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, DriverError> {
        Ok(self
            .spec
            .children
            .iter()
            .find(|(sel, matches)| *sel == selector && !matches.is_empty())
            .map(|(_, matches)| self.scoped(matches[0].clone())))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        Ok(self
            .spec
            .children
            .iter()
            .find(|(sel, _)| *sel == selector)
            .map(|(_, matches)| matches.iter().map(|spec| self.scoped(spec.clone())).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        let landed = match state.redirect_once.get_mut(url) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => url.to_string(),
        };
        state.current = landed.clone();
        state.visits.push(landed);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.current_page().content)
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, DriverError> {
        Ok(self
            .current_page()
            .elements
            .iter()
            .find(|(sel, matches)| *sel == selector && !matches.is_empty())
            .map(|(_, matches)| self.handle(matches[0].clone())))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        Ok(self
            .current_page()
            .elements
            .iter()
            .find(|(sel, _)| *sel == selector)
            .map(|(_, matches)| matches.iter().map(|spec| self.handle(spec.clone())).collect())
            .unwrap_or_default())
    }

    async fn wait_for_url(&self, marker: &str, _timeout: Duration) -> Result<bool, DriverError> {
        Ok(self.state.lock().unwrap().current.contains(marker))
    }

    async fn wait_for_ready(&self, _timeout: Duration) {}

    async fn settle(&self, _duration: Duration) {}

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        std::fs::write(path, b"png").map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn save_html(&self, path: &Path) -> Result<(), DriverError> {
        let html = self.content().await?;
        std::fs::write(path, html).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn test_config(diagnostics_dir: &Path) -> ScraperConfig {
    ScraperConfig {
        orders_url: ORDERS_URL.to_string(),
        signin_url: SIGNIN_URL.to_string(),
        diagnostics_dir: diagnostics_dir.to_path_buf(),
        nav_timeout: Duration::from_millis(50),
        verify_timeout: Duration::from_millis(50),
        ready_timeout: Duration::ZERO,
        settle: Duration::ZERO,
        post_load_settle: Duration::ZERO,
        ..ScraperConfig::default()
    }
}

fn credentials() -> Credentials {
    Credentials {
        email: "user@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

fn item_anchor(href: &str, name: &str) -> ElementSpec {
    ElementSpec {
        text: name.to_string(),
        attrs: vec![("href", href.to_string())],
        ..ElementSpec::default()
    }
}

fn order_card(order_id: &str, date: &str, total: &str, items: Vec<ElementSpec>) -> ElementSpec {
    ElementSpec {
        attrs: vec![("data-order-id", order_id.to_string())],
        children: vec![
            (
                "span.order-date-invoice-item",
                vec![ElementSpec {
                    text: date.to_string(),
                    ..ElementSpec::default()
                }],
            ),
            (
                ".a-color-price",
                vec![ElementSpec {
                    text: total.to_string(),
                    ..ElementSpec::default()
                }],
            ),
            ("a[href*='/dp/']", items),
        ],
        ..ElementSpec::default()
    }
}

fn history_page(cards: Vec<ElementSpec>, next_url: Option<&str>) -> PageSpec {
    let mut elements = vec![("div.a-box.group.order", cards)];
    if let Some(url) = next_url {
        elements.push((
            ".pagination-next:not(.disabled)",
            vec![ElementSpec {
                click_nav: Some(url.to_string()),
                ..ElementSpec::default()
            }],
        ));
    }
    PageSpec {
        content: "<html>Your Orders</html>".to_string(),
        elements,
    }
}

fn simple_card(index: usize) -> ElementSpec {
    order_card(
        &format!("111-0000000-000000{index}"),
        "Ordered on June 5, 2024",
        "$19.99",
        vec![item_anchor(
            &format!("/dp/B00000000{index}"),
            &format!("Item {index}"),
        )],
    )
}

#[tokio::test]
async fn authenticated_session_skips_login_form() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();
    driver.add_page(ORDERS_URL, history_page(vec![simple_card(1)], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].asin, "B000000001");
    assert_eq!(rows[0].order_id, "111-0000000-0000001");
    assert_eq!(rows[0].price, Some(19.99));
    assert!(driver.fills().is_empty(), "no form field should be touched");
}

#[tokio::test]
async fn full_login_walk_then_extraction() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    driver.redirect_once(ORDERS_URL, SIGNIN_URL);
    driver.add_page(
        SIGNIN_URL,
        PageSpec {
            elements: vec![
                (
                    "#ap_email",
                    vec![ElementSpec {
                        fill_label: Some("email"),
                        ..ElementSpec::default()
                    }],
                ),
                (
                    "input[type='submit']",
                    vec![ElementSpec {
                        click_nav: Some(SIGNIN_PASSWORD_URL.to_string()),
                        ..ElementSpec::default()
                    }],
                ),
            ],
            ..PageSpec::default()
        },
    );
    driver.add_page(
        SIGNIN_PASSWORD_URL,
        PageSpec {
            elements: vec![
                (
                    "#ap_password",
                    vec![ElementSpec {
                        fill_label: Some("password"),
                        ..ElementSpec::default()
                    }],
                ),
                (
                    "input[type='submit']",
                    vec![ElementSpec {
                        click_nav: Some(ORDERS_URL.to_string()),
                        ..ElementSpec::default()
                    }],
                ),
            ],
            ..PageSpec::default()
        },
    );
    driver.add_page(ORDERS_URL, history_page(vec![simple_card(1)], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(
        driver.fills(),
        vec![
            ("email", "user@example.com".to_string()),
            ("password", "hunter2".to_string()),
        ]
    );
}

#[tokio::test]
async fn row_budget_stops_pagination_early() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    let page1_cards: Vec<_> = (1..=6).map(simple_card).collect();
    let page2_cards: Vec<_> = (1..=6).map(simple_card).collect();
    driver.add_page(ORDERS_URL, history_page(page1_cards, Some(ORDERS_URL_PAGE2)));
    driver.add_page(
        ORDERS_URL_PAGE2,
        history_page(page2_cards, Some(ORDERS_URL_PAGE3)),
    );
    driver.add_page(ORDERS_URL_PAGE3, history_page(vec![simple_card(1)], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 10)
        .await
        .unwrap();

    assert_eq!(rows.len(), 10);
    assert!(
        !driver.visits().iter().any(|url| url == ORDERS_URL_PAGE3),
        "third page must never be visited once the budget is met"
    );
}

#[tokio::test]
async fn page_cap_bounds_the_walk() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    driver.add_page(ORDERS_URL, history_page(vec![simple_card(1)], Some(ORDERS_URL_PAGE2)));
    driver.add_page(
        ORDERS_URL_PAGE2,
        history_page(vec![simple_card(2)], Some(ORDERS_URL_PAGE3)),
    );
    driver.add_page(ORDERS_URL_PAGE3, history_page(vec![simple_card(3)], None));

    let mut config = test_config(diag.path());
    config.max_pages = 2;
    let scraper = OrderScraper::new(config);
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(!driver.visits().iter().any(|url| url == ORDERS_URL_PAGE3));
}

#[tokio::test]
async fn missing_email_field_is_an_authentication_error() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    driver.redirect_once(ORDERS_URL, SIGNIN_URL);
    // Sign-in page with no recognizable form at all.
    driver.add_page(SIGNIN_URL, PageSpec::default());
    driver.add_page(ORDERS_URL, history_page(vec![simple_card(1)], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let error = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap_err();

    assert!(error.is_authentication());
    assert!(matches!(
        error,
        ScrapeError::Authentication {
            failure: LoginFailure::EmailFieldNotFound { .. }
        }
    ));
    assert!(
        diag.path().join("order-login-email.png").exists(),
        "diagnostic screenshot must be captured"
    );
    // Extraction never ran: the only navigation is the initial bounce.
    assert_eq!(driver.visits(), vec![SIGNIN_URL.to_string()]);
}

#[tokio::test]
async fn failed_verification_is_an_authentication_error() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    driver.redirect_once(ORDERS_URL, SIGNIN_URL);
    driver.add_page(
        SIGNIN_URL,
        PageSpec {
            content: "<html>Sign in</html>".to_string(),
            elements: vec![
                (
                    "#ap_email",
                    vec![ElementSpec {
                        fill_label: Some("email"),
                        ..ElementSpec::default()
                    }],
                ),
                (
                    "#ap_password",
                    vec![ElementSpec {
                        fill_label: Some("password"),
                        ..ElementSpec::default()
                    }],
                ),
                (
                    "input[type='submit']",
                    // Submits loop back to the sign-in page: bad password.
                    vec![ElementSpec {
                        click_nav: Some(SIGNIN_URL.to_string()),
                        ..ElementSpec::default()
                    }],
                ),
            ],
        },
    );
    // The verification re-navigation also bounces back.
    driver.redirect_once(ORDERS_URL, SIGNIN_URL);

    let scraper = OrderScraper::new(test_config(diag.path()));
    let error = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ScrapeError::Authentication {
            failure: LoginFailure::VerificationFailed { .. }
        }
    ));
    assert!(diag.path().join("order-login-fail.png").exists());
}

#[tokio::test]
async fn empty_history_dumps_html_and_returns_no_rows() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();
    driver.add_page(
        ORDERS_URL,
        PageSpec {
            content: "<html>Your Orders (none yet)</html>".to_string(),
            ..PageSpec::default()
        },
    );

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert!(rows.is_empty());
    let dump = diag.path().join("order-history-page.html");
    assert!(dump.exists(), "empty extraction must dump the page html");
    let html = std::fs::read_to_string(dump).unwrap();
    assert!(html.contains("none yet"));
}

#[tokio::test]
async fn items_without_name_or_asin_are_dropped() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    let card = order_card(
        "111-0000000-0000001",
        "Ordered on June 5, 2024",
        "$42.00",
        vec![
            item_anchor("/dp/B000000001", "Widget"),
            // Neither a name nor an ASIN-bearing href: dropped.
            item_anchor("/gp/css/summary", ""),
            // Name but no ASIN: kept with an empty asin.
            item_anchor("/gp/css/gift-card", "Gift Card"),
            // Repeated ASIN: a legitimate second line item, kept.
            item_anchor("/dp/B000000001?ref=second", "Widget (second unit)"),
        ],
    );
    driver.add_page(ORDERS_URL, history_page(vec![card], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].name, "Widget");
    assert_eq!(rows[0].asin, "B000000001");
    assert_eq!(rows[1].name, "Gift Card");
    assert_eq!(rows[1].asin, "");
    assert_eq!(
        rows[1].url.as_deref(),
        Some("https://www.example-shop.test/gp/css/gift-card")
    );
    assert_eq!(rows[2].asin, "B000000001");
    assert_eq!(rows[2].name, "Widget (second unit)");
}

#[tokio::test]
async fn auto_advance_past_password_step_still_verifies() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    driver.redirect_once(ORDERS_URL, SIGNIN_URL);
    // Email submit lands straight on the authenticated history page; the
    // password step never appears.
    driver.add_page(
        SIGNIN_URL,
        PageSpec {
            elements: vec![
                (
                    "#ap_email",
                    vec![ElementSpec {
                        fill_label: Some("email"),
                        ..ElementSpec::default()
                    }],
                ),
                (
                    "input[type='submit']",
                    vec![ElementSpec {
                        click_nav: Some(ORDERS_URL.to_string()),
                        ..ElementSpec::default()
                    }],
                ),
            ],
            ..PageSpec::default()
        },
    );
    driver.add_page(ORDERS_URL, history_page(vec![simple_card(1)], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(driver.fills(), vec![("email", "user@example.com".to_string())]);
}

#[tokio::test]
async fn missing_submit_control_is_tolerated() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    driver.redirect_once(ORDERS_URL, SIGNIN_URL);
    // Single-page form with no submit button at all; verification passes
    // on the re-navigation.
    driver.add_page(
        SIGNIN_URL,
        PageSpec {
            elements: vec![
                (
                    "#ap_email",
                    vec![ElementSpec {
                        fill_label: Some("email"),
                        ..ElementSpec::default()
                    }],
                ),
                (
                    "#ap_password",
                    vec![ElementSpec {
                        fill_label: Some("password"),
                        ..ElementSpec::default()
                    }],
                ),
            ],
            ..PageSpec::default()
        },
    );
    driver.add_page(ORDERS_URL, history_page(vec![simple_card(1)], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(
        driver.fills(),
        vec![
            ("email", "user@example.com".to_string()),
            ("password", "hunter2".to_string()),
        ]
    );
}

#[tokio::test]
async fn all_items_dropped_still_dumps_page_html() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    // The card matches but its only anchor carries neither a name nor an
    // ASIN, so zero rows come out.
    let card = order_card(
        "111-0000000-0000001",
        "Ordered on June 5, 2024",
        "$5.00",
        vec![item_anchor("/gp/css/summary", "")],
    );
    driver.add_page(ORDERS_URL, history_page(vec![card], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 50)
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert!(
        diag.path().join("order-history-page.html").exists(),
        "zero extracted rows must dump the page html"
    );
}

#[tokio::test]
async fn max_orders_truncates_flattened_rows() {
    let diag = tempfile::tempdir().unwrap();
    let driver = FakeDriver::default();

    let card = order_card(
        "111-0000000-0000001",
        "Ordered on June 5, 2024",
        "$99.99",
        vec![
            item_anchor("/dp/B000000001", "First"),
            item_anchor("/dp/B000000002", "Second"),
            item_anchor("/dp/B000000003", "Third"),
        ],
    );
    driver.add_page(ORDERS_URL, history_page(vec![card], None));

    let scraper = OrderScraper::new(test_config(diag.path()));
    let rows = scraper
        .scrape_with_driver(&driver, &credentials(), 2)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].name, "Second");
}
