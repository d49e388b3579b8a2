//! Record types shared between the scraper core and its callers.
//!
//! The scraper emits [`OrderRecord`]s (one per order card, items nested);
//! callers consume [`OrderRow`]s, flattened to one row per item — the wire
//! shape the HTTP adapter and tool layers expect.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An account credential pair, resolved by the caller (env/config loader)
/// and consumed by the login flow. Never persisted by the scraper.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// A single purchased item extracted from an order card.
///
/// `asin` may be empty and `name` may be empty, but never both — such items
/// are dropped during extraction. Identity is positional within one scrape;
/// duplicate asin/name pairs across orders are possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub asin: String,
    pub name: String,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub url: Option<String>,
}

/// One order card: best-effort order id, the raw (unparsed) date string,
/// and the items found inside the card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Derived from a `data-order-id` attribute or an "Order #…" label;
    /// `"unknown"` when unrecoverable. A degraded value, not an error.
    pub order_id: String,
    /// Raw date text as it appeared on the page; locale-aware parsing is the
    /// caller's concern (see [`normalize_order_date`]).
    pub order_date_raw: String,
    pub items: Vec<ItemRecord>,
}

impl OrderRecord {
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// One item of one order, flattened for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: String,
    pub order_date_raw: String,
    pub asin: String,
    pub name: String,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub url: Option<String>,
}

/// Flattens nested order records into one [`OrderRow`] per item, preserving
/// extraction order.
#[must_use]
pub fn flatten_orders(orders: Vec<OrderRecord>) -> Vec<OrderRow> {
    let mut rows = Vec::new();
    for order in orders {
        for item in order.items {
            rows.push(OrderRow {
                order_id: order.order_id.clone(),
                order_date_raw: order.order_date_raw.clone(),
                asin: item.asin,
                name: item.name,
                price: item.price,
                image_url: item.image_url,
                url: item.url,
            });
        }
    }
    rows
}

/// Parses a raw order-date string into a UTC timestamp, falling back to the
/// current time when the string cannot be interpreted.
///
/// The raw text often carries a label prefix ("Ordered on June 5, 2024",
/// "Order placed June 5, 2024"); prefixes are stripped before parsing. The
/// fallback is lossy but explicit: downstream consumers prefer a wrong-ish
/// timestamp over dropping the record.
#[must_use]
pub fn normalize_order_date(raw: &str) -> DateTime<Utc> {
    let cleaned = raw
        .trim()
        .trim_start_matches("Ordered on")
        .trim_start_matches("Order placed")
        .trim();

    const FORMATS: &[&str] = &["%B %d, %Y", "%d %B %Y", "%Y-%m-%d", "%m/%d/%Y"];
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            if let Some(noon) = date.and_hms_opt(12, 0, 0) {
                return noon.and_utc();
            }
        }
    }
    Utc::now()
}
