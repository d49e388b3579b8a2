//! Text-level parsing for scraped fragments: prices, ASINs, order ids, and
//! URL absolutization. Everything here is pure and synchronous.

use std::sync::OnceLock;

use regex::Regex;

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Currency symbol is optional (some totals render bare numbers);
    // thousands separators appear on larger totals.
    RE.get_or_init(|| Regex::new(r"\$?\s*(\d[\d,]*\.?\d*)").unwrap())
}

fn asin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(?:dp|gp/product)/([^/?#]+)").unwrap())
}

fn order_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{3}-\d{7}-\d{7})").unwrap())
}

/// Extracts the first monetary amount from `text`, with or without a
/// leading currency symbol, tolerating thousands separators. Returns
/// `None` when no parseable amount is present.
pub(crate) fn parse_price(text: &str) -> Option<f64> {
    let captures = price_re().captures(text)?;
    captures[1].replace(',', "").parse().ok()
}

/// Pulls the ASIN out of a product URL: the path component following
/// `/dp/` or `/gp/product/`, taken verbatim.
pub(crate) fn asin_from_url(url: &str) -> Option<String> {
    asin_re()
        .captures(url)
        .map(|captures| captures[1].to_string())
}

/// Finds the machine order id (`ddd-ddddddd-ddddddd`) anywhere in a card's
/// text blob.
pub(crate) fn order_id_from_text(text: &str) -> Option<String> {
    order_id_re()
        .captures(text)
        .map(|captures| captures[1].to_string())
}

/// Resolves a relative `href` against the origin of `page_url`. Absolute
/// URLs pass through untouched; anything unresolvable is returned as-is.
pub(crate) fn absolutize(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match page_origin(page_url) {
        Some(origin) if href.starts_with('/') => format!("{origin}{href}"),
        Some(origin) => format!("{origin}/{href}"),
        None => href.to_string(),
    }
}

/// Extracts `scheme://host` from a full URL, or `None` if the shape is not a
/// URL at all.
pub(crate) fn page_origin(page_url: &str) -> Option<String> {
    let scheme_end = page_url.find("://")?;
    if scheme_end == 0 {
        return None;
    }
    let rest = &page_url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    if rest[..host_end].is_empty() {
        return None;
    }
    Some(page_url[..scheme_end + 3 + host_end].to_string())
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
