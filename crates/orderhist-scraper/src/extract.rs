//! Paginated extraction of order cards into structured records.
//!
//! Each history page holds a set of order containers; each container yields
//! one [`OrderRecord`] with zero or more nested items. Extraction is
//! resilient per card: a card that cannot be parsed is logged and skipped,
//! never aborting the page.

use orderhist_core::{ItemRecord, OrderRecord};

use crate::diagnostics::Diagnostics;
use crate::driver::{DriverError, PageDriver, PageElement};
use crate::parse;
use crate::scrape::ScraperConfig;
use crate::selectors::{
    self, DATE_SELECTORS, ITEM_SELECTORS, NEXT_PAGE_SELECTOR, ORDER_CARD_SELECTORS,
    PRICE_SELECTORS,
};

pub(crate) struct Extractor<'a> {
    config: &'a ScraperConfig,
    diagnostics: &'a Diagnostics,
}

impl<'a> Extractor<'a> {
    pub(crate) fn new(config: &'a ScraperConfig, diagnostics: &'a Diagnostics) -> Self {
        Self {
            config,
            diagnostics,
        }
    }

    /// Walks history pages until the row budget, the page cap, or the end of
    /// pagination is reached. A walk that yields nothing dumps the final
    /// page HTML for selector-drift triage and returns an empty set, not an
    /// error.
    pub(crate) async fn extract(
        &self,
        driver: &dyn PageDriver,
        max_rows: usize,
    ) -> Result<Vec<OrderRecord>, DriverError> {
        let mut records = Vec::new();
        let mut row_count = 0usize;

        for page in 1..=self.config.max_pages {
            let cards = selectors::first_non_empty_set(driver, ORDER_CARD_SELECTORS).await?;
            tracing::info!(page, cards = cards.len(), "extracting order cards");

            if cards.is_empty() {
                break;
            }

            let page_url = driver.current_url().await?;
            for (index, card) in cards.iter().enumerate() {
                match self.extract_card(&page_url, card.as_ref()).await {
                    Ok(record) => {
                        row_count += record.item_count();
                        records.push(record);
                    }
                    Err(error) => {
                        tracing::warn!(page, index, %error, "order card skipped");
                    }
                }
                if row_count >= max_rows {
                    tracing::info!(row_count, "row budget reached");
                    return Ok(records);
                }
            }

            if page == self.config.max_pages {
                tracing::info!(page, "page cap reached");
                break;
            }
            let Some(next) = driver.query(NEXT_PAGE_SELECTOR).await? else {
                tracing::debug!(page, "no further pages");
                break;
            };
            next.click().await?;
            driver.wait_for_ready(self.config.ready_timeout).await;
            driver.settle(self.config.post_load_settle).await;
        }

        if row_count == 0 {
            tracing::warn!("no item rows extracted, dumping page for triage");
            self.diagnostics
                .capture_html(driver, &self.diagnostics.empty_history_dump())
                .await;
        }
        Ok(records)
    }

    /// Parses one order container. The card-level price is the only total
    /// reliably present, so it is applied to every item in the order.
    async fn extract_card(
        &self,
        page_url: &str,
        card: &dyn PageElement,
    ) -> Result<OrderRecord, DriverError> {
        let order_id = match card.attribute("data-order-id").await? {
            Some(id) if !id.is_empty() => id,
            _ => {
                let text = card.inner_text().await?.unwrap_or_default();
                parse::order_id_from_text(&text).unwrap_or_else(|| "unknown".to_string())
            }
        };

        let order_date_raw = match selectors::first_match_in(card, DATE_SELECTORS).await? {
            Some(element) => element.inner_text().await?.unwrap_or_default(),
            None => String::new(),
        };

        let price = match selectors::first_match_in(card, PRICE_SELECTORS).await? {
            Some(element) => element
                .inner_text()
                .await?
                .as_deref()
                .and_then(parse::parse_price),
            None => None,
        };

        let anchors = selectors::first_non_empty_set_in(card, ITEM_SELECTORS).await?;
        let mut items = Vec::new();
        for anchor in &anchors {
            if let Some(item) = self
                .extract_item(page_url, card, anchor.as_ref(), price)
                .await?
            {
                items.push(item);
            }
        }

        Ok(OrderRecord {
            order_id,
            order_date_raw,
            items,
        })
    }

    /// Parses one item anchor; a row with neither a name nor an ASIN carries
    /// no information and is dropped.
    async fn extract_item(
        &self,
        page_url: &str,
        card: &dyn PageElement,
        anchor: &dyn PageElement,
        price: Option<f64>,
    ) -> Result<Option<ItemRecord>, DriverError> {
        let href = anchor.attribute("href").await?.unwrap_or_default();
        let url = if href.is_empty() {
            None
        } else {
            Some(parse::absolutize(page_url, &href))
        };
        let asin = url
            .as_deref()
            .and_then(parse::asin_from_url)
            .unwrap_or_default();
        let name = match anchor.attribute("title").await? {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => anchor
                .inner_text()
                .await?
                .map(|text| text.trim().to_string())
                .unwrap_or_default(),
        };

        if name.is_empty() && asin.is_empty() {
            return Ok(None);
        }

        // Prefer the image nested in the item anchor, fall back to the
        // card-level thumbnail.
        let image_url = match anchor.query("img").await? {
            Some(img) => img.attribute("src").await?,
            None => match card.query("img").await? {
                Some(img) => img.attribute("src").await?,
                None => None,
            },
        };
        let image_url =
            image_url.map(|src| parse::absolutize(page_url, &src));

        Ok(Some(ItemRecord {
            asin,
            name,
            price,
            image_url,
            url,
        }))
    }
}
