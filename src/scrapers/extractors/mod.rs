//! Per-field extraction from a listing page snapshot.
//!
//! Every field has an ordered list of independent strategies. The first one
//! that yields a value passing its own range check wins; when none does the
//! field stays empty (rendered as a sentinel) or falls back to zero for the
//! engagement counters. Extraction itself never fails.

mod engagement;
mod price;
mod specs;
mod title;

use crate::fingerprint::fingerprint_listing;
use crate::models::{Listing, Mileage, Price};
use crate::scrapers::page::ListingPage;
use crate::scrapers::types::ExtractionLimits;
use chrono::Local;
use tracing::debug;

pub use engagement::parse_count;
pub use price::normalize_price_text;
pub use specs::{mileage_from_text, year_from_text};

/// One way of finding a field value
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&ListingPage, &ExtractionLimits) -> Option<T>,
}

/// Run strategies in order and keep the first hit
pub fn first_match<T: std::fmt::Debug>(
    field: &str,
    strategies: &[Strategy<T>],
    page: &ListingPage,
    limits: &ExtractionLimits,
) -> Option<T> {
    for strategy in strategies {
        if let Some(value) = (strategy.run)(page, limits) {
            debug!("{} via {}: {:?}", field, strategy.name, value);
            return Some(value);
        }
    }
    debug!("{} not found on {}", field, page.url());
    None
}

pub fn extract_title(page: &ListingPage, limits: &ExtractionLimits) -> Option<String> {
    first_match("title", title::STRATEGIES, page, limits)
}

pub fn extract_price(page: &ListingPage, limits: &ExtractionLimits) -> Option<Price> {
    first_match("price", price::STRATEGIES, page, limits)
}

pub fn extract_year(page: &ListingPage, limits: &ExtractionLimits) -> Option<u16> {
    first_match("year", specs::YEAR_STRATEGIES, page, limits)
}

pub fn extract_mileage(page: &ListingPage, limits: &ExtractionLimits) -> Option<Mileage> {
    first_match("mileage", specs::MILEAGE_STRATEGIES, page, limits)
}

pub fn extract_views(page: &ListingPage, limits: &ExtractionLimits) -> u32 {
    first_match("views", engagement::VIEW_STRATEGIES, page, limits).unwrap_or(0)
}

pub fn extract_likes(page: &ListingPage, limits: &ExtractionLimits) -> u32 {
    first_match("likes", engagement::LIKE_STRATEGIES, page, limits).unwrap_or(0)
}

/// Extract every field of a listing page and assign its fingerprint
pub fn extract_listing(page: &ListingPage, account: &str, limits: &ExtractionLimits) -> Listing {
    let mut listing = Listing {
        fingerprint: String::new(),
        account: account.to_string(),
        title: extract_title(page, limits),
        price: extract_price(page, limits),
        year: extract_year(page, limits),
        mileage: extract_mileage(page, limits),
        views: extract_views(page, limits),
        likes: extract_likes(page, limits),
        url: page.url().to_string(),
        extracted_at: Local::now(),
    };
    listing.fingerprint = fingerprint_listing(&listing);
    listing
}

/// Selectors for the free-text description block, most specific first
pub(crate) const DESCRIPTION_SELECTORS: &[&str] = &[
    "section.item-detail_ItemDetailTwoColumns__description__0DKb0",
    ".item-detail_ItemDetailTwoColumns__description__0DKb0",
    "section[class*='description']",
    "[class*='description']",
    "[class*='Description']",
];

pub(crate) fn description_text(page: &ListingPage) -> Option<String> {
    page.first_text(DESCRIPTION_SELECTORS)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NOT_SPECIFIED, TITLE_NOT_FOUND};

    fn never(_: &ListingPage, _: &ExtractionLimits) -> Option<u32> {
        None
    }

    fn seven(_: &ListingPage, _: &ExtractionLimits) -> Option<u32> {
        Some(7)
    }

    fn nine(_: &ListingPage, _: &ExtractionLimits) -> Option<u32> {
        Some(9)
    }

    #[test]
    fn test_first_match_respects_order() {
        let page = ListingPage::parse("https://example.com", "<html></html>");
        let limits = ExtractionLimits::default();
        let strategies = [
            Strategy { name: "never", run: never },
            Strategy { name: "seven", run: seven },
            Strategy { name: "nine", run: nine },
        ];
        assert_eq!(first_match("n", &strategies, &page, &limits), Some(7));
        assert_eq!(first_match("n", &strategies[..1], &page, &limits), None);
    }

    #[test]
    fn test_extract_listing_on_full_page() {
        let html = r#"
            <html>
            <head><meta property="og:title" content="Kawasaki Z900 - Wallapop"></head>
            <body>
                <h1 class="item-detail_title">Kawasaki Z900 Performance</h1>
                <span class="item-detail-price_ItemDetailPrice--standard__fMa16">7.690 €</span>
                <section class="item-detail_ItemDetailTwoColumns__description__0DKb0">
                    <p>Kawasaki Z900 en perfecto estado</p>
                    <p>- Año: 2020</p>
                    <p>- Kilómetros: 15.300</p>
                </section>
                <span aria-label="Views">1.2k</span>
                <button aria-label="favorite"><span>14</span></button>
            </body>
            </html>
        "#;
        let page = ListingPage::parse("https://es.wallapop.com/item/kawasaki-z900-1", html);
        let listing = extract_listing(&page, "MOTICK.MA M.", &ExtractionLimits::default());

        assert_eq!(listing.title.as_deref(), Some("Kawasaki Z900 Performance"));
        assert_eq!(listing.price, Some(Price(7690)));
        assert_eq!(listing.year, Some(2020));
        assert_eq!(listing.mileage, Some(Mileage(15300)));
        assert_eq!(listing.views, 1200);
        assert_eq!(listing.likes, 14);
        assert_eq!(listing.fingerprint.len(), 12);
        assert_eq!(listing.account, "MOTICK.MA M.");
    }

    #[test]
    fn test_extract_listing_on_empty_page_uses_sentinels() {
        let page = ListingPage::parse(
            "https://es.wallapop.com/item/empty",
            "<html><body><div>Nada por aquí</div></body></html>",
        );
        let listing = extract_listing(&page, "MOTICK.BA B.", &ExtractionLimits::default());

        assert_eq!(listing.title_cell(), TITLE_NOT_FOUND);
        assert_eq!(listing.price_cell(), NOT_SPECIFIED);
        assert_eq!(listing.year_cell(), NOT_SPECIFIED);
        assert_eq!(listing.mileage_cell(), NOT_SPECIFIED);
        assert_eq!(listing.views, 0);
        assert_eq!(listing.likes, 0);
    }
}
