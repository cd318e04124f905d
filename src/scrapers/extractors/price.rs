use super::Strategy;
use crate::models::Price;
use crate::scrapers::page::{element_text, own_text, ListingPage};
use crate::scrapers::types::ExtractionLimits;
use once_cell::sync::Lazy;
use regex::Regex;

pub(super) const STRATEGIES: &[Strategy<Price>] = &[
    Strategy { name: "price-display", run: from_price_display },
    Strategy { name: "cash-price-label", run: from_cash_price_label },
    Strategy { name: "currency-scan", run: from_currency_scan },
];

const PRICE_SELECTORS: &[&str] = &[
    "span.item-detail-price_ItemDetailPrice--standardFinanced__f9ceG",
    ".item-detail-price_ItemDetailPrice--standardFinanced__f9ceG",
    "span.item-detail-price_ItemDetailPrice--standard__fMa16",
    "span.item-detail-price_ItemDetailPrice--financed__LgMRH",
    ".item-detail-price_ItemDetailPrice--financed__LgMRH",
    "[class*='ItemDetailPrice']",
    "[class*='standardFinanced'] span",
    "[class*='financed'] span",
];

const CASH_PRICE_LABEL: &str = "Precio al contado";

/// How many euro-bearing elements the generic scan looks at
const CURRENCY_SCAN_LIMIT: usize = 10;

// Patterns with two groups carry the thousands and the units separately
static PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(\d{1,3}(?:\.\d{3})+)\s*€",
        r"\b(\d{4,6})\s*€",
        r"\b(\d{1,2})\s*\.\s*(\d{3})\s*€",
        r"\b(\d{1,2}),(\d{3})\s*€",
        r"€\s*(\d{1,2}\.?\d{3,6})\b",
        r"(?i)\b(\d{1,2}\.?\d{3,6})\s*euros?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static SCAN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"\b(\d{1,3}(?:\.\d{3})+)\s*€", r"\b(\d{1,6})\s*€"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Parse a raw price string such as `"7.690 €"`.
///
/// Returns `None` when nothing in the text parses to a price inside the
/// plausible range.
pub fn normalize_price_text(text: &str, limits: &ExtractionLimits) -> Option<Price> {
    let clean = text.replace("&nbsp;", " ").replace('\u{a0}', " ");
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    for pattern in PRICE_PATTERNS.iter() {
        for caps in pattern.captures_iter(clean) {
            let digits = match (caps.get(1), caps.get(2)) {
                (Some(thousands), Some(units)) => format!("{}{}", thousands.as_str(), units.as_str()),
                (Some(whole), None) => whole.as_str().replace(['.', ','], ""),
                _ => continue,
            };
            if let Ok(value) = digits.parse::<u32>() {
                if limits.price.contains(&value) {
                    return Some(Price(value));
                }
            }
        }
    }

    None
}

fn from_price_display(page: &ListingPage, limits: &ExtractionLimits) -> Option<Price> {
    PRICE_SELECTORS.iter().find_map(|css| {
        page.select_all(css)
            .iter()
            .map(element_text)
            .filter(|text| text.contains('€'))
            .find_map(|text| normalize_price_text(&text, limits))
    })
}

fn from_cash_price_label(page: &ListingPage, limits: &ExtractionLimits) -> Option<Price> {
    let mut past_label = false;
    for span in page.select_all("span") {
        let text = element_text(&span);
        if !past_label {
            past_label = text.trim() == CASH_PRICE_LABEL;
            continue;
        }
        let is_price = span
            .value()
            .attr("class")
            .map_or(false, |class| class.contains("ItemDetailPrice"));
        if is_price && text.contains('€') {
            return normalize_price_text(&text, limits);
        }
    }
    None
}

fn from_currency_scan(page: &ListingPage, limits: &ExtractionLimits) -> Option<Price> {
    let mut candidates: Vec<u32> = Vec::new();

    for text in page
        .select_all("body *")
        .iter()
        .map(own_text)
        .filter(|text| text.contains('€'))
        .take(CURRENCY_SCAN_LIMIT)
    {
        for pattern in SCAN_PATTERNS.iter() {
            for caps in pattern.captures_iter(&text) {
                let Some(raw) = caps.get(1) else { continue };
                if let Ok(value) = raw.as_str().replace('.', "").parse::<u32>() {
                    if limits.price.contains(&value) {
                        candidates.push(value);
                    }
                }
            }
        }
    }

    candidates.into_iter().max().map(Price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ExtractionLimits {
        ExtractionLimits::default()
    }

    #[test]
    fn test_normalize_common_formats() {
        let l = limits();
        assert_eq!(normalize_price_text("5.490 €", &l), Some(Price(5490)));
        assert_eq!(normalize_price_text("5.490 €", &l).unwrap().to_string(), "5.490 €");
        assert_eq!(normalize_price_text("7690 €", &l), Some(Price(7690)));
        assert_eq!(normalize_price_text("7 . 690 €", &l), Some(Price(7690)));
        assert_eq!(normalize_price_text("7,690 €", &l), Some(Price(7690)));
        assert_eq!(normalize_price_text("€ 7690", &l), Some(Price(7690)));
        assert_eq!(normalize_price_text("Precio: 12.000 euros", &l), Some(Price(12000)));
        assert_eq!(normalize_price_text("3.200&nbsp;€", &l), Some(Price(3200)));
    }

    #[test]
    fn test_normalize_rejects_out_of_range() {
        let l = limits();
        assert_eq!(normalize_price_text("300 €", &l), None);
        assert_eq!(normalize_price_text("95.000 €", &l), None);
        assert_eq!(normalize_price_text("", &l), None);
        assert_eq!(normalize_price_text("sin precio", &l), None);
    }

    #[test]
    fn test_cash_price_label_sibling() {
        let html = r#"<html><body>
            <span class="ItemDetailPrice--financed">120 €/mes</span>
            <span>Precio al contado</span>
            <span class="item-detail-price_ItemDetailPrice--x">6.250 €</span>
        </body></html>"#;
        let page = ListingPage::parse("https://es.wallapop.com/item/a", html);
        assert_eq!(from_cash_price_label(&page, &limits()), Some(Price(6250)));
    }

    #[test]
    fn test_currency_scan_picks_highest_plausible() {
        let html = r#"<html><body>
            <div>Envío 35 €</div>
            <div>Cuota desde 150 €</div>
            <p>Vendo por 4.300 €, negociable</p>
            <p>Antes 4.800 €</p>
        </body></html>"#;
        let page = ListingPage::parse("https://es.wallapop.com/item/b", html);
        assert_eq!(from_currency_scan(&page, &limits()), Some(Price(4800)));
    }
}
