use super::{collapse_whitespace, Strategy};
use crate::scrapers::page::{element_text, ListingPage};
use crate::scrapers::types::ExtractionLimits;
use once_cell::sync::Lazy;
use regex::Regex;

pub(super) const VIEW_STRATEGIES: &[Strategy<u32>] = &[
    Strategy { name: "aria-label", run: views_from_elements },
    Strategy { name: "page-text", run: views_from_page_text },
];

pub(super) const LIKE_STRATEGIES: &[Strategy<u32>] = &[
    Strategy { name: "aria-label", run: likes_from_elements },
    Strategy { name: "page-text", run: likes_from_page_text },
];

const VIEW_SELECTORS: &[&str] = &[
    r#"span[aria-label="Views"]"#,
    r#"[aria-label*="Views"]"#,
    r#"[aria-label*="views"]"#,
    r#"[class*="views"]"#,
    r#"[class*="Views"]"#,
];

const LIKE_SELECTORS: &[&str] = &[
    "button[aria-label*='favorite'] span",
    "button[aria-label*='Favorite'] span",
    "[aria-label*='favorite']",
    "[aria-label*='Favorite']",
    "button[class*='favorite'] span",
    "button[class*='heart'] span",
    "[class*='favorite-counter']",
    "[class*='heart']",
];

static SHORT_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*k\b").unwrap());
static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

static VIEW_TEXT_PATTERNS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*k\s*(?:views|visitas)\b").unwrap(), 1000.0),
        (Regex::new(r"(?i)\b(\d+)\s*(?:views|visitas)\b").unwrap(), 1.0),
    ]
});

static LIKE_TEXT_PATTERNS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    vec![(
        Regex::new(r"(?i)\b(\d+)\s*(?:favoritos|favorites|likes|me gusta)\b").unwrap(),
        1.0,
    )]
});

/// Parse a counter as shown on the page: plain digits or the short
/// `1.1k` form
pub fn parse_count(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(caps) = SHORT_FORM.captures(text) {
        let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
        return Some((value * 1000.0).round() as u32);
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().ok();
    }
    None
}

fn count_from_elements(page: &ListingPage, selectors: &[&str], ceiling: u32) -> Option<u32> {
    for css in selectors {
        for element in page.select_all(css) {
            let text = collapse_whitespace(&element_text(&element));
            if let Some(value) = parse_count(&text).filter(|v| *v <= ceiling) {
                return Some(value);
            }

            let aria = element.value().attr("aria-label").unwrap_or_default();
            let from_aria = parse_count(aria).or_else(|| {
                FIRST_NUMBER
                    .captures(aria)
                    .and_then(|caps| caps.get(1)?.as_str().parse().ok())
            });
            if let Some(value) = from_aria.filter(|v| *v <= ceiling) {
                return Some(value);
            }
        }
    }
    None
}

fn count_from_text(text: &str, patterns: &[(Regex, f64)], ceiling: u32) -> Option<u32> {
    patterns.iter().find_map(|(regex, multiplier)| {
        regex.captures_iter(text).find_map(|caps| {
            let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
            let count = (value * multiplier).round() as u32;
            (count <= ceiling).then_some(count)
        })
    })
}

fn views_from_elements(page: &ListingPage, limits: &ExtractionLimits) -> Option<u32> {
    count_from_elements(page, VIEW_SELECTORS, limits.max_views)
}

fn views_from_page_text(page: &ListingPage, limits: &ExtractionLimits) -> Option<u32> {
    count_from_text(&page.body_text(), &VIEW_TEXT_PATTERNS, limits.max_views)
}

fn likes_from_elements(page: &ListingPage, limits: &ExtractionLimits) -> Option<u32> {
    count_from_elements(page, LIKE_SELECTORS, limits.max_likes)
}

fn likes_from_page_text(page: &ListingPage, limits: &ExtractionLimits) -> Option<u32> {
    count_from_text(&page.body_text(), &LIKE_TEXT_PATTERNS, limits.max_likes)
}
