use super::{collapse_whitespace, description_text, Strategy};
use crate::scrapers::page::{element_text, ListingPage};
use crate::scrapers::types::ExtractionLimits;
use std::collections::HashSet;

pub(super) const STRATEGIES: &[Strategy<String>] = &[
    Strategy { name: "heading", run: from_heading },
    Strategy { name: "meta-title", run: from_meta_title },
    Strategy { name: "description-first-line", run: from_description },
];

const BRANDS: &[&str] = &[
    "HONDA", "YAMAHA", "KAWASAKI", "SUZUKI", "BMW", "KTM", "DUCATI", "PIAGGIO", "VESPA",
    "APRILIA", "TRIUMPH",
];

/// Title-marked headings first, then any `h1`
const HEADING_SELECTORS: &[&str] = &[
    "h1[class*='title']",
    "h1[class*='Title']",
    "[class*='title'] h1",
    "[class*='Title'] h1",
    "h1",
];

const TITLE_SEPARATORS: &[&str] = &[" - ", " | "];

fn has_brand(text: &str) -> bool {
    let upper = text.to_uppercase();
    BRANDS.iter().any(|brand| upper.contains(brand))
}

fn heading_candidates(page: &ListingPage) -> Vec<String> {
    let mut visited = HashSet::new();
    HEADING_SELECTORS
        .iter()
        .flat_map(|css| page.select_all(css))
        .filter(|el| visited.insert(el.id()))
        .map(|el| collapse_whitespace(&element_text(&el)))
        .filter(|text| {
            let len = text.chars().count();
            len > 3 && len < 100
        })
        .collect()
}

fn from_heading(page: &ListingPage, _: &ExtractionLimits) -> Option<String> {
    let candidates = heading_candidates(page);
    candidates
        .iter()
        .find(|text| has_brand(text))
        .or_else(|| candidates.iter().find(|text| text.chars().count() > 10))
        .cloned()
}

fn from_meta_title(page: &ListingPage, _: &ExtractionLimits) -> Option<String> {
    let og_title = page
        .select_first(r#"meta[property="og:title"]"#)
        .and_then(|meta| meta.value().attr("content").map(str::to_string));
    let document_title = page.select_first("title").map(|el| element_text(&el));

    [og_title, document_title]
        .into_iter()
        .flatten()
        .map(|content| collapse_whitespace(&content))
        .filter(|content| content.chars().count() > 5)
        .map(|content| cut_at_separator(&content))
        .find(|title| !title.is_empty())
}

fn cut_at_separator(content: &str) -> String {
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| content.find(sep))
        .min()
        .unwrap_or(content.len());
    content[..cut].trim().to_string()
}

fn from_description(page: &ListingPage, _: &ExtractionLimits) -> Option<String> {
    let description = description_text(page)?;
    let first_line = description.lines().map(str::trim).find(|line| !line.is_empty())?;
    let len = first_line.chars().count();
    (len > 5 && len < 80).then(|| first_line.to_string())
}
