use super::{description_text, Strategy};
use crate::models::Mileage;
use crate::scrapers::page::ListingPage;
use crate::scrapers::types::ExtractionLimits;
use once_cell::sync::Lazy;
use regex::Regex;

pub(super) const YEAR_STRATEGIES: &[Strategy<u16>] = &[
    Strategy { name: "description", run: year_from_description },
    Strategy { name: "page-text", run: year_from_page_text },
];

pub(super) const MILEAGE_STRATEGIES: &[Strategy<Mileage>] = &[
    Strategy { name: "description", run: mileage_from_description },
    Strategy { name: "page-text", run: mileage_from_page_text },
    Strategy { name: "html-source", run: mileage_from_source },
];

static YEAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\baño\s*:\s*(\d{4})\b",
        r"(?i)\bmodelo\s+(\d{4})\b",
        r"(?i)\bdel\s+(\d{4})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

struct MileagePattern {
    regex: Regex,
    multiplier: u32,
    labeled: bool,
}

const KM_NUMBER: &str = r"(\d{1,3}(?:\.\d{3})+|\d+)";

static MILEAGE_PATTERNS: Lazy<Vec<MileagePattern>> = Lazy::new(|| {
    let pattern = |re: String, multiplier, labeled| MileagePattern {
        regex: Regex::new(&re).unwrap(),
        multiplier,
        labeled,
    };
    vec![
        pattern(format!(r"(?i)kil[oó]metros\s*:\s*{}\b", KM_NUMBER), 1, true),
        pattern(format!(r"(?i)\bkms?\s*:\s*{}\b", KM_NUMBER), 1, true),
        pattern(r"(?i)\b(\d+)\s*mil\s*(?:kms?|kil[oó]metros)\b".to_string(), 1000, false),
        pattern(format!(r"(?i)\b{}\s*(?:kms?|kil[oó]metros)\b", KM_NUMBER), 1, false),
    ]
});

// Labeled spec row only; bare `5 km` markup is the distance to the seller
static MILEAGE_SOURCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)kil[oó]metros["\s:>]*</span><span[^>]*>(\d+(?:[.\s]\d+)*)</span>"#).unwrap()
});

/// First plausible model year in free text.
///
/// Patterns are tried in priority order and only their first occurrence is
/// considered; an out-of-range year moves on to the next pattern.
pub fn year_from_text(text: &str, limits: &ExtractionLimits) -> Option<u16> {
    YEAR_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(text)?;
        let year = caps.get(1)?.as_str().parse::<u16>().ok()?;
        limits.year.contains(&year).then_some(year)
    })
}

/// First plausible odometer reading in free text; `0` is accepted
pub fn mileage_from_text(text: &str, limits: &ExtractionLimits) -> Option<Mileage> {
    scan_mileage(text, limits, false)
}

fn scan_mileage(text: &str, limits: &ExtractionLimits, labeled_only: bool) -> Option<Mileage> {
    MILEAGE_PATTERNS
        .iter()
        .filter(|p| p.labeled || !labeled_only)
        .find_map(|p| {
            let caps = p.regex.captures(text)?;
            let km = parse_km(caps.get(1)?.as_str())?.checked_mul(p.multiplier)?;
            (km <= limits.max_mileage).then_some(Mileage(km))
        })
}

fn parse_km(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn year_from_description(page: &ListingPage, limits: &ExtractionLimits) -> Option<u16> {
    year_from_text(&description_text(page)?, limits)
}

fn year_from_page_text(page: &ListingPage, limits: &ExtractionLimits) -> Option<u16> {
    year_from_text(&page.body_text(), limits)
}

fn mileage_from_description(page: &ListingPage, limits: &ExtractionLimits) -> Option<Mileage> {
    mileage_from_text(&description_text(page)?, limits)
}

// The rest of the page also shows distances ("a 5 km de ti"), so only
// labeled readings count here.
fn mileage_from_page_text(page: &ListingPage, limits: &ExtractionLimits) -> Option<Mileage> {
    scan_mileage(&page.body_text(), limits, true)
}

fn mileage_from_source(page: &ListingPage, limits: &ExtractionLimits) -> Option<Mileage> {
    MILEAGE_SOURCE_PATTERN
        .captures_iter(page.source())
        .filter_map(|caps| parse_km(caps.get(1)?.as_str()))
        .find(|km| *km <= limits.max_mileage)
        .map(Mileage)
}
