//! Content-derived listing identity.
//!
//! A fingerprint is the first 12 hex characters of the MD5 digest of
//! `url_account_title_price_mileage`, with title, price and mileage
//! normalized first. The same key is computed at scrape time and when rows
//! are read back from a sheet, so a listing keeps its identity across runs.

use crate::models::Listing;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Number of hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 12;

const TITLE_KEY_CHARS: usize = 30;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Raw attributes that make up a listing's identity
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    pub url: &'a str,
    pub account: &'a str,
    pub title: &'a str,
    pub price: &'a str,
    pub mileage: &'a str,
}

impl<'a> FingerprintInput<'a> {
    /// Build the normalized identity key
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.url.trim(),
            self.account.trim(),
            normalize_title(self.title),
            digits_only(self.price),
            digits_only(self.mileage),
        )
    }
}

/// Lowercase, drop punctuation, keep the first 30 characters
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    NON_WORD
        .replace_all(&lowered, "")
        .chars()
        .take(TITLE_KEY_CHARS)
        .collect()
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn short_digest(key: &str) -> String {
    let mut hex = format!("{:x}", md5::compute(key.as_bytes()));
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Deterministic fingerprint of the given attributes
pub fn fingerprint(input: &FingerprintInput<'_>) -> String {
    short_digest(&input.key())
}

/// Fingerprint a freshly extracted listing using its rendered cell values,
/// which is exactly what ends up in the sheet.
pub fn fingerprint_listing(listing: &Listing) -> String {
    let title = listing.title_cell();
    let price = listing.price_cell();
    let mileage = listing.mileage_cell();
    fingerprint(&FingerprintInput {
        url: &listing.url,
        account: &listing.account,
        title: &title,
        price: &price,
        mileage: &mileage,
    })
}

/// Fingerprint a record read back from a sheet.
///
/// When any identity column is missing the record cannot be keyed
/// reliably; it still gets an id, derived from the URL (if any) and the
/// current time. That id is not stable between calls.
pub fn fingerprint_record<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let fields = (
        lookup("URL"),
        lookup("Cuenta"),
        lookup("Titulo"),
        lookup("Precio"),
        lookup("Kilometraje"),
    );

    match fields {
        (Some(url), Some(account), Some(title), Some(price), Some(mileage)) => {
            fingerprint(&FingerprintInput {
                url: &url,
                account: &account,
                title: &title,
                price: &price,
                mileage: &mileage,
            })
        }
        (url, ..) => {
            let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let url = url.unwrap_or_else(|| now.to_string());
            debug!("Record missing identity columns, using time-based id for {}", url);
            short_digest(&format!("{}_{}", url, now))
        }
    }
}
