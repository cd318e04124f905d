use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written when no title strategy produced a value
pub const TITLE_NOT_FOUND: &str = "Titulo no encontrado";

/// Placeholder written for price, year and mileage when nothing valid was found
pub const NOT_SPECIFIED: &str = "No especificado";

/// Seller profile to scrape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub profile_url: String,
}

impl Account {
    pub fn new(name: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_url: profile_url.into(),
        }
    }
}

/// Asking price in whole euros
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(pub u32);

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} €", group_thousands(self.0))
    }
}

/// Odometer reading in kilometres; zero is a real reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mileage(pub u32);

impl fmt::Display for Mileage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} km", group_thousands(self.0))
    }
}

/// Formats a number with `.` as the thousands separator, e.g. `12.500`
pub fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// One scraped motorcycle advertisement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub fingerprint: String,
    pub account: String,
    pub title: Option<String>,
    pub price: Option<Price>,
    pub year: Option<u16>,
    pub mileage: Option<Mileage>,
    pub views: u32,
    pub likes: u32,
    pub url: String,
    pub extracted_at: DateTime<Local>,
}

impl Listing {
    pub fn title_cell(&self) -> String {
        self.title.clone().unwrap_or_else(|| TITLE_NOT_FOUND.to_string())
    }

    pub fn price_cell(&self) -> String {
        self.price
            .map(|p| p.to_string())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string())
    }

    pub fn year_cell(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string())
    }

    pub fn mileage_cell(&self) -> String {
        self.mileage
            .map(|m| m.to_string())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string())
    }

    pub fn extracted_at_cell(&self) -> String {
        self.extracted_at.format("%d/%m/%Y %H:%M").to_string()
    }
}
