//! Tabular persistence: named sheets of string cells.
//!
//! Two backends implement [`SheetStore`]: a directory of CSV files and a
//! Google spreadsheet. Dated uploads, latest-sheet lookup and history reads
//! sit on top of the trait and work with either.

pub mod csv_store;
pub mod error;
pub mod google;

pub use csv_store::CsvWorkbook;
pub use error::{Result, StoreError};
pub use google::GoogleSheetsStore;

use crate::models::Listing;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

pub const SCRAPE_SHEET_PREFIX: &str = "Datos_";
pub const HISTORY_SHEET: &str = "Data_Historico";
pub const SHEET_DATE_FORMAT: &str = "%d_%m_%Y";

pub const FINGERPRINT_COLUMN: &str = "ID_Unico_Real";
pub const VIEWS_COLUMN: &str = "Visitas";
pub const LIKES_COLUMN: &str = "Likes";

/// Scrape sheet layout; the fingerprint column goes last
pub const SCRAPE_COLUMNS: [&str; 10] = [
    "Cuenta",
    "Titulo",
    "Precio",
    "Ano",
    "Kilometraje",
    VIEWS_COLUMN,
    LIKES_COLUMN,
    "URL",
    "Fecha_Extraccion",
    FINGERPRINT_COLUMN,
];

const UPLOAD_ATTEMPTS: u32 = 3;

/// A workbook of named sheets
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn list_sheets(&self) -> Result<Vec<String>>;

    /// All rows of a sheet, header included; `None` when it does not exist
    async fn read_sheet(&self, name: &str) -> Result<Option<Vec<Vec<String>>>>;

    /// Replace the sheet contents, creating it when missing
    async fn write_sheet(&self, name: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    /// Integer value; text cells count as 0
    pub fn as_int(&self) -> i64 {
        match self {
            Cell::Int(n) => *n,
            Cell::Text(_) => 0,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

/// Lenient integer parsing; anything unparseable becomes 0
pub fn coerce_int(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        .unwrap_or(0)
}

/// A sheet with its header row split off
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Build from raw rows, converting the columns picked by `numeric`.
    /// Returns `None` for an empty or header-only sheet.
    pub fn from_rows(rows: Vec<Vec<String>>, numeric: impl Fn(&str) -> bool) -> Option<Self> {
        let mut rows = rows.into_iter();
        let headers: Vec<String> = rows.next()?.into_iter().map(|h| h.trim().to_string()).collect();
        let numeric_columns: Vec<bool> = headers.iter().map(|h| numeric(h.as_str())).collect();

        let body: Vec<Vec<Cell>> = rows
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|mut row| {
                row.resize(headers.len(), String::new());
                row.into_iter()
                    .zip(&numeric_columns)
                    .map(|(raw, is_numeric)| {
                        if *is_numeric {
                            Cell::Int(coerce_int(&raw))
                        } else {
                            Cell::Text(raw)
                        }
                    })
                    .collect()
            })
            .collect();

        if body.is_empty() {
            return None;
        }
        Some(Self { headers, rows: body })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Text of a cell, `None` for a missing column or an empty value
    pub fn text(&self, row: usize, column: &str) -> Option<String> {
        self.cell(row, column)
            .map(|c| c.to_string())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn int(&self, row: usize, column: &str) -> i64 {
        self.cell(row, column).map_or(0, Cell::as_int)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row followed by every data row, as strings
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(
                self.rows
                    .iter()
                    .map(|row| row.iter().map(|c| c.to_string()).collect()),
            )
            .collect()
    }
}

pub fn scrape_sheet_name(date: NaiveDate) -> String {
    format!("{}{}", SCRAPE_SHEET_PREFIX, date.format(SHEET_DATE_FORMAT))
}

/// Date of a `Datos_DD_MM_YYYY` sheet, `None` for any other name
pub fn parse_scrape_sheet_name(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(SCRAPE_SHEET_PREFIX)?;
    NaiveDate::parse_from_str(date, SHEET_DATE_FORMAT).ok()
}

fn listing_row(listing: &Listing) -> Vec<String> {
    vec![
        listing.account.clone(),
        listing.title_cell(),
        listing.price_cell(),
        listing.year_cell(),
        listing.mileage_cell(),
        listing.views.to_string(),
        listing.likes.to_string(),
        listing.url.clone(),
        listing.extracted_at_cell(),
        listing.fingerprint.clone(),
    ]
}

/// Header plus one row per listing, most liked first
pub fn scrape_rows(listings: &[Listing]) -> Vec<Vec<String>> {
    let mut sorted: Vec<&Listing> = listings.iter().collect();
    sorted.sort_by(|a, b| b.likes.cmp(&a.likes).then(b.views.cmp(&a.views)));

    std::iter::once(SCRAPE_COLUMNS.iter().map(|c| c.to_string()).collect())
        .chain(sorted.into_iter().map(listing_row))
        .collect()
}

/// Write listings to the dated scrape sheet and return its name
pub async fn upload(store: &dyn SheetStore, listings: &[Listing], date: NaiveDate) -> Result<String> {
    upload_with_backoff(store, listings, date, Duration::from_secs(1)).await
}

pub(crate) async fn upload_with_backoff(
    store: &dyn SheetStore,
    listings: &[Listing],
    date: NaiveDate,
    base_delay: Duration,
) -> Result<String> {
    let name = scrape_sheet_name(date);
    let rows = scrape_rows(listings);
    let mut attempt = 1;

    loop {
        match store.write_sheet(&name, &rows).await {
            Ok(()) => {
                info!("📤 Uploaded {} listings to {} in {}", listings.len(), name, store.describe());
                return Ok(name);
            }
            Err(e) if e.is_retryable() && attempt < UPLOAD_ATTEMPTS => {
                let delay = base_delay * 2u32.pow(attempt - 1);
                warn!(
                    "Upload attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, UPLOAD_ATTEMPTS, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Most recent scrape sheet with views and likes as integers
pub async fn read_latest(store: &dyn SheetStore) -> Result<Option<(SheetTable, NaiveDate)>> {
    let latest = store
        .list_sheets()
        .await?
        .into_iter()
        .filter_map(|name| parse_scrape_sheet_name(&name).map(|date| (name, date)))
        .max_by_key(|(_, date)| *date);

    let Some((name, date)) = latest else {
        warn!("No {}DD_MM_YYYY sheet in {}", SCRAPE_SHEET_PREFIX, store.describe());
        return Ok(None);
    };

    let Some(rows) = store.read_sheet(&name).await? else {
        return Ok(None);
    };

    match SheetTable::from_rows(rows, |h| h == VIEWS_COLUMN || h == LIKES_COLUMN) {
        Some(table) => {
            info!("📥 Read {} rows from {}", table.len(), name);
            Ok(Some((table, date)))
        }
        None => {
            warn!("Sheet {} has no data rows", name);
            Ok(None)
        }
    }
}

pub fn is_history_numeric(header: &str) -> bool {
    header.starts_with("Visitas_") || header.starts_with("Likes_") || header == "Variacion_Likes"
}

/// History sheet with its counter columns as integers
pub async fn read_history(store: &dyn SheetStore, name: &str) -> Result<Option<SheetTable>> {
    let Some(rows) = store.read_sheet(name).await? else {
        info!("No {} sheet yet", name);
        return Ok(None);
    };
    Ok(SheetTable::from_rows(rows, is_history_numeric))
}

/// List the sheets to prove the store is reachable
pub async fn check_connection(store: &dyn SheetStore) -> Result<Vec<String>> {
    let sheets = store.list_sheets().await?;
    info!("🔌 Connected to {}", store.describe());
    info!("   {} sheets: {}", sheets.len(), sheets.join(", "));
    Ok(sheets)
}
