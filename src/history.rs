//! Merge of the latest scrape sheet into the long-running history sheet.
//!
//! Each fingerprint gets one history row. Every merge adds a
//! `Visitas_DD_MM_YYYY` / `Likes_DD_MM_YYYY` column pair and classifies rows
//! as new, still active, or sold (gone from the latest scrape).

use crate::fingerprint::fingerprint_record;
use crate::sheets::{
    self, Cell, SheetStore, SheetTable, FINGERPRINT_COLUMN, HISTORY_SHEET, LIKES_COLUMN,
    SHEET_DATE_FORMAT, VIEWS_COLUMN,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::info;

pub const STATUS_NEW: &str = "Nueva";
pub const STATUS_ACTIVE: &str = "Activa";
pub const STATUS_SOLD: &str = "Vendida";

const VISITS_PREFIX: &str = "Visitas_";
const LIKES_PREFIX: &str = "Likes_";
const DETECTION_DATE_FORMAT: &str = "%d/%m/%Y";

const FIRST_SEEN: &str = "Primera_Deteccion";
const LAST_SEEN: &str = "Ultima_Deteccion";
const STATUS: &str = "Estado";
const LIKES_CHANGE: &str = "Variacion_Likes";

/// Columns copied from the latest scrape on every merge
const LISTING_COLUMNS: [&str; 6] = ["Cuenta", "Titulo", "Precio", "Ano", "Kilometraje", "URL"];

pub const STATIC_COLUMNS: [&str; 11] = [
    FINGERPRINT_COLUMN,
    "Cuenta",
    "Titulo",
    "Precio",
    "Ano",
    "Kilometraje",
    "URL",
    FIRST_SEEN,
    LAST_SEEN,
    STATUS,
    LIKES_CHANGE,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub new: usize,
    pub active: usize,
    pub sold: usize,
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} new, {} active, {} sold", self.new, self.active, self.sold)
    }
}

type Row = HashMap<String, Cell>;

fn visits_column(date: NaiveDate) -> String {
    format!("{}{}", VISITS_PREFIX, date.format(SHEET_DATE_FORMAT))
}

fn likes_column(date: NaiveDate) -> String {
    format!("{}{}", LIKES_PREFIX, date.format(SHEET_DATE_FORMAT))
}

fn column_date(header: &str) -> Option<NaiveDate> {
    let raw = header
        .strip_prefix(VISITS_PREFIX)
        .or_else(|| header.strip_prefix(LIKES_PREFIX))?;
    NaiveDate::parse_from_str(raw, SHEET_DATE_FORMAT).ok()
}

fn is_numeric_column(header: &str) -> bool {
    header == LIKES_CHANGE || column_date(header).is_some()
}

fn table_rows(table: &SheetTable) -> impl Iterator<Item = Row> + '_ {
    table.rows.iter().map(|cells| {
        table
            .headers
            .iter()
            .cloned()
            .zip(cells.iter().cloned())
            .collect()
    })
}

fn row_text(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .map(|cell| cell.to_string())
        .filter(|text| !text.trim().is_empty())
}

fn row_int(row: &Row, column: &str) -> i64 {
    row.get(column).map_or(0, Cell::as_int)
}

/// Merge `latest` (scraped on `run_date`) into `previous`
pub fn merge_history(
    previous: Option<&SheetTable>,
    latest: &SheetTable,
    run_date: NaiveDate,
) -> (SheetTable, MergeSummary) {
    let mut dates: BTreeSet<NaiveDate> = previous
        .map(|table| table.headers.iter().filter_map(|h| column_date(h)).collect())
        .unwrap_or_default();
    let earlier = dates.range(..run_date).next_back().copied();
    dates.insert(run_date);

    let mut rows: Vec<Row> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    if let Some(previous) = previous {
        for row in table_rows(previous) {
            let Some(key) = row_text(&row, FINGERPRINT_COLUMN) else { continue };
            if !index.contains_key(&key) {
                index.insert(key, rows.len());
                rows.push(row);
            }
        }
    }

    let today = run_date.format(DETECTION_DATE_FORMAT).to_string();
    let visits_now = visits_column(run_date);
    let likes_now = likes_column(run_date);
    let mut seen_now: BTreeSet<usize> = BTreeSet::new();
    let mut summary = MergeSummary::default();

    for scraped in table_rows(latest) {
        let key = row_text(&scraped, FINGERPRINT_COLUMN).unwrap_or_else(|| {
            fingerprint_record(|column| scraped.get(column).map(|cell| cell.to_string()))
        });
        let likes = row_int(&scraped, LIKES_COLUMN);
        let views = row_int(&scraped, VIEWS_COLUMN);

        let position = match index.get(&key) {
            Some(&position) => {
                if !seen_now.insert(position) {
                    continue;
                }
                let row = &mut rows[position];
                let likes_before = earlier.map(|date| row_int(row, &likes_column(date)));
                row.insert(STATUS.to_string(), STATUS_ACTIVE.into());
                row.insert(
                    LIKES_CHANGE.to_string(),
                    Cell::Int(likes_before.map_or(0, |before| likes - before)),
                );
                summary.active += 1;
                position
            }
            None => {
                let mut row = Row::new();
                row.insert(FINGERPRINT_COLUMN.to_string(), key.clone().into());
                row.insert(FIRST_SEEN.to_string(), today.clone().into());
                row.insert(STATUS.to_string(), STATUS_NEW.into());
                row.insert(LIKES_CHANGE.to_string(), Cell::Int(0));
                index.insert(key, rows.len());
                seen_now.insert(rows.len());
                rows.push(row);
                summary.new += 1;
                rows.len() - 1
            }
        };

        let row = &mut rows[position];
        for column in LISTING_COLUMNS {
            let value = row_text(&scraped, column).unwrap_or_default();
            row.insert(column.to_string(), value.into());
        }
        row.insert(LAST_SEEN.to_string(), today.clone().into());
        row.insert(visits_now.clone(), Cell::Int(views));
        row.insert(likes_now.clone(), Cell::Int(likes));
    }

    for (position, row) in rows.iter_mut().enumerate() {
        if seen_now.contains(&position) {
            continue;
        }
        row.insert(STATUS.to_string(), STATUS_SOLD.into());
        row.insert(LIKES_CHANGE.to_string(), Cell::Int(0));
        row.insert(visits_now.clone(), Cell::Int(0));
        row.insert(likes_now.clone(), Cell::Int(0));
        summary.sold += 1;
    }

    let headers: Vec<String> = STATIC_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(dates.iter().flat_map(|&date| [visits_column(date), likes_column(date)]))
        .collect();

    let body = rows
        .into_iter()
        .map(|mut row| {
            headers
                .iter()
                .map(|header| {
                    row.remove(header).unwrap_or_else(|| {
                        if is_numeric_column(header) {
                            Cell::Int(0)
                        } else {
                            Cell::Text(String::new())
                        }
                    })
                })
                .collect()
        })
        .collect();

    (SheetTable { headers, rows: body }, summary)
}

/// Fold the newest scrape sheet into the history sheet and write it back
pub async fn update_history(store: &dyn SheetStore) -> Result<MergeSummary> {
    let (latest, date) = sheets::read_latest(store)
        .await?
        .context("No scrape sheet with data to merge")?;
    let previous = sheets::read_history(store, HISTORY_SHEET).await?;

    match &previous {
        Some(table) => info!("📚 {} has {} rows", HISTORY_SHEET, table.len()),
        None => info!("📚 Starting {} from scratch", HISTORY_SHEET),
    }

    let (merged, summary) = merge_history(previous.as_ref(), &latest, date);
    store
        .write_sheet(HISTORY_SHEET, &merged.to_rows())
        .await
        .with_context(|| format!("Failed to write {}", HISTORY_SHEET))?;

    info!("✅ {} updated: {}", HISTORY_SHEET, summary);
    Ok(summary)
}
