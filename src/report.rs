//! Extraction quality aggregation and alerting.

use crate::models::Listing;
use crate::scrapers::account::{AccountReport, RunReport};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// How often a field was found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldQuality {
    pub found: usize,
    pub total: usize,
}

impl FieldQuality {
    fn record(&mut self, found: bool) {
        self.total += 1;
        if found {
            self.found += 1;
        }
    }

    /// Share of listings with the field, 0.0 when nothing was recorded
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.found as f64 / self.total as f64
        }
    }
}

impl fmt::Display for FieldQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.found, self.total, self.ratio() * 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityStats {
    pub listings: usize,
    pub title: FieldQuality,
    pub price: FieldQuality,
    pub year: FieldQuality,
    pub mileage: FieldQuality,
    pub views_total: u64,
    pub likes_total: u64,
}

impl QualityStats {
    pub fn from_listings<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Self {
        let mut stats = Self::default();
        for listing in listings {
            stats.record(listing);
        }
        stats
    }

    pub fn record(&mut self, listing: &Listing) {
        self.listings += 1;
        self.title.record(listing.title.is_some());
        self.price.record(listing.price.is_some());
        self.year.record(listing.year.is_some());
        self.mileage.record(listing.mileage.is_some());
        self.views_total += u64::from(listing.views);
        self.likes_total += u64::from(listing.likes);
    }

    pub fn mean_views(&self) -> f64 {
        mean(self.views_total, self.listings)
    }

    pub fn mean_likes(&self) -> f64 {
        mean(self.likes_total, self.listings)
    }
}

fn mean(total: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

pub const TITLE_THRESHOLD: f64 = 0.80;
pub const PRICE_THRESHOLD: f64 = 0.70;
pub const MILEAGE_THRESHOLD: f64 = 0.60;

/// A field whose extraction rate fell under its threshold
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAlert {
    pub scope: String,
    pub field: &'static str,
    pub ratio: f64,
    pub threshold: f64,
}

impl fmt::Display for QualityAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} found in {:.1}% of listings (expected at least {:.0}%)",
            self.scope,
            self.field,
            self.ratio * 100.0,
            self.threshold * 100.0
        )
    }
}

fn check(scope: &str, checks: &[(&'static str, FieldQuality, f64)]) -> Vec<QualityAlert> {
    checks
        .iter()
        .filter(|(_, quality, threshold)| quality.total > 0 && quality.ratio() < *threshold)
        .map(|(field, quality, threshold)| QualityAlert {
            scope: scope.to_string(),
            field: *field,
            ratio: quality.ratio(),
            threshold: *threshold,
        })
        .collect()
}

pub fn account_alerts(account: &str, stats: &QualityStats) -> Vec<QualityAlert> {
    check(
        account,
        &[
            ("price", stats.price, PRICE_THRESHOLD),
            ("mileage", stats.mileage, MILEAGE_THRESHOLD),
        ],
    )
}

pub fn run_alerts(stats: &QualityStats) -> Vec<QualityAlert> {
    check(
        "run",
        &[
            ("title", stats.title, TITLE_THRESHOLD),
            ("price", stats.price, PRICE_THRESHOLD),
            ("mileage", stats.mileage, MILEAGE_THRESHOLD),
        ],
    )
}

pub fn log_account_summary(report: &AccountReport) {
    if let Some(reason) = &report.aborted {
        warn!("⚠️  {} skipped: {}", report.account, reason);
        return;
    }

    let stats = report.quality();
    info!(
        "✅ {}: {} listings, {} failed, {} duplicates (price {}, mileage {})",
        report.account,
        report.listings.len(),
        report.failed,
        report.duplicates,
        stats.price,
        stats.mileage
    );
    for alert in account_alerts(&report.account, &stats) {
        warn!("⚠️  {}", alert);
    }
}

pub fn log_run_summary(report: &RunReport) {
    let stats = report.quality();

    info!("==========================================");
    info!("📊 Run summary");
    info!(
        "   Accounts: {} processed, {} skipped",
        report.accounts.len() - report.aborted_accounts(),
        report.aborted_accounts()
    );
    info!("   Listings: {} extracted, {} failed", stats.listings, report.total_failed());
    info!("   Title:    {}", stats.title);
    info!("   Price:    {}", stats.price);
    info!("   Year:     {}", stats.year);
    info!("   Mileage:  {}", stats.mileage);
    info!(
        "   Views:    {} total, {:.1} mean",
        stats.views_total,
        stats.mean_views()
    );
    info!(
        "   Likes:    {} total, {:.1} mean",
        stats.likes_total,
        stats.mean_likes()
    );

    for alert in run_alerts(&stats) {
        warn!("⚠️  {}", alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mileage, Price};
    use chrono::Local;

    fn listing(price: Option<u32>, mileage: Option<u32>, views: u32) -> Listing {
        Listing {
            fingerprint: String::new(),
            account: "MOTICK.MA M.".to_string(),
            title: Some("Honda CB500F".to_string()),
            price: price.map(Price),
            year: None,
            mileage: mileage.map(Mileage),
            views,
            likes: 2,
            url: "https://es.wallapop.com/item/x".to_string(),
            extracted_at: Local::now(),
        }
    }

    #[test]
    fn test_stats_counts() {
        let listings = vec![
            listing(Some(5000), Some(0), 10),
            listing(None, Some(12000), 30),
            listing(Some(7000), None, 20),
            listing(Some(3000), None, 0),
        ];
        let stats = QualityStats::from_listings(&listings);
        assert_eq!(stats.listings, 4);
        assert_eq!(stats.price, FieldQuality { found: 3, total: 4 });
        assert_eq!(stats.mileage, FieldQuality { found: 2, total: 4 });
        assert_eq!(stats.year.found, 0);
        assert_eq!(stats.views_total, 60);
        assert!((stats.mean_views() - 15.0).abs() < f64::EPSILON);
        assert_eq!(stats.price.to_string(), "3/4 (75.0%)");
    }

    #[test]
    fn test_alert_thresholds() {
        let listings = vec![
            listing(Some(5000), Some(0), 0),
            listing(None, None, 0),
            listing(Some(7000), None, 0),
        ];
        let stats = QualityStats::from_listings(&listings);

        // price 66.7% and mileage 33.3% are both under their thresholds
        let alerts = account_alerts("MOTICK.MA M.", &stats);
        let fields: Vec<_> = alerts.iter().map(|a| a.field).collect();
        assert_eq!(fields, vec!["price", "mileage"]);

        // title is complete, so the run only flags price and mileage
        let fields: Vec<_> = run_alerts(&stats).iter().map(|a| a.field).collect();
        assert_eq!(fields, vec!["price", "mileage"]);
    }

    #[test]
    fn test_no_alerts_without_data() {
        let stats = QualityStats::default();
        assert!(run_alerts(&stats).is_empty());
        assert_eq!(stats.mean_likes(), 0.0);
    }
}
