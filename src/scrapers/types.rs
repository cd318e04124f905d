use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Plausibility bounds applied to extracted values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionLimits {
    /// Accepted asking price in euros
    pub price: RangeInclusive<u32>,
    /// Accepted model year
    pub year: RangeInclusive<u16>,
    /// Highest accepted odometer reading in km
    pub max_mileage: u32,
    /// Highest believable view count
    pub max_views: u32,
    /// Highest believable like count
    pub max_likes: u32,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            price: 500..=80_000,
            year: 1990..=2025,
            max_mileage: 999_999,
            max_views: 500_000,
            max_likes: 1_000,
        }
    }
}

/// Load-more behaviour on a profile page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Stop once this many listing links are visible
    pub target: usize,
    /// Hard bound on click attempts
    pub max_clicks: usize,
    /// Wait after scrolling to the bottom
    pub scroll_delay: Duration,
    /// Wait after a click for new cards to render
    pub settle_delay: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            target: 300,
            max_clicks: 15,
            scroll_delay: Duration::from_millis(700),
            settle_delay: Duration::from_millis(2500),
        }
    }
}

/// Uniformly random wait between two bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Pauses inserted between requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delays {
    pub between_listings: DelayRange,
    pub after_load: Duration,
    pub between_accounts: DelayRange,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            between_listings: DelayRange::new(Duration::from_millis(1500), Duration::from_millis(3000)),
            after_load: Duration::from_millis(1200),
            between_accounts: DelayRange::new(Duration::from_secs(3), Duration::from_secs(7)),
        }
    }
}

impl Delays {
    /// No waiting at all, for fixtures and tests
    pub fn none() -> Self {
        Self {
            between_listings: DelayRange::none(),
            after_load: Duration::ZERO,
            between_accounts: DelayRange::none(),
        }
    }
}

/// Everything a scrape run needs besides the accounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeSettings {
    pub limits: ExtractionLimits,
    pub pagination: PaginationConfig,
    pub delays: Delays,
}
