use crate::scrapers::pagination::LoadMoreLocator;
use anyhow::Result;
use std::thread;
use std::time::Duration;

/// Controls the load-more driver needs on a profile page.
/// Kept apart from navigation so the driver can run against a simulated page.
pub trait LoadMorePage {
    /// Scroll the viewport to the bottom of the document
    fn scroll_to_bottom(&self) -> Result<()>;

    /// Look up the load-more control with one locator strategy and click it.
    /// `Ok(false)` means the strategy found nothing clickable.
    fn click_load_more(&self, locator: &LoadMoreLocator) -> Result<bool>;

    /// Number of listing links currently rendered
    fn listing_link_count(&self) -> Result<usize>;

    /// Blocking wait used for settle and rate-limit delays
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// A single browser tab driven sequentially by the scraper
pub trait BrowsingContext: LoadMorePage {
    /// Load a URL and wait for navigation to finish
    fn navigate(&self, url: &str) -> Result<()>;

    /// Accept the cookie banner if one shows up; best effort
    fn dismiss_cookie_banner(&self) -> bool;

    /// Outer HTML of the current document
    fn page_html(&self) -> Result<String>;

    /// Name used in logs
    fn source_name(&self) -> &'static str;
}
