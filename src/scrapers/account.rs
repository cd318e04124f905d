use crate::models::{Account, Listing};
use crate::report::{self, QualityStats};
use crate::scrapers::extractors::extract_listing;
use crate::scrapers::page::ListingPage;
use crate::scrapers::pagination::{load_all_listings, PaginationOutcome};
use crate::scrapers::traits::BrowsingContext;
use crate::scrapers::types::ScrapeSettings;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Listings between intermediate quality lines
const PROGRESS_EVERY: usize = 50;

/// What happened on one seller profile
#[derive(Debug, Clone)]
pub struct AccountReport {
    pub account: String,
    pub listings: Vec<Listing>,
    pub links_found: usize,
    /// Listing pages that could not be loaded or read
    pub failed: usize,
    /// Listings already collected earlier in the run
    pub duplicates: usize,
    pub pagination: Option<PaginationOutcome>,
    /// Set when the profile itself could not be processed
    pub aborted: Option<String>,
}

impl AccountReport {
    fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            listings: Vec::new(),
            links_found: 0,
            failed: 0,
            duplicates: 0,
            pagination: None,
            aborted: None,
        }
    }

    pub fn quality(&self) -> QualityStats {
        QualityStats::from_listings(&self.listings)
    }
}

/// Result of a full run over all accounts
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub accounts: Vec<AccountReport>,
}

impl RunReport {
    /// All listings in scrape order, unique by fingerprint
    pub fn listings(&self) -> impl Iterator<Item = &Listing> {
        self.accounts.iter().flat_map(|a| a.listings.iter())
    }

    pub fn into_listings(self) -> Vec<Listing> {
        self.accounts.into_iter().flat_map(|a| a.listings).collect()
    }

    pub fn total_listings(&self) -> usize {
        self.accounts.iter().map(|a| a.listings.len()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.accounts.iter().map(|a| a.failed).sum()
    }

    pub fn aborted_accounts(&self) -> usize {
        self.accounts.iter().filter(|a| a.aborted.is_some()).count()
    }

    pub fn quality(&self) -> QualityStats {
        QualityStats::from_listings(self.listings())
    }
}

/// Scrape every account in order, one tab, no parallelism
pub fn scrape_all<B: BrowsingContext + ?Sized>(
    browser: &B,
    accounts: &[Account],
    settings: &ScrapeSettings,
) -> RunReport {
    let mut report = RunReport::default();
    let mut seen = HashSet::new();
    info!("Scraping {} accounts with {}", accounts.len(), browser.source_name());

    for (i, account) in accounts.iter().enumerate() {
        if i > 0 {
            browser.pause(settings.delays.between_accounts.sample());
        }
        info!("👤 [{}/{}] {}", i + 1, accounts.len(), account.name);

        let account_report = scrape_account(browser, account, settings, &mut seen);
        report::log_account_summary(&account_report);
        report.accounts.push(account_report);
    }

    report
}

/// Scrape one profile. `seen` holds fingerprints collected so far in the run.
pub fn scrape_account<B: BrowsingContext + ?Sized>(
    browser: &B,
    account: &Account,
    settings: &ScrapeSettings,
    seen: &mut HashSet<String>,
) -> AccountReport {
    let mut report = AccountReport::new(&account.name);

    let links = match collect_listing_links(browser, account, settings) {
        Ok((links, pagination)) => {
            report.pagination = Some(pagination);
            links
        }
        Err(e) => {
            error!("❌ {}: {:#}", account.name, e);
            report.aborted = Some(format!("{:#}", e));
            return report;
        }
    };
    report.links_found = links.len();
    info!("🔗 {}: {} listing links", account.name, links.len());

    let bar = progress_bar(links.len() as u64, &account.name);

    for (i, link) in links.iter().enumerate() {
        browser.pause(settings.delays.between_listings.sample());

        match scrape_listing(browser, link, &account.name, settings) {
            Ok(listing) => {
                if seen.insert(listing.fingerprint.clone()) {
                    report.listings.push(listing);
                } else {
                    debug!("Duplicate listing {} ({})", listing.fingerprint, link);
                    report.duplicates += 1;
                }
            }
            Err(e) => {
                warn!("Listing {} failed: {:#}", link, e);
                report.failed += 1;
            }
        }

        bar.inc(1);
        if (i + 1) % PROGRESS_EVERY == 0 {
            let stats = report.quality();
            info!(
                "📈 {}: {}/{} processed, price {}, mileage {}",
                account.name,
                i + 1,
                links.len(),
                stats.price,
                stats.mileage
            );
        }
    }

    bar.finish_and_clear();
    report
}

fn collect_listing_links<B: BrowsingContext + ?Sized>(
    browser: &B,
    account: &Account,
    settings: &ScrapeSettings,
) -> Result<(Vec<String>, PaginationOutcome)> {
    browser.navigate(&account.profile_url)?;
    browser.pause(settings.delays.after_load);
    browser.dismiss_cookie_banner();

    let pagination = load_all_listings(browser, &settings.pagination);

    let profile = ListingPage::parse(account.profile_url.as_str(), browser.page_html()?);
    Ok((profile.listing_links(), pagination))
}

fn scrape_listing<B: BrowsingContext + ?Sized>(
    browser: &B,
    url: &str,
    account: &str,
    settings: &ScrapeSettings,
) -> Result<Listing> {
    browser.navigate(url)?;
    browser.pause(settings.delays.after_load);
    let page = ListingPage::parse(url, browser.page_html()?);
    Ok(extract_listing(&page, account, &settings.limits))
}

fn progress_bar(len: u64, account: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(account.to_string());
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::pagination::{LoadMoreLocator, PaginationState};
    use crate::scrapers::traits::LoadMorePage;
    use crate::scrapers::types::Delays;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned HTML per URL; unknown URLs fail to load
    struct CannedSite {
        pages: HashMap<String, String>,
        current: RefCell<Option<String>>,
    }

    impl CannedSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                current: RefCell::new(None),
            }
        }
    }

    impl LoadMorePage for CannedSite {
        fn scroll_to_bottom(&self) -> Result<()> {
            Ok(())
        }

        fn click_load_more(&self, _locator: &LoadMoreLocator) -> Result<bool> {
            Ok(false)
        }

        fn listing_link_count(&self) -> Result<usize> {
            let html = self.page_html()?;
            Ok(ListingPage::parse("https://es.wallapop.com/", html).listing_links().len())
        }
    }

    impl BrowsingContext for CannedSite {
        fn navigate(&self, url: &str) -> Result<()> {
            if !self.pages.contains_key(url) {
                return Err(anyhow!("net::ERR_CONNECTION_RESET at {}", url));
            }
            *self.current.borrow_mut() = Some(url.to_string());
            Ok(())
        }

        fn dismiss_cookie_banner(&self) -> bool {
            false
        }

        fn page_html(&self) -> Result<String> {
            let current = self.current.borrow();
            let url = current.as_ref().ok_or_else(|| anyhow!("no page loaded"))?;
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("no page at {}", url))
        }

        fn source_name(&self) -> &'static str {
            "canned"
        }
    }

    fn settings() -> ScrapeSettings {
        let mut settings = ScrapeSettings::default();
        settings.delays = Delays::none();
        settings.pagination.scroll_delay = std::time::Duration::ZERO;
        settings.pagination.settle_delay = std::time::Duration::ZERO;
        settings
    }

    const PROFILE: &str = r#"<html><body>
        <a href="/item/honda-cb500f-1">Honda</a>
        <a href="/item/yamaha-mt07-2">Yamaha</a>
        <a href="/item/honda-cb500f-1">Honda again</a>
    </body></html>"#;

    const HONDA: &str = r#"<html><body><h1>Honda CB500F ABS</h1>
        <span class="item-detail-price_ItemDetailPrice--standard__fMa16">4.990 €</span>
    </body></html>"#;

    #[test]
    fn test_failed_listing_is_counted() {
        let site = CannedSite::new(&[
            ("https://es.wallapop.com/user/motick-1", PROFILE),
            ("https://es.wallapop.com/item/honda-cb500f-1", HONDA),
        ]);
        let account = Account::new("MOTICK.MA M.", "https://es.wallapop.com/user/motick-1");
        let mut seen = HashSet::new();

        let report = scrape_account(&site, &account, &settings(), &mut seen);

        assert!(report.aborted.is_none());
        assert_eq!(report.links_found, 2);
        assert_eq!(report.listings.len(), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.pagination.map(|p| p.state),
            Some(PaginationState::Exhausted)
        );
    }

    #[test]
    fn test_unreachable_profile_aborts_only_that_account() {
        let site = CannedSite::new(&[
            ("https://es.wallapop.com/user/motick-1", PROFILE),
            ("https://es.wallapop.com/item/honda-cb500f-1", HONDA),
            ("https://es.wallapop.com/item/yamaha-mt07-2", HONDA),
        ]);
        let accounts = vec![
            Account::new("MOTICK.SE S.", "https://es.wallapop.com/user/missing-9"),
            Account::new("MOTICK.MA M.", "https://es.wallapop.com/user/motick-1"),
        ];

        let report = scrape_all(&site, &accounts, &settings());

        assert_eq!(report.accounts.len(), 2);
        assert_eq!(report.aborted_accounts(), 1);
        assert!(report.accounts[0]
            .aborted
            .as_deref()
            .is_some_and(|reason| reason.contains("ERR_CONNECTION_RESET")));
        assert_eq!(report.accounts[1].listings.len(), 2);
    }

    #[test]
    fn test_duplicates_across_accounts_are_dropped() {
        let site = CannedSite::new(&[
            ("https://es.wallapop.com/user/motick-1", PROFILE),
            ("https://es.wallapop.com/user/motick-2", PROFILE),
            ("https://es.wallapop.com/item/honda-cb500f-1", HONDA),
            ("https://es.wallapop.com/item/yamaha-mt07-2", HONDA),
        ]);
        // same account name so the fingerprints collide
        let accounts = vec![
            Account::new("MOTICK.MA M.", "https://es.wallapop.com/user/motick-1"),
            Account::new("MOTICK.MA M.", "https://es.wallapop.com/user/motick-2"),
        ];

        let report = scrape_all(&site, &accounts, &settings());

        assert_eq!(report.total_listings(), 2);
        assert_eq!(report.accounts[1].duplicates, 2);
    }
}
