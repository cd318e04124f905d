use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use moto_scout::models::{Account, NOT_SPECIFIED, TITLE_NOT_FOUND};
use moto_scout::scrapers::pagination::LoadMoreLocator;
use moto_scout::scrapers::{
    scrape_all, BrowsingContext, Delays, ListingPage, LoadMorePage, ScrapeSettings,
};
use moto_scout::sheets::{self, CsvWorkbook, SCRAPE_COLUMNS};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const PROFILE_URL: &str = "https://es.wallapop.com/user/motick-432763398";
const BROKEN_PROFILE_URL: &str = "https://es.wallapop.com/user/jaimed-432757399";

const PROFILE: &str = r#"<html><body>
    <div class="ItemCardList">
        <a href="/item/kawasaki-z900-1001">Kawasaki</a>
        <a href="/item/yamaha-mt07-1002">Yamaha</a>
        <a href="https://es.wallapop.com/item/sin-datos-1003">Sin datos</a>
        <a href="/item/retirado-1004">Retirado</a>
        <a href="/user/otro-perfil">Otro perfil</a>
    </div>
</body></html>"#;

const COMPLETE: &str = r#"<html>
<head><meta property="og:title" content="Kawasaki Z900 - Wallapop"></head>
<body>
    <h1 class="item-detail_title">Kawasaki Z900 Performance</h1>
    <span class="item-detail-price_ItemDetailPrice--standard__fMa16">7.690 €</span>
    <section class="item-detail_ItemDetailTwoColumns__description__0DKb0">
        <p>Kawasaki Z900 en perfecto estado</p>
        <p>- Año: 2020</p>
        <p>- Kilómetros: 15.300</p>
    </section>
    <span aria-label="Views">1.2k</span>
    <button aria-label="favorite"><span>14</span></button>
</body>
</html>"#;

const MISSING_PRICE: &str = r#"<html><body>
    <h1>Yamaha MT-07 ABS</h1>
    <section class="item-detail_ItemDetailTwoColumns__description__0DKb0">
        <p>Modelo 2019, revisiones al día</p>
        <p>KM: 8000</p>
    </section>
    <span aria-label="Views">35</span>
</body></html>"#;

const MISSING_EVERYTHING: &str = r#"<html><body><div>Anuncio no disponible</div></body></html>"#;

/// Simulated marketplace: fixed pages per URL, navigation fails elsewhere
struct FakeMarketplace {
    pages: HashMap<&'static str, &'static str>,
    current: RefCell<Option<String>>,
    visited: RefCell<Vec<String>>,
}

impl FakeMarketplace {
    fn new() -> Self {
        let pages = HashMap::from([
            (PROFILE_URL, PROFILE),
            ("https://es.wallapop.com/item/kawasaki-z900-1001", COMPLETE),
            ("https://es.wallapop.com/item/yamaha-mt07-1002", MISSING_PRICE),
            ("https://es.wallapop.com/item/sin-datos-1003", MISSING_EVERYTHING),
        ]);
        Self {
            pages,
            current: RefCell::new(None),
            visited: RefCell::new(Vec::new()),
        }
    }
}

impl LoadMorePage for FakeMarketplace {
    fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }

    fn click_load_more(&self, _locator: &LoadMoreLocator) -> Result<bool> {
        Ok(false)
    }

    fn listing_link_count(&self) -> Result<usize> {
        Ok(ListingPage::parse(PROFILE_URL, self.page_html()?).listing_links().len())
    }

    fn pause(&self, _duration: Duration) {}
}

impl BrowsingContext for FakeMarketplace {
    fn navigate(&self, url: &str) -> Result<()> {
        self.visited.borrow_mut().push(url.to_string());
        if !self.pages.contains_key(url) {
            return Err(anyhow!("HTTP 404 for {}", url));
        }
        *self.current.borrow_mut() = Some(url.to_string());
        Ok(())
    }

    fn dismiss_cookie_banner(&self) -> bool {
        true
    }

    fn page_html(&self) -> Result<String> {
        let current = self.current.borrow();
        let url = current.as_deref().ok_or_else(|| anyhow!("nothing loaded"))?;
        Ok(self.pages[url].to_string())
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

fn quiet_settings() -> ScrapeSettings {
    let mut settings = ScrapeSettings::default();
    settings.delays = Delays::none();
    settings
}

fn row_for<'a>(rows: &'a [Vec<String>], url_suffix: &str) -> &'a Vec<String> {
    rows.iter().find(|row| row[7].ends_with(url_suffix)).unwrap()
}

#[test]
fn test_three_pages_give_three_rows_with_sentinels() {
    let site = FakeMarketplace::new();
    let accounts = vec![Account::new("MOTICK.MA M.", PROFILE_URL)];

    let run = scrape_all(&site, &accounts, &quiet_settings());

    let account = &run.accounts[0];
    assert_eq!(account.links_found, 4);
    assert_eq!(account.failed, 1, "the withdrawn listing should count as failed");
    assert!(account.aborted.is_none());

    let listings = run.into_listings();
    assert_eq!(listings.len(), 3);

    let fingerprints: HashSet<_> = listings.iter().map(|l| l.fingerprint.clone()).collect();
    assert_eq!(fingerprints.len(), 3);
    assert!(fingerprints.iter().all(|f| f.len() == 12));

    let rows = sheets::scrape_rows(&listings);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], SCRAPE_COLUMNS.map(String::from).to_vec());
    // most liked first
    assert!(rows[1][7].ends_with("kawasaki-z900-1001"));

    let complete = row_for(&rows, "kawasaki-z900-1001");
    assert_eq!(complete[1], "Kawasaki Z900 Performance");
    assert_eq!(complete[2], "7.690 €");
    assert_eq!(complete[3], "2020");
    assert_eq!(complete[4], "15.300 km");
    assert_eq!(complete[5], "1200");
    assert_eq!(complete[6], "14");

    let no_price = row_for(&rows, "yamaha-mt07-1002");
    assert_eq!(no_price[1], "Yamaha MT-07 ABS");
    assert_eq!(no_price[2], NOT_SPECIFIED);
    assert_eq!(no_price[3], "2019");
    assert_eq!(no_price[4], "8.000 km");

    let empty = row_for(&rows, "sin-datos-1003");
    assert_eq!(empty[1], TITLE_NOT_FOUND);
    assert_eq!(empty[2], NOT_SPECIFIED);
    assert_eq!(empty[3], NOT_SPECIFIED);
    assert_eq!(empty[4], NOT_SPECIFIED);
    assert_eq!(empty[5], "0");
    assert_eq!(empty[6], "0");
}

#[test]
fn test_broken_profile_does_not_stop_the_run() {
    let site = FakeMarketplace::new();
    let accounts = vec![
        Account::new("MOTICK.SE S.", BROKEN_PROFILE_URL),
        Account::new("MOTICK.MA M.", PROFILE_URL),
    ];

    let run = scrape_all(&site, &accounts, &quiet_settings());

    assert_eq!(run.aborted_accounts(), 1);
    assert!(run.accounts[0].listings.is_empty());
    assert_eq!(run.accounts[1].listings.len(), 3);
    assert_eq!(site.visited.borrow()[1], PROFILE_URL);
}

#[tokio::test]
async fn test_scrape_upload_and_read_back() {
    let site = FakeMarketplace::new();
    let accounts = vec![Account::new("MOTICK.MA M.", PROFILE_URL)];
    let listings = scrape_all(&site, &accounts, &quiet_settings()).into_listings();

    let dir = tempfile::TempDir::new().unwrap();
    let store = CsvWorkbook::new(dir.path());
    let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();

    let name = sheets::upload(&store, &listings, date).await.unwrap();
    assert_eq!(name, "Datos_17_05_2024");

    let (table, read_date) = sheets::read_latest(&store).await.unwrap().unwrap();
    assert_eq!(read_date, date);
    assert_eq!(table.len(), 3);
    assert_eq!(table.int(0, "Visitas"), 1200);
    assert_eq!(table.text(0, "ID_Unico_Real"), Some(listings[0].fingerprint.clone()));
}
