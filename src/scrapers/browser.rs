use crate::scrapers::pagination::LoadMoreLocator;
use crate::scrapers::traits::{BrowsingContext, LoadMorePage};
use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const COOKIE_BUTTON: &str = "#onetrust-accept-btn-handler";
const COOKIE_WAIT: Duration = Duration::from_secs(3);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

const HIDE_WEBDRIVER: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
"#;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight); true";
const COUNT_LISTING_LINKS: &str = r#"document.querySelectorAll('a[href*="/item/"]').length"#;
const OUTER_HTML: &str = "document.documentElement.outerHTML";

/// Headless Chrome tab used for the whole run
pub struct ChromeSession {
    // Dropping the browser closes the tab
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch Chrome with automation fingerprints toned down
    pub fn launch(headless: bool) -> Result<Self> {
        info!("Launching {} Chrome...", if headless { "headless" } else { "visible" });

        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--disable-extensions"),
            OsStr::new("--disable-popup-blocking"),
            OsStr::new("--mute-audio"),
            OsStr::new("--lang=es-ES"),
        ];

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(120))
            .args(args)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);
        tab.set_user_agent(USER_AGENT, Some("es-ES,es;q=0.9"), None)
            .context("Failed to set user agent")?;

        Ok(Self { _browser: browser, tab })
    }

    fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.tab.evaluate(script, false)?;
        result.value.ok_or_else(|| anyhow!("Script returned no value"))
    }
}

impl LoadMorePage for ChromeSession {
    fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate(SCROLL_TO_BOTTOM)?;
        Ok(())
    }

    fn click_load_more(&self, locator: &LoadMoreLocator) -> Result<bool> {
        let clicked = self.evaluate(locator.script())?;
        Ok(clicked.as_bool().unwrap_or(false))
    }

    fn listing_link_count(&self) -> Result<usize> {
        let count = self.evaluate(COUNT_LISTING_LINKS)?;
        count
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| anyhow!("Unexpected link count: {}", count))
    }
}

impl BrowsingContext for ChromeSession {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .with_context(|| format!("Failed to load {}", url))?;

        if let Err(e) = self.tab.evaluate(HIDE_WEBDRIVER, false) {
            debug!("Could not hide webdriver flag: {}", e);
        }
        Ok(())
    }

    fn dismiss_cookie_banner(&self) -> bool {
        match self.tab.wait_for_element_with_custom_timeout(COOKIE_BUTTON, COOKIE_WAIT) {
            Ok(button) => match button.click() {
                Ok(_) => {
                    debug!("Cookie banner accepted");
                    true
                }
                Err(e) => {
                    debug!("Cookie button click failed: {}", e);
                    false
                }
            },
            Err(_) => {
                debug!("No cookie banner shown");
                false
            }
        }
    }

    fn page_html(&self) -> Result<String> {
        let html = self.evaluate(OUTER_HTML).context("Failed to read page HTML")?;
        match html.as_str() {
            Some(html) if !html.is_empty() => Ok(html.to_string()),
            _ => Err(anyhow!("Page HTML is empty")),
        }
    }

    fn source_name(&self) -> &'static str {
        "chrome"
    }
}
