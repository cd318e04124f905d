//! Load-more driver for seller profile pages.
//!
//! Profiles render a first batch of listings and a "Ver más productos"
//! button. The driver keeps clicking until enough links are visible, the
//! button disappears, or clicks stop producing new cards.

use crate::scrapers::traits::LoadMorePage;
use crate::scrapers::types::PaginationConfig;
use tracing::{debug, info};

/// Consecutive clicks without new listings before giving up
const STALE_CLICK_LIMIT: u8 = 2;

/// Where the driver is on a profile page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Loading,
    ClickAttempted { stale_clicks: u8 },
    Exhausted,
    TargetReached,
}

/// Result of one scroll-and-click attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A control was clicked and `count` links are now visible
    Clicked { count: usize },
    /// No locator strategy found a clickable control
    ControlMissing,
}

impl PaginationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::TargetReached)
    }

    /// Pure transition; terminal states absorb every outcome
    pub fn next(self, outcome: ClickOutcome, previous_count: usize, target: usize) -> Self {
        if self.is_terminal() {
            return self;
        }

        match outcome {
            ClickOutcome::ControlMissing => Self::Exhausted,
            ClickOutcome::Clicked { count } if count >= target => Self::TargetReached,
            ClickOutcome::Clicked { count } if count > previous_count => {
                Self::ClickAttempted { stale_clicks: 0 }
            }
            ClickOutcome::Clicked { .. } => {
                let stale_clicks = match self {
                    Self::ClickAttempted { stale_clicks } => stale_clicks + 1,
                    _ => 1,
                };
                if stale_clicks >= STALE_CLICK_LIMIT {
                    Self::Exhausted
                } else {
                    Self::ClickAttempted { stale_clicks }
                }
            }
        }
    }
}

/// Ways of finding the load-more control, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreLocator {
    /// `walla-button` whose `text` attribute is exactly the label
    ExactAttribute,
    /// `walla-button` whose `text` attribute contains the label
    PartialAttribute,
    /// Nearest clickable ancestor of an element showing the label
    LabelAncestor,
    /// Generic container and class-name guesses
    ClassHeuristic,
}

impl LoadMoreLocator {
    pub const PRIORITY: [LoadMoreLocator; 4] = [
        LoadMoreLocator::ExactAttribute,
        LoadMoreLocator::PartialAttribute,
        LoadMoreLocator::LabelAncestor,
        LoadMoreLocator::ClassHeuristic,
    ];

    /// In-page script that finds the control, clicks it and evaluates to a
    /// boolean. Shadow-root buttons are clicked directly when present.
    pub fn script(&self) -> &'static str {
        match self {
            Self::ExactAttribute => {
                r#"(() => {
                    const el = document.querySelector('walla-button[text="Ver más productos"]');
                    if (!el || el.offsetParent === null) return false;
                    el.scrollIntoView({block: 'center'});
                    const inner = el.shadowRoot && el.shadowRoot.querySelector('button.walla-button__button, button');
                    (inner || el).click();
                    return true;
                })()"#
            }
            Self::PartialAttribute => {
                r#"(() => {
                    const candidates = Array.from(document.querySelectorAll('walla-button[text*="Ver más"], walla-button[text*="ver más"]'));
                    const el = candidates.find(c => c.offsetParent !== null);
                    if (!el) return false;
                    el.scrollIntoView({block: 'center'});
                    const inner = el.shadowRoot && el.shadowRoot.querySelector('button');
                    (inner || el).click();
                    return true;
                })()"#
            }
            Self::LabelAncestor => {
                r#"(() => {
                    const xpath = "//*[contains(normalize-space(text()), 'Ver más')]/ancestor-or-self::*[self::button or self::walla-button][1]";
                    const el = document.evaluate(xpath, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
                    if (!el || el.offsetParent === null) return false;
                    el.scrollIntoView({block: 'center'});
                    el.click();
                    return true;
                })()"#
            }
            Self::ClassHeuristic => {
                r#"(() => {
                    const selectors = [
                        '.d-flex.justify-content-center walla-button',
                        '[class*="load-more"]',
                        '[class*="LoadMore"]',
                        'button[class*="more"]'
                    ];
                    for (const css of selectors) {
                        const el = Array.from(document.querySelectorAll(css)).find(c => c.offsetParent !== null);
                        if (!el) continue;
                        el.scrollIntoView({block: 'center'});
                        const inner = el.shadowRoot && el.shadowRoot.querySelector('button');
                        (inner || el).click();
                        return true;
                    }
                    return false;
                })()"#
            }
        }
    }
}

/// How a profile page ended up after loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub state: PaginationState,
    /// Successful clicks
    pub clicks: usize,
    pub initial_count: usize,
    pub final_count: usize,
    /// The click bound was hit before any other stop condition
    pub budget_spent: bool,
}

/// Try every locator in priority order; lookup errors count as "not found"
pub fn find_and_click_load_more<P: LoadMorePage + ?Sized>(page: &P) -> Option<LoadMoreLocator> {
    for locator in LoadMoreLocator::PRIORITY {
        match page.click_load_more(&locator) {
            Ok(true) => return Some(locator),
            Ok(false) => {}
            Err(e) => debug!("Load-more lookup via {:?} failed: {}", locator, e),
        }
    }
    None
}

/// Click "load more" until the target is visible or the content runs out
pub fn load_all_listings<P: LoadMorePage + ?Sized>(
    page: &P,
    config: &PaginationConfig,
) -> PaginationOutcome {
    let initial_count = page.listing_link_count().unwrap_or_else(|e| {
        debug!("Could not count listings: {}", e);
        0
    });
    info!(
        "[load-more] target {} listings, at most {} clicks, {} visible",
        config.target, config.max_clicks, initial_count
    );

    let mut state = if initial_count >= config.target {
        PaginationState::TargetReached
    } else {
        PaginationState::Loading
    };
    let mut last_count = initial_count;
    let mut clicks = 0;
    let mut attempts = 0;
    let mut budget_spent = false;

    while !state.is_terminal() {
        if attempts >= config.max_clicks {
            budget_spent = true;
            state = PaginationState::Exhausted;
            break;
        }
        attempts += 1;

        if let Err(e) = page.scroll_to_bottom() {
            debug!("Scroll failed: {}", e);
        }
        page.pause(config.scroll_delay);

        let outcome = match find_and_click_load_more(page) {
            Some(locator) => {
                clicks += 1;
                page.pause(config.settle_delay);
                let count = page.listing_link_count().unwrap_or(last_count);
                debug!("Clicked load-more via {:?}, {} links visible", locator, count);
                ClickOutcome::Clicked { count }
            }
            None => ClickOutcome::ControlMissing,
        };

        state = state.next(outcome, last_count, config.target);

        match outcome {
            ClickOutcome::Clicked { count } if count > last_count => {
                info!("[load-more] click {}: {} → {} (+{})", clicks, last_count, count, count - last_count);
                last_count = count;
            }
            ClickOutcome::Clicked { .. } => info!("[load-more] click {}: no new listings", clicks),
            ClickOutcome::ControlMissing => info!("[load-more] control not found, end of content"),
        }
    }

    if budget_spent {
        info!("[load-more] click budget of {} spent", config.max_clicks);
    }
    info!("[load-more] finished {:?} with {} listings after {} clicks", state, last_count, clicks);

    PaginationOutcome {
        state,
        clicks,
        initial_count,
        final_count: last_count,
        budget_spent,
    }
}
