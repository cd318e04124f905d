pub mod account;
pub mod browser;
pub mod extractors;
pub mod page;
pub mod pagination;
pub mod traits;
pub mod types;

pub use account::{scrape_all, AccountReport, RunReport};
pub use browser::ChromeSession;
pub use page::ListingPage;
pub use pagination::{load_all_listings, PaginationOutcome, PaginationState};
pub use traits::{BrowsingContext, LoadMorePage};
pub use types::{Delays, ExtractionLimits, PaginationConfig, ScrapeSettings};
