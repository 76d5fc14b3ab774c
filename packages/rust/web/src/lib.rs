//! Web-backed search and scrape capabilities.
//!
//! [`WebSearcher`] queries the DuckDuckGo HTML endpoint and [`PageScraper`]
//! fetches a page and turns it into Markdown evidence. Both implement the
//! ports defined in `reviewgen-core`.

mod client;
mod scrape;
mod search;

pub use scrape::PageScraper;
pub use search::WebSearcher;
