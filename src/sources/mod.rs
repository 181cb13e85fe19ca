//! Acquisition strategies and the dispatcher that picks between them.

pub mod dedup;
pub mod detail_scrape;
pub mod dispatcher;
pub mod list_scrape;
pub mod syndication;

pub use dedup::Deduplicator;
pub use detail_scrape::DetailScrapeSource;
pub use dispatcher::SourceDispatcher;
pub use list_scrape::{ListScrapeSource, MAX_LIST_ITEMS};
pub use syndication::SyndicationSource;
