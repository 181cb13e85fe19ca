pub mod crawl_service;
pub mod listing_service;

pub use crawl_service::{CrawlReport, CrawlService};
pub use listing_service::{ListingService, MAX_PAGE_SIZE};
