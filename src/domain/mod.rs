pub mod descriptor;
pub mod item;

pub use descriptor::{
    Acquisition, DetailScrape, ListScrape, RenderConfig, SelectorSet, SourceConfig,
    SourceDescriptor, SourceKind, WaitUntil, DEFAULT_MAX_DETAIL_ITEMS,
};
pub use item::{CandidateItem, CrawlOutcome, StoredItem};
