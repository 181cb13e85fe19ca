use serde::Serialize;

use crate::domain::{CrawlOutcome, SourceDescriptor};
use crate::errors::HarvestResult;
use crate::sources::SourceDispatcher;
use crate::storage::traits::ItemRepository;

/// Result of one crawl cycle, as reported to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub source_id: i64,
    /// Entries the source showed, before deduplication.
    pub observed: usize,
    /// New candidates the dispatcher returned.
    pub found: usize,
    /// Candidates the item store accepted.
    pub created: usize,
}

pub struct CrawlService<R: ItemRepository> {
    repository: R,
    dispatcher: SourceDispatcher,
}

impl<R: ItemRepository> CrawlService<R> {
    pub fn new(repository: R, dispatcher: SourceDispatcher) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Crawl a source and store its new items.
    pub fn crawl(&self, descriptor: &SourceDescriptor) -> HarvestResult<CrawlReport> {
        let outcome = self.candidates(descriptor)?;
        let created = self
            .repository
            .insert_candidates(descriptor.feed_id, &outcome.items)?;

        Ok(CrawlReport {
            source_id: descriptor.id,
            observed: outcome.observed,
            found: outcome.items.len(),
            created,
        })
    }

    /// Crawl without storing anything.
    pub fn candidates(&self, descriptor: &SourceDescriptor) -> HarvestResult<CrawlOutcome> {
        let known = self.repository.known_guids(descriptor.feed_id)?;
        self.dispatcher.crawl(descriptor, &known)
    }
}
