use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{Acquisition, CrawlOutcome, SourceDescriptor};
use crate::errors::HarvestResult;
use crate::fetch::FetchGateway;
use crate::sources::detail_scrape::DetailScrapeSource;
use crate::sources::list_scrape::ListScrapeSource;
use crate::sources::syndication::SyndicationSource;

/// Routes a descriptor to its acquisition strategy.
///
/// All three strategies share the one gateway (and so the one HTML cache)
/// handed in at construction.
pub struct SourceDispatcher {
    syndication: SyndicationSource,
    list: ListScrapeSource,
    detail: DetailScrapeSource,
}

impl SourceDispatcher {
    pub fn new(gateway: Arc<FetchGateway>) -> Self {
        Self {
            syndication: SyndicationSource::new(Arc::clone(&gateway)),
            list: ListScrapeSource::new(Arc::clone(&gateway)),
            detail: DetailScrapeSource::new(gateway),
        }
    }

    /// Run one crawl cycle.
    ///
    /// Returns how many entries the source showed and the candidates whose
    /// identifiers are not in `known`.
    pub fn crawl(
        &self,
        descriptor: &SourceDescriptor,
        known: &HashSet<String>,
    ) -> HarvestResult<CrawlOutcome> {
        tracing::info!(
            source_id = descriptor.id,
            kind = %descriptor.kind(),
            url = %descriptor.url,
            known = known.len(),
            "crawling source"
        );

        let outcome = match &descriptor.acquisition {
            Acquisition::Syndication => self.syndication.crawl(descriptor, known),
            Acquisition::ListScrape(scrape) => self.list.crawl(descriptor, scrape, known),
            Acquisition::DetailScrape(scrape) => self.detail.crawl(descriptor, scrape, known),
        }?;

        tracing::info!(
            source_id = descriptor.id,
            observed = outcome.observed,
            new = outcome.items.len(),
            "crawl finished"
        );
        Ok(outcome)
    }
}
