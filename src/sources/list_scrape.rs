use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::descriptor::configured;
use crate::domain::{CandidateItem, CrawlOutcome, ListScrape, SelectorSet, SourceDescriptor};
use crate::errors::{HarvestError, HarvestResult};
use crate::extract::{extract_fields, published_or_now, Document, ExtractedFields};
use crate::fetch::{FetchGateway, FetchOptions};
use crate::sources::dedup::{scraped_guid, Deduplicator};

/// Most items taken from one list page per cycle.
pub const MAX_LIST_ITEMS: usize = 50;

/// A fetched page ready for extraction.
pub(crate) struct FetchedPage {
    pub html: String,
    pub final_url: String,
}

/// Fetch through the gateway, turning an unsuccessful result into an error.
pub(crate) fn fetch_page(
    gateway: &FetchGateway,
    url: &str,
    options: &FetchOptions,
) -> HarvestResult<FetchedPage> {
    let result = gateway.fetch(url, options)?;
    if !result.success {
        return Err(HarvestError::Fetch {
            url: url.to_string(),
            reason: result.error_text(),
        });
    }

    let html = result.html.ok_or_else(|| HarvestError::Fetch {
        url: url.to_string(),
        reason: "empty response".to_string(),
    })?;
    Ok(FetchedPage {
        html,
        final_url: result.final_url,
    })
}

/// Assemble a candidate from extracted fields using the descriptor's date hints.
pub(crate) fn candidate_from_fields(
    guid: String,
    fields: ExtractedFields,
    descriptor: &SourceDescriptor,
) -> CandidateItem {
    let published = published_or_now(
        fields.date_text.as_deref(),
        &descriptor.date_formats,
        descriptor.locale.as_deref(),
    );
    let title = fields.title.unwrap_or_else(|| "Untitled".to_string());

    CandidateItem::new(guid, title, published)
        .with_link(fields.link)
        .with_description(fields.description_html, fields.description_text)
        .with_author(fields.author)
        .with_categories(fields.categories)
        .with_image(fields.image)
}

/// Scrapes items straight off one rendered list page.
pub struct ListScrapeSource {
    gateway: Arc<FetchGateway>,
}

impl ListScrapeSource {
    pub fn new(gateway: Arc<FetchGateway>) -> Self {
        Self { gateway }
    }

    pub fn crawl(
        &self,
        descriptor: &SourceDescriptor,
        scrape: &ListScrape,
        known: &HashSet<String>,
    ) -> HarvestResult<CrawlOutcome> {
        let options = FetchOptions::for_source(descriptor);
        let page = fetch_page(&self.gateway, &descriptor.url, &options)?;
        let document = Document::parse(&page.html, &page.final_url, &descriptor.exclude);

        Ok(extract_list(&document, descriptor, &scrape.selectors, known))
    }
}

/// Extract up to [`MAX_LIST_ITEMS`] new candidates from a pruned list page.
pub fn extract_list(
    document: &Document,
    descriptor: &SourceDescriptor,
    selectors: &SelectorSet,
    known: &HashSet<String>,
) -> CrawlOutcome {
    let Some(item_selector) = configured(&selectors.item) else {
        return CrawlOutcome::default();
    };

    let scopes = document.items(item_selector, MAX_LIST_ITEMS);
    let observed = scopes.len();
    let mut dedup = Deduplicator::new(known);
    let mut items = Vec::new();

    for scope in scopes {
        let fields = extract_fields(scope, selectors, document.base_url());
        if fields.title.is_none() && fields.link.is_none() {
            tracing::debug!(source_id = descriptor.id, "skipping item without title or link");
            continue;
        }

        let guid = scraped_guid(fields.link.as_deref(), fields.title.as_deref().unwrap_or(""));
        if !dedup.admit(&guid) {
            continue;
        }
        items.push(candidate_from_fields(guid, fields, descriptor));
    }

    tracing::debug!(
        source_id = descriptor.id,
        observed,
        new = items.len(),
        "extracted list page"
    );
    CrawlOutcome { observed, items }
}
