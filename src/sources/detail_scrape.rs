use std::collections::HashSet;
use std::sync::Arc;

use scraper::ElementRef;

use crate::domain::descriptor::configured;
use crate::domain::{CandidateItem, CrawlOutcome, DetailScrape, SelectorSet, SourceDescriptor};
use crate::errors::HarvestResult;
use crate::extract::document::select_first;
use crate::extract::fields::{self, link_of};
use crate::extract::{extract_first_image, Document, ExtractedFields};
use crate::fetch::{FetchGateway, FetchOptions};
use crate::sources::dedup::Deduplicator;
use crate::sources::list_scrape::{candidate_from_fields, fetch_page};

/// What the list page tells us about an item before its detail page is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    pub link: String,
    pub title: Option<String>,
    pub date_text: Option<String>,
    pub image: Option<String>,
}

/// Follows each list entry to its own page and scrapes the full content there.
pub struct DetailScrapeSource {
    gateway: Arc<FetchGateway>,
}

impl DetailScrapeSource {
    pub fn new(gateway: Arc<FetchGateway>) -> Self {
        Self { gateway }
    }

    pub fn crawl(
        &self,
        descriptor: &SourceDescriptor,
        scrape: &DetailScrape,
        known: &HashSet<String>,
    ) -> HarvestResult<CrawlOutcome> {
        let options = FetchOptions::for_source(descriptor);
        let page = fetch_page(&self.gateway, &descriptor.url, &options)?;
        let listing = Document::parse(&page.html, &page.final_url, &descriptor.exclude);

        let (observed, previews) = collect_previews(&listing, scrape, known);
        tracing::info!(
            source_id = descriptor.id,
            observed,
            to_follow = previews.len(),
            "following detail links"
        );

        // The list page's wait selector rarely exists on detail pages.
        let detail_options = FetchOptions {
            wait_for: None,
            ..options
        };

        let mut items = Vec::with_capacity(previews.len());
        for preview in previews {
            if let Some(item) = self.scrape_detail(descriptor, scrape, &preview, &detail_options)? {
                items.push(item);
            }
        }

        Ok(CrawlOutcome { observed, items })
    }

    /// Fetch and extract one detail page. A failed page is logged and skipped;
    /// only configuration errors propagate.
    fn scrape_detail(
        &self,
        descriptor: &SourceDescriptor,
        scrape: &DetailScrape,
        preview: &Preview,
        options: &FetchOptions,
    ) -> HarvestResult<Option<CandidateItem>> {
        let result = self.gateway.fetch(&preview.link, options)?;
        let html = match (result.success, result.html) {
            (true, Some(html)) => html,
            (_, _) => {
                tracing::warn!(
                    source_id = descriptor.id,
                    url = %preview.link,
                    error = %result.error.as_deref().unwrap_or("empty response"),
                    "skipping detail page"
                );
                return Ok(None);
            }
        };

        let document = Document::parse(&html, &result.final_url, &descriptor.exclude);
        let fields = detail_fields(&document, &scrape.detail, preview);
        Ok(Some(candidate_from_fields(
            preview.link.clone(),
            fields,
            descriptor,
        )))
    }
}

/// Phase one: walk the list page and keep links worth following.
///
/// Returns the number of items matched and up to `max_items` previews whose
/// links are neither known nor repeated.
pub fn collect_previews(
    listing: &Document,
    scrape: &DetailScrape,
    known: &HashSet<String>,
) -> (usize, Vec<Preview>) {
    let Some(item_selector) = configured(&scrape.list.item) else {
        return (0, Vec::new());
    };

    let scopes = listing.select(item_selector);
    let observed = scopes.len();
    let base = listing.base_url();
    let mut dedup = Deduplicator::new(known);
    let mut previews = Vec::new();

    for scope in scopes {
        if previews.len() >= scrape.max_items {
            break;
        }

        let link = match configured(&scrape.list.link) {
            Some(selector) => fields::link(scope, selector, base),
            None => link_of(scope, base),
        };
        let Some(link) = link else {
            continue;
        };
        if !dedup.admit(&link) {
            continue;
        }

        previews.push(preview_of(scope, &scrape.list, link, listing));
    }

    (observed, previews)
}

fn preview_of(scope: ElementRef<'_>, list: &SelectorSet, link: String, listing: &Document) -> Preview {
    let base = listing.base_url();
    Preview {
        link,
        title: configured(&list.title).and_then(|sel| fields::text(scope, sel)),
        date_text: configured(&list.date).and_then(|sel| fields::date_text(scope, sel)),
        image: configured(&list.image).and_then(|sel| {
            select_first(scope, sel).and_then(|el| fields::image_of(el, base))
        }),
    }
}

/// Phase two: extract from a detail page, falling back to preview values.
pub fn detail_fields(document: &Document, detail: &SelectorSet, preview: &Preview) -> ExtractedFields {
    let base = document.base_url();
    let scope = configured(&detail.item)
        .and_then(|sel| document.select(sel).into_iter().next())
        .unwrap_or_else(|| document.root());

    // Image is resolved below with the preview in between explicit and scavenged.
    let explicit = SelectorSet {
        image: None,
        link: None,
        ..detail.clone()
    };
    let extracted = fields::extract_fields(scope, &explicit, base);

    let explicit_image = configured(&detail.image)
        .and_then(|sel| fields::image(scope, Some(sel), base, None));
    let image = explicit_image.or_else(|| preview.image.clone()).or_else(|| {
        extracted
            .description_html
            .as_deref()
            .and_then(|html| extract_first_image(html, base))
    });

    ExtractedFields {
        title: extracted.title.or_else(|| preview.title.clone()),
        link: Some(preview.link.clone()),
        date_text: extracted.date_text.or_else(|| preview.date_text.clone()),
        image,
        ..extracted
    }
}
