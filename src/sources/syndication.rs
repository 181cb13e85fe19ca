use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use url::Url;

use crate::domain::{CandidateItem, CrawlOutcome, SourceDescriptor};
use crate::errors::{HarvestError, HarvestResult};
use crate::extract::fields::plain_text;
use crate::extract::{absolutize_fragment, extract_first_image, resolve_url};
use crate::fetch::{FetchGateway, FetchOptions};
use crate::sources::dedup::{title_hash, Deduplicator};

/// RSS, Atom and JSON Feed sources, fetched over plain HTTP.
pub struct SyndicationSource {
    gateway: Arc<FetchGateway>,
}

impl SyndicationSource {
    pub fn new(gateway: Arc<FetchGateway>) -> Self {
        Self { gateway }
    }

    pub fn crawl(
        &self,
        descriptor: &SourceDescriptor,
        known: &HashSet<String>,
    ) -> HarvestResult<CrawlOutcome> {
        let options = FetchOptions {
            headers: descriptor.headers.clone(),
            ..FetchOptions::direct()
        };
        let result = self.gateway.fetch_document(&descriptor.url, &options);

        if !result.success {
            return Err(HarvestError::Fetch {
                url: descriptor.url.clone(),
                reason: result.error_text(),
            });
        }

        let body = result.html.unwrap_or_default();
        candidates_from_bytes(body.as_bytes(), &result.final_url, known)
    }
}

/// Parse a syndication document and keep the entries not seen before.
///
/// A document that does not parse fails the whole cycle.
pub fn candidates_from_bytes(
    bytes: &[u8],
    feed_url: &str,
    known: &HashSet<String>,
) -> HarvestResult<CrawlOutcome> {
    // Entries without an id keep it empty so the link fallback applies.
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| HarvestError::FeedParse(e.to_string()))?;
    let base = Url::parse(feed_url).ok();

    let observed = feed.entries.len();
    let mut dedup = Deduplicator::new(known);
    let mut items = Vec::new();

    for entry in feed.entries {
        let link = entry_link(&entry, base.as_ref());
        let guid = entry_guid(&entry, link.as_deref());
        if !dedup.admit(&guid) {
            continue;
        }
        items.push(map_entry(entry, guid, link, base.as_ref()));
    }

    tracing::debug!(feed_url, observed, new = items.len(), "parsed syndication document");
    Ok(CrawlOutcome { observed, items })
}

fn entry_title(entry: &Entry) -> Option<String> {
    entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Explicit id, else the link, else a hash of the title.
fn entry_guid(entry: &Entry, link: Option<&str>) -> String {
    let id = entry.id.trim();
    if !id.is_empty() {
        return id.to_string();
    }
    match link {
        Some(link) => link.to_string(),
        None => title_hash(&entry_title(entry).unwrap_or_default()),
    }
}

fn is_enclosure(link: &Link) -> bool {
    link.rel.as_deref() == Some("enclosure")
}

/// `rel="alternate"` first, then the first non-enclosure link.
fn entry_link(entry: &Entry, base: Option<&Url>) -> Option<String> {
    entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.iter().find(|l| !is_enclosure(l)))
        .and_then(|l| resolve_url(base, &l.href))
}

/// Declared images: media thumbnails, image media content, image enclosures.
fn declared_image(entry: &Entry, base: Option<&Url>) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .find_map(|media| media.thumbnails.first())
        .map(|thumb| thumb.image.uri.clone());

    let media_content = || {
        entry.media.iter().flat_map(|m| m.content.iter()).find_map(|content| {
            let is_image = content
                .content_type
                .as_ref()
                .map(|mime| mime.to_string().starts_with("image/"))
                .unwrap_or(false);
            if is_image {
                content.url.as_ref().map(|u| u.to_string())
            } else {
                None
            }
        })
    };

    let enclosure = || {
        entry
            .links
            .iter()
            .filter(|l| is_enclosure(l))
            .find(|l| {
                l.media_type
                    .as_deref()
                    .map(|t| t.starts_with("image/"))
                    .unwrap_or(false)
            })
            .map(|l| l.href.clone())
    };

    thumbnail
        .or_else(media_content)
        .or_else(enclosure)
        .and_then(|src| resolve_url(base, &src))
}

fn map_entry(entry: Entry, guid: String, link: Option<String>, feed_base: Option<&Url>) -> CandidateItem {
    let title = entry_title(&entry).unwrap_or_else(|| "Untitled".to_string());

    let item_base = link.as_deref().and_then(|l| Url::parse(l).ok());
    let base = item_base.as_ref().or(feed_base);

    let raw_description = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
        .filter(|d| !d.trim().is_empty());
    let description_html = raw_description.map(|html| absolutize_fragment(&html, base));
    let description_text = description_html
        .as_deref()
        .map(plain_text)
        .filter(|t| !t.is_empty());

    let image = declared_image(&entry, base).or_else(|| {
        description_html
            .as_deref()
            .and_then(|html| extract_first_image(html, base))
    });

    let author = entry
        .authors
        .first()
        .map(|person| person.name.trim().to_string())
        .filter(|name| !name.is_empty());

    let categories: Vec<String> = entry
        .categories
        .iter()
        .map(|c| c.label.clone().unwrap_or_else(|| c.term.clone()))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let published = entry.published.or(entry.updated).unwrap_or_else(Utc::now);

    CandidateItem::new(guid, title, published)
        .with_link(link)
        .with_description(description_html, description_text)
        .with_author(author)
        .with_categories(categories)
        .with_image(image)
}
