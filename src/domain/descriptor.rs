use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{HarvestError, HarvestResult};

/// Default cap on detail pages followed per DetailScrape cycle.
pub const DEFAULT_MAX_DETAIL_ITEMS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Syndication,
    ListScrape,
    DetailScrape,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Syndication => "syndication",
            SourceKind::ListScrape => "list_scrape",
            SourceKind::DetailScrape => "detail_scrape",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "syndication" | "rss" | "atom" | "feed" => Ok(SourceKind::Syndication),
            "list_scrape" | "list" | "scrape" => Ok(SourceKind::ListScrape),
            "detail_scrape" | "detail" => Ok(SourceKind::DetailScrape),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named CSS selectors for one page type (list page or detail page).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    pub item: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub categories: Option<String>,
}

impl SelectorSet {
    pub fn with_item(mut self, selector: &str) -> Self {
        self.item = Some(selector.to_string());
        self
    }

    pub fn with_title(mut self, selector: &str) -> Self {
        self.title = Some(selector.to_string());
        self
    }

    pub fn with_link(mut self, selector: &str) -> Self {
        self.link = Some(selector.to_string());
        self
    }

    pub fn with_description(mut self, selector: &str) -> Self {
        self.description = Some(selector.to_string());
        self
    }

    pub fn with_date(mut self, selector: &str) -> Self {
        self.date = Some(selector.to_string());
        self
    }

    pub fn with_image(mut self, selector: &str) -> Self {
        self.image = Some(selector.to_string());
        self
    }

    pub fn with_author(mut self, selector: &str) -> Self {
        self.author = Some(selector.to_string());
        self
    }

    pub fn with_categories(mut self, selector: &str) -> Self {
        self.categories = Some(selector.to_string());
        self
    }
}

/// Returns the selector if it is configured and not blank.
pub(crate) fn configured(selector: &Option<String>) -> Option<&str> {
    selector
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitUntil {
    #[default]
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle0 => "networkidle0",
            WaitUntil::NetworkIdle2 => "networkidle2",
        }
    }
}

/// How pages for a source are retrieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub use_browser: bool,
    pub backend: Option<String>,
    pub wait_until: WaitUntil,
    pub wait_for: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListScrape {
    pub selectors: SelectorSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailScrape {
    pub list: SelectorSet,
    pub detail: SelectorSet,
    pub max_items: usize,
}

/// The acquisition strategy, carrying only the selectors that strategy uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Syndication,
    ListScrape(ListScrape),
    DetailScrape(DetailScrape),
}

impl Acquisition {
    pub fn kind(&self) -> SourceKind {
        match self {
            Acquisition::Syndication => SourceKind::Syndication,
            Acquisition::ListScrape(_) => SourceKind::ListScrape,
            Acquisition::DetailScrape(_) => SourceKind::DetailScrape,
        }
    }
}

/// A configured acquisition target. Read-only to the crawl core.
///
/// Construction validates that the selectors required by the acquisition
/// kind are present, so the extraction paths never have to re-check them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SourceConfig", into = "SourceConfig")]
pub struct SourceDescriptor {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub acquisition: Acquisition,
    pub exclude: Vec<String>,
    pub date_formats: Vec<String>,
    pub locale: Option<String>,
    pub render: RenderConfig,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SourceDescriptor {
    pub fn syndication(id: i64, feed_id: i64, url: &str) -> HarvestResult<Self> {
        Self::build(id, feed_id, url, Acquisition::Syndication)
    }

    pub fn list_scrape(
        id: i64,
        feed_id: i64,
        url: &str,
        selectors: SelectorSet,
    ) -> HarvestResult<Self> {
        Self::build(id, feed_id, url, Acquisition::ListScrape(ListScrape { selectors }))
    }

    pub fn detail_scrape(
        id: i64,
        feed_id: i64,
        url: &str,
        list: SelectorSet,
        detail: SelectorSet,
    ) -> HarvestResult<Self> {
        Self::build(
            id,
            feed_id,
            url,
            Acquisition::DetailScrape(DetailScrape {
                list,
                detail,
                max_items: DEFAULT_MAX_DETAIL_ITEMS,
            }),
        )
    }

    fn build(id: i64, feed_id: i64, url: &str, acquisition: Acquisition) -> HarvestResult<Self> {
        let descriptor = Self {
            id,
            feed_id,
            url: url.trim().to_string(),
            headers: BTreeMap::new(),
            acquisition,
            exclude: Vec::new(),
            date_formats: Vec::new(),
            locale: None,
            render: RenderConfig::default(),
            last_crawled_at: None,
            last_error: None,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn kind(&self) -> SourceKind {
        self.acquisition.kind()
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_date_formats(mut self, formats: Vec<String>, locale: Option<String>) -> Self {
        self.date_formats = formats;
        self.locale = locale;
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Caps how many detail pages one cycle follows, never below one.
    pub fn with_max_detail_items(mut self, max_items: usize) -> Self {
        if let Acquisition::DetailScrape(detail) = &mut self.acquisition {
            detail.max_items = max_items.max(1);
        }
        self
    }

    fn validate(&self) -> HarvestResult<()> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| HarvestError::InvalidUrl(format!("'{}': {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HarvestError::InvalidUrl(format!(
                "'{}' must use http or https",
                self.url
            )));
        }

        match &self.acquisition {
            Acquisition::Syndication => Ok(()),
            Acquisition::ListScrape(list) => {
                require(&list.selectors.item, "list_scrape needs an item selector")?;
                require(&list.selectors.title, "list_scrape needs a title selector")
            }
            Acquisition::DetailScrape(detail) => {
                require(&detail.list.item, "detail_scrape needs an item selector")?;
                if configured(&detail.list.title).is_none()
                    && configured(&detail.detail.title).is_none()
                {
                    return Err(HarvestError::InvalidDescriptor(
                        "detail_scrape needs a list or detail title selector".to_string(),
                    ));
                }
                require(
                    &detail.detail.description,
                    "detail_scrape needs a detail description selector",
                )?;
                if detail.max_items == 0 {
                    return Err(HarvestError::InvalidDescriptor(
                        "detail_scrape max_items must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn require(selector: &Option<String>, message: &str) -> HarvestResult<()> {
    configured(selector)
        .map(|_| ())
        .ok_or_else(|| HarvestError::InvalidDescriptor(message.to_string()))
}

/// Flat, serializable form of a descriptor as stored by the feed manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub feed_id: i64,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub selectors: SelectorSet,
    #[serde(default)]
    pub detail_selectors: SelectorSet,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub max_detail_items: Option<usize>,
    #[serde(default)]
    pub last_crawled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl TryFrom<SourceConfig> for SourceDescriptor {
    type Error = HarvestError;

    fn try_from(config: SourceConfig) -> Result<Self, Self::Error> {
        let acquisition = match config.kind {
            SourceKind::Syndication => Acquisition::Syndication,
            SourceKind::ListScrape => Acquisition::ListScrape(ListScrape {
                selectors: config.selectors,
            }),
            SourceKind::DetailScrape => Acquisition::DetailScrape(DetailScrape {
                list: config.selectors,
                detail: config.detail_selectors,
                max_items: config.max_detail_items.unwrap_or(DEFAULT_MAX_DETAIL_ITEMS),
            }),
        };

        let descriptor = SourceDescriptor {
            id: config.id,
            feed_id: config.feed_id,
            url: config.url.trim().to_string(),
            headers: config.headers,
            acquisition,
            exclude: config.exclude,
            date_formats: config.date_formats,
            locale: config.locale,
            render: config.render,
            last_crawled_at: config.last_crawled_at,
            last_error: config.last_error,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

impl From<SourceDescriptor> for SourceConfig {
    fn from(descriptor: SourceDescriptor) -> Self {
        let kind = descriptor.kind();
        let (selectors, detail_selectors, max_detail_items) = match descriptor.acquisition {
            Acquisition::Syndication => (SelectorSet::default(), SelectorSet::default(), None),
            Acquisition::ListScrape(list) => (list.selectors, SelectorSet::default(), None),
            Acquisition::DetailScrape(detail) => {
                (detail.list, detail.detail, Some(detail.max_items))
            }
        };

        SourceConfig {
            id: descriptor.id,
            feed_id: descriptor.feed_id,
            kind,
            url: descriptor.url,
            headers: descriptor.headers,
            selectors,
            detail_selectors,
            exclude: descriptor.exclude,
            date_formats: descriptor.date_formats,
            locale: descriptor.locale,
            render: descriptor.render,
            max_detail_items,
            last_crawled_at: descriptor.last_crawled_at,
            last_error: descriptor.last_error,
        }
    }
}

impl std::str::FromStr for SourceDescriptor {
    type Err = HarvestError;

    /// Parse a descriptor from its JSON form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SourceConfig = serde_json::from_str(s)?;
        SourceDescriptor::try_from(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_round_trip() {
        for kind in [
            SourceKind::Syndication,
            SourceKind::ListScrape,
            SourceKind::DetailScrape,
        ] {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert_eq!("rss".parse::<SourceKind>().unwrap(), SourceKind::Syndication);
        assert!("carrier-pigeon".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_syndication_needs_no_selectors() {
        let descriptor = SourceDescriptor::syndication(1, 1, "https://example.com/feed.xml").unwrap();
        assert_eq!(descriptor.kind(), SourceKind::Syndication);
    }

    #[test]
    fn test_list_scrape_requires_item_and_title() {
        let missing_item = SelectorSet::default().with_title("h2");
        let result = SourceDescriptor::list_scrape(1, 1, "https://example.com", missing_item);
        assert!(matches!(result, Err(HarvestError::InvalidDescriptor(_))));

        let missing_title = SelectorSet::default().with_item(".post");
        let result = SourceDescriptor::list_scrape(1, 1, "https://example.com", missing_title);
        assert!(matches!(result, Err(HarvestError::InvalidDescriptor(_))));

        let blank_title = SelectorSet::default().with_item(".post").with_title("  ");
        let result = SourceDescriptor::list_scrape(1, 1, "https://example.com", blank_title);
        assert!(result.is_err());

        let complete = SelectorSet::default().with_item(".post").with_title("h2");
        assert!(SourceDescriptor::list_scrape(1, 1, "https://example.com", complete).is_ok());
    }

    #[test]
    fn test_detail_scrape_requires_detail_description() {
        let list = SelectorSet::default().with_item(".post").with_title("h2");
        let result = SourceDescriptor::detail_scrape(
            1,
            1,
            "https://example.com",
            list.clone(),
            SelectorSet::default(),
        );
        assert!(matches!(result, Err(HarvestError::InvalidDescriptor(_))));

        let detail = SelectorSet::default().with_description("article");
        let descriptor =
            SourceDescriptor::detail_scrape(1, 1, "https://example.com", list, detail).unwrap();
        match descriptor.acquisition {
            Acquisition::DetailScrape(d) => assert_eq!(d.max_items, DEFAULT_MAX_DETAIL_ITEMS),
            other => panic!("unexpected acquisition {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = SourceDescriptor::syndication(1, 1, "ftp://example.com/feed");
        assert!(matches!(result, Err(HarvestError::InvalidUrl(_))));

        let result = SourceDescriptor::syndication(1, 1, "not a url");
        assert!(matches!(result, Err(HarvestError::InvalidUrl(_))));
    }

    #[test]
    fn test_max_detail_items_never_drops_below_one() {
        let list = SelectorSet::default().with_item(".post").with_title("h2");
        let detail = SelectorSet::default().with_description("article");
        let descriptor = SourceDescriptor::detail_scrape(1, 1, "https://example.com", list, detail)
            .unwrap()
            .with_max_detail_items(0);
        match descriptor.acquisition {
            Acquisition::DetailScrape(d) => assert_eq!(d.max_items, 1),
            other => panic!("unexpected acquisition {:?}", other),
        }
    }

    #[test]
    fn test_parse_from_json_validates() {
        let json = r#"{
            "id": 4,
            "feed_id": 2,
            "kind": "list_scrape",
            "url": "https://example.com/news",
            "selectors": {"item": "article", "title": "h2 a", "link": "h2 a"},
            "exclude": [".ad"],
            "render": {"use_browser": true, "backend": "browserless", "wait_until": "networkidle2"}
        }"#;
        let descriptor: SourceDescriptor = json.parse().unwrap();
        assert_eq!(descriptor.kind(), SourceKind::ListScrape);
        assert_eq!(descriptor.exclude, vec![".ad".to_string()]);
        assert_eq!(descriptor.render.wait_until, WaitUntil::NetworkIdle2);

        let invalid = r#"{"kind": "list_scrape", "url": "https://example.com"}"#;
        assert!(invalid.parse::<SourceDescriptor>().is_err());
    }

    #[test]
    fn test_serializes_back_to_flat_config() {
        let list = SelectorSet::default().with_item(".post").with_title("h2");
        let detail = SelectorSet::default().with_description(".body");
        let descriptor = SourceDescriptor::detail_scrape(7, 3, "https://example.com", list, detail)
            .unwrap()
            .with_max_detail_items(5);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["kind"], "detail_scrape");
        assert_eq!(json["max_detail_items"], 5);
        assert_eq!(json["detail_selectors"]["description"], ".body");
    }
}
