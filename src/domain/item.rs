use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A freshly extracted record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub published: DateTime<Utc>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
}

impl CandidateItem {
    pub fn new(guid: String, title: String, published: DateTime<Utc>) -> Self {
        Self {
            guid,
            title,
            link: None,
            description_html: None,
            description_text: None,
            published,
            author: None,
            categories: Vec::new(),
            image_url: None,
        }
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn with_description(mut self, html: Option<String>, text: Option<String>) -> Self {
        self.description_html = html;
        self.description_text = text;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

/// A candidate after the item store accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: i64,
    pub feed_id: i64,
    pub item: CandidateItem,
    pub created_at: Option<String>,
}

/// What one crawl cycle observed and produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlOutcome {
    /// Entries seen on the source this cycle, before deduplication.
    pub observed: usize,
    pub items: Vec<CandidateItem>,
}
