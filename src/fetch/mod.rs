//! HTML acquisition through interchangeable backends.
//!
//! Every backend implements [`FetchBackend`]. The [`FetchGateway`] wraps them
//! once with caching, retry with backoff and bot-challenge validation, so
//! none of that logic is repeated per backend.
//!
//! Transport and content problems never escape as `Err`: they come back in
//! [`FetchResult::error`]. The only `Err` the gateway returns is
//! [`HarvestError::UnknownBackend`](crate::errors::HarvestError::UnknownBackend).

pub mod cache;
pub mod gateway;
pub mod http;
pub mod render;
pub mod traits;
pub mod validation;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::{SourceDescriptor, WaitUntil};

pub use cache::{cache_key, CachedPage, MemoryHtmlCache};
pub use gateway::FetchGateway;
pub use http::HttpBackend;
pub use render::{RenderFlavor, RenderServiceBackend};
pub use traits::{FetchBackend, HtmlCache};

/// Added on top of the navigation timeout for the HTTP call to a renderer.
pub const RENDER_TIMEOUT_BUFFER: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Plain GET first, rendering backend only as a fallback.
    #[default]
    Direct,
    /// Always go through the rendering backend.
    Render,
}

/// Per-request fetch options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub mode: FetchMode,
    /// Rendering backend name; `None` means the gateway default.
    pub backend: Option<String>,
    pub wait_until: WaitUntil,
    pub wait_for: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: BTreeMap<String, String>,
}

impl FetchOptions {
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn render(backend: Option<&str>) -> Self {
        Self {
            mode: FetchMode::Render,
            backend: backend.map(str::to_string),
            ..Self::default()
        }
    }

    /// Options derived from a descriptor's headers and rendering configuration.
    pub fn for_source(descriptor: &SourceDescriptor) -> Self {
        let render = &descriptor.render;
        Self {
            mode: if render.use_browser {
                FetchMode::Render
            } else {
                FetchMode::Direct
            },
            backend: render.backend.clone().filter(|b| !b.trim().is_empty()),
            wait_until: render.wait_until,
            wait_for: render.wait_for.clone().filter(|s| !s.trim().is_empty()),
            timeout: render.timeout_ms.map(Duration::from_millis),
            headers: descriptor.headers.clone(),
        }
    }
}

/// Outcome of one fetch. Never persisted beyond the HTML cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub success: bool,
    pub html: Option<String>,
    pub final_url: String,
    pub error: Option<String>,
    pub from_cache: bool,
    pub status: Option<u16>,
}

impl FetchResult {
    pub fn ok(final_url: &str, html: String) -> Self {
        Self {
            success: true,
            html: Some(html),
            final_url: final_url.to_string(),
            error: None,
            from_cache: false,
            status: None,
        }
    }

    pub fn failed(final_url: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            html: None,
            final_url: final_url.to_string(),
            error: Some(error.into()),
            from_cache: false,
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_html(mut self, html: Option<String>) -> Self {
        self.html = html;
        self
    }

    /// Keep whatever payload was received but mark the result as failed.
    pub fn into_failure(mut self, reason: String) -> Self {
        self.success = false;
        self.error = Some(reason);
        self
    }

    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "unknown fetch error".to_string())
    }
}

/// Retry, cache and validation knobs shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * retry_backoff` before retrying.
    pub retry_backoff: Duration,
    pub cache_ttl: Duration,
    pub min_content_length: usize,
    pub navigation_timeout: Duration,
    pub direct_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(2000),
            cache_ttl: Duration::from_secs(3600),
            min_content_length: 500,
            navigation_timeout: Duration::from_millis(30000),
            direct_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RenderConfig, SelectorSet};

    #[test]
    fn test_fetch_settings_default() {
        let settings = FetchSettings::default();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_options_for_source() {
        let selectors = SelectorSet::default().with_item("li").with_title("a");
        let mut headers = BTreeMap::new();
        headers.insert("Referer".to_string(), "https://example.com".to_string());
        let descriptor = SourceDescriptor::list_scrape(1, 1, "https://example.com", selectors)
            .unwrap()
            .with_headers(headers)
            .with_render(RenderConfig {
                use_browser: true,
                backend: Some("playwright".to_string()),
                wait_until: WaitUntil::NetworkIdle0,
                wait_for: Some(" ".to_string()),
                timeout_ms: Some(12000),
            });

        let options = FetchOptions::for_source(&descriptor);
        assert_eq!(options.mode, FetchMode::Render);
        assert_eq!(options.backend.as_deref(), Some("playwright"));
        assert_eq!(options.wait_for, None);
        assert_eq!(options.timeout, Some(Duration::from_millis(12000)));
        assert_eq!(options.headers.len(), 1);
    }

    #[test]
    fn test_into_failure_keeps_payload() {
        let result = FetchResult::ok("https://example.com", "<html></html>".to_string())
            .into_failure("too short".to_string());
        assert!(!result.success);
        assert_eq!(result.html.as_deref(), Some("<html></html>"));
        assert_eq!(result.error_text(), "too short");
    }
}
