//! Remote headless-browser rendering services.
//!
//! The browser engine itself is opaque: we send a navigation request over
//! HTTP and get post-script HTML back. Two services are supported, selected
//! by name:
//!
//! - `browserless`: `POST {base}/content?token=..`, answers with raw HTML
//! - `playwright`: `POST {base}/render`, answers with `{"html", "url"}` JSON

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{HarvestError, HarvestResult};
use crate::fetch::traits::FetchBackend;
use crate::fetch::{FetchOptions, FetchResult, RENDER_TIMEOUT_BUFFER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFlavor {
    Browserless,
    Playwright,
}

impl RenderFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFlavor::Browserless => "browserless",
            RenderFlavor::Playwright => "playwright",
        }
    }
}

impl std::str::FromStr for RenderFlavor {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browserless" => Ok(RenderFlavor::Browserless),
            "playwright" => Ok(RenderFlavor::Playwright),
            other => Err(HarvestError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RenderedPayload {
    html: Option<String>,
    #[serde(alias = "final_url")]
    url: Option<String>,
    error: Option<String>,
}

pub struct RenderServiceBackend {
    client: Client,
    flavor: RenderFlavor,
    endpoint: String,
    token: Option<String>,
    navigation_timeout: Duration,
}

impl RenderServiceBackend {
    pub fn new(
        flavor: RenderFlavor,
        endpoint: &str,
        token: Option<String>,
        navigation_timeout: Duration,
    ) -> HarvestResult<Self> {
        let client = Client::builder()
            .timeout(navigation_timeout + RENDER_TIMEOUT_BUFFER)
            .build()
            .map_err(HarvestError::Http)?;

        Ok(Self {
            client,
            flavor,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            navigation_timeout,
        })
    }

    fn request_url(&self) -> String {
        match self.flavor {
            RenderFlavor::Browserless => match &self.token {
                Some(token) => format!("{}/content?token={}", self.endpoint, token),
                None => format!("{}/content", self.endpoint),
            },
            RenderFlavor::Playwright => format!("{}/render", self.endpoint),
        }
    }

    fn timeout_for(&self, options: &FetchOptions) -> Duration {
        options.timeout.unwrap_or(self.navigation_timeout)
    }

    fn request_body(&self, url: &str, options: &FetchOptions) -> Value {
        let timeout_ms = self.timeout_for(options).as_millis() as u64;
        match self.flavor {
            RenderFlavor::Browserless => {
                let mut body = json!({
                    "url": url,
                    "gotoOptions": {
                        "waitUntil": options.wait_until.as_str(),
                        "timeout": timeout_ms,
                    },
                });
                if let Some(selector) = &options.wait_for {
                    body["waitForSelector"] = json!({ "selector": selector, "timeout": timeout_ms });
                }
                if !options.headers.is_empty() {
                    body["setExtraHTTPHeaders"] = json!(options.headers);
                }
                body
            }
            RenderFlavor::Playwright => json!({
                "url": url,
                "wait_until": options.wait_until.as_str(),
                "wait_for": options.wait_for,
                "timeout_ms": timeout_ms,
                "headers": options.headers,
            }),
        }
    }
}

/// Turn a rendering-service response body into a fetch result.
///
/// JSON with an `html` field wins; otherwise a body that looks like markup
/// is taken as raw HTML; anything else is a failure.
pub(crate) fn classify_response(requested_url: &str, body: &str) -> FetchResult {
    let trimmed = body.trim_start();

    if trimmed.starts_with('{') {
        if let Ok(payload) = serde_json::from_str::<RenderedPayload>(trimmed) {
            let final_url = payload.url.as_deref().unwrap_or(requested_url);
            return match payload.html {
                Some(html) => FetchResult::ok(final_url, html),
                None => FetchResult::failed(
                    final_url,
                    payload
                        .error
                        .unwrap_or_else(|| "renderer returned JSON without html".to_string()),
                ),
            };
        }
    }

    if looks_like_markup(trimmed) {
        return FetchResult::ok(requested_url, body.to_string());
    }

    let preview: String = trimmed.chars().take(200).collect();
    FetchResult::failed(
        requested_url,
        format!("renderer returned unexpected content: {}", preview),
    )
}

fn looks_like_markup(body: &str) -> bool {
    if body.starts_with('<') {
        return true;
    }
    let lowered = body.to_lowercase();
    lowered.contains("<html") || lowered.contains("<body")
}

impl FetchBackend for RenderServiceBackend {
    fn name(&self) -> &'static str {
        self.flavor.as_str()
    }

    fn fetch_raw(&self, url: &str, options: &FetchOptions) -> FetchResult {
        let body = self.request_body(url, options);
        let timeout = self.timeout_for(options) + RENDER_TIMEOUT_BUFFER;

        tracing::debug!(url, backend = self.flavor.as_str(), "rendering page");

        let response = match self
            .client
            .post(self.request_url())
            .timeout(timeout)
            .json(&body)
            .send()
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return FetchResult::failed(url, format!("render timed out after {:?}", timeout))
            }
            Err(e) if e.is_connect() => {
                return FetchResult::failed(url, format!("renderer unreachable: {}", e))
            }
            Err(e) => return FetchResult::failed(url, format!("render request failed: {}", e)),
        };

        let status = response.status().as_u16();
        let text = match response.text() {
            Ok(text) => text,
            Err(e) => {
                return FetchResult::failed(url, format!("reading render response: {}", e))
                    .with_status(status)
            }
        };

        if status != 200 {
            let preview: String = text.chars().take(200).collect();
            return FetchResult::failed(url, format!("renderer status {}: {}", status, preview))
                .with_status(status);
        }

        classify_response(url, &text).with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WaitUntil;

    fn backend(flavor: RenderFlavor) -> RenderServiceBackend {
        RenderServiceBackend::new(
            flavor,
            "http://render.local/",
            Some("secret".to_string()),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_flavor_from_name() {
        assert_eq!("browserless".parse::<RenderFlavor>().unwrap(), RenderFlavor::Browserless);
        assert_eq!("Playwright".parse::<RenderFlavor>().unwrap(), RenderFlavor::Playwright);
        assert!(matches!(
            "phantomjs".parse::<RenderFlavor>(),
            Err(HarvestError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_request_urls() {
        assert_eq!(
            backend(RenderFlavor::Browserless).request_url(),
            "http://render.local/content?token=secret"
        );
        assert_eq!(
            backend(RenderFlavor::Playwright).request_url(),
            "http://render.local/render"
        );
    }

    #[test]
    fn test_browserless_body_includes_wait_options() {
        let mut options = FetchOptions::render(Some("browserless"));
        options.wait_until = WaitUntil::NetworkIdle2;
        options.wait_for = Some(".feed".to_string());

        let body = backend(RenderFlavor::Browserless).request_body("https://e.com", &options);
        assert_eq!(body["gotoOptions"]["waitUntil"], "networkidle2");
        assert_eq!(body["gotoOptions"]["timeout"], 30000);
        assert_eq!(body["waitForSelector"]["selector"], ".feed");
        assert!(body.get("setExtraHTTPHeaders").is_none());
    }

    #[test]
    fn test_playwright_body() {
        let mut options = FetchOptions::render(Some("playwright"));
        options.timeout = Some(Duration::from_secs(5));
        let body = backend(RenderFlavor::Playwright).request_body("https://e.com", &options);
        assert_eq!(body["wait_until"], "load");
        assert_eq!(body["timeout_ms"], 5000);
    }

    #[test]
    fn test_classify_json_payload() {
        let result = classify_response(
            "https://e.com",
            r#"{"html": "<html><body>ok</body></html>", "url": "https://e.com/final"}"#,
        );
        assert!(result.success);
        assert_eq!(result.final_url, "https://e.com/final");
        assert_eq!(result.html.as_deref(), Some("<html><body>ok</body></html>"));
    }

    #[test]
    fn test_classify_json_error() {
        let result = classify_response("https://e.com", r#"{"error": "navigation timeout"}"#);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("navigation timeout"));
    }

    #[test]
    fn test_classify_raw_html() {
        let result = classify_response("https://e.com", "  <!DOCTYPE html><html></html>");
        assert!(result.success);
    }

    #[test]
    fn test_classify_garbage() {
        let result = classify_response("https://e.com", "Internal error, try later");
        assert!(!result.success);
        assert!(result.error.unwrap().contains("unexpected content"));
    }
}
