use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::errors::{HarvestError, HarvestResult};
use crate::fetch::traits::FetchBackend;
use crate::fetch::{FetchOptions, FetchResult};

/// Plain HTTP GET with browser-like headers.
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(user_agent: &str, timeout: Duration) -> HarvestResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(HarvestError::Http)?;

        Ok(Self { client })
    }

    fn request_headers(options: &FetchOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid request header"),
            }
        }
        headers
    }

    /// Map a reqwest error to the text carried in `FetchResult.error`.
    fn describe_error(err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        }
    }
}

impl FetchBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn fetch_raw(&self, url: &str, options: &FetchOptions) -> FetchResult {
        let mut request = self.client.get(url).headers(Self::request_headers(options));
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => return FetchResult::failed(url, Self::describe_error(&e)),
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                return FetchResult::failed(&final_url, Self::describe_error(&e)).with_status(status)
            }
        };

        tracing::debug!(url, status, bytes = body.len(), "direct fetch");

        if status != 200 {
            return FetchResult::failed(&final_url, format!("unexpected status {}", status))
                .with_status(status)
                .with_html(Some(body));
        }

        FetchResult::ok(&final_url, body).with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_builds() {
        let backend = HttpBackend::new("harvest-test/0.1", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.name(), "direct");
    }

    #[test]
    fn test_request_headers_skip_invalid() {
        let mut options = FetchOptions::direct();
        options
            .headers
            .insert("Referer".to_string(), "https://example.com".to_string());
        options
            .headers
            .insert("Bad Header".to_string(), "x".to_string());

        let headers = HttpBackend::request_headers(&options);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["referer"], "https://example.com");
    }

    #[test]
    fn test_connection_failure_is_reported_not_raised() {
        let backend = HttpBackend::new("harvest-test/0.1", Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is almost never listening.
        let result = backend.fetch_raw("http://127.0.0.1:9/", &FetchOptions::direct());
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
