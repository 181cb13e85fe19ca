use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::errors::{HarvestError, HarvestResult};
use crate::fetch::cache::{cache_key, CachedPage};
use crate::fetch::traits::{FetchBackend, HtmlCache};
use crate::fetch::{
    validation, FetchMode, FetchOptions, FetchResult, FetchSettings, HttpBackend, RenderFlavor,
    RenderServiceBackend,
};

/// Single entry point for HTML retrieval.
///
/// Owns the direct HTTP backend, the registered rendering backends and the
/// shared cache. Built once and handed to whoever crawls.
pub struct FetchGateway {
    http: Box<dyn FetchBackend>,
    renderers: Vec<Box<dyn FetchBackend>>,
    default_renderer: Option<String>,
    cache: Arc<dyn HtmlCache>,
    settings: FetchSettings,
}

impl FetchGateway {
    pub fn new(
        http: Box<dyn FetchBackend>,
        cache: Arc<dyn HtmlCache>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            http,
            renderers: Vec::new(),
            default_renderer: None,
            cache,
            settings,
        }
    }

    /// Build the gateway with every rendering backend that has an endpoint configured.
    pub fn from_config(config: &Config, cache: Arc<dyn HtmlCache>) -> HarvestResult<Self> {
        let http = HttpBackend::new(&config.user_agent, config.fetch.direct_timeout)?;
        let mut gateway = Self::new(Box::new(http), cache, config.fetch.clone());

        if let Some(endpoint) = &config.browserless_url {
            gateway.register_renderer(Box::new(RenderServiceBackend::new(
                RenderFlavor::Browserless,
                endpoint,
                config.browserless_token.clone(),
                config.fetch.navigation_timeout,
            )?));
        }
        if let Some(endpoint) = &config.renderer_url {
            gateway.register_renderer(Box::new(RenderServiceBackend::new(
                RenderFlavor::Playwright,
                endpoint,
                None,
                config.fetch.navigation_timeout,
            )?));
        }

        // Validates the name even when that backend has no endpoint.
        let default: RenderFlavor = config.default_backend.parse()?;
        Ok(gateway.with_default_renderer(default.as_str()))
    }

    pub fn register_renderer(&mut self, backend: Box<dyn FetchBackend>) {
        self.renderers.push(backend);
    }

    pub fn with_default_renderer(mut self, name: &str) -> Self {
        self.default_renderer = Some(name.to_string());
        self
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn find_renderer(&self, name: &str) -> Option<&dyn FetchBackend> {
        self.renderers
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
            .map(|r| r.as_ref())
    }

    /// Pick the rendering backend for a request.
    ///
    /// Render mode requires one. Direct mode uses it only as a fallback, and
    /// only if the requested (or default) renderer is registered.
    fn resolve_renderer(&self, options: &FetchOptions) -> HarvestResult<Option<&dyn FetchBackend>> {
        match (&options.backend, options.mode) {
            (Some(name), _) => self
                .find_renderer(name)
                .map(Some)
                .ok_or_else(|| HarvestError::UnknownBackend(name.clone())),
            (None, FetchMode::Render) => {
                let name = self.default_renderer.as_deref().unwrap_or("<none>");
                self.find_renderer(name)
                    .map(Some)
                    .ok_or_else(|| HarvestError::UnknownBackend(name.to_string()))
            }
            (None, FetchMode::Direct) => Ok(self
                .default_renderer
                .as_deref()
                .and_then(|name| self.find_renderer(name))),
        }
    }

    /// Retrieve HTML for a URL with caching, retry and content validation.
    ///
    /// Only an unknown backend name is returned as `Err`. When every attempt
    /// fails, the last raw result is returned marked as a failure so callers
    /// can still look at partial content.
    pub fn fetch(&self, url: &str, options: &FetchOptions) -> HarvestResult<FetchResult> {
        let renderer = self.resolve_renderer(options)?;
        let key = cache_key(url, options);

        if let Some(page) = self.cache.get(&key) {
            tracing::debug!(url, "html cache hit");
            let mut result = FetchResult::ok(&page.final_url, page.html);
            result.from_cache = true;
            return Ok(result);
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=max_attempts {
            let raw = self.attempt(url, options, renderer);
            match validation::check(&raw, self.settings.min_content_length) {
                Ok(()) => {
                    if let Some(html) = &raw.html {
                        self.cache
                            .set(&key, CachedPage::new(html.clone(), raw.final_url.clone()));
                    }
                    return Ok(raw);
                }
                Err(reason) => {
                    tracing::warn!(url, attempt, max_attempts, %reason, "fetch attempt rejected");
                    last = Some(raw.into_failure(reason));
                    if attempt < max_attempts {
                        thread::sleep(self.settings.retry_backoff * attempt);
                    }
                }
            }
        }

        Ok(last.unwrap_or_else(|| FetchResult::failed(url, "no fetch attempts made")))
    }

    /// One raw attempt following the backend policy of the request's mode.
    fn attempt(
        &self,
        url: &str,
        options: &FetchOptions,
        renderer: Option<&dyn FetchBackend>,
    ) -> FetchResult {
        match (options.mode, renderer) {
            (FetchMode::Render, Some(renderer)) => renderer.fetch_raw(url, options),
            (FetchMode::Render, None) => FetchResult::failed(url, "no rendering backend"),
            (FetchMode::Direct, renderer) => {
                let direct = self.http.fetch_raw(url, options);
                let blocked = direct.status != Some(200)
                    || !direct.success
                    || direct
                        .html
                        .as_deref()
                        .and_then(validation::find_challenge)
                        .is_some();

                match renderer {
                    Some(renderer) if blocked => {
                        tracing::info!(
                            url,
                            backend = renderer.name(),
                            reason = %direct.error.as_deref().unwrap_or("challenge page"),
                            "direct fetch blocked, falling back to renderer"
                        );
                        renderer.fetch_raw(url, options)
                    }
                    _ => direct,
                }
            }
        }
    }

    /// Plain HTTP retrieval for machine-readable documents (syndication feeds).
    ///
    /// Bypasses rendering, caching and the HTML challenge checks; transport
    /// failures are still retried.
    pub fn fetch_document(&self, url: &str, options: &FetchOptions) -> FetchResult {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last = FetchResult::failed(url, "no fetch attempts made");

        for attempt in 1..=max_attempts {
            let raw = self.http.fetch_raw(url, options);
            if raw.success {
                return raw;
            }
            tracing::warn!(url, attempt, error = %raw.error_text(), "document fetch failed");
            // Client errors will not change on retry.
            if matches!(raw.status, Some(status) if (400..500).contains(&status) && status != 429) {
                return raw;
            }
            last = raw;
            if attempt < max_attempts {
                thread::sleep(self.settings.retry_backoff * attempt);
            }
        }

        last
    }

    pub fn clear_cache(&self) -> HarvestResult<()> {
        self.cache.clear()
    }
}
