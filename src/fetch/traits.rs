use crate::errors::HarvestResult;
use crate::fetch::{CachedPage, FetchOptions, FetchResult};

/// A way of retrieving raw HTML for a URL.
#[cfg_attr(test, mockall::automock)]
pub trait FetchBackend: Send + Sync {
    /// Name used to select this backend
    fn name(&self) -> &'static str;

    /// Perform a single attempt. Failures are reported in the result, not raised.
    fn fetch_raw(&self, url: &str, options: &FetchOptions) -> FetchResult;
}

/// Fingerprint-keyed HTML store with TTL-bounded entries.
///
/// Implementations only need atomic get/set; concurrent writers to the same
/// key store equivalent content.
#[cfg_attr(test, mockall::automock)]
pub trait HtmlCache: Send + Sync {
    /// Returns the entry if present and not expired
    fn get(&self, key: &str) -> Option<CachedPage>;

    fn set(&self, key: &str, page: CachedPage);

    /// Drop every entry
    fn clear(&self) -> HarvestResult<()>;
}
