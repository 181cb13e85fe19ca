//! HTML cache keys and the in-process cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::errors::{HarvestError, HarvestResult};
use crate::fetch::traits::HtmlCache;
use crate::fetch::FetchOptions;

/// Compute the cache fingerprint for a request.
///
/// Covers the URL, the wait selector, the wait condition and the request
/// headers (sorted, since they live in a `BTreeMap`).
pub fn cache_key(url: &str, options: &FetchOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(options.wait_for.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\n");
    hasher.update(options.wait_until.as_str().as_bytes());
    for (name, value) in &options.headers {
        hasher.update(b"\n");
        hasher.update(name.to_lowercase().as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub html: String,
    pub final_url: String,
    pub stored_at: DateTime<Utc>,
}

impl CachedPage {
    pub fn new(html: String, final_url: String) -> Self {
        Self {
            html,
            final_url,
            stored_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36500));
        Utc::now() - self.stored_at > ttl
    }
}

/// Mutex-guarded in-memory cache, shared across crawls in one process.
pub struct MemoryHtmlCache {
    entries: Mutex<HashMap<String, CachedPage>>,
    ttl: Duration,
}

impl MemoryHtmlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HtmlCache for MemoryHtmlCache {
    fn get(&self, key: &str) -> Option<CachedPage> {
        let mut entries = self.entries.lock().ok()?;
        if entries.get(key)?.is_expired(self.ttl) {
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, page: CachedPage) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, cached| !cached.is_expired(ttl));
            entries.insert(key.to_string(), page);
        }
    }

    fn clear(&self) -> HarvestResult<()> {
        self.entries
            .lock()
            .map_err(|_| HarvestError::Config("html cache lock poisoned".to_string()))?
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WaitUntil;

    #[test]
    fn test_key_stability() {
        let options = FetchOptions::direct();
        assert_eq!(
            cache_key("https://example.com", &options),
            cache_key("https://example.com", &options)
        );
    }

    #[test]
    fn test_key_varies_with_wait_and_headers() {
        let base = FetchOptions::direct();
        let base_key = cache_key("https://example.com", &base);

        let mut waiting = base.clone();
        waiting.wait_for = Some(".list".to_string());
        assert_ne!(base_key, cache_key("https://example.com", &waiting));

        let mut idle = base.clone();
        idle.wait_until = WaitUntil::NetworkIdle2;
        assert_ne!(base_key, cache_key("https://example.com", &idle));

        let mut headers = base.clone();
        headers
            .headers
            .insert("Cookie".to_string(), "a=1".to_string());
        assert_ne!(base_key, cache_key("https://example.com", &headers));
    }

    #[test]
    fn test_key_format() {
        let key = cache_key("https://example.com", &FetchOptions::direct());
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_memory_cache_get_set_clear() {
        let cache = MemoryHtmlCache::new(Duration::from_secs(3600));
        assert!(cache.get("k").is_none());

        cache.set("k", CachedPage::new("<p>x</p>".to_string(), "https://e.com".to_string()));
        assert_eq!(cache.get("k").unwrap().html, "<p>x</p>");

        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_expires_entries() {
        let cache = MemoryHtmlCache::new(Duration::from_secs(3600));
        let mut page = CachedPage::new("<p>old</p>".to_string(), "https://e.com".to_string());
        page.stored_at = Utc::now() - chrono::Duration::hours(2);
        cache.set("old", page);

        assert!(cache.get("old").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_set_sweeps_expired_entries() {
        let cache = MemoryHtmlCache::new(Duration::from_secs(3600));
        for n in 0..3 {
            let mut page = CachedPage::new("<p>old</p>".to_string(), format!("https://e.com/{n}"));
            page.stored_at = Utc::now() - chrono::Duration::hours(2);
            cache.entries.lock().unwrap().insert(format!("old-{n}"), page);
        }
        assert_eq!(cache.len(), 3);

        cache.set("fresh", CachedPage::new("<p>new</p>".to_string(), "https://e.com".to_string()));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }
}
