use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::HarvestResult;
use crate::fetch::{CachedPage, HtmlCache};
use crate::storage::sqlite::SqliteStorage;

/// HTML cache persisted in the `html_cache` table, so entries outlive the process.
pub struct SqliteHtmlCache {
    storage: SqliteStorage,
    ttl: Duration,
}

impl SqliteHtmlCache {
    pub fn new(storage: SqliteStorage, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    fn read(&self, key: &str) -> HarvestResult<Option<CachedPage>> {
        let conn = self.storage.connection()?;
        let row = conn.query_row(
            "SELECT html, final_url, stored_at FROM html_cache WHERE key = ?1",
            [key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        );

        let (html, final_url, stored_at) = match row {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let page = DateTime::parse_from_rfc3339(&stored_at)
            .ok()
            .map(|dt| CachedPage {
                html,
                final_url,
                stored_at: dt.with_timezone(&Utc),
            })
            .filter(|page| !page.is_expired(self.ttl));

        if page.is_none() {
            conn.execute("DELETE FROM html_cache WHERE key = ?1", [key])?;
        }
        Ok(page)
    }

    fn write(&self, key: &str, page: &CachedPage) -> HarvestResult<()> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO html_cache (key, html, final_url, stored_at) VALUES (?1, ?2, ?3, ?4)",
            (key, &page.html, &page.final_url, page.stored_at.to_rfc3339()),
        )?;
        Ok(())
    }
}

impl HtmlCache for SqliteHtmlCache {
    fn get(&self, key: &str) -> Option<CachedPage> {
        self.read(key).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "html cache read failed");
            None
        })
    }

    fn set(&self, key: &str, page: CachedPage) {
        if let Err(e) = self.write(key, &page) {
            tracing::warn!(error = %e, "html cache write failed");
        }
    }

    fn clear(&self) -> HarvestResult<()> {
        let conn = self.storage.connection()?;
        let removed = conn.execute("DELETE FROM html_cache", [])?;
        tracing::info!(removed, "html cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteHtmlCache {
        SqliteHtmlCache::new(SqliteStorage::in_memory().unwrap(), Duration::from_secs(3600))
    }

    #[test]
    fn test_set_then_get() {
        let cache = setup();
        assert!(cache.get("k").is_none());

        let page = CachedPage::new("<html>body</html>".to_string(), "https://e.com/x".to_string());
        cache.set("k", page.clone());

        let hit = cache.get("k").unwrap();
        assert_eq!(hit.html, page.html);
        assert_eq!(hit.final_url, "https://e.com/x");
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = setup();
        let mut page = CachedPage::new("<html>old</html>".to_string(), "https://e.com".to_string());
        page.stored_at = Utc::now() - chrono::Duration::hours(3);
        cache.set("old", page);

        assert!(cache.get("old").is_none());
        let conn = cache.storage.connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM html_cache", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = setup();
        cache.set("a", CachedPage::new("a".to_string(), "https://e.com/a".to_string()));
        cache.set("b", CachedPage::new("b".to_string(), "https://e.com/b".to_string()));

        cache.clear().unwrap();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
    }
}
