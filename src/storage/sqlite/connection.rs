use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{HarvestError, HarvestResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id INTEGER NOT NULL,
    guid TEXT NOT NULL,
    title TEXT NOT NULL,
    link TEXT,
    description_html TEXT,
    description_text TEXT,
    author TEXT,
    categories TEXT NOT NULL DEFAULT '[]',
    image_url TEXT,
    published_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (feed_id, guid)
);

CREATE INDEX IF NOT EXISTS idx_items_feed_published ON items(feed_id, published_at, id);

CREATE TABLE IF NOT EXISTS html_cache (
    key TEXT PRIMARY KEY,
    html TEXT NOT NULL,
    final_url TEXT NOT NULL,
    stored_at TEXT NOT NULL
);
"#;

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> HarvestResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> HarvestResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> HarvestResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, HarvestError> {
        self.conn
            .lock()
            .map_err(|_| HarvestError::Database(rusqlite::Error::InvalidQuery))
    }
}
