mod connection;
mod html_cache;
mod item_repository;

pub use connection::SqliteStorage;
pub use html_cache::SqliteHtmlCache;
pub use item_repository::SqliteItemRepository;
