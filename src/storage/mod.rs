pub mod traits;
pub mod sqlite;

pub use traits::ItemRepository;
pub use sqlite::{SqliteHtmlCache, SqliteItemRepository, SqliteStorage};
