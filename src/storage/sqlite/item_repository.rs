use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};

use crate::domain::{CandidateItem, StoredItem};
use crate::errors::{HarvestError, HarvestResult};
use crate::pagination::{self, parse_cursor, CursorKind, CursorValue, Page, PageRequest};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::ItemRepository;

const ITEM_COLUMNS: &str = "id, feed_id, guid, title, link, description_html, description_text, \
                            author, categories, image_url, published_at, created_at";

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderColumn {
    PublishedAt,
    Id,
}

impl OrderColumn {
    fn parse(field: &str) -> HarvestResult<Self> {
        match field {
            "published_at" => Ok(OrderColumn::PublishedAt),
            "id" => Ok(OrderColumn::Id),
            other => Err(HarvestError::UnsupportedOrderField(other.to_string())),
        }
    }

    fn column(&self) -> &'static str {
        match self {
            OrderColumn::PublishedAt => "published_at",
            OrderColumn::Id => "id",
        }
    }

    fn kind(&self) -> CursorKind {
        match self {
            OrderColumn::PublishedAt => CursorKind::Timestamp,
            OrderColumn::Id => CursorKind::Int,
        }
    }

    fn value_of(&self, row: &StoredItem) -> CursorValue {
        match self {
            OrderColumn::PublishedAt => CursorValue::Timestamp(row.item.published),
            OrderColumn::Id => CursorValue::Int(row.id),
        }
    }

    fn bind(&self, value: CursorValue) -> Value {
        match value {
            CursorValue::Timestamp(ts) => Value::Text(stored_timestamp(&ts)),
            CursorValue::Int(v) => Value::Integer(v),
            CursorValue::Float(v) => Value::Real(v),
            CursorValue::Text(v) => Value::Text(v),
        }
    }
}

/// Fixed-width UTC form, so text comparison in SQL orders chronologically.
fn stored_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredItem> {
    let categories: String = row.get(8)?;
    let published: String = row.get(10)?;
    let published = DateTime::parse_from_rfc3339(&published)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    let item = CandidateItem::new(row.get(2)?, row.get(3)?, published)
        .with_link(row.get(4)?)
        .with_description(row.get(5)?, row.get(6)?)
        .with_author(row.get(7)?)
        .with_categories(serde_json::from_str(&categories).unwrap_or_default())
        .with_image(row.get(9)?);

    Ok(StoredItem {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        item,
        created_at: row.get(11)?,
    })
}

pub struct SqliteItemRepository {
    storage: SqliteStorage,
}

impl SqliteItemRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl ItemRepository for SqliteItemRepository {
    fn known_guids(&self, feed_id: i64) -> HarvestResult<HashSet<String>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT guid FROM items WHERE feed_id = ?1")?;
        let guids = stmt.query_map([feed_id], |row| row.get(0))?;
        guids.collect::<Result<HashSet<_>, _>>().map_err(HarvestError::from)
    }

    fn insert_candidates(&self, feed_id: i64, items: &[CandidateItem]) -> HarvestResult<usize> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO items (feed_id, guid, title, link, description_html, \
                 description_text, author, categories, image_url, published_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for item in items {
                inserted += stmt.execute((
                    feed_id,
                    &item.guid,
                    &item.title,
                    &item.link,
                    &item.description_html,
                    &item.description_text,
                    &item.author,
                    serde_json::to_string(&item.categories)?,
                    &item.image_url,
                    stored_timestamp(&item.published),
                ))?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn page(&self, feed_id: i64, request: &PageRequest) -> HarvestResult<Page<StoredItem>> {
        pagination::validate_limit(request.limit)?;
        let order = OrderColumn::parse(&request.order_by)?;

        let sort = if request.ascending() { "ASC" } else { "DESC" };
        let mut params: Vec<Value> = vec![Value::Integer(feed_id)];
        let mut filter = String::new();
        if let Some(raw) = request.cursor() {
            let boundary = parse_cursor(raw, order.kind())?;
            let op = if request.ascending() { ">" } else { "<" };
            filter = format!(" AND {} {} ?2", order.column(), op);
            params.push(order.bind(boundary));
        }
        params.push(Value::Integer(request.limit as i64 + 1));

        let sql = format!(
            "SELECT {} FROM items WHERE feed_id = ?1{} ORDER BY {} {}, id {} LIMIT ?{}",
            ITEM_COLUMNS,
            filter,
            order.column(),
            sort,
            sort,
            params.len()
        );

        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pagination::finish_page(rows, request, |row| order.value_of(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn setup_repo() -> SqliteItemRepository {
        SqliteItemRepository::new(SqliteStorage::in_memory().unwrap())
    }

    fn candidate(n: i64) -> CandidateItem {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        CandidateItem::new(format!("guid-{n}"), format!("Item {n}"), start + Duration::minutes(n))
            .with_link(Some(format!("https://example.com/{n}")))
            .with_categories(vec!["news".to_string()])
    }

    fn seeded(count: i64) -> SqliteItemRepository {
        let repo = setup_repo();
        let items: Vec<_> = (1..=count).map(candidate).collect();
        repo.insert_candidates(7, &items).unwrap();
        repo
    }

    fn guids(page: &Page<StoredItem>) -> Vec<String> {
        page.items.iter().map(|i| i.item.guid.clone()).collect()
    }

    #[test]
    fn test_insert_ignores_existing_guids() {
        let repo = setup_repo();
        assert_eq!(repo.insert_candidates(1, &[candidate(1), candidate(2)]).unwrap(), 2);
        assert_eq!(repo.insert_candidates(1, &[candidate(2), candidate(3)]).unwrap(), 1);
        // Same guid under another feed is a different item.
        assert_eq!(repo.insert_candidates(2, &[candidate(1)]).unwrap(), 1);

        let known = repo.known_guids(1).unwrap();
        assert_eq!(known.len(), 3);
        assert!(known.contains("guid-3"));
    }

    #[test]
    fn test_round_trips_item_fields() {
        let repo = seeded(1);
        let page = repo.page(7, &PageRequest::first(5)).unwrap();

        let stored = &page.items[0];
        assert_eq!(stored.feed_id, 7);
        assert_eq!(stored.item, candidate(1));
        assert!(stored.created_at.is_some());
    }

    #[test]
    fn test_pages_backwards_without_overlap() {
        let repo = seeded(30);

        let first = repo.page(7, &PageRequest::first(10)).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].item.guid, "guid-30");
        assert!(first.has_next);
        assert!(!first.has_prev);
        assert_eq!(
            first.next_cursor,
            Some(CursorValue::Timestamp(first.items[9].item.published).encode())
        );

        let cursor = first.next_cursor.clone().unwrap();
        let second = repo.page(7, &PageRequest::before(&cursor, 10)).unwrap();
        assert_eq!(second.items[0].item.guid, "guid-20");
        assert!(guids(&second).iter().all(|g| !guids(&first).contains(g)));
        assert!(second.has_prev);

        let cursor = second.next_cursor.clone().unwrap();
        let third = repo.page(7, &PageRequest::before(&cursor, 10)).unwrap();
        assert_eq!(third.items.len(), 10);
        assert!(!third.has_next);
        assert_eq!(third.next_cursor, None);
    }

    #[test]
    fn test_after_page_is_ascending() {
        let repo = seeded(5);
        let cursor = CursorValue::Timestamp(candidate(2).published).encode();

        let page = repo.page(7, &PageRequest::after(&cursor, 10)).unwrap();
        assert_eq!(guids(&page), vec!["guid-3", "guid-4", "guid-5"]);
        assert!(!page.has_next);
        assert_eq!(
            guids(&page.into_newest_first()),
            vec!["guid-5", "guid-4", "guid-3"]
        );
    }

    #[test]
    fn test_order_by_id() {
        let repo = seeded(5);
        let page = repo
            .page(7, &PageRequest::before("4", 2).ordered_by("id"))
            .unwrap();

        let ids: Vec<i64> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(page.next_cursor.as_deref(), Some("2"));
    }

    #[test]
    fn test_rejects_bad_requests() {
        let repo = seeded(3);
        assert!(matches!(
            repo.page(7, &PageRequest::first(10).ordered_by("title; DROP TABLE items")),
            Err(HarvestError::UnsupportedOrderField(_))
        ));
        assert!(matches!(
            repo.page(7, &PageRequest::before("not-a-date", 10)),
            Err(HarvestError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_other_feeds_are_invisible() {
        let repo = seeded(3);
        let page = repo.page(99, &PageRequest::first(10)).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next);
    }
}
