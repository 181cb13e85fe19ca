//! Stateless bidirectional cursor pagination.
//!
//! With no cursor, the newest `limit` rows are returned (descending). With a
//! cursor, `Before` returns rows strictly less than it (descending) and
//! `After` rows strictly greater (ascending, so callers showing newest first
//! reverse that batch, see [`Page::into_newest_first`]). Rows with equal
//! ordering values are ordered by id in the same direction.

pub mod cursor;

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::StoredItem;
use crate::errors::{HarvestError, HarvestResult};

pub use cursor::{parse_cursor, CursorKind, CursorValue};

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_ORDER_FIELD: &str = "published_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Strictly older/lesser than the cursor.
    #[default]
    Before,
    /// Strictly newer/greater than the cursor.
    After,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Before => "before",
            Direction::After => "after",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "before" => Ok(Direction::Before),
            "after" => Ok(Direction::After),
            other => Err(HarvestError::InvalidInput(format!(
                "direction must be 'before' or 'after', got '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub order_by: String,
    pub limit: usize,
    pub cursor: Option<String>,
    pub direction: Direction,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            order_by: DEFAULT_ORDER_FIELD.to_string(),
            limit: DEFAULT_LIMIT,
            cursor: None,
            direction: Direction::Before,
        }
    }
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn before(cursor: &str, limit: usize) -> Self {
        Self {
            limit,
            cursor: Some(cursor.to_string()),
            direction: Direction::Before,
            ..Self::default()
        }
    }

    pub fn after(cursor: &str, limit: usize) -> Self {
        Self {
            limit,
            cursor: Some(cursor.to_string()),
            direction: Direction::After,
            ..Self::default()
        }
    }

    pub fn ordered_by(mut self, field: &str) -> Self {
        self.order_by = field.to_string();
        self
    }

    /// Blank cursors count as absent.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Scan direction actually used: descending unless paging `After` a cursor.
    pub fn ascending(&self) -> bool {
        self.cursor().is_some() && self.direction == Direction::After
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    pub next_cursor: Option<String>,
    pub has_prev: bool,
    pub prev_cursor: Option<String>,
    /// `After` pages are in ascending order.
    pub direction: Direction,
}

impl<T> Page<T> {
    /// Reorder an `After` batch newest-first. Cursors keep their meaning.
    pub fn into_newest_first(mut self) -> Self {
        if self.direction == Direction::After {
            self.items.reverse();
        }
        self
    }
}

/// A row that can be ordered by named fields.
pub trait Orderable {
    /// Value of `field` for this row, or `None` if the field is not orderable.
    fn order_value(&self, field: &str) -> Option<CursorValue>;

    /// Secondary key for rows with equal field values.
    fn tie_breaker(&self) -> i64;
}

impl Orderable for StoredItem {
    fn order_value(&self, field: &str) -> Option<CursorValue> {
        match field {
            "published_at" => Some(CursorValue::Timestamp(self.item.published)),
            "id" => Some(CursorValue::Int(self.id)),
            "title" => Some(CursorValue::Text(self.item.title.clone())),
            _ => None,
        }
    }

    fn tie_breaker(&self) -> i64 {
        self.id
    }
}

/// Turn a probe batch (up to `limit + 1` rows, already filtered and ordered)
/// into a page. Shared by the in-memory and SQL paths.
pub fn finish_page<T, F>(mut rows: Vec<T>, request: &PageRequest, value_of: F) -> Page<T>
where
    F: Fn(&T) -> CursorValue,
{
    let has_next = rows.len() > request.limit;
    rows.truncate(request.limit);

    let has_prev = request.cursor().is_some();
    let next_cursor = if has_next {
        rows.last().map(|row| value_of(row).encode())
    } else {
        None
    };
    let prev_cursor = if has_prev {
        rows.first().map(|row| value_of(row).encode())
    } else {
        None
    };

    Page {
        items: rows,
        has_next,
        next_cursor,
        has_prev,
        prev_cursor,
        direction: if request.ascending() {
            Direction::After
        } else {
            Direction::Before
        },
    }
}

pub(crate) fn validate_limit(limit: usize) -> HarvestResult<()> {
    if limit == 0 {
        return Err(HarvestError::InvalidInput(
            "limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Paginate an in-memory collection.
pub fn paginate<T>(rows: &[T], request: &PageRequest) -> HarvestResult<Page<T>>
where
    T: Orderable + Clone,
{
    validate_limit(request.limit)?;

    let field = request.order_by.as_str();
    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let value = row
            .order_value(field)
            .ok_or_else(|| HarvestError::UnsupportedOrderField(field.to_string()))?;
        keyed.push((value, row));
    }

    let boundary = match (request.cursor(), keyed.first()) {
        (Some(raw), Some((sample, _))) => Some(parse_cursor(raw, sample.kind())?),
        _ => None,
    };

    let wanted = if request.ascending() {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    if let Some(boundary) = &boundary {
        keyed.retain(|(value, _)| value.compare(boundary) == Some(wanted));
    }

    keyed.sort_by(|(a, row_a), (b, row_b)| {
        let by_value = a
            .compare(b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| row_a.tie_breaker().cmp(&row_b.tie_breaker()));
        if request.ascending() {
            by_value
        } else {
            by_value.reverse()
        }
    });

    let probe: Vec<(CursorValue, T)> = keyed
        .into_iter()
        .take(request.limit + 1)
        .map(|(value, row)| (value, row.clone()))
        .collect();

    let page = finish_page(probe, request, |(value, _)| value.clone());
    Ok(Page {
        items: page.items.into_iter().map(|(_, row)| row).collect(),
        has_next: page.has_next,
        next_cursor: page.next_cursor,
        has_prev: page.has_prev,
        prev_cursor: page.prev_cursor,
        direction: page.direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CandidateItem;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;

    /// 30 items, id 1 oldest .. id 30 newest, one hour apart.
    fn items() -> Vec<StoredItem> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (1..=30)
            .map(|id| StoredItem {
                id,
                feed_id: 1,
                item: CandidateItem::new(
                    format!("g{id}"),
                    format!("Item {id}"),
                    start + Duration::hours(id),
                ),
                created_at: None,
            })
            .collect()
    }

    fn ids(page: &Page<StoredItem>) -> Vec<i64> {
        page.items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_first_page_then_before_cursor() {
        let rows = items();

        let first = paginate(&rows, &PageRequest::first(10)).unwrap();
        assert_eq!(ids(&first), (21..=30).rev().collect::<Vec<_>>());
        assert!(first.has_next);
        assert!(!first.has_prev);
        let tenth = &first.items[9];
        assert_eq!(
            first.next_cursor.as_deref(),
            Some(CursorValue::Timestamp(tenth.item.published).encode().as_str())
        );

        let cursor = first.next_cursor.clone().unwrap();
        let second = paginate(&rows, &PageRequest::before(&cursor, 10)).unwrap();
        assert_eq!(ids(&second), (11..=20).rev().collect::<Vec<_>>());
        assert!(second.has_prev);
        assert!(second.has_next);

        let first_ids: HashSet<i64> = ids(&first).into_iter().collect();
        assert!(ids(&second).iter().all(|id| !first_ids.contains(id)));
        assert!(second
            .items
            .iter()
            .all(|i| i.item.published < tenth.item.published));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let rows = items();
        let cursor = CursorValue::Timestamp(rows[4].item.published).encode();
        let page = paginate(&rows, &PageRequest::before(&cursor, 10)).unwrap();

        assert_eq!(ids(&page), vec![4, 3, 2, 1]);
        assert!(!page.has_next);
        assert_eq!(page.next_cursor, None);
        assert!(page.has_prev);
    }

    #[test]
    fn test_after_is_ascending_until_reversed() {
        let rows = items();
        let cursor = CursorValue::Timestamp(rows[9].item.published).encode();
        let page = paginate(&rows, &PageRequest::after(&cursor, 3)).unwrap();

        assert_eq!(page.direction, Direction::After);
        assert_eq!(ids(&page), vec![11, 12, 13]);
        assert!(page.has_next);
        assert_eq!(
            page.prev_cursor,
            Some(CursorValue::Timestamp(rows[10].item.published).encode())
        );

        let display = page.into_newest_first();
        assert_eq!(ids(&display), vec![13, 12, 11]);
    }

    #[test]
    fn test_ties_break_on_id() {
        let mut rows = items();
        let same = rows[0].item.published;
        for row in rows.iter_mut() {
            row.item.published = same;
        }

        let page = paginate(&rows, &PageRequest::first(3)).unwrap();
        assert_eq!(ids(&page), vec![30, 29, 28]);
    }

    #[test]
    fn test_order_by_id_and_title() {
        let rows = items();
        let page = paginate(&rows, &PageRequest::before("5", 10).ordered_by("id")).unwrap();
        assert_eq!(ids(&page), vec![4, 3, 2, 1]);

        let page = paginate(&rows, &PageRequest::first(2).ordered_by("title")).unwrap();
        assert_eq!(ids(&page), vec![9, 8]);
    }

    #[test]
    fn test_rejects_unknown_field_bad_cursor_and_zero_limit() {
        let rows = items();
        assert!(matches!(
            paginate(&rows, &PageRequest::first(10).ordered_by("color")),
            Err(HarvestError::UnsupportedOrderField(_))
        ));
        assert!(matches!(
            paginate(&rows, &PageRequest::before("yesterday", 10)),
            Err(HarvestError::InvalidCursor(_))
        ));
        assert!(paginate(&rows, &PageRequest::first(0)).is_err());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("AFTER".parse::<Direction>().unwrap(), Direction::After);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
