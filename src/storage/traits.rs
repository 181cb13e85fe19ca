use std::collections::HashSet;

use crate::domain::{CandidateItem, StoredItem};
use crate::errors::HarvestResult;
use crate::pagination::{Page, PageRequest};

#[cfg_attr(test, mockall::automock)]
pub trait ItemRepository: Send + Sync {
    /// Every stable identifier already stored for the feed.
    fn known_guids(&self, feed_id: i64) -> HarvestResult<HashSet<String>>;

    /// Store candidates, ignoring ones whose guid already exists. Returns the number inserted.
    fn insert_candidates(&self, feed_id: i64, items: &[CandidateItem]) -> HarvestResult<usize>;

    fn page(&self, feed_id: i64, request: &PageRequest) -> HarvestResult<Page<StoredItem>>;
}
