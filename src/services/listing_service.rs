use crate::domain::StoredItem;
use crate::errors::{HarvestError, HarvestResult};
use crate::pagination::{Page, PageRequest};
use crate::storage::traits::ItemRepository;

pub const MAX_PAGE_SIZE: usize = 100;

pub struct ListingService<R: ItemRepository> {
    repository: R,
}

impl<R: ItemRepository> ListingService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// One page of a feed's stored items.
    pub fn page(&self, feed_id: i64, request: &PageRequest) -> HarvestResult<Page<StoredItem>> {
        if request.limit == 0 || request.limit > MAX_PAGE_SIZE {
            return Err(HarvestError::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, request.limit
            )));
        }
        self.repository.page(feed_id, request)
    }
}
