//! Full-scan reader over a page-bounded record store.

use std::sync::Arc;
use tracing::debug;

use crate::models::{VisitFilter, VisitRecord};
use crate::storage::{Storage, StorageResult};

pub const DEFAULT_PAGE_SIZE: i64 = 1000;

/// Drains the store page by page until a short page signals the end.
///
/// Pages are fetched one after another. The first failing fetch aborts the
/// scan; a partial dataset is never returned.
#[derive(Clone)]
pub struct Pager {
    storage: Arc<dyn Storage>,
    page_size: i64,
}

impl Pager {
    pub fn new(storage: Arc<dyn Storage>, page_size: i64) -> Self {
        Self {
            storage,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub async fn fetch_all(&self, filter: &VisitFilter) -> StorageResult<Vec<VisitRecord>> {
        let mut records = Vec::new();
        let mut cursor: i64 = 0;

        loop {
            let page = self
                .storage
                .fetch_page(filter, cursor * self.page_size, self.page_size)
                .await?;

            let fetched = page.len() as i64;
            records.extend(page);
            cursor += 1;

            if fetched < self.page_size {
                break;
            }
        }

        debug!(pages = cursor, records = records.len(), "pager drained store");
        Ok(records)
    }
}
