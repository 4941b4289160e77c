//! Repeat-visit suppression.
//!
//! A visit is a repeat when the same visitor already has a record for the same
//! path inside the trailing window. The check and the later append are two
//! separate store calls, so two near-simultaneous requests can both pass the
//! check. That over-count is accepted.

use chrono::TimeDelta;
use std::sync::Arc;

use crate::clock::{duration_from_secs, Clock};
use crate::models::VisitFilter;
use crate::storage::{Storage, StorageResult};

pub const DEFAULT_DEDUP_WINDOW_SECS: u64 = 300;

#[derive(Clone)]
pub struct DedupGuard {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    window: TimeDelta,
}

impl DedupGuard {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, window_secs: u64) -> Self {
        Self {
            storage,
            clock,
            window: duration_from_secs(window_secs),
        }
    }

    /// Returns `true` when no record for `(path, visitor_hash)` exists inside the window
    pub async fn should_record(&self, path: &str, visitor_hash: &str) -> StorageResult<bool> {
        let since = self
            .clock
            .now()
            .checked_sub_signed(self.window)
            .map_or(i64::MIN, |t| t.timestamp());
        let filter = VisitFilter::for_path(path)
            .visitor(visitor_hash)
            .since(since);

        let recent = self.storage.fetch_page(&filter, 0, 1).await?;
        Ok(recent.is_empty())
    }
}
