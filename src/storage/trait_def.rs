use crate::models::{DailyStat, NewVisit, VisitFilter, VisitRecord};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Record store backing the aggregation engine.
///
/// Implementations never retry: a backend fault is returned to the caller as-is.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Read one page of visits matching `filter`, ordered by insertion (`id` ascending)
    async fn fetch_page(
        &self,
        filter: &VisitFilter,
        offset: i64,
        limit: i64,
    ) -> StorageResult<Vec<VisitRecord>>;

    /// Count visits matching `filter` without materializing rows
    async fn count(&self, filter: &VisitFilter) -> StorageResult<i64>;

    /// Append a visit. The store assigns `id` and `created_at`.
    async fn append(&self, visit: &NewVisit) -> StorageResult<VisitRecord>;

    /// Most recent `limit` rows of the `daily_stats` rollup, newest first
    async fn fetch_daily_stats(&self, limit: i64) -> StorageResult<Vec<DailyStat>>;

    /// Visits with `created_at >= since`, newest first, at most `limit` rows
    async fn fetch_recent(&self, since: i64, limit: i64) -> StorageResult<Vec<VisitRecord>>;
}
