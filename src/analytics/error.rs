use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum StatsError {
    /// Rejected before the store was touched
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StorageError),
}

pub type StatsResult<T> = Result<T, StatsError>;
