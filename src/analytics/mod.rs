//! Visit aggregation engine
//!
//! Stats requests go through a short-TTL [`ResultCache`]; on a miss the
//! [`Pager`] materializes the matching visits and the [`aggregator`] folds
//! them into counts. Visit recording skips the cache and goes through the
//! [`DedupGuard`] before appending.

pub mod aggregator;
pub mod cache;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod ip_extractor;
pub mod pager;
pub mod query;
pub mod validation;
pub mod visitor;

pub use cache::ResultCache;
pub use dedup::DedupGuard;
pub use engine::StatsEngine;
pub use error::{StatsError, StatsResult};
pub use ip_extractor::extract_client_ip;
pub use pager::Pager;
pub use query::{AggregateQuery, StatsPayload};
pub use validation::validate_path;
pub use visitor::{country_from_headers, hash_visitor};
