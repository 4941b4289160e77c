//! Aggregation engine: cache in front, pager and aggregator behind

use chrono::TimeDelta;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::aggregator;
use crate::analytics::cache::ResultCache;
use crate::analytics::dedup::DedupGuard;
use crate::analytics::pager::Pager;
use crate::analytics::query::{normalize_days, AggregateQuery, StatsPayload};
use crate::analytics::{validate_path, StatsError, StatsResult};
use crate::clock::Clock;
use crate::config::StatsConfig;
use crate::models::{
    DailyStat, NewVisit, PageStats, RecentVisit, RecordOutcome, Summary, VisitFilter,
};
use crate::storage::Storage;

pub const DEFAULT_RECENT_LIMIT: i64 = 100;

pub struct StatsEngine {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    cache: ResultCache<StatsPayload>,
    pager: Pager,
    dedup: DedupGuard,
    top_pages: usize,
    recent_limit: i64,
}

impl StatsEngine {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, config: &StatsConfig) -> Self {
        Self {
            cache: ResultCache::new(
                Arc::clone(&clock),
                config.cache_ttl_secs,
                config.cache_max_entries,
            ),
            pager: Pager::new(Arc::clone(&storage), config.page_size),
            dedup: DedupGuard::new(
                Arc::clone(&storage),
                Arc::clone(&clock),
                config.dedup_window_secs,
            ),
            top_pages: config.top_pages_limit,
            recent_limit: config.recent_visits_limit,
            storage,
            clock,
        }
    }

    /// Engine with the stock limits (1000-row pages, 60 s TTL, 5 min dedup window)
    pub fn with_defaults(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self::new(storage, clock, &StatsConfig::default())
    }

    pub fn cache(&self) -> &ResultCache<StatsPayload> {
        &self.cache
    }

    /// Run any query, going through the cache for the cached families
    pub async fn execute(&self, query: &AggregateQuery) -> StatsResult<StatsPayload> {
        match query {
            AggregateQuery::Summary => self.get_summary().await.map(StatsPayload::Summary),
            AggregateQuery::DailySeries { days } => {
                self.get_daily_stats(*days).await.map(StatsPayload::Daily)
            }
            AggregateQuery::PageViews { path } => {
                self.get_page_stats(path.as_deref()).await.map(Into::into)
            }
            AggregateQuery::RecentVisits { days } => {
                self.get_recent_visits(*days).await.map(StatsPayload::Recent)
            }
        }
    }

    pub async fn get_summary(&self) -> StatsResult<Summary> {
        self.through_cache(
            &AggregateQuery::Summary,
            |payload| match payload {
                StatsPayload::Summary(summary) => Some(summary),
                _ => None,
            },
            StatsPayload::Summary,
            move || async move {
                let records = self.pager.fetch_all(&VisitFilter::all()).await?;
                Ok::<_, StatsError>(aggregator::summarize(&records))
            },
        )
        .await
    }

    /// Most recent `days` rows of the daily rollup. Not cached.
    pub async fn get_daily_stats(&self, days: i64) -> StatsResult<Vec<DailyStat>> {
        let days = normalize_days(Some(days))?;
        Ok(self.storage.fetch_daily_stats(days).await?)
    }

    pub async fn get_page_stats(&self, path: Option<&str>) -> StatsResult<PageStats> {
        match path {
            Some(path) => {
                validate_path(path)?;
                let query = AggregateQuery::PageViews {
                    path: Some(path.to_string()),
                };
                self.through_cache(
                    &query,
                    |payload| match payload {
                        StatsPayload::Page(stat) => Some(PageStats::Single(stat)),
                        _ => None,
                    },
                    StatsPayload::from,
                    move || async move {
                        let filter = VisitFilter::for_path(path);
                        let records = self.pager.fetch_all(&filter).await?;
                        let stat = aggregator::page_stat(path, &records);
                        Ok::<_, StatsError>(PageStats::Single(stat))
                    },
                )
                .await
            }
            None => {
                self.through_cache(
                    &AggregateQuery::PageViews { path: None },
                    |payload| match payload {
                        StatsPayload::Pages(stats) => Some(PageStats::All(stats)),
                        _ => None,
                    },
                    StatsPayload::from,
                    move || async move {
                        let records = self.pager.fetch_all(&VisitFilter::all()).await?;
                        Ok::<_, StatsError>(PageStats::All(aggregator::top_pages(
                            &records,
                            self.top_pages,
                        )))
                    },
                )
                .await
            }
        }
    }

    /// Visits from the trailing `days` days, newest first. Not cached.
    pub async fn get_recent_visits(&self, days: i64) -> StatsResult<Vec<RecentVisit>> {
        let days = normalize_days(Some(days))?;
        let since = (self.clock.now() - TimeDelta::days(days)).timestamp();

        let records = self.storage.fetch_recent(since, self.recent_limit).await?;
        Ok(records.into_iter().map(RecentVisit::from).collect())
    }

    /// Record a page load unless the same visitor hit the same path inside the
    /// dedup window. A suppressed duplicate is a success with `recorded: false`.
    pub async fn record_visit(&self, visit: NewVisit) -> StatsResult<RecordOutcome> {
        validate_path(&visit.path)?;
        if visit.visitor_hash.is_empty() {
            return Err(StatsError::Validation("Visitor hash is required".to_string()));
        }

        if !self
            .dedup
            .should_record(&visit.path, &visit.visitor_hash)
            .await?
        {
            debug!(path = %visit.path, "suppressed repeat visit");
            return Ok(RecordOutcome::duplicate());
        }

        let stored = self.storage.append(&visit).await?;
        Ok(RecordOutcome::recorded(stored.id))
    }

    async fn through_cache<T, Fut>(
        &self,
        query: &AggregateQuery,
        unwrap: impl FnOnce(StatsPayload) -> Option<T>,
        wrap: impl FnOnce(T) -> StatsPayload,
        compute: impl FnOnce() -> Fut,
    ) -> StatsResult<T>
    where
        T: Clone,
        Fut: Future<Output = StatsResult<T>>,
    {
        let key = query.cache_key();

        if let Some(key) = key.as_deref() {
            if let Some(value) = self.cache.get(key).and_then(unwrap) {
                debug!(key, "stats cache hit");
                return Ok(value);
            }
            debug!(key, "stats cache miss");
        }

        let value = compute().await?;
        if let Some(key) = key {
            self.cache.put(key, wrap(value.clone()));
        }
        Ok(value)
    }
}
