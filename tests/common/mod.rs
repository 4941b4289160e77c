//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use footfall::clock::{Clock, ManualClock};
use footfall::models::{DailyStat, NewVisit, VisitFilter, VisitRecord};
use footfall::storage::{SqliteStorage, Storage, StorageError, StorageResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory store that counts page fetches and can fail a chosen fetch
pub struct FakeStorage {
    clock: Arc<dyn Clock>,
    visits: Mutex<Vec<VisitRecord>>,
    daily: Mutex<Vec<DailyStat>>,
    fetch_calls: AtomicUsize,
    page_sizes: Mutex<Vec<usize>>,
    /// 1-based index of the `fetch_page` call that fails
    fail_on_fetch: Option<usize>,
}

impl FakeStorage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            visits: Mutex::new(Vec::new()),
            daily: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
            page_sizes: Mutex::new(Vec::new()),
            fail_on_fetch: None,
        }
    }

    pub fn failing_on_fetch(mut self, call: usize) -> Self {
        self.fail_on_fetch = Some(call);
        self
    }

    /// Insert `count` visits to `path`, one visitor each
    pub fn seed(&self, path: &str, count: usize) {
        let mut visits = self.visits.lock().unwrap();
        let created_at = self.clock.now().timestamp();
        for _ in 0..count {
            let id = visits.len() as i64 + 1;
            visits.push(VisitRecord {
                id,
                path: path.to_string(),
                visitor_hash: format!("visitor-{id}"),
                user_agent: String::new(),
                referrer: None,
                country: "Unknown".to_string(),
                created_at,
            });
        }
    }

    pub fn seed_daily(&self, rows: Vec<DailyStat>) {
        self.daily.lock().unwrap().extend(rows);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn page_sizes(&self) -> Vec<usize> {
        self.page_sizes.lock().unwrap().clone()
    }

    pub fn stored(&self) -> usize {
        self.visits.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn fetch_page(
        &self,
        filter: &VisitFilter,
        offset: i64,
        limit: i64,
    ) -> StorageResult<Vec<VisitRecord>> {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_fetch == Some(call) {
            return Err(StorageError::Other(anyhow::anyhow!(
                "backend unavailable on fetch {call}"
            )));
        }

        let page: Vec<VisitRecord> = self
            .visits
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        self.page_sizes.lock().unwrap().push(page.len());
        Ok(page)
    }

    async fn count(&self, filter: &VisitFilter) -> StorageResult<i64> {
        let visits = self.visits.lock().unwrap();
        Ok(visits.iter().filter(|r| filter.matches(r)).count() as i64)
    }

    async fn append(&self, visit: &NewVisit) -> StorageResult<VisitRecord> {
        let mut visits = self.visits.lock().unwrap();
        let record = VisitRecord {
            id: visits.len() as i64 + 1,
            path: visit.path.clone(),
            visitor_hash: visit.visitor_hash.clone(),
            user_agent: visit.user_agent.clone(),
            referrer: visit.referrer.clone(),
            country: visit.country.clone(),
            created_at: self.clock.now().timestamp(),
        };
        visits.push(record.clone());
        Ok(record)
    }

    async fn fetch_daily_stats(&self, limit: i64) -> StorageResult<Vec<DailyStat>> {
        let mut rows = self.daily.lock().unwrap().clone();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn fetch_recent(&self, since: i64, limit: i64) -> StorageResult<Vec<VisitRecord>> {
        let mut rows: Vec<VisitRecord> = self
            .visits
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_epoch())
}

/// Single-connection in-memory SQLite store driven by `clock`
pub async fn sqlite_storage(clock: Arc<dyn Clock>) -> Arc<SqliteStorage> {
    // Every pooled connection to :memory: is its own database, so keep one
    let storage = SqliteStorage::with_clock("sqlite::memory:", 1, clock)
        .await
        .unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

pub fn visit(path: &str, visitor: &str) -> NewVisit {
    NewVisit::new(path, visitor)
}
