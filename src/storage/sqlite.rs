use crate::clock::{Clock, SystemClock};
use crate::models::{DailyStat, NewVisit, VisitFilter, VisitRecord};
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const VISIT_COLUMNS: &str = "id, path, ip_hash, user_agent, referrer, country, created_at";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::with_clock(database_url, max_connections, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(
        database_url: &str,
        max_connections: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            clock,
        })
    }

    /// Underlying pool, for the rollup job and tests that seed `daily_stats`
    pub fn pool(&self) -> &SqlitePool {
        self.pool.as_ref()
    }
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a VisitFilter) {
    let mut separator = " WHERE ";

    if let Some(path) = filter.path.as_deref() {
        builder.push(separator).push("path = ").push_bind(path);
        separator = " AND ";
    }
    if let Some(visitor_hash) = filter.visitor_hash.as_deref() {
        builder.push(separator).push("ip_hash = ").push_bind(visitor_hash);
        separator = " AND ";
    }
    if let Some(since) = filter.since {
        builder.push(separator).push("created_at >= ").push_bind(since);
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL,
                ip_hash TEXT NOT NULL,
                user_agent TEXT NOT NULL DEFAULT '',
                referrer TEXT,
                country TEXT NOT NULL DEFAULT 'Unknown',
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_visits_path_hash ON visits(path, ip_hash, created_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_visits_created_at ON visits(created_at)")
            .execute(self.pool.as_ref())
            .await?;

        // Filled by the external rollup job
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_stats (
                date TEXT PRIMARY KEY,
                pv INTEGER NOT NULL DEFAULT 0,
                uv INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn fetch_page(
        &self,
        filter: &VisitFilter,
        offset: i64,
        limit: i64,
    ) -> StorageResult<Vec<VisitRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {VISIT_COLUMNS} FROM visits"));
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<VisitRecord>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows)
    }

    async fn count(&self, filter: &VisitFilter) -> StorageResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM visits");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn append(&self, visit: &NewVisit) -> StorageResult<VisitRecord> {
        let created_at = self.clock.now().timestamp();

        let record = sqlx::query_as::<_, VisitRecord>(&format!(
            r#"
            INSERT INTO visits (path, ip_hash, user_agent, referrer, country, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(&visit.path)
        .bind(&visit.visitor_hash)
        .bind(&visit.user_agent)
        .bind(visit.referrer.as_deref())
        .bind(&visit.country)
        .bind(created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn fetch_daily_stats(&self, limit: i64) -> StorageResult<Vec<DailyStat>> {
        let rows = sqlx::query_as::<_, DailyStat>(
            r#"
            SELECT date, pv, uv
            FROM daily_stats
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn fetch_recent(&self, since: i64, limit: i64) -> StorageResult<Vec<VisitRecord>> {
        let rows = sqlx::query_as::<_, VisitRecord>(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM visits
            WHERE created_at >= ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }
}
