use crate::clock::{Clock, SystemClock};
use crate::models::{DailyStat, NewVisit, VisitFilter, VisitRecord};
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;

const VISIT_COLUMNS: &str = "id, path, ip_hash, user_agent, referrer, country, created_at";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
    clock: Arc<dyn Clock>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::with_clock(database_url, max_connections, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(
        database_url: &str,
        max_connections: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            clock,
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a VisitFilter) {
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
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visits (
                id BIGSERIAL PRIMARY KEY,
                path TEXT NOT NULL,
                ip_hash TEXT NOT NULL,
                user_agent TEXT NOT NULL DEFAULT '',
                referrer TEXT,
                country TEXT NOT NULL DEFAULT 'Unknown',
                created_at BIGINT NOT NULL
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

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_stats (
                date TEXT PRIMARY KEY,
                pv BIGINT NOT NULL DEFAULT 0,
                uv BIGINT NOT NULL DEFAULT 0
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
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {VISIT_COLUMNS} FROM visits"));
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
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM visits");
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
            VALUES ($1, $2, $3, $4, $5, $6)
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
            LIMIT $1
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
            WHERE created_at >= $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }
}
