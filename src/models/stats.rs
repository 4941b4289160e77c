use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::VisitRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_pv: u64,
    pub total_uv: u64,
    pub active_days: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStat {
    pub path: String,
    #[serde(rename = "page_pv")]
    pub page_views: u64,
    #[serde(rename = "page_uv")]
    pub unique_visitors: u64,
}

/// Page statistics for one path, or the top pages across the site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageStats {
    Single(PageStat),
    All(Vec<PageStat>),
}

/// One row of the externally maintained `daily_stats` rollup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyStat {
    pub date: String,
    pub pv: i64,
    pub uv: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentVisit {
    pub path: String,
    pub country: String,
    /// RFC 3339, UTC
    pub created_at: String,
}

impl From<VisitRecord> for RecentVisit {
    fn from(record: VisitRecord) -> Self {
        let created_at = record
            .created_at_utc()
            .map(|ts| ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_else(|| record.created_at.to_string());

        Self {
            path: record.path,
            country: record.country,
            created_at,
        }
    }
}
