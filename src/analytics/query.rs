//! Normalized statistics requests and their cache keys

use serde::Serialize;

use crate::analytics::{validate_path, StatsError, StatsResult};
use crate::models::{DailyStat, PageStat, PageStats, RecentVisit, Summary};

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateQuery {
    Summary,
    DailySeries { days: i64 },
    PageViews { path: Option<String> },
    RecentVisits { days: i64 },
}

impl AggregateQuery {
    /// Build a query from the raw `type`, `path` and `days` request parameters
    pub fn from_params(
        kind: Option<&str>,
        path: Option<&str>,
        days: Option<i64>,
    ) -> StatsResult<Self> {
        match kind.unwrap_or("summary") {
            "summary" => Ok(Self::Summary),
            "daily" => Ok(Self::DailySeries {
                days: normalize_days(days)?,
            }),
            "page" => {
                let path = match path.filter(|p| !p.is_empty()) {
                    Some(p) => {
                        validate_path(p)?;
                        Some(p.to_string())
                    }
                    None => None,
                };
                Ok(Self::PageViews { path })
            }
            "recent" => Ok(Self::RecentVisits {
                days: normalize_days(days)?,
            }),
            other => Err(StatsError::Validation(format!("Invalid stats type: {other}"))),
        }
    }

    /// Cache key for cached query families; `None` for pass-through reads
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Summary => Some("summary_stats".to_string()),
            Self::PageViews { path: Some(path) } => Some(format!("page_stats_{path}")),
            Self::PageViews { path: None } => Some("all_page_stats".to_string()),
            Self::DailySeries { .. } | Self::RecentVisits { .. } => None,
        }
    }
}

pub fn normalize_days(days: Option<i64>) -> StatsResult<i64> {
    let days = days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(StatsError::Validation(format!(
            "days must be between 1 and {MAX_DAYS}"
        )));
    }
    Ok(days)
}

/// Result of any [`AggregateQuery`], serialized as the bare statistic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatsPayload {
    Summary(Summary),
    Daily(Vec<DailyStat>),
    Page(PageStat),
    Pages(Vec<PageStat>),
    Recent(Vec<RecentVisit>),
}

impl From<PageStats> for StatsPayload {
    fn from(stats: PageStats) -> Self {
        match stats {
            PageStats::Single(stat) => Self::Page(stat),
            PageStats::All(stats) => Self::Pages(stats),
        }
    }
}
