use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One observed page load, as stored in the `visits` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VisitRecord {
    pub id: i64,
    pub path: String,
    #[sqlx(rename = "ip_hash")]
    pub visitor_hash: String,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub country: String,
    /// Unix seconds, assigned by the store on insert
    pub created_at: i64,
}

impl VisitRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }

    /// UTC calendar date of the visit
    pub fn created_date(&self) -> Option<NaiveDate> {
        self.created_at_utc().map(|ts| ts.date_naive())
    }
}

/// A visit accepted by the dedup guard and about to be appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisit {
    pub path: String,
    pub visitor_hash: String,
    #[serde(default)]
    pub user_agent: String,
    pub referrer: Option<String>,
    pub country: String,
}

impl NewVisit {
    pub fn new(path: impl Into<String>, visitor_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            visitor_hash: visitor_hash.into(),
            user_agent: String::new(),
            referrer: None,
            country: UNKNOWN_COUNTRY.to_string(),
        }
    }
}

/// Country sentinel used when the edge did not tell us
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Row filter for paged reads of the `visits` table.
///
/// All set fields must match; `since` is an inclusive lower bound on `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitFilter {
    pub path: Option<String>,
    pub visitor_hash: Option<String>,
    pub since: Option<i64>,
}

impl VisitFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn visitor(mut self, visitor_hash: impl Into<String>) -> Self {
        self.visitor_hash = Some(visitor_hash.into());
        self
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, record: &VisitRecord) -> bool {
        self.path.as_deref().is_none_or(|p| p == record.path)
            && self
                .visitor_hash
                .as_deref()
                .is_none_or(|v| v == record.visitor_hash)
            && self.since.is_none_or(|s| record.created_at >= s)
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordVisitRequest {
    pub path: Option<String>,
    pub referrer: Option<String>,
}

/// Result of a visit-recording call. `recorded == false` means the visit was
/// suppressed as a duplicate, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl RecordOutcome {
    pub fn recorded(id: i64) -> Self {
        Self {
            recorded: true,
            id: Some(id),
        }
    }

    pub fn duplicate() -> Self {
        Self {
            recorded: false,
            id: None,
        }
    }
}
