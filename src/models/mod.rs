mod stats;
mod visit;

pub use stats::{DailyStat, PageStat, PageStats, RecentVisit, Summary};
pub use visit::{
    NewVisit, RecordOutcome, RecordVisitRequest, VisitFilter, VisitRecord, UNKNOWN_COUNTRY,
};
