//! Pure aggregation over a fully materialized visit set
//!
//! Every function here takes the complete record slice produced by the
//! [`Pager`](crate::analytics::Pager) and never touches the store, so the
//! counting rules can be tested without a database.

use std::collections::{HashMap, HashSet};

use crate::models::{PageStat, Summary, VisitRecord};

pub const DEFAULT_TOP_PAGES: usize = 50;

/// Site-wide totals: page views, distinct visitors and distinct UTC days
pub fn summarize(records: &[VisitRecord]) -> Summary {
    let visitors: HashSet<&str> = records.iter().map(|r| r.visitor_hash.as_str()).collect();
    let days: HashSet<_> = records.iter().filter_map(VisitRecord::created_date).collect();

    Summary {
        total_pv: records.len() as u64,
        total_uv: visitors.len() as u64,
        active_days: days.len() as u64,
    }
}

/// Views and distinct visitors for a single path
pub fn page_stat(path: &str, records: &[VisitRecord]) -> PageStat {
    let (views, visitors) = records
        .iter()
        .filter(|r| r.path == path)
        .fold((0u64, HashSet::new()), |(views, mut visitors), r| {
            visitors.insert(r.visitor_hash.as_str());
            (views + 1, visitors)
        });

    PageStat {
        path: path.to_string(),
        page_views: views,
        unique_visitors: visitors.len() as u64,
    }
}

/// Per-path group in first-seen order
struct PageGroup<'a> {
    path: &'a str,
    views: u64,
    visitors: HashSet<&'a str>,
}

fn group_by_path(records: &[VisitRecord]) -> Vec<PageGroup<'_>> {
    let (groups, _) = records.iter().fold(
        (Vec::<PageGroup<'_>>::new(), HashMap::<&str, usize>::new()),
        |(mut groups, mut index), record| {
            let slot = *index.entry(record.path.as_str()).or_insert_with(|| {
                groups.push(PageGroup {
                    path: record.path.as_str(),
                    views: 0,
                    visitors: HashSet::new(),
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.views += 1;
            group.visitors.insert(record.visitor_hash.as_str());

            (groups, index)
        },
    );

    groups
}

/// Top pages by views, descending, at most `limit` entries.
///
/// Paths with equal view counts keep the order in which they were first seen.
pub fn top_pages(records: &[VisitRecord], limit: usize) -> Vec<PageStat> {
    let mut stats: Vec<PageStat> = group_by_path(records)
        .into_iter()
        .map(|group| PageStat {
            path: group.path.to_string(),
            page_views: group.views,
            unique_visitors: group.visitors.len() as u64,
        })
        .collect();

    // Stable sort: ties stay in first-seen order
    stats.sort_by(|a, b| b.page_views.cmp(&a.page_views));
    stats.truncate(limit);
    stats
}
