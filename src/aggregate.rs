use std::cmp::Reverse;

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::committee::CommitteeTable;
use crate::models::{
    CommitteeRollup, Complaint, ComplaintSummary, DailyCount, Priority, PriorityCounts,
    ReportStats, Status, StatusCounts,
};

pub const DAILY_SERIES_DAYS: u64 = 30;
pub const TOP_ENGAGED_LIMIT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Committee,
    Admin,
}

impl ReportScope {
    pub fn recent_limit(self) -> usize {
        match self {
            ReportScope::Committee => 10,
            ReportScope::Admin => 15,
        }
    }
}

pub fn aggregate(
    records: &[Complaint],
    scope: ReportScope,
    table: &CommitteeTable,
    now: DateTime<Utc>,
) -> ReportStats {
    let mut stats = ReportStats {
        total: records.len(),
        by_status: count_statuses(records),
        by_priority: count_priorities(records),
        recent: records
            .iter()
            .take(scope.recent_limit())
            .map(ComplaintSummary::from)
            .collect(),
        top_engaged: top_engaged(records, TOP_ENGAGED_LIMIT),
        ..ReportStats::default()
    };

    if scope == ReportScope::Admin {
        stats.committees = committee_rollup(records, table);
        stats.daily = daily_counts(records, now.date_naive());
    }

    stats
}

fn count_statuses(records: &[Complaint]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for record in records {
        match record.status {
            Status::Pending => counts.pending += 1,
            Status::InProgress => counts.in_progress += 1,
            Status::Resolved => counts.resolved += 1,
            Status::Rejected => counts.rejected += 1,
            Status::Unrecognized(_) => {}
        }
    }
    counts
}

fn count_priorities(records: &[Complaint]) -> PriorityCounts {
    let mut counts = PriorityCounts::default();
    for record in records {
        match record.priority {
            Priority::High => counts.high += 1,
            Priority::Medium => counts.medium += 1,
            Priority::Low => counts.low += 1,
            Priority::Unrecognized(_) => {}
        }
    }
    counts
}

pub fn committee_rollup(records: &[Complaint], table: &CommitteeTable) -> Vec<CommitteeRollup> {
    let committees = table.committees();
    // (total, resolved, pending) per table slot
    let mut tallies = vec![(0usize, 0usize, 0usize); committees.len()];

    for record in records {
        let Some(slot) = table.match_position(&record.category) else {
            continue;
        };
        let tally = &mut tallies[slot];
        tally.0 += 1;
        match record.status {
            Status::Resolved => tally.1 += 1,
            Status::Pending => tally.2 += 1,
            _ => {}
        }
    }

    committees
        .iter()
        .zip(tallies)
        .filter(|(_, (total, _, _))| *total > 0)
        .map(|(committee, (total, resolved, pending))| CommitteeRollup {
            committee: committee.name.clone(),
            total,
            resolved,
            pending,
            resolution_rate: resolution_rate(resolved, total),
        })
        .collect()
}

pub fn resolution_rate(resolved: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (resolved as f64 / total as f64 * 100.0).round() as u32
}

/// One entry per calendar day for the 30 days ending on `today`, oldest first.
pub fn daily_counts(records: &[Complaint], today: NaiveDate) -> Vec<DailyCount> {
    let first_day = today
        .checked_sub_days(Days::new(DAILY_SERIES_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);

    let mut series: Vec<DailyCount> = first_day
        .iter_days()
        .take(DAILY_SERIES_DAYS as usize)
        .map(|day| DailyCount { day, count: 0 })
        .collect();

    for created in records.iter().filter_map(|record| record.created_at) {
        let offset = (created.date_naive() - first_day).num_days();
        if let Ok(index) = usize::try_from(offset) {
            if let Some(entry) = series.get_mut(index) {
                entry.count += 1;
            }
        }
    }

    series
}

pub fn top_engaged(records: &[Complaint], limit: usize) -> Vec<ComplaintSummary> {
    let mut ranked: Vec<&Complaint> = records.iter().collect();
    ranked.sort_by_key(|record| (Reverse(record.upvotes), Reverse(record.created_at)));
    ranked
        .into_iter()
        .take(limit)
        .map(ComplaintSummary::from)
        .collect()
}
