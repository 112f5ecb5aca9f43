use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl Priority {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "High" => Priority::High,
            "Medium" => Priority::Medium,
            "Low" => Priority::Low,
            other => Priority::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => f.write_str("High"),
            Priority::Medium => f.write_str("Medium"),
            Priority::Low => f.write_str("Low"),
            Priority::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
    Rejected,
    Unrecognized(String),
}

impl Status {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "pending" => Status::Pending,
            "in-progress" => Status::InProgress,
            "resolved" => Status::Resolved,
            "rejected" => Status::Rejected,
            other => Status::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => f.write_str("pending"),
            Status::InProgress => f.write_str("in-progress"),
            Status::Resolved => f.write_str("resolved"),
            Status::Rejected => f.write_str("rejected"),
            Status::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// A complaint row as the store hands it back, before normalisation.
#[derive(Debug, Clone)]
pub struct ComplaintRow {
    pub title: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub upvote_count: Option<i32>,
    pub upvotes: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Complaint {
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: Option<DateTime<Utc>>,
    /// Retention filters on this column in SQL; only in-process stores read it here.
    #[cfg_attr(not(test), allow(dead_code))]
    pub status_updated_at: Option<DateTime<Utc>>,
    pub upvotes: u32,
}

impl From<ComplaintRow> for Complaint {
    fn from(row: ComplaintRow) -> Self {
        // An explicit count wins over the size of the voter list.
        let upvotes = match row.upvote_count {
            Some(count) => u32::try_from(count).unwrap_or(0),
            None => u32::try_from(row.upvotes.len()).unwrap_or(u32::MAX),
        };

        Complaint {
            title: row.title,
            category: row.category,
            priority: Priority::parse(&row.priority),
            status: Status::parse(&row.status),
            created_at: row.created_at,
            status_updated_at: row.status_updated_at,
            upvotes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeRollup {
    pub committee: String,
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub resolution_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintSummary {
    pub title: String,
    pub priority: String,
    pub status: String,
    pub upvotes: u32,
}

impl From<&Complaint> for ComplaintSummary {
    fn from(complaint: &Complaint) -> Self {
        ComplaintSummary {
            title: complaint.title.clone(),
            priority: complaint.priority.to_string(),
            status: complaint.status.to_string(),
            upvotes: complaint.upvotes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportStats {
    pub total: usize,
    pub by_status: StatusCounts,
    pub by_priority: PriorityCounts,
    pub daily: Vec<DailyCount>,
    pub committees: Vec<CommitteeRollup>,
    pub recent: Vec<ComplaintSummary>,
    pub top_engaged: Vec<ComplaintSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(upvote_count: Option<i32>, voters: usize) -> ComplaintRow {
        ComplaintRow {
            title: "Broken fan".to_string(),
            category: "Hostel Management".to_string(),
            priority: "High".to_string(),
            status: "pending".to_string(),
            created_at: None,
            status_updated_at: None,
            upvote_count,
            upvotes: (0..voters).map(|_| Uuid::new_v4()).collect(),
        }
    }

    #[test]
    fn explicit_upvote_count_wins_over_voter_list() {
        let complaint = Complaint::from(row(Some(7), 2));
        assert_eq!(complaint.upvotes, 7);
    }

    #[test]
    fn voter_list_is_used_when_count_missing() {
        assert_eq!(Complaint::from(row(None, 3)).upvotes, 3);
        assert_eq!(Complaint::from(row(None, 0)).upvotes, 0);
    }

    #[test]
    fn negative_upvote_count_clamps_to_zero() {
        assert_eq!(Complaint::from(row(Some(-4), 5)).upvotes, 0);
    }

    #[test]
    fn unknown_status_and_priority_are_kept_verbatim() {
        let status = Status::parse("archived");
        assert_eq!(status, Status::Unrecognized("archived".to_string()));
        assert_eq!(status.to_string(), "archived");
        assert_eq!(Priority::parse("Urgent").to_string(), "Urgent");
        assert_eq!(Status::parse("in-progress"), Status::InProgress);
    }
}
