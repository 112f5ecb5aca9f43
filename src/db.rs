use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Complaint, ComplaintRow};
use crate::store::ComplaintStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgComplaintStore {
    pool: PgPool,
}

impl PgComplaintStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintStore for PgComplaintStore {
    async fn find_created_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Complaint>> {
        let rows = sqlx::query(
            r#"
            SELECT title, category, priority, status, created_at,
                   status_updated_at, upvote_count, upvotes
            FROM campus_complaints.complaints
            WHERE created_at >= $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("failed to query complaints in window")?;

        let mut complaints = Vec::with_capacity(rows.len());
        for row in rows {
            let record = ComplaintRow {
                title: row.get("title"),
                category: row.get("category"),
                priority: row.get("priority"),
                status: row.get("status"),
                created_at: row.get("created_at"),
                status_updated_at: row.get("status_updated_at"),
                upvote_count: row.get("upvote_count"),
                upvotes: row.get("upvotes"),
            };
            complaints.push(Complaint::from(record));
        }

        Ok(complaints)
    }

    async fn delete_settled_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM campus_complaints.complaints
            WHERE status IN ('resolved', 'rejected')
              AND status_updated_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("failed to delete settled complaints")?;

        Ok(result.rows_affected())
    }
}

struct NewComplaint<'a> {
    source_key: &'a str,
    title: &'a str,
    category: &'a str,
    priority: &'a str,
    status: &'a str,
    created_at: Option<DateTime<Utc>>,
    status_updated_at: Option<DateTime<Utc>>,
    upvote_count: Option<i32>,
}

/// Returns false when a row with the same `source_key` already exists.
async fn insert_complaint(pool: &PgPool, complaint: NewComplaint<'_>) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO campus_complaints.complaints
        (id, title, category, priority, status, created_at, status_updated_at,
         upvote_count, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(complaint.title)
    .bind(complaint.category)
    .bind(complaint.priority)
    .bind(complaint.status)
    .bind(complaint.created_at)
    .bind(complaint.status_updated_at)
    .bind(complaint.upvote_count)
    .bind(complaint.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let now = Utc::now();
    let complaints = vec![
        ("seed-001", "No hot water in Block B", "Hostel Management", "High", "pending", 2, None, 14),
        ("seed-002", "Wi-Fi drops in reading hall", "Library Services", "Medium", "in-progress", 4, None, 9),
        ("seed-003", "Stale food served at dinner", "Canteen", "High", "resolved", 6, Some(3), 21),
        ("seed-004", "Cafeteria queue management", "Cafeteria Express", "Low", "pending", 1, None, 3),
        ("seed-005", "Bus 12 consistently late", "Transport Services", "Medium", "rejected", 9, Some(7), 5),
        ("seed-006", "Broken projector in LH-2", "Infrastructure & Maintenance", "Medium", "resolved", 12, Some(10), 7),
        ("seed-007", "Exam timetable clash", "Examination Cell", "High", "pending", 3, None, 30),
        ("seed-008", "Old gym equipment", "Sports & Recreation", "Low", "resolved", 45, Some(40), 2),
    ];

    let mut inserted = 0usize;
    for (source_key, title, category, priority, status, age_days, settled_days, upvotes) in
        complaints
    {
        let complaint = NewComplaint {
            source_key,
            title,
            category,
            priority,
            status,
            created_at: Some(now - Duration::days(age_days)),
            status_updated_at: settled_days.map(|days| now - Duration::days(days)),
            upvote_count: Some(upvotes),
        };
        if insert_complaint(pool, complaint).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Accepts RFC 3339 or a plain `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        title: String,
        category: String,
        priority: String,
        status: String,
        #[serde(default)]
        created_at: String,
        #[serde(default)]
        status_updated_at: String,
        upvote_count: Option<i32>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let created_at = parse_timestamp(&row.created_at);
        if created_at.is_none() {
            warn!(line = line + 2, value = %row.created_at, "unparseable created_at, storing NULL");
        }
        let status_updated_at = parse_timestamp(&row.status_updated_at);

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let complaint = NewComplaint {
            source_key: &source_key,
            title: &row.title,
            category: &row.category,
            priority: &row.priority,
            status: &row.status,
            created_at,
            status_updated_at,
            upvote_count: row.upvote_count,
        };
        if insert_complaint(pool, complaint).await? {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "csv import finished");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_plain_timestamps() {
        let expected = Utc.with_ymd_and_hms(2026, 4, 2, 10, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2026-04-02T10:15:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-04-02T15:45:00+05:30"), Some(expected));
        assert_eq!(parse_timestamp(" 2026-04-02 10:15:00 "), Some(expected));
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2026-13-40"), None);
    }
}
