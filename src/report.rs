use std::io::{self, Write};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use crate::models::{ComplaintSummary, ReportStats};

const EMPTY_PLACEHOLDER: &str = "No complaints available";
const DAILY_TREND_DAYS: usize = 10;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("report consumer closed the output")]
    SinkClosed,

    #[error("failed to write report: {0}")]
    Io(#[source] io::Error),

    #[error("pdf backend error: {0}")]
    Pdf(String),
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => RenderError::SinkClosed,
            _ => RenderError::Io(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Aborted,
}

/// Layout primitives a report is written through.
pub trait ReportSink {
    fn title(&mut self, text: &str) -> Result<(), RenderError>;
    fn heading(&mut self, text: &str) -> Result<(), RenderError>;
    fn line(&mut self, text: &str) -> Result<(), RenderError>;
    fn table(&mut self, columns: &[&str], rows: &[Vec<String>]) -> Result<(), RenderError>;
    fn gap(&mut self) -> Result<(), RenderError>;
    fn finish(&mut self) -> Result<(), RenderError>;
}

#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    /// Committee label as the caller supplied it, `None` for the admin report.
    pub committee: Option<String>,
    pub category: Option<String>,
    pub window: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLocale {
    EnUs,
    EnGb,
    EnIn,
    Iso,
}

impl TimestampLocale {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en-us" => TimestampLocale::EnUs,
            "en-gb" => TimestampLocale::EnGb,
            "en-in" => TimestampLocale::EnIn,
            _ => TimestampLocale::Iso,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            TimestampLocale::EnUs => "%m/%d/%Y, %I:%M:%S %p",
            TimestampLocale::EnGb => "%d/%m/%Y, %H:%M:%S",
            TimestampLocale::EnIn => "%d/%m/%Y, %I:%M:%S %P",
            TimestampLocale::Iso => "%Y-%m-%d %H:%M:%S",
        }
    }
}

pub fn format_timestamp(at: DateTime<Utc>, zone: Tz, locale: TimestampLocale) -> String {
    let local = at.with_timezone(&zone);
    format!("{} {}", local.format(locale.pattern()), local.format("%Z"))
}

/// Lays out `stats` in the fixed section order. The sink is always finished,
/// even when sections are empty; a sink whose consumer went away ends the
/// render early without an error.
pub fn render(
    stats: &ReportStats,
    meta: &ReportMeta,
    sink: &mut dyn ReportSink,
) -> Result<RenderOutcome, RenderError> {
    match write_sections(stats, meta, sink).and_then(|()| sink.finish()) {
        Ok(()) => Ok(RenderOutcome::Completed),
        Err(RenderError::SinkClosed) => {
            debug!(title = %meta.title, "report consumer went away, stopping render");
            Ok(RenderOutcome::Aborted)
        }
        Err(err) => Err(err),
    }
}

fn write_sections(
    stats: &ReportStats,
    meta: &ReportMeta,
    sink: &mut dyn ReportSink,
) -> Result<(), RenderError> {
    let is_admin = meta.committee.is_none();

    sink.title(&meta.title)?;
    sink.line(&format!("Committee: {}", meta.committee.as_deref().unwrap_or("Admin")))?;
    if let Some(category) = &meta.category {
        sink.line(&format!("Category Mapped To: {category}"))?;
    }
    sink.line(&format!("Report Range: {}", meta.window))?;
    sink.line(&format!("Created on: {}", meta.generated_at))?;
    sink.gap()?;

    sink.heading("Summary")?;
    sink.line(&format!("Total Complaints: {}", stats.total))?;
    sink.line(&format!("Resolved: {}", stats.by_status.resolved))?;
    sink.line(&format!("Pending: {}", stats.by_status.pending))?;
    sink.line(&format!("In Progress: {}", stats.by_status.in_progress))?;
    sink.line(&format!("Rejected: {}", stats.by_status.rejected))?;
    sink.gap()?;

    sink.heading("Priority Breakdown")?;
    sink.line(&format!("High: {}", stats.by_priority.high))?;
    sink.line(&format!("Medium: {}", stats.by_priority.medium))?;
    sink.line(&format!("Low: {}", stats.by_priority.low))?;
    sink.gap()?;

    if is_admin {
        sink.heading(&format!("Daily Trend (Last {DAILY_TREND_DAYS} Days)"))?;
        let skip = stats.daily.len().saturating_sub(DAILY_TREND_DAYS);
        if stats.daily.is_empty() {
            sink.line(EMPTY_PLACEHOLDER)?;
        }
        for entry in &stats.daily[skip..] {
            sink.line(&format!("{}: {}", entry.day.format("%Y-%m-%d"), entry.count))?;
        }
        sink.gap()?;

        sink.heading("Committee-wise Breakdown")?;
        if stats.committees.is_empty() {
            sink.line(EMPTY_PLACEHOLDER)?;
        } else {
            let rows: Vec<Vec<String>> = stats
                .committees
                .iter()
                .map(|row| {
                    vec![
                        row.committee.clone(),
                        row.total.to_string(),
                        row.resolved.to_string(),
                        row.pending.to_string(),
                        format!("{}%", row.resolution_rate),
                    ]
                })
                .collect();
            sink.table(&["Committee", "Total", "Resolved", "Pending", "Resolution Rate"], &rows)?;
        }
        sink.gap()?;
    }

    sink.heading("Recent Complaints")?;
    write_summaries(sink, &stats.recent, false)?;
    sink.gap()?;

    sink.heading("Top Complaints by Upvotes")?;
    write_summaries(sink, &stats.top_engaged, true)?;

    Ok(())
}

fn write_summaries(
    sink: &mut dyn ReportSink,
    summaries: &[ComplaintSummary],
    show_upvotes: bool,
) -> Result<(), RenderError> {
    if summaries.is_empty() {
        return sink.line(EMPTY_PLACEHOLDER);
    }
    for (idx, summary) in summaries.iter().enumerate() {
        let mut text = format!(
            "{}. {}  [{}]  ({})",
            idx + 1,
            summary.title,
            summary.priority,
            summary.status
        );
        if show_upvotes {
            text.push_str(&format!("  - {} upvotes", summary.upvotes));
        }
        sink.line(&text)?;
    }
    Ok(())
}

/// Markdown rendition of a report, written to any `io::Write`.
pub struct MarkdownSink<W: Write> {
    out: W,
}

impl<W: Write> MarkdownSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for MarkdownSink<W> {
    fn title(&mut self, text: &str) -> Result<(), RenderError> {
        writeln!(self.out, "# {text}")?;
        writeln!(self.out)?;
        Ok(())
    }

    fn heading(&mut self, text: &str) -> Result<(), RenderError> {
        writeln!(self.out, "## {text}")?;
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result<(), RenderError> {
        writeln!(self.out, "- {text}")?;
        Ok(())
    }

    fn table(&mut self, columns: &[&str], rows: &[Vec<String>]) -> Result<(), RenderError> {
        writeln!(self.out, "| {} |", columns.join(" | "))?;
        writeln!(self.out, "|{}", "---|".repeat(columns.len()))?;
        for row in rows {
            writeln!(self.out, "| {} |", row.join(" | "))?;
        }
        Ok(())
    }

    fn gap(&mut self) -> Result<(), RenderError> {
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitteeRollup, DailyCount, StatusCounts};
    use chrono::{Days, NaiveDate, TimeZone};

    fn meta(committee: Option<&str>) -> ReportMeta {
        ReportMeta {
            title: "Committee Monthly Analytics Report".to_string(),
            committee: committee.map(str::to_string),
            category: committee.map(|_| "Hostel Management".to_string()),
            window: "Last 30 Days".to_string(),
            generated_at: "04/30/2026, 12:00:00 PM UTC".to_string(),
        }
    }

    fn summary(title: &str, upvotes: u32) -> ComplaintSummary {
        ComplaintSummary {
            title: title.to_string(),
            priority: "High".to_string(),
            status: "pending".to_string(),
            upvotes,
        }
    }

    fn render_markdown(stats: &ReportStats, meta: &ReportMeta) -> String {
        let mut buf = Vec::new();
        let outcome = render(stats, meta, &mut MarkdownSink::new(&mut buf)).unwrap();
        assert_eq!(outcome, RenderOutcome::Completed);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn committee_report_has_header_and_summary() {
        let stats = ReportStats {
            total: 3,
            by_status: StatusCounts { pending: 1, in_progress: 0, resolved: 2, rejected: 0 },
            recent: vec![summary("Leaking tap", 4)],
            top_engaged: vec![summary("Leaking tap", 4)],
            ..ReportStats::default()
        };
        let text = render_markdown(&stats, &meta(Some("Hostel")));

        assert!(text.starts_with("# Committee Monthly Analytics Report"));
        assert!(text.contains("- Committee: Hostel"));
        assert!(text.contains("- Category Mapped To: Hostel Management"));
        assert!(text.contains("- Total Complaints: 3"));
        assert!(text.contains("- Resolved: 2"));
        assert!(text.contains("- 1. Leaking tap  [High]  (pending)\n"));
        assert!(text.contains("- 1. Leaking tap  [High]  (pending)  - 4 upvotes"));
        assert!(!text.contains("Daily Trend"));
        assert!(!text.contains("Committee-wise"));
    }

    #[test]
    fn empty_sections_render_placeholder() {
        let text = render_markdown(&ReportStats::default(), &meta(Some("Hostel")));
        assert_eq!(text.matches(EMPTY_PLACEHOLDER).count(), 2);
    }

    #[test]
    fn admin_report_shows_last_ten_days_and_committee_table() {
        let first = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let daily = (0..30)
            .map(|offset| DailyCount {
                day: first.checked_add_days(Days::new(offset)).unwrap(),
                count: offset as usize,
            })
            .collect();
        let stats = ReportStats {
            daily,
            committees: vec![CommitteeRollup {
                committee: "Hostel".to_string(),
                total: 3,
                resolved: 2,
                pending: 1,
                resolution_rate: 67,
            }],
            ..ReportStats::default()
        };
        let text = render_markdown(&stats, &meta(None));

        assert!(text.contains("- Committee: Admin"));
        assert!(!text.contains("Category Mapped To"));
        assert!(!text.contains("2026-04-20"));
        assert!(text.contains("- 2026-04-21: 20"));
        assert!(text.contains("- 2026-04-30: 29"));
        assert!(text.contains("| Hostel | 3 | 2 | 1 | 67% |"));
    }

    struct ClosedSink {
        finished: bool,
    }

    impl ReportSink for ClosedSink {
        fn title(&mut self, _: &str) -> Result<(), RenderError> {
            Ok(())
        }
        fn heading(&mut self, _: &str) -> Result<(), RenderError> {
            Err(RenderError::SinkClosed)
        }
        fn line(&mut self, _: &str) -> Result<(), RenderError> {
            Ok(())
        }
        fn table(&mut self, _: &[&str], _: &[Vec<String>]) -> Result<(), RenderError> {
            Ok(())
        }
        fn gap(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
        fn finish(&mut self) -> Result<(), RenderError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn closed_sink_aborts_quietly() {
        let mut sink = ClosedSink { finished: false };
        let outcome = render(&ReportStats::default(), &meta(None), &mut sink).unwrap();
        assert_eq!(outcome, RenderOutcome::Aborted);
        assert!(!sink.finished);
    }

    #[test]
    fn broken_pipe_maps_to_closed_sink() {
        let err = RenderError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, RenderError::SinkClosed));
        let err = RenderError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn timestamps_follow_locale_and_zone() {
        let at = Utc.with_ymd_and_hms(2026, 4, 30, 18, 5, 9).unwrap();
        assert_eq!(
            format_timestamp(at, chrono_tz::UTC, TimestampLocale::EnUs),
            "04/30/2026, 06:05:09 PM UTC"
        );
        assert_eq!(
            format_timestamp(at, chrono_tz::Asia::Kolkata, TimestampLocale::EnIn),
            "30/04/2026, 11:35:09 pm IST"
        );
        assert_eq!(
            format_timestamp(at, chrono_tz::Europe::London, TimestampLocale::EnGb),
            "30/04/2026, 19:05:09 BST"
        );
        assert_eq!(
            format_timestamp(at, chrono_tz::UTC, TimestampLocale::parse("fr_FR")),
            "2026-04-30 18:05:09 UTC"
        );
    }
}
