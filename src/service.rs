use std::sync::Arc;

use tracing::info;

use crate::aggregate::{aggregate, ReportScope};
use crate::committee::CommitteeTable;
use crate::config::ReportSettings;
use crate::models::ReportStats;
use crate::pdf::PdfSink;
use crate::report::{format_timestamp, render, RenderError, RenderOutcome, ReportMeta, ReportSink};
use crate::store::ComplaintStore;
use crate::window::{describe_window, window_start, Clock};

pub const COMMITTEE_REPORT_FILENAME: &str = "Committee_Report.pdf";
pub const ADMIN_REPORT_FILENAME: &str = "Admin_Report.pdf";

#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub meta: ReportMeta,
    pub stats: ReportStats,
    pub filename: &'static str,
}

impl PreparedReport {
    pub fn render_into(&self, sink: &mut dyn ReportSink) -> Result<RenderOutcome, RenderError> {
        render(&self.stats, &self.meta, sink)
    }

    pub fn to_pdf(&self) -> Result<Vec<u8>, RenderError> {
        let mut sink = PdfSink::new(&self.meta.title)?;
        self.render_into(&mut sink)?;
        sink.into_bytes()
    }
}

/// Resolve, window, fetch, aggregate. Shared by the HTTP handlers and the CLI.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ComplaintStore>,
    clock: Arc<dyn Clock>,
    committees: Arc<CommitteeTable>,
    settings: ReportSettings,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ComplaintStore>,
        clock: Arc<dyn Clock>,
        committees: Arc<CommitteeTable>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            store,
            clock,
            committees,
            settings,
        }
    }

    pub fn committees(&self) -> &CommitteeTable {
        &self.committees
    }

    /// `Ok(None)` when the label does not name a known committee.
    pub async fn committee_report(&self, label: &str) -> anyhow::Result<Option<PreparedReport>> {
        let Some(committee) = self.committees.resolve(label) else {
            info!(committee = label.trim(), "report requested for unknown committee");
            return Ok(None);
        };
        let slot = self.committees.match_position(&committee.name);

        let now = self.clock.now();
        let since = window_start(now, self.settings.window_days);
        let mut records = self.store.find_created_since(since).await?;
        records.retain(|record| self.committees.match_position(&record.category) == slot);

        info!(
            committee = %committee.name,
            category = %committee.category,
            records = records.len(),
            "building committee report"
        );

        let stats = aggregate(&records, ReportScope::Committee, &self.committees, now);
        Ok(Some(PreparedReport {
            meta: ReportMeta {
                title: "Committee Monthly Analytics Report".to_string(),
                committee: Some(label.trim().to_string()),
                category: Some(committee.category.clone()),
                window: describe_window(self.settings.window_days),
                generated_at: self.timestamp(now),
            },
            stats,
            filename: COMMITTEE_REPORT_FILENAME,
        }))
    }

    pub async fn admin_report(&self) -> anyhow::Result<PreparedReport> {
        let now = self.clock.now();
        let since = window_start(now, self.settings.window_days);
        let records = self.store.find_created_since(since).await?;

        info!(records = records.len(), "building admin report");

        let stats = aggregate(&records, ReportScope::Admin, &self.committees, now);
        Ok(PreparedReport {
            meta: ReportMeta {
                title: "Admin Monthly Analytics Report".to_string(),
                committee: None,
                category: None,
                window: describe_window(self.settings.window_days),
                generated_at: self.timestamp(now),
            },
            stats,
            filename: ADMIN_REPORT_FILENAME,
        })
    }

    fn timestamp(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        format_timestamp(now, self.settings.timezone, self.settings.locale)
    }
}
