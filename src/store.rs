use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::Complaint;

/// Read and retention access to the complaint collection.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Complaints created at or after `since`, newest first.
    async fn find_created_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Complaint>>;

    /// Deletes resolved or rejected complaints whose status last changed at or
    /// before `cutoff`. Returns how many were removed.
    async fn delete_settled_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use super::*;
    use crate::models::Status;

    #[derive(Default)]
    pub struct MemoryStore {
        complaints: Mutex<Vec<Complaint>>,
        fail_reads: bool,
    }

    impl MemoryStore {
        pub fn new(complaints: Vec<Complaint>) -> Self {
            Self {
                complaints: Mutex::new(complaints),
                fail_reads: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail_reads: true,
                ..Self::default()
            }
        }

        pub fn len(&self) -> usize {
            self.complaints.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ComplaintStore for MemoryStore {
        async fn find_created_since(
            &self,
            since: DateTime<Utc>,
        ) -> anyhow::Result<Vec<Complaint>> {
            if self.fail_reads {
                anyhow::bail!("store unreachable");
            }
            let mut found: Vec<Complaint> = self
                .complaints
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.created_at.is_some_and(|at| at >= since))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(found)
        }

        async fn delete_settled_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
            let mut complaints = self.complaints.lock().unwrap();
            let before = complaints.len();
            complaints.retain(|c| {
                let settled = matches!(c.status, Status::Resolved | Status::Rejected);
                !(settled && c.status_updated_at.is_some_and(|at| at <= cutoff))
            });
            Ok((before - complaints.len()) as u64)
        }
    }
}
