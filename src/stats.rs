use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::JobRegistry;
use crate::error::KeeperError;
use crate::job::JobStatus;

/// Per-status tallies for the four recognised statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub processing: usize,
    pub failed: usize,
    pub pending: usize,
}

impl StatusCounts {
    /// Count one record. Absent or unrecognised statuses are not attributed.
    pub fn record(&mut self, status: Option<&JobStatus>) {
        match status {
            Some(JobStatus::Completed) => self.completed += 1,
            Some(JobStatus::Processing) => self.processing += 1,
            Some(JobStatus::Failed) => self.failed += 1,
            Some(JobStatus::Pending) => self.pending += 1,
            Some(JobStatus::Other(_)) | None => {}
        }
    }

    pub fn sum(&self) -> usize {
        self.completed + self.processing + self.failed + self.pending
    }
}

/// Snapshot of job counts at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    /// Every scanned record, attributed to a bucket or not.
    pub total_jobs: usize,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub timestamp: DateTime<Utc>,
}

impl StatsReport {
    /// Records whose status fell outside the recognised buckets.
    pub fn unattributed(&self) -> usize {
        self.total_jobs - self.counts.sum()
    }
}

/// Read-only tally of job records by status.
pub struct StatsAggregator<'a, R> {
    registry: &'a R,
}

impl<'a, R: JobRegistry> StatsAggregator<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    pub async fn aggregate(&self) -> Result<StatsReport, KeeperError> {
        self.aggregate_at(Utc::now()).await
    }

    pub async fn aggregate_at(&self, now: DateTime<Utc>) -> Result<StatsReport, KeeperError> {
        let jobs = self.registry.stream_jobs().await?;
        let mut counts = StatusCounts::default();
        for job in &jobs {
            counts.record(job.status.as_ref());
        }
        let report = StatsReport {
            total_jobs: jobs.len(),
            counts,
            timestamp: now,
        };
        tracing::info!(
            total = report.total_jobs,
            unattributed = report.unattributed(),
            "Aggregated job statistics"
        );
        Ok(report)
    }
}
