use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{JobRecord, JobStatus};

/// Kind of notification emitted when a job enters a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobCompleted,
    JobFailed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::JobCompleted => write!(f, "job_completed"),
            EventKind::JobFailed => write!(f, "job_failed"),
        }
    }
}

/// A single terminal-state notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event: EventKind,
    pub job_id: String,
    pub filename: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl NotificationEvent {
    fn new(event: EventKind, job_id: &str, filename: Option<&str>, now: DateTime<Utc>) -> Self {
        let name = filename.unwrap_or("unknown");
        let message = match event {
            EventKind::JobCompleted => {
                format!("Audiobook '{name}' has been successfully processed!")
            }
            EventKind::JobFailed => format!("Audiobook '{name}' processing failed!"),
        };
        Self {
            event,
            job_id: job_id.to_string(),
            filename: filename.map(str::to_string),
            timestamp: now,
            message,
        }
    }
}

/// Outcome of comparing the before and after status of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Detection {
    /// The job crossed into a terminal status.
    Notify(NotificationEvent),
    /// Nothing to announce; carries the new status for the caller's log.
    NoAction {
        event: NoActionTag,
        status: Option<JobStatus>,
    },
}

/// Serializes as the literal `"no_action"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoActionTag {
    NoAction,
}

impl Detection {
    fn no_action(status: Option<&JobStatus>) -> Self {
        Detection::NoAction {
            event: NoActionTag::NoAction,
            status: status.cloned(),
        }
    }

    pub fn event(&self) -> Option<&NotificationEvent> {
        match self {
            Detection::Notify(event) => Some(event),
            Detection::NoAction { .. } => None,
        }
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, Detection::NoAction { .. })
    }
}

/// Edge-triggered detector for terminal-status transitions.
///
/// Stateless: the result depends only on the (old, new) pair it is given.
/// Redelivery of an already-seen pair is not filtered here.
pub struct TransitionDetector;

impl TransitionDetector {
    /// Evaluate a status change, stamping any event with the current time.
    pub fn detect(
        job_id: &str,
        old_status: Option<&JobStatus>,
        new_status: Option<&JobStatus>,
        filename: Option<&str>,
    ) -> Detection {
        Self::detect_at(job_id, old_status, new_status, filename, Utc::now())
    }

    /// Same as [`detect`](Self::detect) with an explicit timestamp.
    ///
    /// - `new == completed` and `old != completed` emits `job_completed`.
    /// - otherwise `new == failed` and `old != failed` emits `job_failed`.
    /// - anything else, including `old == new`, is `no_action`.
    pub fn detect_at(
        job_id: &str,
        old_status: Option<&JobStatus>,
        new_status: Option<&JobStatus>,
        filename: Option<&str>,
        now: DateTime<Utc>,
    ) -> Detection {
        let kind = match new_status {
            Some(JobStatus::Completed) if old_status != Some(&JobStatus::Completed) => {
                EventKind::JobCompleted
            }
            Some(JobStatus::Failed) if old_status != Some(&JobStatus::Failed) => {
                EventKind::JobFailed
            }
            _ => return Detection::no_action(new_status),
        };
        Detection::Notify(NotificationEvent::new(kind, job_id, filename, now))
    }

    /// Evaluate a before/after pair of registry snapshots.
    pub fn detect_change(change: &JobChange) -> Detection {
        Self::detect_change_at(change, Utc::now())
    }

    pub fn detect_change_at(change: &JobChange, now: DateTime<Utc>) -> Detection {
        let old_status = change.old.as_ref().and_then(|old| old.status.as_ref());
        Self::detect_at(
            &change.job_id,
            old_status,
            change.new.status.as_ref(),
            change.new.filename.as_deref(),
            now,
        )
    }
}

/// A single record mutation: the snapshot before (absent on creation) and after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobChange {
    pub job_id: String,
    #[serde(default)]
    pub old: Option<JobSnapshot>,
    pub new: JobSnapshot,
}

/// Record fields as seen in a change notification, without the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<&JobRecord> for JobSnapshot {
    fn from(record: &JobRecord) -> Self {
        Self {
            status: record.status.clone(),
            filename: record.filename.clone(),
        }
    }
}

/// Job id from a change subject such as `documents/audiobook_jobs/<id>`.
///
/// Falls back to `"unknown"` when the subject is absent or ends in `/`.
pub fn job_id_from_subject(subject: Option<&str>) -> String {
    subject
        .and_then(|s| s.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
