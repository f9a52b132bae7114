use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job as written by the processing pipeline.
///
/// Values outside the four known statuses are kept verbatim in `Other`
/// so that a record with an unexpected status still parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    /// `completed` and `failed` are terminal: no further transition is expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        JobStatus::from(raw.as_str())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job document in the registry.
///
/// Only the fields this crate reasons about are modelled; anything else in
/// the stored document is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, status: Option<JobStatus>) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// One stored output artifact, identified by its full object key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn owner_job_id(&self, namespace: &str) -> Option<&str> {
        owner_job_id(&self.key, namespace)
    }
}

/// Extracts the owning job id from a key shaped `<namespace>/<job_id>/<name>`.
///
/// `namespace` may span several segments (`outputs/v2`) and may or may not end
/// with `/`. Returns `None` when the key lies outside the namespace (including
/// sibling namespaces such as `outputs-archive/` for `outputs`), when the job
/// segment is empty, or when nothing follows it: a file sitting directly under
/// the namespace root has no unambiguous owner.
pub fn owner_job_id<'k>(key: &'k str, namespace: &str) -> Option<&'k str> {
    let namespace = namespace.trim_end_matches('/');
    let rest = key.strip_prefix(namespace)?.strip_prefix('/')?;
    let (owner, _name) = rest.split_once('/')?;
    Some(owner).filter(|owner| !owner.is_empty())
}
