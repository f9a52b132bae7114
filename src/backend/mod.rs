//! Capability interfaces to the object store and the job registry.
//!
//! Both traits expose a single-page primitive that backends implement and a
//! provided method that drains every page. Callers that compute set
//! differences must use the draining form: a partial listing would make
//! live objects look orphaned.

pub mod error;
pub mod firestore;
pub mod gcs;
pub mod memory;
pub mod types;

use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, Url};

use crate::job::{JobRecord, ObjectEntry};

pub use error::BackendError;
pub use firestore::FirestoreRegistry;
pub use gcs::GcsObjectStore;
pub use memory::{MemoryJobRegistry, MemoryObjectStore};

/// One page of an object listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectEntry>,
    pub next_page_token: Option<String>,
}

/// One page of a registry scan.
#[derive(Debug, Clone, Default)]
pub struct JobPage {
    pub jobs: Vec<JobRecord>,
    pub next_page_token: Option<String>,
}

/// Result of a successful delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The object was already gone (for instance removed by an overlapping run).
    NotFound,
}

#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn list_objects_page(
        &self,
        prefix: &str,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, BackendError>;

    async fn delete_object(&self, key: &str) -> Result<DeleteOutcome, BackendError>;

    /// Every object under `prefix`, following page tokens to the end.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, BackendError> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_objects_page(prefix, token.as_deref()).await?;
            objects.extend(page.objects);
            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(objects)
    }
}

#[allow(async_fn_in_trait)]
pub trait JobRegistry {
    async fn list_jobs_page(&self, page_token: Option<&str>) -> Result<JobPage, BackendError>;

    /// Every job record in the registry.
    async fn stream_jobs(&self) -> Result<Vec<JobRecord>, BackendError> {
        let mut jobs = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_jobs_page(token.as_deref()).await?;
            jobs.extend(page.jobs);
            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(jobs)
    }

    /// Ids of every job currently in the registry. An empty registry yields an empty set.
    async fn list_job_ids(&self) -> Result<HashSet<String>, BackendError> {
        let jobs = self.stream_jobs().await?;
        Ok(jobs.into_iter().map(|job| job.job_id).collect())
    }
}

/// HTTP client shared by the Google Cloud backends.
pub(crate) fn http_client() -> Result<Client, BackendError> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()?;
    Ok(client)
}

/// Appends percent-encoded path segments to `base`.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, BackendError> {
    let mut url = Url::parse(base).map_err(|e| BackendError::InvalidUrl(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| BackendError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turns a non-success response into [`BackendError::Status`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}
