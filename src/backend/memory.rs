//! In-process backends holding objects and job records in memory.
//!
//! Both stores paginate like the remote services do and can be told to fail,
//! which lets the reconciler and aggregator be exercised without a network.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::error::BackendError;
use super::{DeleteOutcome, JobPage, JobRegistry, ObjectPage, ObjectStore};
use crate::job::{JobRecord, ObjectEntry};

const DEFAULT_PAGE_SIZE: usize = 1000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_offset(page_token: Option<&str>) -> Result<usize, BackendError> {
    match page_token {
        None => Ok(0),
        Some(token) => token
            .parse()
            .map_err(|_| BackendError::Decode(format!("invalid page token '{token}'"))),
    }
}

fn next_token(offset: usize, taken: usize, total: usize) -> Option<String> {
    let next = offset + taken;
    (next < total).then(|| next.to_string())
}

/// Object store backed by an ordered set of keys.
pub struct MemoryObjectStore {
    keys: Mutex<BTreeSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    listing_error: Mutex<Option<String>>,
    page_size: usize,
    pages_served: AtomicUsize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self {
            keys: Mutex::new(BTreeSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            listing_error: Mutex::new(None),
            page_size: DEFAULT_PAGE_SIZE,
            pages_served: AtomicUsize::new(0),
        }
    }
}

impl MemoryObjectStore {
    pub fn with_objects<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let store = Self::default();
        for key in keys {
            store.insert(key);
        }
        store
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn insert(&self, key: impl Into<String>) {
        lock(&self.keys).insert(key.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }

    /// Snapshot of every stored key, in order.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.keys).iter().cloned().collect()
    }

    /// Make every later delete of `key` fail with [`BackendError::Unavailable`].
    pub fn fail_delete(&self, key: impl Into<String>) {
        lock(&self.failing_deletes).insert(key.into());
    }

    /// Make every later listing fail with [`BackendError::Unavailable`].
    pub fn fail_listing(&self, message: impl Into<String>) {
        *lock(&self.listing_error) = Some(message.into());
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn list_objects_page(
        &self,
        prefix: &str,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, BackendError> {
        if let Some(message) = lock(&self.listing_error).clone() {
            return Err(BackendError::Unavailable(message));
        }
        let offset = parse_offset(page_token)?;
        let keys = lock(&self.keys);
        let matching: Vec<&String> = keys.iter().filter(|k| k.starts_with(prefix)).collect();
        let objects: Vec<ObjectEntry> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|key| ObjectEntry::new(key.as_str()))
            .collect();
        self.pages_served.fetch_add(1, Ordering::SeqCst);
        Ok(ObjectPage {
            next_page_token: next_token(offset, objects.len(), matching.len()),
            objects,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteOutcome, BackendError> {
        if lock(&self.failing_deletes).contains(key) {
            return Err(BackendError::Unavailable(format!("delete of {key} refused")));
        }
        if lock(&self.keys).remove(key) {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }
}

/// Job registry backed by a map from job id to record.
pub struct MemoryJobRegistry {
    jobs: Mutex<BTreeMap<String, JobRecord>>,
    listing_error: Mutex<Option<String>>,
    page_size: usize,
}

impl Default for MemoryJobRegistry {
    fn default() -> Self {
        Self {
            jobs: Mutex::new(BTreeMap::new()),
            listing_error: Mutex::new(None),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MemoryJobRegistry {
    pub fn with_jobs(jobs: impl IntoIterator<Item = JobRecord>) -> Self {
        let registry = Self::default();
        for job in jobs {
            registry.upsert(job);
        }
        registry
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn upsert(&self, job: JobRecord) {
        lock(&self.jobs).insert(job.job_id.clone(), job);
    }

    pub fn remove(&self, job_id: &str) -> Option<JobRecord> {
        lock(&self.jobs).remove(job_id)
    }

    pub fn fail_listing(&self, message: impl Into<String>) {
        *lock(&self.listing_error) = Some(message.into());
    }
}

impl JobRegistry for MemoryJobRegistry {
    async fn list_jobs_page(&self, page_token: Option<&str>) -> Result<JobPage, BackendError> {
        if let Some(message) = lock(&self.listing_error).clone() {
            return Err(BackendError::Unavailable(message));
        }
        let offset = parse_offset(page_token)?;
        let jobs = lock(&self.jobs);
        let page: Vec<JobRecord> = jobs
            .values()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        Ok(JobPage {
            next_page_token: next_token(offset, page.len(), jobs.len()),
            jobs: page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[tokio::test]
    async fn listing_respects_prefix_and_pages() {
        let store =
            MemoryObjectStore::with_objects(["a/j1/x", "a/j2/y", "b/j1/z"]).with_page_size(1);
        let first = store.list_objects_page("a/", None).await.unwrap();
        assert_eq!(first.objects, vec![ObjectEntry::new("a/j1/x")]);
        assert_eq!(first.next_page_token.as_deref(), Some("1"));

        let second = store
            .list_objects_page("a/", first.next_page_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.objects, vec![ObjectEntry::new("a/j2/y")]);
        assert_eq!(second.next_page_token, None);
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let store = MemoryObjectStore::with_objects(["a/j1/x"]);
        assert_eq!(store.delete_object("a/j1/x").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete_object("a/j1/x").await.unwrap(), DeleteOutcome::NotFound);
        assert!(!store.contains("a/j1/x"));
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MemoryObjectStore::with_objects(["a/j1/x"]);
        store.fail_delete("a/j1/x");
        assert!(matches!(
            store.delete_object("a/j1/x").await,
            Err(BackendError::Unavailable(_))
        ));
        assert!(store.contains("a/j1/x"));

        store.fail_listing("bucket offline");
        assert!(store.list_objects("a/").await.is_err());
    }

    #[tokio::test]
    async fn bad_page_token_is_rejected() {
        let registry = MemoryJobRegistry::default();
        assert!(matches!(
            registry.list_jobs_page(Some("abc")).await,
            Err(BackendError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn registry_streams_all_pages() {
        let registry = MemoryJobRegistry::with_jobs(
            (0..7).map(|i| JobRecord::new(format!("j{i}"), Some(JobStatus::Pending))),
        )
        .with_page_size(3);
        let jobs = registry.stream_jobs().await.unwrap();
        assert_eq!(jobs.len(), 7);

        registry.remove("j3");
        let ids = registry.list_job_ids().await.unwrap();
        assert_eq!(ids.len(), 6);
        assert!(!ids.contains("j3"));
    }
}
