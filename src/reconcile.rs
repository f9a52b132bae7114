use serde::Serialize;

use crate::backend::{DeleteOutcome, JobRegistry, ObjectStore};
use crate::error::KeeperError;
use crate::report::RunReport;

pub const DEFAULT_PREFIX: &str = "audiobooks/";
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// Knobs for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Namespace under which job outputs are stored, e.g. `audiobooks/`.
    pub prefix: String,
    /// Maximum number of deleted keys echoed back in the summary.
    pub sample_limit: usize,
    /// Report orphans without deleting them.
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            dry_run: false,
        }
    }
}

impl ReconcileOptions {
    /// The prefix as a listing namespace: non-empty segments ending in `/`.
    ///
    /// A missing trailing slash is added so that `outputs` never lists the
    /// sibling namespace `outputs-archive/`.
    pub fn namespace(&self) -> Result<String, KeeperError> {
        let trimmed = self.prefix.trim_end_matches('/');
        if trimmed.is_empty() || trimmed.split('/').any(|segment| segment.trim().is_empty()) {
            return Err(KeeperError::Config(format!(
                "invalid prefix {:?}: expected `<namespace>/`, e.g. `audiobooks/`",
                self.prefix
            )));
        }
        Ok(format!("{trimmed}/"))
    }
}

/// An orphan that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub key: String,
    pub error: String,
}

/// What a reconciliation pass found and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub valid_jobs: usize,
    pub orphaned_files_deleted: usize,
    /// First keys deleted (or, on a dry run, that would be deleted).
    pub deleted_files: Vec<String>,
    pub orphans_found: usize,
    pub skipped_malformed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_deletions: Vec<FailedDeletion>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl ReconcileSummary {
    fn new(valid_jobs: usize, dry_run: bool) -> Self {
        Self {
            valid_jobs,
            orphaned_files_deleted: 0,
            deleted_files: Vec::new(),
            orphans_found: 0,
            skipped_malformed: 0,
            failed_deletions: Vec::new(),
            dry_run,
        }
    }

    fn record_deleted(&mut self, key: &str, sample_limit: usize) {
        self.orphaned_files_deleted += 1;
        if self.deleted_files.len() < sample_limit {
            self.deleted_files.push(key.to_string());
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_deletions.is_empty()
    }

    /// A pass with any failed deletion is an error, never a success.
    pub fn into_report(self) -> RunReport<Self> {
        if self.is_success() {
            return RunReport::Success(self);
        }
        RunReport::Error {
            message: format!(
                "{} of {} orphaned objects could not be deleted",
                self.failed_deletions.len(),
                self.orphans_found
            ),
            details: Some(self),
        }
    }
}

/// Removes stored objects whose owning job is no longer in the registry.
pub struct Reconciler<'a, S, R> {
    store: &'a S,
    registry: &'a R,
    options: ReconcileOptions,
}

impl<'a, S: ObjectStore, R: JobRegistry> Reconciler<'a, S, R> {
    pub fn new(store: &'a S, registry: &'a R, options: ReconcileOptions) -> Self {
        Self {
            store,
            registry,
            options,
        }
    }

    /// Run one pass: a full registry scan, a full store scan, then deletes.
    ///
    /// Listing failures abort before anything is deleted. Delete failures are
    /// collected in the summary and the pass moves on to the next object.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, KeeperError> {
        let namespace = self.options.namespace()?;
        let valid = self.registry.list_job_ids().await?;
        tracing::info!(valid_jobs = valid.len(), "Loaded job registry");

        let objects = self.store.list_objects(&namespace).await?;
        tracing::info!(
            objects = objects.len(),
            prefix = %namespace,
            "Listed stored objects"
        );

        let mut summary = ReconcileSummary::new(valid.len(), self.options.dry_run);
        for object in &objects {
            let Some(owner) = object.owner_job_id(&namespace) else {
                tracing::debug!(key = %object.key, "Skipping key without job owner");
                summary.skipped_malformed += 1;
                continue;
            };
            if valid.contains(owner) {
                continue;
            }

            summary.orphans_found += 1;
            if self.options.dry_run {
                tracing::info!(key = %object.key, job_id = owner, "Orphan found (dry run)");
                summary.record_deleted(&object.key, self.options.sample_limit);
                continue;
            }

            match self.store.delete_object(&object.key).await {
                Ok(DeleteOutcome::Deleted) => {
                    tracing::info!(key = %object.key, job_id = owner, "Deleted orphaned object");
                    summary.record_deleted(&object.key, self.options.sample_limit);
                }
                Ok(DeleteOutcome::NotFound) => {
                    tracing::debug!(key = %object.key, "Orphan already removed");
                    summary.record_deleted(&object.key, self.options.sample_limit);
                }
                Err(e) => {
                    tracing::warn!(key = %object.key, error = %e, "Failed to delete orphan");
                    summary.failed_deletions.push(FailedDeletion {
                        key: object.key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            valid_jobs = summary.valid_jobs,
            deleted = summary.orphaned_files_deleted,
            failed = summary.failed_deletions.len(),
            skipped = summary.skipped_malformed,
            "Reconciliation finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryJobRegistry, MemoryObjectStore, ObjectPage};
    use crate::job::{JobRecord, JobStatus, ObjectEntry};

    fn registry(ids: &[&str]) -> MemoryJobRegistry {
        MemoryJobRegistry::with_jobs(
            ids.iter()
                .map(|id| JobRecord::new(*id, Some(JobStatus::Processing))),
        )
    }

    fn options(prefix: &str) -> ReconcileOptions {
        ReconcileOptions {
            prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deletes_only_orphans() {
        let registry = registry(&["j1", "j2"]);
        let store = MemoryObjectStore::with_objects([
            "outputs/j1/a.wav",
            "outputs/j3/b.wav",
            "outputs/x",
        ]);

        let summary = Reconciler::new(&store, &registry, options("outputs/"))
            .reconcile()
            .await
            .unwrap();

        assert_eq!(summary.valid_jobs, 2);
        assert_eq!(summary.orphaned_files_deleted, 1);
        assert_eq!(summary.deleted_files, vec!["outputs/j3/b.wav"]);
        assert_eq!(summary.skipped_malformed, 1);
        assert!(summary.is_success());
        assert_eq!(store.keys(), vec!["outputs/j1/a.wav", "outputs/x"]);
    }

    #[tokio::test]
    async fn second_run_deletes_nothing() {
        let registry = registry(&["j1"]);
        let store = MemoryObjectStore::with_objects([
            "audiobooks/j1/a.wav",
            "audiobooks/j2/b.wav",
            "audiobooks/j2/c.wav",
        ]);
        let reconciler = Reconciler::new(&store, &registry, ReconcileOptions::default());

        let first = reconciler.reconcile().await.unwrap();
        assert_eq!(first.orphaned_files_deleted, 2);

        let second = reconciler.reconcile().await.unwrap();
        assert_eq!(second.orphaned_files_deleted, 0);
        assert!(second.deleted_files.is_empty());
        assert_eq!(store.keys(), vec!["audiobooks/j1/a.wav"]);
    }

    #[tokio::test]
    async fn empty_registry_orphans_everything_well_formed() {
        let registry = MemoryJobRegistry::default();
        let store = MemoryObjectStore::with_objects([
            "audiobooks/j1/a.wav",
            "audiobooks/j2/b.wav",
            "audiobooks//c.wav",
        ]);

        let summary = Reconciler::new(&store, &registry, ReconcileOptions::default())
            .reconcile()
            .await
            .unwrap();
        assert_eq!(summary.valid_jobs, 0);
        assert_eq!(summary.orphaned_files_deleted, 2);
        assert_eq!(store.keys(), vec!["audiobooks//c.wav"]);
    }

    #[tokio::test]
    async fn sample_is_bounded() {
        let registry = registry(&[]);
        let store = MemoryObjectStore::with_objects(
            (0..25).map(|i| format!("audiobooks/gone-{i:02}/part.wav")),
        )
        .with_page_size(7);

        let summary = Reconciler::new(&store, &registry, ReconcileOptions::default())
            .reconcile()
            .await
            .unwrap();
        assert_eq!(summary.orphaned_files_deleted, 25);
        assert_eq!(summary.deleted_files.len(), DEFAULT_SAMPLE_LIMIT);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn registry_listing_failure_aborts_without_deleting() {
        let registry = registry(&["j1"]);
        registry.fail_listing("permission denied");
        let store = MemoryObjectStore::with_objects(["audiobooks/j9/a.wav"]);

        let result = Reconciler::new(&store, &registry, ReconcileOptions::default())
            .reconcile()
            .await;
        assert!(matches!(result, Err(KeeperError::Backend(_))));
        assert!(store.contains("audiobooks/j9/a.wav"));
    }

    #[tokio::test]
    async fn store_listing_failure_aborts() {
        let registry = registry(&["j1"]);
        let store = MemoryObjectStore::with_objects(["audiobooks/j9/a.wav"]);
        store.fail_listing("bucket offline");

        let result = Reconciler::new(&store, &registry, ReconcileOptions::default())
            .reconcile()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failed_delete_is_reported_as_error() {
        let registry = registry(&["j1"]);
        let store = MemoryObjectStore::with_objects([
            "audiobooks/j2/a.wav",
            "audiobooks/j3/b.wav",
        ]);
        store.fail_delete("audiobooks/j2/a.wav");

        let summary = Reconciler::new(&store, &registry, ReconcileOptions::default())
            .reconcile()
            .await
            .unwrap();
        assert_eq!(summary.orphans_found, 2);
        assert_eq!(summary.orphaned_files_deleted, 1);
        assert_eq!(summary.failed_deletions.len(), 1);
        assert_eq!(summary.failed_deletions[0].key, "audiobooks/j2/a.wav");
        assert!(!store.contains("audiobooks/j3/b.wav"));

        let report = summary.into_report();
        assert!(!report.is_success());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "1 of 2 orphaned objects could not be deleted");
        assert_eq!(json["failed_deletions"][0]["key"], "audiobooks/j2/a.wav");
    }

    #[tokio::test]
    async fn dry_run_keeps_objects() {
        let registry = registry(&["j1"]);
        let store = MemoryObjectStore::with_objects(["audiobooks/j1/a.wav", "audiobooks/j2/b.wav"]);
        let opts = ReconcileOptions {
            dry_run: true,
            ..Default::default()
        };

        let summary = Reconciler::new(&store, &registry, opts).reconcile().await.unwrap();
        assert_eq!(summary.orphans_found, 1);
        assert_eq!(summary.deleted_files, vec!["audiobooks/j2/b.wav"]);
        assert!(summary.dry_run);
        assert!(store.contains("audiobooks/j2/b.wav"));
    }

    #[tokio::test]
    async fn success_report_shape() {
        let registry = registry(&["j1", "j2"]);
        let store = MemoryObjectStore::with_objects(["audiobooks/j3/b.wav"]);

        let summary = Reconciler::new(&store, &registry, ReconcileOptions::default())
            .reconcile()
            .await
            .unwrap();
        let json = serde_json::to_value(summary.into_report()).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["valid_jobs"], 2);
        assert_eq!(json["orphaned_files_deleted"], 1);
        assert_eq!(json["deleted_files"], serde_json::json!(["audiobooks/j3/b.wav"]));
        assert!(json.get("failed_deletions").is_none());
        assert!(json.get("dry_run").is_none());
    }

    #[tokio::test]
    async fn nested_prefix_keeps_live_job_outputs() {
        let registry = registry(&["j1"]);
        let store = MemoryObjectStore::with_objects([
            "outputs/v2/j1/a.wav",
            "outputs/v2/j9/b.wav",
            "outputs/v2/loose.wav",
        ]);

        let summary = Reconciler::new(&store, &registry, options("outputs/v2/"))
            .reconcile()
            .await
            .unwrap();
        assert_eq!(summary.deleted_files, vec!["outputs/v2/j9/b.wav"]);
        assert_eq!(summary.skipped_malformed, 1);
        assert_eq!(store.keys(), vec!["outputs/v2/j1/a.wav", "outputs/v2/loose.wav"]);
    }

    #[tokio::test]
    async fn unslashed_prefix_stays_out_of_sibling_namespace() {
        let registry = registry(&["j1"]);
        let store = MemoryObjectStore::with_objects([
            "outputs-archive/keep/a.wav",
            "outputs/j1/a.wav",
            "outputs/j2/b.wav",
        ]);

        let summary = Reconciler::new(&store, &registry, options("outputs"))
            .reconcile()
            .await
            .unwrap();
        assert_eq!(summary.deleted_files, vec!["outputs/j2/b.wav"]);
        assert_eq!(summary.skipped_malformed, 0);
        assert!(store.contains("outputs-archive/keep/a.wav"));
        assert!(store.contains("outputs/j1/a.wav"));
    }

    #[tokio::test]
    async fn empty_prefix_is_rejected_before_listing() {
        let registry = registry(&[]);
        let store = MemoryObjectStore::with_objects(["j1/a.wav", "audiobooks/j2/b.wav"]);

        for prefix in ["", "/", "outputs//v2/"] {
            let result = Reconciler::new(&store, &registry, options(prefix))
                .reconcile()
                .await;
            assert!(matches!(result, Err(KeeperError::Config(_))), "prefix {prefix:?}");
        }
        assert_eq!(store.pages_served(), 0);
        assert_eq!(store.keys().len(), 2);
    }

    #[test]
    fn namespace_gains_trailing_slash() {
        assert_eq!(options("outputs").namespace().unwrap(), "outputs/");
        assert_eq!(options("outputs/v2/").namespace().unwrap(), "outputs/v2/");
        assert_eq!(ReconcileOptions::default().namespace().unwrap(), "audiobooks/");
    }

    /// Store whose objects vanish between listing and deletion, as when a
    /// concurrent pass got there first.
    struct RacingStore;

    impl ObjectStore for RacingStore {
        async fn list_objects_page(
            &self,
            _prefix: &str,
            _page_token: Option<&str>,
        ) -> Result<ObjectPage, BackendError> {
            Ok(ObjectPage {
                objects: vec![ObjectEntry::new("audiobooks/j5/a.wav")],
                next_page_token: None,
            })
        }

        async fn delete_object(&self, _key: &str) -> Result<DeleteOutcome, BackendError> {
            Ok(DeleteOutcome::NotFound)
        }
    }

    #[tokio::test]
    async fn already_deleted_orphan_counts_as_success() {
        let registry = registry(&["j1"]);
        let summary = Reconciler::new(&RacingStore, &registry, ReconcileOptions::default())
            .reconcile()
            .await
            .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.orphaned_files_deleted, 1);
        assert!(summary.failed_deletions.is_empty());
    }
}
