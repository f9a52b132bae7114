use reqwest::Client;

use super::error::BackendError;
use super::types::DocumentList;
use super::{JobPage, JobRegistry, check_status, endpoint, http_client};

pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com";

/// Job registry stored as a Firestore collection, one document per job.
pub struct FirestoreRegistry {
    client: Client,
    base_url: String,
    project_id: String,
    collection: String,
    access_token: Option<String>,
    page_size: u32,
}

impl FirestoreRegistry {
    pub fn new(
        project_id: String,
        collection: String,
        access_token: Option<String>,
    ) -> Result<Self, BackendError> {
        Self::with_base_url(project_id, collection, access_token, FIRESTORE_URL.to_string())
    }

    /// Create a registry pointing at a custom base URL (emulators, tests).
    pub fn with_base_url(
        project_id: String,
        collection: String,
        access_token: Option<String>,
        base_url: String,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: http_client()?,
            base_url,
            project_id,
            collection,
            access_token: access_token.filter(|t| !t.is_empty()),
            page_size: 300,
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl JobRegistry for FirestoreRegistry {
    async fn list_jobs_page(&self, page_token: Option<&str>) -> Result<JobPage, BackendError> {
        let url = endpoint(
            &self.base_url,
            &[
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                self.collection.as_str(),
            ],
        )?;
        let mut query: Vec<(&str, String)> = vec![("pageSize", self.page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let mut req = self.client.get(url).query(&query);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let response = check_status(req.send().await?).await?;
        let list = response.json::<DocumentList>().await?;

        tracing::debug!(
            collection = %self.collection,
            count = list.documents.len(),
            more = list.next_page_token.is_some(),
            "Listed job page"
        );
        let jobs = list
            .documents
            .into_iter()
            .map(|doc| doc.into_job_record())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JobPage {
            jobs,
            next_page_token: list.next_page_token,
        })
    }
}
