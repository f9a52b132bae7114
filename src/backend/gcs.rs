use reqwest::{Client, StatusCode};

use super::error::BackendError;
use super::types::ObjectList;
use super::{DeleteOutcome, ObjectPage, ObjectStore, check_status, endpoint, http_client};
use crate::job::ObjectEntry;

pub const STORAGE_URL: &str = "https://storage.googleapis.com";

/// Cloud Storage bucket accessed through the JSON API.
pub struct GcsObjectStore {
    client: Client,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
    page_size: u32,
}

impl GcsObjectStore {
    pub fn new(bucket: String, access_token: Option<String>) -> Result<Self, BackendError> {
        Self::with_base_url(bucket, access_token, STORAGE_URL.to_string())
    }

    /// Create a store pointing at a custom base URL (emulators, tests).
    pub fn with_base_url(
        bucket: String,
        access_token: Option<String>,
        base_url: String,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: http_client()?,
            base_url,
            bucket,
            access_token: access_token.filter(|t| !t.is_empty()),
            page_size: 1000,
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl ObjectStore for GcsObjectStore {
    async fn list_objects_page(
        &self,
        prefix: &str,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, BackendError> {
        let url = endpoint(&self.base_url, &["storage", "v1", "b", self.bucket.as_str(), "o"])?;
        let mut query: Vec<(&str, String)> = vec![
            ("prefix", prefix.to_string()),
            ("maxResults", self.page_size.to_string()),
            ("fields", "items(name),nextPageToken".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .authorize(self.client.get(url).query(&query))
            .send()
            .await?;
        let list = check_status(response).await?.json::<ObjectList>().await?;

        tracing::debug!(
            bucket = %self.bucket,
            prefix,
            count = list.items.len(),
            more = list.next_page_token.is_some(),
            "Listed object page"
        );
        Ok(ObjectPage {
            objects: list
                .items
                .into_iter()
                .map(|item| ObjectEntry::new(item.name))
                .collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteOutcome, BackendError> {
        let url = endpoint(&self.base_url, &["storage", "v1", "b", self.bucket.as_str(), "o", key])?;
        let response = self.authorize(self.client.delete(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        check_status(response).await?;
        Ok(DeleteOutcome::Deleted)
    }
}
