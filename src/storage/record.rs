//! Record store collaborator
//!
//! A table keyed by generation identifier with one secondary access path by
//! (owner, creation timestamp) in descending order. There is no index keyed
//! on visibility; the public listing works through `scan`, which the store's
//! access policy may deny.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::storage::model::{GenerationRecord, RecordPage};

/// Errors from the record store collaborator
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("broad read denied by the store's access policy")]
    ScanDenied,

    #[error("record store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("record store payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Record store operations used by the persistence layer
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Readiness probe, called once at startup
    async fn ready(&self) -> Result<(), RecordStoreError>;

    async fn put(&self, record: &GenerationRecord) -> Result<(), RecordStoreError>;

    async fn get(&self, id: &str) -> Result<Option<GenerationRecord>, RecordStoreError>;

    /// Page through one owner's records, newest first. The cursor is the
    /// last-seen generation identifier.
    async fn query_by_owner(
        &self,
        owner: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RecordStoreError>;

    /// Count an owner's records without materializing record bodies
    async fn count_by_owner(&self, owner: &str) -> Result<u64, RecordStoreError>;

    async fn set_visibility(
        &self,
        id: &str,
        visible: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RecordStoreError>;

    async fn delete(&self, id: &str) -> Result<(), RecordStoreError>;

    /// Broad read over the whole record set, in no particular order. May fail
    /// with `ScanDenied` depending on the store's access policy.
    async fn scan(&self, limit: usize, cursor: Option<&str>) -> Result<RecordPage, RecordStoreError>;
}

/// HTTP-backed record store client
pub struct HttpRecordStore {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

impl HttpRecordStore {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Result<Self, RecordStoreError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, RecordStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RecordStoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RecordStoreError> {
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn ready(&self) -> Result<(), RecordStoreError> {
        let response = self
            .request(self.http.get(format!("{}/health", self.base_url)))
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn put(&self, record: &GenerationRecord) -> Result<(), RecordStoreError> {
        let url = format!("{}/records/{}", self.base_url, record.generation_id);
        debug!(generation_id = %record.generation_id, "Writing record");
        let response = self.request(self.http.put(url).json(record)).send().await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<GenerationRecord>, RecordStoreError> {
        let url = format!("{}/records/{}", self.base_url, id);
        let response = self.request(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response).await?;
        let record = Self::decode_body::<GenerationRecord>(response).await?;
        Ok(Some(record))
    }

    async fn query_by_owner(
        &self,
        owner: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RecordStoreError> {
        let url = format!("{}/owners/{}/records", self.base_url, owner);
        let mut request = self.http.get(url).query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let response = self.request(request).send().await?;
        let response = Self::expect_success(response).await?;
        Self::decode_body(response).await
    }

    async fn count_by_owner(&self, owner: &str) -> Result<u64, RecordStoreError> {
        let url = format!("{}/owners/{}/records/count", self.base_url, owner);
        let response = self.request(self.http.get(url)).send().await?;
        let response = Self::expect_success(response).await?;
        let counted: CountResponse = Self::decode_body(response).await?;
        Ok(counted.count)
    }

    async fn set_visibility(
        &self,
        id: &str,
        visible: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RecordStoreError> {
        let url = format!("{}/records/{}", self.base_url, id);
        let patch = json!({ "is_public": visible, "updated_at": updated_at });
        let response = self.request(self.http.patch(url).json(&patch)).send().await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RecordStoreError> {
        let url = format!("{}/records/{}", self.base_url, id);
        let response = self.request(self.http.delete(url)).send().await?;
        // Deleting an already-gone record is not an error.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn scan(&self, limit: usize, cursor: Option<&str>) -> Result<RecordPage, RecordStoreError> {
        let url = format!("{}/records", self.base_url);
        let mut request = self.http.get(url).query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let response = self.request(request).send().await?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(RecordStoreError::ScanDenied);
        }
        let response = Self::expect_success(response).await?;
        Self::decode_body(response).await
    }
}
