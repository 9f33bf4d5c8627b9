//! Object store collaborator
//!
//! Key-addressed blob storage. Keys are namespaced by owner and generation
//! identifier; `put` returns the public URL embedded in generation records.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from the object store collaborator
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("object store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("object not found: {0}")]
    NotFound(String),
}

/// Object store operations used by the persistence layer
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes under a key and return the object's public URL
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

/// HTTP-backed object store client
pub struct HttpObjectStore {
    http: Client,
    base_url: String,
    public_url_prefix: String,
    api_token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        base_url: &str,
        public_url_prefix: Option<&str>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ObjectStoreError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let public_url_prefix = public_url_prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{}/objects", base_url));
        Ok(Self {
            http,
            base_url,
            public_url_prefix,
            api_token,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ObjectStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ObjectStoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, ObjectStoreError> {
        let url = format!("{}/objects/{}", self.base_url, key);
        debug!(key = %key, size = bytes.len(), "Uploading object");
        let response = self
            .request(self.http.put(url).header(CONTENT_TYPE, content_type).body(bytes))
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(format!("{}/{}", self.public_url_prefix, key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let url = format!("{}/objects/{}", self.base_url, key);
        let response = self.request(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let response = Self::expect_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let url = format!("{}/objects/{}", self.base_url, key);
        let response = self.request(self.http.delete(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response).await?;
        Ok(())
    }
}
