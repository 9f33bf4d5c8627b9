//! HTTP client for the model-invoke endpoint
//!
//! Both the synchronous image backends and the text models used for prompt
//! enhancement are served through a single invoke endpoint that accepts a
//! model identifier and a model-specific JSON body.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::InvokeConfig;
use crate::error::{AppError, Result};

/// Client for `POST {base_url}/model/{model_id}/invoke`
#[derive(Clone)]
pub struct ModelInvoker {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl ModelInvoker {
    /// Create a new invoker from configuration
    pub fn new(config: &InvokeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    /// Invoke a model and return its decoded JSON response
    pub async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/model/{}/invoke", self.base_url, model_id);
        debug!(model = %model_id, "Invoking model");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Invoke endpoint returned {} for model '{}': {}",
                status, model_id, text
            )));
        }

        let payload = response.json::<Value>().await?;
        Ok(payload)
    }
}
