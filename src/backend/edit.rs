//! Asynchronous edit-style backend
//!
//! The edit backend modifies a reference image per prompt instruction through
//! a submit/poll protocol: submission returns a job handle and a polling
//! location, then a bounded poll loop drives the job to a terminal outcome.
//! The loop blocks only its own task; concurrent edit jobs share nothing.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::backend::model::EDIT_MODEL;
use crate::config::EditConfig;
use crate::error::{AppError, Result};

/// Fixed output size of the edit backend. It does not honor arbitrary
/// requested dimensions.
pub const EDIT_OUTPUT_WIDTH: u32 = 1024;
pub const EDIT_OUTPUT_HEIGHT: u32 = 1024;

/// Parameters for one edit job
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Edit instruction, already optimized by the prompt collaborator
    pub prompt: String,
    /// Base64-encoded reference image, without any data-URL prefix
    pub input_image: String,
    pub aspect_ratio: String,
    pub seed: Option<i64>,
    pub safety_tolerance: u8,
    pub output_format: String,
}

/// Handle returned by a successful submission
#[derive(Debug, Clone)]
pub struct EditJob {
    pub id: String,
    pub polling_url: String,
}

/// Terminal payload of a successful edit job
#[derive(Debug)]
pub struct EditOutcome {
    pub image: Vec<u8>,
    pub job_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    polling_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<PollResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PollResult {
    #[serde(default)]
    sample: Option<String>,
}

/// What one poll observed about the job
enum PollOutcome {
    InProgress,
    Ready { sample_url: String },
    Moderated,
    Failed { message: String },
}

/// Client for the edit-style backend
#[derive(Clone)]
pub struct EditClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    max_poll_attempts: u32,
    submit_timeout: Duration,
    poll_timeout: Duration,
    download_timeout: Duration,
}

impl EditClient {
    /// Create a new edit client from configuration
    pub fn new(config: &EditConfig) -> Result<Self> {
        // Timeouts are set per request; the client itself carries none.
        let http = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
            submit_timeout: Duration::from_millis(config.submit_timeout_ms),
            poll_timeout: Duration::from_millis(config.poll_timeout_ms),
            download_timeout: Duration::from_millis(config.download_timeout_ms),
        })
    }

    /// Run an edit job to a terminal outcome.
    ///
    /// Fails fast with `BackendUnconfigured` when no credential is present,
    /// before any network call.
    pub async fn run(&self, request: &EditRequest) -> Result<EditOutcome> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::BackendUnconfigured(EDIT_MODEL.to_string()))?;

        let job = self.submit(api_key, request).await?;
        info!(job_id = %job.id, "Edit job submitted");

        self.poll_to_completion(api_key, &job).await
    }

    async fn submit(&self, api_key: &str, request: &EditRequest) -> Result<EditJob> {
        let mut payload = json!({
            "prompt": request.prompt,
            "input_image": request.input_image,
            "aspect_ratio": request.aspect_ratio,
            "safety_tolerance": request.safety_tolerance,
            "output_format": request.output_format,
        });
        if let Some(seed) = request.seed {
            payload["seed"] = json!(seed);
        }

        let response = self
            .http
            .post(format!("{}/{}", self.base_url, EDIT_MODEL))
            .header("accept", "application/json")
            .header("x-key", api_key)
            .timeout(self.submit_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailed {
                backend: EDIT_MODEL.to_string(),
                message: format!("submit request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationFailed {
                backend: EDIT_MODEL.to_string(),
                message: format!("submit returned {}: {}", status, body),
            });
        }

        let submit: SubmitResponse = response.json().await.map_err(|e| AppError::GenerationFailed {
            backend: EDIT_MODEL.to_string(),
            message: format!("submit response could not be decoded: {}", e),
        })?;

        match (submit.id, submit.polling_url) {
            (Some(id), Some(polling_url)) => Ok(EditJob { id, polling_url }),
            _ => Err(AppError::GenerationFailed {
                backend: EDIT_MODEL.to_string(),
                message: "submit response is missing id or polling_url".to_string(),
            }),
        }
    }

    /// Drive the poll loop until a terminal state or the attempt budget runs
    /// out. A poll transport failure is a transient miss, not a terminal
    /// failure; it still consumes one attempt.
    async fn poll_to_completion(&self, api_key: &str, job: &EditJob) -> Result<EditOutcome> {
        for attempt in 1..=self.max_poll_attempts {
            sleep(self.poll_interval).await;

            match self.poll_once(api_key, job, attempt).await {
                None => continue,
                Some(PollOutcome::InProgress) => continue,
                Some(PollOutcome::Ready { sample_url }) => {
                    let image = self.download(api_key, &sample_url).await?;
                    return Ok(EditOutcome {
                        image,
                        job_id: job.id.clone(),
                        width: EDIT_OUTPUT_WIDTH,
                        height: EDIT_OUTPUT_HEIGHT,
                    });
                }
                Some(PollOutcome::Moderated) => {
                    // Moderation is terminal; no further polls.
                    return Err(AppError::Moderated(
                        "the edit request was rejected by the backend's safety filter; \
                         adjust the prompt or the input image"
                            .to_string(),
                    ));
                }
                Some(PollOutcome::Failed { message }) => {
                    return Err(AppError::GenerationFailed {
                        backend: EDIT_MODEL.to_string(),
                        message,
                    });
                }
            }
        }

        Err(AppError::TimedOut(format!(
            "edit job {} did not finish within {} polls",
            job.id, self.max_poll_attempts
        )))
    }

    /// One poll. `None` means a transient miss (transport failure, non-2xx
    /// status, or undecodable payload) that should be retried.
    async fn poll_once(&self, api_key: &str, job: &EditJob, attempt: u32) -> Option<PollOutcome> {
        let response = match self
            .http
            .get(&job.polling_url)
            .header("accept", "application/json")
            .header("x-key", api_key)
            .timeout(self.poll_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(job_id = %job.id, attempt, error = %e, "Poll request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(job_id = %job.id, attempt, status = %response.status(), "Poll returned error status");
            return None;
        }

        let payload: PollResponse = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job.id, attempt, error = %e, "Poll response could not be decoded");
                return None;
            }
        };

        let status = payload.status.unwrap_or_default();
        debug!(job_id = %job.id, attempt, status = %status, "Edit job status");

        match status.as_str() {
            "Ready" => {
                let sample_url = payload.result.and_then(|r| r.sample);
                match sample_url {
                    Some(sample_url) => Some(PollOutcome::Ready { sample_url }),
                    None => Some(PollOutcome::Failed {
                        message: "ready response carried no sample URL".to_string(),
                    }),
                }
            }
            "Request Moderated" => Some(PollOutcome::Moderated),
            "Error" | "Failed" => {
                let message = payload
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "generation failed".to_string());
                Some(PollOutcome::Failed { message })
            }
            _ => Some(PollOutcome::InProgress),
        }
    }

    async fn download(&self, api_key: &str, sample_url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(sample_url)
            .header("x-key", api_key)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailed {
                backend: EDIT_MODEL.to_string(),
                message: format!("failed to download result asset: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::GenerationFailed {
                backend: EDIT_MODEL.to_string(),
                message: format!("result asset download returned {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| AppError::GenerationFailed {
            backend: EDIT_MODEL.to_string(),
            message: format!("failed to read result asset: {}", e),
        })?;

        Ok(bytes.to_vec())
    }
}
