// Image-synthesis provider client
// Asynchronous job API: create a task, then query its record until terminal

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::app_config::ProviderConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider rejected the job: {0}")]
    Rejected(String),

    #[error("Provider job failed: {0}")]
    Failed(String),

    #[error("Provider HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Body of a create-task call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub model: String,
    pub input: serde_json::Value,
}

/// Synchronous acknowledgment of a create-task call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAck {
    pub code: u16,
    pub message: String,
    pub task_id: Option<String>,
}

/// Provider-side task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Waiting,
    Queuing,
    Generating,
    Success,
    Fail,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Fail)
    }
}

/// Snapshot of a task record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub result_urls: Vec<String>,
    pub error_message: Option<String>,
}

impl TaskStatus {
    pub fn pending() -> Self {
        Self {
            state: TaskState::Generating,
            result_urls: Vec::new(),
            error_message: None,
        }
    }

    pub fn succeeded(url: &str) -> Self {
        Self {
            state: TaskState::Success,
            result_urls: vec![url.to_string()],
            error_message: None,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            state: TaskState::Fail,
            result_urls: Vec::new(),
            error_message: Some(message.to_string()),
        }
    }
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn submit(&self, request: &CreateTaskRequest) -> Result<SubmitAck, ProviderError>;

    async fn status(&self, task_id: &str) -> Result<TaskStatus, ProviderError>;
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: u16,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskData {
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordInfoData {
    state: TaskState,
    result_json: Option<String>,
    fail_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultJson {
    #[serde(default)]
    result_urls: Vec<String>,
}

fn parse_record_info(body: Envelope<RecordInfoData>) -> Result<TaskStatus, ProviderError> {
    if body.code != 200 {
        return Err(ProviderError::InvalidResponse(format!(
            "status query answered {}: {}",
            body.code, body.msg
        )));
    }

    let data = body
        .data
        .ok_or_else(|| ProviderError::InvalidResponse("status query without data".to_string()))?;

    let result_urls = match data.result_json.as_deref() {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<ResultJson>(raw)
            .map_err(|e| ProviderError::InvalidResponse(format!("resultJson: {}", e)))?
            .result_urls,
        _ => Vec::new(),
    };

    Ok(TaskStatus {
        state: data.state,
        result_urls,
        error_message: data.fail_msg.filter(|m| !m.is_empty()),
    })
}

/// HTTP client for the provider's job API
pub struct HttpImageProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpImageProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!("Image provider configured: endpoint={}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ImageProvider for HttpImageProvider {
    async fn submit(&self, request: &CreateTaskRequest) -> Result<SubmitAck, ProviderError> {
        let response = self
            .client
            .post(format!("{}/jobs/createTask", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let http_status = response.status();
        let body: Envelope<CreateTaskData> = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("createTask ({}): {}", http_status, e))
        })?;

        debug!("createTask answered {} ({})", body.code, body.msg);

        Ok(SubmitAck {
            code: body.code,
            message: body.msg,
            task_id: body.data.and_then(|d| d.task_id).filter(|id| !id.is_empty()),
        })
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        let response = self
            .client
            .get(format!("{}/jobs/recordInfo", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[("taskId", task_id)])
            .send()
            .await?;

        let body: Envelope<RecordInfoData> = response.json().await?;
        parse_record_info(body)
    }
}
