// Object storage for staged reference images
// Store bytes under a key, then mint a time-limited retrieval URL

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::app_config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },

    #[error("Signing {key} failed: {reason}")]
    Signing { key: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Client for a Supabase-compatible storage REST API
pub struct HttpObjectStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl HttpObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!(
            "Object storage configured: url={}, bucket={}",
            base_url, config.bucket
        );

        Ok(Self {
            client,
            base_url,
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }

    fn sign_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                key: key.to_string(),
                reason: format!("{}: {}", status, body),
            });
        }

        debug!("Stored {} ({} bytes, {})", key, size, content_type);
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.sign_url(key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Signing {
                key: key.to_string(),
                reason: format!("{}: {}", status, body),
            });
        }

        let signed: SignedUrlResponse = response.json().await?;

        // The API answers with a path relative to /storage/v1
        if signed.signed_url.starts_with("http") {
            Ok(signed.signed_url)
        } else {
            Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
        }
    }
}
