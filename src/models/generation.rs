// Generation record and request/response models

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::entitlement::QualityTier;
use crate::models::shoot::{JewelryShootConfig, ModelShootConfig, TemplateShootConfig};
use crate::schema::generations;

/// Maximum number of reference images accepted in one request
pub const MAX_REFERENCE_IMAGES: usize = 8;

/// Room for everything in a request body besides the image payloads
const REQUEST_OVERHEAD_BYTES: usize = 64 * 1024;

/// Body limit that still admits every reference image inline at `max_image_bytes`
pub fn max_request_body_bytes(max_image_bytes: usize) -> usize {
    max_image_bytes.div_ceil(3) * 4 * MAX_REFERENCE_IMAGES + REQUEST_OVERHEAD_BYTES
}

/// Lifecycle of a generation record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Completed and failed records never transition automatically again
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "processing" => Ok(GenerationStatus::Processing),
            "completed" => Ok(GenerationStatus::Completed),
            "failed" => Ok(GenerationStatus::Failed),
            _ => Err(format!("Invalid generation status: {}", s)),
        }
    }
}

/// A generation record as seen by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub status: GenerationStatus,
    pub image_url: Option<String>,
    /// Provider job backing this record once it has been submitted
    pub task_id: Option<String>,
    pub input_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Database row for the generations table
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = generations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GenerationRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub status: String,
    pub image_url: Option<String>,
    pub input_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_id: Option<String>,
}

impl TryFrom<GenerationRow> for GenerationRecord {
    type Error = String;

    fn try_from(row: GenerationRow) -> Result<Self, Self::Error> {
        Ok(GenerationRecord {
            id: row.id,
            owner_id: row.owner_id,
            status: row.status.parse()?,
            image_url: row.image_url,
            task_id: row.task_id,
            input_config: row.input_config,
            created_at: row.created_at,
        })
    }
}

/// Inbound reference image, either inline-encoded or an existing URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    /// Category tag (garment, accessory, template...), informational only
    #[serde(rename = "type", default)]
    pub kind: String,

    /// `data:` URL, raw base64, or an http(s) URL
    pub source_data: String,
}

impl ReferenceImage {
    pub fn from_url(kind: &str, url: &str) -> Self {
        Self {
            kind: kind.to_string(),
            source_data: url.to_string(),
        }
    }
}

/// Inbound generation request for one call site
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[aliases(
    ModelGenerationRequest = GenerationRequest<ModelShootConfig>,
    JewelryGenerationRequest = GenerationRequest<JewelryShootConfig>,
    TemplateGenerationRequest = GenerationRequest<TemplateShootConfig>
)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest<C> {
    /// Id of the generation record created by the client beforehand
    pub target_id: String,
    pub config: C,
    #[serde(default)]
    pub reference_images: Vec<ReferenceImage>,
    #[serde(default)]
    pub quality_tier: QualityTier,
}

/// Whether the provider finished inside the request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Completed,
    Processing,
}

/// Successful generation response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub quality_tier: QualityTier,
    pub credit_cost: i32,
}

impl GenerationResponse {
    pub fn completed(image_url: String, quality_tier: QualityTier, credit_cost: i32) -> Self {
        Self {
            success: true,
            status: ResponseStatus::Completed,
            image_url: Some(image_url),
            task_id: None,
            quality_tier,
            credit_cost,
        }
    }

    pub fn processing(task_id: String, quality_tier: QualityTier, credit_cost: i32) -> Self {
        Self {
            success: true,
            status: ResponseStatus::Processing,
            image_url: None,
            task_id: Some(task_id),
            quality_tier,
            credit_cost,
        }
    }
}

/// Query for resuming a generation handed off as `processing`
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub task_id: String,
}

/// Answer to a resumed status check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatusResponse {
    pub success: bool,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl GenerationStatusResponse {
    pub fn completed(image_url: String) -> Self {
        Self {
            success: true,
            status: ResponseStatus::Completed,
            image_url: Some(image_url),
            task_id: None,
        }
    }

    pub fn processing(task_id: String) -> Self {
        Self {
            success: true,
            status: ResponseStatus::Processing,
            image_url: None,
            task_id: Some(task_id),
        }
    }
}
