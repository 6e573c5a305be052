// Job submission to the image-synthesis provider

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::models::entitlement::QualityTier;
use crate::services::provider::{CreateTaskRequest, ImageProvider, ProviderError};

const OUTPUT_FORMAT: &str = "png";
const PRO_RESOLUTION: &str = "2K";

/// Output aspect ratio, fixed per call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
        }
    }
}

/// Everything the provider needs for one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub prompt: String,
    pub image_urls: Vec<String>,
    pub tier: QualityTier,
    pub aspect_ratio: AspectRatio,
}

/// Cut `prompt` to at most `max_chars` characters.
///
/// Returns the prompt untouched when it already fits.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> &str {
    match prompt.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &prompt[..byte_index],
        None => prompt,
    }
}

#[derive(Clone)]
pub struct JobSubmitter {
    provider: Arc<dyn ImageProvider>,
    standard_model: String,
    pro_model: String,
    max_prompt_chars: usize,
}

impl JobSubmitter {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        standard_model: impl Into<String>,
        pro_model: impl Into<String>,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            provider,
            standard_model: standard_model.into(),
            pro_model: pro_model.into(),
            max_prompt_chars,
        }
    }

    /// Build the tier-specific create-task body
    pub fn build_request(&self, spec: &JobSpec) -> CreateTaskRequest {
        let char_count = spec.prompt.chars().count();
        let prompt = truncate_prompt(&spec.prompt, self.max_prompt_chars);
        if prompt.len() < spec.prompt.len() {
            warn!(
                "Prompt truncated from {} to {} characters",
                char_count, self.max_prompt_chars
            );
        }

        match spec.tier {
            QualityTier::Standard => CreateTaskRequest {
                model: self.standard_model.clone(),
                input: json!({
                    "prompt": prompt,
                    "image_urls": spec.image_urls,
                    "output_format": OUTPUT_FORMAT,
                    "image_size": spec.aspect_ratio.as_str(),
                }),
            },
            QualityTier::Pro => CreateTaskRequest {
                model: self.pro_model.clone(),
                input: json!({
                    "prompt": prompt,
                    "image_input": spec.image_urls,
                    "aspect_ratio": spec.aspect_ratio.as_str(),
                    "resolution": PRO_RESOLUTION,
                    "output_format": OUTPUT_FORMAT,
                }),
            },
        }
    }

    /// Submit a job and return the provider's task id
    #[instrument(skip(self, spec), fields(tier = %spec.tier, images = spec.image_urls.len()))]
    pub async fn submit(&self, spec: &JobSpec) -> Result<String, ProviderError> {
        let request = self.build_request(spec);
        let ack = self.provider.submit(&request).await?;

        if ack.code != 200 {
            return Err(ProviderError::Rejected(format!(
                "code {}: {}",
                ack.code, ack.message
            )));
        }

        let task_id = ack
            .task_id
            .ok_or_else(|| ProviderError::Rejected("acknowledgment without task id".to_string()))?;

        info!("Provider accepted job {} ({})", task_id, request.model);
        Ok(task_id)
    }
}
