// Reference image staging
// Inline payloads are persisted to object storage, URLs pass through

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::models::generation::ReferenceImage;
use crate::services::object_storage::{ObjectStorage, StorageError};

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Payload is not a supported image type")]
    UnsupportedImage,

    #[error("Image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A reference image the provider can fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub url: String,
    /// Position in the inbound list
    pub order: usize,
}

/// Decoded inline image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl InlineImage {
    pub fn extension(&self) -> &'static str {
        extension_for(self.content_type)
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

fn normalize_content_type(media_type: &str) -> Option<&'static str> {
    match media_type.to_ascii_lowercase().as_str() {
        "image/png" => Some("image/png"),
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/webp" => Some("image/webp"),
        "image/gif" => Some("image/gif"),
        _ => None,
    }
}

/// Detect an image type from its leading bytes
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

pub fn is_remote_url(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Decode a `data:` URL or bare base64 string into image bytes
pub fn decode_inline_image(source: &str) -> Result<InlineImage, StagingError> {
    let source = source.trim();

    let (declared_type, payload) = if let Some(rest) = source.strip_prefix("data:") {
        let (meta, payload) = rest.split_once(',').ok_or(StagingError::MalformedDataUrl)?;
        let media_type = meta
            .strip_suffix(";base64")
            .ok_or(StagingError::MalformedDataUrl)?;
        (Some(media_type), payload)
    } else {
        (None, source)
    };

    let bytes = BASE64.decode(payload.as_bytes())?;

    // Bytes win over the declared type; the declared type only fills in when sniffing fails
    let content_type = sniff_content_type(&bytes)
        .or_else(|| declared_type.and_then(normalize_content_type))
        .ok_or(StagingError::UnsupportedImage)?;

    Ok(InlineImage {
        bytes,
        content_type,
    })
}

/// Storage key for a staged reference image
pub fn staging_key(generation_id: Uuid, index: usize, timestamp_millis: i64, ext: &str) -> String {
    format!("{}/ref-{}-{}.{}", generation_id, index, timestamp_millis, ext)
}

/// Stages reference images for the provider
#[derive(Clone)]
pub struct ImageStager {
    storage: Arc<dyn ObjectStorage>,
    url_ttl: Duration,
    max_image_bytes: usize,
}

impl ImageStager {
    pub fn new(storage: Arc<dyn ObjectStorage>, url_ttl: Duration, max_image_bytes: usize) -> Self {
        Self {
            storage,
            url_ttl,
            max_image_bytes,
        }
    }

    /// Stage every image in order, skipping the ones that fail.
    ///
    /// The result keeps the inbound relative order. An empty result is for the
    /// caller to treat as fatal.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub async fn stage(&self, generation_id: Uuid, images: &[ReferenceImage]) -> Vec<StagedImage> {
        let mut staged = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            match self.stage_one(generation_id, index, image).await {
                Ok(url) => staged.push(StagedImage { url, order: index }),
                Err(e) => {
                    warn!(
                        "Skipping reference image {} ({}) for generation {}: {}",
                        index, image.kind, generation_id, e
                    );
                },
            }
        }

        debug!(
            "Staged {}/{} reference images for generation {}",
            staged.len(),
            images.len(),
            generation_id
        );
        staged
    }

    async fn stage_one(
        &self,
        generation_id: Uuid,
        index: usize,
        image: &ReferenceImage,
    ) -> Result<String, StagingError> {
        if is_remote_url(&image.source_data) {
            return Ok(image.source_data.trim().to_string());
        }

        let inline = decode_inline_image(&image.source_data)?;
        if inline.bytes.len() > self.max_image_bytes {
            return Err(StagingError::TooLarge {
                size: inline.bytes.len(),
                limit: self.max_image_bytes,
            });
        }

        let key = staging_key(
            generation_id,
            index,
            Utc::now().timestamp_millis(),
            inline.extension(),
        );

        self.storage
            .put(&key, inline.bytes, inline.content_type)
            .await?;
        let url = self.storage.signed_url(&key, self.url_ttl).await?;

        Ok(url)
    }
}
