// Error taxonomy for generation requests and its HTTP mapping
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::services::entitlement::{Denial, LedgerError};
use crate::services::generation_store::GenerationStoreError;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Too many generation requests. Please wait {retry_after_secs} seconds and try again.")]
    RateLimited { retry_after_secs: u32 },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    TrialExhausted(Denial),

    #[error("{0}")]
    InsufficientCredits(Denial),

    #[error("Generation not found")]
    NotFound,

    #[error("None of the reference images could be prepared")]
    StagingFailed,

    #[error("The image provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Image generation failed: {0}")]
    ProviderFailed(String),

    #[error("Internal server error")]
    Internal(String),
}

/// Error body returned by every generation endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl GenerationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GenerationError::RateLimited { .. }
            | GenerationError::TrialExhausted(_)
            | GenerationError::InsufficientCredits(_) => StatusCode::FORBIDDEN,
            GenerationError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            GenerationError::NotFound => StatusCode::NOT_FOUND,
            GenerationError::StagingFailed
            | GenerationError::ProviderRejected(_)
            | GenerationError::ProviderFailed(_)
            | GenerationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Unauthenticated => "UNAUTHENTICATED",
            GenerationError::RateLimited { .. } => "RATE_LIMITED",
            GenerationError::ValidationFailed(_) => "VALIDATION_FAILED",
            GenerationError::TrialExhausted(_) => "TRIAL_EXHAUSTED",
            GenerationError::InsufficientCredits(_) => "INSUFFICIENT_CREDITS",
            GenerationError::NotFound => "NOT_FOUND",
            GenerationError::StagingFailed => "STAGING_FAILED",
            GenerationError::ProviderRejected(_) => "PROVIDER_REJECTED",
            GenerationError::ProviderFailed(_) => "PROVIDER_FAILED",
            GenerationError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        if let GenerationError::Internal(detail) = &self {
            // Store details stay in the logs
            error!("Internal generation error: {}", detail);
        }

        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

impl From<Denial> for GenerationError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::TrialExhausted => GenerationError::TrialExhausted(denial),
            Denial::InsufficientCredits { .. } => GenerationError::InsufficientCredits(denial),
        }
    }
}

impl From<LedgerError> for GenerationError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::Denied(denial) => denial.into(),
            other => GenerationError::Internal(other.to_string()),
        }
    }
}

impl From<GenerationStoreError> for GenerationError {
    fn from(error: GenerationStoreError) -> Self {
        match error {
            GenerationStoreError::NotFound(_) => GenerationError::NotFound,
            other => GenerationError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for GenerationError {
    fn from(error: validator::ValidationErrors) -> Self {
        GenerationError::ValidationFailed(error.to_string())
    }
}
