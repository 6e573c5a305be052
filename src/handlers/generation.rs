// Generation endpoints
// Each call site shares the orchestrator; only the config type differs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use tracing::info;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        GenerationRequest, GenerationResponse, GenerationStatusResponse, JewelryShootConfig,
        ModelShootConfig, StatusQuery, TemplateShootConfig,
    },
    services::prompt::ShootPrompt,
    utils::GenerationError,
};

async fn generate<C: ShootPrompt>(
    state: AppState,
    auth_user: AuthenticatedUser,
    payload: Result<Json<GenerationRequest<C>>, JsonRejection>,
) -> Result<Json<GenerationResponse>, GenerationError> {
    let Json(request) = payload.map_err(|e| GenerationError::ValidationFailed(e.body_text()))?;

    info!(
        "Generation requested: user={}, call_site={}, tier={}, images={}",
        auth_user.user_id,
        C::CALL_SITE.endpoint(),
        request.quality_tier,
        request.reference_images.len()
    );

    let response = state
        .orchestrator
        .clone()
        .run_detached(auth_user.user_id, request)
        .await?;

    Ok(Json(response))
}

/// Full-body model wearing the supplied garments
#[utoipa::path(
    post,
    path = "/api/v1/generations/model",
    tag = "Generations",
    operation_id = "generateModel",
    request_body = crate::models::ModelGenerationRequest,
    responses(
        (status = 200, description = "Generation completed or still processing", body = GenerationResponse),
        (status = 400, description = "Validation failed", body = crate::utils::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::utils::ErrorResponse),
        (status = 403, description = "Rate limited, trial exhausted or insufficient credits", body = crate::utils::ErrorResponse),
        (status = 404, description = "Generation record not found", body = crate::utils::ErrorResponse),
        (status = 500, description = "Staging or provider failure", body = crate::utils::ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn generate_model(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    payload: Result<Json<GenerationRequest<ModelShootConfig>>, JsonRejection>,
) -> Result<Json<GenerationResponse>, GenerationError> {
    generate(state, auth_user, payload).await
}

/// Jewelry or accessory close-up from a preset
#[utoipa::path(
    post,
    path = "/api/v1/generations/jewelry",
    tag = "Generations",
    operation_id = "generateJewelry",
    request_body = crate::models::JewelryGenerationRequest,
    responses(
        (status = 200, description = "Generation completed or still processing", body = GenerationResponse),
        (status = 400, description = "Validation failed", body = crate::utils::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::utils::ErrorResponse),
        (status = 403, description = "Rate limited, trial exhausted or insufficient credits", body = crate::utils::ErrorResponse),
        (status = 404, description = "Generation record not found", body = crate::utils::ErrorResponse),
        (status = 500, description = "Staging or provider failure", body = crate::utils::ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn generate_jewelry(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    payload: Result<Json<GenerationRequest<JewelryShootConfig>>, JsonRejection>,
) -> Result<Json<GenerationResponse>, GenerationError> {
    generate(state, auth_user, payload).await
}

/// Catalog template re-shot with the user's garments
#[utoipa::path(
    post,
    path = "/api/v1/generations/template",
    tag = "Generations",
    operation_id = "generateTemplate",
    request_body = crate::models::TemplateGenerationRequest,
    responses(
        (status = 200, description = "Generation completed or still processing", body = GenerationResponse),
        (status = 400, description = "Validation failed", body = crate::utils::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::utils::ErrorResponse),
        (status = 403, description = "Rate limited, trial exhausted or insufficient credits", body = crate::utils::ErrorResponse),
        (status = 404, description = "Generation record not found", body = crate::utils::ErrorResponse),
        (status = 500, description = "Staging or provider failure", body = crate::utils::ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn generate_template(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    payload: Result<Json<GenerationRequest<TemplateShootConfig>>, JsonRejection>,
) -> Result<Json<GenerationResponse>, GenerationError> {
    generate(state, auth_user, payload).await
}

/// Resume watching a generation that was handed off as processing
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}/status",
    tag = "Generations",
    operation_id = "generationStatus",
    params(
        ("id" = String, Path, description = "Generation record id (UUID)"),
        ("taskId" = String, Query, description = "Provider task id from the processing response")
    ),
    responses(
        (status = 200, description = "Completed or still processing", body = GenerationStatusResponse),
        (status = 400, description = "Validation failed", body = crate::utils::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::utils::ErrorResponse),
        (status = 404, description = "Generation record not found", body = crate::utils::ErrorResponse),
        (status = 500, description = "Provider reported failure", body = crate::utils::ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn generation_status(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<GenerationStatusResponse>, GenerationError> {
    let Query(query) = query.map_err(|e| GenerationError::ValidationFailed(e.body_text()))?;

    let response = state
        .orchestrator
        .resume(auth_user.user_id, &id, &query.task_id)
        .await?;

    Ok(Json(response))
}
