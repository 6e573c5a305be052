// OpenAPI document for the generation API
use axum::{extract::State, Json};
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        server::Server,
    },
    Modify, OpenApi,
};

use crate::app::AppState;
use crate::app_config::{AppConfig, Environment};
use crate::handlers::generation;
use crate::models::{
    shoot::{
        AgeRange, Background, BodyType, Ethnicity, Gender, JewelryPreset, JewelryType, Pose,
        SkinTone,
    },
    GenerationResponse, GenerationStatusResponse, JewelryGenerationRequest, JewelryShootConfig,
    ModelGenerationRequest, ModelShootConfig, QualityTier, ReferenceImage, ResponseStatus,
    TemplateGenerationRequest, TemplateShootConfig,
};
use crate::utils::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Try-On Generation API",
        description = "Fashion try-on image generation with trial and credit entitlements",
        version = "1.0.0"
    ),
    paths(
        generation::generate_model,
        generation::generate_jewelry,
        generation::generate_template,
        generation::generation_status,
    ),
    components(schemas(
        ModelGenerationRequest,
        JewelryGenerationRequest,
        TemplateGenerationRequest,
        ModelShootConfig,
        JewelryShootConfig,
        TemplateShootConfig,
        ReferenceImage,
        QualityTier,
        ResponseStatus,
        GenerationResponse,
        GenerationStatusResponse,
        ErrorResponse,
        Gender,
        Ethnicity,
        AgeRange,
        BodyType,
        Pose,
        Background,
        JewelryPreset,
        JewelryType,
        SkinTone,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Generations", description = "Image generation and status checks")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the OpenAPI document with a server entry for the running environment
pub fn build_openapi_spec(config: &AppConfig) -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();

    let api_url = match config.environment {
        Environment::Development | Environment::Test => {
            format!("http://localhost:{}", config.server.port)
        },
        _ => std::env::var("PUBLIC_API_URL").unwrap_or_else(|_| "/".to_string()),
    };

    let mut server = Server::new(api_url);
    server.description = Some(format!("Current server ({})", config.environment));
    spec.servers = Some(vec![server]);

    spec
}

/// Serve OpenAPI JSON at /api/v1/docs/openapi.json
pub async fn serve_openapi_spec(
    State(app_state): State<AppState>,
) -> Json<utoipa::openapi::OpenApi> {
    Json(build_openapi_spec(app_state.config.as_ref()))
}
