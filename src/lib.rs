// Library exports for the try-on generation backend

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::{DieselPool, RedisPool};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use models::auth::AccessTokenClaims;
pub use services::{
    Collaborators, GenerationOrchestrator, GenerationPolicy, JwtConfig, JwtError, JwtService,
};
pub use utils::{ErrorResponse, GenerationError};

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// Build the production AppState: pools, migrations, adapters and the orchestrator
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let config = app_config::config();

    info!("Initializing database pool...");
    let diesel_pool =
        db::create_diesel_pool(db::DieselDatabaseConfig::from(&config.database)).await?;

    if migrations::should_run_migrations(config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(&config.database.url).await?;
    } else {
        match migrations::check_migration_status(config.database.url.clone()).await {
            Ok(status) if !status.is_up_to_date() => warn!(
                "Embedded migrations disabled with {} pending: {:?}",
                status.pending_count, status.pending_migrations
            ),
            Ok(_) => {},
            Err(e) => warn!("Could not read migration status: {}", e),
        }
    }

    info!("Initializing Redis pool...");
    let redis_pool = RedisPool::new(db::RedisPoolConfig::from(&config.redis)).await?;

    let collaborators = Collaborators {
        entitlements: Arc::new(services::DieselEntitlementStore::new(diesel_pool.clone())),
        generations: Arc::new(services::DieselGenerationStore::new(diesel_pool.clone())),
        storage: Arc::new(services::HttpObjectStorage::new(&config.storage)?),
        provider: Arc::new(services::HttpImageProvider::new(&config.provider)?),
        rate_limiter: Arc::new(services::RedisRateLimiter::new(
            redis_pool.clone(),
            services::RateLimitConfig {
                max_requests: config.generation.rate_limit_max_requests,
                window_seconds: config.generation.rate_limit_window_seconds,
            },
        )),
    };

    let orchestrator = Arc::new(GenerationOrchestrator::new(
        collaborators,
        GenerationPolicy::from_config(config),
    ));

    Ok(AppState {
        config: Arc::new(config.clone()),
        jwt_service: Arc::new(JwtService::new(JwtConfig::from_app_config(&config.jwt))),
        orchestrator,
        diesel_pool: Some(diesel_pool),
        redis_pool: Some(redis_pool),
    })
}

// Full router: authenticated generation routes, health and docs
pub fn build_router(state: AppState) -> Router {
    // Inline images are far larger than axum's default JSON limit
    let body_limit =
        models::generation::max_request_body_bytes(state.orchestrator.policy().max_image_bytes);
    let generations = handlers::generation_routes()
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(body_limit));

    let mut api = Router::new()
        .nest("/generations", generations)
        .route("/health", get(health_check));

    if state.config.features.enable_swagger_ui {
        api = api.route("/docs/openapi.json", get(handlers::docs::serve_openapi_spec));
    }

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Health check handler
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let postgres_health = match &state.diesel_pool {
        Some(pool) => match db::check_diesel_health(pool).await {
            Ok(()) => serde_json::json!({
                "status": "healthy",
                "max_connections": state.config.database.max_connections,
                "error": null
            }),
            Err(e) => {
                overall_healthy = false;
                serde_json::json!({
                    "status": "unhealthy",
                    "error": format!("Database connection failed: {}", e)
                })
            },
        },
        None => serde_json::json!({ "status": "not_configured" }),
    };

    let redis_health = match &state.redis_pool {
        Some(pool) => {
            let result = pool.health_check().await;
            if !result.is_healthy {
                overall_healthy = false;
            }
            serde_json::json!({
                "status": if result.is_healthy { "healthy" } else { "unhealthy" },
                "latency_ms": result.latency_ms,
                "total_connections": result.total_connections,
                "pool_size": pool.pool_size(),
                "error": result.error
            })
        },
        None => serde_json::json!({ "status": "not_configured" }),
    };

    let response = serde_json::json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "tryon-backend",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health,
            "redis": redis_health
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
