// Application state shared across handlers
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    db::{DieselPool, RedisPool},
    services::{GenerationOrchestrator, JwtService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt_service: Arc<JwtService>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    // Pools are only needed for health reporting; handlers go through the orchestrator
    pub diesel_pool: Option<DieselPool>,
    pub redis_pool: Option<RedisPool>,
}
