// Centralized configuration management for the generation backend
// Load ALL env vars ONCE at startup

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,

    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    pub connection_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

/// JWT configuration (tokens are issued by the auth provider, we only verify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub audience: String,
    pub issuer: Option<String>,
}

/// Image-synthesis provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub standard_model: String,
    pub pro_model: String,
    pub request_timeout_secs: u64,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
    pub signed_url_ttl_secs: u64,
}

/// Generation policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub poll_interval_secs: u64,
    pub standard_poll_budget_secs: u64,
    pub pro_poll_budget_secs: u64,
    pub max_prompt_chars: usize,
    pub max_image_bytes: usize,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u32,
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_rate_limiting: bool,
    pub enable_swagger_ui: bool,
    pub disable_embedded_migrations: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            standard_poll_budget_secs: 90,
            pro_poll_budget_secs: 25,
            max_prompt_chars: 5000,
            max_image_bytes: 10 * 1024 * 1024,
            rate_limit_max_requests: 5,
            rate_limit_window_seconds: 60,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enable_rate_limiting: true,
            enable_swagger_ui: false,
            disable_embedded_migrations: false,
        }
    }
}

impl GenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get required env var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let jwt_secret = get_required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server = ServerConfig {
            bind_address,
            port,
            rust_log: get_or_default("RUST_LOG", "info"),
        };

        let database = DatabaseConfig {
            url: get_required("DATABASE_URL")?,
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "2")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
        };

        let redis = RedisConfig {
            url: get_or_default("REDIS_URL", "redis://localhost:6379"),
            pool_size: parse_or_default("REDIS_POOL_SIZE", "10")?,
            connection_timeout: parse_u64_or_default("REDIS_CONNECTION_TIMEOUT", "5")?,
            retry_attempts: parse_or_default("REDIS_RETRY_ATTEMPTS", "3")?,
            retry_delay_ms: parse_u64_or_default("REDIS_RETRY_DELAY_MS", "100")?,
        };

        let jwt = JwtConfig {
            secret: jwt_secret,
            audience: get_or_default("JWT_AUDIENCE", "authenticated"),
            issuer: env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
        };

        let provider = ProviderConfig {
            base_url: get_or_default("PROVIDER_BASE_URL", "https://api.kie.ai/api/v1"),
            api_key: get_required("PROVIDER_API_KEY")?,
            standard_model: get_or_default("PROVIDER_STANDARD_MODEL", "google/nano-banana-edit"),
            pro_model: get_or_default("PROVIDER_PRO_MODEL", "nano-banana-pro"),
            request_timeout_secs: parse_u64_or_default("PROVIDER_REQUEST_TIMEOUT", "30")?,
        };

        let storage = StorageConfig {
            base_url: get_required("STORAGE_URL")?,
            service_key: get_required("STORAGE_SERVICE_KEY")?,
            bucket: get_or_default("STORAGE_BUCKET", "generation-inputs"),
            signed_url_ttl_secs: parse_u64_or_default("STORAGE_SIGNED_URL_TTL", "3600")?,
        };

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            poll_interval_secs: parse_u64_or_default(
                "GENERATION_POLL_INTERVAL",
                &defaults.poll_interval_secs.to_string(),
            )?,
            standard_poll_budget_secs: parse_u64_or_default(
                "GENERATION_STANDARD_POLL_BUDGET",
                &defaults.standard_poll_budget_secs.to_string(),
            )?,
            pro_poll_budget_secs: parse_u64_or_default(
                "GENERATION_PRO_POLL_BUDGET",
                &defaults.pro_poll_budget_secs.to_string(),
            )?,
            max_prompt_chars: parse_or_default(
                "GENERATION_MAX_PROMPT_CHARS",
                &defaults.max_prompt_chars.to_string(),
            )? as usize,
            max_image_bytes: parse_or_default(
                "GENERATION_MAX_IMAGE_BYTES",
                &defaults.max_image_bytes.to_string(),
            )? as usize,
            rate_limit_max_requests: parse_or_default(
                "GENERATION_RATE_LIMIT_MAX",
                &defaults.rate_limit_max_requests.to_string(),
            )?,
            rate_limit_window_seconds: parse_or_default(
                "GENERATION_RATE_LIMIT_WINDOW",
                &defaults.rate_limit_window_seconds.to_string(),
            )?,
        };

        if generation.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GENERATION_POLL_INTERVAL".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let features = FeatureConfig {
            enable_rate_limiting: parse_bool_or_default("ENABLE_RATE_LIMITING", "true"),
            enable_swagger_ui: parse_bool_or_default("ENABLE_SWAGGER_UI", "false"),
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
        };

        Ok(Self {
            environment,
            cors_allowed_origins,
            server,
            database,
            redis,
            jwt,
            provider,
            storage,
            generation,
            features,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Get the global configuration instance
pub fn config() -> &'static AppConfig {
    &CONFIG
}
