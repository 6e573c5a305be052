use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redis connection pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisPoolConfig {
    pub redis_url: String,
    pub pool_size: u32,
    pub connection_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&crate::app_config::RedisConfig> for RedisPoolConfig {
    fn from(config: &crate::app_config::RedisConfig) -> Self {
        Self {
            redis_url: config.url.clone(),
            pool_size: config.pool_size,
            connection_timeout: Duration::from_secs(config.connection_timeout),
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl RedisPoolConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.redis_url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if self.pool_size == 0 {
            return Err("Pool size must be greater than 0".to_string());
        }
        if self.pool_size > 256 {
            return Err("Pool size too large (max: 256)".to_string());
        }
        if self.connection_timeout.is_zero() {
            return Err("Connection timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
