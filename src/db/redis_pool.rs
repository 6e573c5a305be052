use rand::{thread_rng, Rng};
use redis::{aio::ConnectionManager, Client, RedisError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::redis_config::RedisPoolConfig;

/// Maximum delay cap for exponential backoff
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Fixed set of multiplexed Redis connections handed out round-robin
#[derive(Clone)]
pub struct RedisPool {
    connections: Arc<Vec<ConnectionManager>>,
    next: Arc<AtomicUsize>,
    config: RedisPoolConfig,
}

/// Health check status for Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisHealth {
    pub is_healthy: bool,
    pub latency_ms: u64,
    pub total_connections: u32,
    pub error: Option<String>,
}

impl RedisPool {
    #[instrument(skip(config))]
    pub async fn new(config: RedisPoolConfig) -> Result<Self, RedisError> {
        config.validate().map_err(|e| {
            error!("Invalid Redis configuration: {}", e);
            RedisError::from((
                redis::ErrorKind::InvalidClientConfig,
                "Invalid configuration",
            ))
        })?;

        info!(
            "Initializing Redis pool: url={}, size={}",
            mask_redis_url(&config.redis_url),
            config.pool_size
        );

        let client = Client::open(config.redis_url.as_str())?;

        let mut connections = Vec::with_capacity(config.pool_size as usize);
        for i in 0..config.pool_size {
            match create_connection_with_retry(&client, &config).await {
                Ok(conn) => connections.push(conn),
                Err(e) if connections.is_empty() => return Err(e),
                Err(e) => warn!("Failed to create Redis connection {}: {}", i, e),
            }
        }

        info!("Redis pool initialized with {} connections", connections.len());
        Ok(Self {
            connections: Arc::new(connections),
            next: Arc::new(AtomicUsize::new(0)),
            config,
        })
    }

    /// Get a connection handle; handles are cheap clones of a multiplexed connection
    pub async fn get_connection(&self) -> Result<ConnectionManager, RedisError> {
        if self.connections.is_empty() {
            return Err(RedisError::from((
                redis::ErrorKind::IoError,
                "Redis pool has no connections",
            )));
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        Ok(self.connections[index].clone())
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> RedisHealth {
        let start = Instant::now();

        let result = match self.get_connection().await {
            Ok(mut conn) => redis::cmd("PING").query_async::<String>(&mut conn).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => RedisHealth {
                is_healthy: true,
                latency_ms: start.elapsed().as_millis() as u64,
                total_connections: self.connections.len() as u32,
                error: None,
            },
            Err(e) => {
                error!("Redis health check failed: {}", e);
                RedisHealth {
                    is_healthy: false,
                    latency_ms: start.elapsed().as_millis() as u64,
                    total_connections: self.connections.len() as u32,
                    error: Some(e.to_string()),
                }
            },
        }
    }

    pub fn pool_size(&self) -> u32 {
        self.config.pool_size
    }
}

async fn create_connection_with_retry(
    client: &Client,
    config: &RedisPoolConfig,
) -> Result<ConnectionManager, RedisError> {
    let mut retry_count = 0;
    let mut delay = config.retry_delay;

    loop {
        let attempt = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client.clone()),
        )
        .await
        .unwrap_or_else(|_| {
            Err(RedisError::from((
                redis::ErrorKind::IoError,
                "Connection timeout",
            )))
        });

        match attempt {
            Ok(conn) => return Ok(conn),
            Err(e) if retry_count < config.retry_attempts => {
                warn!(
                    "Failed to create Redis connection (attempt {}/{}): {}",
                    retry_count + 1,
                    config.retry_attempts,
                    e
                );

                sleep(delay).await;

                // Exponential backoff with jitter
                let jitter = thread_rng().gen_range(0..100);
                delay = std::cmp::min(delay * 2 + Duration::from_millis(jitter), MAX_RETRY_DELAY);
                retry_count += 1;
            },
            Err(e) => {
                error!(
                    "Failed to create Redis connection after {} attempts",
                    config.retry_attempts
                );
                return Err(e);
            },
        }
    }
}

/// Mask Redis URL for logging
pub fn mask_redis_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let host = parsed.host_str().unwrap_or("***");
        let port = parsed.port().unwrap_or(6379);

        if !parsed.username().is_empty() || parsed.password().is_some() {
            format!("redis://***:***@{}:{}", host, port)
        } else {
            format!("redis://{}:{}", host, port)
        }
    } else {
        "redis://***:***@***:***".to_string()
    }
}
