// Rate limiting for generation endpoints
// Redis sorted-set sliding window keyed by user and endpoint

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::RedisPool;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Rate limit store error: {0}")]
    Store(String),
}

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the time window
    pub max_requests: u32,

    /// Time window in seconds
    pub window_seconds: u32,
}

impl RateLimitConfig {
    /// Generation endpoints: five runs per rolling minute
    pub fn generation() -> Self {
        Self {
            max_requests: 5,
            window_seconds: 60,
        }
    }

    pub fn window_millis(&self) -> i64 {
        self.window_seconds as i64 * 1000
    }
}

/// Rate limit check result
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,

    /// Remaining requests in current window
    pub remaining: u32,

    /// Seconds until the oldest counted request leaves the window
    pub retry_after: Option<u32>,

    pub current_count: u32,

    /// Window entry held by an admitted request, handed back via `release`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
}

impl RateLimitResult {
    pub fn from_count(current_count: u32, oldest_millis: Option<i64>, now_millis: i64, config: &RateLimitConfig) -> Self {
        let allowed = current_count < config.max_requests;
        let retry_after = if allowed {
            None
        } else {
            let frees_at = oldest_millis.unwrap_or(now_millis) + config.window_millis();
            let wait_ms = (frees_at - now_millis).max(0);
            Some(((wait_ms + 999) / 1000) as u32)
        };

        Self {
            allowed,
            remaining: config.max_requests.saturating_sub(current_count),
            retry_after,
            current_count,
            slot: None,
        }
    }

    /// A request that took `slot`, leaving `current_count` entries in the window
    pub fn admitted(current_count: u32, slot: String, config: &RateLimitConfig) -> Self {
        Self {
            allowed: true,
            remaining: config.max_requests.saturating_sub(current_count),
            retry_after: None,
            current_count,
            slot: Some(slot),
        }
    }
}

pub fn rate_limit_key(user_id: Uuid, endpoint: &str) -> String {
    format!("rate_limit:user:{}:{}", user_id, endpoint)
}

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Sliding-window counter per (user, endpoint).
///
/// `acquire` counts and admits in one step, so a burst of parallel requests
/// can never overshoot the ceiling. Callers `release` the slot of a request
/// that should not count after all.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self, user_id: Uuid, endpoint: &str) -> Result<RateLimitResult, RateLimitError>;

    async fn release(&self, user_id: Uuid, endpoint: &str, slot: &str) -> Result<(), RateLimitError>;
}

pub struct RedisRateLimiter {
    redis_pool: RedisPool,
    config: RateLimitConfig,
}

impl RedisRateLimiter {
    pub fn new(redis_pool: RedisPool, config: RateLimitConfig) -> Self {
        Self { redis_pool, config }
    }
}

// Trims expired entries, then adds `member` only while the window has room.
// Returns {admitted, count, oldest score or -1}.
const ACQUIRE_SCRIPT: &str = r#"
    local key = KEYS[1]
    local now = tonumber(ARGV[1])
    local window_ms = tonumber(ARGV[2])
    local max_requests = tonumber(ARGV[3])
    local member = ARGV[4]

    redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window_ms)
    local count = redis.call('ZCARD', key)

    if count < max_requests then
        redis.call('ZADD', key, now, member)
        redis.call('PEXPIRE', key, window_ms)
        return {1, count + 1, -1}
    end

    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    if oldest[2] then
        return {0, count, tonumber(oldest[2])}
    end
    return {0, count, -1}
"#;

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    #[instrument(skip(self))]
    async fn acquire(&self, user_id: Uuid, endpoint: &str) -> Result<RateLimitResult, RateLimitError> {
        let mut conn = self.redis_pool.get_connection().await?;
        let now = Utc::now().timestamp_millis();
        let member = format!("{}:{}", now, Uuid::new_v4());

        let (admitted, count, oldest): (i64, i64, i64) = redis::Script::new(ACQUIRE_SCRIPT)
            .key(rate_limit_key(user_id, endpoint))
            .arg(now)
            .arg(self.config.window_millis())
            .arg(self.config.max_requests)
            .arg(&member)
            .invoke_async(&mut conn)
            .await?;

        let count = count.max(0) as u32;
        if admitted == 1 {
            debug!(
                "Admitted {} request for user {} ({} in window)",
                endpoint, user_id, count
            );
            return Ok(RateLimitResult::admitted(count, member, &self.config));
        }

        let oldest = (oldest >= 0).then_some(oldest);
        Ok(RateLimitResult::from_count(count, oldest, now, &self.config))
    }

    #[instrument(skip(self))]
    async fn release(&self, user_id: Uuid, endpoint: &str, slot: &str) -> Result<(), RateLimitError> {
        let mut conn = self.redis_pool.get_connection().await?;
        let removed: i64 = conn.zrem(rate_limit_key(user_id, endpoint), slot).await?;

        debug!(
            "Released {} slot for user {} ({} removed)",
            endpoint, user_id, removed
        );
        Ok(())
    }
}
