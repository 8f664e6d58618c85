//! Check-in rate limiting backed by Redis
//!
//! Sliding window over a sorted set, one key per (organization, student).

use crate::error::{ApiError, Result};
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Attempts allowed per window
    pub limit: u32,
    /// Window size in seconds
    pub window_seconds: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window_seconds: 60,
        }
    }
}

/// Per-student limiter for check-in attempts
///
/// Without a Redis client every attempt is allowed.
#[derive(Clone)]
pub struct CheckInRateLimiter {
    redis_client: Option<Arc<Client>>,
    config: RateLimitConfig,
}

impl CheckInRateLimiter {
    pub fn new(redis_client: Arc<Client>, config: RateLimitConfig) -> Self {
        Self {
            redis_client: Some(redis_client),
            config,
        }
    }

    pub fn disabled() -> Self {
        Self {
            redis_client: None,
            config: RateLimitConfig::default(),
        }
    }

    /// Fails with `RateLimitExceeded` once the student is over the limit
    pub async fn check(&self, organization_id: Uuid, student_id: Uuid) -> Result<()> {
        let Some(redis_client) = &self.redis_client else {
            return Ok(());
        };

        let key = rate_limit_key(organization_id, student_id);
        let allowed =
            check_rate_limit(redis_client, &key, self.config.limit, self.config.window_seconds)
                .await?;

        if !allowed {
            warn!(
                organization_id = %organization_id,
                student_id = %student_id,
                "Check-in rate limit exceeded"
            );
            return Err(ApiError::RateLimitExceeded);
        }

        debug!(student_id = %student_id, "Check-in rate limit check passed");
        Ok(())
    }
}

fn rate_limit_key(organization_id: Uuid, student_id: Uuid) -> String {
    format!("rate_limit:checkin:{}:{}", organization_id, student_id)
}

/// Returns true if the attempt is allowed, false if the limit is exceeded.
async fn check_rate_limit(
    redis_client: &Client,
    key: &str,
    limit: u32,
    window_seconds: u32,
) -> Result<bool> {
    let mut conn = redis_client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis connection failed: {}", e)))?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let window_start = now - i64::from(window_seconds);

    // Drop attempts that fell out of the window
    let _: () = conn
        .zrembyscore(key, 0, window_start as f64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZREMRANGEBYSCORE failed: {}", e)))?;

    let count: u32 = conn
        .zcard(key)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZCARD failed: {}", e)))?;

    if count >= limit {
        return Ok(false);
    }

    let member = format!("{}:{}", now, Uuid::new_v4());
    let _: () = conn
        .zadd(key, member, now as f64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZADD failed: {}", e)))?;

    let _: () = conn
        .expire(key, i64::from(window_seconds) + 10)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis EXPIRE failed: {}", e)))?;

    Ok(true)
}
