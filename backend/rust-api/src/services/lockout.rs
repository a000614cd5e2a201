use crate::metrics::track_cache_operation;

pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCKOUT_WINDOW_SECONDS: u64 = 15 * 60;

/// Failed-login counters in Redis, keyed by normalised email.
///
/// Redis outages fail open: login keeps working without lockout.
pub struct LoginLockout {
    redis: redis::Client,
}

pub fn lockout_key(email: &str) -> String {
    format!("login:failures:{}", email.trim().to_lowercase())
}

impl LoginLockout {
    pub fn new(redis: redis::Client) -> Self {
        Self { redis }
    }

    async fn connect(&self) -> anyhow::Result<redis::aio::MultiplexedConnection> {
        let conn = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            self.redis.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 500ms"))??;
        Ok(conn)
    }

    pub async fn is_locked(&self, email: &str) -> bool {
        let key = lockout_key(email);
        let result = track_cache_operation("lockout_get", async {
            let mut conn = self.connect().await?;
            let count: Option<u32> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
            Ok::<_, anyhow::Error>(count.unwrap_or(0))
        })
        .await;

        match result {
            Ok(count) => count >= MAX_FAILED_ATTEMPTS,
            Err(e) => {
                tracing::warn!("Lockout check unavailable: {}", e);
                false
            }
        }
    }

    /// Counts a failure; the window starts at the first failure.
    pub async fn record_failure(&self, email: &str) {
        let key = lockout_key(email);
        let lua_script = r#"
            local current = redis.call('INCR', KEYS[1])
            if current == 1 then
                redis.call('EXPIRE', KEYS[1], ARGV[1])
            end
            return current
        "#;

        let result = track_cache_operation("lockout_incr", async {
            let mut conn = self.connect().await?;
            let count: u32 = redis::Script::new(lua_script)
                .key(&key)
                .arg(LOCKOUT_WINDOW_SECONDS)
                .invoke_async(&mut conn)
                .await?;
            Ok::<_, anyhow::Error>(count)
        })
        .await;

        match result {
            Ok(count) if count >= MAX_FAILED_ATTEMPTS => {
                tracing::warn!(attempts = count, "Login locked after repeated failures");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to record login failure: {}", e),
        }
    }

    pub async fn clear(&self, email: &str) {
        let key = lockout_key(email);
        let result = track_cache_operation("lockout_clear", async {
            let mut conn = self.connect().await?;
            let _: i64 = redis::cmd("DEL").arg(&key).query_async(&mut conn).await?;
            Ok::<_, anyhow::Error>(())
        })
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to clear login failures: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_case_and_whitespace() {
        assert_eq!(lockout_key(" Ada@Example.com "), "login:failures:ada@example.com");
    }
}
