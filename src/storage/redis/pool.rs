//! Redis client and connection management

use crate::config::RedisConfig;
use crate::utils::error::{CacheError, Result};
use redis::{Client, Script, aio::MultiplexedConnection};
use std::time::Duration;
use tracing::{debug, info};

/// Releases a lock only while it still holds the caller's token
const RELEASE_IF_OWNER: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Redis-backed Remote Tier
///
/// Commands share one multiplexed connection; pub/sub subscriptions open
/// their own dedicated connection from the client.
#[derive(Clone)]
pub struct RedisPool {
    pub(crate) client: Client,
    pub(crate) connection: MultiplexedConnection,
    pub(crate) release_script: Script,
    pub(crate) config: RedisConfig,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("url", &Self::sanitize_url(&self.config.url))
            .finish()
    }
}

impl RedisPool {
    /// Connect to Redis
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis Remote Tier");
        debug!("Redis URL: {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(CacheError::Redis)?;

        let timeout = Duration::from_secs(config.connection_timeout);
        let connection = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                CacheError::unavailable(format!(
                    "Redis connection timed out after {}s",
                    config.connection_timeout
                ))
            })?
            .map_err(CacheError::Redis)?;

        info!("Redis connection established");
        Ok(Self {
            client,
            connection,
            release_script: Script::new(RELEASE_IF_OWNER),
            config: config.clone(),
        })
    }

    /// Clone of the shared multiplexed connection
    pub(crate) fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Redis)?;
        debug!("Redis health check passed");
        Ok(())
    }

    /// Sanitize Redis URL for logging (hide password)
    pub(crate) fn sanitize_url(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "invalid_url".to_string(),
        }
    }
}
