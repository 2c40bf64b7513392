//! Redis connection pool.

use super::error::RedisAdapterError;
use deadpool_redis::{Config, Connection, Pool, Runtime};

/// Redis-backed adapter for queue and repository operations.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Create a new RedisPool with connection pool. No connection is made
    /// until the first command.
    pub fn new(redis_url: &str) -> Result<Self, RedisAdapterError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    pub(super) async fn connection(&self) -> Result<Connection, RedisAdapterError> {
        Ok(self.pool.get().await?)
    }
}
