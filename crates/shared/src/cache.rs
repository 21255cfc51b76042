//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和限流计数所需的原子操作。

use crate::config::RedisConfig;
use crate::error::{Result, SharedError};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 缓存客户端
#[derive(Clone, Debug)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端
    ///
    /// 只解析连接地址，首次执行命令时才真正建立连接
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(SharedError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(SharedError::from)
    }

    /// 增量操作
    #[instrument(skip(self))]
    pub async fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.get_conn().await?;
        let result: i64 = conn.incr(key, delta).await?;
        Ok(result)
    }

    /// 设置过期时间
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    /// 限流窗口计数器键
    ///
    /// 同一 API Key、同一路由分组、同一窗口共享一个计数器
    pub fn rate_limit(key_digest: &str, group: &str, window: u64) -> String {
        format!("rl:{}:{}:{}", group, key_digest, window)
    }
}
