//! 分组限流中间件
//!
//! 固定窗口计数：同一 API Key 在同一路由分组（notifications / preferences）内，
//! 每个窗口最多放行 max_requests 次。计数器存放在进程内存或 Redis（INCR + EXPIRE），
//! Redis 不可用时放行。

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tracing::warn;

use notify_shared::cache::{Cache, CacheKey};
use notify_shared::config::{RateLimitBackend, RateLimitConfig};
use notify_shared::observability::metrics;

use super::api_key_auth::ApiKeyContext;
use crate::error::ServiceError;

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: i64 },
    Limited { retry_after_secs: u64 },
}

enum CounterStore {
    /// (group, key_digest) -> (window, count)
    Memory(DashMap<(&'static str, String), (u64, i64)>),
    Redis(Arc<Cache>),
}

/// 固定窗口限流器
pub struct RateLimiter {
    enabled: bool,
    max_requests: i64,
    window_secs: u64,
    store: CounterStore,
}

impl RateLimiter {
    /// 按配置选择计数器后端；配置为 Redis 但未提供连接时退回内存计数
    pub fn from_config(config: &RateLimitConfig, cache: Option<Arc<Cache>>) -> Self {
        let store = match (config.backend, cache) {
            (RateLimitBackend::Redis, Some(cache)) => CounterStore::Redis(cache),
            (RateLimitBackend::Redis, None) => {
                warn!("Rate limit backend is redis but no Redis client is available, using memory counters");
                CounterStore::Memory(DashMap::new())
            }
            (RateLimitBackend::Memory, _) => CounterStore::Memory(DashMap::new()),
        };

        Self {
            enabled: config.enabled,
            max_requests: config.max_requests,
            window_secs: config.window_secs.max(1),
            store,
        }
    }

    pub fn memory(max_requests: i64, window_secs: u64) -> Self {
        Self {
            enabled: true,
            max_requests,
            window_secs: window_secs.max(1),
            store: CounterStore::Memory(DashMap::new()),
        }
    }

    /// 记一次请求并判定是否超限
    pub async fn check(&self, key_digest: &str, group: &'static str) -> RateLimitDecision {
        if !self.enabled {
            return RateLimitDecision::Allowed {
                remaining: self.max_requests,
            };
        }

        let now = unix_now();
        let window = now / self.window_secs;

        let count = match &self.store {
            CounterStore::Memory(counters) => {
                let mut entry = counters
                    .entry((group, key_digest.to_string()))
                    .or_insert((window, 0));
                if entry.0 != window {
                    *entry = (window, 0);
                }
                entry.1 += 1;
                entry.1
            }
            CounterStore::Redis(cache) => {
                match redis_incr(cache, key_digest, group, window, self.window_secs).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(error = %e, group, "Redis 限流检查失败，跳过限流");
                        return RateLimitDecision::Allowed {
                            remaining: self.max_requests,
                        };
                    }
                }
            }
        };

        if count > self.max_requests {
            RateLimitDecision::Limited {
                retry_after_secs: retry_after(now, self.window_secs),
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.max_requests - count,
            }
        }
    }
}

/// 使用 Redis INCR + EXPIRE 实现固定窗口计数器
async fn redis_incr(
    cache: &Cache,
    key_digest: &str,
    group: &str,
    window: u64,
    window_secs: u64,
) -> notify_shared::error::Result<i64> {
    let key = CacheKey::rate_limit(key_digest, group, window);
    let count = cache.incr(&key, 1).await?;

    // 首次创建时设置过期时间，确保窗口到期后自动清理
    if count == 1 {
        cache.expire(&key, Duration::from_secs(window_secs)).await?;
    }

    Ok(count)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 当前窗口剩余秒数，至少为 1
fn retry_after(now: u64, window_secs: u64) -> u64 {
    (window_secs - now % window_secs).max(1)
}

/// 某个路由分组的限流状态
#[derive(Clone)]
pub struct GroupRateLimit {
    pub limiter: Arc<RateLimiter>,
    pub group: &'static str,
}

impl GroupRateLimit {
    pub fn new(limiter: Arc<RateLimiter>, group: &'static str) -> Self {
        Self { limiter, group }
    }
}

/// 限流中间件
///
/// 放置在认证中间件之后，依赖其注入的 ApiKeyContext
pub async fn rate_limit(
    State(state): State<GroupRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let Some(key_digest) = request
        .extensions()
        .get::<ApiKeyContext>()
        .map(|context| context.key_digest.clone())
    else {
        return Ok(next.run(request).await);
    };

    match state.limiter.check(&key_digest, state.group).await {
        RateLimitDecision::Allowed { .. } => Ok(next.run(request).await),
        RateLimitDecision::Limited { retry_after_secs } => {
            warn!(group = state.group, path = %request.uri().path(), "限流触发");
            metrics::record_rate_limited(state.group);
            Err(ServiceError::RateLimited { retry_after_secs })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_limiter_blocks_after_quota() {
        let limiter = RateLimiter::memory(3, 60);
        for expected_remaining in [2, 1, 0] {
            assert_eq!(
                limiter.check("digest", "notifications").await,
                RateLimitDecision::Allowed {
                    remaining: expected_remaining
                }
            );
        }
        assert!(matches!(
            limiter.check("digest", "notifications").await,
            RateLimitDecision::Limited { retry_after_secs } if (1..=60).contains(&retry_after_secs)
        ));
    }

    #[tokio::test]
    async fn test_groups_and_keys_are_independent() {
        let limiter = RateLimiter::memory(1, 60);
        assert!(matches!(
            limiter.check("a", "notifications").await,
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("a", "preferences").await,
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("b", "notifications").await,
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("a", "notifications").await,
            RateLimitDecision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_disabled_limiter_always_allows() {
        let config = RateLimitConfig {
            enabled: false,
            max_requests: 1,
            ..Default::default()
        };
        let limiter = RateLimiter::from_config(&config, None);
        for _ in 0..5 {
            assert!(matches!(
                limiter.check("a", "preferences").await,
                RateLimitDecision::Allowed { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_redis_unavailable_fails_open() {
        let cache = Cache::new(&notify_shared::config::RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
        })
        .unwrap();
        let config = RateLimitConfig {
            backend: RateLimitBackend::Redis,
            max_requests: 1,
            ..Default::default()
        };
        let limiter = RateLimiter::from_config(&config, Some(Arc::new(cache)));
        for _ in 0..3 {
            assert!(matches!(
                limiter.check("a", "notifications").await,
                RateLimitDecision::Allowed { .. }
            ));
        }
    }

    #[test]
    fn test_retry_after_bounds() {
        assert_eq!(retry_after(120, 60), 60);
        assert_eq!(retry_after(119, 60), 1);
        assert_eq!(retry_after(90, 60), 30);
    }
}
