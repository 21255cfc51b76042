//! 应用状态定义
//!
//! 服务在启动时构建，通过 Arc 在 handler 间共享

use std::sync::Arc;

use notify_shared::cache::Cache;

use crate::middleware::{ApiKeyRegistry, RateLimiter};
use crate::repository::{
    MemoryNotificationLogRepository, MemoryPreferenceRepository, NotificationLogRepositoryTrait,
    PreferenceRepositoryTrait,
};
use crate::service::{NotificationService, PreferenceService};

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub preference_service: Arc<PreferenceService>,
    pub notification_service: Arc<NotificationService>,
    pub api_keys: Arc<ApiKeyRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    /// 仅在配置了 Redis 时存在，就绪探针据此决定是否检查 Redis
    pub cache: Option<Arc<Cache>>,
    pub service_name: String,
}

impl AppState {
    pub fn new(
        preference_repo: Arc<dyn PreferenceRepositoryTrait>,
        log_repo: Arc<dyn NotificationLogRepositoryTrait>,
        api_keys: ApiKeyRegistry,
        rate_limiter: RateLimiter,
        cache: Option<Arc<Cache>>,
    ) -> Self {
        Self {
            preference_service: Arc::new(PreferenceService::new(preference_repo.clone())),
            notification_service: Arc::new(NotificationService::new(preference_repo, log_repo)),
            api_keys: Arc::new(api_keys),
            rate_limiter: Arc::new(rate_limiter),
            cache,
            service_name: crate::SERVICE_NAME.to_string(),
        }
    }

    /// 使用内存仓储构建，供本地开发和测试
    pub fn in_memory(api_keys: ApiKeyRegistry, rate_limiter: RateLimiter) -> Self {
        Self::new(
            Arc::new(MemoryPreferenceRepository::new()),
            Arc::new(MemoryNotificationLogRepository::new()),
            api_keys,
            rate_limiter,
            None,
        )
    }
}
