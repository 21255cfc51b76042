//! 通知偏好服务
//!
//! 提供用户通知偏好的增删改查以及通知发送记录、统计 REST API。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
};
use notification_service::{
    AppState, MIGRATOR, SERVICE_NAME,
    middleware::{ApiKeyRegistry, RateLimiter},
    repository::{
        MemoryNotificationLogRepository, MemoryPreferenceRepository, NotificationLogRepository,
        NotificationLogRepositoryTrait, PreferenceRepository, PreferenceRepositoryTrait,
    },
    routes,
};
use notify_shared::{
    cache::Cache,
    config::{AppConfig, RateLimitBackend, StorageBackend},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        storage = ?config.storage.backend,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    // Redis 只在限流使用 Redis 计数时需要
    let cache = match config.rate_limit.backend {
        RateLimitBackend::Redis => Some(Arc::new(Cache::new(&config.redis)?)),
        RateLimitBackend::Memory => None,
    };

    let (preference_repo, log_repo, database) = build_repositories(&config).await?;

    let api_keys = ApiKeyRegistry::from_keys(&config.auth.api_keys);
    if api_keys.is_empty() {
        warn!("No API keys configured, every /api request will be rejected");
    } else {
        info!(count = api_keys.len(), "API keys loaded");
    }

    let rate_limiter = RateLimiter::from_config(&config.rate_limit, cache.clone());
    let state = AppState::new(preference_repo, log_repo, api_keys, rate_limiter, cache);

    let app: Router = routes::app(state)
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors(&config.server.cors_origins, config.is_production()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到 SIGTERM 或 Ctrl+C 时停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server shutdown complete");

    Ok(())
}

type Repositories = (
    Arc<dyn PreferenceRepositoryTrait>,
    Arc<dyn NotificationLogRepositoryTrait>,
    Option<Database>,
);

/// 按配置构建仓储
async fn build_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            if config.database.run_migrations {
                db.run_migrations(&MIGRATOR).await?;
            }
            let preference_repo: Arc<dyn PreferenceRepositoryTrait> =
                Arc::new(PreferenceRepository::new(db.pool().clone()));
            let log_repo: Arc<dyn NotificationLogRepositoryTrait> =
                Arc::new(NotificationLogRepository::new(db.pool().clone()));
            Ok((preference_repo, log_repo, Some(db)))
        }
        StorageBackend::Memory => {
            if config.is_production() {
                warn!("In-memory storage is enabled in production, data is lost on restart");
            }
            let preference_repo: Arc<dyn PreferenceRepositoryTrait> =
                Arc::new(MemoryPreferenceRepository::new());
            let log_repo: Arc<dyn NotificationLogRepositoryTrait> =
                Arc::new(MemoryNotificationLogRepository::new());
            Ok((preference_repo, log_repo, None))
        }
    }
}

/// CORS 配置："*" 放行全部来源，否则按逗号分隔的来源列表
fn build_cors(allowed_origins: &str, is_production: bool) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        if is_production {
            warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
    response
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
