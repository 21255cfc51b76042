//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{get, post},
};

use notify_shared::observability::middleware as obs_middleware;

use crate::{
    handlers,
    middleware::{GroupRateLimit, api_key_auth, rate_limit},
    state::AppState,
};

/// 限流分组名
pub const NOTIFICATIONS_GROUP: &str = "notifications";
pub const PREFERENCES_GROUP: &str = "preferences";

/// 通知相关路由
fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/notifications/send", post(handlers::notification::send_notification))
        .route("/notifications/stats", get(handlers::notification::get_global_stats))
        .route(
            "/notifications/{user_id}/logs",
            get(handlers::notification::get_user_logs),
        )
        .route(
            "/notifications/{user_id}/stats",
            get(handlers::notification::get_user_stats),
        )
        .route_layer(middleware::from_fn_with_state(
            GroupRateLimit::new(state.rate_limiter.clone(), NOTIFICATIONS_GROUP),
            rate_limit,
        ))
}

/// 用户偏好路由
fn preference_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/preferences", post(handlers::preference::create_preference))
        .route(
            "/preferences/{user_id}",
            get(handlers::preference::get_preference)
                .patch(handlers::preference::update_preference)
                .delete(handlers::preference::delete_preference),
        )
        .route_layer(middleware::from_fn_with_state(
            GroupRateLimit::new(state.rate_limiter.clone(), PREFERENCES_GROUP),
            rate_limit,
        ))
}

/// 需要 API Key 的业务路由
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(notification_routes(state))
        .merge(preference_routes(state))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_auth))
}

/// 完整应用路由（不含 CORS、超时等部署相关的层）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(&state))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
