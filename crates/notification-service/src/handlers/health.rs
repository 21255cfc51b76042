//! 健康检查与就绪探针

use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    dto::{HealthResponse, ReadyResponse},
    state::AppState,
};

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// 就绪探针：检查存储和 Redis（若已配置）
///
/// 任一依赖失败时返回 503
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let mut checks = BTreeMap::new();
    let mut all_ok = true;

    match state.preference_service.health_check().await {
        Ok(()) => {
            checks.insert("storage", "ok".to_string());
        }
        Err(e) => {
            all_ok = false;
            checks.insert("storage", e.error_code().to_string());
        }
    }

    if let Some(cache) = &state.cache {
        match cache.health_check().await {
            Ok(()) => {
                checks.insert("redis", "ok".to_string());
            }
            Err(e) => {
                all_ok = false;
                checks.insert("redis", e.code().to_string());
            }
        }
    }

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_ok { "ok" } else { "degraded" },
            checks,
        }),
    )
}
