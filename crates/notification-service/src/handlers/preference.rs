//! 用户偏好 API 处理器

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::{
    dto::{ApiResponse, CreatePreferenceRequest, UpdatePreferenceRequest},
    error::ServiceError,
    models::UserPreference,
    state::AppState,
};

/// 创建用户偏好
///
/// POST /api/preferences
pub async fn create_preference(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreatePreferenceRequest>, ServiceError>,
) -> Result<(StatusCode, Json<ApiResponse<UserPreference>>), ServiceError> {
    let created = state.preference_service.create_preference(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// 查询用户偏好
///
/// GET /api/preferences/{user_id}
pub async fn get_preference(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<String>, ServiceError>,
) -> Result<Json<ApiResponse<UserPreference>>, ServiceError> {
    let preference = state.preference_service.get_user_preference(&user_id).await?;
    Ok(Json(ApiResponse::success(preference)))
}

/// 部分更新用户偏好
///
/// PATCH /api/preferences/{user_id}
pub async fn update_preference(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<String>, ServiceError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdatePreferenceRequest>, ServiceError>,
) -> Result<Json<ApiResponse<UserPreference>>, ServiceError> {
    let updated = state
        .preference_service
        .update_preference(&user_id, req)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// 删除用户偏好
///
/// DELETE /api/preferences/{user_id}
pub async fn delete_preference(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<String>, ServiceError>,
) -> Result<StatusCode, ServiceError> {
    state.preference_service.delete_preference(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
