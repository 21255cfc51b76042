//! 通知 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::{
    dto::{ApiResponse, NotificationLogFilter, SendNotificationRequest},
    error::ServiceError,
    models::{NotificationLog, NotificationStats},
    state::AppState,
};

/// 发送通知
///
/// POST /api/notifications/send
pub async fn send_notification(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SendNotificationRequest>, ServiceError>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationLog>>), ServiceError> {
    let log = state.notification_service.send_notification(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(log, "Notification sent")),
    ))
}

/// 查询用户通知记录
///
/// GET /api/notifications/{user_id}/logs?type=&channel=&status=
pub async fn get_user_logs(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<String>, ServiceError>,
    WithRejection(Query(filter), _): WithRejection<Query<NotificationLogFilter>, ServiceError>,
) -> Result<Json<ApiResponse<Vec<NotificationLog>>>, ServiceError> {
    let logs = state
        .notification_service
        .get_user_notification_logs(&user_id, filter)
        .await?;
    Ok(Json(ApiResponse::success(logs)))
}

/// 单个用户的通知统计
///
/// GET /api/notifications/{user_id}/stats
pub async fn get_user_stats(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<String>, ServiceError>,
) -> Result<Json<ApiResponse<NotificationStats>>, ServiceError> {
    let stats = state
        .notification_service
        .get_notification_stats(&user_id)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// 全局通知统计
///
/// GET /api/notifications/stats
pub async fn get_global_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<NotificationStats>>, ServiceError> {
    let stats = state
        .notification_service
        .get_global_notification_stats()
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}
