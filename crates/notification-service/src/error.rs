//! 通知服务错误类型定义
//!
//! 校验类错误的 message 直接返回给客户端，系统类错误只返回通用提示。

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::validation::ValidationFailure;

/// Postgres 唯一约束冲突
const PG_UNIQUE_VIOLATION: &str = "23505";

/// 邮箱唯一约束名，见 migrations
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "user_preferences_email_key";

/// 通知服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    // 请求错误
    #[error("{0}")]
    Validation(String),
    #[error("Notification not allowed by user preferences")]
    NotificationNotAllowed,

    // 认证与限流
    #[error("{0}")]
    Unauthorized(String),
    #[error("Too many requests, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    // 资源状态
    #[error("User preferences not found")]
    PreferenceNotFound(String),
    #[error("User preferences already exist")]
    PreferenceAlreadyExists(String),
    #[error("Email address already in use")]
    EmailAlreadyInUse,

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ServiceError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::NotificationNotAllowed => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PreferenceNotFound(_) => StatusCode::NOT_FOUND,
            Self::PreferenceAlreadyExists(_) | Self::EmailAlreadyInUse => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotificationNotAllowed => "NOTIFICATION_NOT_ALLOWED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::PreferenceNotFound(_) => "PREFERENCE_NOT_FOUND",
            Self::PreferenceAlreadyExists(_) | Self::EmailAlreadyInUse => "PREFERENCE_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 将插入/更新时的唯一约束冲突归类为 Conflict
    pub fn from_write_error(err: sqlx::Error, user_id: &str) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) => {
                Some(db.constraint().unwrap_or_default().to_string())
            }
            _ => None,
        };

        match constraint {
            Some(name) if name == EMAIL_UNIQUE_CONSTRAINT => Self::EmailAlreadyInUse,
            Some(_) => Self::PreferenceAlreadyExists(user_id.to_string()),
            None => Self::Database(err),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<ValidationFailure> for ServiceError {
    fn from(err: ValidationFailure) -> Self {
        Self::Validation(err.to_string())
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 请求体无法解析（非法 JSON、未知枚举值等）统一按 400 处理
impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ServiceError>;
