//! 请求 DTO 定义
//!
//! 必填字符串缺省为空串，交由服务层给出明确的校验文案，而不是反序列化错误。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::models::{NotificationChannel, NotificationStatus, NotificationType};

/// 创建偏好请求
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreferenceRequest {
    #[serde(default)]
    #[validate(length(max = 128, message = "userId must be at most 128 characters"))]
    pub user_id: String,
    #[serde(default)]
    #[validate(length(max = 254, message = "email must be at most 254 characters"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 64, message = "timezone must be at most 64 characters"))]
    pub timezone: String,
    /// 结构由 validation::parse_preferences 校验
    #[serde(default)]
    pub preferences: serde_json::Value,
}

/// 部分更新偏好请求
///
/// userId 以路径为准，请求体中的 userId 忽略；显式 null 等同于未提供
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferenceRequest {
    #[validate(length(max = 254, message = "email must be at most 254 characters"))]
    pub email: Option<String>,
    #[validate(length(max = 64, message = "timezone must be at most 64 characters"))]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "null_as_none")]
    pub preferences: Option<serde_json::Value>,
}

/// 通知内容，subject/body 缺省为空串
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendNotificationContent {
    pub subject: Option<String>,
    pub body: Option<String>,
}

/// 发送通知请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[serde(default)]
    #[validate(length(max = 128, message = "userId must be at most 128 characters"))]
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub channel: NotificationChannel,
    #[serde(default)]
    pub content: SendNotificationContent,
}

/// 通知记录查询参数
///
/// 空字符串视为未提供；非法枚举值返回 400
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationLogFilter {
    #[serde(rename = "type", default, deserialize_with = "empty_string_as_none")]
    pub notification_type: Option<NotificationType>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub channel: Option<NotificationChannel>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<NotificationStatus>,
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn null_as_none<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()))
}
