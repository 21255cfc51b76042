//! 通知发送记录与统计

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NotificationChannel, NotificationStatus, NotificationType};

/// 通知正文，写入 metadata.content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub subject: String,
    pub body: String,
}

/// 通知记录 metadata 列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    pub content: NotificationContent,
}

/// 已持久化的通知记录（只追加）
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLog {
    pub id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[sqlx(json)]
    pub metadata: NotificationMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待写入的通知记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotificationLog {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub metadata: NotificationMetadata,
}

/// 通知记录查询条件，全部为等值匹配
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationLogQuery {
    pub user_id: String,
    pub notification_type: Option<NotificationType>,
    pub channel: Option<NotificationChannel>,
    pub status: Option<NotificationStatus>,
}

impl NotificationLogQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, log: &NotificationLog) -> bool {
        log.user_id == self.user_id
            && self.notification_type.is_none_or(|t| t == log.notification_type)
            && self.channel.is_none_or(|c| c == log.channel)
            && self.status.is_none_or(|s| s == log.status)
    }
}

/// 按 (status, type) 分组的计数，统计的唯一数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusTypeCount {
    pub status: NotificationStatus,
    pub notification_type: NotificationType,
    pub count: i64,
}

/// 通知统计
///
/// 只包含实际出现过的分组，不补零
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total_notifications: i64,
    pub status_stats: BTreeMap<NotificationStatus, i64>,
    pub type_stats: BTreeMap<NotificationType, i64>,
}

impl NotificationStats {
    /// 由同一份分组快照折叠出总数与两个维度的分布，三者天然一致
    pub fn from_counts(counts: &[StatusTypeCount]) -> Self {
        let mut stats = Self::default();
        for row in counts.iter().filter(|row| row.count > 0) {
            stats.total_notifications += row.count;
            *stats.status_stats.entry(row.status).or_insert(0) += row.count;
            *stats.type_stats.entry(row.notification_type).or_insert(0) += row.count;
        }
        stats
    }
}
