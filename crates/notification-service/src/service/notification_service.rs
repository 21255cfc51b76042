//! 通知服务
//!
//! 发送前按用户偏好做准入判断，然后直接写入一条 `sent` 记录；
//! 同时提供记录查询与统计。

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use notify_shared::observability::metrics;

use crate::dto::{NotificationLogFilter, SendNotificationRequest};
use crate::error::{Result, ServiceError};
use crate::models::{
    NewNotificationLog, NotificationContent, NotificationLog, NotificationLogQuery,
    NotificationMetadata, NotificationStats, NotificationStatus,
};
use crate::repository::{NotificationLogRepositoryTrait, PreferenceRepositoryTrait};
use crate::validation::validate_notification_user_id;

/// 标题最大字符数
pub const SUBJECT_MAX_CHARS: usize = 200;
/// 正文最大字符数
pub const BODY_MAX_CHARS: usize = 2000;
/// 单次查询返回的最大记录数
pub const LOG_QUERY_LIMIT: i64 = 100;

/// 清理通知内容：去除首尾空白并按字符截断
///
/// 截断后再去一次尾部空白，保证 `sanitize(sanitize(x)) == sanitize(x)`
pub fn sanitize_content(content: Option<&str>, max_chars: usize) -> String {
    let trimmed = content.unwrap_or_default().trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

pub struct NotificationService {
    preference_repo: Arc<dyn PreferenceRepositoryTrait>,
    log_repo: Arc<dyn NotificationLogRepositoryTrait>,
}

impl NotificationService {
    pub fn new(
        preference_repo: Arc<dyn PreferenceRepositoryTrait>,
        log_repo: Arc<dyn NotificationLogRepositoryTrait>,
    ) -> Self {
        Self {
            preference_repo,
            log_repo,
        }
    }

    /// 发送通知
    ///
    /// 渠道开关与类型订阅必须同时打开，否则拒绝
    #[instrument(
        skip(self, req),
        fields(user_id = %req.user_id, notification_type = %req.notification_type, channel = %req.channel)
    )]
    pub async fn send_notification(&self, req: SendNotificationRequest) -> Result<NotificationLog> {
        self.try_send(req).await.inspect_err(|e| {
            metrics::record_notification_rejected(e.error_code());
            if e.status_code().is_server_error() {
                error!(error = %e, "Failed to send notification");
            } else {
                warn!(error = %e, "Failed to send notification");
            }
        })
    }

    async fn try_send(&self, req: SendNotificationRequest) -> Result<NotificationLog> {
        validate_notification_user_id(&req.user_id)?;
        req.validate()?;

        let content = NotificationContent {
            subject: sanitize_content(req.content.subject.as_deref(), SUBJECT_MAX_CHARS),
            body: sanitize_content(req.content.body.as_deref(), BODY_MAX_CHARS),
        };

        let preference = self
            .preference_repo
            .find_by_user_id(&req.user_id)
            .await?
            .ok_or_else(|| ServiceError::PreferenceNotFound(req.user_id.clone()))?;

        if !preference
            .preferences
            .allows(req.notification_type, req.channel)
        {
            return Err(ServiceError::NotificationNotAllowed);
        }

        let log = self
            .log_repo
            .create(&NewNotificationLog {
                user_id: req.user_id,
                notification_type: req.notification_type,
                channel: req.channel,
                status: NotificationStatus::Sent,
                sent_at: Some(Utc::now()),
                failure_reason: None,
                metadata: NotificationMetadata { content },
            })
            .await?;

        metrics::record_notification_sent(log.notification_type.as_str(), log.channel.as_str());
        info!(log_id = log.id, "Notification sent");
        Ok(log)
    }

    /// 查询用户的通知记录，按发送时间倒序，最多 100 条
    #[instrument(skip(self, filter))]
    pub async fn get_user_notification_logs(
        &self,
        user_id: &str,
        filter: NotificationLogFilter,
    ) -> Result<Vec<NotificationLog>> {
        validate_notification_user_id(user_id)?;

        let query = NotificationLogQuery {
            user_id: user_id.to_string(),
            notification_type: filter.notification_type,
            channel: filter.channel,
            status: filter.status,
        };

        self.log_repo
            .list(&query, LOG_QUERY_LIMIT)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list notification logs"))
    }

    /// 单个用户的通知统计
    #[instrument(skip(self))]
    pub async fn get_notification_stats(&self, user_id: &str) -> Result<NotificationStats> {
        validate_notification_user_id(user_id)?;
        self.stats(Some(user_id.to_string())).await
    }

    /// 全局通知统计
    #[instrument(skip(self))]
    pub async fn get_global_notification_stats(&self) -> Result<NotificationStats> {
        self.stats(None).await
    }

    async fn stats(&self, user_id: Option<String>) -> Result<NotificationStats> {
        let counts = self
            .log_repo
            .count_by_status_and_type(user_id)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to aggregate notification stats"))?;

        Ok(NotificationStats::from_counts(&counts))
    }
}
