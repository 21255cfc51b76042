//! 仓储 Trait 定义

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    NewNotificationLog, NewUserPreference, NotificationLog, NotificationLogQuery,
    PreferencePatch, StatusTypeCount, UserPreference,
};

/// 用户偏好仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceRepositoryTrait: Send + Sync {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserPreference>>;

    /// 插入新记录，userId 或 email 冲突时返回 Conflict 类错误
    async fn create(&self, preference: &NewUserPreference) -> Result<UserPreference>;

    /// 仅更新已存在的记录，不存在时返回 None
    async fn update(&self, user_id: &str, patch: &PreferencePatch)
    -> Result<Option<UserPreference>>;

    /// 返回是否删除了记录
    async fn delete(&self, user_id: &str) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;
}

/// 通知记录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationLogRepositoryTrait: Send + Sync {
    async fn create(&self, log: &NewNotificationLog) -> Result<NotificationLog>;

    /// 按 sentAt 倒序返回最多 limit 条
    async fn list(&self, query: &NotificationLogQuery, limit: i64) -> Result<Vec<NotificationLog>>;

    /// 按 (status, type) 分组计数，user_id 为 None 时统计全部用户
    async fn count_by_status_and_type(&self, user_id: Option<String>)
    -> Result<Vec<StatusTypeCount>>;
}
