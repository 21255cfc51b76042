//! 用户通知偏好

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Frequency, NotificationChannel, NotificationType};

/// 各渠道开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelToggles {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl ChannelToggles {
    pub fn is_enabled(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::Email => self.email,
            NotificationChannel::Sms => self.sms,
            NotificationChannel::Push => self.push,
        }
    }
}

/// 偏好设置主体，以 JSONB 形式整体存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub marketing: bool,
    pub newsletter: bool,
    pub updates: bool,
    pub frequency: Frequency,
    pub channels: ChannelToggles,
}

impl Preferences {
    /// 用户是否订阅了该类型
    pub fn is_subscribed(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::Marketing => self.marketing,
            NotificationType::Newsletter => self.newsletter,
            NotificationType::Updates => self.updates,
        }
    }

    /// 类型订阅与渠道开关必须同时打开
    pub fn allows(&self, notification_type: NotificationType, channel: NotificationChannel) -> bool {
        self.is_subscribed(notification_type) && self.channels.is_enabled(channel)
    }
}

/// 已持久化的用户偏好
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    pub id: i64,
    pub user_id: String,
    pub email: String,
    pub timezone: String,
    #[sqlx(json)]
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待插入的偏好（字段均已校验）
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserPreference {
    pub user_id: String,
    pub email: String,
    pub timezone: String,
    pub preferences: Preferences,
}

/// 部分更新，None 表示保持原值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencePatch {
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub preferences: Option<Preferences>,
}

impl PreferencePatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.timezone.is_none() && self.preferences.is_none()
    }

    /// 将补丁应用到已有记录上，仅内存存储使用
    pub fn apply_to(&self, target: &mut UserPreference) {
        if let Some(email) = &self.email {
            target.email = email.clone();
        }
        if let Some(timezone) = &self.timezone {
            target.timezone = timezone.clone();
        }
        if let Some(preferences) = self.preferences {
            target.preferences = preferences;
        }
    }
}
