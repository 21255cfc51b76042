//! 通知相关枚举
//!
//! 序列化与数据库存储统一使用小写字符串。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 通知类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum NotificationType {
    /// 营销推广
    Marketing,
    /// 订阅周刊
    Newsletter,
    /// 产品更新
    Updates,
}

impl NotificationType {
    pub const ALL: [NotificationType; 3] = [Self::Marketing, Self::Newsletter, Self::Updates];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Newsletter => "newsletter",
            Self::Updates => "updates",
        }
    }
}

/// 通知渠道
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
}

impl NotificationChannel {
    pub const ALL: [NotificationChannel; 3] = [Self::Email, Self::Sms, Self::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

/// 通知记录状态
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum NotificationStatus {
    /// 已创建，尚未投递
    #[default]
    Pending,
    /// 已投递
    Sent,
    /// 投递失败，原因见 failure_reason
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// 通知频率
///
/// `never` 表示用户不希望收到周期性汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Never,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Never => "never",
        }
    }
}

/// 字符串无法解析为枚举值
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! impl_str_conversions {
    ($ty:ty, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == <$ty>::$variant.as_str() {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(ParseEnumError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_str_conversions!(NotificationType, "notification type", [Marketing, Newsletter, Updates]);
impl_str_conversions!(NotificationChannel, "notification channel", [Email, Sms, Push]);
impl_str_conversions!(NotificationStatus, "notification status", [Pending, Sent, Failed]);
impl_str_conversions!(Frequency, "notification frequency", [Daily, Weekly, Monthly, Never]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&NotificationType::Newsletter).unwrap(),
            "\"newsletter\""
        );
        assert_eq!(
            serde_json::from_str::<NotificationChannel>("\"sms\"").unwrap(),
            NotificationChannel::Sms
        );
        assert!(serde_json::from_str::<NotificationChannel>("\"fax\"").is_err());
    }

    #[test]
    fn test_from_str_matches_as_str() {
        for t in NotificationType::ALL {
            assert_eq!(t.as_str().parse::<NotificationType>().unwrap(), t);
        }
        for c in NotificationChannel::ALL {
            assert_eq!(c.to_string().parse::<NotificationChannel>().unwrap(), c);
        }
        assert_eq!("never".parse::<Frequency>().unwrap(), Frequency::Never);
    }

    #[test]
    fn test_from_str_is_case_sensitive() {
        let err = "Email".parse::<NotificationChannel>().unwrap_err();
        assert_eq!(err.kind, "notification channel");
        assert_eq!(err.value, "Email");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(NotificationStatus::default(), NotificationStatus::Pending);
        assert_eq!(Frequency::default(), Frequency::Weekly);
    }
}
