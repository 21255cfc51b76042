//! 输入校验
//!
//! 与存储解耦的纯函数，服务层在访问仓储前调用。

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{ChannelToggles, Frequency, Preferences};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("邮箱正则必须合法")
});

/// 偏好设置必须包含的字段
const REQUIRED_PREFERENCE_FIELDS: [&str; 5] =
    ["marketing", "newsletter", "updates", "frequency", "channels"];

const CHANNEL_FIELDS: [&str; 3] = ["email", "sms", "push"];

/// 校验失败原因，Display 即返回给客户端的文案
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("User ID is required and cannot be empty")]
    MissingUserId,
    #[error("User ID cannot be empty")]
    EmptyNotificationUserId,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Timezone is required and cannot be empty")]
    EmptyTimezone,
    #[error("Invalid preferences structure")]
    InvalidPreferencesStructure,
    #[error("Invalid notification frequency")]
    InvalidFrequency,
    #[error("Invalid notification channels")]
    InvalidChannels,
}

/// 偏好接口的 userId 校验
pub fn validate_user_id(user_id: &str) -> Result<(), ValidationFailure> {
    if user_id.trim().is_empty() {
        return Err(ValidationFailure::MissingUserId);
    }
    Ok(())
}

/// 通知接口的 userId 校验，文案与偏好接口不同
pub fn validate_notification_user_id(user_id: &str) -> Result<(), ValidationFailure> {
    if user_id.trim().is_empty() {
        return Err(ValidationFailure::EmptyNotificationUserId);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationFailure> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationFailure::InvalidEmail);
    }
    Ok(())
}

pub fn validate_timezone(timezone: &str) -> Result<(), ValidationFailure> {
    if timezone.trim().is_empty() {
        return Err(ValidationFailure::EmptyTimezone);
    }
    Ok(())
}

/// 解析并校验偏好设置
///
/// 检查顺序：结构 → 频率 → 渠道。
/// 三个类型开关必须是布尔值，渠道对象必须恰好包含 email/sms/push 三个布尔字段。
pub fn parse_preferences(value: &Value) -> Result<Preferences, ValidationFailure> {
    let object = value
        .as_object()
        .ok_or(ValidationFailure::InvalidPreferencesStructure)?;

    if REQUIRED_PREFERENCE_FIELDS
        .iter()
        .any(|field| !object.contains_key(*field))
    {
        return Err(ValidationFailure::InvalidPreferencesStructure);
    }

    let marketing = bool_field(object, "marketing")?;
    let newsletter = bool_field(object, "newsletter")?;
    let updates = bool_field(object, "updates")?;

    let frequency = object
        .get("frequency")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Frequency>().ok())
        .ok_or(ValidationFailure::InvalidFrequency)?;

    let channels = object
        .get("channels")
        .and_then(Value::as_object)
        .and_then(parse_channels)
        .ok_or(ValidationFailure::InvalidChannels)?;

    Ok(Preferences {
        marketing,
        newsletter,
        updates,
        frequency,
        channels,
    })
}

fn bool_field(object: &Map<String, Value>, field: &str) -> Result<bool, ValidationFailure> {
    object
        .get(field)
        .and_then(Value::as_bool)
        .ok_or(ValidationFailure::InvalidPreferencesStructure)
}

fn parse_channels(channels: &Map<String, Value>) -> Option<ChannelToggles> {
    if channels.len() != CHANNEL_FIELDS.len() {
        return None;
    }
    Some(ChannelToggles {
        email: channels.get("email")?.as_bool()?,
        sms: channels.get("sms")?.as_bool()?,
        push: channels.get("push")?.as_bool()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_preferences() -> Value {
        json!({
            "marketing": true,
            "newsletter": false,
            "updates": true,
            "frequency": "weekly",
            "channels": { "email": true, "sms": false, "push": true }
        })
    }

    #[test]
    fn test_user_id_rules() {
        assert!(validate_user_id("user-1").is_ok());
        assert_eq!(validate_user_id(""), Err(ValidationFailure::MissingUserId));
        assert_eq!(validate_user_id("   "), Err(ValidationFailure::MissingUserId));
        assert_eq!(
            validate_notification_user_id(" \t"),
            Err(ValidationFailure::EmptyNotificationUserId)
        );
    }

    #[test]
    fn test_email_rules() {
        let cases = [
            ("alice@example.com", true),
            ("a.b+tag@sub.example.co", true),
            ("", false),
            ("alice", false),
            ("alice@example", false),
            ("alice @example.com", false),
            ("alice@@example.com", false),
        ];
        for (email, ok) in cases {
            assert_eq!(validate_email(email).is_ok(), ok, "email={email:?}");
        }
    }

    #[test]
    fn test_timezone_rules() {
        assert!(validate_timezone("America/New_York").is_ok());
        assert_eq!(validate_timezone(" "), Err(ValidationFailure::EmptyTimezone));
    }

    #[test]
    fn test_parse_valid_preferences() {
        let prefs = parse_preferences(&valid_preferences()).unwrap();
        assert!(prefs.marketing);
        assert!(!prefs.newsletter);
        assert_eq!(prefs.frequency, Frequency::Weekly);
        assert!(prefs.channels.push);
        assert!(!prefs.channels.sms);
    }

    #[test]
    fn test_parse_accepts_never_frequency() {
        let mut value = valid_preferences();
        value["frequency"] = json!("never");
        assert_eq!(parse_preferences(&value).unwrap().frequency, Frequency::Never);
    }

    #[test]
    fn test_parse_failures() {
        let mutate = |f: fn(&mut Value)| {
            let mut value = valid_preferences();
            f(&mut value);
            parse_preferences(&value).unwrap_err()
        };

        assert_eq!(
            parse_preferences(&json!(null)).unwrap_err(),
            ValidationFailure::InvalidPreferencesStructure
        );
        assert_eq!(
            parse_preferences(&json!([1, 2])).unwrap_err(),
            ValidationFailure::InvalidPreferencesStructure
        );
        assert_eq!(
            mutate(|v| {
                v.as_object_mut().unwrap().remove("updates");
            }),
            ValidationFailure::InvalidPreferencesStructure
        );
        assert_eq!(
            mutate(|v| v["marketing"] = json!("yes")),
            ValidationFailure::InvalidPreferencesStructure
        );
        assert_eq!(
            mutate(|v| v["frequency"] = json!("hourly")),
            ValidationFailure::InvalidFrequency
        );
        assert_eq!(
            mutate(|v| v["frequency"] = json!(7)),
            ValidationFailure::InvalidFrequency
        );
        assert_eq!(
            mutate(|v| v["channels"] = json!({ "email": true, "sms": "no", "push": true })),
            ValidationFailure::InvalidChannels
        );
        assert_eq!(
            mutate(|v| v["channels"] = json!({ "email": true, "sms": false })),
            ValidationFailure::InvalidChannels
        );
        assert_eq!(
            mutate(|v| v["channels"]["fax"] = json!(true)),
            ValidationFailure::InvalidChannels
        );
        assert_eq!(
            mutate(|v| v["channels"] = json!(null)),
            ValidationFailure::InvalidChannels
        );
    }

    #[test]
    fn test_structure_checked_before_frequency() {
        // 同时缺字段且频率非法时，报结构错误
        let value = json!({ "frequency": "hourly" });
        assert_eq!(
            parse_preferences(&value).unwrap_err(),
            ValidationFailure::InvalidPreferencesStructure
        );
    }
}
