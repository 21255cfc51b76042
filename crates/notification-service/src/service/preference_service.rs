//! 用户偏好服务
//!
//! 校验输入并对偏好仓储做增删改查。失败时记录日志后原样返回错误。

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use validator::Validate;

use notify_shared::observability::metrics;

use crate::dto::{CreatePreferenceRequest, UpdatePreferenceRequest};
use crate::error::{Result, ServiceError};
use crate::models::{NewUserPreference, PreferencePatch, UserPreference};
use crate::repository::PreferenceRepositoryTrait;
use crate::validation::{parse_preferences, validate_email, validate_timezone, validate_user_id};

pub struct PreferenceService {
    repo: Arc<dyn PreferenceRepositoryTrait>,
}

impl PreferenceService {
    pub fn new(repo: Arc<dyn PreferenceRepositoryTrait>) -> Self {
        Self { repo }
    }

    /// 创建用户偏好
    ///
    /// 存在性预检只是为了给出明确的错误，唯一性最终由存储保证
    #[instrument(skip(self, req), fields(user_id = %req.user_id))]
    pub async fn create_preference(&self, req: CreatePreferenceRequest) -> Result<UserPreference> {
        let result = self.try_create(req).await;
        record("create", &result);
        result.inspect_err(|e| log_failure("create", e))
    }

    async fn try_create(&self, req: CreatePreferenceRequest) -> Result<UserPreference> {
        validate_user_id(&req.user_id)?;
        validate_email(&req.email)?;
        validate_timezone(&req.timezone)?;
        let preferences = parse_preferences(&req.preferences)?;
        req.validate()?;

        if self.repo.find_by_user_id(&req.user_id).await?.is_some() {
            return Err(ServiceError::PreferenceAlreadyExists(req.user_id));
        }

        let created = self
            .repo
            .create(&NewUserPreference {
                user_id: req.user_id,
                email: req.email,
                timezone: req.timezone,
                preferences,
            })
            .await?;

        info!(user_id = %created.user_id, "Created preferences");
        Ok(created)
    }

    /// 查询用户偏好
    #[instrument(skip(self))]
    pub async fn get_user_preference(&self, user_id: &str) -> Result<UserPreference> {
        let result = self.try_get(user_id).await;
        record("get", &result);
        result.inspect_err(|e| log_failure("get", e))
    }

    async fn try_get(&self, user_id: &str) -> Result<UserPreference> {
        validate_user_id(user_id)?;
        self.repo
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::PreferenceNotFound(user_id.to_string()))
    }

    /// 部分更新用户偏好
    ///
    /// 只校验提供的字段；记录不存在时不会新建
    #[instrument(skip(self, req))]
    pub async fn update_preference(
        &self,
        user_id: &str,
        req: UpdatePreferenceRequest,
    ) -> Result<UserPreference> {
        let result = self.try_update(user_id, req).await;
        record("update", &result);
        result.inspect_err(|e| log_failure("update", e))
    }

    async fn try_update(&self, user_id: &str, req: UpdatePreferenceRequest) -> Result<UserPreference> {
        validate_user_id(user_id)?;
        if let Some(email) = &req.email {
            validate_email(email)?;
        }
        if let Some(timezone) = &req.timezone {
            validate_timezone(timezone)?;
        }
        let preferences = req.preferences.as_ref().map(parse_preferences).transpose()?;
        req.validate()?;

        let patch = PreferencePatch {
            email: req.email,
            timezone: req.timezone,
            preferences,
        };

        // 空补丁直接返回当前记录，不改动 updated_at
        if patch.is_empty() {
            return self.try_get(user_id).await;
        }

        let updated = self
            .repo
            .update(user_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::PreferenceNotFound(user_id.to_string()))?;

        info!(user_id = %user_id, "Updated preferences");
        Ok(updated)
    }

    /// 删除用户偏好
    #[instrument(skip(self))]
    pub async fn delete_preference(&self, user_id: &str) -> Result<()> {
        let result = self.try_delete(user_id).await;
        record("delete", &result);
        result.inspect_err(|e| log_failure("delete", e))
    }

    async fn try_delete(&self, user_id: &str) -> Result<()> {
        validate_user_id(user_id)?;
        if !self.repo.delete(user_id).await? {
            return Err(ServiceError::PreferenceNotFound(user_id.to_string()));
        }
        info!(user_id = %user_id, "Deleted preferences");
        Ok(())
    }

    /// 存储健康检查，供就绪探针使用
    pub async fn health_check(&self) -> Result<()> {
        self.repo.health_check().await
    }
}

fn record<T>(operation: &str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.error_code(),
    };
    metrics::record_preference_operation(operation, outcome);
}

fn log_failure(operation: &str, err: &ServiceError) {
    if err.status_code().is_server_error() {
        error!(operation, error = %err, "Failed to {} preference", operation);
    } else {
        warn!(operation, error = %err, "Failed to {} preference", operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelToggles, Frequency, Preferences};
    use crate::repository::MockPreferenceRepositoryTrait;
    use chrono::Utc;
    use serde_json::json;

    fn preferences_json() -> serde_json::Value {
        json!({
            "marketing": true,
            "newsletter": true,
            "updates": false,
            "frequency": "daily",
            "channels": { "email": true, "sms": false, "push": false }
        })
    }

    fn create_request(user_id: &str) -> CreatePreferenceRequest {
        CreatePreferenceRequest {
            user_id: user_id.to_string(),
            email: "alice@example.com".to_string(),
            timezone: "UTC".to_string(),
            preferences: preferences_json(),
        }
    }

    fn stored(user_id: &str) -> UserPreference {
        let now = Utc::now();
        UserPreference {
            id: 1,
            user_id: user_id.to_string(),
            email: "alice@example.com".to_string(),
            timezone: "UTC".to_string(),
            preferences: Preferences {
                marketing: true,
                newsletter: true,
                updates: false,
                frequency: Frequency::Daily,
                channels: ChannelToggles {
                    email: true,
                    sms: false,
                    push: false,
                },
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn service(repo: MockPreferenceRepositoryTrait) -> PreferenceService {
        PreferenceService::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_create_success() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_find_by_user_id()
            .withf(|id| id == "u1")
            .returning(|_| Ok(None));
        repo.expect_create()
            .withf(|p| p.user_id == "u1" && p.preferences.frequency == Frequency::Daily)
            .returning(|p| Ok(stored(&p.user_id)));

        let created = service(repo).create_preference(create_request("u1")).await.unwrap();
        assert_eq!(created.user_id, "u1");
    }

    #[tokio::test]
    async fn test_create_existing_is_conflict() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_find_by_user_id()
            .returning(|id| Ok(Some(stored(id))));
        repo.expect_create().never();

        let err = service(repo)
            .create_preference(create_request("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PreferenceAlreadyExists(_)));
        assert_eq!(err.to_string(), "User preferences already exist");
    }

    #[tokio::test]
    async fn test_create_validation_runs_before_store() {
        let cases: Vec<(CreatePreferenceRequest, &str)> = vec![
            (
                CreatePreferenceRequest { user_id: "  ".into(), ..create_request("x") },
                "User ID is required and cannot be empty",
            ),
            (
                CreatePreferenceRequest { email: "nope".into(), ..create_request("u1") },
                "Invalid email address",
            ),
            (
                CreatePreferenceRequest { timezone: "".into(), ..create_request("u1") },
                "Timezone is required and cannot be empty",
            ),
            (
                CreatePreferenceRequest { preferences: json!({}), ..create_request("u1") },
                "Invalid preferences structure",
            ),
        ];

        for (req, expected) in cases {
            let mut repo = MockPreferenceRepositoryTrait::new();
            repo.expect_find_by_user_id().never();
            repo.expect_create().never();

            let err = service(repo).create_preference(req).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
            assert_eq!(err.to_string(), expected);
        }
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_find_by_user_id().returning(|_| Ok(None));

        let err = service(repo).get_user_preference("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::PreferenceNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_validates_only_provided_fields() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_update()
            .withf(|id, patch| {
                id == "u1"
                    && patch.timezone.as_deref() == Some("Europe/Paris")
                    && patch.email.is_none()
                    && patch.preferences.is_none()
            })
            .returning(|id, _| {
                let mut row = stored(id);
                row.timezone = "Europe/Paris".into();
                Ok(Some(row))
            });

        let req = UpdatePreferenceRequest {
            timezone: Some("Europe/Paris".into()),
            ..Default::default()
        };
        let updated = service(repo).update_preference("u1", req).await.unwrap();
        assert_eq!(updated.timezone, "Europe/Paris");
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_preferences() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_update().never();

        let mut prefs = preferences_json();
        prefs["frequency"] = json!("hourly");
        let req = UpdatePreferenceRequest {
            preferences: Some(prefs),
            ..Default::default()
        };
        let err = service(repo).update_preference("u1", req).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid notification frequency");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_update().returning(|_, _| Ok(None));

        let req = UpdatePreferenceRequest {
            email: Some("bob@example.com".into()),
            ..Default::default()
        };
        let err = service(repo).update_preference("ghost", req).await.unwrap_err();
        assert!(matches!(err, ServiceError::PreferenceNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_update_returns_current_row() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_update().never();
        repo.expect_find_by_user_id()
            .returning(|id| Ok(Some(stored(id))));

        let row = service(repo)
            .update_preference("u1", UpdatePreferenceRequest::default())
            .await
            .unwrap();
        assert_eq!(row.user_id, "u1");
    }

    #[tokio::test]
    async fn test_delete_nothing_is_not_found() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_delete().returning(|_| Ok(false));

        let err = service(repo).delete_preference("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::PreferenceNotFound(_)));
    }

    #[tokio::test]
    async fn test_store_error_propagates_unchanged() {
        let mut repo = MockPreferenceRepositoryTrait::new();
        repo.expect_delete()
            .returning(|_| Err(ServiceError::Database(sqlx::Error::PoolTimedOut)));

        let err = service(repo).delete_preference("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Database(sqlx::Error::PoolTimedOut)));
    }
}
