//! 用户偏好仓储（Postgres）

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use super::traits::PreferenceRepositoryTrait;
use crate::error::{Result, ServiceError};
use crate::models::{NewUserPreference, PreferencePatch, UserPreference};

pub struct PreferenceRepository {
    pool: PgPool,
}

impl PreferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceRepositoryTrait for PreferenceRepository {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserPreference>> {
        let preference = sqlx::query_as::<_, UserPreference>(
            r#"
            SELECT id, user_id, email, timezone, preferences, created_at, updated_at
            FROM user_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(preference)
    }

    async fn create(&self, preference: &NewUserPreference) -> Result<UserPreference> {
        sqlx::query_as::<_, UserPreference>(
            r#"
            INSERT INTO user_preferences (user_id, email, timezone, preferences)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, email, timezone, preferences, created_at, updated_at
            "#,
        )
        .bind(&preference.user_id)
        .bind(&preference.email)
        .bind(&preference.timezone)
        .bind(Json(preference.preferences))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write_error(e, &preference.user_id))
    }

    async fn update(
        &self,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Option<UserPreference>> {
        sqlx::query_as::<_, UserPreference>(
            r#"
            UPDATE user_preferences
            SET email = COALESCE($2, email),
                timezone = COALESCE($3, timezone),
                preferences = COALESCE($4, preferences),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, email, timezone, preferences, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(patch.email.as_deref())
        .bind(patch.timezone.as_deref())
        .bind(patch.preferences.map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write_error(e, user_id))
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
