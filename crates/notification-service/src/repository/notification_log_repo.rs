//! 通知记录仓储（Postgres）
//!
//! 记录只追加，不提供更新和删除。

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use super::traits::NotificationLogRepositoryTrait;
use crate::error::Result;
use crate::models::{NewNotificationLog, NotificationLog, NotificationLogQuery, StatusTypeCount};

pub struct NotificationLogRepository {
    pool: PgPool,
}

impl NotificationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepositoryTrait for NotificationLogRepository {
    async fn create(&self, log: &NewNotificationLog) -> Result<NotificationLog> {
        let created = sqlx::query_as::<_, NotificationLog>(
            r#"
            INSERT INTO notification_logs
                (user_id, notification_type, channel, status, sent_at, failure_reason, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, notification_type, channel, status, sent_at,
                      failure_reason, metadata, created_at, updated_at
            "#,
        )
        .bind(&log.user_id)
        .bind(log.notification_type)
        .bind(log.channel)
        .bind(log.status)
        .bind(log.sent_at)
        .bind(log.failure_reason.as_deref())
        .bind(Json(&log.metadata))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list(&self, query: &NotificationLogQuery, limit: i64) -> Result<Vec<NotificationLog>> {
        let logs = sqlx::query_as::<_, NotificationLog>(
            r#"
            SELECT id, user_id, notification_type, channel, status, sent_at,
                   failure_reason, metadata, created_at, updated_at
            FROM notification_logs
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR notification_type = $2)
              AND ($3::varchar IS NULL OR channel = $3)
              AND ($4::varchar IS NULL OR status = $4)
            ORDER BY sent_at DESC NULLS LAST, id DESC
            LIMIT $5
            "#,
        )
        .bind(&query.user_id)
        .bind(query.notification_type)
        .bind(query.channel)
        .bind(query.status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn count_by_status_and_type(
        &self,
        user_id: Option<String>,
    ) -> Result<Vec<StatusTypeCount>> {
        let counts = sqlx::query_as::<_, StatusTypeCount>(
            r#"
            SELECT status, notification_type, COUNT(*) AS count
            FROM notification_logs
            WHERE ($1::varchar IS NULL OR user_id = $1)
            GROUP BY status, notification_type
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
