//! 内存仓储
//!
//! 基于 DashMap，适用于开发环境和路由级测试。
//! 偏好表的两个唯一约束（userId、email）由两张 DashMap 共同维护。
//! 加锁顺序固定为先 rows 条目后 emails 条目，email 的占用和释放都在持有
//! 该用户 rows 条目时完成。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::traits::{NotificationLogRepositoryTrait, PreferenceRepositoryTrait};
use crate::error::{Result, ServiceError};
use crate::models::{
    NewNotificationLog, NewUserPreference, NotificationLog, NotificationLogQuery,
    PreferencePatch, StatusTypeCount, UserPreference,
};

/// 内存偏好仓储
#[derive(Debug, Default)]
pub struct MemoryPreferenceRepository {
    rows: DashMap<String, UserPreference>,
    /// email -> user_id
    emails: DashMap<String, String>,
    next_id: AtomicI64,
}

impl MemoryPreferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为 user_id 占用 email，已被其他用户占用时失败
    fn claim_email(&self, email: &str, user_id: &str) -> Result<()> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(owner) if owner.get() != user_id => Err(ServiceError::EmailAlreadyInUse),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(user_id.to_string());
                Ok(())
            }
        }
    }

    fn release_email(&self, email: &str, user_id: &str) {
        self.emails.remove_if(email, |_, owner| owner == user_id);
    }
}

#[async_trait]
impl PreferenceRepositoryTrait for MemoryPreferenceRepository {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserPreference>> {
        Ok(self.rows.get(user_id).map(|row| row.clone()))
    }

    async fn create(&self, preference: &NewUserPreference) -> Result<UserPreference> {
        match self.rows.entry(preference.user_id.clone()) {
            Entry::Occupied(_) => Err(ServiceError::PreferenceAlreadyExists(
                preference.user_id.clone(),
            )),
            Entry::Vacant(slot) => {
                self.claim_email(&preference.email, &preference.user_id)?;
                let now = Utc::now();
                let row = UserPreference {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                    user_id: preference.user_id.clone(),
                    email: preference.email.clone(),
                    timezone: preference.timezone.clone(),
                    preferences: preference.preferences,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn update(
        &self,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Option<UserPreference>> {
        let Some(mut row) = self.rows.get_mut(user_id) else {
            return Ok(None);
        };

        let previous_email = row.email.clone();
        if let Some(email) = patch.email.as_deref().filter(|e| *e != previous_email) {
            self.claim_email(email, user_id)?;
            self.release_email(&previous_email, user_id);
        }

        patch.apply_to(&mut row);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        match self.rows.entry(user_id.to_string()) {
            Entry::Occupied(row) => {
                self.release_email(&row.get().email, user_id);
                row.remove();
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// 内存通知记录仓储
#[derive(Debug, Default)]
pub struct MemoryNotificationLogRepository {
    logs: DashMap<i64, NotificationLog>,
    next_id: AtomicI64,
}

impl MemoryNotificationLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationLogRepositoryTrait for MemoryNotificationLogRepository {
    async fn create(&self, log: &NewNotificationLog) -> Result<NotificationLog> {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = NotificationLog {
            id,
            user_id: log.user_id.clone(),
            notification_type: log.notification_type,
            channel: log.channel,
            status: log.status,
            sent_at: log.sent_at,
            failure_reason: log.failure_reason.clone(),
            metadata: log.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        self.logs.insert(id, created.clone());
        Ok(created)
    }

    async fn list(&self, query: &NotificationLogQuery, limit: i64) -> Result<Vec<NotificationLog>> {
        let mut logs: Vec<NotificationLog> = self
            .logs
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        // sent_at 倒序，空值排最后；同一时刻按 id 倒序
        logs.sort_by(|a, b| {
            b.sent_at
                .is_some()
                .cmp(&a.sent_at.is_some())
                .then_with(|| b.sent_at.cmp(&a.sent_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        logs.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(logs)
    }

    async fn count_by_status_and_type(
        &self,
        user_id: Option<String>,
    ) -> Result<Vec<StatusTypeCount>> {
        let mut groups: BTreeMap<_, i64> = BTreeMap::new();
        for entry in self.logs.iter() {
            let log = entry.value();
            if user_id.as_ref().is_some_and(|uid| *uid != log.user_id) {
                continue;
            }
            *groups.entry((log.status, log.notification_type)).or_insert(0) += 1;
        }

        Ok(groups
            .into_iter()
            .map(|((status, notification_type), count)| StatusTypeCount {
                status,
                notification_type,
                count,
            })
            .collect())
    }
}
