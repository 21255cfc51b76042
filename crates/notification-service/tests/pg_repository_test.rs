//! Postgres 仓储集成测试
//!
//! 需要可用的 PostgreSQL，迁移在连接后自动执行。
//!
//! ## 运行方式
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://... \
//!   cargo test -p notification-service --test pg_repository_test -- --ignored
//! ```

use chrono::{Duration, Utc};
use notification_service::{
    MIGRATOR, ServiceError,
    models::{
        ChannelToggles, Frequency, NewNotificationLog, NewUserPreference, NotificationChannel,
        NotificationLogQuery, NotificationMetadata, NotificationStats, NotificationStatus,
        NotificationType, PreferencePatch, Preferences,
    },
    repository::{
        NotificationLogRepository, NotificationLogRepositoryTrait, PreferenceRepository,
        PreferenceRepositoryTrait,
    },
};
use notify_shared::{
    database::Database,
    test_utils::{test_database_config, test_email, test_user_id},
};

// ==================== 辅助函数 ====================

async fn setup() -> Database {
    let db = Database::connect(&test_database_config())
        .await
        .expect("连接测试数据库失败");
    db.run_migrations(&MIGRATOR).await.expect("执行迁移失败");
    db
}

fn new_preference(user_id: &str) -> NewUserPreference {
    NewUserPreference {
        user_id: user_id.to_string(),
        email: test_email(user_id),
        timezone: "UTC".to_string(),
        preferences: Preferences {
            marketing: true,
            newsletter: false,
            updates: true,
            frequency: Frequency::Monthly,
            channels: ChannelToggles {
                email: true,
                sms: false,
                push: true,
            },
        },
    }
}

fn new_log(user_id: &str, t: NotificationType, status: NotificationStatus) -> NewNotificationLog {
    NewNotificationLog {
        user_id: user_id.to_string(),
        notification_type: t,
        channel: NotificationChannel::Email,
        status,
        sent_at: Some(Utc::now()),
        failure_reason: None,
        metadata: NotificationMetadata::default(),
    }
}

// ==================== 偏好仓储 ====================

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_preference_round_trip() {
    let db = setup().await;
    let repo = PreferenceRepository::new(db.pool().clone());
    let user_id = test_user_id();

    let created = repo.create(&new_preference(&user_id)).await.unwrap();
    assert_eq!(created.preferences.frequency, Frequency::Monthly);

    let found = repo.find_by_user_id(&user_id).await.unwrap().unwrap();
    assert_eq!(found, created);

    let patch = PreferencePatch {
        timezone: Some("Asia/Tokyo".to_string()),
        ..Default::default()
    };
    let updated = repo.update(&user_id, &patch).await.unwrap().unwrap();
    assert_eq!(updated.timezone, "Asia/Tokyo");
    assert_eq!(updated.email, created.email);
    assert!(updated.updated_at >= created.updated_at);

    assert!(repo.delete(&user_id).await.unwrap());
    assert!(!repo.delete(&user_id).await.unwrap());
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_unique_violations_map_to_conflict() {
    let db = setup().await;
    let repo = PreferenceRepository::new(db.pool().clone());
    let user_id = test_user_id();
    repo.create(&new_preference(&user_id)).await.unwrap();

    let err = repo.create(&new_preference(&user_id)).await.unwrap_err();
    assert!(matches!(err, ServiceError::PreferenceAlreadyExists(_)));

    let mut other = new_preference(&test_user_id());
    other.email = test_email(&user_id);
    let err = repo.create(&other).await.unwrap_err();
    assert!(matches!(err, ServiceError::EmailAlreadyInUse));

    repo.delete(&user_id).await.unwrap();
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_update_missing_returns_none() {
    let db = setup().await;
    let repo = PreferenceRepository::new(db.pool().clone());
    let patch = PreferencePatch {
        timezone: Some("UTC".to_string()),
        ..Default::default()
    };
    assert!(repo.update(&test_user_id(), &patch).await.unwrap().is_none());
}

// ==================== 通知记录仓储 ====================

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_logs_sorted_filtered_and_counted() {
    let db = setup().await;
    let repo = NotificationLogRepository::new(db.pool().clone());
    let user_id = test_user_id();

    let mut older = new_log(&user_id, NotificationType::Marketing, NotificationStatus::Sent);
    older.sent_at = Some(Utc::now() - Duration::minutes(5));
    repo.create(&older).await.unwrap();
    repo.create(&new_log(&user_id, NotificationType::Updates, NotificationStatus::Sent))
        .await
        .unwrap();
    repo.create(&new_log(&user_id, NotificationType::Updates, NotificationStatus::Failed))
        .await
        .unwrap();

    let logs = repo
        .list(&NotificationLogQuery::for_user(&user_id), 100)
        .await
        .unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.windows(2).all(|w| w[0].sent_at >= w[1].sent_at));
    assert_eq!(logs[2].notification_type, NotificationType::Marketing);

    let query = NotificationLogQuery {
        status: Some(NotificationStatus::Failed),
        ..NotificationLogQuery::for_user(&user_id)
    };
    assert_eq!(repo.list(&query, 100).await.unwrap().len(), 1);
    assert_eq!(
        repo.list(&NotificationLogQuery::for_user(&user_id), 2)
            .await
            .unwrap()
            .len(),
        2
    );

    let counts = repo
        .count_by_status_and_type(Some(user_id.clone()))
        .await
        .unwrap();
    let stats = NotificationStats::from_counts(&counts);
    assert_eq!(stats.total_notifications, 3);
    assert_eq!(stats.status_stats[&NotificationStatus::Sent], 2);
    assert_eq!(stats.type_stats[&NotificationType::Updates], 2);
}
