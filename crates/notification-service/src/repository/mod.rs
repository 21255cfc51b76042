//! 数据访问层
//!
//! - 仓储只负责持久化，不包含业务逻辑
//! - Postgres 实现用于生产，内存实现用于开发和测试
//! - 服务层依赖 trait，便于 mock

mod memory;
mod notification_log_repo;
mod preference_repo;
mod traits;

pub use memory::{MemoryNotificationLogRepository, MemoryPreferenceRepository};
pub use notification_log_repo::NotificationLogRepository;
pub use preference_repo::PreferenceRepository;
pub use traits::*;
