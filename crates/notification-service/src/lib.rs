//! 通知偏好服务
//!
//! 管理用户的通知偏好设置，并在偏好允许时记录通知发送。
//!
//! ## 模块
//!
//! - `models`: 偏好与通知记录实体
//! - `validation`: 与存储无关的输入校验
//! - `repository`: Postgres 与内存两套仓储实现
//! - `service`: 偏好增删改查、发送准入与统计
//! - `handlers` / `routes` / `middleware`: HTTP 边界

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

pub use error::{Result, ServiceError};
pub use state::AppState;

/// 服务名，用于配置加载和日志标识
pub const SERVICE_NAME: &str = "notification-service";

/// 编译期嵌入的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
