//! 业务服务层
//!
//! 服务在启动时构建一次，通过 AppState 共享；每个请求是独立的读-改-写流程。

mod notification_service;
mod preference_service;

pub use notification_service::{
    BODY_MAX_CHARS, LOG_QUERY_LIMIT, NotificationService, SUBJECT_MAX_CHARS, sanitize_content,
};
pub use preference_service::PreferenceService;
