//! 领域模型
//!
//! 偏好设置与通知记录两类持久化实体，以及它们共用的枚举。

mod enums;
mod notification_log;
mod preference;

pub use enums::*;
pub use notification_log::*;
pub use preference::*;
