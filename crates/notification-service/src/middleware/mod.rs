//! HTTP 中间件
//!
//! 执行顺序：API Key 认证 → 分组限流 → handler

mod api_key_auth;
mod rate_limit;

pub use api_key_auth::{API_KEY_HEADER, ApiKeyContext, ApiKeyRegistry, api_key_auth, hash_api_key};
pub use rate_limit::{GroupRateLimit, RateLimitDecision, RateLimiter, rate_limit};
