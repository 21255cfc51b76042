//! API Key 认证中间件
//!
//! 从 X-API-Key 头读取 key，与配置中的 key 按 SHA256 摘要比较。

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::ServiceError;
use crate::state::AppState;

/// API Key Header 名称
pub const API_KEY_HEADER: &str = "X-API-Key";

/// 认证通过后注入请求扩展，限流按摘要计数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyContext {
    pub key_digest: String,
}

/// 日志中保留的摘要前缀长度
const DIGEST_LOG_PREFIX_LEN: usize = 12;

/// 计算 API Key 的 SHA256 哈希
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 摘要的日志前缀，日志里不出现任何明文 key 片段
pub fn digest_log_prefix(digest: &str) -> &str {
    digest.get(..DIGEST_LOG_PREFIX_LEN).unwrap_or(digest)
}

/// 已配置的 API Key 摘要集合，不保留明文
#[derive(Debug, Clone, Default)]
pub struct ApiKeyRegistry {
    digests: HashSet<String>,
}

impl ApiKeyRegistry {
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Self {
        let digests = keys
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(hash_api_key)
            .collect();
        Self { digests }
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn contains_digest(&self, digest: &str) -> bool {
        self.digests.contains(digest)
    }

}

/// API Key 认证中间件
pub async fn api_key_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let api_key = match request.headers().get(API_KEY_HEADER) {
        Some(value) => value.to_str().map_err(|_| {
            warn!("Invalid API Key header encoding");
            ServiceError::Unauthorized("Invalid API Key".to_string())
        })?,
        None => return Err(ServiceError::Unauthorized("Missing API Key".to_string())),
    };

    let key_digest = hash_api_key(api_key);
    if !state.api_keys.contains_digest(&key_digest) {
        warn!(
            digest_prefix = %digest_log_prefix(&key_digest),
            "Invalid API Key"
        );
        return Err(ServiceError::Unauthorized("Invalid API Key".to_string()));
    }

    request.extensions_mut().insert(ApiKeyContext { key_digest });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_hex_sha256() {
        let digest = hash_api_key("dev-api-key");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, hash_api_key("dev-api-key"));
        assert_ne!(digest, hash_api_key("dev-api-key2"));
    }

    #[test]
    fn test_registry_verify() {
        let registry = ApiKeyRegistry::from_keys(&["key-a", " key-b ", ""]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains_digest(&hash_api_key("key-a")));
        assert!(registry.contains_digest(&hash_api_key("key-b")));
        assert!(!registry.contains_digest(&hash_api_key("key-c")));
        assert!(!registry.contains_digest(&hash_api_key("")));
    }

    #[test]
    fn test_digest_log_prefix_hides_key() {
        let key = "sk-live-abcdef123456";
        let digest = hash_api_key(key);
        let prefix = digest_log_prefix(&digest);

        assert_eq!(prefix.len(), 12);
        assert!(digest.starts_with(prefix));
        assert!(!prefix.contains(&key[..6]));
        assert_eq!(digest_log_prefix("abc"), "abc");
    }

    #[test]
    fn test_empty_registry_rejects_everything() {
        let registry = ApiKeyRegistry::from_keys::<String>(&[]);
        assert!(registry.is_empty());
        assert!(!registry.contains_digest(&hash_api_key("anything")));
    }
}
