//! APC-style cache backend
//!
//! 프로세스 전역 메모리 저장소. 같은 `ApcStore`를 공유하는 모든 백엔드가
//! 같은 데이터를 보며, prefix로 네임스페이스를 나눕니다.

use super::backend::{BackendInfo, CacheBackend, CacheEntry, DeletePattern, RANK_APC};
use super::config::ApcCacheConfig;
use super::util::now_micros;
use crate::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// 공유 메모리 저장소
#[derive(Debug, Default)]
pub struct ApcStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

static GLOBAL_APC_STORE: OnceLock<Arc<ApcStore>> = OnceLock::new();

impl ApcStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로세스 전역 저장소
    pub fn global() -> Arc<ApcStore> {
        GLOBAL_APC_STORE
            .get_or_init(|| Arc::new(ApcStore::new()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// APC 백엔드
#[derive(Debug, Clone)]
pub struct ApcBackend {
    store: Arc<ApcStore>,
    prefix: String,
    default_ttl: u64,
}

impl ApcBackend {
    /// 전역 저장소를 사용
    pub fn new(config: &ApcCacheConfig) -> Self {
        Self::with_store(config, ApcStore::global())
    }

    pub fn with_store(config: &ApcCacheConfig, store: Arc<ApcStore>) -> Self {
        Self {
            store,
            prefix: config.prefix.clone(),
            default_ttl: config.default_ttl,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl CacheBackend for ApcBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo::new(true, RANK_APC)
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let full_key = self.full_key(key);
        let mut entries = self.store.entries.lock();

        match entries.get(&full_key) {
            None => Ok(None),
            Some(entry) if !entry.is_expired(now_micros()) => Ok(Some(entry.value.clone())),
            Some(_) => {
                trace!(key, "expired on read");
                entries.remove(&full_key);
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let full_key = self.full_key(key);
        let entry = CacheEntry::new(
            full_key.clone(),
            value.clone(),
            Some(ttl.unwrap_or(self.default_ttl)),
        );
        self.store.entries.lock().insert(full_key, entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.store.entries.lock().remove(&self.full_key(key)).is_some())
    }

    fn load_many(&self, pattern: &str) -> Result<Option<HashMap<String, Value>>> {
        let now = now_micros();
        let mut entries = self.store.entries.lock();
        let mut found = HashMap::new();

        entries.retain(|full_key, entry| {
            let Some(key) = full_key.strip_prefix(self.prefix.as_str()) else {
                return true;
            };
            if !key.contains(pattern) {
                return true;
            }
            if entry.is_expired(now) {
                return false;
            }
            found.insert(key.to_string(), entry.value.clone());
            true
        });

        Ok(Some(found))
    }

    fn delete_many(&self, pattern: &DeletePattern) -> Result<usize> {
        let now = now_micros();
        let mut entries = self.store.entries.lock();
        let before = entries.len();

        entries.retain(|full_key, entry| {
            let Some(key) = full_key.strip_prefix(self.prefix.as_str()) else {
                return true;
            };
            let matched = match pattern {
                DeletePattern::All => true,
                DeletePattern::Expired => entry.is_expired(now),
                DeletePattern::Substring(s) => key.contains(s.as_str()),
            };
            !matched
        });

        let deleted = before - entries.len();
        debug!(pattern = ?pattern, deleted, prefix = %self.prefix, "apc cache delete_many");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend(prefix: &str, store: &Arc<ApcStore>) -> ApcBackend {
        ApcBackend::with_store(
            &ApcCacheConfig {
                prefix: prefix.to_string(),
                default_ttl: 3600,
            },
            Arc::clone(store),
        )
    }

    #[test]
    fn test_roundtrip_and_expiry() {
        let store = Arc::new(ApcStore::new());
        let cache = backend("app:", &store);

        cache.save("k", &json!([1, 2]), None).unwrap();
        assert_eq!(cache.load("k").unwrap(), Some(json!([1, 2])));

        cache.save("gone", &json!(1), Some(0)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(cache.load("gone").unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prefix_isolation() {
        let store = Arc::new(ApcStore::new());
        let a = backend("a:", &store);
        let b = backend("b:", &store);

        a.save("shared", &json!("from a"), None).unwrap();
        b.save("shared", &json!("from b"), None).unwrap();

        assert_eq!(a.load("shared").unwrap(), Some(json!("from a")));
        assert_eq!(a.load_many("sha").unwrap().unwrap().len(), 1);

        assert_eq!(a.delete_many(&DeletePattern::All).unwrap(), 1);
        assert_eq!(b.load("shared").unwrap(), Some(json!("from b")));
    }
}
