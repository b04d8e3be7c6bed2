//! Shared-memory cache backend
//!
//! 순위 테이블에는 있지만 이 환경에서는 항상 사용할 수 없습니다.

use super::backend::{BackendInfo, CacheBackend, DeletePattern, RANK_SHMEM};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShmemBackend;

impl ShmemBackend {
    pub fn new() -> Self {
        Self
    }

    fn unavailable<T>() -> Result<T> {
        Err(Error::BackendUnavailable("shmem".to_string()))
    }
}

impl CacheBackend for ShmemBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo::new(false, RANK_SHMEM)
    }

    fn load(&self, _key: &str) -> Result<Option<Value>> {
        Self::unavailable()
    }

    fn save(&self, _key: &str, _value: &Value, _ttl: Option<u64>) -> Result<()> {
        Self::unavailable()
    }

    fn delete(&self, _key: &str) -> Result<bool> {
        Self::unavailable()
    }

    fn load_many(&self, _pattern: &str) -> Result<Option<HashMap<String, Value>>> {
        Self::unavailable()
    }

    fn delete_many(&self, _pattern: &DeletePattern) -> Result<usize> {
        Self::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_unavailable() {
        let shmem = ShmemBackend::new();
        assert_eq!(shmem.info(), BackendInfo::new(false, 10));
        assert!(matches!(shmem.load("k"), Err(Error::BackendUnavailable(_))));
        assert!(matches!(shmem.gc(), Err(Error::BackendUnavailable(_))));
    }
}
