//! Cache backend contract
//!
//! 모든 백엔드는 같은 의미론을 따릅니다:
//! - 만료는 읽을 때 확인하며, 만료된 항목은 그 자리에서 삭제됩니다.
//! - `ttl=None`의 의미는 백엔드마다 다릅니다 (file/apc/memcache: 기본 ttl, db: 만료 없음).

use super::util::{is_expired, now_micros};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Ranks
// ============================================================================

/// 빠를수록 낮은 값
pub const RANK_APC: u32 = 10;
pub const RANK_MEMCACHE: u32 = 10;
pub const RANK_SHMEM: u32 = 10;
pub const RANK_FILE: u32 = 70;
pub const RANK_DB: u32 = 90;

/// 백엔드 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    /// 현재 환경에서 사용 가능한지
    pub available: bool,

    /// 정적 우선순위
    pub rank: u32,
}

impl BackendInfo {
    pub fn new(available: bool, rank: u32) -> Self {
        Self { available, rank }
    }
}

/// `delete_many` 패턴
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePattern {
    /// 전부 삭제
    All,
    /// 만료된 항목만 삭제 (gc)
    Expired,
    /// 키에 부분 문자열이 포함된 항목 삭제
    Substring(String),
}

impl From<bool> for DeletePattern {
    fn from(all: bool) -> Self {
        if all {
            Self::All
        } else {
            Self::Expired
        }
    }
}

impl From<&str> for DeletePattern {
    fn from(pattern: &str) -> Self {
        Self::Substring(pattern.to_string())
    }
}

impl DeletePattern {
    /// 항목이 패턴에 해당하는지
    pub fn matches(&self, entry: &CacheEntry, now: i64) -> bool {
        match self {
            Self::All => true,
            Self::Expired => entry.is_expired(now),
            Self::Substring(s) => entry.key.contains(s.as_str()),
        }
    }
}

/// 저장되는 캐시 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,

    /// 생성 시각 (µs)
    pub created_at: i64,

    /// 초 단위, None이면 만료 없음
    pub ttl: Option<u64>,

    pub value: Value,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl: Option<u64>) -> Self {
        Self {
            key: key.into(),
            created_at: now_micros(),
            ttl,
            value,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        is_expired(self.created_at, self.ttl, now)
    }
}

// ============================================================================
// CacheBackend trait
// ============================================================================

/// 캐시 백엔드 인터페이스
pub trait CacheBackend: Send + Sync {
    /// 사용 가능 여부와 우선순위
    fn info(&self) -> BackendInfo;

    /// 값 조회 (miss 또는 만료면 None)
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// 값 저장
    fn save(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()>;

    /// 삭제 (삭제된 항목이 있으면 true)
    fn delete(&self, key: &str) -> Result<bool>;

    /// 키에 부분 문자열이 포함된 항목 조회
    ///
    /// 지원하지 않는 백엔드는 `Ok(None)`을 반환합니다.
    fn load_many(&self, pattern: &str) -> Result<Option<HashMap<String, Value>>>;

    /// 패턴에 맞는 항목 삭제, 삭제된 개수 반환
    fn delete_many(&self, pattern: &DeletePattern) -> Result<usize>;

    /// 만료 항목 정리
    fn gc(&self) -> Result<usize> {
        self.delete_many(&DeletePattern::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_pattern_from() {
        assert_eq!(DeletePattern::from(true), DeletePattern::All);
        assert_eq!(DeletePattern::from(false), DeletePattern::Expired);
        assert_eq!(
            DeletePattern::from("blog"),
            DeletePattern::Substring("blog".into())
        );
    }

    #[test]
    fn test_pattern_matches() {
        let entry = CacheEntry::new("blog/post/1", json!(1), Some(0));
        let now = now_micros();

        assert!(DeletePattern::All.matches(&entry, now));
        assert!(DeletePattern::Expired.matches(&entry, now));
        assert!(DeletePattern::from("post").matches(&entry, now));
        assert!(!DeletePattern::from("user").matches(&entry, now));
    }
}
