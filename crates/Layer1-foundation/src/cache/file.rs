//! File cache backend
//!
//! 키마다 JSON 파일 하나. 파일 이름은 키의 FNV-1a 해시이고,
//! 파일 안에 원래 키가 저장되므로 부분 문자열 검색이 가능합니다.

use super::backend::{BackendInfo, CacheBackend, CacheEntry, DeletePattern, RANK_FILE};
use super::config::FileCacheConfig;
use super::util::{key_file_name, now_micros};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// 파일 기반 캐시
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    default_ttl: u64,
}

impl FileBackend {
    pub fn new(config: &FileCacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            default_ttl: config.default_ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key_file_name(key))
    }

    fn read_entry(path: &Path) -> Option<CacheEntry> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache file");
                None
            }
        }
    }

    fn remove(path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// 캐시 디렉토리의 모든 항목 (경로, 항목)
    fn entries(&self) -> Result<Vec<(PathBuf, CacheEntry)>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = Self::read_entry(&path) {
                entries.push((path, entry));
            }
        }
        Ok(entries)
    }
}

impl CacheBackend for FileBackend {
    fn info(&self) -> BackendInfo {
        let available = std::fs::create_dir_all(&self.dir).is_ok();
        BackendInfo::new(available, RANK_FILE)
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let Some(entry) = Self::read_entry(&path) else {
            return Ok(None);
        };

        // 해시 충돌
        if entry.key != key {
            return Ok(None);
        }

        if entry.is_expired(now_micros()) {
            trace!(key, "expired on read");
            Self::remove(&path)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    fn save(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Cache(format!(
                "Failed to create cache directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let entry = CacheEntry::new(key, value.clone(), Some(ttl.unwrap_or(self.default_ttl)));
        let content = serde_json::to_string(&entry)?;
        std::fs::write(self.path_for(key), content)?;

        trace!(key, ttl = ?entry.ttl, "saved");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Self::remove(&self.path_for(key))
    }

    fn load_many(&self, pattern: &str) -> Result<Option<HashMap<String, Value>>> {
        let now = now_micros();
        let mut found = HashMap::new();

        for (path, entry) in self.entries()? {
            if !entry.key.contains(pattern) {
                continue;
            }
            if entry.is_expired(now) {
                Self::remove(&path)?;
                continue;
            }
            found.insert(entry.key, entry.value);
        }

        Ok(Some(found))
    }

    fn delete_many(&self, pattern: &DeletePattern) -> Result<usize> {
        let now = now_micros();
        let mut deleted = 0;

        for (path, entry) in self.entries()? {
            if pattern.matches(&entry, now) && Self::remove(&path)? {
                deleted += 1;
            }
        }

        debug!(pattern = ?pattern, deleted, "file cache delete_many");
        Ok(deleted)
    }
}
