//! SQLite cache backend
//!
//! 다른 백엔드와 달리 `ttl=None`은 "만료 없음"을 뜻합니다.
//! 부분 문자열 조회(`load_many`)는 지원하지 않습니다.

use super::backend::{BackendInfo, CacheBackend, DeletePattern, RANK_DB};
use super::config::DbCacheConfig;
use super::util::{now_micros, MICROS_PER_SEC};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, trace};

/// SQLite 기반 캐시
pub struct DbBackend {
    conn: Mutex<Connection>,
    table: String,
}

impl DbBackend {
    /// 설정에 따라 파일 또는 메모리 DB를 열고 테이블을 준비
    pub fn new(config: &DbCacheConfig) -> Result<Self> {
        let table = Self::validate_table(&config.table)?;

        let conn = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::Storage(format!("Failed to create data directory: {}", e))
                    })?;
                }
                let conn = Connection::open(path)
                    .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;
                conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
                    .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;
                conn
            }
            None => Connection::open_in_memory().map_err(|e| {
                Error::Storage(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let backend = Self {
            conn: Mutex::new(conn),
            table,
        };
        backend.initialize_schema()?;

        info!(table = %backend.table, path = ?config.path, "db cache ready");
        Ok(backend)
    }

    fn validate_table(table: &str) -> Result<String> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::InvalidArgument(format!(
                "Invalid cache table name: {}",
                table
            )));
        }
        Ok(table.to_string())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("Lock poisoned".to_string()))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                ttl INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table}(created_at);
            "#,
            table = self.table
        ))
        .map_err(|e| Error::Storage(format!("Failed to initialize schema: {}", e)))?;
        Ok(())
    }

    /// 만료 조건 SQL (`?1` = now µs)
    fn expired_clause() -> String {
        format!(
            "ttl IS NOT NULL AND created_at + ttl * {} <= ?1",
            MICROS_PER_SEC
        )
    }
}

impl CacheBackend for DbBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo::new(self.conn().is_ok(), RANK_DB)
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn()?;
        let row: Option<(String, i64, Option<i64>)> = conn
            .query_row(
                &format!(
                    "SELECT value, created_at, ttl FROM {} WHERE key = ?1",
                    self.table
                ),
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((value, created_at, ttl)) = row else {
            return Ok(None);
        };

        let ttl = ttl.map(|t| t.max(0) as u64);
        if super::util::is_expired(created_at, ttl, now_micros()) {
            trace!(key, "expired on read");
            conn.execute(
                &format!("DELETE FROM {} WHERE key = ?1", self.table),
                params![key],
            )?;
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&value)?))
    }

    fn save(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let ttl = ttl.map(|t| i64::try_from(t).unwrap_or(i64::MAX / MICROS_PER_SEC));

        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (key, value, created_at, ttl) VALUES (?1, ?2, ?3, ?4)",
                self.table
            ),
            params![key, data, now_micros(), ttl],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            &format!("DELETE FROM {} WHERE key = ?1", self.table),
            params![key],
        )?;
        Ok(changed > 0)
    }

    fn load_many(&self, _pattern: &str) -> Result<Option<HashMap<String, Value>>> {
        Ok(None)
    }

    fn delete_many(&self, pattern: &DeletePattern) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = match pattern {
            DeletePattern::All => conn.execute(&format!("DELETE FROM {}", self.table), [])?,
            DeletePattern::Expired => conn.execute(
                &format!("DELETE FROM {} WHERE {}", self.table, Self::expired_clause()),
                params![now_micros()],
            )?,
            DeletePattern::Substring(s) => conn.execute(
                &format!("DELETE FROM {} WHERE instr(key, ?1) > 0", self.table),
                params![s],
            )?,
        };

        debug!(pattern = ?pattern, deleted, "db cache delete_many");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> DbBackend {
        DbBackend::new(&DbCacheConfig::default()).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let cache = backend();
        assert_eq!(cache.info(), BackendInfo::new(true, 90));

        cache.save("k", &json!({"nested": [1, 2]}), Some(60)).unwrap();
        assert_eq!(cache.load("k").unwrap(), Some(json!({"nested": [1, 2]})));
        assert!(cache.delete("k").unwrap());
        assert!(!cache.delete("k").unwrap());
    }

    #[test]
    fn test_none_ttl_never_expires() {
        let cache = backend();
        cache.save("forever", &json!(1), None).unwrap();
        cache.save("now", &json!(2), Some(0)).unwrap();

        assert_eq!(cache.gc().unwrap(), 1);
        assert_eq!(cache.load("forever").unwrap(), Some(json!(1)));
        assert_eq!(cache.load("now").unwrap(), None);
    }

    #[test]
    fn test_expired_row_removed_on_read() {
        let cache = backend();
        cache.save("k", &json!(1), Some(0)).unwrap();
        assert_eq!(cache.load("k").unwrap(), None);
        assert!(!cache.delete("k").unwrap());
    }

    #[test]
    fn test_patterns() {
        let cache = backend();
        cache.save("blog/1", &json!(1), None).unwrap();
        cache.save("blog/2", &json!(2), None).unwrap();
        cache.save("user/1", &json!(3), None).unwrap();

        assert_eq!(cache.load_many("blog").unwrap(), None);
        assert_eq!(cache.delete_many(&DeletePattern::from("blog")).unwrap(), 2);
        assert_eq!(cache.delete_many(&DeletePattern::All).unwrap(), 1);
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbCacheConfig {
            path: Some(dir.path().join("cache.db")),
            table: "cache_entries".to_string(),
        };

        DbBackend::new(&config).unwrap().save("k", &json!("persisted"), None).unwrap();
        let reopened = DbBackend::new(&config).unwrap();
        assert_eq!(reopened.load("k").unwrap(), Some(json!("persisted")));
    }

    #[test]
    fn test_invalid_table_name() {
        let config = DbCacheConfig {
            path: None,
            table: "bad; DROP".to_string(),
        };
        assert!(matches!(DbBackend::new(&config), Err(Error::InvalidArgument(_))));
    }
}
