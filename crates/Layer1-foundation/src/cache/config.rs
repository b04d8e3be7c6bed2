//! Cache configuration
//!
//! 각 백엔드는 자신의 섹션을 첫 사용 시 한 번만 읽습니다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cache system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    /// Force a backend as the front-end default (skips rank selection)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default)]
    pub file: FileCacheConfig,

    #[serde(default)]
    pub apc: ApcCacheConfig,

    #[serde(default)]
    pub memcache: MemcacheConfig,

    #[serde(default)]
    pub db: DbCacheConfig,
}

/// File backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCacheConfig {
    /// Directory holding one file per key
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// TTL used when `save` is called without one (seconds)
    #[serde(default = "default_ttl")]
    pub default_ttl: u64,
}

/// In-process shared memory ("apc") backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApcCacheConfig {
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_ttl")]
    pub default_ttl: u64,
}

/// Memcached backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemcacheConfig {
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_ttl")]
    pub default_ttl: u64,

    #[serde(default = "default_memcache_host")]
    pub host: String,

    #[serde(default = "default_memcache_port")]
    pub port: u16,

    /// Accepted for compatibility, payloads are stored uncompressed
    #[serde(default)]
    pub compress: bool,
}

/// SQLite backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCacheConfig {
    /// Database file; `None` keeps the cache in memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_db_table")]
    pub table: String,
}

// Default value functions
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bucky")
}
fn default_ttl() -> u64 {
    3600
} // 1 hour
fn default_memcache_host() -> String {
    "127.0.0.1".to_string()
}
fn default_memcache_port() -> u16 {
    11211
}
fn default_db_table() -> String {
    "bucky_cache".to_string()
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            default_ttl: default_ttl(),
        }
    }
}

impl Default for ApcCacheConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            default_ttl: default_ttl(),
        }
    }
}

impl Default for MemcacheConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            default_ttl: default_ttl(),
            host: default_memcache_host(),
            port: default_memcache_port(),
            compress: false,
        }
    }
}

impl Default for DbCacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            table: default_db_table(),
        }
    }
}
