//! # BuckyBall Cache System
//!
//! 여러 저장소를 하나의 계약(`CacheBackend`) 뒤에 둡니다.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Cache (front-end)                                       │
//! │  default = lowest rank among available (memoized)        │
//! ├──────────────────────────────────────────────────────────┤
//! │  apc (10)   memcache (10)   shmem (10, off)              │
//! │  file (70)  db (90)                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bucky_foundation::cache::{Cache, CacheSettings};
//!
//! let cache = Cache::from_config(CacheSettings::default());
//! cache.save("user/1", &json!({"name": "x"}), Some(60))?;
//! let user = cache.load("user/1")?;
//!
//! // 특정 백엔드 지정
//! cache.backend(Some("file"))?.gc()?;
//! ```
//!
//! ## Modules
//!
//! - [`backend`] - 백엔드 계약, 순위, 항목 형식
//! - [`config`] - 백엔드별 설정 섹션
//! - [`manager`] - front-end
//! - [`util`] - 해시, 시간

pub mod apc;
pub mod backend;
pub mod config;
pub mod db;
pub mod file;
pub mod manager;
pub mod memcache;
pub mod shmem;
pub mod util;

pub use apc::{ApcBackend, ApcStore};
pub use backend::{
    BackendInfo, CacheBackend, CacheEntry, DeletePattern, RANK_APC, RANK_DB, RANK_FILE,
    RANK_MEMCACHE, RANK_SHMEM,
};
pub use config::{ApcCacheConfig, CacheSettings, DbCacheConfig, FileCacheConfig, MemcacheConfig};
pub use db::DbBackend;
pub use file::FileBackend;
pub use manager::{BackendType, Cache};
pub use memcache::MemcacheBackend;
pub use shmem::ShmemBackend;
