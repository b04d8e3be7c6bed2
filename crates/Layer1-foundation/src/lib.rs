//! # bucky-foundation
//!
//! Foundation layer for BuckyBall:
//! - Error: 중앙 에러 타입과 Debug Sink (strict / lenient)
//! - Module: 현재 실행 중인 모듈 컨텍스트 스택
//! - Event: 이름 기반 옵저버 버스 (위치 지정, once, alias 제거)
//! - Cache: 순위 기반 백엔드 선택 (apc, memcache, file, db, shmem)
//! - Config/Storage: JSON 설정 (글로벌 + 프로젝트 병합)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  bucky-core (ClassRegistry, Decorator, ModuleRegistry)  │
//! │                     │                                   │
//! │                     ▼                                   │
//! │   ModuleStack ◀── Events        Cache ──▶ Backends      │
//! │        │                          │                     │
//! │        └──────── DebugSink ◀──────┘                     │
//! │                     │                                   │
//! │              BuckyConfig (JsonStore)                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod debug;
pub mod error;
pub mod event;
pub mod module;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Debug Sink (에러 처리 모드)
// ============================================================================
pub use debug::{DebugMode, DebugSink};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{BuckyConfig, DebugConfig, BUCKY_CONFIG_FILE};

// ============================================================================
// Module Context (모듈 스택)
// ============================================================================
pub use module::{ModuleGuard, ModuleStack};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{
    // Types
    EventArgs,
    // Bus
    Events,
    Observer,
    ObserverCallback,
    ObserverFn,
    ObserverInfo,
    ObserverSelector,
    ViewObserver,
    // Constants
    MODULE_BOOTSTRAP_AFTER,
    MODULE_BOOTSTRAP_BEFORE,
    POSITION_ARG,
};

// ============================================================================
// Cache (캐시 시스템)
// ============================================================================
pub use cache::{
    // Backends
    ApcBackend,
    ApcStore,
    // Contract
    BackendInfo,
    // Front-end
    BackendType,
    Cache,
    CacheBackend,
    CacheEntry,
    // Config
    ApcCacheConfig,
    CacheSettings,
    DbBackend,
    DbCacheConfig,
    DeletePattern,
    FileBackend,
    FileCacheConfig,
    MemcacheBackend,
    MemcacheConfig,
    ShmemBackend,
};
