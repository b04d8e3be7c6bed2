//! Cache front-end
//!
//! 등록된 백엔드 중 "가장 빠른 사용 가능한" 백엔드를 골라 위임합니다.
//! 기본 백엔드는 처음 필요할 때 한 번만 계산하며, 이후 가용성이 바뀌어도
//! 다시 계산하지 않습니다.

use super::apc::ApcBackend;
use super::backend::{
    BackendInfo, CacheBackend, DeletePattern, RANK_APC, RANK_DB, RANK_FILE, RANK_MEMCACHE,
    RANK_SHMEM,
};
use super::config::CacheSettings;
use super::db::DbBackend;
use super::file::FileBackend;
use super::memcache::MemcacheBackend;
use super::shmem::ShmemBackend;
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// BackendType - 내장 백엔드
// ============================================================================

/// 내장 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    File,
    Apc,
    Memcache,
    Db,
    Shmem,
}

impl BackendType {
    pub const ALL: [BackendType; 5] = [
        BackendType::File,
        BackendType::Apc,
        BackendType::Memcache,
        BackendType::Db,
        BackendType::Shmem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Apc => "apc",
            Self::Memcache => "memcache",
            Self::Db => "db",
            Self::Shmem => "shmem",
        }
    }

    /// 정적 순위 (생성 없이 알 수 있음)
    pub fn rank(&self) -> u32 {
        match self {
            Self::File => RANK_FILE,
            Self::Apc => RANK_APC,
            Self::Memcache => RANK_MEMCACHE,
            Self::Db => RANK_DB,
            Self::Shmem => RANK_SHMEM,
        }
    }

    /// 설정 섹션을 읽어 백엔드 생성
    fn build(&self, settings: &CacheSettings) -> Result<Arc<dyn CacheBackend>> {
        Ok(match self {
            Self::File => Arc::new(FileBackend::new(&settings.file)),
            Self::Apc => Arc::new(ApcBackend::new(&settings.apc)),
            Self::Memcache => Arc::new(MemcacheBackend::new(&settings.memcache)),
            Self::Db => Arc::new(DbBackend::new(&settings.db)?),
            Self::Shmem => Arc::new(ShmemBackend::new()),
        })
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidBackend(s.to_string()))
    }
}

// ============================================================================
// Cache
// ============================================================================

enum Slot {
    /// 첫 사용 때 생성
    Lazy(BackendType),
    Ready(Arc<dyn CacheBackend>),
}

/// 캐시 front-end
pub struct Cache {
    settings: CacheSettings,

    /// 등록 순서 유지 (같은 순위면 먼저 등록된 쪽이 우선)
    backends: RwLock<Vec<(String, Slot)>>,

    /// 메모이즈된 기본 백엔드 이름
    default: Mutex<Option<String>>,
}

impl Cache {
    /// 백엔드 없이 생성
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            backends: RwLock::new(Vec::new()),
            default: Mutex::new(None),
        }
    }

    /// 내장 백엔드를 모두 lazy slot으로 등록
    pub fn from_config(settings: CacheSettings) -> Self {
        let cache = Self::new(settings);
        {
            let mut backends = cache.backends.write();
            for ty in BackendType::ALL {
                backends.push((ty.as_str().to_string(), Slot::Lazy(ty)));
            }
        }
        cache
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// 직접 만든 백엔드 등록 (같은 이름이면 교체)
    pub fn add_backend(&self, name: impl Into<String>, backend: Arc<dyn CacheBackend>) -> &Self {
        let name = name.into();
        debug!(backend = %name, "cache backend added");
        self.insert(name, Slot::Ready(backend));
        self
    }

    /// 내장 백엔드 종류를 이름으로 등록
    pub fn add_backend_type(&self, type_name: &str) -> Result<&Self> {
        let ty: BackendType = type_name.parse()?;
        debug!(backend = %ty, "cache backend type added");
        self.insert(ty.as_str().to_string(), Slot::Lazy(ty));
        Ok(self)
    }

    fn insert(&self, name: String, slot: Slot) {
        let mut backends = self.backends.write();
        match backends.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = slot,
            None => backends.push((name, slot)),
        }
    }

    /// 등록된 백엔드 이름 (등록 순서)
    pub fn names(&self) -> Vec<String> {
        self.backends.read().iter().map(|(n, _)| n.clone()).collect()
    }

    /// 이름으로 백엔드 조회 (필요하면 생성)
    fn resolve(&self, name: &str) -> Result<Arc<dyn CacheBackend>> {
        let ty = {
            let backends = self.backends.read();
            match backends.iter().find(|(n, _)| n == name) {
                Some((_, Slot::Ready(backend))) => return Ok(Arc::clone(backend)),
                Some((_, Slot::Lazy(ty))) => *ty,
                None => return Err(Error::InvalidBackend(name.to_string())),
            }
        };

        let built = ty.build(&self.settings)?;
        let mut backends = self.backends.write();
        let Some(slot) = backends.iter_mut().find(|(n, _)| n == name) else {
            return Err(Error::InvalidBackend(name.to_string()));
        };
        match &slot.1 {
            // 다른 스레드가 먼저 만든 경우
            Slot::Ready(existing) => Ok(Arc::clone(existing)),
            Slot::Lazy(_) => {
                debug!(backend = name, "cache backend initialized");
                slot.1 = Slot::Ready(Arc::clone(&built));
                Ok(built)
            }
        }
    }

    /// 백엔드 선택
    ///
    /// 이름이 없으면 기본 백엔드. 이름을 지정했는데 사용할 수 없으면
    /// `BackendUnavailable`.
    pub fn backend(&self, name: Option<&str>) -> Result<Arc<dyn CacheBackend>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.default_backend_name()?,
        };

        let backend = self.resolve(&name)?;
        if !backend.info().available {
            return Err(Error::BackendUnavailable(name));
        }
        Ok(backend)
    }

    /// 기본 백엔드 이름 (메모이즈)
    ///
    /// `cache.default`가 설정되어 있으면 그대로 사용하고, 아니면
    /// 사용 가능한 백엔드 중 순위가 가장 낮은 것을 고릅니다.
    pub fn default_backend_name(&self) -> Result<String> {
        let mut memo = self.default.lock();
        if let Some(name) = memo.as_ref() {
            return Ok(name.clone());
        }

        let chosen = match &self.settings.default {
            Some(forced) => {
                self.resolve(forced)?;
                forced.clone()
            }
            None => {
                let mut best: Option<(String, u32)> = None;
                for (name, info) in self.infos() {
                    if !info.available {
                        continue;
                    }
                    if best.as_ref().map_or(true, |(_, rank)| info.rank < *rank) {
                        best = Some((name, info.rank));
                    }
                }
                best.map(|(name, _)| name).ok_or_else(|| {
                    Error::BackendUnavailable("no cache backend is available".to_string())
                })?
            }
        };

        info!(backend = %chosen, "default cache backend selected");
        *memo = Some(chosen.clone());
        Ok(chosen)
    }

    /// 모든 백엔드의 상태 (등록 순서)
    ///
    /// 생성에 실패한 백엔드는 사용 불가로 보고합니다.
    pub fn infos(&self) -> Vec<(String, BackendInfo)> {
        let slots: Vec<(String, Option<BackendType>)> = self
            .backends
            .read()
            .iter()
            .map(|(name, slot)| {
                let ty = match slot {
                    Slot::Lazy(ty) => Some(*ty),
                    Slot::Ready(_) => None,
                };
                (name.clone(), ty)
            })
            .collect();

        slots
            .into_iter()
            .map(|(name, ty)| {
                let info = match self.resolve(&name) {
                    Ok(backend) => backend.info(),
                    Err(e) => {
                        warn!(backend = %name, error = %e, "cache backend failed to initialize");
                        BackendInfo::new(false, ty.map_or(u32::MAX, |t| t.rank()))
                    }
                };
                (name, info)
            })
            .collect()
    }

    // ========================================================================
    // 기본 백엔드 위임
    // ========================================================================

    pub fn load(&self, key: &str) -> Result<Option<Value>> {
        self.backend(None)?.load(key)
    }

    pub fn save(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        self.backend(None)?.save(key, value, ttl)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.backend(None)?.delete(key)
    }

    pub fn load_many(&self, pattern: &str) -> Result<Option<HashMap<String, Value>>> {
        self.backend(None)?.load_many(pattern)
    }

    pub fn delete_many(&self, pattern: &DeletePattern) -> Result<usize> {
        self.backend(None)?.delete_many(pattern)
    }

    pub fn gc(&self) -> Result<usize> {
        self.backend(None)?.gc()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backends", &self.names())
            .field("default", &*self.default.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::FileCacheConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 가용성을 바꿀 수 있는 테스트 백엔드
    struct Toggle {
        available: AtomicBool,
        rank: u32,
    }

    impl Toggle {
        fn new(available: bool, rank: u32) -> Arc<Self> {
            Arc::new(Self {
                available: AtomicBool::new(available),
                rank,
            })
        }
    }

    impl CacheBackend for Toggle {
        fn info(&self) -> BackendInfo {
            BackendInfo::new(self.available.load(Ordering::SeqCst), self.rank)
        }
        fn load(&self, _key: &str) -> Result<Option<Value>> {
            Ok(Some(json!(self.rank)))
        }
        fn save(&self, _key: &str, _value: &Value, _ttl: Option<u64>) -> Result<()> {
            Ok(())
        }
        fn delete(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        fn load_many(&self, _pattern: &str) -> Result<Option<HashMap<String, Value>>> {
            Ok(None)
        }
        fn delete_many(&self, _pattern: &DeletePattern) -> Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_lowest_rank_available_wins() {
        let cache = Cache::new(CacheSettings::default());
        cache.add_backend("slow", Toggle::new(true, 70));
        cache.add_backend("fast", Toggle::new(true, 10));
        cache.add_backend("faster_but_off", Toggle::new(false, 1));

        assert_eq!(cache.default_backend_name().unwrap(), "fast");
        assert_eq!(cache.load("any").unwrap(), Some(json!(10)));
    }

    #[test]
    fn test_default_is_memoized() {
        let cache = Cache::new(CacheSettings::default());
        let fast = Toggle::new(false, 10);
        cache.add_backend("slow", Toggle::new(true, 70));
        cache.add_backend("fast", fast.clone());

        assert_eq!(cache.default_backend_name().unwrap(), "slow");
        fast.available.store(true, Ordering::SeqCst);
        assert_eq!(cache.default_backend_name().unwrap(), "slow");
    }

    #[test]
    fn test_named_backend_errors() {
        let cache = Cache::new(CacheSettings::default());
        cache.add_backend("off", Toggle::new(false, 10));

        assert!(matches!(
            cache.backend(Some("missing")),
            Err(Error::InvalidBackend(_))
        ));
        assert!(matches!(
            cache.backend(Some("off")),
            Err(Error::BackendUnavailable(name)) if name == "off"
        ));
        assert!(matches!(
            cache.backend(None),
            Err(Error::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_add_backend_type() {
        let cache = Cache::new(CacheSettings::default());
        assert!(matches!(
            cache.add_backend_type("redis"),
            Err(Error::InvalidBackend(t)) if t == "redis"
        ));

        cache.add_backend_type("shmem").unwrap();
        assert_eq!(cache.names(), vec!["shmem".to_string()]);
        assert_eq!(cache.infos()[0].1, BackendInfo::new(false, 10));
    }

    #[test]
    fn test_forced_default_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings {
            default: Some("file".to_string()),
            file: FileCacheConfig {
                dir: dir.path().to_path_buf(),
                default_ttl: 60,
            },
            ..Default::default()
        };
        let cache = Cache::from_config(settings);

        assert_eq!(cache.default_backend_name().unwrap(), "file");
        cache.save("k", &json!("v"), None).unwrap();
        assert_eq!(cache.load("k").unwrap(), Some(json!("v")));
        assert_eq!(
            cache.backend(Some("file")).unwrap().load("k").unwrap(),
            Some(json!("v"))
        );

        cache.save("zero", &json!(1), Some(0)).unwrap();
        assert_eq!(cache.load("zero").unwrap(), None);
    }

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("APC".parse::<BackendType>().unwrap(), BackendType::Apc);
        assert_eq!(BackendType::Db.rank(), 90);
        assert_eq!(BackendType::Memcache.to_string(), "memcache");
    }
}
