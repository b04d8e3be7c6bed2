//! Bucky Config - 통합 설정
//!
//! 글로벌(~/.config/bucky/config.json)과 프로젝트(.bucky/config.json) 설정을 병합합니다.

use crate::cache::CacheSettings;
use crate::debug::DebugMode;
use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};

/// 설정 파일명
pub const BUCKY_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Bucky Config (통합)
// ============================================================================

/// BuckyBall 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuckyConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 디버그 싱크 설정
    #[serde(default)]
    pub debug: DebugConfig,

    /// 캐시 설정 (섹션 단위로 병합)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSettings>,
}

impl BuckyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<BuckyConfig>(BUCKY_CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) =
                project.load_optional::<BuckyConfig>(BUCKY_CONFIG_FILE)?
            {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 특정 저장소에서만 로드
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Ok(store
            .load_optional::<BuckyConfig>(BUCKY_CONFIG_FILE)?
            .unwrap_or_default())
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self) -> Result<()> {
        let store = JsonStore::current_project()?;
        store.save(BUCKY_CONFIG_FILE, self)
    }

    /// 다른 설정 병합 (other 우선)
    pub fn merge(&mut self, other: BuckyConfig) {
        self.version = other.version;
        self.debug.merge(other.debug);
        if other.cache.is_some() {
            self.cache = other.cache;
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn debug_mode(&self) -> DebugMode {
        self.debug.mode.unwrap_or_default()
    }

    pub fn cache_settings(&self) -> CacheSettings {
        self.cache.clone().unwrap_or_default()
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_debug_mode(mut self, mode: DebugMode) -> Self {
        self.debug.mode = Some(mode);
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl Default for BuckyConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: DebugConfig::default(),
            cache: None,
        }
    }
}

// ============================================================================
// Debug Config
// ============================================================================

/// 디버그 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfig {
    /// strict | lenient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DebugMode>,
}

impl DebugConfig {
    fn merge(&mut self, other: DebugConfig) {
        if other.mode.is_some() {
            self.mode = other.mode;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucky_config_default() {
        let config = BuckyConfig::new();
        assert_eq!(config.version, 1);
        assert_eq!(config.debug_mode(), DebugMode::Lenient);
        assert_eq!(config.cache_settings().apc.default_ttl, 3600);
    }

    #[test]
    fn test_config_merge() {
        let mut base = BuckyConfig::new().with_debug_mode(DebugMode::Strict);

        let mut cache = CacheSettings::default();
        cache.default = Some("db".to_string());
        let overlay = BuckyConfig::new().with_cache(cache);

        base.merge(overlay);

        // overlay에 debug 설정이 없으므로 base 유지
        assert_eq!(base.debug_mode(), DebugMode::Strict);
        assert_eq!(base.cache_settings().default.as_deref(), Some("db"));
    }

    #[test]
    fn test_load_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save(
                BUCKY_CONFIG_FILE,
                &serde_json::json!({"debug": {"mode": "strict"}, "cache": {"apc": {"prefix": "p:"}}}),
            )
            .unwrap();

        let config = BuckyConfig::load_from(&store).unwrap();
        assert_eq!(config.debug_mode(), DebugMode::Strict);
        assert_eq!(config.cache_settings().apc.prefix, "p:");
    }
}
