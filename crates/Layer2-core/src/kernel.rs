//! Kernel - 프레임워크 서비스 묶음
//!
//! 설정, 디버그 싱크, 모듈 스택, 이벤트 버스, 클래스 레지스트리, 캐시를
//! 하나의 값으로 묶어 모듈 부트스트랩 콜백에 전달합니다.
//! 전역 상태 대신 이 값을 주입받아 사용합니다.

use crate::class::ClassRegistry;
use bucky_foundation::{BuckyConfig, Cache, DebugSink, Events, ModuleStack, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 서비스 컨테이너
pub struct Kernel {
    config: BuckyConfig,
    sink: Arc<DebugSink>,
    modules: Arc<ModuleStack>,
    events: Arc<Events>,
    registry: ClassRegistry,
    cache: Arc<Cache>,
}

impl Kernel {
    /// 설정으로 모든 서비스 생성
    ///
    /// 레지스트리와 이벤트 버스는 같은 모듈 스택을 공유합니다.
    pub fn new(config: BuckyConfig) -> Self {
        let sink = Arc::new(DebugSink::new(config.debug_mode()));
        let modules = Arc::new(ModuleStack::new());
        let events = Arc::new(Events::new(Arc::clone(&modules)));
        let registry = ClassRegistry::new(Arc::clone(&modules), Arc::clone(&sink));
        let cache = Arc::new(Cache::from_config(config.cache_settings()));

        debug!(mode = ?sink.mode(), "Kernel created");

        Self {
            config,
            sink,
            modules,
            events,
            registry,
            cache,
        }
    }

    /// 글로벌 + 프로젝트 설정을 읽어 생성
    pub fn load() -> Result<Self> {
        Ok(Self::new(BuckyConfig::load()?))
    }

    pub fn config(&self) -> &BuckyConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<DebugSink> {
        &self.sink
    }

    pub fn modules(&self) -> &Arc<ModuleStack> {
        &self.modules
    }

    pub fn events(&self) -> &Arc<Events> {
        &self.events
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(BuckyConfig::default())
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("debug_mode", &self.sink.mode())
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}
