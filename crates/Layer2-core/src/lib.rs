//! bucky-core: Core Runtime for BuckyBall
//!
//! Layer2 - 클래스 오버라이드 레지스트리와 모듈 부트스트랩 레이어
//!
//! # 주요 모듈
//!
//! - `class`: 클래스 정의, `Overridable` 객체, 오버라이드 레지스트리, Decorator
//! - `module`: 모듈 매니페스트와 의존성 순서 부트스트랩
//! - `kernel`: 설정/이벤트/레지스트리/캐시를 묶은 서비스 컨테이너
//!
//! # 사용 예시
//!
//! ```ignore
//! use bucky_core::{Kernel, ModuleManifest, ModuleRegistry};
//!
//! let kernel = Kernel::load()?;
//!
//! let mut modules = ModuleRegistry::new();
//! modules.add(ModuleManifest::new("Blog"), |kernel| {
//!     kernel.registry().override_class("Logger", "FileLogger", false);
//!     kernel.registry().augment_method("Logger", "write", |call| {
//!         Ok(json!(format!("[blog] {}", call.previous())))
//!     }, false);
//!     Ok(())
//! });
//! let report = modules.bootstrap(&kernel);
//!
//! let logger = kernel.registry().instance("Logger", &[], true)?;
//! logger.call("write", &[json!("hello")])?;
//! ```

pub mod class;
pub mod kernel;
pub mod module;

// Re-exports: Class system
pub use class::{
    ClassDef, ClassOverride, ClassOverrideInfo, ClassRegistry, Decorator, Factory, Instance,
    MethodCall, MethodCallback, MethodEntryInfo, MethodInfo, MethodKind, ObjectHandle,
    Overridable, PropertyAccess, PropertyCallback, PropertyEntryInfo, PropertyOp, PropertyPhase,
    RegistryDump, Relation, StaticFn, WILDCARD,
};

// Re-exports: Kernel
pub use kernel::Kernel;

// Re-exports: Module system
pub use module::{BootstrapFn, BootstrapReport, ModuleManifest, ModuleRegistry, SkippedModule};

// Re-exports: Layer1 (자주 쓰는 타입)
pub use bucky_foundation::{
    BuckyConfig, Cache, DebugMode, DebugSink, Error, EventArgs, Events, ModuleStack,
    ObserverCallback, Result,
};
