//! # Module System
//!
//! 모듈 매니페스트와 의존성 순서 부트스트랩
//!
//! 부트스트랩 중인 모듈은 커널의 `ModuleStack`에 push되어, 그 안에서 일어나는
//! 모든 오버라이드/옵저버 등록에 `origin_module`로 기록됩니다.
//!
//! ```text
//! add(Core) ─┐
//! add(Blog → Core) ──▶ bootstrap(&kernel) ──▶ Core, Blog
//! add(Shop → Missing) ┘                      skipped: Shop
//! ```

mod manifest;
mod registry;

pub use manifest::ModuleManifest;
pub use registry::{BootstrapFn, BootstrapReport, ModuleRegistry, SkippedModule};
