//! # Class Override System
//!
//! 논리 클래스 이름 단위로 동작을 교체/확장하는 레지스트리
//!
//! ## 개요
//!
//! - **클래스 오버라이드**: 논리 이름 `Logger`를 구체 클래스 `FileLogger`로 교체
//! - **메서드 오버라이드**: 메서드 동작 전체를 콜백으로 교체 (대상당 하나)
//! - **메서드 어그먼트**: 결과를 등록 순서대로 후처리하는 파이프라인
//! - **프로퍼티 훅**: get/set 에 override/before/after 단계
//!
//! ## 해석 우선순위
//!
//! ```text
//! exact class  →  extends <ancestor>  →  implements <interface>  →  "*"
//! ```
//!
//! 같은 단계 안에서는 등록 순서가 빠른 항목이 이깁니다.
//!
//! ## 예시
//!
//! ```ignore
//! let registry = ClassRegistry::default();
//! registry.define_class(ClassDef::new("Logger").factory(|_| Ok(Box::new(Logger::default()))));
//! registry.define_class(ClassDef::new("FileLogger").extends("Logger").factory(...));
//!
//! registry.override_class("Logger", "FileLogger", false);
//! registry.augment_method("extends Logger", "write", |call| {
//!     Ok(json!(format!("[log] {}", call.previous())))
//! }, false);
//!
//! let logger = registry.instance("Logger", &[], true)?;
//! assert!(logger.is_decorated());
//! ```

mod decorator;
mod def;
mod dump;
mod entry;
mod object;
mod registry;

pub use decorator::{Decorator, Instance};
pub use def::{ClassDef, Factory, StaticFn};
pub use dump::{ClassOverrideInfo, MethodEntryInfo, PropertyEntryInfo, RegistryDump};
pub use entry::{
    ClassOverride, MethodCall, MethodCallback, MethodInfo, MethodKind, PropertyAccess,
    PropertyCallback, PropertyOp, PropertyPhase, Relation, WILDCARD,
};
pub use object::{ObjectHandle, Overridable};
pub use registry::ClassRegistry;
