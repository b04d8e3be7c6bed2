//! Event System - 이름 기반 이벤트 발행/구독
//!
//! ## 사용법
//!
//! ```ignore
//! use bucky_foundation::event::{Events, EventArgs, ObserverCallback};
//!
//! let events = Events::default();
//!
//! // 1. 옵저버 등록 (이벤트 이름은 소문자로 정규화)
//! events.on("user.created", ObserverCallback::named("Audit::onUser", |args| {
//!     Ok(args["name"].clone())
//! }), EventArgs::new(), None);
//!
//! // 2. 한 번만 실행되는 옵저버
//! events.once("user.created", ObserverCallback::closure(|_| Ok(Value::Null)), EventArgs::new(), None);
//!
//! // 3. 발행
//! let results = events.fire("User.Created", args)?;
//!
//! // 4. alias로 제거
//! events.off("user.created", "Audit::onUser");
//! ```

pub mod bus;
pub mod types;

// Re-exports
pub use bus::{Events, ObserverInfo, ObserverSelector};

pub use types::{
    EventArgs, Observer, ObserverCallback, ObserverFn, ViewObserver, MODULE_BOOTSTRAP_AFTER,
    MODULE_BOOTSTRAP_BEFORE, POSITION_ARG,
};
