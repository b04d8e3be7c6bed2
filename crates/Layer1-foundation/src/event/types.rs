//! Event Types - 옵저버와 콜백 정의

use crate::Result;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// 이벤트 인자 맵
///
/// 병합 우선순위: 이벤트 기본값 < 옵저버 인자 < 호출 인자
pub type EventArgs = Map<String, Value>;

/// 옵저버 함수
pub type ObserverFn = Arc<dyn Fn(&EventArgs) -> Result<Value> + Send + Sync>;

/// 옵저버 인자에서 위치 지정에 쓰이는 키
pub const POSITION_ARG: &str = "position";

// ============================================================================
// Well-known events
// ============================================================================

/// 모듈 부트스트랩 직전
pub const MODULE_BOOTSTRAP_BEFORE: &str = "bucky.module.bootstrap.before";

/// 모듈 부트스트랩 직후
pub const MODULE_BOOTSTRAP_AFTER: &str = "bucky.module.bootstrap.after";

// ============================================================================
// ViewObserver
// ============================================================================

/// 함수 대신 옵저버로 등록할 수 있는 뷰/데이터 객체
///
/// 이벤트가 발생하면 `set(args)` 후 `render()` 결과가 이벤트 결과로 수집됩니다.
pub trait ViewObserver: Send {
    fn set(&mut self, args: &EventArgs);

    fn render(&self) -> String;
}

// ============================================================================
// ObserverCallback
// ============================================================================

/// 옵저버 콜백 종류
#[derive(Clone)]
pub enum ObserverCallback {
    /// 이름이 있는 함수 참조 (alias 기본값으로 이름 사용)
    Named { name: String, func: ObserverFn },

    /// 익명 클로저
    Closure(ObserverFn),

    /// 뷰 객체
    View(Arc<Mutex<dyn ViewObserver>>),

    /// `once()`가 등록하는 정리용 옵저버: 지정된 슬롯들을 제거
    Cleanup { event: String, slots: [usize; 2] },
}

impl ObserverCallback {
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&EventArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Named {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn closure<F>(func: F) -> Self
    where
        F: Fn(&EventArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(func))
    }

    pub fn view<V: ViewObserver + 'static>(view: V) -> Self {
        Self::View(Arc::new(Mutex::new(view)))
    }

    /// 기본 alias (이름 있는 함수 참조만 해당)
    pub fn default_alias(&self) -> Option<String> {
        match self {
            Self::Named { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for ObserverCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, .. } => write!(f, "Named({})", name),
            Self::Closure(_) => write!(f, "Closure"),
            Self::View(_) => write!(f, "View"),
            Self::Cleanup { event, slots } => write!(f, "Cleanup({}, {:?})", event, slots),
        }
    }
}

// ============================================================================
// Observer
// ============================================================================

/// 등록된 옵저버
#[derive(Debug, Clone)]
pub struct Observer {
    pub callback: ObserverCallback,

    /// 옵저버 등록 시 지정된 인자
    pub args: EventArgs,

    /// 제거용 별칭
    pub alias: Option<String>,

    /// 등록 시점의 활성 모듈
    pub origin_module: Option<String>,

    /// 최종 목록에서 원하는 절대 위치
    pub position: Option<usize>,

    /// 위치 재배치가 이미 적용되었는지
    pub ordered: bool,
}

impl Observer {
    /// `position` 인자는 위치 지정에 쓰이면서 콜백 인자에도 그대로 남습니다.
    pub fn new(callback: ObserverCallback, args: EventArgs, alias: Option<String>) -> Self {
        let position = args
            .get(POSITION_ARG)
            .and_then(|v| v.as_u64())
            .map(|p| p as usize);
        let alias = alias.or_else(|| callback.default_alias());

        Self {
            callback,
            args,
            alias,
            origin_module: None,
            position,
            ordered: false,
        }
    }

    pub fn with_origin(mut self, module: Option<String>) -> Self {
        self.origin_module = module;
        self
    }

    pub(crate) fn wants_reposition(&self) -> bool {
        self.position.is_some() && !self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_callback_alias() {
        let cb = ObserverCallback::named("Blog::onPost", |_| Ok(Value::Null));
        let observer = Observer::new(cb, EventArgs::new(), None);
        assert_eq!(observer.alias.as_deref(), Some("Blog::onPost"));

        let closure = Observer::new(ObserverCallback::closure(|_| Ok(Value::Null)), EventArgs::new(), None);
        assert!(closure.alias.is_none());
    }

    #[test]
    fn test_position_is_read_from_args() {
        let mut args = EventArgs::new();
        args.insert("position".into(), json!(0));
        args.insert("role".into(), json!("admin"));

        let observer = Observer::new(ObserverCallback::closure(|_| Ok(Value::Null)), args, None);
        assert_eq!(observer.position, Some(0));
        assert_eq!(observer.args.get("position"), Some(&json!(0)));
        assert!(observer.wants_reposition());
    }
}
