//! Overridable objects - 레지스트리가 다룰 수 있는 객체
//!
//! 동적 언어의 "알 수 없는 메서드" 처리 대신, 참여하는 모든 타입이
//! `Overridable`을 구현하고 메서드 이름으로 호출을 받습니다.

use bucky_foundation::{Error, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Overridable trait
// ============================================================================

/// 레지스트리를 통해 호출될 수 있는 객체
///
/// 프로퍼티 관련 메서드는 `properties()`/`properties_mut()`만 구현하면
/// 기본 구현이 그 맵을 사용합니다.
pub trait Overridable: Send + 'static {
    /// 실제(구체) 클래스 이름
    fn class_name(&self) -> &str;

    /// 메서드 호출
    ///
    /// 알 수 없는 메서드는 `Error::MethodNotFound`를 반환해야 합니다.
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value>;

    /// 프로퍼티 저장소
    fn properties(&self) -> Option<&Map<String, Value>> {
        None
    }

    fn properties_mut(&mut self) -> Option<&mut Map<String, Value>> {
        None
    }

    /// 프로퍼티 읽기 (없으면 null)
    fn get_property(&self, name: &str) -> Value {
        self.properties()
            .and_then(|props| props.get(name).cloned())
            .unwrap_or(Value::Null)
    }

    fn set_property(&mut self, name: &str, value: Value) {
        if let Some(props) = self.properties_mut() {
            props.insert(name.to_string(), value);
        }
    }

    /// 프로퍼티 제거 (제거된 값이 있으면 true)
    fn unset_property(&mut self, name: &str) -> bool {
        self.properties_mut()
            .map(|props| props.remove(name).is_some())
            .unwrap_or(false)
    }

    /// 존재하고 null이 아니면 true
    fn has_property(&self, name: &str) -> bool {
        self.properties()
            .and_then(|props| props.get(name))
            .is_some_and(|v| !v.is_null())
    }

    /// 문자열 변환
    fn describe(&self) -> String {
        self.class_name().to_string()
    }

    /// 객체를 함수처럼 호출
    fn invoke(&mut self, _args: Value) -> Result<Value> {
        Err(Error::NotCallable(self.class_name().to_string()))
    }

    /// 직렬화 훅
    fn snapshot(&self) -> Value {
        Value::Object(self.properties().cloned().unwrap_or_default())
    }

    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// ObjectHandle
// ============================================================================

/// 공유 객체 핸들
///
/// 레지스트리는 콜백을 실행하는 동안 객체 락을 잡지 않습니다.
/// 콜백 안에서 `receiver`를 다시 호출해도 교착되지 않습니다.
#[derive(Clone)]
pub struct ObjectHandle(Arc<Mutex<Box<dyn Overridable>>>);

impl ObjectHandle {
    pub fn new<T: Overridable>(object: T) -> Self {
        Self::from_box(Box::new(object))
    }

    pub fn from_box(object: Box<dyn Overridable>) -> Self {
        Self(Arc::new(Mutex::new(object)))
    }

    /// 같은 객체인지 (참조 동일성)
    pub fn ptr_eq(&self, other: &ObjectHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn class_name(&self) -> String {
        self.0.lock().class_name().to_string()
    }

    pub fn with<R>(&self, f: impl FnOnce(&dyn Overridable) -> R) -> R {
        let guard = self.0.lock();
        f(&**guard)
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn Overridable) -> R) -> R {
        let mut guard = self.0.lock();
        f(&mut **guard)
    }

    /// 구체 타입으로 접근 (타입이 다르면 None)
    pub fn downcast_with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.0.lock();
        guard.as_any().downcast_ref::<T>().map(f)
    }

    /// 레지스트리를 거치지 않는 직접 호출
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.0.lock().call(method, args)
    }

    pub fn get_property(&self, name: &str) -> Value {
        self.0.lock().get_property(name)
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.0.lock().set_property(name, value)
    }

    pub fn unset_property(&self, name: &str) -> bool {
        self.0.lock().unset_property(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.0.lock().has_property(name)
    }

    pub fn describe(&self) -> String {
        self.0.lock().describe()
    }

    pub fn invoke(&self, args: Value) -> Result<Value> {
        self.0.lock().invoke(args)
    }

    pub fn snapshot(&self) -> Value {
        self.0.lock().snapshot()
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectHandle")
            .field(&self.class_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter {
        props: Map<String, Value>,
        count: i64,
    }

    impl Overridable for Counter {
        fn class_name(&self) -> &str {
            "Counter"
        }

        fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value> {
            match method {
                "increment" => {
                    self.count += 1;
                    Ok(json!(self.count))
                }
                _ => Err(Error::method_not_found("Counter", method)),
            }
        }

        fn properties(&self) -> Option<&Map<String, Value>> {
            Some(&self.props)
        }

        fn properties_mut(&mut self) -> Option<&mut Map<String, Value>> {
            Some(&mut self.props)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter() -> ObjectHandle {
        ObjectHandle::new(Counter {
            props: Map::new(),
            count: 0,
        })
    }

    #[test]
    fn test_direct_call_and_identity() {
        let handle = counter();
        let alias = handle.clone();

        assert_eq!(handle.call("increment", &[]).unwrap(), json!(1));
        assert_eq!(alias.call("increment", &[]).unwrap(), json!(2));
        assert!(handle.ptr_eq(&alias));
        assert!(!handle.ptr_eq(&counter()));
        assert!(matches!(
            handle.call("missing", &[]),
            Err(Error::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_default_property_semantics() {
        let handle = counter();
        assert_eq!(handle.get_property("name"), Value::Null);

        handle.set_property("name", json!("x"));
        handle.set_property("empty", Value::Null);
        assert!(handle.has_property("name"));
        assert!(!handle.has_property("empty"));
        assert_eq!(handle.snapshot(), json!({"name": "x", "empty": null}));

        assert!(handle.unset_property("name"));
        assert!(!handle.unset_property("name"));
    }

    #[test]
    fn test_not_callable_by_default() {
        let handle = counter();
        assert!(matches!(handle.invoke(json!([])), Err(Error::NotCallable(c)) if c == "Counter"));
        assert_eq!(handle.downcast_with(|c: &Counter| c.count), Some(0));
        assert_eq!(handle.downcast_with(|s: &String| s.len()), None);
    }
}
