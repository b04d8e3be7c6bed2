//! Decorator - 레지스트리를 거쳐 호출을 전달하는 래퍼
//!
//! 오버라이드/어그먼트 대상이 된 클래스의 인스턴스는 `Decorator`로 감싸져 반환됩니다.
//! 메서드 호출과 프로퍼티 get/set은 레지스트리의 파이프라인을 거치고,
//! unset/isset, 문자열 변환, 직렬화는 감싼 객체로 바로 전달됩니다.

use super::object::ObjectHandle;
use super::registry::{ClassRegistry, RegistryInner};
use bucky_foundation::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Weak;
use tracing::debug;

// ============================================================================
// Decorator
// ============================================================================

/// 레지스트리 경유 래퍼
///
/// 감싼 객체를 소유합니다. 장식 전의 핸들을 따로 보관하면 두 경로의 상태가
/// 갈라질 수 있으므로 `wrapped()`로만 접근합니다.
#[derive(Clone)]
pub struct Decorator {
    registry: Weak<RegistryInner>,
    wrapped: ObjectHandle,
}

impl Decorator {
    /// 이미 만들어진 객체를 감쌈
    pub fn wrap(registry: &ClassRegistry, object: ObjectHandle) -> Self {
        Self {
            registry: registry.downgrade(),
            wrapped: object,
        }
    }

    /// 클래스 이름으로 객체를 생성해 감쌈
    pub fn from_class(registry: &ClassRegistry, class: &str, args: &[Value]) -> Result<Self> {
        let object = registry.construct(class, args)?;
        Ok(Self::wrap(registry, object))
    }

    pub fn wrapped(&self) -> &ObjectHandle {
        &self.wrapped
    }

    fn registry(&self) -> Result<ClassRegistry> {
        ClassRegistry::upgrade(&self.registry)
    }

    /// 메서드 호출 (override/augment 적용)
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.registry()?
            .call_method(&self.wrapped, method, args, None)
    }

    /// 감싼 객체의 클래스로 정적 메서드 호출
    pub fn call_static(&self, method: &str, args: &[Value]) -> Result<Value> {
        let class = self.wrapped.class_name();
        self.registry()?.call_static_method(&class, method, args)
    }

    pub fn get(&self, property: &str) -> Result<Value> {
        self.registry()?.call_getter(&self.wrapped, property)
    }

    pub fn set(&self, property: &str, value: Value) -> Result<()> {
        self.registry()?.call_setter(&self.wrapped, property, value)
    }

    /// 파이프라인을 거치지 않음
    pub fn unset(&self, property: &str) -> bool {
        self.wrapped.unset_property(property)
    }

    /// 파이프라인을 거치지 않음
    pub fn isset(&self, property: &str) -> bool {
        self.wrapped.has_property(property)
    }

    /// 감싼 객체가 호출 가능하면 모든 인자를 배열 하나로 전달
    ///
    /// 호출 불가능한 객체면 null.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        match self.wrapped.invoke(Value::Array(args)) {
            Err(Error::NotCallable(class)) => {
                debug!(class = %class, "Decorated object is not callable");
                Ok(Value::Null)
            }
            other => other,
        }
    }

    pub fn snapshot(&self) -> Value {
        self.wrapped.snapshot()
    }
}

impl fmt::Display for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wrapped.describe())
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("wrapped", &self.wrapped)
            .finish()
    }
}

// ============================================================================
// Instance
// ============================================================================

/// `ClassRegistry::instance()`가 반환하는 객체
#[derive(Clone, Debug)]
pub enum Instance {
    /// 장식되지 않은 객체 (레지스트리를 거치지 않음)
    Plain(ObjectHandle),
    Decorated(Decorator),
}

impl Instance {
    pub fn handle(&self) -> &ObjectHandle {
        match self {
            Self::Plain(handle) => handle,
            Self::Decorated(decorator) => decorator.wrapped(),
        }
    }

    pub fn is_decorated(&self) -> bool {
        matches!(self, Self::Decorated(_))
    }

    pub fn as_decorator(&self) -> Option<&Decorator> {
        match self {
            Self::Decorated(decorator) => Some(decorator),
            Self::Plain(_) => None,
        }
    }

    /// 같은 객체를 가리키는지
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.handle().ptr_eq(other.handle())
    }

    pub fn concrete_class(&self) -> String {
        self.handle().class_name()
    }

    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        match self {
            Self::Plain(handle) => handle.call(method, args),
            Self::Decorated(decorator) => decorator.call(method, args),
        }
    }

    pub fn get(&self, property: &str) -> Result<Value> {
        match self {
            Self::Plain(handle) => Ok(handle.get_property(property)),
            Self::Decorated(decorator) => decorator.get(property),
        }
    }

    pub fn set(&self, property: &str, value: Value) -> Result<()> {
        match self {
            Self::Plain(handle) => {
                handle.set_property(property, value);
                Ok(())
            }
            Self::Decorated(decorator) => decorator.set(property, value),
        }
    }

    pub fn unset(&self, property: &str) -> bool {
        self.handle().unset_property(property)
    }

    pub fn isset(&self, property: &str) -> bool {
        self.handle().has_property(property)
    }

    pub fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        match self {
            Self::Plain(handle) => handle.invoke(Value::Array(args)),
            Self::Decorated(decorator) => decorator.invoke(args),
        }
    }

    pub fn snapshot(&self) -> Value {
        self.handle().snapshot()
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handle().describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::def::ClassDef;
    use crate::class::object::Overridable;
    use serde_json::{json, Map};
    use std::any::Any;

    struct Widget {
        props: Map<String, Value>,
        callable: bool,
    }

    impl Overridable for Widget {
        fn class_name(&self) -> &str {
            "Widget"
        }

        fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value> {
            match method {
                "render" => Ok(json!("<widget>")),
                _ => Err(Error::method_not_found("Widget", method)),
            }
        }

        fn properties(&self) -> Option<&Map<String, Value>> {
            Some(&self.props)
        }

        fn properties_mut(&mut self) -> Option<&mut Map<String, Value>> {
            Some(&mut self.props)
        }

        fn describe(&self) -> String {
            "Widget#1".to_string()
        }

        fn invoke(&mut self, args: Value) -> Result<Value> {
            if self.callable {
                Ok(args)
            } else {
                Err(Error::NotCallable("Widget".to_string()))
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry(callable: bool) -> ClassRegistry {
        let registry = ClassRegistry::default();
        registry.define_class(ClassDef::new("Widget").factory(move |_| {
            Ok(Box::new(Widget {
                props: Map::new(),
                callable,
            }))
        }));
        registry
    }

    #[test]
    fn test_call_routes_through_registry() {
        let registry = registry(false);
        registry.augment_method(
            "Widget",
            "render",
            |call| Ok(json!(format!("[{}]", call.previous().as_str().unwrap_or_default()))),
            false,
        );

        let decorator = Decorator::from_class(&registry, "Widget", &[]).unwrap();
        assert_eq!(decorator.call("render", &[]).unwrap(), json!("[<widget>]"));

        // 장식되지 않은 경로는 augment를 보지 않음
        assert_eq!(
            decorator.wrapped().call("render", &[]).unwrap(),
            json!("<widget>")
        );
    }

    #[test]
    fn test_isset_unset_bypass_pipeline() {
        let registry = registry(false);
        registry
            .augment_property("Widget", "title", "get", "override", |_| Ok(json!("hooked")))
            .unwrap();

        let decorator = Decorator::from_class(&registry, "Widget", &[]).unwrap();
        assert_eq!(decorator.get("title").unwrap(), json!("hooked"));
        assert!(!decorator.isset("title"));

        decorator.set("title", json!("real")).unwrap();
        assert!(decorator.isset("title"));
        assert!(decorator.unset("title"));
        assert!(!decorator.isset("title"));
    }

    #[test]
    fn test_invoke_passes_single_array() {
        let callable = Decorator::from_class(&registry(true), "Widget", &[]);
        // 레지스트리가 먼저 drop되어도 invoke는 감싼 객체만 사용
        let callable = callable.unwrap();
        assert_eq!(
            callable.invoke(vec![json!(1), json!(2)]).unwrap(),
            json!([1, 2])
        );

        let registry = registry(false);
        let not_callable = Decorator::from_class(&registry, "Widget", &[]).unwrap();
        assert_eq!(not_callable.invoke(vec![json!(1)]).unwrap(), Value::Null);
    }

    #[test]
    fn test_dropped_registry() {
        let decorator = Decorator::from_class(&registry(false), "Widget", &[]).unwrap();
        assert!(matches!(
            decorator.call("render", &[]),
            Err(Error::Internal(_))
        ));
        assert_eq!(decorator.to_string(), "Widget#1");
    }

    #[test]
    fn test_instance_surface() {
        let registry = registry(false);
        let plain = registry.instance("Widget", &[], false).unwrap();
        assert!(!plain.is_decorated());
        assert!(matches!(
            plain.call("missing", &[]),
            Err(Error::MethodNotFound { .. })
        ));
        assert!(matches!(plain.invoke(vec![]), Err(Error::NotCallable(_))));

        registry.override_method("Widget", "render", |_| Ok(json!("overridden")), false);
        let decorated = registry.instance("Widget", &[], false).unwrap();
        assert!(decorated.is_decorated());
        assert_eq!(decorated.call("render", &[]).unwrap(), json!("overridden"));
        assert_eq!(decorated.call("missing", &[]).unwrap(), Value::Null);
        assert_eq!(decorated.invoke(vec![]).unwrap(), Value::Null);

        decorated.set("title", json!("t")).unwrap();
        assert_eq!(decorated.get("title").unwrap(), json!("t"));
        assert_eq!(decorated.snapshot(), json!({"title": "t"}));
        assert_eq!(decorated.to_string(), "Widget#1");
        assert_eq!(decorated.concrete_class(), "Widget");
        assert!(!decorated.ptr_eq(&plain));
    }
}
