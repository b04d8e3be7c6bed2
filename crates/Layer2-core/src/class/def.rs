//! Class definitions - 논리 클래스 이름과 factory
//!
//! 런타임 리플렉션 대신 클래스 계층(부모, 인터페이스)과 생성 함수를
//! 명시적으로 등록합니다.

use super::object::Overridable;
use bucky_foundation::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 생성자 인자를 받아 객체를 만드는 함수
pub type Factory = Arc<dyn Fn(&[Value]) -> Result<Box<dyn Overridable>> + Send + Sync>;

/// 정적 메서드
pub type StaticFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// 클래스 정의
///
/// ```ignore
/// ClassDef::new("FileLogger")
///     .extends("Logger")
///     .implements("Writer")
///     .factory(|_args| Ok(Box::new(FileLogger::default())))
///     .static_method("create", |_args| Ok(json!("created")));
/// ```
#[derive(Clone)]
pub struct ClassDef {
    name: String,
    parent: Option<String>,
    interfaces: Vec<String>,
    factory: Option<Factory>,
    static_methods: HashMap<String, StaticFn>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            interfaces: Vec::new(),
            factory: None,
            static_methods: HashMap::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Box<dyn Overridable>> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn static_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.static_methods.insert(name.into(), Arc::new(method));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn get_factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    pub fn get_static_method(&self, name: &str) -> Option<&StaticFn> {
        self.static_methods.get(name)
    }

    /// factory가 없으면 추상 클래스/인터페이스로 취급
    pub fn is_instantiable(&self) -> bool {
        self.factory.is_some()
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statics: Vec<&String> = self.static_methods.keys().collect();
        statics.sort();
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("interfaces", &self.interfaces)
            .field("instantiable", &self.is_instantiable())
            .field("static_methods", &statics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let def = ClassDef::new("FileLogger")
            .extends("Logger")
            .implements("Writer")
            .implements("Flushable")
            .static_method("create", |args| Ok(json!(args.len())));

        assert_eq!(def.name(), "FileLogger");
        assert_eq!(def.parent(), Some("Logger"));
        assert_eq!(def.interfaces(), ["Writer", "Flushable"]);
        assert!(!def.is_instantiable());

        let create = def.get_static_method("create").unwrap();
        assert_eq!(create(&[json!(1), json!(2)]).unwrap(), json!(2));
        assert!(def.get_static_method("missing").is_none());
    }
}
