//! 통합 테스트 공용 클래스

#![allow(dead_code)]

use bucky_core::{ClassDef, ClassRegistry, Error, Overridable, Result};
use serde_json::{json, Map, Value};
use std::any::Any;

/// `write(msg)` -> "<class>: <msg>"
pub struct Logger {
    class: &'static str,
    props: Map<String, Value>,
}

impl Logger {
    pub fn new(class: &'static str) -> Self {
        Self {
            class,
            props: Map::new(),
        }
    }
}

impl Overridable for Logger {
    fn class_name(&self) -> &str {
        self.class
    }

    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        match method {
            "write" => {
                let msg = args.first().and_then(Value::as_str).unwrap_or_default();
                Ok(json!(format!("{}: {}", self.class, msg)))
            }
            "level" => Ok(json!("info")),
            _ => Err(Error::method_not_found(self.class, method)),
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

/// Writer <- Logger <- FileLogger
pub fn define_loggers(registry: &ClassRegistry) {
    registry
        .define_class(ClassDef::new("Writer"))
        .define_class(
            ClassDef::new("Logger")
                .implements("Writer")
                .factory(|_| Ok(Box::new(Logger::new("Logger")))),
        )
        .define_class(
            ClassDef::new("FileLogger")
                .extends("Logger")
                .factory(|_| Ok(Box::new(Logger::new("FileLogger"))))
                .static_method("create", |_| Ok(json!("FileLogger::create"))),
        );
}

pub fn text(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}
