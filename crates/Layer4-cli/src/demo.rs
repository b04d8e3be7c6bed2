//! `bucky registry demo` - 두 샘플 모듈로 오버라이드/어그먼트 시연

use bucky_core::{
    ClassDef, Error, EventArgs, Kernel, ModuleManifest, ModuleRegistry, ObserverCallback,
    Overridable, Result,
};
use serde_json::{json, Map, Value};
use std::any::Any;

/// 샘플 클래스: `greet(name)`
struct Greeter {
    class: &'static str,
    props: Map<String, Value>,
}

impl Greeter {
    fn new(class: &'static str) -> Self {
        let mut props = Map::new();
        props.insert("greeting".to_string(), json!("Hello"));
        Self { class, props }
    }
}

impl Overridable for Greeter {
    fn class_name(&self) -> &str {
        self.class
    }

    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        match method {
            "greet" => {
                let greeting = self.get_property("greeting");
                let name = args.first().and_then(Value::as_str).unwrap_or("world");
                Ok(json!(format!("{}, {}", greeting.as_str().unwrap_or_default(), name)))
            }
            _ => Err(Error::method_not_found(self.class, method)),
        }
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        Some(&self.props)
    }

    fn properties_mut(&mut self) -> Option<&mut Map<String, Value>> {
        Some(&mut self.props)
    }

    fn describe(&self) -> String {
        format!("{} {}", self.class, Value::Object(self.props.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn modules() -> ModuleRegistry {
    let mut modules = ModuleRegistry::new();

    modules.add(
        ModuleManifest::new("Demo_Core").with_description("Defines Greeter and swaps in LoudGreeter"),
        |kernel| {
            kernel
                .registry()
                .define_class(ClassDef::new("Greeter").factory(|_| Ok(Box::new(Greeter::new("Greeter")))))
                .define_class(
                    ClassDef::new("LoudGreeter")
                        .extends("Greeter")
                        .factory(|_| Ok(Box::new(Greeter::new("LoudGreeter")))),
                )
                .override_class("Greeter", "LoudGreeter", false);
            Ok(())
        },
    );

    modules.add(
        ModuleManifest::new("Demo_Shout")
            .with_dependency("Demo_Core")
            .with_description("Augments every Greeter subclass and listens for greetings"),
        |kernel| {
            let registry = kernel.registry();
            registry.override_method(
                "extends Greeter",
                "greet",
                |call| {
                    let original = match call.receiver {
                        Some(receiver) => receiver.call(call.method, call.args)?,
                        None => Value::Null,
                    };
                    Ok(json!(original.as_str().unwrap_or_default().to_uppercase()))
                },
                false,
            );
            registry.augment_method(
                "LoudGreeter",
                "greet",
                |call| Ok(json!(format!("{}!", call.previous().as_str().unwrap_or_default()))),
                false,
            );
            registry.augment_property("LoudGreeter", "greeting", "get", "after", |access| {
                Ok(json!(format!("{} (via Demo_Shout)", access.value.as_str().unwrap_or_default())))
            })?;

            kernel.events().on(
                "greeter.greeted",
                ObserverCallback::named("log_greeting", |args| Ok(args["text"].clone())),
                EventArgs::new(),
                None,
            );
            Ok(())
        },
    );

    modules
}

pub fn run(kernel: &Kernel) -> anyhow::Result<()> {
    let report = modules().bootstrap(kernel);
    println!("Bootstrap: {}", serde_json::to_string_pretty(&report)?);

    let registry = kernel.registry();
    let greeter = registry.instance("Greeter", &[], true)?;
    let text = greeter.call("greet", &[json!("bucky")])?;

    let mut args = EventArgs::new();
    args.insert("text".to_string(), text.clone());
    let observed = kernel.events().fire("greeter.greeted", args)?;

    println!();
    println!("instance(Greeter)   -> {} (decorated: {})", greeter.concrete_class(), greeter.is_decorated());
    println!("greet(\"bucky\")      -> {}", text);
    println!("greeter.greeted     -> {}", Value::Array(observed));
    println!("greeting            -> {}", greeter.get("greeting")?);
    println!("to_string           -> {}", greeter);
    println!();
    println!("Registry: {}", serde_json::to_string_pretty(&registry.debug_overrides())?);
    Ok(())
}
