//! Class Registry - 클래스/메서드 오버라이드와 어그먼트의 중앙 저장소
//!
//! ## 해석 순서
//!
//! `(class, method, is_static, kind)` 조회는 아래 순서로 처음 일치하는 항목을 반환합니다.
//!
//! 1. 정확히 같은 클래스 (캐시를 거치지 않음)
//! 2. 해석 캐시 (일치 없음도 캐시됨)
//! 3. `extends` 항목 (등록 순서, 조상 중 하나와 일치)
//! 4. `implements` 항목 (등록 순서, 구현 인터페이스 중 하나와 일치)
//! 5. 와일드카드 `*`
//!
//! 해석 캐시는 `reset()` 전까지 무효화되지 않습니다. 조회가 시작된 뒤에
//! 관계 기반 항목을 등록하면 이전 결과가 계속 사용됩니다.

use super::decorator::{Decorator, Instance};
use super::def::{ClassDef, StaticFn};
use super::dump::{ClassOverrideInfo, MethodEntryInfo, PropertyEntryInfo, RegistryDump};
use super::entry::{
    ClassOverride, MethodBuckets, MethodCall, MethodCallback, MethodInfo, MethodKind, PhaseHooks,
    PropertyAccess, PropertyCallback, PropertyHooks, PropertyOp, PropertyPhase, Relation,
    TargetEntry, WILDCARD,
};
use super::object::ObjectHandle;
use bucky_foundation::{DebugSink, Error, ModuleStack, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, trace, warn};

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    class: String,
    method: String,
    is_static: bool,
    kind: MethodKind,
}

#[derive(Default)]
struct RegistryState {
    classes: HashMap<String, ClassDef>,
    class_overrides: HashMap<String, ClassOverride>,
    methods: HashMap<(String, bool), MethodBuckets>,
    properties: HashMap<(String, String), PropertyHooks>,
    decorated: HashSet<String>,
    singletons: HashMap<String, Instance>,

    /// None = "일치 없음"으로 계산됨
    resolution_cache: HashMap<ResolutionKey, Option<MethodInfo>>,
}

impl RegistryState {
    /// 조상 클래스 (가까운 순서, 자기 자신 제외)
    fn ancestors(&self, class: &str) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        let mut current = self.parent_of(class);
        while let Some(parent) = current {
            if parent == class || result.contains(&parent) {
                break;
            }
            current = self.parent_of(&parent);
            result.push(parent);
        }
        result
    }

    fn parent_of(&self, class: &str) -> Option<String> {
        self.classes
            .get(class)
            .and_then(|def| def.parent())
            .map(str::to_string)
    }

    /// 자신과 조상이 선언한 인터페이스, 그리고 그 인터페이스들의 상위 인터페이스
    fn interfaces(&self, class: &str) -> Vec<String> {
        let mut pending: Vec<String> = std::iter::once(class.to_string())
            .chain(self.ancestors(class))
            .filter_map(|c| self.classes.get(&c))
            .flat_map(|def| def.interfaces().iter().cloned())
            .collect();

        let mut result: Vec<String> = Vec::new();
        while let Some(interface) = pending.pop() {
            if result.contains(&interface) {
                continue;
            }
            if let Some(def) = self.classes.get(&interface) {
                pending.extend(def.parent().map(str::to_string));
                pending.extend(def.interfaces().iter().cloned());
            }
            result.push(interface);
        }
        result
    }

    /// 관계 기반 해석 (3~5단계)
    fn resolve_relations(
        &self,
        class: &str,
        buckets: &MethodBuckets,
        kind: MethodKind,
    ) -> Option<MethodInfo> {
        let buckets = buckets.kind(kind);

        if !buckets.extends.is_empty() {
            let ancestors = self.ancestors(class);
            if let Some(entry) = buckets
                .extends
                .iter()
                .find(|e| ancestors.contains(&e.target))
            {
                return Some(MethodInfo::from_entry(kind, Relation::Extends, entry));
            }
        }

        if !buckets.implements.is_empty() {
            let interfaces = self.interfaces(class);
            if let Some(entry) = buckets
                .implements
                .iter()
                .find(|e| interfaces.contains(&e.target))
            {
                return Some(MethodInfo::from_entry(kind, Relation::Implements, entry));
            }
        }

        buckets
            .find(Relation::Exact, WILDCARD)
            .map(|entry| MethodInfo::from_entry(kind, Relation::Exact, entry))
    }
}

impl MethodInfo {
    pub(crate) fn from_entry(kind: MethodKind, relation: Relation, entry: &TargetEntry) -> Self {
        Self {
            kind,
            relation,
            target: entry.target.clone(),
            callbacks: entry.callbacks.iter().map(|(cb, _)| Arc::clone(cb)).collect(),
        }
    }
}

pub(crate) struct RegistryInner {
    state: RwLock<RegistryState>,
    modules: Arc<ModuleStack>,
    sink: Arc<DebugSink>,
}

// ============================================================================
// ClassRegistry
// ============================================================================

/// 클래스 오버라이드 레지스트리
///
/// 복제해도 같은 상태를 공유하는 핸들입니다.
///
/// ```ignore
/// let registry = ClassRegistry::default();
/// registry.define_class(ClassDef::new("Logger").factory(|_| Ok(Box::new(Logger::default()))));
///
/// registry.override_method("Logger", "write", |call| Ok(json!("overridden")), false);
/// registry.augment_method("Logger", "write", |call| Ok(json!(format!("{}!", call.previous()))), false);
///
/// let logger = registry.instance("Logger", &[], true)?;
/// logger.call("write", &[json!("hello")])?;   // "overridden!"
/// ```
#[derive(Clone)]
pub struct ClassRegistry {
    inner: Arc<RegistryInner>,
}

impl ClassRegistry {
    pub fn new(modules: Arc<ModuleStack>, sink: Arc<DebugSink>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState::default()),
                modules,
                sink,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<RegistryInner>) -> Result<Self> {
        inner
            .upgrade()
            .map(|inner| Self { inner })
            .ok_or_else(|| Error::Internal("Class registry has been dropped".to_string()))
    }

    pub fn modules(&self) -> &Arc<ModuleStack> {
        &self.inner.modules
    }

    pub fn sink(&self) -> &Arc<DebugSink> {
        &self.inner.sink
    }

    // ========================================================================
    // 클래스 정의
    // ========================================================================

    /// 클래스 정의 등록 (같은 이름이면 교체)
    pub fn define_class(&self, def: ClassDef) -> &Self {
        debug!(class = def.name(), parent = ?def.parent(), "Class defined");
        self.inner
            .state
            .write()
            .classes
            .insert(def.name().to_string(), def);
        self
    }

    pub fn class_def(&self, name: &str) -> Option<ClassDef> {
        self.inner.state.read().classes.get(name).cloned()
    }

    pub fn ancestors(&self, class: &str) -> Vec<String> {
        self.inner.state.read().ancestors(class)
    }

    pub fn interfaces(&self, class: &str) -> Vec<String> {
        self.inner.state.read().interfaces(class)
    }

    // ========================================================================
    // 클래스 오버라이드
    // ========================================================================

    /// 논리 클래스를 다른 클래스로 대체
    ///
    /// `replace_singleton`이 true이고 이미 다른 구체 클래스의 싱글톤이 있으면
    /// 즉시 새 싱글톤으로 교체합니다.
    pub fn override_class(&self, logical: &str, replacement: &str, replace_singleton: bool) -> &Self {
        let origin = self.inner.modules.current();
        self.inner.state.write().class_overrides.insert(
            logical.to_string(),
            ClassOverride {
                replacement: replacement.to_string(),
                origin_module: origin.clone(),
            },
        );
        debug!(class = logical, replacement, module = ?origin, "Class override registered");

        if !replace_singleton {
            return self;
        }

        let current = self
            .inner
            .state
            .read()
            .singletons
            .get(logical)
            .cloned()
            .map(|instance| instance.concrete_class());

        match current {
            Some(current) if current != replacement => {
                match self.instance(replacement, &[], false) {
                    Ok(instance) => {
                        self.inner
                            .state
                            .write()
                            .singletons
                            .insert(logical.to_string(), instance);
                        info!(class = logical, from = %current, to = replacement, "Singleton replaced");
                    }
                    Err(e) => {
                        warn!(class = logical, replacement, error = %e, "Failed to replace singleton");
                    }
                }
            }
            _ => {}
        }
        self
    }

    /// 논리 이름이 가리키는 구체 클래스 (한 단계만 따라감)
    pub fn class_name(&self, logical: &str) -> String {
        self.inner
            .state
            .read()
            .class_overrides
            .get(logical)
            .map(|o| o.replacement.clone())
            .unwrap_or_else(|| logical.to_string())
    }

    // ========================================================================
    // 메서드 오버라이드 / 어그먼트
    // ========================================================================

    /// 메서드 동작 교체
    ///
    /// `target`은 `"Class"`, `"extends Class"`, `"implements Interface"`, `"*"` 중 하나.
    pub fn override_method<F>(&self, target: &str, method: &str, callback: F, is_static: bool) -> &Self
    where
        F: Fn(&MethodCall<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_method(MethodKind::Override, target, method, Arc::new(callback), is_static);
        self
    }

    /// 메서드 결과 후처리 (등록 순서대로 파이프라인)
    pub fn augment_method<F>(&self, target: &str, method: &str, callback: F, is_static: bool) -> &Self
    where
        F: Fn(&MethodCall<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_method(MethodKind::Augment, target, method, Arc::new(callback), is_static);
        self
    }

    fn register_method(
        &self,
        kind: MethodKind,
        target_spec: &str,
        method: &str,
        callback: MethodCallback,
        is_static: bool,
    ) {
        let (relation, target) = Relation::parse_target(target_spec);
        let origin = self.inner.modules.current();

        {
            let mut state = self.inner.state.write();
            let bucket = state
                .methods
                .entry((method.to_string(), is_static))
                .or_default()
                .kind_mut(kind)
                .bucket_mut(relation);

            match bucket.iter().position(|e| e.target == target) {
                Some(i) => match kind {
                    MethodKind::Override => bucket[i].callbacks = vec![(callback, origin.clone())],
                    MethodKind::Augment => bucket[i].callbacks.push((callback, origin.clone())),
                },
                None => bucket.push(TargetEntry {
                    target: target.clone(),
                    callbacks: vec![(callback, origin.clone())],
                }),
            }

            // 등록 시점의 대상 이름 그대로 표시
            state.decorated.insert(target.clone());
        }

        debug!(
            kind = ?kind,
            relation = %relation,
            target = %target,
            method,
            is_static,
            module = ?origin,
            "Method entry registered"
        );
    }

    /// 프로퍼티 접근 훅 등록
    ///
    /// `op`는 `get`/`set`, `phase`는 `override`/`before`/`after`.
    /// 잘못된 값은 디버그 싱크로 보고되고 등록되지 않습니다.
    pub fn augment_property<F>(
        &self,
        class: &str,
        property: &str,
        op: &str,
        phase: &str,
        callback: F,
    ) -> Result<&Self>
    where
        F: Fn(&PropertyAccess<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let op = match op.parse::<PropertyOp>() {
            Ok(op) => op,
            Err(e) => {
                self.inner.sink.report(e)?;
                return Ok(self);
            }
        };
        let phase = match phase.parse::<PropertyPhase>() {
            Ok(phase) => phase,
            Err(e) => {
                self.inner.sink.report(e)?;
                return Ok(self);
            }
        };

        if op == PropertyOp::Get && phase == PropertyPhase::Before {
            warn!(class, property, "Getter 'before' hooks are never run");
        }

        let origin = self.inner.modules.current();
        let callback: PropertyCallback = Arc::new(callback);
        {
            let mut state = self.inner.state.write();
            state
                .properties
                .entry((class.to_string(), property.to_string()))
                .or_default()
                .op_mut(op)
                .add(phase, callback, origin.clone());
            state.decorated.insert(class.to_string());
        }

        debug!(class, property, op = ?op, phase = ?phase, module = ?origin, "Property hook registered");
        Ok(self)
    }

    pub fn is_decorated(&self, class: &str) -> bool {
        self.inner.state.read().decorated.contains(class)
    }

    // ========================================================================
    // 해석
    // ========================================================================

    /// 메서드 항목 해석
    pub fn find_method_info(
        &self,
        class: &str,
        method: &str,
        is_static: bool,
        kind: MethodKind,
    ) -> Option<MethodInfo> {
        let cache_key = ResolutionKey {
            class: class.to_string(),
            method: method.to_string(),
            is_static,
            kind,
        };

        let resolved = {
            let state = self.inner.state.read();
            let buckets = state.methods.get(&(method.to_string(), is_static));

            if let Some(entry) = buckets.and_then(|b| b.kind(kind).find(Relation::Exact, class)) {
                return Some(MethodInfo::from_entry(kind, Relation::Exact, entry));
            }

            if let Some(cached) = state.resolution_cache.get(&cache_key) {
                return cached.clone();
            }

            buckets.and_then(|b| state.resolve_relations(class, b, kind))
        };

        trace!(class, method, is_static, kind = ?kind, found = resolved.is_some(), "Resolved method info");
        self.inner
            .state
            .write()
            .resolution_cache
            .insert(cache_key, resolved.clone());
        resolved
    }

    // ========================================================================
    // 인스턴스
    // ========================================================================

    /// 논리 클래스의 인스턴스
    ///
    /// 한 번이라도 오버라이드/어그먼트 대상이 된 논리 이름이면 `Decorator`로 감쌉니다.
    /// `singleton`이면 이미 있는 싱글톤을 인자와 무관하게 반환합니다.
    pub fn instance(&self, logical: &str, args: &[Value], singleton: bool) -> Result<Instance> {
        if singleton {
            if let Some(existing) = self.inner.state.read().singletons.get(logical).cloned() {
                return Ok(existing);
            }
        }

        let object = self.construct(logical, args)?;
        let instance = if self.is_decorated(logical) {
            Instance::Decorated(Decorator::wrap(self, object))
        } else {
            Instance::Plain(object)
        };

        if singleton {
            let mut state = self.inner.state.write();
            let stored = state
                .singletons
                .entry(logical.to_string())
                .or_insert(instance)
                .clone();
            return Ok(stored);
        }

        Ok(instance)
    }

    /// 장식 없이 구체 객체 생성 (클래스 오버라이드 반영)
    pub fn construct(&self, logical: &str, args: &[Value]) -> Result<ObjectHandle> {
        let concrete = self.class_name(logical);
        let factory = {
            let state = self.inner.state.read();
            match state.classes.get(&concrete) {
                Some(def) => def.get_factory().cloned(),
                None => {
                    error!(class = logical, concrete = %concrete, "Class not found");
                    return Err(Error::ClassNotFound(concrete));
                }
            }
        };

        let Some(factory) = factory else {
            error!(class = logical, concrete = %concrete, "Class is not instantiable");
            return Err(Error::InvalidArgument(format!(
                "Class {} is not instantiable",
                concrete
            )));
        };

        trace!(class = logical, concrete = %concrete, "Constructing instance");
        Ok(ObjectHandle::from_box(factory(args)?))
    }

    // ========================================================================
    // 호출 디스패치
    // ========================================================================

    /// 인스턴스 메서드 호출
    ///
    /// override가 있으면 그것을, 없으면 객체의 메서드를 직접 호출한 뒤
    /// augment 파이프라인을 적용합니다. 메서드가 없으면 디버그 싱크로 보고하고
    /// null을 반환합니다 (lenient).
    pub fn call_method(
        &self,
        receiver: &ObjectHandle,
        method: &str,
        args: &[Value],
        class_hint: Option<&str>,
    ) -> Result<Value> {
        let class = class_hint
            .map(str::to_string)
            .unwrap_or_else(|| receiver.class_name());

        let result = match self.find_method_info(&class, method, false, MethodKind::Override) {
            Some(info) => {
                let call = MethodCall {
                    receiver: Some(receiver),
                    class: &class,
                    method,
                    args,
                    previous: None,
                };
                Self::run_override(&info, &call)?
            }
            None => match receiver.call(method, args) {
                Err(Error::MethodNotFound { .. }) => {
                    return self
                        .inner
                        .sink
                        .recover(Error::method_not_found(&class, method), Value::Null);
                }
                other => other?,
            },
        };

        self.run_augments(Some(receiver), &class, method, args, false, result)
    }

    /// 정적 메서드 호출
    ///
    /// 콜백은 인스턴스에 접근할 수 없습니다 (`receiver`가 None).
    pub fn call_static_method(&self, class: &str, method: &str, args: &[Value]) -> Result<Value> {
        let result = match self.find_method_info(class, method, true, MethodKind::Override) {
            Some(info) => {
                let call = MethodCall {
                    receiver: None,
                    class,
                    method,
                    args,
                    previous: None,
                };
                Self::run_override(&info, &call)?
            }
            None => match self.find_static(class, method) {
                Some(func) => func(args)?,
                None => {
                    return self
                        .inner
                        .sink
                        .recover(Error::method_not_found(class, method), Value::Null);
                }
            },
        };

        self.run_augments(None, class, method, args, true, result)
    }

    /// 클래스와 조상에서 정적 메서드 검색
    fn find_static(&self, class: &str, method: &str) -> Option<StaticFn> {
        let state = self.inner.state.read();
        std::iter::once(class.to_string())
            .chain(state.ancestors(class))
            .find_map(|c| {
                state
                    .classes
                    .get(&c)
                    .and_then(|def| def.get_static_method(method))
                    .cloned()
            })
    }

    fn run_override(info: &MethodInfo, call: &MethodCall<'_>) -> Result<Value> {
        match info.callbacks.last() {
            Some(callback) => callback(call),
            None => Ok(Value::Null),
        }
    }

    fn run_augments(
        &self,
        receiver: Option<&ObjectHandle>,
        class: &str,
        method: &str,
        args: &[Value],
        is_static: bool,
        result: Value,
    ) -> Result<Value> {
        let Some(info) = self.find_method_info(class, method, is_static, MethodKind::Augment) else {
            return Ok(result);
        };

        let mut result = result;
        for callback in &info.callbacks {
            let call = MethodCall {
                receiver,
                class,
                method,
                args,
                previous: Some(result),
            };
            result = callback(&call)?;
        }
        Ok(result)
    }

    // ========================================================================
    // 프로퍼티 디스패치
    // ========================================================================

    fn property_hooks(
        &self,
        target: &ObjectHandle,
        property: &str,
        op: PropertyOp,
    ) -> Option<PhaseHooks> {
        let key = (target.class_name(), property.to_string());
        self.inner
            .state
            .read()
            .properties
            .get(&key)
            .map(|hooks| hooks.op(op).clone())
    }

    /// 프로퍼티 읽기: override 또는 직접 읽기, 그 다음 after 파이프라인
    pub fn call_getter(&self, target: &ObjectHandle, property: &str) -> Result<Value> {
        let Some(hooks) = self.property_hooks(target, property, PropertyOp::Get) else {
            return Ok(target.get_property(property));
        };

        let mut result = match &hooks.override_ {
            Some((callback, _)) => callback(&PropertyAccess {
                target,
                property,
                value: Value::Null,
            })?,
            None => target.get_property(property),
        };

        for (callback, _) in &hooks.after {
            result = callback(&PropertyAccess {
                target,
                property,
                value: result,
            })?;
        }
        Ok(result)
    }

    /// 프로퍼티 쓰기: before, override 또는 직접 쓰기, after
    pub fn call_setter(&self, target: &ObjectHandle, property: &str, value: Value) -> Result<()> {
        let Some(hooks) = self.property_hooks(target, property, PropertyOp::Set) else {
            target.set_property(property, value);
            return Ok(());
        };

        let access = PropertyAccess {
            target,
            property,
            value,
        };

        for (callback, _) in &hooks.before {
            callback(&access)?;
        }

        match &hooks.override_ {
            Some((callback, _)) => {
                callback(&access)?;
            }
            None => target.set_property(property, access.value.clone()),
        }

        for (callback, _) in &hooks.after {
            callback(&access)?;
        }
        Ok(())
    }

    // ========================================================================
    // 진단
    // ========================================================================

    /// 등록 상태 스냅샷
    pub fn debug_overrides(&self) -> RegistryDump {
        let state = self.inner.state.read();

        let mut class_overrides: Vec<ClassOverrideInfo> = state
            .class_overrides
            .iter()
            .map(|(class, o)| ClassOverrideInfo {
                class: class.clone(),
                replacement: o.replacement.clone(),
                origin_module: o.origin_module.clone(),
            })
            .collect();
        class_overrides.sort_by(|a, b| a.class.cmp(&b.class));

        let mut method_keys: Vec<&(String, bool)> = state.methods.keys().collect();
        method_keys.sort();

        let mut methods = Vec::new();
        for key in method_keys {
            let buckets = &state.methods[key];
            for kind in [MethodKind::Override, MethodKind::Augment] {
                for relation in [Relation::Exact, Relation::Extends, Relation::Implements] {
                    for entry in buckets.kind(kind).bucket(relation) {
                        for (_, origin) in &entry.callbacks {
                            methods.push(MethodEntryInfo {
                                method: key.0.clone(),
                                is_static: key.1,
                                kind,
                                relation,
                                target: entry.target.clone(),
                                origin_module: origin.clone(),
                            });
                        }
                    }
                }
            }
        }

        let mut property_keys: Vec<&(String, String)> = state.properties.keys().collect();
        property_keys.sort();

        let mut properties = Vec::new();
        for key in property_keys {
            let hooks = &state.properties[key];
            for op in [PropertyOp::Get, PropertyOp::Set] {
                let phase_hooks = hooks.op(op);
                let entries = phase_hooks
                    .override_
                    .iter()
                    .map(|(_, origin)| (PropertyPhase::Override, origin))
                    .chain(phase_hooks.before.iter().map(|(_, o)| (PropertyPhase::Before, o)))
                    .chain(phase_hooks.after.iter().map(|(_, o)| (PropertyPhase::After, o)));
                for (phase, origin) in entries {
                    properties.push(PropertyEntryInfo {
                        class: key.0.clone(),
                        property: key.1.clone(),
                        op,
                        phase,
                        origin_module: origin.clone(),
                    });
                }
            }
        }

        let mut decorated: Vec<String> = state.decorated.iter().cloned().collect();
        decorated.sort();
        let mut singletons: Vec<String> = state.singletons.keys().cloned().collect();
        singletons.sort();

        RegistryDump {
            class_overrides,
            methods,
            properties,
            decorated,
            singletons,
            resolution_cache_size: state.resolution_cache.len(),
        }
    }

    /// 모든 상태 초기화 (테스트용)
    pub fn reset(&self) {
        // 객체 drop이 레지스트리에 접근해도 교착되지 않도록 락 밖에서 버림
        let old = std::mem::take(&mut *self.inner.state.write());
        drop(old);
        debug!("Class registry reset");
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ModuleStack::new()), Arc::new(DebugSink::default()))
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ClassRegistry")
            .field("classes", &state.classes.len())
            .field("class_overrides", &state.class_overrides.len())
            .field("methods", &state.methods.len())
            .field("singletons", &state.singletons.len())
            .finish()
    }
}
