//! Event Bus - 이름 기반 동기 발행/구독
//!
//! 옵저버는 등록 순서대로 실행되며, `position` 인자를 가진 옵저버만
//! 발행 시점에 지정된 절대 위치로 옮겨집니다.

use super::types::{EventArgs, Observer, ObserverCallback};
use crate::module::ModuleStack;
use crate::Result;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

// ============================================================================
// ObserverSelector
// ============================================================================

/// `off()`에서 제거할 옵저버 선택자
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverSelector {
    /// 이벤트 자체 (옵저버와 기본 인자 모두)
    All,
    /// 아무것도 선택하지 않음
    Nothing,
    /// 슬롯 인덱스
    Index(usize),
    /// alias 일치
    Alias(String),
}

impl From<bool> for ObserverSelector {
    fn from(all: bool) -> Self {
        if all {
            Self::All
        } else {
            Self::Nothing
        }
    }
}

impl From<usize> for ObserverSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ObserverSelector {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<String> for ObserverSelector {
    fn from(alias: String) -> Self {
        Self::Alias(alias)
    }
}

// ============================================================================
// Event entry
// ============================================================================

/// 등록된 이벤트
///
/// 옵저버 슬롯은 제거되어도 인덱스가 유지됩니다 (tombstone).
/// 위치 재배치가 일어날 때만 슬롯이 압축되고 인덱스가 다시 매겨집니다.
#[derive(Debug, Default)]
struct EventEntry {
    observers: Vec<Option<Observer>>,
    default_args: EventArgs,
}

impl EventEntry {
    fn live(&self) -> impl Iterator<Item = &Observer> {
        self.observers.iter().flatten()
    }

    /// 고정점에 도달할 때까지 한 번에 하나씩 옵저버를 재배치
    fn apply_positions(&mut self) {
        if !self.live().any(Observer::wants_reposition) {
            return;
        }

        self.observers.retain(Option::is_some);

        loop {
            let from = self
                .observers
                .iter()
                .position(|slot| slot.as_ref().is_some_and(Observer::wants_reposition));
            let Some(from) = from else { break };

            let Some(mut observer) = self.observers.remove(from) else {
                continue;
            };
            observer.ordered = true;
            let to = observer.position.unwrap_or(from).min(self.observers.len());
            trace!(from, to, alias = ?observer.alias, "reposition observer");
            self.observers.insert(to, Some(observer));
        }
    }
}

/// 옵저버 스냅샷 (진단용)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverInfo {
    pub slot: usize,
    pub alias: Option<String>,
    pub origin_module: Option<String>,
}

// ============================================================================
// Events
// ============================================================================

/// 이벤트 버스
///
/// ## 사용법
///
/// ```ignore
/// let events = Events::new(modules);
/// events.on("user.created", ObserverCallback::closure(|args| Ok(args["name"].clone())), args, None);
/// let results = events.fire("User.Created", call_args)?;
/// ```
pub struct Events {
    events: RwLock<HashMap<String, EventEntry>>,

    /// 이벤트 이름 등록 순서 (fire_regexp 결과 순서 고정용)
    order: RwLock<Vec<String>>,

    modules: Arc<ModuleStack>,
}

impl Events {
    pub fn new(modules: Arc<ModuleStack>) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            modules,
        }
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    fn with_entry<R>(&self, name: &str, f: impl FnOnce(&mut EventEntry) -> R) -> R {
        let key = Self::key(name);
        let mut events = self.events.write();
        if !events.contains_key(&key) {
            self.order.write().push(key.clone());
        }
        f(events.entry(key).or_default())
    }

    // ========================================================================
    // 등록 / 해제
    // ========================================================================

    /// 옵저버 등록
    ///
    /// `alias`가 없고 콜백이 이름 있는 함수 참조면 그 이름이 alias가 됩니다.
    pub fn on(
        &self,
        event: &str,
        callback: ObserverCallback,
        args: EventArgs,
        alias: Option<&str>,
    ) -> &Self {
        let observer = Observer::new(callback, args, alias.map(str::to_string))
            .with_origin(self.modules.current());
        self.push(event, observer);
        self
    }

    /// 여러 이벤트에 같은 옵저버 등록
    pub fn on_many(
        &self,
        events: &[&str],
        callback: ObserverCallback,
        args: EventArgs,
        alias: Option<&str>,
    ) -> &Self {
        for event in events {
            self.on(event, callback.clone(), args.clone(), alias);
        }
        self
    }

    /// 첫 발행 후 자동으로 제거되는 옵저버 등록
    ///
    /// 원래 옵저버 뒤에 정리용 옵저버를 하나 더 등록하고, 정리용 옵저버는
    /// 자신과 원래 옵저버를 등록 당시의 슬롯 인덱스로 제거합니다.
    pub fn once(
        &self,
        event: &str,
        callback: ObserverCallback,
        args: EventArgs,
        alias: Option<&str>,
    ) -> &Self {
        let slot = self.on(event, callback, args, alias).slot_count(event) - 1;
        let cleanup = ObserverCallback::Cleanup {
            event: event.to_string(),
            slots: [slot, slot + 1],
        };
        self.push(event, Observer::new(cleanup, EventArgs::new(), None));
        self
    }

    fn push(&self, event: &str, observer: Observer) {
        debug!(
            event = %Self::key(event),
            alias = ?observer.alias,
            module = ?observer.origin_module,
            "Registering observer"
        );
        self.with_entry(event, |entry| entry.observers.push(Some(observer)));
    }

    /// 옵저버 제거
    ///
    /// `true`(`All`)는 기본 인자까지 포함해 이벤트 등록 자체를 지우고,
    /// `false`는 아무것도 지우지 않습니다.
    pub fn off(&self, event: &str, selector: impl Into<ObserverSelector>) -> &Self {
        let selector = selector.into();
        if selector == ObserverSelector::Nothing {
            return self;
        }

        let key = Self::key(event);
        let mut events = self.events.write();
        if selector == ObserverSelector::All {
            if events.remove(&key).is_some() {
                self.order.write().retain(|name| name != &key);
                debug!(event = %key, "Removed event");
            }
            return self;
        }

        let Some(entry) = events.get_mut(&key) else {
            return self;
        };

        match &selector {
            ObserverSelector::All | ObserverSelector::Nothing => {}
            ObserverSelector::Index(i) => {
                if let Some(slot) = entry.observers.get_mut(*i) {
                    *slot = None;
                }
            }
            ObserverSelector::Alias(alias) => {
                for slot in entry.observers.iter_mut() {
                    if slot.as_ref().is_some_and(|o| o.alias.as_deref() == Some(alias)) {
                        *slot = None;
                    }
                }
            }
        }

        debug!(event = %key, selector = ?selector, "Removed observers");
        self
    }

    /// 이벤트 기본 인자 설정
    pub fn set_default_args(&self, event: &str, args: EventArgs) -> &Self {
        self.with_entry(event, |entry| entry.default_args = args);
        self
    }

    // ========================================================================
    // 발행
    // ========================================================================

    /// 이벤트 발행
    ///
    /// 옵저버가 없으면 빈 목록을 즉시 반환합니다.
    pub fn fire(&self, event: &str, args: EventArgs) -> Result<Vec<Value>> {
        let key = Self::key(event);

        // 락을 잡은 채로 콜백을 실행하지 않도록 스냅샷을 떠둠
        let (observers, defaults) = {
            let mut events = self.events.write();
            let Some(entry) = events.get_mut(&key) else {
                trace!(event = %key, "no subscribers");
                return Ok(Vec::new());
            };
            if entry.live().next().is_none() {
                trace!(event = %key, "no subscribers");
                return Ok(Vec::new());
            }
            entry.apply_positions();
            (
                entry.live().cloned().collect::<Vec<_>>(),
                entry.default_args.clone(),
            )
        };

        trace!(event = %key, observers = observers.len(), "Firing event");

        let mut results = Vec::with_capacity(observers.len());
        for observer in observers {
            let mut merged = defaults.clone();
            merged.extend(observer.args.clone());
            merged.extend(args.clone());

            let _guard = observer
                .origin_module
                .as_ref()
                .map(|module| self.modules.push(module.clone()));

            let result = match &observer.callback {
                ObserverCallback::Named { func, .. } | ObserverCallback::Closure(func) => {
                    func(&merged)?
                }
                ObserverCallback::View(view) => {
                    let mut view = view.lock();
                    view.set(&merged);
                    Value::String(view.render())
                }
                ObserverCallback::Cleanup { event, slots } => {
                    self.off(event, slots[0]).off(event, slots[1]);
                    Value::Null
                }
            };
            results.push(result);
        }

        Ok(results)
    }

    /// 정규식과 일치하는 모든 이벤트를 발행하고 결과를 이어붙임
    pub fn fire_regexp(&self, pattern: &str, args: EventArgs) -> Result<Vec<Value>> {
        let re = Regex::new(pattern)?;
        let names: Vec<String> = self
            .order
            .read()
            .iter()
            .filter(|name| re.is_match(name))
            .cloned()
            .collect();

        let mut results = Vec::new();
        for name in names {
            results.extend(self.fire(&name, args.clone())?);
        }
        Ok(results)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 등록된 이벤트 이름 (등록 순서)
    pub fn events(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// 이벤트의 살아있는 옵저버 목록
    pub fn observers(&self, event: &str) -> Vec<ObserverInfo> {
        let events = self.events.read();
        events
            .get(&Self::key(event))
            .map(|entry| {
                entry
                    .observers
                    .iter()
                    .enumerate()
                    .filter_map(|(slot, o)| {
                        o.as_ref().map(|o| ObserverInfo {
                            slot,
                            alias: o.alias.clone(),
                            origin_module: o.origin_module.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn slot_count(&self, event: &str) -> usize {
        self.events
            .read()
            .get(&Self::key(event))
            .map(|e| e.observers.len())
            .unwrap_or(0)
    }

    pub fn modules(&self) -> &Arc<ModuleStack> {
        &self.modules
    }

    /// 모든 이벤트 제거 (테스트용)
    pub fn reset(&self) {
        self.events.write().clear();
        self.order.write().clear();
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new(Arc::new(ModuleStack::new()))
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::types::ViewObserver;
    use parking_lot::Mutex;
    use serde_json::json;

    fn args(value: Value) -> EventArgs {
        match value {
            Value::Object(map) => map,
            _ => EventArgs::new(),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> ObserverCallback {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        ObserverCallback::closure(move |_| {
            log.lock().push(tag.clone());
            Ok(json!(tag.clone()))
        })
    }

    #[test]
    fn test_fire_without_subscribers() {
        let events = Events::default();
        assert!(events.fire("nothing", EventArgs::new()).unwrap().is_empty());
    }

    #[test]
    fn test_args_merge_and_case_folding() {
        let events = Events::default();
        events.on(
            "user.created",
            ObserverCallback::closure(|a| Ok(Value::Object(a.clone()))),
            args(json!({"role": "admin", "name": "default"})),
            None,
        );
        events.set_default_args("USER.CREATED", args(json!({"source": "web", "role": "guest"})));

        let results = events
            .fire("User.Created", args(json!({"name": "x"})))
            .unwrap();

        assert_eq!(results, vec![json!({"source": "web", "role": "admin", "name": "x"})]);
    }

    #[test]
    fn test_registration_order() {
        let events = Events::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.on("e", recorder(&log, "o1"), EventArgs::new(), None);
        events.on("e", recorder(&log, "o2"), EventArgs::new(), None);

        events.fire("e", EventArgs::new()).unwrap();
        assert_eq!(*log.lock(), vec!["o1", "o2"]);
    }

    #[test]
    fn test_once() {
        let events = Events::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.once("e", recorder(&log, "o1"), EventArgs::new(), None);
        events.on("e", recorder(&log, "o2"), EventArgs::new(), None);

        events.fire("e", EventArgs::new()).unwrap();
        events.fire("e", EventArgs::new()).unwrap();

        assert_eq!(*log.lock(), vec!["o1", "o2", "o2"]);
        assert_eq!(events.observers("e").len(), 1);
    }

    #[test]
    fn test_off_selectors() {
        let events = Events::default();
        let noop = || ObserverCallback::closure(|_| Ok(Value::Null));
        events.on("e", ObserverCallback::named("Mod::handler", |_| Ok(Value::Null)), EventArgs::new(), None);
        events.on("e", noop(), EventArgs::new(), Some("custom"));
        events.on("e", noop(), EventArgs::new(), None);

        events.off("e", "Mod::handler");
        assert_eq!(events.observers("e").len(), 2);

        // 슬롯 인덱스는 제거 후에도 유지됨
        events.off("e", 2usize);
        let remaining = events.observers("e");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].slot, 1);

        events.off("e", true);
        assert!(events.fire("e", EventArgs::new()).unwrap().is_empty());
    }

    #[test]
    fn test_off_false_removes_nothing() {
        let events = Events::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.on("e", recorder(&log, "o1"), EventArgs::new(), None);
        events.on("e", recorder(&log, "o2"), EventArgs::new(), None);

        events.off("e", false);
        assert_eq!(events.observers("e").len(), 2);

        events.fire("e", EventArgs::new()).unwrap();
        assert_eq!(*log.lock(), vec!["o1", "o2"]);
    }

    #[test]
    fn test_off_all_forgets_event() {
        let events = Events::default();
        events.set_default_args("e", args(json!({"source": "web"})));
        events.on("e", ObserverCallback::closure(|a| Ok(Value::Object(a.clone()))), EventArgs::new(), None);
        events.on("other", ObserverCallback::closure(|_| Ok(Value::Null)), EventArgs::new(), None);

        events.off("E", true);
        assert_eq!(events.events(), vec!["other"]);
        assert!(events.observers("e").is_empty());

        // 다시 등록하면 이전 기본 인자 없이 새 이벤트로 시작
        events.on("e", ObserverCallback::closure(|a| Ok(Value::Object(a.clone()))), EventArgs::new(), None);
        let results = events.fire("e", args(json!({"name": "x"}))).unwrap();
        assert_eq!(results, vec![json!({"name": "x"})]);
        assert_eq!(events.events(), vec!["other", "e"]);
    }

    #[test]
    fn test_position_reorders_once() {
        let events = Events::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.on("e", recorder(&log, "a"), EventArgs::new(), None);
        events.on("e", recorder(&log, "b"), EventArgs::new(), None);
        events.on("e", recorder(&log, "c"), args(json!({"position": 0})), None);

        events.fire("e", EventArgs::new()).unwrap();
        events.fire("e", EventArgs::new()).unwrap();

        assert_eq!(*log.lock(), vec!["c", "a", "b", "c", "a", "b"]);
    }

    #[test]
    fn test_position_reaches_callback_args() {
        let events = Events::default();
        events.on(
            "e",
            ObserverCallback::closure(|a| Ok(a.get("position").cloned().unwrap_or(Value::Null))),
            args(json!({"position": 0})),
            None,
        );

        assert_eq!(events.fire("e", EventArgs::new()).unwrap(), vec![json!(0)]);
    }

    #[test]
    fn test_conflicting_positions_terminate() {
        let events = Events::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.on("e", recorder(&log, "a"), EventArgs::new(), None);
        events.on("e", recorder(&log, "b"), args(json!({"position": 0})), None);
        events.on("e", recorder(&log, "c"), args(json!({"position": 0})), None);

        events.fire("e", EventArgs::new()).unwrap();

        // 마지막으로 재배치된 옵저버가 슬롯을 차지
        assert_eq!(*log.lock(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_origin_module_pushed_during_fire() {
        let modules = Arc::new(ModuleStack::new());
        let events = Events::new(Arc::clone(&modules));

        {
            let _guard = modules.push("Blog");
            let seen = Arc::clone(&modules);
            events.on(
                "e",
                ObserverCallback::closure(move |_| Ok(json!(seen.current()))),
                EventArgs::new(),
                None,
            );
        }

        assert_eq!(modules.current(), None);
        let results = events.fire("e", EventArgs::new()).unwrap();
        assert_eq!(results, vec![json!("Blog")]);
        assert_eq!(modules.current(), None);
    }

    struct Greeting {
        name: String,
    }

    impl ViewObserver for Greeting {
        fn set(&mut self, args: &EventArgs) {
            if let Some(name) = args.get("name").and_then(Value::as_str) {
                self.name = name.to_string();
            }
        }

        fn render(&self) -> String {
            format!("Hello, {}", self.name)
        }
    }

    #[test]
    fn test_view_observer() {
        let events = Events::default();
        events.on(
            "page.render",
            ObserverCallback::view(Greeting { name: String::new() }),
            EventArgs::new(),
            None,
        );

        let results = events
            .fire("page.render", args(json!({"name": "bucky"})))
            .unwrap();
        assert_eq!(results, vec![json!("Hello, bucky")]);
    }

    #[test]
    fn test_fire_regexp() {
        let events = Events::default();
        events.on("order.placed", ObserverCallback::closure(|_| Ok(json!(1))), EventArgs::new(), None);
        events.on("order.shipped", ObserverCallback::closure(|_| Ok(json!(2))), EventArgs::new(), None);
        events.on("user.login", ObserverCallback::closure(|_| Ok(json!(3))), EventArgs::new(), None);

        let results = events.fire_regexp("^order\\.", EventArgs::new()).unwrap();
        assert_eq!(results, vec![json!(1), json!(2)]);
    }
}
