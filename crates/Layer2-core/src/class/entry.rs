//! Registry entries - 오버라이드/어그먼트 항목과 콜백 형태

use super::object::ObjectHandle;
use bucky_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 모든 클래스와 일치하는 대상 (가장 낮은 우선순위)
pub const WILDCARD: &str = "*";

// ============================================================================
// Callbacks
// ============================================================================

/// 메서드 콜백에 전달되는 호출 정보
#[derive(Debug, Clone)]
pub struct MethodCall<'a> {
    /// 호출 대상 객체 (정적 호출이면 None)
    pub receiver: Option<&'a ObjectHandle>,

    /// 조회에 사용된 클래스 이름
    pub class: &'a str,

    pub method: &'a str,

    /// 원래 호출 인자
    pub args: &'a [Value],

    /// 어그먼트 파이프라인에서 이전 단계의 결과
    pub previous: Option<Value>,
}

impl MethodCall<'_> {
    /// n번째 인자 (없으면 null)
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Null)
    }

    /// 이전 결과 (없으면 null)
    pub fn previous(&self) -> Value {
        self.previous.clone().unwrap_or(Value::Null)
    }
}

pub type MethodCallback = Arc<dyn Fn(&MethodCall<'_>) -> Result<Value> + Send + Sync>;

/// 프로퍼티 콜백에 전달되는 접근 정보
#[derive(Debug, Clone)]
pub struct PropertyAccess<'a> {
    pub target: &'a ObjectHandle,

    pub property: &'a str,

    /// setter: 쓰려는 값, getter: 현재까지의 결과
    pub value: Value,
}

pub type PropertyCallback = Arc<dyn Fn(&PropertyAccess<'_>) -> Result<Value> + Send + Sync>;

// ============================================================================
// Method entries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// 메서드 동작 전체 교체
    Override,
    /// 결과 후처리 파이프라인
    Augment,
}

/// 항목이 어떤 클래스에 적용되는지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// 이름이 정확히 같은 클래스 (와일드카드 포함)
    Exact,
    /// 대상을 조상으로 가진 클래스
    Extends,
    /// 대상 인터페이스를 구현한 클래스
    Implements,
}

impl Relation {
    /// `"Foo"`, `"extends Foo"`, `"implements Foo"` 파싱
    pub fn parse_target(input: &str) -> (Relation, String) {
        let input = input.trim();
        let mut parts = input.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(keyword), Some(target), None) if keyword.eq_ignore_ascii_case("extends") => {
                (Relation::Extends, target.to_string())
            }
            (Some(keyword), Some(target), None) if keyword.eq_ignore_ascii_case("implements") => {
                (Relation::Implements, target.to_string())
            }
            _ => (Relation::Exact, input.to_string()),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Extends => write!(f, "extends"),
            Self::Implements => write!(f, "implements"),
        }
    }
}

/// 한 대상(target)에 등록된 콜백들
///
/// override는 항상 하나, augment는 등록 순서대로 쌓입니다.
#[derive(Clone)]
pub(crate) struct TargetEntry {
    pub target: String,
    pub callbacks: Vec<(MethodCallback, Option<String>)>,
}

/// 해석 결과
#[derive(Clone)]
pub struct MethodInfo {
    pub kind: MethodKind,
    pub relation: Relation,
    pub target: String,
    pub callbacks: Vec<MethodCallback>,
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("kind", &self.kind)
            .field("relation", &self.relation)
            .field("target", &self.target)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// 관계별 버킷 (각 버킷은 등록 순서 유지)
#[derive(Clone, Default)]
pub(crate) struct KindBuckets {
    pub exact: Vec<TargetEntry>,
    pub extends: Vec<TargetEntry>,
    pub implements: Vec<TargetEntry>,
}

impl KindBuckets {
    pub fn bucket(&self, relation: Relation) -> &[TargetEntry] {
        match relation {
            Relation::Exact => &self.exact,
            Relation::Extends => &self.extends,
            Relation::Implements => &self.implements,
        }
    }

    pub fn bucket_mut(&mut self, relation: Relation) -> &mut Vec<TargetEntry> {
        match relation {
            Relation::Exact => &mut self.exact,
            Relation::Extends => &mut self.extends,
            Relation::Implements => &mut self.implements,
        }
    }

    pub fn find(&self, relation: Relation, target: &str) -> Option<&TargetEntry> {
        self.bucket(relation).iter().find(|e| e.target == target)
    }
}

/// (method, is_static) 하나에 대한 모든 항목
#[derive(Clone, Default)]
pub(crate) struct MethodBuckets {
    pub overrides: KindBuckets,
    pub augments: KindBuckets,
}

impl MethodBuckets {
    pub fn kind(&self, kind: MethodKind) -> &KindBuckets {
        match kind {
            MethodKind::Override => &self.overrides,
            MethodKind::Augment => &self.augments,
        }
    }

    pub fn kind_mut(&mut self, kind: MethodKind) -> &mut KindBuckets {
        match kind {
            MethodKind::Override => &mut self.overrides,
            MethodKind::Augment => &mut self.augments,
        }
    }
}

// ============================================================================
// Class override
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOverride {
    pub replacement: String,
    pub origin_module: Option<String>,
}

// ============================================================================
// Property entries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyOp {
    Get,
    Set,
}

impl FromStr for PropertyOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "set" => Ok(Self::Set),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid property augmentation operator: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyPhase {
    Override,
    Before,
    After,
}

impl FromStr for PropertyPhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "override" => Ok(Self::Override),
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid property augmentation type: {}",
                s
            ))),
        }
    }
}

/// 한 단계(phase)의 콜백들
#[derive(Clone, Default)]
pub(crate) struct PhaseHooks {
    pub override_: Option<(PropertyCallback, Option<String>)>,
    pub before: Vec<(PropertyCallback, Option<String>)>,
    pub after: Vec<(PropertyCallback, Option<String>)>,
}

impl PhaseHooks {
    pub fn add(&mut self, phase: PropertyPhase, callback: PropertyCallback, origin: Option<String>) {
        match phase {
            PropertyPhase::Override => self.override_ = Some((callback, origin)),
            PropertyPhase::Before => self.before.push((callback, origin)),
            PropertyPhase::After => self.after.push((callback, origin)),
        }
    }
}

/// (class, property) 하나에 대한 get/set 훅
#[derive(Clone, Default)]
pub(crate) struct PropertyHooks {
    pub get: PhaseHooks,
    pub set: PhaseHooks,
}

impl PropertyHooks {
    pub fn op(&self, op: PropertyOp) -> &PhaseHooks {
        match op {
            PropertyOp::Get => &self.get,
            PropertyOp::Set => &self.set,
        }
    }

    pub fn op_mut(&mut self, op: PropertyOp) -> &mut PhaseHooks {
        match op {
            PropertyOp::Get => &mut self.get,
            PropertyOp::Set => &mut self.set,
        }
    }
}
