//! Registry snapshot - 진단용 직렬화 가능한 덤프

use super::entry::{MethodKind, PropertyOp, PropertyPhase, Relation};
use serde::{Deserialize, Serialize};

/// `ClassRegistry::debug_overrides()` 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDump {
    pub class_overrides: Vec<ClassOverrideInfo>,
    pub methods: Vec<MethodEntryInfo>,
    pub properties: Vec<PropertyEntryInfo>,
    pub decorated: Vec<String>,
    pub singletons: Vec<String>,
    pub resolution_cache_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOverrideInfo {
    pub class: String,
    pub replacement: String,
    pub origin_module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntryInfo {
    pub method: String,
    pub is_static: bool,
    pub kind: MethodKind,
    pub relation: Relation,
    pub target: String,
    pub origin_module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEntryInfo {
    pub class: String,
    pub property: String,
    pub op: PropertyOp,
    pub phase: PropertyPhase,
    pub origin_module: Option<String>,
}
