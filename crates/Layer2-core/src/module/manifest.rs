//! Module Manifest - 모듈 메타데이터

use serde::{Deserialize, Serialize};

/// 모듈 매니페스트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// 고유 모듈 이름 (예: "Blog")
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// 먼저 부트스트랩되어야 하는 모듈 이름들 (선언 순서 유지)
    #[serde(default)]
    pub depends: Vec<String>,

    #[serde(default)]
    pub description: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl ModuleManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            depends: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_dependency(mut self, module: impl Into<String>) -> Self {
        self.depends.push(module.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_builder() {
        let manifest = ModuleManifest::new("Blog")
            .with_version("1.2.0")
            .with_dependency("Core")
            .with_dependency("Users")
            .with_description("Blog posts");

        assert_eq!(manifest.name, "Blog");
        assert_eq!(manifest.version, "1.2.0");
        assert_eq!(manifest.depends, ["Core", "Users"]);
    }

    #[test]
    fn test_manifest_deserialize_defaults() {
        let manifest: ModuleManifest = serde_json::from_str(r#"{"name":"Core"}"#).unwrap();
        assert_eq!(manifest, ModuleManifest::new("Core"));
    }
}
