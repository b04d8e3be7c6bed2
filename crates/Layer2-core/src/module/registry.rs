//! Module Registry - 모듈 등록과 의존성 순서 부트스트랩

use super::manifest::ModuleManifest;
use crate::kernel::Kernel;
use bucky_foundation::{EventArgs, Result, MODULE_BOOTSTRAP_AFTER, MODULE_BOOTSTRAP_BEFORE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 모듈 부트스트랩 콜백
pub type BootstrapFn = Arc<dyn Fn(&Kernel) -> Result<()> + Send + Sync>;

struct ModuleEntry {
    manifest: ModuleManifest,
    bootstrap: BootstrapFn,
}

/// 부트스트랩되지 못한 모듈
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedModule {
    pub name: String,
    pub reason: String,
}

/// 부트스트랩 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// 부트스트랩된 순서
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedModule>,
}

impl BootstrapReport {
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Visiting,
    Loaded,
    Skipped,
}

/// 모듈 레지스트리
///
/// ```ignore
/// let mut modules = ModuleRegistry::new();
/// modules.add(ModuleManifest::new("Core"), |kernel| {
///     kernel.registry().override_class("Logger", "FileLogger", false);
///     Ok(())
/// });
/// modules.add(ModuleManifest::new("Blog").with_dependency("Core"), |_| Ok(()));
///
/// let report = modules.bootstrap(&kernel);
/// ```
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모듈 등록 (같은 이름이면 교체)
    pub fn add<F>(&mut self, manifest: ModuleManifest, bootstrap: F) -> &mut Self
    where
        F: Fn(&Kernel) -> Result<()> + Send + Sync + 'static,
    {
        let entry = ModuleEntry {
            manifest,
            bootstrap: Arc::new(bootstrap),
        };
        match self
            .modules
            .iter()
            .position(|m| m.manifest.name == entry.manifest.name)
        {
            Some(index) => {
                warn!(module = %entry.manifest.name, "Module is already registered, replacing");
                self.modules[index] = entry;
            }
            None => {
                debug!(module = %entry.manifest.name, "Module registered");
                self.modules.push(entry);
            }
        }
        self
    }

    pub fn manifests(&self) -> Vec<&ModuleManifest> {
        self.modules.iter().map(|m| &m.manifest).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn find(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| m.manifest.name == name)
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    /// 등록 순서대로, 의존성을 먼저 부트스트랩
    ///
    /// 의존성이 없거나 실패했거나 순환하는 모듈은 건너뛰고 보고서에 기록합니다.
    /// 한 모듈의 실패가 다른 독립 모듈의 부트스트랩을 막지는 않습니다.
    pub fn bootstrap(&self, kernel: &Kernel) -> BootstrapReport {
        let mut status = HashMap::new();
        let mut report = BootstrapReport::default();

        for entry in &self.modules {
            self.visit(entry, kernel, &mut status, &mut report);
        }

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Module bootstrap complete"
        );
        report
    }

    fn visit(
        &self,
        entry: &ModuleEntry,
        kernel: &Kernel,
        status: &mut HashMap<String, Status>,
        report: &mut BootstrapReport,
    ) -> bool {
        let name = entry.manifest.name.as_str();
        match status.get(name) {
            Some(Status::Loaded) => return true,
            Some(Status::Skipped) | Some(Status::Visiting) => return false,
            None => {}
        }
        status.insert(name.to_string(), Status::Visiting);

        for dep in &entry.manifest.depends {
            let failure = match self.find(dep) {
                None => Some(format!("missing dependency: {}", dep)),
                Some(_) if status.get(dep.as_str()) == Some(&Status::Visiting) => {
                    Some(format!("cyclic dependency: {}", dep))
                }
                Some(dep_entry) => {
                    if self.visit(dep_entry, kernel, status, report) {
                        None
                    } else {
                        Some(format!("dependency failed: {}", dep))
                    }
                }
            };

            if let Some(reason) = failure {
                warn!(module = name, reason = %reason, "Skipping module");
                status.insert(name.to_string(), Status::Skipped);
                report.skipped.push(SkippedModule {
                    name: name.to_string(),
                    reason,
                });
                return false;
            }
        }

        match Self::run(entry, kernel) {
            Ok(()) => {
                info!(module = name, version = %entry.manifest.version, "Module bootstrapped");
                status.insert(name.to_string(), Status::Loaded);
                report.loaded.push(name.to_string());
                true
            }
            Err(e) => {
                warn!(module = name, error = %e, "Module bootstrap failed");
                status.insert(name.to_string(), Status::Skipped);
                report.skipped.push(SkippedModule {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    fn run(entry: &ModuleEntry, kernel: &Kernel) -> Result<()> {
        let name = &entry.manifest.name;
        let _guard = kernel.modules().push(name.clone());

        let mut args = EventArgs::new();
        args.insert("module".to_string(), Value::String(name.clone()));

        kernel.events().fire(MODULE_BOOTSTRAP_BEFORE, args.clone())?;
        (entry.bootstrap)(kernel)?;
        kernel.events().fire(MODULE_BOOTSTRAP_AFTER, args)?;
        Ok(())
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.manifests())
            .finish()
    }
}
