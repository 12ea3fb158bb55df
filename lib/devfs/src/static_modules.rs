//! An in-process module system: driver modules are registered up front and
//! "loading" one only flips its state.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
#[allow(unused_imports, dead_code)]
use tracing::{debug, error, info, trace, warn};

use crate::{DriverModule, ModuleError, ModuleSystem};

#[derive(Debug)]
struct ModuleEntry {
    module: Arc<dyn DriverModule>,
    loaded: bool,
    enabled: bool,
}

/// How often each state transition was requested; lets callers check that
/// the filesystem only undoes what it did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModuleStats {
    pub loads: usize,
    pub unloads: usize,
    pub enables: usize,
    pub disables: usize,
}

#[derive(Debug, Default)]
struct StaticModuleSystemInner {
    modules: IndexMap<String, ModuleEntry>,
    stats: IndexMap<String, ModuleStats>,
}

/// A [`ModuleSystem`] over a fixed set of registered modules.
///
/// This type can be cloned, it's a light copy of the shared inner state.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleSystem {
    inner: Arc<RwLock<StaticModuleSystemInner>>,
}

impl StaticModuleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a module available for loading. A module registered under an
    /// existing name replaces it.
    pub fn register(&self, module: impl DriverModule + 'static) -> &Self {
        self.register_arc(Arc::new(module))
    }

    pub fn register_arc(&self, module: Arc<dyn DriverModule>) -> &Self {
        let name = module.name().to_string();
        match self.inner.write() {
            Ok(mut inner) => {
                debug!(module = %name, "registered driver module");
                inner.modules.insert(
                    name,
                    ModuleEntry {
                        module,
                        loaded: false,
                        enabled: false,
                    },
                );
            }
            Err(_) => error!(module = %name, "module registry lock poisoned"),
        }
        self
    }

    /// Loads and optionally enables a module on behalf of some other owner,
    /// outside of the request counters.
    pub fn preload(&self, name: &str, enable: bool) -> Result<(), ModuleError> {
        let mut inner = self.inner.write().map_err(|_| ModuleError::Lock)?;
        let entry = inner
            .modules
            .get_mut(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        entry.loaded = true;
        entry.enabled |= enable;
        Ok(())
    }

    pub fn stats(&self, name: &str) -> ModuleStats {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.stats.get(name).copied())
            .unwrap_or_default()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.modules.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn with_entry<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut ModuleEntry, &mut ModuleStats) -> Result<T, ModuleError>,
    ) -> Result<T, ModuleError> {
        let mut guard = self.inner.write().map_err(|_| ModuleError::Lock)?;
        let inner = &mut *guard;
        let entry = inner
            .modules
            .get_mut(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        let stats = inner.stats.entry(name.to_string()).or_default();
        f(entry, stats)
    }

    fn state(&self, name: &str) -> Option<(bool, bool)> {
        let inner = self.inner.read().ok()?;
        inner
            .modules
            .get(name)
            .map(|entry| (entry.loaded, entry.enabled))
    }
}

impl ModuleSystem for StaticModuleSystem {
    fn is_loaded(&self, name: &str) -> bool {
        self.state(name).is_some_and(|(loaded, _)| loaded)
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.state(name).is_some_and(|(_, enabled)| enabled)
    }

    fn load_by_name(&self, name: &str) -> Result<Arc<dyn DriverModule>, ModuleError> {
        self.with_entry(name, |entry, stats| {
            if !entry.loaded {
                trace!(module = %name, "loading module");
                entry.loaded = true;
                stats.loads += 1;
            }
            Ok(entry.module.clone())
        })
    }

    fn enable(&self, name: &str) -> Result<(), ModuleError> {
        self.with_entry(name, |entry, stats| {
            if !entry.loaded {
                return Err(ModuleError::NotLoaded(name.to_string()));
            }
            if !entry.enabled {
                entry.enabled = true;
                stats.enables += 1;
            }
            Ok(())
        })
    }

    fn disable(&self, name: &str) -> Result<(), ModuleError> {
        self.with_entry(name, |entry, stats| {
            if entry.enabled {
                entry.enabled = false;
                stats.disables += 1;
            }
            Ok(())
        })
    }

    fn unload(&self, name: &str) -> Result<(), ModuleError> {
        self.with_entry(name, |entry, stats| {
            if !entry.loaded {
                return Err(ModuleError::NotLoaded(name.to_string()));
            }
            entry.loaded = false;
            entry.enabled = false;
            stats.unloads += 1;
            Ok(())
        })
    }

    fn find_match(&self, name: &str) -> bool {
        self.inner
            .read()
            .map(|inner| inner.modules.contains_key(name))
            .unwrap_or(false)
    }
}
