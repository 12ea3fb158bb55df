//! Discovery of driver declarations in a configuration directory tree.
//!
//! Every regular file is a declaration of one driver instance. A
//! subdirectory named after a driver module makes that module the default
//! for the declarations below it, so `dmuart/0.ini` and `dmuart/1.ini`
//! both configure `dmuart` instances.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::config::strip_config_extension;
use crate::error::ConfigureError;
use crate::{ConfigDocument, DriverNode, DriverRegistry, FsError, ModuleSystem, Result};

pub(crate) struct ConfigWalker<'a> {
    modules: &'a dyn ModuleSystem,
    max_path_len: usize,
}

impl<'a> ConfigWalker<'a> {
    pub(crate) fn new(modules: &'a dyn ModuleSystem, max_path_len: usize) -> Self {
        Self {
            modules,
            max_path_len,
        }
    }

    /// Walks `dir` depth-first and appends a node for every declaration that
    /// configures successfully. Only a failure to read `dir` itself is an
    /// error; everything below it is logged and skipped.
    pub(crate) fn configure_drivers(
        &self,
        registry: &mut DriverRegistry,
        default_driver: Option<&str>,
        dir: &Path,
    ) -> Result<()> {
        let entries = read_sorted_dir(dir).map_err(|e| {
            error!(dir = %dir.display(), error = %e, "unable to open config directory");
            FsError::from(e)
        })?;

        for path in entries {
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unable to inspect config entry, skipping");
                    continue;
                }
            };

            if metadata.is_dir() {
                let default = self.directory_default(&path).or(default_driver);
                if let Err(e) = self.configure_drivers(registry, default, &path) {
                    error!(dir = %path.display(), error = %e, "unable to configure drivers in directory");
                }
                continue;
            }

            match self.configure_entry(registry, &path, default_driver) {
                Ok(node) => registry.append(node),
                Err(e) => {
                    error!(path = %path.display(), error = %e, cause = ?std::error::Error::source(&e), "skipping driver declaration");
                }
            }
        }

        Ok(())
    }

    fn configure_entry(
        &self,
        registry: &DriverRegistry,
        path: &Path,
        default_driver: Option<&str>,
    ) -> std::result::Result<DriverNode, ConfigureError> {
        let config = ConfigDocument::from_path(path)?;
        let name = self.resolve_driver_name(&config, path, default_driver);
        let node = DriverNode::configure(self.modules, &name, &config, self.max_path_len)?;

        if registry.find_by_path(node.path()).is_some() {
            let duplicate = node.path().to_string();
            node.teardown(self.modules);
            return Err(ConfigureError::Duplicate(duplicate));
        }
        if let Some(existing) = registry.find_shadowing(&node) {
            let existing = existing.path().to_string();
            let path = node.path().to_string();
            node.teardown(self.modules);
            return Err(ConfigureError::Shadowed { path, existing });
        }
        Ok(node)
    }

    /// Picks the driver for a declaration: an explicit `driver_name`, then
    /// the file name without its extension when it names a module (or when
    /// nothing was inherited), then the inherited directory default.
    pub(crate) fn resolve_driver_name(
        &self,
        config: &ConfigDocument,
        path: &Path,
        default_driver: Option<&str>,
    ) -> String {
        if let Some(name) = config.driver_name() {
            return name.to_string();
        }

        let from_file = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(strip_config_extension)
            .filter(|name| !name.is_empty());

        match (from_file, default_driver) {
            (Some(name), Some(_)) if self.modules.find_match(name) => name.to_string(),
            (_, Some(default)) => default.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        }
    }

    fn directory_default<'p>(&self, dir: &'p Path) -> Option<&'p str> {
        dir.file_name()
            .and_then(|name| name.to_str())
            .filter(|name| self.modules.find_match(name))
    }
}

/// Entries of `dir` ordered by file name, so discovery order does not
/// depend on the host filesystem.
fn read_sorted_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticModuleSystem;
    use crate::builtin::{MemoryDriver, NullDriver};
    use crate::path::DEFAULT_MAX_PATH_LEN;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn modules() -> StaticModuleSystem {
        let modules = StaticModuleSystem::new();
        modules
            .register(NullDriver::named("dmclk"))
            .register(MemoryDriver::named("dmuart"))
            .register(NullDriver::named("mydrv"));
        modules
    }

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn paths(registry: &DriverRegistry) -> Vec<&str> {
        registry.iter().map(DriverNode::path).collect()
    }

    #[test]
    fn test_resolve_driver_name_priority() {
        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let explicit = ConfigDocument::new().with("main", "driver_name", "dmclk");
        let implicit = ConfigDocument::new();

        assert_eq!(
            walker.resolve_driver_name(&explicit, Path::new("cfg/mydrv.ini"), Some("dmuart")),
            "dmclk"
        );
        assert_eq!(
            walker.resolve_driver_name(&implicit, Path::new("cfg/mydrv.ini"), None),
            "mydrv"
        );
        assert_eq!(
            walker.resolve_driver_name(&implicit, Path::new("cfg/mydrv.ini"), Some("dmuart")),
            "mydrv"
        );
        assert_eq!(
            walker.resolve_driver_name(&implicit, Path::new("cfg/dmuart/0.ini"), Some("dmuart")),
            "dmuart"
        );
        assert_eq!(
            walker.resolve_driver_name(&implicit, Path::new("cfg/unknown.ini"), None),
            "unknown"
        );
    }

    #[test]
    fn test_directory_default_is_scoped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "dmuart/0.ini", "major=0\nminor=0\n");
        write(temp.path(), "dmuart/1.ini", "major=0\nminor=1\n");
        write(temp.path(), "zz.ini", "[main]\nmajor=3\n");

        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let mut registry = DriverRegistry::new();
        walker
            .configure_drivers(&mut registry, None, temp.path())
            .unwrap();

        // `zz` is no module and the `dmuart` default must not leak out of
        // its directory.
        assert_eq!(paths(&registry), ["dmuart0/0", "dmuart0/1"]);
        registry.clear_and_teardown(&modules);
    }

    #[test]
    fn test_nested_directories_inherit() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "dmclk/board/a.ini", "minor=0\n");
        write(temp.path(), "dmclk/board/b.toml", "[main]\nminor = 1\n");

        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let mut registry = DriverRegistry::new();
        walker
            .configure_drivers(&mut registry, None, temp.path())
            .unwrap();

        assert_eq!(paths(&registry), ["dmclkx/0", "dmclkx/1"]);
        registry.clear_and_teardown(&modules);
    }

    #[test]
    #[traced_test]
    fn test_bad_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a_broken.ini", "[main\n");
        write(temp.path(), "b_unknown.ini", "[main]\n");
        write(temp.path(), "c.ini", "[main]\ndriver_name=dmuart\nsize=0\n");
        write(temp.path(), "dmclk.ini", "");
        write(temp.path(), "e.ini", "[main]\ndriver_name=dmclk\n");
        write(temp.path(), "mydrv.ini", "[main]\nmajor=1\n");

        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let mut registry = DriverRegistry::new();
        walker
            .configure_drivers(&mut registry, None, temp.path())
            .unwrap();

        assert_eq!(paths(&registry), ["dmclk", "mydrv1"]);
        assert!(logs_contain("skipping driver declaration"));
        assert!(logs_contain("already registered"));
        // The rejected duplicate must not have unloaded the module the
        // first `dmclk` node holds.
        assert!(modules.is_loaded("dmclk"));
        assert!(!modules.is_loaded("dmuart"));
        registry.clear_and_teardown(&modules);
        assert!(!modules.is_loaded("dmclk"));
    }

    #[test]
    #[traced_test]
    fn test_device_and_group_of_the_same_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ini", "[main]\ndriver_name=dmuart\nmajor=0\n");
        write(temp.path(), "b.ini", "[main]\ndriver_name=dmuart\nmajor=0\nminor=1\n");
        write(temp.path(), "c.ini", "[main]\ndriver_name=dmclk\nmajor=0\nminor=0\n");
        write(temp.path(), "d.ini", "[main]\ndriver_name=dmclk\nmajor=0\n");

        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let mut registry = DriverRegistry::new();
        walker
            .configure_drivers(&mut registry, None, temp.path())
            .unwrap();

        // The first declaration wins either way round.
        assert_eq!(paths(&registry), ["dmuart0", "dmclk0/0"]);
        assert!(logs_contain("clashes with"));
        registry.clear_and_teardown(&modules);
    }

    #[test]
    fn test_deep_config_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a".repeat(40)).join("b".repeat(40));
        write(&root, "dmclk.ini", "");
        write(&root, "dmuart/0.ini", "major=0\nminor=0\n");
        assert!(root.join("dmuart/0.ini").as_os_str().len() > DEFAULT_MAX_PATH_LEN);

        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let mut registry = DriverRegistry::new();
        walker.configure_drivers(&mut registry, None, &root).unwrap();

        assert_eq!(paths(&registry), ["dmclk", "dmuart0/0"]);
        registry.clear_and_teardown(&modules);
    }

    #[test]
    fn test_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let modules = modules();
        let walker = ConfigWalker::new(&modules, DEFAULT_MAX_PATH_LEN);
        let mut registry = DriverRegistry::new();
        assert_eq!(
            walker.configure_drivers(&mut registry, None, &temp.path().join("missing")),
            Err(FsError::EntryNotFound)
        );
    }
}
