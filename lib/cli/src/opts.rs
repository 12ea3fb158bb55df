use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use devfs::builtin::{self, MemoryDriver, NullDriver, ZeroDriver};
use devfs::{DevFs, MountOptions, StaticModuleSystem};

/// Where the driver declarations live and which drivers back them.
#[derive(Debug, Clone, clap::Parser)]
pub struct MountOpts {
    /// The configuration directory to mount
    #[clap(long, short = 'c', env = "DEVFS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Longest path a driver instance may be placed at
    #[clap(long, global = true)]
    max_path_len: Option<usize>,

    /// Make a built-in driver available under another module name, e.g.
    /// `dmuart=memory`
    #[clap(long = "module", short = 'm', value_parser = parse_module_alias, global = true)]
    modules: Vec<ModuleAlias>,
}

/// A built-in driver registered under a custom module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAlias {
    name: String,
    driver: BuiltinDriver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinDriver {
    Null,
    Zero,
    Memory,
}

fn parse_module_alias(raw: &str) -> Result<ModuleAlias> {
    let (name, driver) = raw
        .split_once('=')
        .context("expected `<module>=<driver>`")?;
    if name.is_empty() {
        bail!("the module name must not be empty");
    }
    let driver = match driver {
        "null" => BuiltinDriver::Null,
        "zero" => BuiltinDriver::Zero,
        "memory" => BuiltinDriver::Memory,
        other => bail!("unknown built-in driver `{other}` (expected null, zero or memory)"),
    };
    Ok(ModuleAlias {
        name: name.to_string(),
        driver,
    })
}

impl MountOpts {
    /// The module system the CLI mounts with: every built-in driver under
    /// its own name, plus the requested aliases.
    pub fn modules(&self) -> StaticModuleSystem {
        let modules = StaticModuleSystem::new();
        builtin::register_all(&modules);
        for alias in &self.modules {
            match alias.driver {
                BuiltinDriver::Null => modules.register(NullDriver::named(alias.name.as_str())),
                BuiltinDriver::Zero => modules.register(ZeroDriver::named(alias.name.as_str())),
                BuiltinDriver::Memory => modules.register(MemoryDriver::named(alias.name.as_str())),
            };
        }
        modules
    }

    pub fn mount(&self) -> Result<DevFs> {
        let Some(config) = &self.config else {
            bail!("no configuration directory given, pass --config or set DEVFS_CONFIG");
        };

        let mut options = MountOptions::new();
        if let Some(max_path_len) = self.max_path_len {
            options = options.max_path_len(max_path_len);
        }

        let modules = self.modules();
        tracing::debug!(modules = ?modules.module_names(), "available driver modules");
        DevFs::mount_with_options(config, Arc::new(modules), options)
            .with_context(|| format!("unable to mount \"{}\"", config.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devfs::ModuleSystem;

    #[test]
    fn parse_aliases() {
        assert_eq!(
            parse_module_alias("dmuart=memory").unwrap(),
            ModuleAlias {
                name: "dmuart".to_string(),
                driver: BuiltinDriver::Memory,
            }
        );
        assert!(parse_module_alias("dmuart").is_err());
        assert!(parse_module_alias("=null").is_err());
        assert!(parse_module_alias("dmuart=uart").is_err());
    }

    #[test]
    fn aliases_are_registered() {
        let opts = MountOpts {
            config: None,
            max_path_len: None,
            modules: vec![parse_module_alias("dmclk=null").unwrap()],
        };
        let modules = opts.modules();
        for name in ["null", "zero", "memory", "dmclk"] {
            assert!(modules.find_match(name), "{name}");
        }
        assert_eq!(modules.module_names(), ["null", "zero", "memory", "dmclk"]);
        assert!(opts.mount().is_err());
    }
}
