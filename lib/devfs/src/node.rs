use std::fmt;
use std::sync::Arc;

#[allow(unused_imports, dead_code)]
use tracing::{debug, error, info, trace, warn};

use crate::error::ConfigureError;
use crate::path::{node_path, parent_directory};
use crate::{
    Capability, ConfigDocument, DeviceNumber, DriverContext, DriverError, DriverModule,
    DriverStat, FsError, ModuleError, ModuleSystem, Result,
};

/// What the module system looked like before a node asked for its module.
///
/// Captured once when the node is created and consumed once when it is torn
/// down, so that teardown only undoes the load and enable it performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleAcquisition {
    pub was_loaded: bool,
    pub was_enabled: bool,
}

impl ModuleAcquisition {
    /// Loads the module if needed and enables it if needed.
    pub(crate) fn acquire(
        modules: &dyn ModuleSystem,
        name: &str,
    ) -> std::result::Result<(Arc<dyn DriverModule>, Self), ModuleError> {
        let acquisition = Self {
            was_loaded: modules.is_loaded(name),
            was_enabled: modules.is_enabled(name),
        };

        let module = modules.load_by_name(name)?;
        if !acquisition.was_enabled {
            if let Err(e) = modules.enable(name) {
                if !acquisition.was_loaded {
                    if let Err(unload) = modules.unload(name) {
                        warn!(module = %name, error = %unload, "unable to unload module after enable failure");
                    }
                }
                return Err(match e {
                    ModuleError::Lock => ModuleError::Lock,
                    _ => ModuleError::EnableFailed(name.to_string()),
                });
            }
        }

        info!(
            module = %name,
            was_loaded = acquisition.was_loaded,
            was_enabled = acquisition.was_enabled,
            "prepared driver module"
        );
        Ok((module, acquisition))
    }

    /// Reverses [`ModuleAcquisition::acquire`]. Failures are logged, never
    /// propagated, so that teardown always runs to the end.
    pub(crate) fn release(self, modules: &dyn ModuleSystem, name: &str) -> bool {
        let mut clean = true;
        if !self.was_enabled {
            if let Err(e) = modules.disable(name) {
                error!(module = %name, error = %e, "unable to disable driver module");
                clean = false;
            }
        }
        if !self.was_loaded {
            if let Err(e) = modules.unload(name) {
                error!(module = %name, error = %e, "unable to unload driver module");
                clean = false;
            }
        }
        clean
    }
}

/// One configured driver instance.
pub struct DriverNode {
    driver_name: String,
    device: DeviceNumber,
    context: Box<dyn DriverContext>,
    module: Arc<dyn DriverModule>,
    acquisition: ModuleAcquisition,
    path: String,
}

impl DriverNode {
    /// Loads `name`, creates an instance from `config` and places it in the
    /// namespace. Every step that fails undoes the ones before it.
    pub(crate) fn configure(
        modules: &dyn ModuleSystem,
        name: &str,
        config: &ConfigDocument,
        max_path_len: usize,
    ) -> std::result::Result<Self, ConfigureError> {
        debug!(driver = %name, "configuring driver");
        let (module, acquisition) = ModuleAcquisition::acquire(modules, name)?;

        if !module.implements(Capability::Create) {
            acquisition.release(modules, name);
            return Err(ConfigureError::MissingCreate(name.to_string()));
        }

        let instance = match module.create(config) {
            Ok(instance) => instance,
            Err(error) => {
                acquisition.release(modules, name);
                return Err(ConfigureError::Create {
                    name: name.to_string(),
                    error,
                });
            }
        };

        let driver_name = module.name().to_string();
        let path = match node_path(&driver_name, instance.device, max_path_len) {
            Ok(path) => path,
            Err(error) => {
                if module.implements(Capability::Free) {
                    if let Err(e) = instance.context.free() {
                        warn!(driver = %name, error = %e, "driver failed to free an unplaced instance");
                    }
                }
                acquisition.release(modules, name);
                return Err(ConfigureError::Path {
                    name: name.to_string(),
                    error,
                });
            }
        };

        info!(driver = %driver_name, path = %path, device = %instance.device, "configured driver");
        Ok(Self {
            driver_name,
            device: instance.device,
            context: instance.context,
            module,
            acquisition,
            path,
        })
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn device(&self) -> DeviceNumber {
        self.device
    }

    /// The canonical path, without a leading `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The directory this node is listed in, derived from the driver name
    /// and device number each time.
    pub fn parent_directory(&self) -> String {
        parent_directory(&self.driver_name, self.device)
    }

    pub fn module(&self) -> &Arc<dyn DriverModule> {
        &self.module
    }

    pub fn implements(&self, capability: Capability) -> bool {
        self.module.implements(capability)
    }

    pub fn acquisition(&self) -> ModuleAcquisition {
        self.acquisition
    }

    pub(crate) fn context(&self) -> &dyn DriverContext {
        self.context.as_ref()
    }

    /// Asks the driver about `path`. Absence of the stat capability is
    /// reported as `Ok(None)`.
    pub(crate) fn stat(&self, path: &str) -> Result<Option<DriverStat>> {
        if !self.implements(Capability::Stat) {
            trace!(driver = %self.driver_name, "driver does not implement stat");
            return Ok(None);
        }
        match self.context.stat(path) {
            Ok(stat) => Ok(Some(stat)),
            Err(DriverError::Unsupported) => Ok(None),
            Err(e) => {
                error!(driver = %self.driver_name, path = %path, error = %e, "driver stat failed");
                Err(FsError::DriverFailure)
            }
        }
    }

    /// Frees the runtime context and gives the module back. Returns whether
    /// every step succeeded; failures are logged.
    pub(crate) fn teardown(self, modules: &dyn ModuleSystem) -> bool {
        let Self {
            driver_name,
            context,
            module,
            acquisition,
            path,
            ..
        } = self;

        let mut clean = true;
        if module.implements(Capability::Free) {
            match context.free() {
                Ok(()) => debug!(driver = %driver_name, path = %path, "freed driver context"),
                Err(e) => {
                    error!(driver = %driver_name, path = %path, error = %e, "driver failed to free its context");
                    clean = false;
                }
            }
        } else {
            drop(context);
        }

        clean &= acquisition.release(modules, module.name());
        clean
    }
}

impl fmt::Debug for DriverNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverNode")
            .field("driver_name", &self.driver_name)
            .field("device", &self.device)
            .field("path", &self.path)
            .field("acquisition", &self.acquisition)
            .finish_non_exhaustive()
    }
}
