//! The seams between the filesystem and the driver world: the module
//! system that loads driver modules, and the capability interface every
//! driver module exposes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use enumset::{EnumSet, EnumSetType};

use crate::{ConfigDocument, DeviceNumber, DriverError, ModuleError, OpenOptionsConfig};

/// The optional functions a driver module may implement.
#[derive(EnumSetType, Debug, Hash)]
pub enum Capability {
    Create,
    Free,
    Open,
    Close,
    Read,
    Write,
    Flush,
    Stat,
}

impl Capability {
    /// Every capability, the set a complete driver reports.
    pub fn all() -> EnumSet<Self> {
        EnumSet::all()
    }
}

/// Size and mode bits a driver reports for one of its paths.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriverStat {
    pub size: u64,
    pub mode: u32,
}

/// Opaque per-open state handed out by a driver.
///
/// The filesystem never looks inside; the driver gets it back on every
/// call and downcasts it to whatever it put in.
pub struct DeviceHandle(Box<dyn Any + Send + Sync>);

impl DeviceHandle {
    pub fn new<T: Any + Send + Sync>(state: T) -> Self {
        Self(Box::new(state))
    }

    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.downcast_mut::<T>()
    }

    pub fn into_inner<T: 'static>(self) -> Result<T, Self> {
        self.0.downcast::<T>().map(|b| *b).map_err(Self)
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle").finish_non_exhaustive()
    }
}

/// The runtime context of one driver instance.
///
/// Only the functions listed in the owning module's
/// [`DriverModule::capabilities`] are ever called. Calls may come from
/// several open files at once, so implementations use interior mutability
/// for their state.
pub trait DriverContext: fmt::Debug + Send + Sync {
    /// Release the instance. Called exactly once, at teardown.
    fn free(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }

    fn open(&self, _options: &OpenOptionsConfig) -> Result<DeviceHandle, DriverError> {
        Err(DriverError::Unsupported)
    }

    fn close(&self, _handle: DeviceHandle) {}

    /// Returns the number of bytes read. Zero is a valid answer, e.g. when
    /// no data is currently available.
    fn read(&self, _handle: &mut DeviceHandle, _buf: &mut [u8]) -> usize {
        0
    }

    /// Returns the number of bytes the device accepted.
    fn write(&self, _handle: &mut DeviceHandle, _buf: &[u8]) -> usize {
        0
    }

    fn flush(&self, _handle: &mut DeviceHandle) -> Result<(), DriverError> {
        Ok(())
    }

    fn stat(&self, _path: &str) -> Result<DriverStat, DriverError> {
        Err(DriverError::Unsupported)
    }
}

/// What a successful `create` produces.
#[derive(Debug)]
pub struct DriverInstance {
    pub context: Box<dyn DriverContext>,
    pub device: DeviceNumber,
}

impl DriverInstance {
    pub fn new(context: impl DriverContext + 'static, device: DeviceNumber) -> Self {
        Self {
            context: Box::new(context),
            device,
        }
    }
}

/// A loaded driver module.
pub trait DriverModule: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> EnumSet<Capability>;

    /// Whether the module implements `capability`.
    fn implements(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Creates an instance from the full declaration document.
    fn create(&self, _config: &ConfigDocument) -> Result<DriverInstance, DriverError> {
        Err(DriverError::Unsupported)
    }
}

/// The module system driver modules are loaded from.
///
/// Other consumers may hold the same modules loaded and enabled, so callers
/// only undo what they did themselves.
pub trait ModuleSystem: fmt::Debug + Send + Sync {
    fn is_loaded(&self, name: &str) -> bool;

    fn is_enabled(&self, name: &str) -> bool;

    /// Loads a module, or returns it if it is already loaded.
    fn load_by_name(&self, name: &str) -> Result<Arc<dyn DriverModule>, ModuleError>;

    fn enable(&self, name: &str) -> Result<(), ModuleError>;

    fn disable(&self, name: &str) -> Result<(), ModuleError>;

    fn unload(&self, name: &str) -> Result<(), ModuleError>;

    /// Whether `name` resolves to a module that could be loaded.
    fn find_match(&self, name: &str) -> bool;
}
