//! A filesystem whose files are driver instances.
//!
//! Driver instances are declared by configuration documents in a directory
//! tree. Mounting a [`DevFs`] walks that tree, loads the driver module
//! behind every declaration through a [`ModuleSystem`], and places each
//! instance at a path derived from its driver name and [`DeviceNumber`]:
//!
//! ```text
//! /dmclk        no device number
//! /dmspi0       major number only
//! /dmclkx/0     minor number only
//! /dmuart0/1    major and minor number
//! ```
//!
//! Opening a path opens the device; reads and writes go straight to the
//! driver.

use std::path::Path;

pub mod builtin;
mod config;
mod dir;
mod error;
mod file;
mod fs;
mod module;
mod node;
pub mod path;
mod registry;
mod static_modules;
mod walker;

pub use config::{CONFIG_EXTENSIONS, ConfigDocument, DRIVER_NAME_KEY, MAIN_SECTION};
pub use dir::{DIRECTORY_MODE, DirEntry, DirectoryIterator, FileType, Metadata, ReadDir};
pub use error::{ConfigError, DriverError, ErrorCode, FsError, ModuleError};
pub use file::{FileHandle, OpenOptions, OpenOptionsConfig};
pub use fs::{DevFs, MountOptions};
pub use module::{
    Capability, DeviceHandle, DriverContext, DriverInstance, DriverModule, DriverStat,
    ModuleSystem,
};
pub use node::{DriverNode, ModuleAcquisition};
pub use path::DeviceNumber;
pub use registry::DriverRegistry;
pub use static_modules::{ModuleStats, StaticModuleSystem};

pub type Result<T, E = FsError> = std::result::Result<T, E>;

/// The path-based surface a virtual-filesystem layer drives.
pub trait FileSystem: std::fmt::Debug {
    fn read_dir(&self, path: &Path) -> Result<ReadDir>;
    fn create_dir(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn metadata(&self, path: &Path) -> Result<Metadata>;
    fn remove_file(&self, path: &Path) -> Result<()>;
}
