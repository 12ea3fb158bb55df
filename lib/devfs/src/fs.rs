//! The mounted filesystem context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::dir::{DirectoryIterator, FileType, Metadata, ReadDir};
use crate::path::DEFAULT_MAX_PATH_LEN;
use crate::walker::ConfigWalker;
use crate::{
    DriverRegistry, FileHandle, FileSystem, FsError, ModuleSystem, OpenOptions, OpenOptionsConfig,
    Result,
};

/// Options fixed at mount time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    max_path_len: usize,
}

impl MountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest path a driver instance may be placed at. Declarations that
    /// would land on a longer path are skipped; the location of the
    /// declaration files themselves is not limited.
    pub fn max_path_len(mut self, max_path_len: usize) -> Self {
        self.max_path_len = max_path_len;
        self
    }

    pub fn get_max_path_len(&self) -> usize {
        self.max_path_len
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            max_path_len: DEFAULT_MAX_PATH_LEN,
        }
    }
}

#[derive(Debug)]
struct Mounted {
    config_root: PathBuf,
    registry: DriverRegistry,
    modules: Arc<dyn ModuleSystem>,
    options: MountOptions,
}

/// Driver instances declared under a configuration directory, exposed as
/// a filesystem.
///
/// Open files and directory listings borrow the context, so it can only be
/// unmounted once all of them are gone. Dropping a mounted context unmounts
/// it.
#[derive(Debug)]
pub struct DevFs {
    mounted: Option<Mounted>,
}

impl DevFs {
    pub fn mount(config_root: impl AsRef<Path>, modules: Arc<dyn ModuleSystem>) -> Result<Self> {
        Self::mount_with_options(config_root.as_ref(), modules, MountOptions::default())
    }

    /// Configures every driver declared under `config_root`.
    ///
    /// Declarations that fail are logged and skipped; only an empty path or
    /// an unreadable root directory fail the mount.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %config_root.display()), err)]
    pub fn mount_with_options(
        config_root: &Path,
        modules: Arc<dyn ModuleSystem>,
        options: MountOptions,
    ) -> Result<Self> {
        if config_root.as_os_str().is_empty() {
            return Err(FsError::InvalidInput);
        }

        let mut registry = DriverRegistry::new();
        let walker = ConfigWalker::new(modules.as_ref(), options.max_path_len);
        if let Err(e) = walker.configure_drivers(&mut registry, None, config_root) {
            registry.clear_and_teardown(modules.as_ref());
            return Err(e);
        }

        info!(drivers = registry.len(), "mounted device filesystem");
        Ok(Self {
            mounted: Some(Mounted {
                config_root: config_root.to_path_buf(),
                registry,
                modules,
                options,
            }),
        })
    }

    /// Whether the context is still mounted.
    pub fn is_valid(&self) -> bool {
        self.mounted.is_some()
    }

    /// Tears down every driver instance, last configured first.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub fn unmount(&mut self) -> Result<()> {
        let mut mounted = self.mounted.take().ok_or(FsError::InvalidContext)?;
        let failures = mounted
            .registry
            .clear_and_teardown(mounted.modules.as_ref());
        if failures > 0 {
            warn!(failures, root = %mounted.config_root.display(), "unmounted with teardown failures");
        } else {
            info!(root = %mounted.config_root.display(), "unmounted device filesystem");
        }
        Ok(())
    }

    fn mounted(&self) -> Result<&Mounted> {
        self.mounted.as_ref().ok_or(FsError::InvalidContext)
    }

    pub fn config_root(&self) -> Result<&Path> {
        Ok(&self.mounted()?.config_root)
    }

    pub fn options(&self) -> Result<&MountOptions> {
        Ok(&self.mounted()?.options)
    }

    pub fn registry(&self) -> Result<&DriverRegistry> {
        Ok(&self.mounted()?.registry)
    }

    pub fn new_open_options(&self) -> Result<OpenOptions<'_>> {
        Ok(OpenOptions::new(self.registry()?))
    }

    pub fn open(&self, path: &str, options: OpenOptionsConfig) -> Result<FileHandle<'_>> {
        self.new_open_options()?.options(options).open(path)
    }

    pub fn opendir(&self, path: &str) -> Result<DirectoryIterator<'_>> {
        DirectoryIterator::open(self.registry()?, path)
    }

    /// Whether `path` is the root or a grouping directory.
    pub fn dir_exists(&self, path: &str) -> Result<bool> {
        Ok(self.registry()?.is_directory(path))
    }

    pub fn stat(&self, path: &str) -> Result<Metadata> {
        let registry = self.registry()?;
        let Some(node) = registry.find_by_path(path) else {
            if registry.is_directory(path) {
                return Ok(Metadata::directory());
            }
            return Err(FsError::EntryNotFound);
        };
        let stat = node.stat(node.path())?.unwrap_or_default();
        Ok(Metadata {
            ft: FileType::device(),
            len: stat.size,
            mode: stat.mode,
        })
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.unsupported(path)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.unsupported(from)?;
        self.unsupported(to)
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.unsupported(path)
    }

    fn unsupported(&self, path: &str) -> Result<()> {
        self.mounted()?;
        if path.is_empty() {
            return Err(FsError::InvalidInput);
        }
        Err(FsError::Unsupported)
    }
}

impl Drop for DevFs {
    fn drop(&mut self) {
        if self.is_valid() {
            if let Err(e) = self.unmount() {
                error!(error = %e, "unable to unmount device filesystem");
            }
        }
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or(FsError::InvalidInput)
}

impl FileSystem for DevFs {
    fn read_dir(&self, path: &Path) -> Result<ReadDir> {
        let mut entries = Vec::new();
        for entry in self.opendir(path_str(path)?)? {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(dir = %path.display(), error = %e, "skipping unreadable entry"),
            }
        }
        Ok(ReadDir::new(entries))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        self.mkdir(path_str(path)?)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.unlink(path_str(path)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        DevFs::rename(self, path_str(from)?, path_str(to)?)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata> {
        self.stat(path_str(path)?)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.unlink(path_str(path)?)
    }
}
