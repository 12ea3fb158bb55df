//! Open files: a driver node bound to a device handle.

use std::fmt;
use std::io::{self, Read, Write};

use tracing::{debug, error, trace, warn};

use crate::{Capability, DeviceHandle, DriverNode, DriverRegistry, FsError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptionsConfig {
    read: bool,
    write: bool,
    append: bool,
    truncate: bool,
    create: bool,
}

impl OpenOptionsConfig {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            truncate: false,
            create: false,
        }
    }

    pub const fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            append: false,
            truncate: false,
            create: false,
        }
    }

    pub const fn read(&self) -> bool {
        self.read
    }

    pub const fn write(&self) -> bool {
        self.write
    }

    pub const fn append(&self) -> bool {
        self.append
    }

    pub const fn truncate(&self) -> bool {
        self.truncate
    }

    pub const fn create(&self) -> bool {
        self.create
    }
}

pub struct OpenOptions<'a> {
    registry: &'a DriverRegistry,
    conf: OpenOptionsConfig,
    attr: u32,
}

impl<'a> OpenOptions<'a> {
    pub fn new(registry: &'a DriverRegistry) -> Self {
        Self {
            registry,
            conf: OpenOptionsConfig::default(),
            attr: 0,
        }
    }

    pub fn options(&mut self, options: OpenOptionsConfig) -> &mut Self {
        self.conf = options;
        self
    }

    pub fn read(&mut self, read: bool) -> &mut Self {
        self.conf.read = read;
        self
    }

    pub fn write(&mut self, write: bool) -> &mut Self {
        self.conf.write = write;
        self
    }

    pub fn append(&mut self, append: bool) -> &mut Self {
        self.conf.append = append;
        self
    }

    pub fn truncate(&mut self, truncate: bool) -> &mut Self {
        self.conf.truncate = truncate;
        self
    }

    /// Devices cannot be created, the flag is only passed on to the driver.
    pub fn create(&mut self, create: bool) -> &mut Self {
        self.conf.create = create;
        self
    }

    /// Attribute bits recorded on the handle.
    pub fn attr(&mut self, attr: u32) -> &mut Self {
        self.attr = attr;
        self
    }

    pub fn open(&self, path: &str) -> Result<FileHandle<'a>> {
        FileHandle::open(self.registry, path, self.conf.clone(), self.attr)
    }
}

impl fmt::Debug for OpenOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("conf", &self.conf)
            .field("attr", &self.attr)
            .finish_non_exhaustive()
    }
}

/// An open device.
///
/// The handle borrows the node it was opened on, so it can never outlive
/// the registry. Dropping it closes the device.
pub struct FileHandle<'a> {
    node: &'a DriverNode,
    handle: Option<DeviceHandle>,
    options: OpenOptionsConfig,
    attr: u32,
}

impl<'a> FileHandle<'a> {
    pub(crate) fn open(
        registry: &'a DriverRegistry,
        path: &str,
        options: OpenOptionsConfig,
        attr: u32,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(FsError::InvalidInput);
        }
        let node = registry.find_by_path(path).ok_or(FsError::EntryNotFound)?;
        if !node.implements(Capability::Open) {
            debug!(path = %node.path(), "driver does not implement open");
            return Err(FsError::EntryNotFound);
        }

        let handle = node.context().open(&options).map_err(|e| {
            warn!(path = %node.path(), error = %e, "driver refused to open device");
            FsError::DriverFailure
        })?;

        trace!(path = %node.path(), ?options, "opened device");
        Ok(Self {
            node,
            handle: Some(handle),
            options,
            attr,
        })
    }

    /// Canonical path of the opened device.
    pub fn path(&self) -> &str {
        self.node.path()
    }

    pub fn options(&self) -> &OpenOptionsConfig {
        &self.options
    }

    pub fn attr(&self) -> u32 {
        self.attr
    }

    fn device(&mut self, capability: Capability) -> Result<&mut DeviceHandle> {
        if !self.node.implements(capability) {
            return Err(FsError::EntryNotFound);
        }
        self.handle.as_mut().ok_or(FsError::InvalidContext)
    }

    /// Reads what the device has to offer. `Ok(0)` means nothing is
    /// available right now, not end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(FsError::InvalidInput);
        }
        let node = self.node;
        let handle = self.device(Capability::Read)?;
        Ok(node.context().read(handle, buf))
    }

    /// Returns how many bytes the device accepted, which may be zero.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(FsError::InvalidInput);
        }
        let node = self.node;
        let handle = self.device(Capability::Write)?;
        Ok(node.context().write(handle, buf))
    }

    /// Flushes the device. Drivers without a flush have nothing to flush.
    pub fn flush(&mut self) -> Result<()> {
        let node = self.node;
        if !node.implements(Capability::Flush) {
            return Ok(());
        }
        let handle = self.device(Capability::Flush)?;
        node.context().flush(handle).map_err(|e| {
            error!(path = %node.path(), error = %e, "driver flush failed");
            FsError::DriverFailure
        })
    }

    pub fn sync(&mut self) -> Result<()> {
        self.flush()
    }

    pub fn seek(&mut self, _pos: io::SeekFrom) -> Result<u64> {
        Err(FsError::Unsupported)
    }

    pub fn tell(&self) -> Result<u64> {
        Err(FsError::Unsupported)
    }

    /// Devices are streams, they never reach an end.
    pub fn eof(&self) -> bool {
        false
    }

    /// Size reported by the driver's stat, or `None` if the driver cannot
    /// tell.
    pub fn size(&self) -> Result<Option<u64>> {
        Ok(self.node.stat(self.node.path())?.map(|stat| stat.size))
    }

    /// Reads a single byte. `Ok(None)` when the device had nothing to give.
    pub fn getc(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    pub fn putc(&mut self, byte: u8) -> Result<()> {
        match self.write(&[byte])? {
            0 => Err(FsError::DriverFailure),
            _ => Ok(()),
        }
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.node.implements(Capability::Close) {
            self.node.context().close(handle);
        }
        trace!(path = %self.node.path(), "closed device");
    }
}

impl Drop for FileHandle<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FileHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.node.path())
            .field("options", &self.options)
            .field("attr", &self.attr)
            .field("open", &self.handle.is_some())
            .finish()
    }
}

impl Read for FileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        FileHandle::read(self, buf).map_err(Into::into)
    }
}

impl Write for FileHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        FileHandle::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        FileHandle::flush(self).map_err(Into::into)
    }
}
