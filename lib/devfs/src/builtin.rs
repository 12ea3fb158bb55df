//! Reference drivers that need no hardware.
//!
//! All of them take their device number from the optional `major` and
//! `minor` keys of the `main` section. A driver can be registered under a
//! different module name with `named`, which is how one implementation
//! backs several namespaces.

use std::collections::VecDeque;
use std::sync::Mutex;

use enumset::EnumSet;
use tracing::debug;

use crate::config::MAIN_SECTION;
use crate::{
    Capability, ConfigDocument, DeviceHandle, DeviceNumber, DriverContext, DriverError,
    DriverInstance, DriverModule, DriverStat, OpenOptionsConfig, StaticModuleSystem,
};

/// Mode bits reported for a readable and writable device.
pub const MODE_READ_WRITE: u32 = 0o666;
/// Mode bits reported for a read-only device.
pub const MODE_READ_ONLY: u32 = 0o444;

/// Default capacity of a [`MemoryDriver`] instance, in bytes.
pub const DEFAULT_MEMORY_SIZE: usize = 4096;

/// Registers [`NullDriver`], [`ZeroDriver`] and [`MemoryDriver`] under their
/// default names.
pub fn register_all(modules: &StaticModuleSystem) {
    modules
        .register(NullDriver::new())
        .register(ZeroDriver::new())
        .register(MemoryDriver::new());
}

/// Reads the device number keys of a declaration.
pub fn device_number(config: &ConfigDocument) -> Result<DeviceNumber, DriverError> {
    Ok(DeviceNumber {
        major: config.get_parsed(MAIN_SECTION, "major")?,
        minor: config.get_parsed(MAIN_SECTION, "minor")?,
    })
}

/// Reads nothing, accepts every write.
#[derive(Debug, Clone)]
pub struct NullDriver {
    name: String,
}

impl NullDriver {
    pub fn new() -> Self {
        Self::named("null")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverModule for NullDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> EnumSet<Capability> {
        Capability::Create
            | Capability::Open
            | Capability::Close
            | Capability::Read
            | Capability::Write
            | Capability::Stat
    }

    fn create(&self, config: &ConfigDocument) -> Result<DriverInstance, DriverError> {
        Ok(DriverInstance::new(NullContext, device_number(config)?))
    }
}

#[derive(Debug)]
struct NullContext;

impl DriverContext for NullContext {
    fn open(&self, _options: &OpenOptionsConfig) -> Result<DeviceHandle, DriverError> {
        Ok(DeviceHandle::new(()))
    }

    fn read(&self, _handle: &mut DeviceHandle, _buf: &mut [u8]) -> usize {
        0
    }

    fn write(&self, _handle: &mut DeviceHandle, buf: &[u8]) -> usize {
        buf.len()
    }

    fn stat(&self, _path: &str) -> Result<DriverStat, DriverError> {
        Ok(DriverStat {
            size: 0,
            mode: MODE_READ_WRITE,
        })
    }
}

/// Fills every read with zeros. Has no write capability.
#[derive(Debug, Clone)]
pub struct ZeroDriver {
    name: String,
}

impl ZeroDriver {
    pub fn new() -> Self {
        Self::named("zero")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ZeroDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverModule for ZeroDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> EnumSet<Capability> {
        Capability::Create | Capability::Open | Capability::Read | Capability::Stat
    }

    fn create(&self, config: &ConfigDocument) -> Result<DriverInstance, DriverError> {
        Ok(DriverInstance::new(ZeroContext, device_number(config)?))
    }
}

#[derive(Debug)]
struct ZeroContext;

impl DriverContext for ZeroContext {
    fn open(&self, options: &OpenOptionsConfig) -> Result<DeviceHandle, DriverError> {
        if options.write() {
            return Err(DriverError::Device("zero device is read-only".to_string()));
        }
        Ok(DeviceHandle::new(()))
    }

    fn read(&self, _handle: &mut DeviceHandle, buf: &mut [u8]) -> usize {
        buf.fill(0);
        buf.len()
    }

    fn stat(&self, _path: &str) -> Result<DriverStat, DriverError> {
        Ok(DriverStat {
            size: 0,
            mode: MODE_READ_ONLY,
        })
    }
}

/// A bounded FIFO: writes append, reads drain.
///
/// The capacity comes from the `size` key of the `main` section.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    name: String,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverModule for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> EnumSet<Capability> {
        Capability::all()
    }

    fn create(&self, config: &ConfigDocument) -> Result<DriverInstance, DriverError> {
        let capacity = config
            .get_parsed(MAIN_SECTION, "size")?
            .unwrap_or(DEFAULT_MEMORY_SIZE);
        if capacity == 0 {
            return Err(DriverError::InvalidConfig(
                "memory size must not be zero".to_string(),
            ));
        }
        let device = device_number(config)?;
        debug!(driver = %self.name, capacity, %device, "created memory instance");

        Ok(DriverInstance::new(
            MemoryContext {
                capacity,
                buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            },
            device,
        ))
    }
}

#[derive(Debug)]
struct MemoryContext {
    capacity: usize,
    buffer: Mutex<VecDeque<u8>>,
}

impl DriverContext for MemoryContext {
    fn free(self: Box<Self>) -> Result<(), DriverError> {
        let pending = self.buffer.lock().map(|b| b.len()).unwrap_or_default();
        if pending > 0 {
            debug!(pending, "dropping unread memory device contents");
        }
        Ok(())
    }

    fn open(&self, _options: &OpenOptionsConfig) -> Result<DeviceHandle, DriverError> {
        Ok(DeviceHandle::new(()))
    }

    fn read(&self, _handle: &mut DeviceHandle, buf: &mut [u8]) -> usize {
        let Ok(mut buffer) = self.buffer.lock() else {
            return 0;
        };
        let count = buf.len().min(buffer.len());
        for (dst, src) in buf.iter_mut().zip(buffer.drain(..count)) {
            *dst = src;
        }
        count
    }

    fn write(&self, _handle: &mut DeviceHandle, buf: &[u8]) -> usize {
        let Ok(mut buffer) = self.buffer.lock() else {
            return 0;
        };
        let count = buf.len().min(self.capacity - buffer.len());
        buffer.extend(&buf[..count]);
        count
    }

    fn flush(&self, _handle: &mut DeviceHandle) -> Result<(), DriverError> {
        self.buffer
            .lock()
            .map(|_| ())
            .map_err(|_| DriverError::Device("memory buffer poisoned".to_string()))
    }

    fn stat(&self, _path: &str) -> Result<DriverStat, DriverError> {
        let size = self
            .buffer
            .lock()
            .map_err(|_| DriverError::Device("memory buffer poisoned".to_string()))?
            .len();
        Ok(DriverStat {
            size: size as u64,
            mode: MODE_READ_WRITE,
        })
    }
}
