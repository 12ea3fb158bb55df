use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for external users
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// The provided arguments are invalid (empty path, zero-sized buffer...)
    #[error("invalid input")]
    InvalidInput,
    /// The filesystem context was already unmounted
    #[error("invalid filesystem context")]
    InvalidContext,
    /// The requested file or directory could not be found, or the driver
    /// behind it lacks the capability the operation is built on
    #[error("entry not found")]
    EntryNotFound,
    /// Expected a directory but found something else
    #[error("not a directory")]
    NotADirectory,
    /// Devices cannot be created, renamed, deleted or repositioned
    #[error("operation not supported")]
    Unsupported,
    /// A synthesized path does not fit in the configured path limit
    #[error("path does not fit in the path limit")]
    NoSpace,
    /// Something failed when doing IO on the host.
    #[error("io error")]
    IOError,
    /// The driver reported a failure while serving the request
    #[error("driver failure")]
    DriverFailure,
    /// Some other unhandled error. If you see this, it's probably a bug.
    #[error("unknown error found")]
    UnknownError,
}

impl FsError {
    /// The status code surfaced to the virtual-filesystem layer.
    pub const fn code(&self) -> ErrorCode {
        match self {
            FsError::InvalidInput | FsError::InvalidContext => ErrorCode::Invalid,
            FsError::EntryNotFound | FsError::NotADirectory => ErrorCode::NotFound,
            FsError::NoSpace => ErrorCode::NoSpace,
            FsError::Unsupported
            | FsError::IOError
            | FsError::DriverFailure
            | FsError::UnknownError => ErrorCode::General,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::NotFound => FsError::EntryNotFound,
            io::ErrorKind::NotADirectory => FsError::NotADirectory,
            io::ErrorKind::InvalidInput => FsError::InvalidInput,
            io::ErrorKind::Unsupported => FsError::Unsupported,
            io::ErrorKind::StorageFull => FsError::NoSpace,
            io::ErrorKind::Other => FsError::IOError,
            // if the following triggers, a new error type was added to this non-exhaustive enum
            _ => FsError::UnknownError,
        }
    }
}

impl From<FsError> for io::Error {
    fn from(val: FsError) -> Self {
        let kind = match val {
            FsError::InvalidInput | FsError::InvalidContext => io::ErrorKind::InvalidInput,
            FsError::EntryNotFound => io::ErrorKind::NotFound,
            FsError::NotADirectory => io::ErrorKind::NotADirectory,
            FsError::Unsupported => io::ErrorKind::Unsupported,
            FsError::NoSpace => io::ErrorKind::StorageFull,
            FsError::IOError | FsError::DriverFailure | FsError::UnknownError => {
                io::ErrorKind::Other
            }
        };
        kind.into()
    }
}

/// Status codes of the filesystem interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    General = -1,
    Invalid = -2,
    NotFound = -3,
    NoSpace = -4,
}

impl<T> From<&crate::Result<T>> for ErrorCode {
    fn from(result: &crate::Result<T>) -> Self {
        match result {
            Ok(_) => ErrorCode::Ok,
            Err(e) => e.code(),
        }
    }
}

/// Errors reported by a driver through its capability functions.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DriverError {
    /// The driver does not implement the requested capability
    #[error("capability not implemented by the driver")]
    Unsupported,
    /// The configuration document handed to `create` is unusable
    #[error("invalid driver configuration: {0}")]
    InvalidConfig(String),
    /// The device itself failed
    #[error("device error: {0}")]
    Device(String),
}

/// Errors of the module system.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module `{0}` not found")]
    NotFound(String),
    #[error("module `{0}` could not be enabled")]
    EnableFailed(String),
    #[error("module `{0}` is not loaded")]
    NotLoaded(String),
    #[error("module registry lock poisoned")]
    Lock,
}

/// Errors raised while reading a driver declaration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Why a single configuration entry was skipped by the walker.
#[derive(Error, Debug)]
pub(crate) enum ConfigureError {
    #[error("unable to parse the declaration")]
    Config(#[from] ConfigError),
    #[error("unable to prepare the driver module")]
    Module(#[from] ModuleError),
    #[error("driver module `{0}` does not implement create")]
    MissingCreate(String),
    #[error("driver `{name}` failed to create an instance")]
    Create {
        name: String,
        #[source]
        error: DriverError,
    },
    #[error("unable to synthesize the path of a `{name}` instance")]
    Path {
        name: String,
        #[source]
        error: FsError,
    },
    #[error("path `{0}` is already registered")]
    Duplicate(String),
    #[error("path `{path}` clashes with the registered `{existing}`")]
    Shadowed { path: String, existing: String },
}
