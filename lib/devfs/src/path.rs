//! Synthesis of the canonical path of a driver instance.
//!
//! A driver instance is placed in the namespace purely from its driver name
//! and the presence of the two halves of its [`DeviceNumber`]:
//!
//! | major | minor | parent directory     | canonical path           |
//! |-------|-------|----------------------|--------------------------|
//! | yes   | yes   | `<name><major>/`     | `<name><major>/<minor>`  |
//! | no    | yes   | `<name>x/`           | `<name>x/<minor>`        |
//! | yes   | no    | `/`                  | `<name><major>`          |
//! | no    | no    | `/`                  | `<name>`                 |
//!
//! A minor number always implies a grouping directory. A bare major number
//! does not: a major-only instance is a leaf directly under the root.
//!
//! Canonical paths are stored without a leading `/`. Lookups accept both
//! forms, see [`normalize_file_path`] and [`normalize_dir_path`].

use std::fmt;
use std::fmt::Write as _;

use crate::{FsError, Result};

/// The path of the root directory.
pub const ROOT_DIRECTORY: &str = "/";

/// Placeholder used as the grouping segment when no major number was given.
pub const NO_MAJOR_PLACEHOLDER: &str = "x";

/// Longest module name the path limit is sized for.
pub const MAX_MODULE_NAME_LEN: usize = 64;

/// Default limit on the length of a synthesized path.
pub const DEFAULT_MAX_PATH_LEN: usize = MAX_MODULE_NAME_LEN + 20;

/// The device number a driver reports when it creates an instance.
///
/// Either half may be absent, and presence alone decides the shape of the
/// instance's path.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceNumber {
    pub major: Option<u32>,
    pub minor: Option<u32>,
}

impl DeviceNumber {
    pub const fn none() -> Self {
        Self {
            major: None,
            minor: None,
        }
    }

    pub const fn major(major: u32) -> Self {
        Self {
            major: Some(major),
            minor: None,
        }
    }

    pub const fn minor(minor: u32) -> Self {
        Self {
            major: None,
            minor: Some(minor),
        }
    }

    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major: Some(major),
            minor: Some(minor),
        }
    }

    /// Whether instances with this number live in a grouping directory.
    pub const fn is_grouped(&self) -> bool {
        self.minor.is_some()
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.major, self.minor) {
            (Some(major), Some(minor)) => write!(f, "{major}:{minor}"),
            (None, Some(minor)) => write!(f, "{NO_MAJOR_PLACEHOLDER}:{minor}"),
            (Some(major), None) => write!(f, "{major}"),
            (None, None) => f.write_str("-"),
        }
    }
}

/// Path of the directory an instance is listed in.
///
/// This is either [`ROOT_DIRECTORY`] or a grouping directory with a trailing
/// `/`, such as `dmuart0/`.
pub fn parent_directory(driver_name: &str, device: DeviceNumber) -> String {
    match (device.major, device.minor) {
        (Some(major), Some(_)) => format!("{driver_name}{major}/"),
        (None, Some(_)) => format!("{driver_name}{NO_MAJOR_PLACEHOLDER}/"),
        (_, None) => ROOT_DIRECTORY.to_string(),
    }
}

/// Canonical path of an instance.
///
/// Fails with [`FsError::NoSpace`] when the path would be longer than
/// `max_len` bytes, and with [`FsError::InvalidInput`] for an empty name.
pub fn node_path(driver_name: &str, device: DeviceNumber, max_len: usize) -> Result<String> {
    if driver_name.is_empty() {
        return Err(FsError::InvalidInput);
    }

    let mut path = String::with_capacity(driver_name.len() + 12);
    match device.minor {
        Some(minor) => {
            path.push_str(&parent_directory(driver_name, device));
            write!(path, "{minor}").map_err(|_| FsError::UnknownError)?;
        }
        None => {
            path.push_str(driver_name);
            if let Some(major) = device.major {
                write!(path, "{major}").map_err(|_| FsError::UnknownError)?;
            }
        }
    }

    if path.len() > max_len {
        return Err(FsError::NoSpace);
    }
    Ok(path)
}

/// Name an entry is listed under in its parent directory.
pub fn leaf_name(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether `path` names the root directory.
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path.chars().all(|c| c == '/')
}

/// Brings a file path into the form canonical paths are stored in.
pub fn normalize_file_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Brings a directory path into the form parent directories are computed
/// in: the root is `/`, every other directory has no leading and exactly
/// one trailing `/`.
pub fn normalize_dir_path(path: &str) -> String {
    if is_root(path) {
        return ROOT_DIRECTORY.to_string();
    }
    let trimmed = path.trim_matches('/');
    format!("{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = DEFAULT_MAX_PATH_LEN;

    #[test]
    fn test_path_table() {
        let cases = [
            (DeviceNumber::new(0, 1), "dmuart0/", "dmuart0/1"),
            (DeviceNumber::minor(3), "dmuartx/", "dmuartx/3"),
            (DeviceNumber::major(2), "/", "dmuart2"),
            (DeviceNumber::none(), "/", "dmuart"),
        ];

        for (device, parent, path) in cases {
            assert_eq!(parent_directory("dmuart", device), parent, "{device}");
            assert_eq!(node_path("dmuart", device, LIMIT).unwrap(), path, "{device}");
        }
    }

    #[test]
    fn test_major_only_lives_in_root() {
        assert_eq!(parent_directory("dmspi", DeviceNumber::major(0)), ROOT_DIRECTORY);
        assert!(!DeviceNumber::major(0).is_grouped());
    }

    #[test]
    fn test_path_limit() {
        assert_eq!(
            node_path("dmuart", DeviceNumber::new(10, 200), 9),
            Err(FsError::NoSpace)
        );
        assert_eq!(
            node_path("dmuart", DeviceNumber::new(10, 200), 12).as_deref(),
            Ok("dmuart10/200")
        );
        assert_eq!(node_path("", DeviceNumber::none(), LIMIT), Err(FsError::InvalidInput));
    }

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("dmuart0/1"), "1");
        assert_eq!(leaf_name("dmclk"), "dmclk");
        assert_eq!(leaf_name("dmclkx/"), "dmclkx");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_file_path("/dmuart0/1"), "dmuart0/1");
        assert_eq!(normalize_file_path("dmclk"), "dmclk");
        assert_eq!(normalize_dir_path(""), "/");
        assert_eq!(normalize_dir_path("/"), "/");
        assert_eq!(normalize_dir_path("/dmuart0"), "dmuart0/");
        assert_eq!(normalize_dir_path("dmuart0/"), "dmuart0/");
        assert_eq!(normalize_dir_path("/dmuartx/"), "dmuartx/");
    }
}
