//! Directory listing over the driver registry.

use std::collections::HashSet;

use tracing::trace;

use crate::path::{ROOT_DIRECTORY, leaf_name, normalize_dir_path};
use crate::{DriverRegistry, FsError, Result};

/// Mode bits reported for synthetic directories.
pub const DIRECTORY_MODE: u32 = 0o555;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileType {
    pub dir: bool,
    pub file: bool,
}

impl FileType {
    pub const fn directory() -> Self {
        Self {
            dir: true,
            file: false,
        }
    }

    pub const fn device() -> Self {
        Self {
            dir: false,
            file: true,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.dir
    }

    pub fn is_file(&self) -> bool {
        self.file
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub ft: FileType,
    /// Size in bytes, as reported by the driver. Zero for directories and
    /// for drivers that cannot report one.
    pub len: u64,
    /// Mode bits, as reported by the driver.
    pub mode: u32,
}

impl Metadata {
    pub fn directory() -> Self {
        Self {
            ft: FileType::directory(),
            len: 0,
            mode: DIRECTORY_MODE,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.ft.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.ft.is_file()
    }

    pub fn file_type(&self) -> FileType {
        self.ft
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry inside the listed directory. Grouping directories
    /// keep their trailing `/`, e.g. `dmuart0/`.
    pub name: String,
    /// Absolute path of the entry.
    pub path: String,
    pub metadata: Metadata,
}

impl DirEntry {
    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata
    }

    pub fn file_type(&self) -> FileType {
        self.metadata.ft
    }
}

/// An open directory.
///
/// Borrows the registry, so the registry cannot be torn down while a
/// listing is in progress. Each grouping directory is yielded once, at the
/// position of its first member.
#[derive(Debug)]
pub struct DirectoryIterator<'a> {
    registry: &'a DriverRegistry,
    directory: String,
    cursor: Option<usize>,
    seen_groups: HashSet<String>,
}

impl<'a> DirectoryIterator<'a> {
    /// Opens `path` for listing. Only the root and grouping directories can
    /// be opened.
    pub fn open(registry: &'a DriverRegistry, path: &str) -> Result<Self> {
        if !registry.is_directory(path) {
            return Err(match registry.find_by_path(path) {
                Some(_) => FsError::NotADirectory,
                None => FsError::EntryNotFound,
            });
        }

        let directory = normalize_dir_path(path);
        let cursor = registry.find_next_in_directory(None, &directory);
        trace!(directory = %directory, "opened directory");
        Ok(Self {
            registry,
            directory,
            cursor,
            seen_groups: HashSet::new(),
        })
    }

    /// The directory being listed, in normalized form.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Yields the next entry, or `None` once the directory is exhausted.
    ///
    /// A driver failing to report its size is returned as an error for that
    /// entry; the listing continues after it.
    pub fn next_entry(&mut self) -> Option<Result<DirEntry>> {
        loop {
            let idx = self.cursor?;
            self.cursor = self
                .registry
                .find_next_in_directory(Some(idx), &self.directory);
            let node = self.registry.get(idx)?;

            let parent = node.parent_directory();
            if parent == self.directory {
                let metadata = match node.stat(node.path()) {
                    Ok(Some(stat)) => Metadata {
                        ft: FileType::device(),
                        len: stat.size,
                        mode: stat.mode,
                    },
                    Ok(None) => Metadata {
                        ft: FileType::device(),
                        ..Default::default()
                    },
                    Err(e) => return Some(Err(e)),
                };
                return Some(Ok(DirEntry {
                    name: leaf_name(node.path()).to_string(),
                    path: format!("{ROOT_DIRECTORY}{}", node.path()),
                    metadata,
                }));
            }

            if self.seen_groups.insert(parent.clone()) {
                return Some(Ok(DirEntry {
                    path: format!("{ROOT_DIRECTORY}{parent}"),
                    name: parent,
                    metadata: Metadata::directory(),
                }));
            }
        }
    }

    pub fn close(self) {
        trace!(directory = %self.directory, "closed directory");
    }
}

impl Iterator for DirectoryIterator<'_> {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry()
    }
}

/// A detached listing, collected up front.
#[derive(Debug)]
pub struct ReadDir {
    data: Vec<DirEntry>,
    index: usize,
}

impl ReadDir {
    pub fn new(data: Vec<DirEntry>) -> Self {
        Self { data, index: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Iterator for ReadDir {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        if let Some(v) = self.data.get(self.index).cloned() {
            self.index += 1;
            return Some(v);
        }
        None
    }
}
