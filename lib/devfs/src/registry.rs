//! The ordered collection of configured driver instances.

use tracing::{info, trace, warn};

use crate::path::{is_root, normalize_dir_path, normalize_file_path};
use crate::{DriverNode, ModuleSystem};

/// Driver nodes in discovery order.
///
/// The registry itself does not reject clashing paths; the walker checks
/// [`DriverRegistry::find_by_path`] and [`DriverRegistry::find_shadowing`]
/// before appending.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    nodes: Vec<DriverNode>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, node: DriverNode) {
        trace!(path = %node.path(), "registering driver node");
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DriverNode> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriverNode> {
        self.nodes.iter()
    }

    /// The node whose canonical path is exactly `path`. A leading `/` is
    /// ignored.
    pub fn find_by_path(&self, path: &str) -> Option<&DriverNode> {
        let path = normalize_file_path(path);
        self.nodes.iter().find(|node| node.path() == path)
    }

    /// Position of the first node after `after` (or from the start) that is
    /// listed in `directory`.
    ///
    /// A node is listed in a directory when its parent directory is that
    /// directory, or when the directory is the root and the node sits in a
    /// grouping directory; the latter surfaces as that grouping directory.
    pub fn find_next_in_directory(&self, after: Option<usize>, directory: &str) -> Option<usize> {
        let directory = normalize_dir_path(directory);
        let start = after.map_or(0, |idx| idx + 1);
        self.nodes
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, node)| is_listed_in(node, &directory))
            .map(|(idx, _)| idx)
    }

    /// Whether `path` is the root or the grouping directory of some node.
    pub fn is_directory(&self, path: &str) -> bool {
        if is_root(path) {
            return true;
        }
        let directory = normalize_dir_path(path);
        self.nodes
            .iter()
            .any(|node| node.parent_directory() == directory)
    }

    /// A registered node that would clash with `node` in the namespace: one
    /// whose grouping directory has the same name as `node`, or one whose
    /// path has the same name as the grouping directory of `node`.
    ///
    /// Letting both in would list `dmuart0` next to `dmuart0/`.
    pub fn find_shadowing(&self, node: &DriverNode) -> Option<&DriverNode> {
        let as_directory = normalize_dir_path(node.path());
        let parent = node.parent_directory();
        self.nodes.iter().find(|other| {
            other.parent_directory() == as_directory
                || (!is_root(&parent) && normalize_dir_path(other.path()) == parent)
        })
    }

    /// Tears every node down, last registered first, and empties the
    /// registry. Individual failures are logged and do not stop the drain.
    /// Returns the number of nodes whose teardown reported a failure.
    pub fn clear_and_teardown(&mut self, modules: &dyn ModuleSystem) -> usize {
        let mut failures = 0;
        let count = self.nodes.len();
        while let Some(node) = self.nodes.pop() {
            let path = node.path().to_string();
            if !node.teardown(modules) {
                warn!(path = %path, "driver node teardown was incomplete");
                failures += 1;
            }
        }
        info!(count, failures, "unconfigured all drivers");
        failures
    }
}

fn is_listed_in(node: &DriverNode, directory: &str) -> bool {
    let parent = node.parent_directory();
    parent == directory || is_root(directory)
}
