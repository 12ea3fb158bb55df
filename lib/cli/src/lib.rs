//! The devfs binary lib

#![deny(
    missing_docs,
    dead_code,
    nonstandard_style,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

pub mod commands;
pub mod logging;
mod opts;

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
