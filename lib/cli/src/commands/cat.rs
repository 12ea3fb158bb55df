use std::io::Write as _;

use anyhow::{Context, Result};
use devfs::{DevFs, OpenOptionsConfig};

#[derive(Debug, clap::Parser)]
/// The options for the `devfs cat` subcommand
pub struct Cat {
    /// The device to read from
    path: String,

    /// Stop after this many bytes
    #[clap(short = 'n', long, default_value_t = 4096)]
    bytes: usize,
}

impl Cat {
    /// Execute the cat command
    pub fn execute(&self, fs: &DevFs) -> Result<()> {
        copy_to_stdout(fs, &self.path, self.bytes)
    }
}

/// Reads up to `bytes` bytes from the device at `path` and prints them.
pub(crate) fn copy_to_stdout(fs: &DevFs, path: &str, bytes: usize) -> Result<()> {
    let mut file = fs
        .open(path, OpenOptionsConfig::read_only())
        .with_context(|| format!("unable to open \"{path}\""))?;

    let mut stdout = std::io::stdout().lock();
    let mut remaining = bytes;
    let mut buf = [0u8; 512];
    while remaining > 0 {
        let want = remaining.min(buf.len());
        let read = file.read(&mut buf[..want])?;
        if read == 0 {
            break;
        }
        stdout.write_all(&buf[..read])?;
        remaining -= read;
    }
    stdout.flush()?;
    file.close();
    Ok(())
}
