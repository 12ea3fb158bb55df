use anyhow::{Context, Result};
use devfs::{DevFs, OpenOptionsConfig};

#[derive(Debug, clap::Parser)]
/// The options for the `devfs write` subcommand
///
/// Drivers live only as long as the mount, and every invocation mounts
/// afresh, so data written to a `memory` device is gone once the command
/// exits. Use `--then-cat` to read it back within the same run.
pub struct Write {
    /// The device to write to
    path: String,

    /// The data to write
    data: String,

    /// Read the device back and print it after writing
    #[clap(long)]
    then_cat: bool,
}

impl Write {
    /// Execute the write command
    pub fn execute(&self, fs: &DevFs) -> Result<()> {
        let mut file = fs
            .open(&self.path, OpenOptionsConfig::read_write())
            .with_context(|| format!("unable to open \"{}\"", self.path))?;

        let written = file.write(self.data.as_bytes())?;
        file.flush()?;
        file.close();
        eprintln!("{written} of {} bytes written to {}", self.data.len(), self.path);

        if self.then_cat {
            super::cat::copy_to_stdout(fs, &self.path, written)?;
        }
        Ok(())
    }
}
