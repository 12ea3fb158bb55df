use anyhow::{Context, Result};
use devfs::DevFs;

#[derive(Debug, clap::Parser)]
/// The options for the `devfs stat` subcommand
pub struct Stat {
    /// The path to inspect
    path: String,
}

impl Stat {
    /// Execute the stat command
    pub fn execute(&self, fs: &DevFs) -> Result<()> {
        let metadata = fs
            .stat(&self.path)
            .with_context(|| format!("unable to stat \"{}\"", self.path))?;

        let kind = if metadata.is_dir() { "directory" } else { "device" };
        println!("path: {}", self.path);
        println!("type: {kind}");
        println!("size: {}", metadata.len());
        println!("mode: {:04o}", metadata.mode);
        Ok(())
    }
}
