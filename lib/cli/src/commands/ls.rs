use anyhow::{Context, Result};
use devfs::{DevFs, DirEntry};

#[derive(Debug, clap::Parser)]
/// The options for the `devfs ls` subcommand
pub struct Ls {
    /// The directory to list
    #[clap(default_value = "/")]
    path: String,

    /// Show the kind, mode and size of every entry
    #[clap(short, long)]
    long: bool,
}

impl Ls {
    /// Execute the ls command
    pub fn execute(&self, fs: &DevFs) -> Result<()> {
        let dir = fs
            .opendir(&self.path)
            .with_context(|| format!("unable to open \"{}\"", self.path))?;

        for entry in dir {
            match entry {
                Ok(entry) if self.long => println!("{}", long_format(&entry)),
                Ok(entry) => println!("{}", entry.name),
                Err(e) => eprintln!("{}: {e}", self.path),
            }
        }
        Ok(())
    }
}

pub(crate) fn long_format(entry: &DirEntry) -> String {
    let kind = if entry.metadata.is_dir() { 'd' } else { 'c' };
    format!(
        "{kind} {:04o} {:>8} {}",
        entry.metadata.mode,
        entry.metadata.len(),
        entry.name
    )
}
