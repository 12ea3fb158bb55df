use anyhow::Result;
use devfs::DevFs;

#[derive(Debug, clap::Parser)]
/// The options for the `devfs tree` subcommand
pub struct Tree {}

impl Tree {
    /// Execute the tree command
    pub fn execute(&self, fs: &DevFs) -> Result<()> {
        println!("/");
        for entry in fs.opendir("/")? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    eprintln!("/: {e}");
                    continue;
                }
            };
            println!("  {}", entry.name);
            if entry.metadata.is_dir() {
                for child in fs.opendir(&entry.path)? {
                    match child {
                        Ok(child) => println!("    {}", child.name),
                        Err(e) => eprintln!("{}: {e}", entry.path),
                    }
                }
            }
        }
        Ok(())
    }
}
