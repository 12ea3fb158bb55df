//! The commands available in the devfs binary.
mod cat;
mod ls;
mod stat;
mod tree;
mod write;

pub use cat::*;
pub use ls::*;
pub use stat::*;
pub use tree::*;
pub use write::*;

use clap::{CommandFactory, Parser};

use crate::opts::MountOpts;

/// Command-line arguments for the devfs CLI.
#[derive(Parser, Debug)]
#[clap(author, version)]
#[clap(name = "devfs", about = concat!("devfs ", env!("CARGO_PKG_VERSION")))]
pub struct DevfsCmd {
    #[clap(flatten)]
    output: crate::logging::Output,
    #[clap(flatten)]
    mount: MountOpts,
    #[clap(subcommand)]
    cmd: Option<Cmd>,
}

impl DevfsCmd {
    fn execute(self) -> Result<(), anyhow::Error> {
        let DevfsCmd { output, mount, cmd } = self;

        output.initialize_logging();

        let Some(cmd) = cmd else {
            DevfsCmd::command().print_long_help()?;
            // Note: clap uses an exit code of 2 when CLI parsing fails
            std::process::exit(2);
        };

        let fs = mount.mount()?;
        match cmd {
            Cmd::Ls(ls) => ls.execute(&fs),
            Cmd::Tree(tree) => tree.execute(&fs),
            Cmd::Stat(stat) => stat.execute(&fs),
            Cmd::Cat(cat) => cat.execute(&fs),
            Cmd::Write(write) => write.execute(&fs),
        }
    }

    /// The main function for the devfs CLI tool.
    pub fn run() {
        if let Err(e) = DevfsCmd::parse().execute() {
            eprintln!("error: {e:?}");
            std::process::exit(1);
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Cmd {
    /// List a directory
    Ls(Ls),
    /// Show the whole namespace
    Tree(Tree),
    /// Show what the driver reports for a path
    Stat(Stat),
    /// Read from a device and copy it to stdout
    Cat(Cat),
    /// Write to a device
    ///
    /// Every invocation mounts afresh, so what a `memory` device holds is
    /// gone once the command exits; pass `--then-cat` to read it back.
    Write(Write),
}
