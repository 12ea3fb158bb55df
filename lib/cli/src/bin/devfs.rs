use devfs_cli::commands::DevfsCmd;

fn main() {
    DevfsCmd::run();
}
