use std::fs;
use std::path::Path;
use std::sync::Arc;

use devfs::builtin::{MemoryDriver, NullDriver, ZeroDriver};
use devfs::{DevFs, FileSystem, FsError, OpenOptionsConfig, StaticModuleSystem};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn modules() -> StaticModuleSystem {
    let modules = StaticModuleSystem::new();
    modules
        .register(NullDriver::named("dmclk"))
        .register(NullDriver::named("dmspi"))
        .register(MemoryDriver::named("dmuart"))
        .register(ZeroDriver::named("mydrv"));
    modules
}

/// One declaration per path shape, plus a second member of the `dmuart0`
/// group.
fn board() -> (TempDir, DevFs) {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "clk_minor.ini", "[main]\ndriver_name = dmclk\nminor = 0\n");
    write(temp.path(), "dmclk.ini", "; no device number\n");
    write(temp.path(), "dmspi.ini", "[main]\nmajor = 0\n");
    write(temp.path(), "dmuart/1.ini", "[main]\nmajor = 0\nminor = 1\n");
    write(temp.path(), "dmuart/2.toml", "[main]\nmajor = 0\nminor = 2\nsize = 32\n");
    write(temp.path(), "mydrv.ini", "[main]\n");

    let fs = DevFs::mount(temp.path(), Arc::new(modules())).unwrap();
    (temp, fs)
}

fn list(fs: &DevFs, dir: &str) -> Vec<String> {
    fs.opendir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().name)
        .collect()
}

#[test]
fn root_listing() {
    let (_temp, fs) = board();
    assert_eq!(
        list(&fs, "/"),
        ["dmclkx/", "dmclk", "dmspi0", "dmuart0/", "mydrv"]
    );
}

#[test]
fn scenario_a_plain_driver_is_a_root_file() {
    let (_temp, fs) = board();
    let entry = fs
        .opendir("/")
        .unwrap()
        .map(Result::unwrap)
        .find(|entry| entry.name == "dmclk")
        .unwrap();
    assert!(entry.metadata.is_file());
    assert!(fs.stat("/dmclk").unwrap().is_file());
}

#[test]
fn scenario_b_major_only_is_a_root_file() {
    let (_temp, fs) = board();
    let entry = fs
        .opendir("/")
        .unwrap()
        .map(Result::unwrap)
        .find(|entry| entry.name.starts_with("dmspi"))
        .unwrap();
    assert_eq!(entry.name, "dmspi0");
    assert!(entry.metadata.is_file());
    assert!(!fs.dir_exists("/dmspi0").unwrap());
    assert_eq!(fs.opendir("/dmspi0").unwrap_err(), FsError::NotADirectory);
}

#[test]
fn scenario_c_minor_only_groups_under_placeholder() {
    let (_temp, fs) = board();
    assert!(fs.dir_exists("/dmclkx").unwrap());
    assert!(fs.stat("/dmclkx/").unwrap().is_dir());
    assert_eq!(list(&fs, "dmclkx/"), ["0"]);
}

#[test]
fn scenario_d_major_and_minor() {
    let (_temp, fs) = board();
    assert_eq!(list(&fs, "/dmuart0/"), ["1", "2"]);

    let registry = fs.registry().unwrap();
    let node = registry.find_by_path("/dmuart0/1").unwrap();
    assert_eq!(node.driver_name(), "dmuart");
    assert_eq!(node.parent_directory(), "dmuart0/");
}

#[test]
fn scenario_e_name_from_file() {
    let (_temp, fs) = board();
    let registry = fs.registry().unwrap();
    assert_eq!(registry.find_by_path("mydrv").unwrap().driver_name(), "mydrv");
}

#[test]
fn group_is_listed_once() {
    let (_temp, fs) = board();
    let root = list(&fs, "/");
    assert_eq!(root.iter().filter(|name| *name == "dmuart0/").count(), 1);
}

#[test]
fn enumeration_is_repeatable() {
    let (_temp, fs) = board();
    for dir in ["/", "/dmuart0", "dmclkx/"] {
        let first = fs.opendir(dir).unwrap();
        let first: Vec<_> = first.map(Result::unwrap).collect();
        let second: Vec<_> = fs.opendir(dir).unwrap().map(Result::unwrap).collect();
        assert_eq!(first, second, "{dir}");
    }
}

#[test]
fn lookups_are_exact() {
    let (_temp, fs) = board();
    let registry = fs.registry().unwrap();

    for path in ["dmclk", "/dmclkx/0", "dmspi0", "/dmuart0/1", "dmuart0/2", "/mydrv"] {
        let node = registry.find_by_path(path).unwrap();
        assert_eq!(node.path(), path.trim_start_matches('/'));
    }
    for path in ["dmuart0", "dmuart0/", "dmuart", "dmclkx", "dmspi", "dmspi0/0", "mydrv.ini", ""] {
        assert!(registry.find_by_path(path).is_none(), "{path}");
    }
}

#[test]
fn paths_are_unique() {
    let (_temp, fs) = board();
    let registry = fs.registry().unwrap();
    let mut paths: Vec<_> = registry.iter().map(|node| node.path()).collect();
    paths.sort_unstable();
    paths.dedup();
    assert_eq!(paths.len(), registry.len());
}

#[test]
fn io_through_the_namespace() {
    let (_temp, fs) = board();

    let mut uart = fs.open("/dmuart0/2", OpenOptionsConfig::read_write()).unwrap();
    assert_eq!(uart.write(b"ping"), Ok(4));
    assert_eq!(fs.metadata(Path::new("/dmuart0/2")).unwrap().len(), 4);
    let mut buf = [0u8; 8];
    assert_eq!(uart.read(&mut buf), Ok(4));
    assert_eq!(&buf[..4], b"ping");
    uart.close();

    let mut zero = fs.open("mydrv", OpenOptionsConfig::read_only()).unwrap();
    assert_eq!(zero.getc(), Ok(Some(0)));
    assert_eq!(zero.size(), Ok(Some(0)));

    assert_eq!(
        fs.open("/dmuart0", OpenOptionsConfig::read_only()).unwrap_err(),
        FsError::EntryNotFound
    );
}
