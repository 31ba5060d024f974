use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vfs_jail::{BasePathFS, FsBackend, FsBackendExt, MapFS, OsFS, Result, is_not_exist};

fn main() -> Result<()> {
    // RUST_LOG=vfs_jail=debug shows rejected paths
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // in-memory backend; the jail shows `/srv/data` as `/`
    let memory = Arc::new(MapFS::new());
    let jail = BasePathFS::new(memory.clone(), "/srv/data");

    // creates `/srv/data/docs` in memory
    jail.mkdir_all(Path::new("/docs"), 0o755)?;

    // creates `/srv/data/docs/first.txt`; relative names start at the virtual root
    jail.write(Path::new("docs/first.txt"), b"Hello")?;
    jail.write(Path::new("/second.txt"), b"World")?;

    let first = memory.read(Path::new("/srv/data/docs/first.txt"))?;
    let second = jail.read(Path::new("/second.txt"))?;
    println!(
        "{}, {}!",
        String::from_utf8_lossy(&first),
        String::from_utf8_lossy(&second)
    );

    // handles and listings never mention `/srv/data`
    let file = jail.open(Path::new("/docs/first.txt"))?;
    println!("handle name: {}", file.name().display());
    for path in jail.tree(Path::new("/"))? {
        println!("  {}", path.display());
    }

    // climbing above the virtual root looks like a missing file
    let err = jail.stat(Path::new("../../etc/passwd")).unwrap_err();
    assert!(is_not_exist(&err));
    println!("escape rejected: {err}");

    // the same proxy over the host file system
    let root = std::env::temp_dir().join("vfs_jail_demo");
    OsFS::new().mkdir_all(&root, 0o755)?;
    let host = BasePathFS::new(Arc::new(OsFS::new()), &root);
    host.write(Path::new("/hello.txt"), b"Hello, host!")?;
    println!("/hello.txt -> {}", host.real_path("/hello.txt")?.display());
    OsFS::new().remove_all(&root)?;

    Ok(())
}
