//! A base-path jail for virtual file systems (VFS) in Rust.
//!
//! ### Overview
//!
//! `vfs-jail` defines the object-safe `FsBackend` trait, two backends (`MapFS` in memory,
//! `OsFS` on the host) and `BasePathFS`, a proxy that confines every path to a base directory
//! of any other backend.
//!
//! **Key ideas**:
//! - **Virtual root**: a `BasePathFS` rooted at `/srv/data` shows that directory as `/`.
//!   Paths are cleaned lexically before they are joined with the base; paths that climb above
//!   the virtual root fail as "does not exist".
//! - **No leaks**: file handles and directory entries report virtual paths only.
//!   `BasePathFS::real_path()` is the one accessor that reveals the real location.
//! - **Composition**: a `BasePathFS` can wrap another `BasePathFS`; each layer applies its own
//!   base.
//! - **Textual jail**: no canonicalization is done, so symlinks inside the base are followed by
//!   backends that honour them.
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//! use vfs_jail::{BasePathFS, FsBackend, FsBackendExt, MapFS, is_not_exist};
//!
//! let memory = Arc::new(MapFS::new());
//! let jail = BasePathFS::new(memory.clone(), "/srv/data");
//! jail.mkdir_all(Path::new("/docs"), 0o755).unwrap();
//! jail.write(Path::new("/docs/note.txt"), b"Hello").unwrap();
//!
//! assert_eq!(memory.read(Path::new("/srv/data/docs/note.txt")).unwrap(), b"Hello");
//! assert!(is_not_exist(&jail.stat(Path::new("../secret")).unwrap_err()));
//! ```

mod core;
mod vfs;

pub use crate::core::error::{FsError, is_not_exist};
pub use crate::core::ext::FsBackendExt;
pub use crate::core::utils;
pub use crate::core::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DirEntry, File, FsBackend, OpenFlags, Result};
pub use crate::vfs::{
    BasePathDirEntry, BasePathFS, BasePathFile, EntryType, FsDirEntry, MapFS, MapFile, Metadata,
    OsFS, OsFile,
};
