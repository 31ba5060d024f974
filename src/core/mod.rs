pub mod error;
pub mod ext;
pub mod utils;

use std::fmt;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::vfs::Metadata;
use error::FsError;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Mode used by `create()` for new files.
pub const DEFAULT_FILE_MODE: u32 = 0o666;
/// Mode callers typically pass to `mkdir_all()`.
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// How a file is opened by [`FsBackend::open_file`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
    pub create_new: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Self::default()
        }
    }

    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }

    pub fn append(mut self) -> Self {
        self.write = true;
        self.append = true;
        self
    }

    pub fn create(mut self) -> Self {
        self.create = true;
        self
    }

    pub fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Fails the open if the file already exists. Implies `create`.
    pub fn create_new(mut self) -> Self {
        self.create = true;
        self.create_new = true;
        self
    }

    /// True if the handle may modify the file.
    pub fn is_writable(&self) -> bool {
        self.write || self.append
    }
}

/// An open file or directory.
///
/// The handle is closed when dropped.
pub trait File: Read + Write + Seek + Send {
    /// Returns the path the handle was opened with.
    fn name(&self) -> &Path;

    fn stat(&self) -> Result<Metadata>;

    /// Returns the remaining entries of a directory handle.
    /// The first call yields every entry, later calls yield nothing.
    fn read_dir(&mut self) -> Result<Vec<Box<dyn DirEntry>>>;

    fn read_dir_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .read_dir()?
            .iter()
            .map(|entry| entry.name().to_string())
            .collect())
    }

    fn sync(&mut self) -> Result<()>;

    fn truncate(&mut self, size: u64) -> Result<()>;
}

impl fmt::Debug for dyn File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// A single entry of a directory listing.
pub trait DirEntry: Send {
    /// Base name of the entry.
    fn name(&self) -> &str;

    /// Full path of the entry in the namespace of the filesystem that listed it.
    fn path(&self) -> &Path;

    fn metadata(&self) -> &Metadata;

    fn is_dir(&self) -> bool {
        self.metadata().is_dir()
    }

    fn is_file(&self) -> bool {
        self.metadata().is_file()
    }
}

impl fmt::Debug for dyn DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntry")
            .field("path", &self.path())
            .field("metadata", self.metadata())
            .finish()
    }
}

/// Filesystem capability shared by the concrete backends and `BasePathFS`.
///
/// The trait is object safe, so backends compose as `Arc<dyn FsBackend>`.
pub trait FsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Creates or truncates `name` and opens it for reading and writing.
    fn create(&self, name: &Path) -> Result<Box<dyn File>> {
        self.open_file(
            name,
            OpenFlags::read_write().create().truncate(),
            DEFAULT_FILE_MODE,
        )
    }

    /// Opens `name` for reading.
    fn open(&self, name: &Path) -> Result<Box<dyn File>> {
        self.open_file(name, OpenFlags::read_only(), 0)
    }

    /// `mode` applies only when the call creates the file.
    fn open_file(&self, name: &Path, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>>;

    /// Creates a single directory; its parent must exist.
    fn mkdir(&self, name: &Path, mode: u32) -> Result<()>;

    /// Creates a directory with all missing parents.
    /// Succeeds if `path` already is a directory.
    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()>;

    /// Removes a file or an empty directory.
    fn remove(&self, name: &Path) -> Result<()>;

    /// Removes `path` with everything below it. A missing `path` is not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;

    fn rename(&self, old_name: &Path, new_name: &Path) -> Result<()>;

    fn stat(&self, name: &Path) -> Result<Metadata>;

    /// Lists the immediate children of `dir`, sorted by name.
    fn read_dir(&self, dir: &Path) -> Result<Vec<Box<dyn DirEntry>>> {
        let mut entries = self.open(dir)?.read_dir()?;
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    fn chmod(&self, name: &Path, mode: u32) -> Result<()>;

    fn chown(&self, name: &Path, uid: u32, gid: u32) -> Result<()>;

    fn chtimes(&self, name: &Path, accessed: SystemTime, modified: SystemTime) -> Result<()>;

    /// Calls `lstat` when the backend supports it, `stat` otherwise.
    /// The flag tells whether `lstat` was used.
    fn lstat_if_possible(&self, name: &Path) -> Result<(Metadata, bool)> {
        Ok((self.stat(name)?, false))
    }

    fn symlink_if_possible(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        let _ = old_name;
        Err(FsError::Unsupported {
            op: "symlink",
            path: new_name.to_path_buf(),
        }
        .into())
    }

    fn readlink_if_possible(&self, name: &Path) -> Result<PathBuf> {
        Err(FsError::Unsupported {
            op: "readlink",
            path: name.to_path_buf(),
        }
        .into())
    }
}
