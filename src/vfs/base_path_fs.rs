//! A filesystem proxy that restricts every call to a base directory of the wrapped backend.
//!
//! ### Key Features:
//! - **Virtual root**: callers see the base directory as `/`. Paths are cleaned lexically
//!   before they are joined with the base, so `..` is resolved against the virtual root.
//! - **No leaks**: handles and directory entries report virtual paths. The only way to learn
//!   the real path is [`BasePathFS::real_path`].
//! - **Composable**: the wrapped backend may itself be a `BasePathFS`; every layer confines
//!   the path independently.
//!
//! ### Caveats:
//! - The jail is textual. A symlink inside the base that points outside of it is followed by
//!   a backend that honours symlinks.
//! - Absolute host paths are not recognised as such: `/tmp/x` passed to a jail based at
//!   `/srv/jail` resolves to `/srv/jail/tmp/x`.
//! - Errors raised by the wrapped backend are returned unchanged and may name the real path,
//!   e.g. `open /base/path/missing: file does not exist`. Only rejected escapes are reported
//!   with the virtual path.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::core::error::FsError;
use crate::core::{DirEntry, File, FsBackend, OpenFlags, Result, utils};
use crate::vfs::Metadata;

/// Restricts all operations to a subdirectory of the wrapped backend.
///
/// ### Example:
/// ```
/// use std::path::Path;
/// use std::sync::Arc;
/// use vfs_jail::{BasePathFS, FsBackend, MapFS};
///
/// let source = Arc::new(MapFS::new());
/// source.mkdir_all(Path::new("/base/path/tmp"), 0o777).unwrap();
///
/// let jail = BasePathFS::new(source.clone(), "/base/path");
/// let file = jail.create(Path::new("/tmp/foo")).unwrap();
/// assert_eq!(file.name(), Path::new("/tmp/foo"));
/// assert!(source.stat(Path::new("/base/path/tmp/foo")).is_ok());
///
/// assert!(jail.create(Path::new("../tmp/bar")).is_err());
/// ```
pub struct BasePathFS {
    source: Arc<dyn FsBackend>,
    path: PathBuf, // cleaned base path, in the namespace of `source`
}

impl BasePathFS {
    /// Wraps `source`, rooting it at `base`.
    /// `base` is cleaned lexically; it is not required to exist.
    pub fn new<P: AsRef<Path>>(source: Arc<dyn FsBackend>, base: P) -> Self {
        Self {
            source,
            path: utils::clean(base),
        }
    }

    /// Returns the path in the wrapped backend that `name` resolves to.
    ///
    /// Fails with `FsError::OutOfBounds` if `name` climbs above the virtual root.
    pub fn real_path<P: AsRef<Path>>(&self, name: P) -> Result<PathBuf> {
        Ok(self.resolve(name.as_ref())?)
    }

    fn resolve(&self, name: &Path) -> std::result::Result<PathBuf, FsError> {
        let confined = utils::confine(name).ok_or(FsError::OutOfBounds)?;
        let real = utils::join_confined(&self.path, &confined);
        debug_assert!(real.starts_with(&self.path));
        Ok(real)
    }

    /// Resolves `name` for operation `op`; escapes are reported as a missing file.
    fn resolve_for(&self, op: &'static str, name: &Path) -> Result<PathBuf> {
        self.resolve(name).map_err(|_| {
            debug!(op, path = %name.display(), "path escapes the base path");
            FsError::not_exist(op, name).into()
        })
    }

    fn wrap_file(&self, inner: Box<dyn File>, name: &Path) -> Box<dyn File> {
        Box::new(BasePathFile {
            inner,
            name: name.to_path_buf(),
        })
    }
}

impl fmt::Debug for BasePathFS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasePathFS")
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

impl FsBackend for BasePathFS {
    fn name(&self) -> &'static str {
        "BasePathFS"
    }

    fn create(&self, name: &Path) -> Result<Box<dyn File>> {
        let real = self.resolve_for("create", name)?;
        let file = self.source.create(&real)?;
        Ok(self.wrap_file(file, name))
    }

    fn open(&self, name: &Path) -> Result<Box<dyn File>> {
        let real = self.resolve_for("open", name)?;
        let file = self.source.open(&real)?;
        Ok(self.wrap_file(file, name))
    }

    fn open_file(&self, name: &Path, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        let real = self.resolve_for("openfile", name)?;
        let file = self.source.open_file(&real, flags, mode)?;
        Ok(self.wrap_file(file, name))
    }

    fn mkdir(&self, name: &Path, mode: u32) -> Result<()> {
        let real = self.resolve_for("mkdir", name)?;
        self.source.mkdir(&real, mode)
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()> {
        let real = self.resolve_for("mkdir_all", path)?;
        self.source.mkdir_all(&real, mode)
    }

    fn remove(&self, name: &Path) -> Result<()> {
        let real = self.resolve_for("remove", name)?;
        self.source.remove(&real)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let real = self.resolve_for("remove_all", path)?;
        self.source.remove_all(&real)
    }

    fn rename(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        let old_real = self.resolve_for("rename", old_name)?;
        let new_real = self.resolve_for("rename", new_name)?;
        self.source.rename(&old_real, &new_real)
    }

    fn stat(&self, name: &Path) -> Result<Metadata> {
        let real = self.resolve_for("stat", name)?;
        self.source.stat(&real)
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<Box<dyn DirEntry>>> {
        let real = self.resolve_for("readdir", dir)?;
        let entries = self.source.read_dir(&real)?;
        Ok(wrap_entries(entries, dir))
    }

    fn chmod(&self, name: &Path, mode: u32) -> Result<()> {
        let real = self.resolve_for("chmod", name)?;
        self.source.chmod(&real, mode)
    }

    fn chown(&self, name: &Path, uid: u32, gid: u32) -> Result<()> {
        let real = self.resolve_for("chown", name)?;
        self.source.chown(&real, uid, gid)
    }

    fn chtimes(&self, name: &Path, accessed: SystemTime, modified: SystemTime) -> Result<()> {
        let real = self.resolve_for("chtimes", name)?;
        self.source.chtimes(&real, accessed, modified)
    }

    fn lstat_if_possible(&self, name: &Path) -> Result<(Metadata, bool)> {
        let real = self.resolve_for("lstat", name)?;
        self.source.lstat_if_possible(&real)
    }

    fn symlink_if_possible(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        let old_real = self.resolve_for("symlink", old_name)?;
        let new_real = self.resolve_for("symlink", new_name)?;
        self.source.symlink_if_possible(&old_real, &new_real)
    }

    fn readlink_if_possible(&self, name: &Path) -> Result<PathBuf> {
        let real = self.resolve_for("readlink", name)?;
        let target = self.source.readlink_if_possible(&real)?;
        // Targets written by `symlink_if_possible` carry the base.
        Ok(utils::strip_base(&self.path, &target).unwrap_or(target))
    }
}

fn wrap_entries(entries: Vec<Box<dyn DirEntry>>, dir: &Path) -> Vec<Box<dyn DirEntry>> {
    entries
        .into_iter()
        .map(|inner| {
            let path = dir.join(inner.name());
            Box::new(BasePathDirEntry { inner, path }) as Box<dyn DirEntry>
        })
        .collect()
}

/// File handle returned by `BasePathFS`; reports the virtual path it was opened with.
pub struct BasePathFile {
    inner: Box<dyn File>,
    name: PathBuf,
}

impl Read for BasePathFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for BasePathFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for BasePathFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl File for BasePathFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn stat(&self) -> Result<Metadata> {
        self.inner.stat()
    }

    fn read_dir(&mut self) -> Result<Vec<Box<dyn DirEntry>>> {
        let entries = self.inner.read_dir()?;
        Ok(wrap_entries(entries, &self.name))
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.inner.truncate(size)
    }
}

/// Directory entry returned by `BasePathFS`; its path is virtual, its name unchanged.
pub struct BasePathDirEntry {
    inner: Box<dyn DirEntry>,
    path: PathBuf,
}

impl DirEntry for BasePathDirEntry {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &Metadata {
        self.inner.metadata()
    }
}
