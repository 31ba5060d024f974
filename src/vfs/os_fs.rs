//! This module provides a filesystem backend that passes every call to the host filesystem.
//!
//! ### Key Features:
//! - **No state**: paths are handed to `std::fs` unchanged, relative paths resolve against the
//!   process working directory.
//! - **Unix extras**: creation modes, `chown`, owners in metadata and symlinks are available on
//!   Unix; elsewhere they degrade to the closest portable behaviour.
//! - **Confinement**: none. Wrap it in a `BasePathFS` to restrict callers to a directory.

use std::fs::{self, DirBuilder, FileTimes, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use crate::core::error::FsError;
use crate::core::{DirEntry, File, FsBackend, OpenFlags, Result};
use crate::vfs::{EntryType, FsDirEntry, Metadata};

/// Filesystem backend over the host filesystem.
///
/// ### Example:
/// ```no_run
/// use std::path::Path;
/// use vfs_jail::{FsBackend, FsBackendExt, OsFS};
///
/// let fs = OsFS::new();
/// let root = std::env::temp_dir().join("my_vfs");
/// fs.mkdir_all(&root, 0o755).unwrap();
/// fs.write(&root.join("note.txt"), b"Hello").unwrap();
/// fs.remove_all(&root).unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFS;

impl OsFS {
    pub fn new() -> Self {
        OsFS
    }
}

fn to_metadata(name: &Path, meta: &fs::Metadata) -> Metadata {
    let file_name = match name.file_name() {
        Some(file_name) => file_name.to_string_lossy().into_owned(),
        None => name.to_string_lossy().into_owned(),
    };
    let kind = if meta.file_type().is_symlink() {
        EntryType::Symlink
    } else if meta.is_dir() {
        EntryType::Directory
    } else {
        EntryType::File
    };
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let accessed = meta.accessed().unwrap_or(modified);

    let metadata = Metadata::new(file_name, kind)
        .with_len(meta.len())
        .with_times(accessed, modified);

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        metadata.with_mode(meta.mode()).with_owner(meta.uid(), meta.gid())
    }
    #[cfg(not(unix))]
    {
        let mode = if meta.permissions().readonly() {
            0o444
        } else {
            0o666
        };
        metadata.with_mode(mode)
    }
}

/// Removes a file, a link or a directory tree on the host.
fn rm_on_host(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

impl FsBackend for OsFS {
    fn name(&self) -> &'static str {
        "OsFS"
    }

    fn open_file(&self, name: &Path, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        // std refuses to create without write access
        let mut options = OpenOptions::new();
        options
            .read(flags.read || !flags.is_writable())
            .write(flags.write || flags.create || flags.create_new)
            .append(flags.append)
            .truncate(flags.truncate && flags.is_writable())
            .create(flags.create)
            .create_new(flags.create_new);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = options.open(name)?;
        if flags.create {
            trace!(path = %name.display(), "opened with create");
        }
        Ok(Box::new(OsFile {
            name: name.to_path_buf(),
            file,
            dir_read: false,
        }))
    }

    fn mkdir(&self, name: &Path, mode: u32) -> Result<()> {
        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(name)?;
        trace!(path = %name.display(), "directory created");
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()> {
        if fs::metadata(path).is_ok_and(|meta| meta.is_dir()) {
            return Ok(());
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path)?;
        trace!(path = %path.display(), "directories created");
        Ok(())
    }

    fn remove(&self, name: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(name)?;
        if meta.is_dir() {
            fs::remove_dir(name)?;
        } else {
            fs::remove_file(name)?;
        }
        trace!(path = %name.display(), "removed");
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        match rm_on_host(path) {
            Ok(()) => {
                trace!(path = %path.display(), "removed recursively");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn rename(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        fs::rename(old_name, new_name)?;
        trace!(from = %old_name.display(), to = %new_name.display(), "renamed");
        Ok(())
    }

    fn stat(&self, name: &Path) -> Result<Metadata> {
        let meta = fs::metadata(name)?;
        Ok(to_metadata(name, &meta))
    }

    fn chmod(&self, name: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode & 0o7777)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(name)?.permissions();
            permissions.set_readonly(mode & 0o200 == 0);
            permissions
        };

        fs::set_permissions(name, permissions)?;
        Ok(())
    }

    fn chown(&self, name: &Path, uid: u32, gid: u32) -> Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::chown(name, Some(uid), Some(gid))?;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            let _ = (uid, gid);
            Err(FsError::Unsupported {
                op: "chown",
                path: name.to_path_buf(),
            }
            .into())
        }
    }

    fn chtimes(&self, name: &Path, accessed: SystemTime, modified: SystemTime) -> Result<()> {
        let file = if cfg!(unix) {
            fs::File::open(name)?
        } else {
            OpenOptions::new().write(true).open(name)?
        };
        let times = FileTimes::new()
            .set_accessed(accessed)
            .set_modified(modified);
        file.set_times(times)?;
        Ok(())
    }

    fn lstat_if_possible(&self, name: &Path) -> Result<(Metadata, bool)> {
        let meta = fs::symlink_metadata(name)?;
        Ok((to_metadata(name, &meta), true))
    }

    fn symlink_if_possible(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(old_name, new_name)?;
            Ok(())
        }
        #[cfg(windows)]
        {
            if fs::metadata(old_name).is_ok_and(|meta| meta.is_dir()) {
                std::os::windows::fs::symlink_dir(old_name, new_name)?;
            } else {
                std::os::windows::fs::symlink_file(old_name, new_name)?;
            }
            Ok(())
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = old_name;
            Err(FsError::Unsupported {
                op: "symlink",
                path: new_name.to_path_buf(),
            }
            .into())
        }
    }

    fn readlink_if_possible(&self, name: &Path) -> Result<PathBuf> {
        Ok(fs::read_link(name)?)
    }
}

/// Handle to a host file or directory.
pub struct OsFile {
    name: PathBuf,
    file: fs::File,
    dir_read: bool,
}

impl Read for OsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for OsFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for OsFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl File for OsFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn stat(&self) -> Result<Metadata> {
        let meta = self.file.metadata()?;
        Ok(to_metadata(&self.name, &meta))
    }

    fn read_dir(&mut self) -> Result<Vec<Box<dyn DirEntry>>> {
        if !self.file.metadata()?.is_dir() {
            return Err(FsError::NotADirectory {
                op: "readdir",
                path: self.name.clone(),
            }
            .into());
        }
        if self.dir_read {
            return Ok(Vec::new());
        }
        self.dir_read = true;

        let mut entries: Vec<Box<dyn DirEntry>> = Vec::new();
        for entry in fs::read_dir(&self.name)? {
            let entry = entry?;
            let path = self.name.join(entry.file_name());
            let meta = to_metadata(&path, &entry.metadata()?);
            entries.push(Box::new(FsDirEntry::new(path, meta)));
        }
        Ok(entries)
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.file.set_len(size)?;
        Ok(())
    }
}
