//! Convenience helpers available on every [`FsBackend`], including `dyn FsBackend`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::error::{FsError, is_not_exist};
use super::{DEFAULT_FILE_MODE, FsBackend, OpenFlags, Result};

pub trait FsBackendExt: FsBackend {
    /// Checks if `path` exists. A missing path is `Ok(false)`, other failures are errors.
    fn exists(&self, path: &Path) -> Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(err) if is_not_exist(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Checks if `path` is a directory. Errors if `path` does not exist.
    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(self.stat(path)?.is_dir())
    }

    /// Checks if `path` is a regular file. Errors if `path` does not exist.
    fn is_file(&self, path: &Path) -> Result<bool> {
        Ok(self.stat(path)?.is_file())
    }

    /// True for an empty file or a directory without entries.
    fn is_empty(&self, path: &Path) -> Result<bool> {
        let meta = self.stat(path)?;
        if meta.is_dir() {
            return Ok(self.read_dir(path)?.is_empty());
        }
        Ok(meta.is_empty())
    }

    /// Reads the entire contents of a file.
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        if self.stat(path)?.is_dir() {
            return Err(FsError::IsADirectory {
                op: "read",
                path: path.to_path_buf(),
            }
            .into());
        }
        let mut content = Vec::new();
        self.open(path)?.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Replaces the contents of `path`, creating the file if needed.
    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        let flags = OpenFlags::write_only().create().truncate();
        let mut file = self.open_file(path, flags, DEFAULT_FILE_MODE)?;
        file.write_all(content)?;
        file.flush()?;
        Ok(())
    }

    /// Appends `content` to an existing file.
    fn append(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut file = self.open_file(path, OpenFlags::write_only().append(), 0)?;
        file.write_all(content)?;
        file.flush()?;
        Ok(())
    }

    /// Returns every path below `path` (recursively), sorted. `path` itself is not included.
    fn tree(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        walk(self, path, &mut found)?;
        found.sort();
        Ok(found)
    }
}

impl<T: FsBackend + ?Sized> FsBackendExt for T {}

fn walk<F: FsBackend + ?Sized>(fs: &F, dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        found.push(entry.path().to_path_buf());
        if entry.is_dir() {
            walk(fs, entry.path(), found)?;
        }
    }
    Ok(())
}
