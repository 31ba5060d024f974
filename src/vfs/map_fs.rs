//! This module provides a virtual filesystem (VFS) implementation that maps to a memory storage.

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tracing::trace;

use crate::core::error::FsError;
use crate::core::{DirEntry, File, FsBackend, OpenFlags, Result, utils};
use crate::vfs::{EntryType, FsDirEntry, Metadata};

type Nodes = BTreeMap<PathBuf, Arc<RwLock<Node>>>;

/// A virtual file system (VFS) implementation that keeps file and directory entries in memory.
///
/// `MapFS` provides a POSIX‑like file system interface where all data is kept in‑process,
/// allowing file creation, directory traversal and metadata inspection without touching the
/// host filesystem.
///
/// ### Internal state
///
/// * `entries`: the core storage map that holds all file and directory nodes.
///   - Key: `PathBuf` representing **absolute normalized paths** (always start with `/`).
///   - Value: a shared `Node` with type, metadata and (for files) content. Open handles hold
///     the same node, so writes through a handle are visible to later `open()` calls.
///   - Uses `BTreeMap` for ordered traversal and deterministic iteration.
///
/// ### Invariants
///
/// 1. **Root existence**: The path `/` is always present in `entries` and is a directory.
/// 2. **Path normalization**: All keys are normalized (no `..`, no `//`, no trailing `/`).
///    Relative inputs are resolved against `/`; `..` never climbs above `/`.
/// 3. **Parent consistency**: For any entry at `/a/b/c` there is a directory entry `/a/b`.
///
/// ### Thread Safety
///
/// `MapFS` is `Send + Sync`: the map and every node sit behind a `RwLock`.
///
/// ### Example
///
/// ```
/// use std::path::Path;
/// use vfs_jail::{FsBackend, FsBackendExt, MapFS};
///
/// let fs = MapFS::new();
/// fs.mkdir_all(Path::new("/docs"), 0o755).unwrap();
/// fs.write(Path::new("/docs/note.txt"), b"Hello").unwrap();
///
/// assert!(fs.exists(Path::new("/docs/note.txt")).unwrap());
///
/// fs.remove(Path::new("/docs/note.txt")).unwrap();
/// ```
#[derive(Debug)]
pub struct MapFS {
    entries: Arc<RwLock<Nodes>>,
}

#[derive(Debug)]
struct Node {
    kind: EntryType,
    data: Vec<u8>,
    mode: u32,
    modified: SystemTime,
    accessed: SystemTime,
    uid: u32,
    gid: u32,
}

impl Node {
    fn new(kind: EntryType, mode: u32) -> Self {
        let now = SystemTime::now();
        Self {
            kind,
            data: Vec::new(),
            mode: mode & 0o7777,
            modified: now,
            accessed: now,
            uid: 0,
            gid: 0,
        }
    }

    fn is_dir(&self) -> bool {
        self.kind == EntryType::Directory
    }

    fn metadata(&self, name: &str) -> Metadata {
        Metadata::new(name, self.kind)
            .with_len(self.data.len() as u64)
            .with_mode(self.mode)
            .with_times(self.accessed, self.modified)
            .with_owner(self.uid, self.gid)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn base_name(key: &Path) -> String {
    match key.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => key.to_string_lossy().into_owned(),
    }
}

fn has_children(entries: &Nodes, key: &Path) -> bool {
    entries
        .keys()
        .any(|path| path.as_path() != key && path.starts_with(key))
}

impl MapFS {
    /// Creates new MapFS instance containing only the root directory `/`.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            utils::virtual_root(),
            Arc::new(RwLock::new(Node::new(EntryType::Directory, 0o777))),
        );

        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    fn to_inner<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        utils::normalize(utils::virtual_root().join(path))
    }

    fn node(&self, op: &'static str, name: &Path) -> Result<Arc<RwLock<Node>>> {
        let key = self.to_inner(name);
        read_lock(&self.entries)
            .get(&key)
            .cloned()
            .ok_or_else(|| FsError::not_exist(op, name).into())
    }

    /// The parent of `key` must exist and be a directory.
    fn check_parent(entries: &Nodes, op: &'static str, name: &Path, key: &Path) -> Result<()> {
        let Some(parent) = key.parent() else {
            return Ok(());
        };
        match entries.get(parent) {
            None => Err(FsError::not_exist(op, name).into()),
            Some(node) if !read_lock(node).is_dir() => Err(FsError::NotADirectory {
                op,
                path: name.to_path_buf(),
            }
            .into()),
            Some(_) => Ok(()),
        }
    }
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FsBackend for MapFS {
    fn name(&self) -> &'static str {
        "MapFS"
    }

    fn open_file(&self, name: &Path, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        let key = self.to_inner(name);
        let mut entries = write_lock(&self.entries);

        let node = match entries.get(&key) {
            Some(node) => {
                if flags.create_new {
                    return Err(FsError::AlreadyExists {
                        op: "open",
                        path: name.to_path_buf(),
                    }
                    .into());
                }
                let mut guard = write_lock(node);
                if guard.is_dir() && flags.is_writable() {
                    return Err(FsError::IsADirectory {
                        op: "open",
                        path: name.to_path_buf(),
                    }
                    .into());
                }
                if flags.truncate && flags.is_writable() {
                    guard.data.clear();
                    guard.modified = SystemTime::now();
                }
                Arc::clone(node)
            }
            None => {
                if !flags.create {
                    return Err(FsError::not_exist("open", name).into());
                }
                Self::check_parent(&entries, "open", name, &key)?;
                let node = Arc::new(RwLock::new(Node::new(EntryType::File, mode)));
                entries.insert(key.clone(), Arc::clone(&node));
                trace!(path = %key.display(), "file created");
                node
            }
        };
        drop(entries);

        let pos = if flags.append {
            read_lock(&node).data.len() as u64
        } else {
            0
        };

        Ok(Box::new(MapFile {
            name: name.to_path_buf(),
            key,
            node,
            entries: Arc::clone(&self.entries),
            flags,
            pos,
            dir_read: false,
        }))
    }

    fn mkdir(&self, name: &Path, mode: u32) -> Result<()> {
        let key = self.to_inner(name);
        let mut entries = write_lock(&self.entries);

        if entries.contains_key(&key) {
            return Err(FsError::AlreadyExists {
                op: "mkdir",
                path: name.to_path_buf(),
            }
            .into());
        }
        Self::check_parent(&entries, "mkdir", name, &key)?;

        entries.insert(
            key.clone(),
            Arc::new(RwLock::new(Node::new(EntryType::Directory, mode))),
        );
        trace!(path = %key.display(), "directory created");
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()> {
        let key = self.to_inner(path);
        let mut entries = write_lock(&self.entries);

        // Walk from the root and create every missing component
        let mut built = PathBuf::new();
        for component in key.components() {
            built.push(component);
            match entries.get(&built) {
                Some(node) if !read_lock(node).is_dir() => {
                    return Err(FsError::NotADirectory {
                        op: "mkdir",
                        path: path.to_path_buf(),
                    }
                    .into());
                }
                Some(_) => {}
                None => {
                    entries.insert(
                        built.clone(),
                        Arc::new(RwLock::new(Node::new(EntryType::Directory, mode))),
                    );
                    trace!(path = %built.display(), "directory created");
                }
            }
        }
        Ok(())
    }

    fn remove(&self, name: &Path) -> Result<()> {
        let key = self.to_inner(name);
        if utils::is_virtual_root(&key) {
            return Err(FsError::InvalidInput {
                op: "remove",
                path: name.to_path_buf(),
                reason: "the root cannot be removed",
            }
            .into());
        }

        let mut entries = write_lock(&self.entries);
        let Some(node) = entries.get(&key) else {
            return Err(FsError::not_exist("remove", name).into());
        };
        if read_lock(node).is_dir() && has_children(&entries, &key) {
            return Err(FsError::DirectoryNotEmpty {
                op: "remove",
                path: name.to_path_buf(),
            }
            .into());
        }

        entries.remove(&key);
        trace!(path = %key.display(), "removed");
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let key = self.to_inner(path);
        let mut entries = write_lock(&self.entries);

        let removed: Vec<PathBuf> = entries
            .keys()
            .filter(|&p| p.starts_with(&key) && !utils::is_virtual_root(p))
            .cloned()
            .collect();

        for p in &removed {
            entries.remove(p);
        }
        if !removed.is_empty() {
            trace!(path = %key.display(), count = removed.len(), "removed recursively");
        }
        Ok(())
    }

    fn rename(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        let from = self.to_inner(old_name);
        let to = self.to_inner(new_name);
        let mut entries = write_lock(&self.entries);

        let Some(source) = entries.get(&from).cloned() else {
            return Err(FsError::not_exist("rename", old_name).into());
        };
        if from == to {
            return Ok(());
        }
        if utils::is_virtual_root(&from) || utils::is_virtual_root(&to) {
            return Err(FsError::InvalidInput {
                op: "rename",
                path: old_name.to_path_buf(),
                reason: "the root cannot be moved",
            }
            .into());
        }
        if to.starts_with(&from) {
            return Err(FsError::InvalidInput {
                op: "rename",
                path: new_name.to_path_buf(),
                reason: "cannot move a directory into itself",
            }
            .into());
        }
        Self::check_parent(&entries, "rename", new_name, &to)?;

        let source_is_dir = read_lock(&source).is_dir();
        if let Some(target) = entries.get(&to) {
            let target_is_dir = read_lock(target).is_dir();
            if target_is_dir && !source_is_dir {
                return Err(FsError::IsADirectory {
                    op: "rename",
                    path: new_name.to_path_buf(),
                }
                .into());
            }
            if !target_is_dir && source_is_dir {
                return Err(FsError::NotADirectory {
                    op: "rename",
                    path: new_name.to_path_buf(),
                }
                .into());
            }
            if target_is_dir && has_children(&entries, &to) {
                return Err(FsError::DirectoryNotEmpty {
                    op: "rename",
                    path: new_name.to_path_buf(),
                }
                .into());
            }
            entries.remove(&to);
        }

        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|&p| p.starts_with(&from))
            .cloned()
            .collect();

        for old_key in moved {
            if let Some(node) = entries.remove(&old_key) {
                let rest = old_key.strip_prefix(&from)?;
                let new_key = if rest.as_os_str().is_empty() {
                    to.clone()
                } else {
                    to.join(rest)
                };
                entries.insert(new_key, node);
            }
        }
        trace!(from = %from.display(), to = %to.display(), "renamed");
        Ok(())
    }

    fn stat(&self, name: &Path) -> Result<Metadata> {
        let key = self.to_inner(name);
        let node = self.node("stat", name)?;
        let meta = read_lock(&node).metadata(&base_name(&key));
        Ok(meta)
    }

    fn chmod(&self, name: &Path, mode: u32) -> Result<()> {
        let node = self.node("chmod", name)?;
        write_lock(&node).mode = mode & 0o7777;
        Ok(())
    }

    fn chown(&self, name: &Path, uid: u32, gid: u32) -> Result<()> {
        let node = self.node("chown", name)?;
        let mut guard = write_lock(&node);
        guard.uid = uid;
        guard.gid = gid;
        Ok(())
    }

    fn chtimes(&self, name: &Path, accessed: SystemTime, modified: SystemTime) -> Result<()> {
        let node = self.node("chtimes", name)?;
        let mut guard = write_lock(&node);
        guard.accessed = accessed;
        guard.modified = modified;
        Ok(())
    }
}

/// Handle to a `MapFS` file or directory.
pub struct MapFile {
    name: PathBuf,
    key: PathBuf,
    node: Arc<RwLock<Node>>,
    entries: Arc<RwLock<Nodes>>,
    flags: OpenFlags,
    pos: u64,
    dir_read: bool,
}

impl MapFile {
    fn is_readable(&self) -> bool {
        self.flags.read || !self.flags.is_writable()
    }

    fn denied(&self, op: &'static str) -> io::Error {
        FsError::PermissionDenied {
            op,
            path: self.name.clone(),
        }
        .into()
    }

    fn is_a_directory(&self, op: &'static str) -> io::Error {
        FsError::IsADirectory {
            op,
            path: self.name.clone(),
        }
        .into()
    }
}

impl Read for MapFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.is_readable() {
            return Err(self.denied("read"));
        }
        let node = read_lock(&self.node);
        if node.is_dir() {
            return Err(self.is_a_directory("read"));
        }

        let len = node.data.len();
        let start = usize::try_from(self.pos).unwrap_or(usize::MAX).min(len);
        let count = buf.len().min(len - start);
        buf[..count].copy_from_slice(&node.data[start..start + count]);
        self.pos += count as u64;
        Ok(count)
    }
}

impl Write for MapFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.flags.is_writable() {
            return Err(self.denied("write"));
        }
        let mut node = write_lock(&self.node);
        if node.is_dir() {
            return Err(self.is_a_directory("write"));
        }

        if self.flags.append {
            self.pos = node.data.len() as u64;
        }
        let end = usize::try_from(self.pos)
            .ok()
            .and_then(|start| start.checked_add(buf.len()))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        let start = end - buf.len();
        let cur_len = node.data.len();
        if cur_len < end {
            node.data
                .try_reserve(end - cur_len)
                .map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;
            node.data.resize(end, 0);
        }
        node.data[start..end].copy_from_slice(buf);
        node.modified = SystemTime::now();
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MapFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = read_lock(&self.node).data.len() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(offset) => len + offset as i128,
            SeekFrom::Current(offset) => self.pos as i128 + offset as i128,
        };
        if target < 0 || target > u64::MAX as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl File for MapFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn stat(&self) -> Result<Metadata> {
        Ok(read_lock(&self.node).metadata(&base_name(&self.key)))
    }

    fn read_dir(&mut self) -> Result<Vec<Box<dyn DirEntry>>> {
        if !read_lock(&self.node).is_dir() {
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

        let entries = read_lock(&self.entries);
        let children = entries
            .iter()
            .filter(|(path, _)| path.parent() == Some(self.key.as_path()))
            .map(|(path, node)| {
                let name = base_name(path);
                let meta = read_lock(node).metadata(&name);
                Box::new(FsDirEntry::new(self.name.join(&name), meta)) as Box<dyn DirEntry>
            })
            .collect();
        Ok(children)
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        if !self.flags.is_writable() {
            return Err(self.denied("truncate").into());
        }
        let mut node = write_lock(&self.node);
        if node.is_dir() {
            return Err(self.is_a_directory("truncate").into());
        }
        let size = usize::try_from(size)?;
        if size > node.data.len() {
            let additional = size - node.data.len();
            node.data.try_reserve(additional)?;
        }
        node.data.resize(size, 0);
        node.modified = SystemTime::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::is_not_exist;
    use crate::core::ext::FsBackendExt;

    /// Helper function to set up a test VFS with a predefined structure
    fn setup_test_vfs() -> MapFS {
        let vfs = MapFS::new();

        vfs.mkdir_all(Path::new("/home/user"), 0o755).unwrap();
        vfs.mkdir(Path::new("/etc"), 0o755).unwrap();
        vfs.write(Path::new("/home/user/config.txt"), b"Config content")
            .unwrap();

        vfs
    }

    mod creations {
        use super::*;

        #[test]
        fn test_new_map_fs() {
            let fs = MapFS::new();
            assert_eq!(fs.name(), "MapFS");
            assert!(fs.stat(Path::new("/")).unwrap().is_dir());
            assert_eq!(read_lock(&fs.entries).len(), 1);
        }

        #[test]
        fn test_relative_paths_are_rooted() -> Result<()> {
            let fs = MapFS::new();
            fs.mkdir_all(Path::new("a/b"), 0o755)?;
            assert!(fs.is_dir(Path::new("/a/b"))?);
            assert!(fs.is_dir(Path::new("a/./b/"))?);
            Ok(())
        }

        #[test]
        fn test_parent_dirs_do_not_escape_root() -> Result<()> {
            let fs = MapFS::new();
            fs.mkdir(Path::new("/../../docs"), 0o755)?;
            assert!(fs.is_dir(Path::new("/docs"))?);
            Ok(())
        }
    }

    mod mkdir {
        use super::*;

        #[test]
        fn test_mkdir_create_single_dir() -> Result<()> {
            let fs = MapFS::new();
            fs.mkdir(Path::new("/projects"), 0o750)?;
            let meta = fs.stat(Path::new("/projects"))?;
            assert!(meta.is_dir());
            assert_eq!(meta.permissions(), 0o750);
            Ok(())
        }

        #[test]
        fn test_mkdir_already_exists() {
            let fs = setup_test_vfs();
            let err = fs.mkdir(Path::new("/etc"), 0o755).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::AlreadyExists { .. })
            ));
        }

        #[test]
        fn test_mkdir_missing_parent() {
            let fs = MapFS::new();
            let err = fs.mkdir(Path::new("/a/b"), 0o755).unwrap_err();
            assert!(is_not_exist(&err));
        }

        #[test]
        fn test_mkdir_all_nested_path() -> Result<()> {
            let fs = MapFS::new();
            fs.mkdir_all(Path::new("/a/b/c"), 0o755)?;
            assert!(fs.is_dir(Path::new("/a"))?);
            assert!(fs.is_dir(Path::new("/a/b"))?);
            assert!(fs.is_dir(Path::new("/a/b/c"))?);
            Ok(())
        }

        #[test]
        fn test_mkdir_all_existing_is_ok() -> Result<()> {
            let fs = setup_test_vfs();
            fs.mkdir_all(Path::new("/home/user"), 0o755)?;
            fs.mkdir_all(Path::new("/"), 0o755)?;
            Ok(())
        }

        #[test]
        fn test_mkdir_all_file_in_path() {
            let fs = setup_test_vfs();
            let err = fs
                .mkdir_all(Path::new("/home/user/config.txt/sub"), 0o755)
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::NotADirectory { .. })
            ));
        }
    }

    mod open_file {
        use super::*;

        #[test]
        fn test_create_and_read_back() -> Result<()> {
            let fs = MapFS::new();
            let mut file = fs.create(Path::new("/note.txt"))?;
            file.write_all(b"Hello")?;
            file.seek(SeekFrom::Start(0))?;

            let mut content = String::new();
            file.read_to_string(&mut content)?;
            assert_eq!(content, "Hello");
            assert_eq!(fs.read(Path::new("/note.txt"))?, b"Hello");
            Ok(())
        }

        #[test]
        fn test_create_truncates_existing() -> Result<()> {
            let fs = setup_test_vfs();
            fs.create(Path::new("/home/user/config.txt"))?;
            assert!(fs.read(Path::new("/home/user/config.txt"))?.is_empty());
            Ok(())
        }

        #[test]
        fn test_open_missing_file() {
            let fs = MapFS::new();
            let err = fs.open(Path::new("/missing.txt")).unwrap_err();
            assert!(is_not_exist(&err));
        }

        #[test]
        fn test_open_without_parent() {
            let fs = MapFS::new();
            let err = fs.create(Path::new("/no/such/file.txt")).unwrap_err();
            assert!(is_not_exist(&err));
        }

        #[test]
        fn test_create_new_fails_on_existing() {
            let fs = setup_test_vfs();
            let flags = OpenFlags::write_only().create_new();
            let err = fs
                .open_file(Path::new("/home/user/config.txt"), flags, 0o600)
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::AlreadyExists { .. })
            ));
        }

        #[test]
        fn test_open_directory_for_writing() {
            let fs = setup_test_vfs();
            let err = fs
                .open_file(Path::new("/etc"), OpenFlags::write_only(), 0)
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::IsADirectory { .. })
            ));
        }

        #[test]
        fn test_write_to_read_only_handle() -> Result<()> {
            let fs = setup_test_vfs();
            let mut file = fs.open(Path::new("/home/user/config.txt"))?;
            let err = file.write(b"nope").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
            Ok(())
        }

        #[test]
        fn test_append_mode() -> Result<()> {
            let fs = setup_test_vfs();
            fs.append(Path::new("/home/user/config.txt"), b" + appended")?;
            assert_eq!(
                fs.read(Path::new("/home/user/config.txt"))?,
                b"Config content + appended"
            );
            Ok(())
        }

        #[test]
        fn test_handle_name_is_path_as_given() -> Result<()> {
            let fs = setup_test_vfs();
            let file = fs.open(Path::new("/home/./user/config.txt"))?;
            assert_eq!(file.name(), Path::new("/home/./user/config.txt"));
            Ok(())
        }

        #[test]
        fn test_seek_and_overwrite() -> Result<()> {
            let fs = MapFS::new();
            let mut file = fs.create(Path::new("/data.bin"))?;
            file.write_all(b"abcdef")?;
            file.seek(SeekFrom::End(-2))?;
            file.write_all(b"XYZ")?;
            assert_eq!(fs.read(Path::new("/data.bin"))?, b"abcdXYZ");

            assert!(file.seek(SeekFrom::Current(-100)).is_err());
            Ok(())
        }

        #[test]
        fn test_write_past_addressable_offset_fails() -> Result<()> {
            let fs = MapFS::new();
            let mut file = fs.create(Path::new("/far.bin"))?;

            file.seek(SeekFrom::Start(u64::MAX))?;
            let err = file.write(b"x").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

            file.seek(SeekFrom::Start(1 << 63))?;
            assert!(file.write(b"x").is_err());

            assert!(file.truncate(u64::MAX).is_err());
            assert!(fs.read(Path::new("/far.bin"))?.is_empty());
            Ok(())
        }

        #[test]
        fn test_truncate_handle() -> Result<()> {
            let fs = setup_test_vfs();
            let mut file = fs.open_file(
                Path::new("/home/user/config.txt"),
                OpenFlags::read_write(),
                0,
            )?;
            file.truncate(6)?;
            assert_eq!(file.stat()?.len(), 6);
            assert_eq!(fs.read(Path::new("/home/user/config.txt"))?, b"Config");
            Ok(())
        }
    }

    mod remove {
        use super::*;

        #[test]
        fn test_remove_file() -> Result<()> {
            let fs = setup_test_vfs();
            fs.remove(Path::new("/home/user/config.txt"))?;
            assert!(!fs.exists(Path::new("/home/user/config.txt"))?);
            Ok(())
        }

        #[test]
        fn test_remove_non_empty_dir() {
            let fs = setup_test_vfs();
            let err = fs.remove(Path::new("/home")).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::DirectoryNotEmpty { .. })
            ));
        }

        #[test]
        fn test_remove_missing() {
            let fs = MapFS::new();
            assert!(is_not_exist(&fs.remove(Path::new("/ghost")).unwrap_err()));
        }

        #[test]
        fn test_remove_root_refused() {
            let fs = MapFS::new();
            assert!(fs.remove(Path::new("/")).is_err());
        }

        #[test]
        fn test_remove_all_subtree() -> Result<()> {
            let fs = setup_test_vfs();
            fs.remove_all(Path::new("/home"))?;
            assert!(!fs.exists(Path::new("/home"))?);
            assert!(!fs.exists(Path::new("/home/user/config.txt"))?);
            assert!(fs.exists(Path::new("/etc"))?);
            Ok(())
        }

        #[test]
        fn test_remove_all_missing_is_ok() -> Result<()> {
            let fs = MapFS::new();
            fs.remove_all(Path::new("/ghost"))?;
            Ok(())
        }

        #[test]
        fn test_remove_all_root_keeps_root() -> Result<()> {
            let fs = setup_test_vfs();
            fs.remove_all(Path::new("/"))?;
            assert!(fs.is_dir(Path::new("/"))?);
            assert!(fs.read_dir(Path::new("/"))?.is_empty());
            Ok(())
        }

        #[test]
        fn test_remove_all_does_not_touch_siblings_with_common_prefix() -> Result<()> {
            let fs = MapFS::new();
            fs.mkdir_all(Path::new("/data"), 0o755)?;
            fs.mkdir_all(Path::new("/database"), 0o755)?;
            fs.remove_all(Path::new("/data"))?;
            assert!(fs.exists(Path::new("/database"))?);
            Ok(())
        }
    }

    mod rename {
        use super::*;

        #[test]
        fn test_rename_file() -> Result<()> {
            let fs = setup_test_vfs();
            fs.rename(Path::new("/home/user/config.txt"), Path::new("/etc/config.txt"))?;
            assert!(!fs.exists(Path::new("/home/user/config.txt"))?);
            assert_eq!(fs.read(Path::new("/etc/config.txt"))?, b"Config content");
            Ok(())
        }

        #[test]
        fn test_rename_directory_moves_children() -> Result<()> {
            let fs = setup_test_vfs();
            fs.rename(Path::new("/home"), Path::new("/house"))?;
            assert!(fs.is_file(Path::new("/house/user/config.txt"))?);
            assert!(!fs.exists(Path::new("/home"))?);
            Ok(())
        }

        #[test]
        fn test_rename_replaces_file() -> Result<()> {
            let fs = setup_test_vfs();
            fs.write(Path::new("/etc/other.txt"), b"other")?;
            fs.rename(Path::new("/etc/other.txt"), Path::new("/home/user/config.txt"))?;
            assert_eq!(fs.read(Path::new("/home/user/config.txt"))?, b"other");
            Ok(())
        }

        #[test]
        fn test_rename_into_itself() {
            let fs = setup_test_vfs();
            assert!(
                fs.rename(Path::new("/home"), Path::new("/home/user/home"))
                    .is_err()
            );
        }

        #[test]
        fn test_rename_missing_source() {
            let fs = MapFS::new();
            let err = fs
                .rename(Path::new("/ghost"), Path::new("/spirit"))
                .unwrap_err();
            assert!(is_not_exist(&err));
        }
    }

    mod attributes {
        use super::*;
        use std::time::Duration;

        #[test]
        fn test_stat_reports_base_name_and_len() -> Result<()> {
            let fs = setup_test_vfs();
            let meta = fs.stat(Path::new("/home/user/config.txt"))?;
            assert_eq!(meta.name(), "config.txt");
            assert_eq!(meta.len(), 14);
            assert!(meta.is_file());
            Ok(())
        }

        #[test]
        fn test_chmod_chown_chtimes() -> Result<()> {
            let fs = setup_test_vfs();
            let path = Path::new("/home/user/config.txt");
            let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);

            fs.chmod(path, 0o100600)?;
            fs.chown(path, 1000, 100)?;
            fs.chtimes(path, stamp, stamp)?;

            let meta = fs.stat(path)?;
            assert_eq!(meta.permissions(), 0o600);
            assert_eq!((meta.uid(), meta.gid()), (1000, 100));
            assert_eq!(meta.modified(), stamp);
            assert_eq!(meta.accessed(), stamp);
            Ok(())
        }

        #[test]
        fn test_lstat_falls_back_to_stat() -> Result<()> {
            let fs = setup_test_vfs();
            let (meta, used_lstat) = fs.lstat_if_possible(Path::new("/etc"))?;
            assert!(meta.is_dir());
            assert!(!used_lstat);
            Ok(())
        }

        #[test]
        fn test_symlinks_unsupported() {
            let fs = setup_test_vfs();
            let err = fs
                .symlink_if_possible(Path::new("/etc"), Path::new("/link"))
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::Unsupported { .. })
            ));
            assert!(fs.readlink_if_possible(Path::new("/etc")).is_err());
        }
    }

    mod read_dir {
        use super::*;

        #[test]
        fn test_read_dir_lists_immediate_children_sorted() -> Result<()> {
            let fs = setup_test_vfs();
            fs.write(Path::new("/b.txt"), b"")?;
            let names: Vec<String> = fs
                .read_dir(Path::new("/"))?
                .iter()
                .map(|e| e.name().to_string())
                .collect();
            assert_eq!(names, ["b.txt", "etc", "home"]);
            Ok(())
        }

        #[test]
        fn test_entry_paths_follow_requested_dir() -> Result<()> {
            let fs = setup_test_vfs();
            let entries = fs.read_dir(Path::new("/home/user"))?;
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].path(), Path::new("/home/user/config.txt"));
            assert!(entries[0].is_file());
            Ok(())
        }

        #[test]
        fn test_read_dir_handle_is_consumed_once() -> Result<()> {
            let fs = setup_test_vfs();
            let mut dir = fs.open(Path::new("/home"))?;
            assert_eq!(dir.read_dir_names()?, ["user"]);
            assert!(dir.read_dir()?.is_empty());
            Ok(())
        }

        #[test]
        fn test_read_dir_on_file() {
            let fs = setup_test_vfs();
            let err = fs.read_dir(Path::new("/home/user/config.txt")).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::NotADirectory { .. })
            ));
        }

        #[test]
        fn test_reading_directory_handle_fails() -> Result<()> {
            let fs = setup_test_vfs();
            let mut dir = fs.open(Path::new("/home"))?;
            let mut buf = Vec::new();
            let err = dir.read_to_end(&mut buf).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::IsADirectory);
            Ok(())
        }
    }

    mod concurrency {
        use super::*;
        use std::thread;

        #[test]
        fn test_parallel_writers() -> Result<()> {
            let fs = Arc::new(MapFS::new());
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let fs = Arc::clone(&fs);
                    thread::spawn(move || {
                        let dir = PathBuf::from(format!("/worker{i}"));
                        fs.mkdir_all(&dir, 0o755).unwrap();
                        fs.write(&dir.join("out.txt"), format!("{i}").as_bytes())
                            .unwrap();
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(fs.read_dir(Path::new("/"))?.len(), 8);
            assert_eq!(fs.read(Path::new("/worker3/out.txt"))?, b"3");
            Ok(())
        }
    }
}
