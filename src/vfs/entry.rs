use std::time::SystemTime;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
}

/// Describes a file, as returned by `stat` and carried by directory entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    name: String,
    kind: EntryType,
    len: u64,
    mode: u32,
    modified: SystemTime,
    accessed: SystemTime,
    uid: u32,
    gid: u32,
}

impl Metadata {
    /// `name` is the base name of the file, never a full path.
    pub fn new(name: impl Into<String>, kind: EntryType) -> Metadata {
        Metadata {
            name: name.into(),
            kind,
            len: 0,
            mode: 0,
            modified: SystemTime::UNIX_EPOCH,
            accessed: SystemTime::UNIX_EPOCH,
            uid: 0,
            gid: 0,
        }
    }

    pub fn with_len(mut self, len: u64) -> Self {
        self.len = len;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_times(mut self, accessed: SystemTime, modified: SystemTime) -> Self {
        self.accessed = accessed;
        self.modified = modified;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_type(&self) -> EntryType {
        self.kind
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw mode bits as reported by the backend.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Permission bits only (`mode & 0o7777`).
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn accessed(&self) -> SystemTime {
        self.accessed
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryType::Symlink
    }
}
