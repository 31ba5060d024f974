use std::path::{Path, PathBuf};

use crate::core::DirEntry;
use crate::vfs::Metadata;

/// Directory entry produced by the concrete backends.
#[derive(Debug, Clone, PartialEq)]
pub struct FsDirEntry {
    path: PathBuf,
    metadata: Metadata,
}

impl FsDirEntry {
    /// `path` is the full path of the entry in the namespace of the backend that listed it.
    pub fn new<P: AsRef<Path>>(path: P, metadata: Metadata) -> FsDirEntry {
        FsDirEntry {
            path: path.as_ref().to_path_buf(),
            metadata,
        }
    }
}

impl DirEntry for FsDirEntry {
    fn name(&self) -> &str {
        self.metadata.name()
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
