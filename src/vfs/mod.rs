mod base_path_fs;
mod dir_entry;
mod entry;
mod map_fs;
mod os_fs;

pub use base_path_fs::{BasePathDirEntry, BasePathFS, BasePathFile};
pub use dir_entry::FsDirEntry;
pub use entry::{EntryType, Metadata};
pub use map_fs::{MapFS, MapFile};
pub use os_fs::{OsFS, OsFile};
