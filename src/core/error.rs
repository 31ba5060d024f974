use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Typed filesystem conditions raised by the backends and the base-path proxy.
///
/// Values travel inside `anyhow::Error`; use [`is_not_exist`] or
/// `downcast_ref::<FsError>()` to inspect them.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{op} {}: file does not exist", path.display())]
    NotExist { op: &'static str, path: PathBuf },

    #[error("{op} {}: file already exists", path.display())]
    AlreadyExists { op: &'static str, path: PathBuf },

    #[error("{op} {}: not a directory", path.display())]
    NotADirectory { op: &'static str, path: PathBuf },

    #[error("{op} {}: is a directory", path.display())]
    IsADirectory { op: &'static str, path: PathBuf },

    #[error("{op} {}: directory not empty", path.display())]
    DirectoryNotEmpty { op: &'static str, path: PathBuf },

    #[error("{op} {}: permission denied", path.display())]
    PermissionDenied { op: &'static str, path: PathBuf },

    #[error("{op} {}: {reason}", path.display())]
    InvalidInput {
        op: &'static str,
        path: PathBuf,
        reason: &'static str,
    },

    #[error("{op} {}: operation not supported", path.display())]
    Unsupported { op: &'static str, path: PathBuf },

    /// Lexical cleaning proved the target is not under the base path.
    #[error("real path is outside of the base path")]
    OutOfBounds,
}

impl FsError {
    pub fn not_exist(op: &'static str, path: impl Into<PathBuf>) -> Self {
        FsError::NotExist {
            op,
            path: path.into(),
        }
    }

    /// Maps the condition to the closest `std::io::ErrorKind`.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            FsError::NotExist { .. } | FsError::OutOfBounds => io::ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            FsError::NotADirectory { .. } => io::ErrorKind::NotADirectory,
            FsError::IsADirectory { .. } => io::ErrorKind::IsADirectory,
            FsError::DirectoryNotEmpty { .. } => io::ErrorKind::DirectoryNotEmpty,
            FsError::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            FsError::InvalidInput { .. } => io::ErrorKind::InvalidInput,
            FsError::Unsupported { .. } => io::ErrorKind::Unsupported,
        }
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Returns true if `err` reports a missing file.
///
/// Escapes from a base path count as missing too, so a caller cannot tell
/// "outside the jail" apart from "not present".
pub fn is_not_exist(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(fs_err) = cause.downcast_ref::<FsError>() {
            return fs_err.kind() == io::ErrorKind::NotFound;
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return io_err.kind() == io::ErrorKind::NotFound;
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_exist_detected_through_anyhow() {
        let err = anyhow::Error::from(FsError::not_exist("open", "/missing"));
        assert!(is_not_exist(&err));
        assert_eq!(err.to_string(), "open /missing: file does not exist");
    }

    #[test]
    fn test_out_of_bounds_reads_as_not_exist() {
        let err = anyhow::Error::from(FsError::OutOfBounds);
        assert!(is_not_exist(&err));
    }

    #[test]
    fn test_io_not_found_detected() {
        let err = anyhow::Error::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(is_not_exist(&err));
    }

    #[test]
    fn test_other_errors_are_not_missing() {
        let err = anyhow::Error::from(FsError::AlreadyExists {
            op: "mkdir",
            path: PathBuf::from("/docs"),
        });
        assert!(!is_not_exist(&err));

        let err = anyhow::anyhow!("something else");
        assert!(!is_not_exist(&err));
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let io_err: io::Error = FsError::IsADirectory {
            op: "read",
            path: PathBuf::from("/docs"),
        }
        .into();
        assert_eq!(io_err.kind(), io::ErrorKind::IsADirectory);
    }
}
