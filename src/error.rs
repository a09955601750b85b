//! Error taxonomy for the engine.
//!
//! Every failure is attributable to a specific path or operation. Batch
//! operations collect these per entry instead of aborting on the first one.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::watcher::Pane;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("failed to establish watch on {path}: {source}")]
    WatchInit {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("no active watch for the {0} pane")]
    NoActiveWatch(Pane),

    #[error("{path} is outside the watch root {root}")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Maps an io error to the taxonomy, keeping the path it occurred on.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => EngineError::NotFound(path),
            io::ErrorKind::AlreadyExists => EngineError::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => EngineError::PermissionDenied(path),
            _ => EngineError::Io { path, source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_taxonomy() {
        let err = EngineError::from_io("/tmp/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = EngineError::from_io("/tmp/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, EngineError::PermissionDenied(_)));

        let err = EngineError::from_io("/tmp/x", io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(matches!(err, EngineError::AlreadyExists(_)));
    }

    #[test]
    fn other_io_errors_keep_the_path() {
        let err = EngineError::from_io("/tmp/x", io::Error::from(io::ErrorKind::Other));
        assert_eq!(err.to_string().split(':').next(), Some("/tmp/x"));
    }
}
