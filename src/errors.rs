use std::{io, path::PathBuf};

/// Error type shared by every trash store operation.
#[derive(thiserror::Error, Debug)]
pub enum TrashError {
    /// The referenced trash name or source path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Restoring would overwrite an existing entry.
    #[error("file already exists at original location: {}", .0.display())]
    Conflict(PathBuf),

    /// A path could not be made absolute or names nothing that can be trashed.
    #[error("cannot resolve path {}: {reason}", .path.display())]
    PathResolution { path: PathBuf, reason: String },

    /// Directory creation, move or delete failed at the filesystem level.
    #[error("I/O error while accessing {}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A metadata record or config document could not be produced or parsed.
    #[error("malformed record {}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration key or value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrashError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(path: impl Into<PathBuf>) -> Self {
        Self::Conflict(path.into())
    }

    pub fn unresolvable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// True for a `Storage` error whose underlying cause is a missing entry.
    pub fn is_missing_entry(&self) -> bool {
        matches!(self, Self::Storage { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, TrashError>;
