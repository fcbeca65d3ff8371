/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing exists at the requested path.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A directory was found where an object was expected.
    #[error("not an object: {0}")]
    IsADirectory(String),

    /// An object was found where a directory was expected.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The path cannot be mapped into the store namespace.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
