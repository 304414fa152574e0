use thiserror::Error;

/// Library-wide error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Process-wide store root queried before being set.
    #[error("The store root is not set. Call registry::set_root() at startup.")]
    NotConfigured,

    /// Malformed relative path, leaf name, root path, or URL.
    #[error("{0}")]
    InvalidArgument(String),

    /// The referenced path does not exist under the store root.
    #[error("The file/dir {path} does not exist")]
    NotFound {
        /// Path relative to the store root, as supplied by the caller.
        path: String,
    },

    /// The target exists but is not readable.
    #[error("The file/dir {path} is not readable. Please check the filesystem permissions")]
    PermissionDenied {
        /// Path relative to the store root, as supplied by the caller.
        path: String,
    },

    /// The path resolved outside the store root.
    #[error("The path {path} resolves outside the store root")]
    EscapesRoot {
        /// The offending path as supplied by the caller.
        path: String,
    },

    /// Operation-specific failure: creation collision, failed rename,
    /// extension requested on a directory, download transport failure.
    #[error("{0}")]
    Runtime(String),
}

impl StoreError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        StoreError::InvalidArgument(message.into())
    }

    pub(crate) fn runtime<S: Into<String>>(message: S) -> Self {
        StoreError::Runtime(message.into())
    }
}
