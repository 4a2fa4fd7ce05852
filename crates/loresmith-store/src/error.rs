//! Error types for remote store access and preset persistence.

/// Errors returned by lorebook store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport-level failure reaching the store.
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("store rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    /// Decoding a store payload failed.
    #[error("store payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors returned by completion providers.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Transport-level failure reaching the completion service.
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The completion service answered with a non-success status.
    #[error("completion service rejected request ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Errors returned by the preset store.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
