//! Error types for host image discovery

/// Error type for image discovery and rebasing
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The loaded image of the current process could not be located
    #[error("Host image not found: {0}")]
    NotFound(String),

    /// No image discovery is implemented for this platform
    #[error("Image discovery is not supported on this platform")]
    Unsupported,

    /// Image globals already initialized
    #[error("Host image already initialized")]
    AlreadyInitialized,
}
