use thiserror::Error;

/// Failures while building CPU-side resources or resolving assets.
#[derive(Error, Debug)]
pub enum AssetError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    Decode(String),

    /// A vertex attribute array does not describe the same vertex count as positions.
    #[error("Attribute '{attribute}' has {found} entries, expected {expected}")]
    AttributeCountMismatch {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    /// An index addresses a vertex that does not exist.
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// Background decode task did not complete.
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl From<image::ImageError> for AssetError {
    fn from(err: image::ImageError) -> Self {
        AssetError::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AssetError {
    fn from(err: tokio::task::JoinError) -> Self {
        AssetError::TaskJoin(err.to_string())
    }
}

/// Alias for `Result<T, AssetError>`.
pub type Result<T> = std::result::Result<T, AssetError>;
