//! Error types for gemtrace.
//!
//! Only construction, configuration and IO paths return errors. Per-fragment
//! shading never fails: numerical degeneracies are clamped in place.

use thiserror::Error;

/// Main error type for gemtrace operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh topology or attribute arrays are inconsistent
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Triangle references a vertex that does not exist
    #[error("Triangle {triangle} references vertex {index} (vertex count: {count})")]
    IndexOutOfBounds {
        triangle: usize,
        index: u32,
        count: usize,
    },

    /// Gem material parameter rejected at configuration time
    #[error("Invalid material parameter `{param}`: {reason}")]
    InvalidMaterial { param: &'static str, reason: String },

    /// Scene description is malformed
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Procedural shape name not recognised
    #[error("Unknown shape: {0}")]
    UnknownShape(String),

    /// Environment map has no texels or mismatched dimensions
    #[error("Invalid environment map: {0}")]
    InvalidEnvironment(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid mesh error.
    pub fn mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Create an invalid material error for the named parameter.
    pub fn material(param: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidMaterial {
            param,
            reason: reason.into(),
        }
    }
}

/// Result type alias for gemtrace operations.
pub type Result<T> = std::result::Result<T, Error>;
