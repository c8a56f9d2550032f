//! Error types for the buildcontext crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while matching or hashing a build context
#[derive(Error, Debug)]
pub enum Error {
    /// The context root does not exist or is not a directory
    #[error("build context does not exist: {}", .0.display())]
    ContextNotFound(PathBuf),

    /// The ignore file exists but could not be read
    #[error("unable to read ignore file {}: {source}", .path.display())]
    ReadIgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An ignore pattern could not be compiled
    #[error("invalid ignore pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Directory traversal failed
    #[error("failed to walk build context: {0}")]
    Walk(#[from] walkdir::Error),

    /// A file in the context could not be read
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for build context operations
pub type Result<T> = std::result::Result<T, Error>;
