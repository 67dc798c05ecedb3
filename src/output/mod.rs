//! Artifact output naming

pub mod path;

pub use path::OutputPathBuilder;

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
