//! Error type shared by every stage of the frame pipeline.

use thiserror::Error;

/// Everything that can stop a movie run.
///
/// The variants follow the order in which the pipeline can fail: configuration
/// problems are detected before any file is touched, data errors come from
/// the results store, render errors from an individual frame.
#[derive(Debug, Error)]
pub enum MovieError {
    /// Invalid or contradictory options.
    #[error("configuration error: {0}")]
    Config(String),

    /// The results store was readable but its content is unusable.
    #[error("invalid results data: {0}")]
    Data(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "arrow")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "parquet")]
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Drawing or encoding a frame failed.
    #[error("failed to render frame {frame}: {message}")]
    Render { frame: usize, message: String },

    #[error("movie assembly failed: {0}")]
    Movie(String),
}

impl MovieError {
    pub fn config(msg: impl Into<String>) -> Self {
        MovieError::Config(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        MovieError::Data(msg.into())
    }

    pub fn render(frame: usize, err: impl std::fmt::Display) -> Self {
        MovieError::Render {
            frame,
            message: err.to_string(),
        }
    }

    /// True for errors raised while validating options.
    pub fn is_config(&self) -> bool {
        matches!(self, MovieError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, MovieError>;
