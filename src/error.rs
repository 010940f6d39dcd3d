use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExceptionError>;

/// A type-erased error, as produced by downstream services and hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ExceptionError {
    #[error("Failed to build logger worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to read source file {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read page {page}: {source}")]
    PageRead {
        page: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Page path escapes the page root: {0}")]
    InvalidPage(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },
}

impl ExceptionError {
    pub fn invalid_config(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
        }
    }
}
