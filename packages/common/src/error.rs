use thiserror::Error;

/// Errors raised by storage backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the formatting service
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unsupported parser: {0}")]
    UnsupportedParser(String),

    #[error("format failed: {0}")]
    Failed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type FormatResult<T> = Result<T, FormatError>;
