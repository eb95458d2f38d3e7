use thiserror::Error;

#[derive(Debug, Error)]
pub enum IlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dotscope error: {0}")]
    Dotscope(#[from] dotscope::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported metadata shape: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, IlError>;
