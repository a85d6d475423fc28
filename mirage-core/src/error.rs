use thiserror::Error;

pub type MirageResult<T> = Result<T, MirageError>;

#[derive(Error, Debug)]
pub enum MirageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
