use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("explicit consent required before storing candidate data")]
    ConsentRequired,

    #[error("corrupt store data: {0}")]
    CorruptData(String),

    #[error("encryption key must not be empty")]
    InvalidKey,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
