use roam_types::models::PairError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database lock poisoned")]
    Poisoned,
}

impl From<PairError> for StoreError {
    fn from(e: PairError) -> Self {
        Self::Validation(e.to_string())
    }
}
