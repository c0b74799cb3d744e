use postman_db::DatabaseError;
use postman_providers::ProviderError;

/// A type that represents an error that occurred during indexing.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// An error occurred while interacting with the database.
    #[error("indexing failed due to database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    /// An error occurred while fetching logs from the chain.
    #[error("indexing failed due to provider error: {0}")]
    ProviderError(#[from] ProviderError),
}

impl IndexerError {
    /// Returns true if the indexing loop cannot make progress anymore. Both the store and the log
    /// source recover on their own, the failed range is retried on the next tick.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::DatabaseError(_) | Self::ProviderError(_) => false,
        }
    }
}
