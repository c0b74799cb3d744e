use postman_db::DatabaseError;
use postman_providers::ProviderError;
use postman_signer::SignerError;

/// An error that occurred in one of the claiming loops.
#[derive(Debug, thiserror::Error)]
pub enum ClaimerError {
    /// An error occurred while interacting with the database.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    /// An error occurred while interacting with a chain.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// The nonce manager failed.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
    /// The sampled priority fee is above the configured fee cap.
    #[error("max priority fee per gas {priority_fee} is above the max fee per gas cap {cap}")]
    PriorityFeeAboveCap {
        /// The sampled priority fee.
        priority_fee: u128,
        /// The configured cap.
        cap: u128,
    },
}

impl ClaimerError {
    /// Returns true if the loop must stop until an operator intervenes.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::PriorityFeeAboveCap { .. } => true,
            Self::Signer(err) => err.is_fatal(),
            Self::Database(_) | Self::Provider(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(ClaimerError::PriorityFeeAboveCap { priority_fee: 2, cap: 1 }.is_fatal());
        let drift = SignerError::NonceDrift { chain: 1, persisted: 20, max_diff: 5 };
        assert!(ClaimerError::Signer(drift).is_fatal());
        assert!(!ClaimerError::Signer(SignerError::Resync(ProviderError::RateLimited)).is_fatal());
        assert!(!ClaimerError::Signer(SignerError::ReplyChannelClosed).is_fatal());
        assert!(!ClaimerError::Provider(ProviderError::RateLimited).is_fatal());
    }
}
