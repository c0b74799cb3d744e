use postman_db::DatabaseError;
use postman_providers::ProviderError;

/// An enum representing the errors that can occur in the nonce manager.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The provider failed to sign or broadcast.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// The persisted nonce could not be read.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    /// The next nonce could not be read from the chain, nothing was signed.
    #[error("failed to read the next nonce: {0}")]
    Resync(ProviderError),
    /// The broadcast on `nonce` failed without a definitive answer from the node.
    #[error("broadcast on nonce {nonce} has an unknown outcome: {source}")]
    Unconfirmed {
        /// The nonce the transaction was signed with.
        nonce: u64,
        /// The provider error.
        source: ProviderError,
    },
    /// The persisted nonce is too far ahead of the chain nonce.
    #[error("persisted nonce {persisted} is more than {max_diff} ahead of chain nonce {chain}")]
    NonceDrift {
        /// The next nonce according to the chain.
        chain: u64,
        /// The last nonce persisted in the database.
        persisted: u64,
        /// The maximum tolerated difference.
        max_diff: u64,
    },
    /// The nonce manager request channel was closed.
    #[error("Request channel closed")]
    RequestChannelClosed,
    /// The nonce manager dropped the reply channel.
    #[error("Reply channel closed")]
    ReplyChannelClosed,
}

impl SignerError {
    /// Returns true if the nonce manager cannot recover from the error without operator action.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::NonceDrift { .. } | Self::RequestChannelClosed)
    }

    /// Returns true if the transaction certainly did not reach the network.
    pub const fn is_definitive_rejection(&self) -> bool {
        match self {
            Self::Provider(err) => err.is_definitive_rejection(),
            Self::Database(_) |
            Self::Resync(_) |
            Self::NonceDrift { .. } |
            Self::RequestChannelClosed => true,
            Self::Unconfirmed { .. } | Self::ReplyChannelClosed => false,
        }
    }

    /// Returns the nonce of a transaction that may have reached the network.
    pub const fn unconfirmed_nonce(&self) -> Option<u64> {
        match self {
            Self::Unconfirmed { nonce, .. } => Some(*nonce),
            _ => None,
        }
    }
}
