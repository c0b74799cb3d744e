use std::time::Duration;

use alloy_primitives::Bytes;

/// The reason a contract call or transaction reverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// The claim would exceed the destination rate limiter.
    RateLimitExceeded,
    /// The message was claimed already.
    MessageAlreadyClaimed,
    /// Any other revert, along with the raw revert data.
    Other(Bytes),
}

/// An error returned by a chain collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The request could not reach the node.
    #[error("transport error: {0}")]
    Transport(String),
    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The node rate limited the request.
    #[error("request rate limited by the node")]
    RateLimited,
    /// The call reverted.
    #[error("execution reverted: {0:?}")]
    Reverted(RevertReason),
    /// The node refused the transaction nonce.
    #[error("nonce error: {0}")]
    Nonce(String),
    /// The node definitively rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The node returned a response that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Returns true if retrying the same request later may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_) | Self::RateLimited)
    }

    /// Returns true if a broadcast failing with this error certainly did not reach the mempool.
    pub const fn is_definitive_rejection(&self) -> bool {
        matches!(self, Self::Reverted(_) | Self::Nonce(_) | Self::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(ProviderError::RateLimited.is_transient());
        assert!(!ProviderError::Reverted(RevertReason::RateLimitExceeded).is_transient());

        assert!(ProviderError::Rejected("underpriced".into()).is_definitive_rejection());
        assert!(!ProviderError::Transport("reset".into()).is_definitive_rejection());
        assert!(!ProviderError::InvalidResponse("garbage".into()).is_definitive_rejection());
    }
}
