use crate::ProviderError;

use alloy_primitives::{Address, Bytes};
use postman_primitives::{Message, MessageProof, OnChainMessageStatus, RateLimitState};

/// An instance of the trait gives access to the destination message service.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait MessageServiceClient: Send + Sync {
    /// Returns the address of the destination message service.
    fn message_service(&self) -> Address;

    /// Returns the claim status of the message on the destination chain.
    async fn claim_status(&self, message: &Message)
        -> Result<OnChainMessageStatus, ProviderError>;

    /// Returns the state of the destination rate limiter, if the destination has one.
    async fn rate_limit(&self) -> Result<Option<RateLimitState>, ProviderError>;

    /// Simulates the claim call and returns its gas estimate.
    ///
    /// A revert of the simulation is returned as [`ProviderError::Reverted`].
    async fn estimate_claim_gas(
        &self,
        from: Address,
        to: Address,
        input: Bytes,
    ) -> Result<u64, ProviderError>;

    /// Returns the proof of inclusion of the message in an anchored Merkle root.
    async fn message_proof(&self, message: &Message) -> Result<MessageProof, ProviderError>;
}
