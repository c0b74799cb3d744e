use crate::ProviderError;

use postman_primitives::{AnchoringEvent, Direction, MessageSentEvent};

/// An instance of the trait can provide the logs of one chain of the corridor.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait ChainLogSource: Send + Sync {
    /// Returns the latest block number of the chain.
    async fn block_number(&self) -> Result<u64, ProviderError>;

    /// Returns the message-sent events emitted in the inclusive block range, in log order.
    async fn message_sent_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<MessageSentEvent>, ProviderError>;

    /// Returns the anchoring events for messages travelling in `direction` emitted in the
    /// inclusive block range. The chain is the destination of the direction.
    async fn anchoring_events(
        &self,
        direction: Direction,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<AnchoringEvent>, ProviderError>;
}
