use super::with_timeout;
use crate::{ChainLogSource, FeeHistory, FeeHistorySource, ProviderError};
use std::{future::IntoFuture, time::Duration};

use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter, Log};
use alloy_sol_types::SolEvent;
use alloy_transport::TransportResult;
use postman_abi::events::{L1L2MessageHashesAddedToInbox, L2MessagingBlockAnchored, MessageSent};
use postman_primitives::{AnchoringEvent, Direction, MessageSentEvent};

/// A client for one chain of the corridor, reading the logs of its message service.
#[derive(Debug, Clone)]
pub struct AlloyChainClient<P> {
    /// The underlying provider.
    provider: P,
    /// The message service contract deployed on the chain.
    message_service: Address,
    /// The timeout applied to every request.
    rpc_timeout: Duration,
}

impl<P: Provider> AlloyChainClient<P> {
    /// Returns a new [`AlloyChainClient`].
    pub const fn new(provider: P, message_service: Address, rpc_timeout: Duration) -> Self {
        Self { provider, message_service, rpc_timeout }
    }

    /// Returns the underlying provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the address of the message service contract.
    pub const fn message_service(&self) -> Address {
        self.message_service
    }

    /// Returns the chain id.
    pub async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.request(self.provider.get_chain_id()).await
    }

    /// Awaits the request under the client's timeout.
    pub(crate) async fn request<F, T>(&self, request: F) -> Result<T, ProviderError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        with_timeout(self.rpc_timeout, request).await
    }

    /// Returns the logs of the message service for the event in the block range.
    pub(crate) async fn event_logs<E: SolEvent>(
        &self,
        filter: Filter,
    ) -> Result<Vec<(Log, E)>, ProviderError> {
        let filter = filter.address(self.message_service).event_signature(E::SIGNATURE_HASH);
        let logs = self.request(self.provider.get_logs(&filter)).await?;

        logs.into_iter()
            .map(|log| {
                let event = E::decode_log(&log.inner)
                    .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?
                    .data;
                Ok((log, event))
            })
            .collect()
    }
}

fn missing(field: &'static str) -> ProviderError {
    ProviderError::InvalidResponse(format!("log is missing its {field}"))
}

#[async_trait::async_trait]
impl<P: Provider> ChainLogSource for AlloyChainClient<P> {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        self.request(self.provider.get_block_number()).await
    }

    async fn message_sent_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<MessageSentEvent>, ProviderError> {
        let filter = Filter::new().from_block(from_block).to_block(to_block);
        let logs = self.event_logs::<MessageSent>(filter).await?;

        logs.into_iter()
            .map(|(log, event)| {
                let block_number = log.block_number.ok_or_else(|| missing("block number"))?;
                let transaction_hash =
                    log.transaction_hash.ok_or_else(|| missing("transaction hash"))?;
                let log_index = log.log_index.ok_or_else(|| missing("log index"))?;
                Ok(event.into_event(block_number, transaction_hash, log_index))
            })
            .collect()
    }

    async fn anchoring_events(
        &self,
        direction: Direction,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<AnchoringEvent>, ProviderError> {
        let filter = Filter::new().from_block(from_block).to_block(to_block);

        let mut anchored = Vec::new();
        match direction {
            Direction::L1ToL2 => {
                for (log, event) in
                    self.event_logs::<L1L2MessageHashesAddedToInbox>(filter).await?
                {
                    let block_number = log.block_number.ok_or_else(|| missing("block number"))?;
                    anchored.extend(event.anchoring_events(block_number));
                }
            }
            Direction::L2ToL1 => {
                for (log, event) in self.event_logs::<L2MessagingBlockAnchored>(filter).await? {
                    let block_number = log.block_number.ok_or_else(|| missing("block number"))?;
                    anchored.push(event.anchoring_event(block_number));
                }
            }
        }

        Ok(anchored)
    }
}

#[async_trait::async_trait]
impl<P: Provider> FeeHistorySource for AlloyChainClient<P> {
    async fn fee_history(
        &self,
        block_count: u64,
        percentile: f64,
    ) -> Result<FeeHistory, ProviderError> {
        let history = self
            .request(self.provider.get_fee_history(
                block_count,
                BlockNumberOrTag::Latest,
                &[percentile],
            ))
            .await?;

        let next_base_fee_per_gas = history
            .next_block_base_fee()
            .ok_or_else(|| ProviderError::InvalidResponse("fee history without base fee".into()))?;
        let latest_block =
            (history.oldest_block + history.base_fee_per_gas.len() as u64).saturating_sub(2);
        let rewards = history
            .reward
            .unwrap_or_default()
            .into_iter()
            .filter_map(|rewards| rewards.first().copied())
            .collect();

        Ok(FeeHistory { latest_block, next_base_fee_per_gas, rewards })
    }
}
