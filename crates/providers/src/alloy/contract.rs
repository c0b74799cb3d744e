use super::AlloyChainClient;
use crate::{ChainLogSource, MessageServiceClient, ProviderError};

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter, TransactionRequest};
use alloy_sol_types::{SolCall, SolEvent};
use postman_abi::{
    calls::{
        currentPeriodAmountInWeiCall, inboxL1L2MessageStatusCall, isMessageClaimedCall,
        limitInWeiCall,
    },
    events::{L2MerkleRootAdded, L2MessagingBlockAnchored},
    merkle::{message_siblings, SparseMerkleTree},
};
use postman_primitives::{
    Direction, Message, MessageProof, OnChainMessageStatus, RateLimitState,
};

/// A client for the destination message service of one direction.
///
/// Building L2 to L1 proofs requires reading both chains, the client therefore holds one
/// [`AlloyChainClient`] per side of the corridor.
#[derive(Debug, Clone)]
pub struct AlloyMessageServiceClient<S, D> {
    /// The direction of the relayed messages.
    direction: Direction,
    /// The source chain client.
    source: AlloyChainClient<S>,
    /// The destination chain client.
    destination: AlloyChainClient<D>,
}

impl<S: Provider, D: Provider> AlloyMessageServiceClient<S, D> {
    /// Returns a new [`AlloyMessageServiceClient`].
    pub const fn new(
        direction: Direction,
        source: AlloyChainClient<S>,
        destination: AlloyChainClient<D>,
    ) -> Self {
        Self { direction, source, destination }
    }

    async fn eth_call<C: SolCall>(&self, call: C) -> Result<C::Return, ProviderError> {
        let request = TransactionRequest::default()
            .with_to(self.destination.message_service())
            .with_input(call.abi_encode());
        let output = self.destination.request(self.destination.provider().call(request)).await?;
        C::abi_decode_returns(&output)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }

    /// Returns the destination transaction that anchored the source block, if any.
    async fn anchoring_transaction(
        &self,
        block_number: u64,
    ) -> Result<Option<B256>, ProviderError> {
        let filter = Filter::new()
            .from_block(BlockNumberOrTag::Earliest)
            .topic1(B256::from(U256::from(block_number)));
        let logs = self.destination.event_logs::<L2MessagingBlockAnchored>(filter).await?;
        Ok(logs.into_iter().find_map(|(log, _)| log.transaction_hash))
    }
}

#[async_trait::async_trait]
impl<S: Provider, D: Provider> MessageServiceClient for AlloyMessageServiceClient<S, D> {
    fn message_service(&self) -> Address {
        self.destination.message_service()
    }

    async fn claim_status(
        &self,
        message: &Message,
    ) -> Result<OnChainMessageStatus, ProviderError> {
        match self.direction {
            Direction::L1ToL2 => {
                let code = self
                    .eth_call(inboxL1L2MessageStatusCall { messageHash: message.message_hash })
                    .await?;
                u8::try_from(code)
                    .ok()
                    .and_then(OnChainMessageStatus::from_code)
                    .ok_or_else(|| ProviderError::InvalidResponse(format!("status code {code}")))
            }
            Direction::L2ToL1 => {
                if self
                    .eth_call(isMessageClaimedCall { _messageNumber: message.message_nonce })
                    .await?
                {
                    return Ok(OnChainMessageStatus::Claimed);
                }
                let anchored = self.anchoring_transaction(message.sent_block_number).await?;
                Ok(if anchored.is_some() {
                    OnChainMessageStatus::Claimable
                } else {
                    OnChainMessageStatus::Unknown
                })
            }
        }
    }

    async fn rate_limit(&self) -> Result<Option<RateLimitState>, ProviderError> {
        let limit = match self.eth_call(limitInWeiCall {}).await {
            Ok(limit) => limit,
            // the destination does not expose a rate limiter.
            Err(ProviderError::Reverted(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let current_period_amount = self.eth_call(currentPeriodAmountInWeiCall {}).await?;

        Ok(Some(RateLimitState { limit, current_period_amount }))
    }

    async fn estimate_claim_gas(
        &self,
        from: Address,
        to: Address,
        input: Bytes,
    ) -> Result<u64, ProviderError> {
        let request =
            TransactionRequest::default().with_from(from).with_to(to).with_input(input);
        self.destination.request(self.destination.provider().estimate_gas(request)).await
    }

    async fn message_proof(&self, message: &Message) -> Result<MessageProof, ProviderError> {
        if !self.direction.requires_proof() {
            return Err(ProviderError::Rejected(format!(
                "{} messages are claimed without proof",
                self.direction
            )));
        }

        let finalization = self
            .anchoring_transaction(message.sent_block_number)
            .await?
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "source block {} is not anchored",
                    message.sent_block_number
                ))
            })?;
        let receipt = self
            .destination
            .request(self.destination.provider().get_transaction_receipt(finalization))
            .await?
            .ok_or_else(|| ProviderError::InvalidResponse("missing finalization receipt".into()))?;

        // collect the roots and the anchored block range of the finalization.
        let mut roots = Vec::new();
        let mut tree_depth = 0u32;
        let mut range: Option<(u64, u64)> = None;
        for log in receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.inner.address == self.destination.message_service())
        {
            if let Ok(root) = L2MerkleRootAdded::decode_log(&log.inner) {
                tree_depth = root.data.treeDepth.saturating_to();
                roots.push(root.data.l2MerkleRoot);
            } else if let Ok(anchored) = L2MessagingBlockAnchored::decode_log(&log.inner) {
                let block: u64 = anchored.data.l2Block.saturating_to();
                range = Some(match range {
                    Some((start, end)) => (start.min(block), end.max(block)),
                    None => (block, block),
                });
            }
        }
        let (start, end) = range.ok_or_else(|| {
            ProviderError::InvalidResponse("finalization anchored no block".into())
        })?;

        let hashes: Vec<_> = self
            .source
            .message_sent_events(start, end)
            .await?
            .into_iter()
            .map(|event| event.message_hash)
            .collect();
        let invalid =
            |err: postman_abi::MerkleError| ProviderError::InvalidResponse(err.to_string());
        let leaves = message_siblings(message.message_hash, &hashes, tree_depth).map_err(invalid)?;
        let tree = SparseMerkleTree::new(tree_depth, &leaves).map_err(invalid)?;

        if !roots.contains(&tree.root()) {
            return Err(ProviderError::InvalidResponse(format!(
                "rebuilt Merkle root {} is not anchored",
                tree.root()
            )));
        }

        let index = leaves
            .iter()
            .position(|leaf| *leaf == message.message_hash)
            .ok_or_else(|| ProviderError::InvalidResponse("message missing from tree".into()))?;
        tree.proof(index).map_err(invalid)
    }
}
