//! Test utils for providers.

use crate::{
    ChainLogSource, FeeHistory, FeeHistorySource, MessageServiceClient, ProviderError,
    TransactionSender,
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use alloy_primitives::{keccak256, Address, Bytes, B256};
use parking_lot::{Mutex, MutexGuard};
use postman_primitives::{
    AnchoringEvent, ClaimReceipt, ClaimTransaction, Direction, Message, MessageProof,
    MessageSentEvent, OnChainMessageStatus, RateLimitState,
};

/// The mutable state of a [`MockChain`].
#[derive(Debug)]
pub struct MockChainState {
    /// The latest block number.
    pub head: u64,
    /// The message-sent events emitted on the chain.
    pub message_events: Vec<MessageSentEvent>,
    /// The anchoring events emitted on the chain.
    pub anchoring_events: Vec<AnchoringEvent>,
    /// Errors returned by the next log queries, in order.
    pub log_errors: VecDeque<ProviderError>,
    /// The claim status per message, messages not listed use `default_claim_status`.
    pub claim_statuses: HashMap<B256, OnChainMessageStatus>,
    /// The claim status of messages not listed in `claim_statuses`.
    pub default_claim_status: OnChainMessageStatus,
    /// The state of the rate limiter, if the chain has one.
    pub rate_limit: Option<RateLimitState>,
    /// The outcome of claim simulations.
    pub gas_estimate: Result<u64, ProviderError>,
    /// The proof returned for every message.
    pub proof: MessageProof,
    /// The sampled fee history.
    pub fee_history: FeeHistory,
    /// The nonce of the signer including mempool transactions.
    pub pending_nonce: u64,
    /// The nonce of the signer counting mined transactions.
    pub confirmed_nonce: u64,
    /// Errors returned by the next pending nonce reads, in order.
    pub nonce_errors: VecDeque<ProviderError>,
    /// Errors returned by the next broadcasts, in order.
    pub broadcast_errors: VecDeque<ProviderError>,
    /// Every successful broadcast along with its nonce and hash.
    pub broadcasts: Vec<(ClaimTransaction, u64, B256)>,
    /// The hashes of the transactions waiting in the mempool.
    pub mempool: HashSet<B256>,
    /// The receipts of mined transactions.
    pub receipts: HashMap<B256, ClaimReceipt>,
}

impl Default for MockChainState {
    fn default() -> Self {
        Self {
            head: 0,
            message_events: Vec::new(),
            anchoring_events: Vec::new(),
            log_errors: VecDeque::new(),
            claim_statuses: HashMap::new(),
            default_claim_status: OnChainMessageStatus::Claimable,
            rate_limit: None,
            gas_estimate: Ok(100_000),
            proof: MessageProof { proof: Vec::new(), root: B256::ZERO, leaf_index: 0 },
            fee_history: FeeHistory {
                latest_block: 0,
                next_base_fee_per_gas: 1_000_000_000,
                rewards: vec![100_000_000],
            },
            pending_nonce: 0,
            confirmed_nonce: 0,
            nonce_errors: VecDeque::new(),
            broadcast_errors: VecDeque::new(),
            broadcasts: Vec::new(),
            mempool: HashSet::new(),
            receipts: HashMap::new(),
        }
    }
}

/// An in-memory chain implementing every chain collaborator.
#[derive(Debug, Clone)]
pub struct MockChain {
    /// The address of the signer.
    signer: Address,
    /// The address of the message service.
    message_service: Address,
    /// The shared state.
    state: Arc<Mutex<MockChainState>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// Returns a new [`MockChain`] with the default state.
    pub fn new() -> Self {
        Self {
            signer: Address::repeat_byte(0x5e),
            message_service: Address::repeat_byte(0xc0),
            state: Default::default(),
        }
    }

    /// Returns a guard over the chain state.
    pub fn state(&self) -> MutexGuard<'_, MockChainState> {
        self.state.lock()
    }

    /// Mines the transaction with the provided outcome at the current head.
    pub fn mine(&self, hash: B256, success: bool, gas_used: u64, effective_gas_price: u128) {
        let mut state = self.state();
        state.mempool.remove(&hash);
        let nonce = state.broadcasts.iter().find(|(_, _, h)| *h == hash).map(|(_, n, _)| *n);
        if let Some(nonce) = nonce {
            state.confirmed_nonce = state.confirmed_nonce.max(nonce + 1);
        }
        let block_number = state.head;
        state.receipts.insert(
            hash,
            ClaimReceipt {
                transaction_hash: hash,
                block_number,
                success,
                gas_used,
                effective_gas_price,
            },
        );
    }

    /// Drops the transaction from the mempool without mining it.
    pub fn drop_transaction(&self, hash: B256) {
        self.state().mempool.remove(&hash);
    }

    /// Returns the hashes of every successful broadcast.
    pub fn broadcast_hashes(&self) -> Vec<B256> {
        self.state().broadcasts.iter().map(|(_, _, hash)| *hash).collect()
    }
}

#[async_trait::async_trait]
impl ChainLogSource for MockChain {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.state().head)
    }

    async fn message_sent_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<MessageSentEvent>, ProviderError> {
        let mut state = self.state();
        if let Some(err) = state.log_errors.pop_front() {
            return Err(err);
        }
        Ok(state
            .message_events
            .iter()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .cloned()
            .collect())
    }

    async fn anchoring_events(
        &self,
        _direction: Direction,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<AnchoringEvent>, ProviderError> {
        let mut state = self.state();
        if let Some(err) = state.log_errors.pop_front() {
            return Err(err);
        }
        Ok(state
            .anchoring_events
            .iter()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .copied()
            .collect())
    }
}

#[async_trait::async_trait]
impl MessageServiceClient for MockChain {
    fn message_service(&self) -> Address {
        self.message_service
    }

    async fn claim_status(
        &self,
        message: &Message,
    ) -> Result<OnChainMessageStatus, ProviderError> {
        let state = self.state();
        Ok(state
            .claim_statuses
            .get(&message.message_hash)
            .copied()
            .unwrap_or(state.default_claim_status))
    }

    async fn rate_limit(&self) -> Result<Option<RateLimitState>, ProviderError> {
        Ok(self.state().rate_limit)
    }

    async fn estimate_claim_gas(
        &self,
        _from: Address,
        _to: Address,
        _input: Bytes,
    ) -> Result<u64, ProviderError> {
        self.state().gas_estimate.clone()
    }

    async fn message_proof(&self, _message: &Message) -> Result<MessageProof, ProviderError> {
        Ok(self.state().proof.clone())
    }
}

#[async_trait::async_trait]
impl FeeHistorySource for MockChain {
    async fn fee_history(
        &self,
        _block_count: u64,
        _percentile: f64,
    ) -> Result<FeeHistory, ProviderError> {
        let state = self.state();
        Ok(FeeHistory { latest_block: state.head, ..state.fee_history.clone() })
    }
}

#[async_trait::async_trait]
impl TransactionSender for MockChain {
    fn address(&self) -> Address {
        self.signer
    }

    async fn pending_nonce(&self) -> Result<u64, ProviderError> {
        let mut state = self.state();
        match state.nonce_errors.pop_front() {
            Some(err) => Err(err),
            None => Ok(state.pending_nonce),
        }
    }

    async fn confirmed_nonce(&self) -> Result<u64, ProviderError> {
        Ok(self.state().confirmed_nonce)
    }

    async fn sign_and_broadcast(
        &self,
        transaction: &ClaimTransaction,
        nonce: u64,
    ) -> Result<B256, ProviderError> {
        let mut state = self.state();
        if let Some(err) = state.broadcast_errors.pop_front() {
            return Err(err);
        }
        if nonce < state.confirmed_nonce {
            return Err(ProviderError::Nonce(format!("nonce too low: {nonce}")));
        }

        let hash = keccak256(
            [
                transaction.input.as_ref(),
                &nonce.to_be_bytes(),
                &transaction.fees.max_fee_per_gas.to_be_bytes(),
            ]
            .concat(),
        );
        state.pending_nonce = state.pending_nonce.max(nonce + 1);
        state.mempool.insert(hash);
        state.broadcasts.push((transaction.clone(), nonce, hash));

        Ok(hash)
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ClaimReceipt>, ProviderError> {
        Ok(self.state().receipts.get(&hash).copied())
    }

    async fn pending_transaction(&self, hash: B256) -> Result<bool, ProviderError> {
        Ok(self.state().mempool.contains(&hash))
    }
}
