use crate::{AnchoringId, ClaimFailure, Direction, ExclusionReason, MessageStatus};

use alloy_primitives::{Address, Bytes, B256, U256};

/// A message-sent event emitted by the source chain message service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSentEvent {
    /// The hash of the message, as computed by the message service.
    pub message_hash: B256,
    /// The sender of the message.
    pub sender: Address,
    /// The recipient of the message on the destination chain.
    pub recipient: Address,
    /// The fee paid to the claimer.
    pub fee: U256,
    /// The value delivered to the recipient.
    pub value: U256,
    /// The message nonce.
    pub nonce: U256,
    /// The calldata executed on the recipient.
    pub calldata: Bytes,
    /// The source block the event was emitted in.
    pub block_number: u64,
    /// The source transaction that emitted the event.
    pub transaction_hash: B256,
    /// The index of the log in its block.
    pub log_index: u64,
}

#[cfg(feature = "arbitrary")]
impl arbitrary::Arbitrary<'_> for MessageSentEvent {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let calldata_len = u.int_in_range(0..=64)?;
        Ok(Self {
            message_hash: B256::arbitrary(u)?,
            sender: Address::arbitrary(u)?,
            recipient: Address::arbitrary(u)?,
            fee: U256::from(u.int_in_range(0..=u64::MAX)?),
            value: U256::from(u.int_in_range(0..=u64::MAX)?),
            nonce: U256::from(u.int_in_range(0..=u32::MAX)?),
            calldata: u.bytes(calldata_len)?.to_vec().into(),
            block_number: u.int_in_range(0..=u32::MAX)? as u64,
            transaction_hash: B256::arbitrary(u)?,
            log_index: u.int_in_range(0..=u16::MAX)? as u64,
        })
    }
}

/// A message tracked by the Postman.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The unique message hash.
    pub message_hash: B256,
    /// The direction the message travels in.
    pub direction: Direction,
    /// The sender of the message.
    pub sender: Address,
    /// The recipient of the message.
    pub recipient: Address,
    /// The fee paid to the claimer.
    pub fee: U256,
    /// The value delivered to the recipient.
    pub value: U256,
    /// The message nonce.
    pub message_nonce: U256,
    /// The calldata executed on the recipient.
    pub calldata: Bytes,
    /// The source block the message was sent in.
    pub sent_block_number: u64,
    /// The source transaction the message was sent in.
    pub sent_transaction_hash: B256,
    /// The lifecycle status.
    pub status: MessageStatus,
    /// The exclusion reason, set when the status is [`MessageStatus::Excluded`].
    pub exclusion_reason: Option<ExclusionReason>,
    /// The cause of the last failed claim attempt.
    pub claim_failure: Option<ClaimFailure>,
    /// The number of failed claim attempts.
    pub retry_count: u32,
    /// The hash of the last claim transaction.
    pub claim_tx_hash: Option<B256>,
    /// The hash of an earlier claim transaction, which may still be mined on the same nonce.
    pub claim_tx_replaced_hash: Option<B256>,
    /// The nonce of the last claim transaction.
    pub claim_tx_nonce: Option<u64>,
    /// The gas limit of the last claim transaction.
    pub claim_tx_gas_limit: Option<u64>,
    /// The max fee per gas of the last claim transaction.
    pub claim_tx_max_fee_per_gas: Option<u128>,
    /// The max priority fee per gas of the last claim transaction.
    pub claim_tx_max_priority_fee_per_gas: Option<u128>,
    /// The unix timestamp at which the last claim transaction was broadcast.
    pub claim_tx_broadcasted_at: Option<u64>,
    /// The destination block the claim was confirmed in.
    pub claimed_block_number: Option<u64>,
    /// The gas used by the successful claim.
    pub claim_gas_used: Option<u64>,
    /// The effective gas price paid by the successful claim.
    pub claim_effective_gas_price: Option<u128>,
    /// The claim gas estimate computed during validation.
    pub estimated_gas_limit: Option<u64>,
    /// The size of the claim transaction computed during validation.
    pub compressed_transaction_size: Option<u64>,
    /// The fee paid per unit of estimated gas, used to claim the most profitable messages first.
    pub fee_per_gas_threshold: Option<u64>,
    /// The unix timestamp at which the message was first stored.
    pub created_at: u64,
    /// The unix timestamp of the last update.
    pub updated_at: u64,
}

impl Message {
    /// Returns a new [`Message`] for the observed event with the provided initial status.
    pub fn from_event(
        event: MessageSentEvent,
        direction: Direction,
        status: MessageStatus,
        exclusion_reason: Option<ExclusionReason>,
        now: u64,
    ) -> Self {
        Self {
            message_hash: event.message_hash,
            direction,
            sender: event.sender,
            recipient: event.recipient,
            fee: event.fee,
            value: event.value,
            message_nonce: event.nonce,
            calldata: event.calldata,
            sent_block_number: event.block_number,
            sent_transaction_hash: event.transaction_hash,
            status,
            exclusion_reason,
            claim_failure: None,
            retry_count: 0,
            claim_tx_hash: None,
            claim_tx_replaced_hash: None,
            claim_tx_nonce: None,
            claim_tx_gas_limit: None,
            claim_tx_max_fee_per_gas: None,
            claim_tx_max_priority_fee_per_gas: None,
            claim_tx_broadcasted_at: None,
            claimed_block_number: None,
            claim_gas_used: None,
            claim_effective_gas_price: None,
            estimated_gas_limit: None,
            compressed_transaction_size: None,
            fee_per_gas_threshold: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the identifier under which the destination chain anchors this message.
    ///
    /// L1 to L2 messages are anchored one by one through their hash, L2 to L1 messages are
    /// anchored as part of the L2 block they were sent in.
    pub const fn anchoring_id(&self) -> AnchoringId {
        match self.direction {
            Direction::L1ToL2 => AnchoringId::MessageHash(self.message_hash),
            Direction::L2ToL1 => AnchoringId::SourceBlock(self.sent_block_number),
        }
    }

    /// Returns true if the message carries calldata.
    pub fn has_calldata(&self) -> bool {
        !self.calldata.is_empty()
    }
}
