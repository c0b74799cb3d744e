use alloy_primitives::{Address, Bytes, B256, U256};

/// The identifier under which the destination chain anchors a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AnchoringId {
    /// The message hash was added to the destination inbox.
    #[display("message {_0}")]
    MessageHash(B256),
    /// The source block containing the message was anchored.
    #[display("source block {_0}")]
    SourceBlock(u64),
}

impl AnchoringId {
    /// Returns the 32 bytes key used to persist the identifier.
    pub fn key(&self) -> B256 {
        match self {
            Self::MessageHash(hash) => *hash,
            Self::SourceBlock(number) => B256::from(U256::from(*number)),
        }
    }
}

/// An anchoring event observed on the destination chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AnchoringEvent {
    /// The anchored identifier.
    pub id: AnchoringId,
    /// The destination block the event was emitted in.
    pub block_number: u64,
}

/// EIP-1559 fees for a transaction.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct GasFees {
    /// The max fee per gas.
    pub max_fee_per_gas: u128,
    /// The max priority fee per gas.
    pub max_priority_fee_per_gas: u128,
}

impl GasFees {
    /// Returns new [`GasFees`].
    pub const fn new(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        Self { max_fee_per_gas, max_priority_fee_per_gas }
    }

    /// Returns the fees bumped by `percent`, each capped at `cap`.
    pub fn bumped(&self, percent: u64, cap: u128) -> Self {
        let bump = |fee: u128| {
            fee.saturating_mul(100 + percent as u128).div_ceil(100).min(cap)
        };
        Self {
            max_fee_per_gas: bump(self.max_fee_per_gas),
            max_priority_fee_per_gas: bump(self.max_priority_fee_per_gas),
        }
    }

    /// Returns the fees, taking the highest of each component.
    pub fn max(&self, other: &Self) -> Self {
        Self {
            max_fee_per_gas: self.max_fee_per_gas.max(other.max_fee_per_gas),
            max_priority_fee_per_gas: self
                .max_priority_fee_per_gas
                .max(other.max_priority_fee_per_gas),
        }
    }
}

/// The state of the destination rate limiter for the current period.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateLimitState {
    /// The amount that can be bridged per period.
    pub limit: U256,
    /// The amount already bridged in the current period.
    pub current_period_amount: U256,
}

/// A Merkle proof of inclusion for a message in an anchored tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProof {
    /// The sibling hashes from the leaf to the root.
    pub proof: Vec<B256>,
    /// The root of the tree.
    pub root: B256,
    /// The index of the leaf in the tree.
    pub leaf_index: u32,
}

/// A claim transaction ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTransaction {
    /// The contract the claim is sent to.
    pub to: Address,
    /// The claim calldata.
    pub input: Bytes,
    /// The gas limit.
    pub gas_limit: u64,
    /// The fees.
    pub fees: GasFees,
    /// The nonce to replace, if the transaction replaces a pending one.
    pub replace_nonce: Option<u64>,
}

/// The receipt of a claim transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    /// The transaction hash.
    pub transaction_hash: B256,
    /// The block the transaction was included in.
    pub block_number: u64,
    /// Whether the transaction succeeded.
    pub success: bool,
    /// The gas used by the transaction.
    pub gas_used: u64,
    /// The effective gas price paid.
    pub effective_gas_price: u128,
}
