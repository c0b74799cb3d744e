use crate::DatabaseError;

use alloy_primitives::{Address, B256, U256};
use postman_primitives::Message;
use sea_orm::{entity::prelude::*, ActiveValue};
use std::str::FromStr;

/// A database model that represents a relayed message.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub(crate) message_hash: Vec<u8>,
    pub(crate) direction: String,
    sender: Vec<u8>,
    recipient: Vec<u8>,
    fee: Vec<u8>,
    value: Vec<u8>,
    message_nonce: Vec<u8>,
    calldata: Vec<u8>,
    pub(crate) sent_block_number: i64,
    sent_transaction_hash: Vec<u8>,
    pub(crate) status: String,
    pub(crate) exclusion_reason: Option<String>,
    claim_failure: Option<String>,
    retry_count: i32,
    claim_tx_hash: Option<Vec<u8>>,
    claim_tx_replaced_hash: Option<Vec<u8>>,
    pub(crate) claim_tx_nonce: Option<i64>,
    claim_tx_gas_limit: Option<i64>,
    claim_tx_max_fee_per_gas: Option<Vec<u8>>,
    claim_tx_max_priority_fee_per_gas: Option<Vec<u8>>,
    claim_tx_broadcasted_at: Option<i64>,
    claimed_block_number: Option<i64>,
    claim_gas_used: Option<i64>,
    claim_effective_gas_price: Option<Vec<u8>>,
    estimated_gas_limit: Option<i64>,
    compressed_transaction_size: Option<i64>,
    pub(crate) fee_per_gas_threshold: Option<i64>,
    created_at: i64,
    pub(crate) updated_at: i64,
}

/// The relation for the message model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the message model.
impl ActiveModelBehavior for ActiveModel {}

/// Encodes a fee amount the way the message table stores wei amounts.
pub(crate) fn encode_wei(value: u128) -> Vec<u8> {
    U256::from(value).to_le_bytes_vec()
}

fn decode_wei(value: &[u8]) -> u128 {
    U256::from_le_slice(value).saturating_to()
}

fn parse_column<T: FromStr>(column: &'static str, value: String) -> Result<T, DatabaseError> {
    value.parse().map_err(|_| DatabaseError::InvalidColumn { column, value })
}

impl From<Message> for ActiveModel {
    fn from(value: Message) -> Self {
        Self {
            message_hash: ActiveValue::Set(value.message_hash.to_vec()),
            direction: ActiveValue::Set(value.direction.to_string()),
            sender: ActiveValue::Set(value.sender.to_vec()),
            recipient: ActiveValue::Set(value.recipient.to_vec()),
            fee: ActiveValue::Set(value.fee.to_le_bytes_vec()),
            value: ActiveValue::Set(value.value.to_le_bytes_vec()),
            message_nonce: ActiveValue::Set(value.message_nonce.to_le_bytes_vec()),
            calldata: ActiveValue::Set(value.calldata.to_vec()),
            sent_block_number: ActiveValue::Set(value.sent_block_number as i64),
            sent_transaction_hash: ActiveValue::Set(value.sent_transaction_hash.to_vec()),
            status: ActiveValue::Set(value.status.to_string()),
            exclusion_reason: ActiveValue::Set(value.exclusion_reason.map(|r| r.to_string())),
            claim_failure: ActiveValue::Set(value.claim_failure.map(|f| f.to_string())),
            retry_count: ActiveValue::Set(value.retry_count as i32),
            claim_tx_hash: ActiveValue::Set(value.claim_tx_hash.map(|h| h.to_vec())),
            claim_tx_replaced_hash: ActiveValue::Set(
                value.claim_tx_replaced_hash.map(|h| h.to_vec()),
            ),
            claim_tx_nonce: ActiveValue::Set(value.claim_tx_nonce.map(|n| n as i64)),
            claim_tx_gas_limit: ActiveValue::Set(value.claim_tx_gas_limit.map(|g| g as i64)),
            claim_tx_max_fee_per_gas: ActiveValue::Set(
                value.claim_tx_max_fee_per_gas.map(encode_wei),
            ),
            claim_tx_max_priority_fee_per_gas: ActiveValue::Set(
                value.claim_tx_max_priority_fee_per_gas.map(encode_wei),
            ),
            claim_tx_broadcasted_at: ActiveValue::Set(
                value.claim_tx_broadcasted_at.map(|t| t as i64),
            ),
            claimed_block_number: ActiveValue::Set(value.claimed_block_number.map(|n| n as i64)),
            claim_gas_used: ActiveValue::Set(value.claim_gas_used.map(|g| g as i64)),
            claim_effective_gas_price: ActiveValue::Set(
                value.claim_effective_gas_price.map(encode_wei),
            ),
            estimated_gas_limit: ActiveValue::Set(value.estimated_gas_limit.map(|g| g as i64)),
            compressed_transaction_size: ActiveValue::Set(
                value.compressed_transaction_size.map(|s| s as i64),
            ),
            fee_per_gas_threshold: ActiveValue::Set(
                value.fee_per_gas_threshold.map(|t| t.min(i64::MAX as u64) as i64),
            ),
            created_at: ActiveValue::Set(value.created_at as i64),
            updated_at: ActiveValue::Set(value.updated_at as i64),
        }
    }
}

impl TryFrom<Model> for Message {
    type Error = DatabaseError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            message_hash: B256::from_slice(&value.message_hash),
            direction: parse_column("direction", value.direction)?,
            sender: Address::from_slice(&value.sender),
            recipient: Address::from_slice(&value.recipient),
            fee: U256::from_le_slice(&value.fee),
            value: U256::from_le_slice(&value.value),
            message_nonce: U256::from_le_slice(&value.message_nonce),
            calldata: value.calldata.into(),
            sent_block_number: value.sent_block_number as u64,
            sent_transaction_hash: B256::from_slice(&value.sent_transaction_hash),
            status: parse_column("status", value.status)?,
            exclusion_reason: value
                .exclusion_reason
                .map(|r| parse_column("exclusion_reason", r))
                .transpose()?,
            claim_failure: value
                .claim_failure
                .map(|f| parse_column("claim_failure", f))
                .transpose()?,
            retry_count: value.retry_count as u32,
            claim_tx_hash: value.claim_tx_hash.map(|h| B256::from_slice(&h)),
            claim_tx_replaced_hash: value.claim_tx_replaced_hash.map(|h| B256::from_slice(&h)),
            claim_tx_nonce: value.claim_tx_nonce.map(|n| n as u64),
            claim_tx_gas_limit: value.claim_tx_gas_limit.map(|g| g as u64),
            claim_tx_max_fee_per_gas: value.claim_tx_max_fee_per_gas.as_deref().map(decode_wei),
            claim_tx_max_priority_fee_per_gas: value
                .claim_tx_max_priority_fee_per_gas
                .as_deref()
                .map(decode_wei),
            claim_tx_broadcasted_at: value.claim_tx_broadcasted_at.map(|t| t as u64),
            claimed_block_number: value.claimed_block_number.map(|n| n as u64),
            claim_gas_used: value.claim_gas_used.map(|g| g as u64),
            claim_effective_gas_price: value.claim_effective_gas_price.as_deref().map(decode_wei),
            estimated_gas_limit: value.estimated_gas_limit.map(|g| g as u64),
            compressed_transaction_size: value.compressed_transaction_size.map(|s| s as u64),
            fee_per_gas_threshold: value.fee_per_gas_threshold.map(|t| t as u64),
            created_at: value.created_at as u64,
            updated_at: value.updated_at as u64,
        })
    }
}
