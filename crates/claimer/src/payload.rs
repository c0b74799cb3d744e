use crate::ClaimPayloadConfig;

use alloy_primitives::{Address, Bytes};
use postman_abi::claim_calldata;
use postman_primitives::{ClaimTransaction, GasFees, Message};
use postman_providers::{MessageServiceClient, ProviderError};

/// The destination call claiming a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPayload {
    /// The contract called.
    pub to: Address,
    /// The claim calldata.
    pub input: Bytes,
}

impl ClaimPayload {
    /// Returns the size of the claim calldata, cached as the transaction size of the message.
    pub fn size(&self) -> u64 {
        self.input.len() as u64
    }

    /// Returns the claim transaction for the payload.
    pub fn into_transaction(
        self,
        gas_limit: u64,
        fees: GasFees,
        replace_nonce: Option<u64>,
    ) -> ClaimTransaction {
        ClaimTransaction { to: self.to, input: self.input, gas_limit, fees, replace_nonce }
    }
}

/// Builds the claim payloads of messages.
#[derive(Debug, Clone, Copy)]
pub struct ClaimPayloadBuilder {
    config: ClaimPayloadConfig,
}

impl ClaimPayloadBuilder {
    /// Returns a new [`ClaimPayloadBuilder`].
    pub const fn new(config: ClaimPayloadConfig) -> Self {
        Self { config }
    }

    /// Builds the claim payload of the message, fetching its proof of inclusion if the direction
    /// requires one.
    pub async fn build<C: MessageServiceClient>(
        &self,
        client: &C,
        message: &Message,
    ) -> Result<ClaimPayload, ProviderError> {
        let proof = if message.direction.requires_proof() {
            Some(client.message_proof(message).await?)
        } else {
            None
        };
        let to = self.config.claim_via_address.unwrap_or_else(|| client.message_service());
        Ok(ClaimPayload { to, input: claim_calldata(message, self.config.fee_recipient, proof) })
    }
}
