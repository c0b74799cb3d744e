use super::with_timeout;
use crate::{ProviderError, TransactionSender};
use std::time::Duration;

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::{Address, TxKind, B256, U256};
use alloy_provider::Provider;
use alloy_signer_local::PrivateKeySigner;
use postman_primitives::{ClaimReceipt, ClaimTransaction};

/// Signs claim transactions with a local key and broadcasts them to the destination chain.
#[derive(Debug, Clone)]
pub struct AlloyTransactionSender<P> {
    /// The destination provider.
    provider: P,
    /// The signing key.
    signer: PrivateKeySigner,
    /// The destination chain id.
    chain_id: u64,
    /// The timeout applied to every request.
    rpc_timeout: Duration,
}

impl<P: Provider> AlloyTransactionSender<P> {
    /// Returns a new [`AlloyTransactionSender`].
    pub const fn new(
        provider: P,
        signer: PrivateKeySigner,
        chain_id: u64,
        rpc_timeout: Duration,
    ) -> Self {
        Self { provider, signer, chain_id, rpc_timeout }
    }
}

#[async_trait::async_trait]
impl<P: Provider> TransactionSender for AlloyTransactionSender<P> {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn pending_nonce(&self) -> Result<u64, ProviderError> {
        let request = self.provider.get_transaction_count(self.address()).pending();
        with_timeout(self.rpc_timeout, request).await
    }

    async fn confirmed_nonce(&self) -> Result<u64, ProviderError> {
        with_timeout(self.rpc_timeout, self.provider.get_transaction_count(self.address()).latest())
            .await
    }

    async fn sign_and_broadcast(
        &self,
        transaction: &ClaimTransaction,
        nonce: u64,
    ) -> Result<B256, ProviderError> {
        let mut tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit: transaction.gas_limit,
            max_fee_per_gas: transaction.fees.max_fee_per_gas,
            max_priority_fee_per_gas: transaction.fees.max_priority_fee_per_gas,
            to: TxKind::Call(transaction.to),
            value: U256::ZERO,
            access_list: Default::default(),
            input: transaction.input.clone(),
        };

        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|err| ProviderError::Rejected(err.to_string()))?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        let hash = *envelope.tx_hash();

        tracing::trace!(target: "postman::providers", ?hash, nonce, "Broadcasting signed transaction.");
        let encoded = envelope.encoded_2718();
        let pending =
            with_timeout(self.rpc_timeout, self.provider.send_raw_transaction(&encoded)).await?;
        debug_assert_eq!(*pending.tx_hash(), hash);

        Ok(hash)
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ClaimReceipt>, ProviderError> {
        let receipt =
            with_timeout(self.rpc_timeout, self.provider.get_transaction_receipt(hash)).await?;

        Ok(receipt.and_then(|receipt| {
            Some(ClaimReceipt {
                transaction_hash: receipt.transaction_hash,
                block_number: receipt.block_number?,
                success: receipt.status(),
                gas_used: receipt.gas_used,
                effective_gas_price: receipt.effective_gas_price,
            })
        }))
    }

    async fn pending_transaction(&self, hash: B256) -> Result<bool, ProviderError> {
        let transaction =
            with_timeout(self.rpc_timeout, self.provider.get_transaction_by_hash(hash)).await?;
        Ok(transaction.is_some())
    }
}
