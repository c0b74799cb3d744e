use crate::ProviderError;

use alloy_primitives::{Address, B256};
use postman_primitives::{ClaimReceipt, ClaimTransaction};

/// An instance of the trait signs and broadcasts transactions for one signing key.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait TransactionSender: Send + Sync {
    /// Returns the address of the signing key.
    fn address(&self) -> Address;

    /// Returns the next nonce of the signing key, including transactions in the mempool.
    async fn pending_nonce(&self) -> Result<u64, ProviderError>;

    /// Returns the next nonce of the signing key, counting mined transactions only.
    async fn confirmed_nonce(&self) -> Result<u64, ProviderError>;

    /// Signs the transaction with the provided nonce and broadcasts it, returning its hash.
    async fn sign_and_broadcast(
        &self,
        transaction: &ClaimTransaction,
        nonce: u64,
    ) -> Result<B256, ProviderError>;

    /// Returns the receipt of the transaction, if it was mined.
    async fn receipt(&self, hash: B256) -> Result<Option<ClaimReceipt>, ProviderError>;

    /// Returns true if the transaction is still known to the node.
    async fn pending_transaction(&self, hash: B256) -> Result<bool, ProviderError>;
}
