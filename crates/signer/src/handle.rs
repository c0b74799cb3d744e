use alloy_primitives::Address;
use postman_primitives::ClaimTransaction;
use tokio::sync::{mpsc::UnboundedSender, oneshot};

use super::{BroadcastedClaim, NonceManagerRequest, SignerError};

/// A handle to the nonce manager that allows sending broadcast requests.
#[derive(Debug, Clone)]
pub struct NonceManagerHandle {
    /// A channel to send requests to the nonce manager.
    request_tx: UnboundedSender<NonceManagerRequest>,
    /// The signer address.
    address: Address,
}

impl NonceManagerHandle {
    /// Creates a new [`NonceManagerHandle`] instance.
    pub const fn new(request_tx: UnboundedSender<NonceManagerRequest>, address: Address) -> Self {
        Self { request_tx, address }
    }

    /// Returns the address of the signing key.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Signs and broadcasts the transaction, waiting for the outcome.
    pub async fn broadcast(
        &self,
        transaction: ClaimTransaction,
    ) -> Result<BroadcastedClaim, SignerError> {
        let (reply, rx) = oneshot::channel();
        self.request_tx
            .send(NonceManagerRequest::Broadcast { transaction, reply })
            .map_err(|_| SignerError::RequestChannelClosed)?;
        rx.await.map_err(|_| SignerError::ReplyChannelClosed)?
    }
}
