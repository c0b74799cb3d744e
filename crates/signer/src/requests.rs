use crate::{BroadcastedClaim, SignerError};

use postman_primitives::ClaimTransaction;
use tokio::sync::oneshot;

/// An enum representing the requests that can be sent to the nonce manager.
#[derive(Debug)]
pub enum NonceManagerRequest {
    /// Request to sign and broadcast a claim transaction.
    Broadcast {
        /// The transaction.
        transaction: ClaimTransaction,
        /// The channel the outcome is sent on.
        reply: oneshot::Sender<Result<BroadcastedClaim, SignerError>>,
    },
}
