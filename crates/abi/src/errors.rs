use alloy_sol_types::{sol, SolError};

sol! {
    #[derive(Debug)]
    error RateLimitExceeded();

    #[derive(Debug)]
    error MessageAlreadyClaimed(uint256 messageIndex);

    #[derive(Debug)]
    error MessageDoesNotExistOrHasAlreadyBeenClaimed(bytes32 messageHash);
}

/// A revert of the message service that the Postman acts upon.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContractRevert {
    /// The claim would exceed the destination rate limiter.
    RateLimitExceeded,
    /// The message was claimed already.
    MessageAlreadyClaimed,
}

impl ContractRevert {
    /// Tries to decode the revert data returned by the message service.
    pub fn try_decode(data: &[u8]) -> Option<Self> {
        let selector: [u8; 4] = data.get(0..4)?.try_into().ok()?;
        match selector {
            RateLimitExceeded::SELECTOR => Some(Self::RateLimitExceeded),
            MessageAlreadyClaimed::SELECTOR |
            MessageDoesNotExistOrHasAlreadyBeenClaimed::SELECTOR => {
                Some(Self::MessageAlreadyClaimed)
            }
            _ => None,
        }
    }
}
