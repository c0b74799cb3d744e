//! The crate exposes the chain collaborators of the Postman along with their implementations
//! backed by [`alloy_provider`].

pub use contract::MessageServiceClient;
mod contract;

pub use error::{ProviderError, RevertReason};
mod error;

pub use fees::{FeeHistory, FeeHistorySource};
mod fees;

pub use sender::TransactionSender;
mod sender;

pub use source::ChainLogSource;
mod source;

pub use alloy::{AlloyChainClient, AlloyMessageServiceClient, AlloyTransactionSender};
mod alloy;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
