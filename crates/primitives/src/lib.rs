//! Primitive types for the Postman.

pub use chain::{
    AnchoringEvent, AnchoringId, ClaimReceipt, ClaimTransaction, GasFees, MessageProof,
    RateLimitState,
};
mod chain;

pub use direction::Direction;
mod direction;

pub use message::{Message, MessageSentEvent};
mod message;

pub use status::{ClaimFailure, ExclusionReason, MessageStatus, OnChainMessageStatus};
mod status;

pub use time::unix_timestamp;
mod time;
