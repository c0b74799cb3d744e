//! Contract bindings and encoding used by the Postman: message service events, claim calls,
//! revert decoding and the Merkle tree of L2 messages.

pub mod calls;
pub use calls::{claim_calldata, ClaimCall};

pub mod errors;
pub use errors::ContractRevert;

pub mod events;
pub use events::try_decode_log;

mod hash;
pub use hash::compute_message_hash;

pub mod merkle;
pub use merkle::{message_siblings, verify_proof, MerkleError, SparseMerkleTree};
