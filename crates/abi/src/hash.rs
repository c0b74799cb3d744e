use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;

/// Computes the hash of a message the way the message service does:
/// `keccak256(abi.encode(from, to, fee, value, nonce, calldata))`.
pub fn compute_message_hash(
    from: Address,
    to: Address,
    fee: U256,
    value: U256,
    nonce: U256,
    calldata: &Bytes,
) -> B256 {
    keccak256((from, to, fee, value, nonce, calldata.clone()).abi_encode_params())
}
