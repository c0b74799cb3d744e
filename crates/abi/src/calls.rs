use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use postman_primitives::{Message, MessageProof};

sol! {
    #[derive(Debug)]
    struct ClaimMessageWithProofParams {
        bytes32[] proof;
        uint256 messageNumber;
        uint32 leafIndex;
        address from;
        address to;
        uint256 fee;
        uint256 value;
        address feeRecipient;
        bytes32 merkleRoot;
        bytes data;
    }

    #[derive(Debug)]
    function claimMessage(
        address _from,
        address _to,
        uint256 _fee,
        uint256 _value,
        address _feeRecipient,
        bytes calldata _calldata,
        uint256 _nonce
    ) external;

    #[derive(Debug)]
    function claimMessageWithProof(ClaimMessageWithProofParams calldata _params) external;

    #[derive(Debug)]
    function inboxL1L2MessageStatus(bytes32 messageHash) external view returns (uint256);

    #[derive(Debug)]
    function isMessageClaimed(uint256 _messageNumber) external view returns (bool);

    #[derive(Debug)]
    function limitInWei() external view returns (uint256);

    #[derive(Debug)]
    function currentPeriodAmountInWei() external view returns (uint256);
}

/// A call to claim a message on the destination message service.
#[derive(Debug, derive_more::From)]
pub enum ClaimCall {
    /// A direct claim, for messages delivered through the destination inbox.
    Claim(claimMessageCall),
    /// A claim carrying a Merkle proof of inclusion in an anchored tree.
    ClaimWithProof(claimMessageWithProofCall),
}

impl ClaimCall {
    /// Returns the claim call for the message.
    ///
    /// A proof must be provided when the message direction requires one, it is ignored otherwise.
    pub fn new(message: &Message, fee_recipient: Address, proof: Option<MessageProof>) -> Self {
        match proof {
            Some(proof) if message.direction.requires_proof() => {
                claimMessageWithProofCall {
                    _params: ClaimMessageWithProofParams {
                        proof: proof.proof,
                        messageNumber: message.message_nonce,
                        leafIndex: proof.leaf_index,
                        from: message.sender,
                        to: message.recipient,
                        fee: message.fee,
                        value: message.value,
                        feeRecipient: fee_recipient,
                        merkleRoot: proof.root,
                        data: message.calldata.clone(),
                    },
                }
                .into()
            }
            _ => claimMessageCall {
                _from: message.sender,
                _to: message.recipient,
                _fee: message.fee,
                _value: message.value,
                _feeRecipient: fee_recipient,
                _calldata: message.calldata.clone(),
                _nonce: message.message_nonce,
            }
            .into(),
        }
    }

    /// Returns the ABI encoded calldata of the call.
    pub fn abi_encode(&self) -> Bytes {
        match self {
            Self::Claim(call) => call.abi_encode().into(),
            Self::ClaimWithProof(call) => call.abi_encode().into(),
        }
    }

    /// Tries to decode the calldata into a [`ClaimCall`].
    pub fn try_decode(calldata: &[u8]) -> Option<Self> {
        let selector: [u8; 4] = calldata.get(0..4)?.try_into().ok()?;
        match selector {
            claimMessageCall::SELECTOR => {
                claimMessageCall::abi_decode(calldata).map(Into::into).ok()
            }
            claimMessageWithProofCall::SELECTOR => {
                claimMessageWithProofCall::abi_decode(calldata).map(Into::into).ok()
            }
            _ => None,
        }
    }
}

/// Returns the calldata of the claim for the message.
pub fn claim_calldata(
    message: &Message,
    fee_recipient: Address,
    proof: Option<MessageProof>,
) -> Bytes {
    ClaimCall::new(message, fee_recipient, proof).abi_encode()
}
