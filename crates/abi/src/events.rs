use alloy_primitives::{Log, B256};
use alloy_sol_types::{sol, SolEvent};
use postman_primitives::{AnchoringEvent, AnchoringId, MessageSentEvent};

sol! {
    #[cfg_attr(feature = "test-utils", derive(arbitrary::Arbitrary))]
    #[derive(Debug)]
    event MessageSent(
        address indexed _from,
        address indexed _to,
        uint256 _fee,
        uint256 _value,
        uint256 _nonce,
        bytes _calldata,
        bytes32 indexed _messageHash
    );

    #[derive(Debug)]
    event L1L2MessageHashesAddedToInbox(bytes32[] messageHashes);

    #[cfg_attr(feature = "test-utils", derive(arbitrary::Arbitrary))]
    #[derive(Debug)]
    event L2MessagingBlockAnchored(uint256 indexed l2Block);

    #[cfg_attr(feature = "test-utils", derive(arbitrary::Arbitrary))]
    #[derive(Debug)]
    event L2MerkleRootAdded(bytes32 indexed l2MerkleRoot, uint256 indexed treeDepth);
}

/// Tries to decode the provided log into the type T.
pub fn try_decode_log<T: SolEvent>(log: &Log) -> Option<Log<T>> {
    T::decode_log(log).ok()
}

impl MessageSent {
    /// Converts the decoded event into a [`MessageSentEvent`] located at the provided position.
    pub fn into_event(
        self,
        block_number: u64,
        transaction_hash: B256,
        log_index: u64,
    ) -> MessageSentEvent {
        MessageSentEvent {
            message_hash: self._messageHash,
            sender: self._from,
            recipient: self._to,
            fee: self._fee,
            value: self._value,
            nonce: self._nonce,
            calldata: self._calldata,
            block_number,
            transaction_hash,
            log_index,
        }
    }
}

impl L1L2MessageHashesAddedToInbox {
    /// Returns an [`AnchoringEvent`] for each message hash added to the inbox.
    pub fn anchoring_events(&self, block_number: u64) -> impl Iterator<Item = AnchoringEvent> + '_ {
        self.messageHashes
            .iter()
            .map(move |hash| AnchoringEvent { id: AnchoringId::MessageHash(*hash), block_number })
    }
}

impl L2MessagingBlockAnchored {
    /// Returns the [`AnchoringEvent`] for the anchored L2 block.
    pub fn anchoring_event(&self, block_number: u64) -> AnchoringEvent {
        AnchoringEvent { id: AnchoringId::SourceBlock(self.l2Block.saturating_to()), block_number }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes, Address, U256};

    #[test]
    fn test_decode_message_sent() {
        let event = MessageSent {
            _from: address!("0x1111111111111111111111111111111111111111"),
            _to: address!("0x2222222222222222222222222222222222222222"),
            _fee: U256::from(10),
            _value: U256::from(20),
            _nonce: U256::from(3),
            _calldata: bytes!("0xdeadbeef"),
            _messageHash: B256::repeat_byte(0x42),
        };
        let address = Address::repeat_byte(0x99);
        let log = Log { address, data: event.encode_log_data() };

        let decoded = try_decode_log::<MessageSent>(&log).unwrap();
        let message = decoded.data.into_event(100, B256::repeat_byte(1), 4);

        assert_eq!(message.message_hash, B256::repeat_byte(0x42));
        assert_eq!(message.fee, U256::from(10));
        assert_eq!(message.calldata, bytes!("0xdeadbeef"));
        assert_eq!(message.block_number, 100);
        assert_eq!(message.log_index, 4);
    }

    #[test]
    fn test_decode_wrong_event_is_none() {
        let event = L2MessagingBlockAnchored { l2Block: U256::from(7) };
        let log = Log { address: Address::ZERO, data: event.encode_log_data() };

        assert!(try_decode_log::<MessageSent>(&log).is_none());
        let decoded = try_decode_log::<L2MessagingBlockAnchored>(&log).unwrap();
        assert_eq!(
            decoded.data.anchoring_event(12),
            AnchoringEvent { id: AnchoringId::SourceBlock(7), block_number: 12 }
        );
    }

    #[test]
    fn test_inbox_event_anchors_every_hash() {
        let hashes = vec![B256::repeat_byte(1), B256::repeat_byte(2)];
        let event = L1L2MessageHashesAddedToInbox { messageHashes: hashes.clone() };

        let anchored: Vec<_> = event.anchoring_events(5).map(|e| e.id).collect();
        assert_eq!(
            anchored,
            hashes.into_iter().map(AnchoringId::MessageHash).collect::<Vec<_>>()
        );
    }
}
