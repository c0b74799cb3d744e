//! The Merkle tree of L2 messages anchored on L1.
//!
//! On finalization, the L1 rollup contract records one root per group of `2^depth` consecutive
//! messages sent in the finalized L2 block range. A claim on L1 proves the inclusion of its
//! message in one of those roots.

use alloy_primitives::{keccak256, B256};
use postman_primitives::MessageProof;

/// The maximum supported tree depth.
pub const MAX_TREE_DEPTH: u32 = 24;

/// An error building a Merkle tree or proof.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    /// The tree depth is not supported.
    #[error("unsupported tree depth {0}")]
    UnsupportedDepth(u32),
    /// More leaves were provided than the tree can hold.
    #[error("{leaves} leaves do not fit in a tree of depth {depth}")]
    TooManyLeaves {
        /// The number of leaves.
        leaves: usize,
        /// The depth of the tree.
        depth: u32,
    },
    /// The leaf index is outside of the tree.
    #[error("leaf index {0} is out of bounds")]
    LeafOutOfBounds(usize),
    /// The message hash is not part of the finalized messages.
    #[error("message {0} is not part of the anchored messages")]
    MessageNotFound(B256),
}

/// A Merkle tree of fixed depth where missing leaves are the zero hash.
#[derive(Debug, Clone)]
pub struct SparseMerkleTree {
    /// The tree levels, from the leaves to the root.
    levels: Vec<Vec<B256>>,
}

impl SparseMerkleTree {
    /// Builds the tree of the provided depth containing the leaves, padded with zero hashes.
    pub fn new(depth: u32, leaves: &[B256]) -> Result<Self, MerkleError> {
        if depth > MAX_TREE_DEPTH {
            return Err(MerkleError::UnsupportedDepth(depth));
        }
        let width = 1usize << depth;
        if leaves.len() > width {
            return Err(MerkleError::TooManyLeaves { leaves: leaves.len(), depth });
        }

        let mut level = leaves.to_vec();
        level.resize(width, B256::ZERO);

        let mut levels = Vec::with_capacity(depth as usize + 1);
        while level.len() > 1 {
            let next = level.chunks_exact(2).map(|pair| hash_pair(pair[0], pair[1])).collect();
            levels.push(std::mem::replace(&mut level, next));
        }
        levels.push(level);

        Ok(Self { levels })
    }

    /// Returns the root of the tree.
    pub fn root(&self) -> B256 {
        self.levels.last().and_then(|level| level.first()).copied().unwrap_or_default()
    }

    /// Returns the depth of the tree.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Returns the proof of inclusion of the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MessageProof, MerkleError> {
        if index >= self.levels[0].len() {
            return Err(MerkleError::LeafOutOfBounds(index));
        }

        let proof = self.levels[..self.depth()]
            .iter()
            .enumerate()
            .map(|(height, level)| level[(index >> height) ^ 1])
            .collect();

        Ok(MessageProof { proof, root: self.root(), leaf_index: index as u32 })
    }
}

/// Returns true if the proof shows the inclusion of `leaf` in the proof's root.
pub fn verify_proof(leaf: B256, proof: &MessageProof) -> bool {
    let mut node = leaf;
    for (height, sibling) in proof.proof.iter().enumerate() {
        node = if (proof.leaf_index >> height) & 1 == 0 {
            hash_pair(node, *sibling)
        } else {
            hash_pair(*sibling, node)
        };
    }
    node == proof.root
}

/// Returns the leaves of the tree containing `message_hash` among the ordered hashes of all
/// messages anchored by a finalization, padded to the tree width.
pub fn message_siblings(
    message_hash: B256,
    message_hashes: &[B256],
    depth: u32,
) -> Result<Vec<B256>, MerkleError> {
    if depth > MAX_TREE_DEPTH {
        return Err(MerkleError::UnsupportedDepth(depth));
    }
    let width = 1usize << depth;
    let index = message_hashes
        .iter()
        .position(|hash| *hash == message_hash)
        .ok_or(MerkleError::MessageNotFound(message_hash))?;

    let start = index / width * width;
    let end = message_hashes.len().min(start + width);
    let mut siblings = message_hashes[start..end].to_vec();
    siblings.resize(width, B256::ZERO);

    Ok(siblings)
}

fn hash_pair(left: B256, right: B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}
