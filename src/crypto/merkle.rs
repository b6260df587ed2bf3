//! Merkle tree implementation
//!
//! Commits an ordered list of transaction ids to a single root hash and
//! produces inclusion proofs verifiable against that root alone. Leaves
//! hash the id's hex form; internal nodes hash the concatenation of their
//! children's hex digests. An unpaired node is paired with itself.

use super::{sha256, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Merkle tree errors
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("cannot build a merkle tree from an empty id list")]
    EmptyInput,
    #[error("id {0} is not committed by this tree")]
    IdNotFound(Hash),
}

/// A node in the tree; leaves have no children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleNode {
    pub hash: Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<MerkleNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<MerkleNode>>,
}

impl MerkleNode {
    fn leaf(hash: Hash) -> Self {
        Self {
            hash,
            left: None,
            right: None,
        }
    }
}

/// Which side a proof sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion proof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: Hash,
    pub side: Side,
}

/// Ordered sibling hashes from leaf to root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleProof {
    pub steps: Vec<ProofStep>,
}

/// Merkle tree over an ordered transaction-id list
#[derive(Debug, Clone)]
pub struct MerkleTree {
    root: MerkleNode,
    ids: Vec<Hash>,
}

impl MerkleTree {
    /// Build a tree committing the given ids, in order
    pub fn new(ids: &[Hash]) -> Result<Self, MerkleError> {
        if ids.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut level: Vec<MerkleNode> = ids
            .iter()
            .map(|id| MerkleNode::leaf(leaf_hash(id)))
            .collect();

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                if let Some(last) = level.last().cloned() {
                    level.push(last);
                }
            }

            let mut next = Vec::with_capacity(level.len() / 2);
            let mut nodes = level.into_iter();
            while let (Some(left), Some(right)) = (nodes.next(), nodes.next()) {
                next.push(MerkleNode {
                    hash: combine(&left.hash, &right.hash),
                    left: Some(Box::new(left)),
                    right: Some(Box::new(right)),
                });
            }
            level = next;
        }

        match level.pop() {
            Some(root) => Ok(Self {
                root,
                ids: ids.to_vec(),
            }),
            None => Err(MerkleError::EmptyInput),
        }
    }

    /// Root commitment
    pub fn root(&self) -> &Hash {
        &self.root.hash
    }

    /// Root node of the tree structure
    pub fn root_node(&self) -> &MerkleNode {
        &self.root
    }

    /// Build an inclusion proof for one of the committed ids
    pub fn get_proof(&self, id: &Hash) -> Result<MerkleProof, MerkleError> {
        let mut index = self
            .ids
            .iter()
            .position(|candidate| candidate == id)
            .ok_or(MerkleError::IdNotFound(*id))?;

        let mut level: Vec<Hash> = self.ids.iter().map(leaf_hash).collect();
        let mut steps = Vec::new();

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                if let Some(last) = level.last().copied() {
                    level.push(last);
                }
            }

            let (sibling_index, side) = if index % 2 == 0 {
                (index + 1, Side::Right)
            } else {
                (index - 1, Side::Left)
            };
            steps.push(ProofStep {
                hash: level[sibling_index],
                side,
            });

            level = level
                .chunks(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();
            index /= 2;
        }

        Ok(MerkleProof { steps })
    }

    /// Verify a proof against a claimed root, statelessly
    ///
    /// Re-derives the root from the id and the ordered siblings; any
    /// alteration of id, proof, or root makes this false.
    pub fn verify(id: &Hash, proof: &MerkleProof, root: &Hash) -> bool {
        let mut current = leaf_hash(id);
        for step in &proof.steps {
            current = match step.side {
                Side::Left => combine(&step.hash, &current),
                Side::Right => combine(&current, &step.hash),
            };
        }
        current == *root
    }
}

fn leaf_hash(id: &Hash) -> Hash {
    sha256(id.to_hex().as_bytes())
}

fn combine(left: &Hash, right: &Hash) -> Hash {
    let mut data = String::with_capacity(128);
    data.push_str(&left.to_hex());
    data.push_str(&right.to_hex());
    sha256(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ids(n: usize) -> Vec<Hash> {
        (0..n).map(|i| sha256(&(i as u64).to_le_bytes())).collect()
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(MerkleTree::new(&[]), Err(MerkleError::EmptyInput)));
    }

    #[test]
    fn test_single_id_root() {
        let ids = make_ids(1);
        let tree = MerkleTree::new(&ids).unwrap();
        assert_eq!(*tree.root(), leaf_hash(&ids[0]));
    }

    #[test]
    fn test_two_ids_root() {
        let ids = make_ids(2);
        let tree = MerkleTree::new(&ids).unwrap();
        let expected = combine(&leaf_hash(&ids[0]), &leaf_hash(&ids[1]));
        assert_eq!(*tree.root(), expected);
    }

    #[test]
    fn test_order_sensitivity() {
        let ids = make_ids(2);
        let forward = MerkleTree::new(&ids).unwrap();
        let reversed = MerkleTree::new(&[ids[1], ids[0]]).unwrap();
        assert_ne!(forward.root(), reversed.root());
    }

    #[test]
    fn test_proof_verifies_for_every_id() {
        for n in [1usize, 2, 3, 5, 8, 13] {
            let ids = make_ids(n);
            let tree = MerkleTree::new(&ids).unwrap();
            for id in &ids {
                let proof = tree.get_proof(id).unwrap();
                assert!(MerkleTree::verify(id, &proof, tree.root()));
            }
        }
    }

    #[test]
    fn test_proof_fails_on_alteration() {
        let ids = make_ids(8);
        let tree = MerkleTree::new(&ids).unwrap();
        let mut proof = tree.get_proof(&ids[3]).unwrap();

        // Wrong id
        let wrong_id = sha256(b"wrong");
        assert!(!MerkleTree::verify(&wrong_id, &proof, tree.root()));

        // Wrong root
        assert!(!MerkleTree::verify(&ids[3], &proof, &sha256(b"root")));

        // Tampered step
        proof.steps[0].hash = sha256(b"tampered");
        assert!(!MerkleTree::verify(&ids[3], &proof, tree.root()));
    }

    #[test]
    fn test_unknown_id_has_no_proof() {
        let ids = make_ids(4);
        let tree = MerkleTree::new(&ids).unwrap();
        assert!(matches!(
            tree.get_proof(&sha256(b"absent")),
            Err(MerkleError::IdNotFound(_))
        ));
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        let ids = make_ids(5);
        let tree = MerkleTree::new(&ids).unwrap();
        let proof = tree.get_proof(&ids[4]).unwrap();
        assert!(MerkleTree::verify(&ids[4], &proof, tree.root()));
    }

    #[test]
    fn test_proof_roundtrips_through_json() {
        let ids = make_ids(4);
        let tree = MerkleTree::new(&ids).unwrap();
        let proof = tree.get_proof(&ids[2]).unwrap();
        let json = serde_json::to_string(&proof).unwrap();
        let back: MerkleProof = serde_json::from_str(&json).unwrap();
        assert!(MerkleTree::verify(&ids[2], &back, tree.root()));
    }
}
