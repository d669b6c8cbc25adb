//! Binary Merkle tree over digest leaves, with logarithmic authentication
//! paths.

use serde::{Deserialize, Serialize};

use crate::hash::{hash_pair, Digest};

// MERKLE PATH
// ================================================================================================

/// Sibling digests from a leaf to the root, leaf level first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath(pub Vec<Digest>);

impl MerklePath {
    /// Recomputes the root implied by authenticating `leaf` at `index`.
    pub fn compute_root(&self, index: usize, leaf: Digest) -> Digest {
        let mut node = leaf;
        let mut index = index;
        for sibling in &self.0 {
            node = if index & 1 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            index >>= 1;
        }
        node
    }
}

// MERKLE TREE
// ================================================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree over {0} leaves; need a non-zero power of two")]
    InvalidLeafCount(usize),
    #[error("leaf index {index} is out of bounds for a tree with {num_leaves} leaves")]
    LeafIndexOutOfBounds { index: usize, num_leaves: usize },
}

/// A binary Merkle tree committing to a sequence of digests.
///
/// Nodes are stored in a flat 1-indexed array: the root at index 1 and the
/// leaves at indices `n..2n`.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    nodes: Vec<Digest>,
    num_leaves: usize,
}

impl MerkleTree {
    /// Builds a tree over the given leaves.
    ///
    /// # Errors
    /// Returns an error if the number of leaves is zero or not a power of two.
    pub fn build(leaves: Vec<Digest>) -> Result<Self, MerkleError> {
        let num_leaves = leaves.len();
        if num_leaves == 0 || !num_leaves.is_power_of_two() {
            return Err(MerkleError::InvalidLeafCount(num_leaves));
        }

        let mut nodes = vec![Digest::default(); 2 * num_leaves];
        nodes[num_leaves..].copy_from_slice(&leaves);
        for i in (1..num_leaves).rev() {
            nodes[i] = hash_pair(&nodes[2 * i], &nodes[2 * i + 1]);
        }
        Ok(Self { nodes, num_leaves })
    }

    pub fn root(&self) -> Digest {
        self.nodes[1]
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Returns the authentication path for the leaf at `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is out of bounds.
    pub fn open(&self, index: usize) -> Result<MerklePath, MerkleError> {
        if index >= self.num_leaves {
            return Err(MerkleError::LeafIndexOutOfBounds { index, num_leaves: self.num_leaves });
        }
        let mut path = Vec::with_capacity(self.num_leaves.trailing_zeros() as usize);
        let mut node = self.num_leaves + index;
        while node > 1 {
            path.push(self.nodes[node ^ 1]);
            node >>= 1;
        }
        Ok(MerklePath(path))
    }

    /// Checks that `leaf` sits at `index` in the tree with the given root.
    pub fn verify(root: Digest, index: usize, leaf: Digest, path: &MerklePath) -> bool {
        path.compute_root(index, leaf) == root
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::field::Felt;
    use crate::hash::hash_varlen;

    fn random_leaves(rng: &mut StdRng, count: usize) -> Vec<Digest> {
        (0..count).map(|_| hash_varlen(&[Felt::new(rng.random())])).collect()
    }

    #[test]
    fn every_leaf_authenticates_against_the_root() {
        let mut rng = StdRng::seed_from_u64(3);
        let leaves = random_leaves(&mut rng, 32);
        let tree = MerkleTree::build(leaves.clone()).unwrap();

        for (index, leaf) in leaves.iter().enumerate() {
            let path = tree.open(index).unwrap();
            assert!(MerkleTree::verify(tree.root(), index, *leaf, &path));
        }
    }

    #[test]
    fn tampered_leaf_or_index_fails_authentication() {
        let mut rng = StdRng::seed_from_u64(4);
        let leaves = random_leaves(&mut rng, 16);
        let tree = MerkleTree::build(leaves.clone()).unwrap();

        let path = tree.open(5).unwrap();
        assert!(!MerkleTree::verify(tree.root(), 5, leaves[6], &path));
        assert!(!MerkleTree::verify(tree.root(), 6, leaves[5], &path));
    }

    #[test]
    fn non_power_of_two_leaf_counts_are_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            MerkleTree::build(random_leaves(&mut rng, 12)).unwrap_err(),
            MerkleError::InvalidLeafCount(12)
        );
        assert_eq!(MerkleTree::build(vec![]).unwrap_err(), MerkleError::InvalidLeafCount(0));
    }

    #[test]
    fn out_of_bounds_opening_is_rejected() {
        let mut rng = StdRng::seed_from_u64(6);
        let tree = MerkleTree::build(random_leaves(&mut rng, 8)).unwrap();
        assert!(matches!(tree.open(8), Err(MerkleError::LeafIndexOutOfBounds { .. })));
    }
}
