//! FRI proof types.

use quartz_core::{Digest, Felt, MerklePath};
use serde::{Deserialize, Serialize};

/// The prover-to-verifier messages of one FRI instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriProof {
    /// Merkle roots of all committed layers, starting with the initial
    /// codeword.
    pub layer_roots: Vec<Digest>,
    /// The last codeword, revealed in full.
    pub final_codeword: Vec<Felt>,
    /// One query proof per sampled query position, in sampling order.
    pub query_proofs: Vec<FriQueryProof>,
}

/// The openings needed to walk a single query through every layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriQueryProof {
    pub layers: Vec<FriLayerOpening>,
}

/// The two authenticated codeword values of one layer that a folding step
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriLayerOpening {
    /// Codeword value in the lower half of the layer domain.
    pub value: Felt,
    /// Codeword value at the corresponding position in the upper half.
    pub sibling: Felt,
    pub value_path: MerklePath,
    pub sibling_path: MerklePath,
}
