//! The FRI prover: commit, fold, and answer queries.

use quartz_core::hash::hash_varlen;
use quartz_core::{Felt, MerkleTree, Transcript};

use crate::proof::{FriLayerOpening, FriProof, FriQueryProof};
use crate::FriParameters;

pub struct FriProver;

impl FriProver {
    /// Runs the commit and query phases over the given codeword.
    ///
    /// Returns the proof together with the sampled query positions in the
    /// initial domain, so the caller can open its own commitments at the same
    /// positions.
    ///
    /// # Panics
    /// Panics if the codeword length does not match the parameters.
    pub fn prove(
        codeword: Vec<Felt>,
        parameters: &FriParameters,
        transcript: &mut Transcript,
    ) -> (FriProof, Vec<usize>) {
        assert_eq!(codeword.len(), parameters.domain_size, "codeword length mismatch");

        let num_rounds = parameters.num_rounds();
        let mut codewords = vec![codeword];
        let mut trees = Vec::with_capacity(num_rounds);
        let mut layer_roots = Vec::with_capacity(num_rounds);

        // commit phase: absorb each layer root, sample the folding challenge,
        // and halve the codeword
        let mut offset = parameters.domain_offset;
        for _ in 0..num_rounds {
            let tree = {
                let current = codewords.last().expect("at least the initial codeword is present");
                commit_codeword(current)
            };
            transcript.absorb_digest(&tree.root());
            layer_roots.push(tree.root());
            trees.push(tree);

            let beta = transcript.sample();
            let folded = {
                let current = codewords.last().expect("at least the initial codeword is present");
                fold_codeword(current, offset, beta)
            };
            codewords.push(folded);
            offset *= offset;
        }

        let final_codeword = codewords.last().expect("folding leaves a final codeword").clone();
        transcript.absorb(&final_codeword);

        let query_indices = transcript.sample_indices(parameters.num_queries, parameters.domain_size);

        let query_proofs = query_indices
            .iter()
            .map(|&index| Self::open_query(index, &codewords, &trees, parameters))
            .collect();

        (FriProof { layer_roots, final_codeword, query_proofs }, query_indices)
    }

    fn open_query(
        index: usize,
        codewords: &[Vec<Felt>],
        trees: &[MerkleTree],
        parameters: &FriParameters,
    ) -> FriQueryProof {
        let mut layers = Vec::with_capacity(trees.len());
        let mut position = index;
        let mut domain_size = parameters.domain_size;

        for (codeword, tree) in codewords.iter().zip(trees) {
            let half = domain_size / 2;
            let lo = position % half;
            let hi = lo + half;
            layers.push(FriLayerOpening {
                value: codeword[lo],
                sibling: codeword[hi],
                value_path: tree.open(lo).expect("query position is in the layer domain"),
                sibling_path: tree.open(hi).expect("sibling position is in the layer domain"),
            });
            position = lo;
            domain_size = half;
        }

        FriQueryProof { layers }
    }
}

/// Merkle-commits to a codeword with one leaf per value.
pub(crate) fn commit_codeword(codeword: &[Felt]) -> MerkleTree {
    let leaves = codeword.iter().map(|&value| hash_varlen(&[value])).collect();
    MerkleTree::build(leaves).expect("codeword length is a power of two")
}

/// One folding step: combines `f(x)` and `f(−x)` into the evaluation of
/// `f_even + β·f_odd` on the squared domain.
pub(crate) fn fold_codeword(codeword: &[Felt], offset: Felt, beta: Felt) -> Vec<Felt> {
    let half = codeword.len() / 2;
    let omega = Felt::primitive_root_of_unity(codeword.len().trailing_zeros());
    let two_inv = Felt::new(2).inverse();

    let mut x = offset;
    let mut folded = Vec::with_capacity(half);
    for i in 0..half {
        let plus = codeword[i];
        let minus = codeword[i + half];
        let even = (plus + minus) * two_inv;
        let odd = (plus - minus) * two_inv * x.inverse();
        folded.push(even + beta * odd);
        x *= omega;
    }
    folded
}
