//! The FRI verifier: re-derive the folding challenges, walk every query
//! through the layers, and check the final codeword's degree.

use quartz_core::hash::hash_varlen;
use quartz_core::polynomial::coset_interpolate;
use quartz_core::{Felt, MerkleTree, Transcript};

use crate::proof::FriProof;
use crate::FriParameters;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FriError {
    #[error("expected {expected} layer roots, proof carries {actual}")]
    LayerCountMismatch { expected: usize, actual: usize },
    #[error("expected a final codeword of {expected} values, proof carries {actual}")]
    FinalCodewordLengthMismatch { expected: usize, actual: usize },
    #[error("expected {expected} query proofs, proof carries {actual}")]
    QueryCountMismatch { expected: usize, actual: usize },
    #[error("Merkle authentication failed in layer {layer} of query {query}")]
    BadMerklePath { query: usize, layer: usize },
    #[error("folding inconsistency between layers {layer} and {next} of query {query}", next = layer + 1)]
    FoldingMismatch { query: usize, layer: usize },
    #[error("query {query} disagrees with the final codeword")]
    FinalCodewordMismatch { query: usize },
    #[error("final codeword has degree {actual}, exceeding the bound {bound}")]
    FinalDegreeTooHigh { actual: usize, bound: usize },
}

/// Verifies a FRI proof against the given transcript state.
///
/// On success, returns `(position, value)` pairs binding the initial-layer
/// codeword at every sampled query position; the caller is responsible for
/// linking these values to its own commitments.
///
/// # Errors
/// Returns the first failing check.
pub fn verify(
    proof: &FriProof,
    parameters: &FriParameters,
    transcript: &mut Transcript,
) -> Result<Vec<(usize, Felt)>, FriError> {
    let num_rounds = parameters.num_rounds();
    if proof.layer_roots.len() != num_rounds {
        return Err(FriError::LayerCountMismatch {
            expected: num_rounds,
            actual: proof.layer_roots.len(),
        });
    }
    if proof.final_codeword.len() != parameters.final_domain_size() {
        return Err(FriError::FinalCodewordLengthMismatch {
            expected: parameters.final_domain_size(),
            actual: proof.final_codeword.len(),
        });
    }

    // replay the commit phase to recover the folding challenges
    let mut betas = Vec::with_capacity(num_rounds);
    for root in &proof.layer_roots {
        transcript.absorb_digest(root);
        betas.push(transcript.sample());
    }
    transcript.absorb(&proof.final_codeword);

    let query_indices = transcript.sample_indices(parameters.num_queries, parameters.domain_size);
    if proof.query_proofs.len() != query_indices.len() {
        return Err(FriError::QueryCountMismatch {
            expected: query_indices.len(),
            actual: proof.query_proofs.len(),
        });
    }

    check_final_codeword_degree(proof, parameters)?;

    let mut first_layer_openings = Vec::with_capacity(query_indices.len());
    for (query, (&index, query_proof)) in
        query_indices.iter().zip(&proof.query_proofs).enumerate()
    {
        if query_proof.layers.len() != num_rounds {
            return Err(FriError::LayerCountMismatch {
                expected: num_rounds,
                actual: query_proof.layers.len(),
            });
        }

        let mut domain_size = parameters.domain_size;
        let mut offset = parameters.domain_offset;
        let mut position = index;
        let mut expected: Option<Felt> = None;

        for (layer, opening) in query_proof.layers.iter().enumerate() {
            let half = domain_size / 2;
            let lo = position % half;
            let hi = lo + half;

            let root = proof.layer_roots[layer];
            let value_leaf = hash_varlen(&[opening.value]);
            let sibling_leaf = hash_varlen(&[opening.sibling]);
            if !MerkleTree::verify(root, lo, value_leaf, &opening.value_path)
                || !MerkleTree::verify(root, hi, sibling_leaf, &opening.sibling_path)
            {
                return Err(FriError::BadMerklePath { query, layer });
            }

            // the value at the queried position must match the previous fold
            let queried = if position < half { opening.value } else { opening.sibling };
            if let Some(expected) = expected {
                if queried != expected {
                    return Err(FriError::FoldingMismatch { query, layer: layer - 1 });
                }
            }
            if layer == 0 {
                first_layer_openings.push((index, queried));
            }

            let omega = Felt::primitive_root_of_unity(domain_size.trailing_zeros());
            let x = offset * omega.pow(lo as u64);
            let two_inv = Felt::new(2).inverse();
            let even = (opening.value + opening.sibling) * two_inv;
            let odd = (opening.value - opening.sibling) * two_inv * x.inverse();
            expected = Some(even + betas[layer] * odd);

            position = lo;
            domain_size = half;
            offset *= offset;
        }

        let final_value = proof.final_codeword[position];
        match expected {
            Some(expected) if expected != final_value => {
                return Err(FriError::FinalCodewordMismatch { query });
            },
            // without any folding rounds the initial codeword is the final one
            None => first_layer_openings.push((index, final_value)),
            _ => (),
        }
    }

    Ok(first_layer_openings)
}

fn check_final_codeword_degree(
    proof: &FriProof,
    parameters: &FriParameters,
) -> Result<(), FriError> {
    let num_rounds = parameters.num_rounds();
    let final_offset = (0..num_rounds).fold(parameters.domain_offset, |offset, _| offset * offset);
    let coefficients = coset_interpolate(final_offset, &proof.final_codeword);

    let bound = parameters.final_degree_bound();
    let degree = coefficients.iter().rposition(|c| !c.is_zero());
    if let Some(degree) = degree {
        if degree >= bound {
            return Err(FriError::FinalDegreeTooHigh { actual: degree, bound });
        }
    }
    Ok(())
}
