//! The STARK verifier: replays the Fiat–Shamir transcript, checks the AIR at
//! the out-of-domain point, verifies FRI folding consistency and Merkle
//! authentication at every queried position, and compares all cross-table
//! terminal values.

use quartz_air::challenges::Challenges;
use quartz_air::claim::Claim;
use quartz_air::constraints::{
    constraint_counts, evaluate_consistency_constraints, evaluate_initial_constraints,
    evaluate_terminal_constraints, evaluate_transition_constraints, Terminals,
};
use quartz_air::deep::{deep_combine_row, num_deep_weights};
use quartz_air::parameters::{ParameterError, StarkParameters};
use quartz_air::proof::Proof;
use quartz_air::{CLAIM_VERSION, NUM_AUX_COLUMNS, NUM_MAIN_COLUMNS};
use quartz_core::hash::hash_varlen;
use quartz_core::{Felt, MerkleTree, Transcript, ONE, ZERO};
use quartz_fri::{verify as verify_fri, FriError, FriParameters};

// ERRORS
// ================================================================================================

/// Proof rejection; carries the first failing check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error("proof version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("padded height 2^{0} is outside the supported range")]
    UnsupportedPaddedHeight(u32),
    #[error("proof structure is malformed: {0}")]
    MalformedProof(&'static str),
    #[error("the sampled out-of-domain point degenerates a denominator")]
    DegenerateSample,
    #[error("the composition polynomial disagrees with the constraints at the out-of-domain point")]
    OutOfDomainMismatch,
    #[error(transparent)]
    Fri(#[from] FriError),
    #[error("main-trace Merkle authentication failed at query {0}")]
    MainRowAuthenticationFailed(usize),
    #[error("auxiliary-trace Merkle authentication failed at query {0}")]
    AuxRowAuthenticationFailed(usize),
    #[error("composition Merkle authentication failed at query {0}")]
    CompositionAuthenticationFailed(usize),
    #[error("the DEEP combination disagrees with the FRI codeword at query {0}")]
    DeepCombinationMismatch(usize),
}

// VERIFIER
// ================================================================================================

/// Checks a proof against a claim.
///
/// # Errors
/// Rejects with the first failing check.
#[tracing::instrument(skip_all)]
pub fn verify(
    claim: &Claim,
    proof: &Proof,
    parameters: &StarkParameters,
) -> Result<(), VerificationError> {
    parameters.validate()?;
    if proof.version != CLAIM_VERSION {
        return Err(VerificationError::UnsupportedVersion(proof.version));
    }
    // the lookup table alone forces 2^8 rows; the field bounds the top
    if proof.log2_padded_height < 8
        || proof.log2_padded_height > StarkParameters::MAX_LOG2_PADDED_HEIGHT
    {
        return Err(VerificationError::UnsupportedPaddedHeight(proof.log2_padded_height));
    }
    if proof.ood_main_row.len() != NUM_MAIN_COLUMNS
        || proof.ood_main_next_row.len() != NUM_MAIN_COLUMNS
    {
        return Err(VerificationError::MalformedProof("out-of-domain main row width"));
    }
    if proof.ood_aux_row.len() != NUM_AUX_COLUMNS
        || proof.ood_aux_next_row.len() != NUM_AUX_COLUMNS
    {
        return Err(VerificationError::MalformedProof("out-of-domain auxiliary row width"));
    }

    let padded_height = proof.padded_height();
    let lde_domain_size = padded_height * parameters.blowup_factor;
    let lde_offset = Felt::GENERATOR;
    let omega = Felt::primitive_root_of_unity(proof.log2_padded_height);
    let last_row_point = omega.pow(padded_height as u64 - 1);

    // replay the transcript
    let mut transcript = Transcript::new(&claim.encode());
    transcript.absorb(&[Felt::new(proof.log2_padded_height as u64)]);
    transcript.absorb_digest(&proof.main_root);
    let challenges = Challenges::sample(&mut transcript);
    transcript.absorb_digest(&proof.aux_root);
    let weights = transcript.sample_vec(constraint_counts().total());
    transcript.absorb_digest(&proof.composition_root);
    let zeta = transcript.sample();
    transcript.absorb(&proof.ood_main_row);
    transcript.absorb(&proof.ood_main_next_row);
    transcript.absorb(&proof.ood_aux_row);
    transcript.absorb(&proof.ood_aux_next_row);
    transcript.absorb(&[proof.ood_composition_value]);
    let deep_weights =
        transcript.sample_vec(num_deep_weights(NUM_MAIN_COLUMNS, NUM_AUX_COLUMNS));

    // the AIR check: the claimed composition value must equal the weighted
    // sum of zerofier-divided constraint evaluations at ζ
    let terminals = Terminals::derive(claim, &challenges);
    let expected_composition = combine_constraints_at(
        zeta,
        proof,
        &challenges,
        &terminals,
        &weights,
        padded_height,
        last_row_point,
    )?;
    if expected_composition != proof.ood_composition_value {
        return Err(VerificationError::OutOfDomainMismatch);
    }

    // FRI: the DEEP combination is close to a low-degree polynomial
    let fri_parameters = FriParameters {
        domain_size: lde_domain_size,
        domain_offset: lde_offset,
        degree_bound: parameters.composition_degree_bound(padded_height),
        num_queries: parameters.num_queries,
    };
    let first_layer_openings = verify_fri(&proof.fri, &fri_parameters, &mut transcript)?;

    // link the FRI codeword to the trace commitments at every query
    if proof.openings.len() != first_layer_openings.len() {
        return Err(VerificationError::MalformedProof("row opening count"));
    }
    let omega_lde = Felt::primitive_root_of_unity(lde_domain_size.trailing_zeros());
    for (query, ((index, fri_value), opening)) in
        first_layer_openings.iter().zip(&proof.openings).enumerate()
    {
        if opening.main_row.len() != NUM_MAIN_COLUMNS
            || opening.aux_row.len() != NUM_AUX_COLUMNS
        {
            return Err(VerificationError::MalformedProof("opened row width"));
        }

        let main_leaf = hash_varlen(&opening.main_row);
        if !MerkleTree::verify(proof.main_root, *index, main_leaf, &opening.main_path) {
            return Err(VerificationError::MainRowAuthenticationFailed(query));
        }
        let aux_leaf = hash_varlen(&opening.aux_row);
        if !MerkleTree::verify(proof.aux_root, *index, aux_leaf, &opening.aux_path) {
            return Err(VerificationError::AuxRowAuthenticationFailed(query));
        }
        let composition_leaf = hash_varlen(&[opening.composition_value]);
        if !MerkleTree::verify(
            proof.composition_root,
            *index,
            composition_leaf,
            &opening.composition_path,
        ) {
            return Err(VerificationError::CompositionAuthenticationFailed(query));
        }

        let x = lde_offset * omega_lde.pow(*index as u64);
        let current_inverse =
            (x - zeta).try_inverse().ok_or(VerificationError::DegenerateSample)?;
        let next_inverse =
            (x - omega * zeta).try_inverse().ok_or(VerificationError::DegenerateSample)?;
        let recomputed = deep_combine_row(
            &opening.main_row,
            &opening.aux_row,
            opening.composition_value,
            &proof.ood_main_row,
            &proof.ood_main_next_row,
            &proof.ood_aux_row,
            &proof.ood_aux_next_row,
            proof.ood_composition_value,
            current_inverse,
            next_inverse,
            &deep_weights,
        );
        if recomputed != *fri_value {
            return Err(VerificationError::DeepCombinationMismatch(query));
        }
    }

    Ok(())
}

/// Evaluates the weighted, zerofier-divided constraint sum at the
/// out-of-domain point. The cross-table terminal equalities are part of the
/// terminal group, so a mismatch between any linkage's endpoints surfaces
/// here.
fn combine_constraints_at(
    zeta: Felt,
    proof: &Proof,
    challenges: &Challenges,
    terminals: &Terminals,
    weights: &[Felt],
    padded_height: usize,
    last_row_point: Felt,
) -> Result<Felt, VerificationError> {
    let initial = evaluate_initial_constraints(
        &proof.ood_main_row,
        &proof.ood_aux_row,
        challenges,
        terminals,
    );
    let consistency =
        evaluate_consistency_constraints(&proof.ood_main_row, &proof.ood_aux_row, challenges);
    let transition = evaluate_transition_constraints(
        &proof.ood_main_row,
        &proof.ood_aux_row,
        &proof.ood_main_next_row,
        &proof.ood_aux_next_row,
        challenges,
    );
    let terminal = evaluate_terminal_constraints(
        &proof.ood_main_row,
        &proof.ood_aux_row,
        challenges,
        terminals,
    );

    let initial_inverse =
        (zeta - ONE).try_inverse().ok_or(VerificationError::DegenerateSample)?;
    let subgroup_zerofier = zeta.pow(padded_height as u64) - ONE;
    let subgroup_inverse =
        subgroup_zerofier.try_inverse().ok_or(VerificationError::DegenerateSample)?;
    let terminal_zerofier = zeta - last_row_point;
    let terminal_inverse =
        terminal_zerofier.try_inverse().ok_or(VerificationError::DegenerateSample)?;
    let transition_inverse = subgroup_inverse * terminal_zerofier;

    let mut weight_iter = weights.iter();
    let mut acc = ZERO;
    for value in initial {
        acc += *weight_iter.next().ok_or(VerificationError::MalformedProof("weight count"))?
            * value
            * initial_inverse;
    }
    for value in consistency {
        acc += *weight_iter.next().ok_or(VerificationError::MalformedProof("weight count"))?
            * value
            * subgroup_inverse;
    }
    for value in transition {
        acc += *weight_iter.next().ok_or(VerificationError::MalformedProof("weight count"))?
            * value
            * transition_inverse;
    }
    for value in terminal {
        acc += *weight_iter.next().ok_or(VerificationError::MalformedProof("weight count"))?
            * value
            * terminal_inverse;
    }
    Ok(acc)
}
