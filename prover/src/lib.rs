//! The STARK prover: extends the execution trace to a Reed–Solomon codeword
//! over a coset, commits to it, composes the AIR constraints into a single
//! quotient, and proves its low degree with FRI.

use quartz_air::challenges::Challenges;
use quartz_air::claim::Claim;
use quartz_air::constraints::{
    constraint_counts, evaluate_consistency_constraints, evaluate_initial_constraints,
    evaluate_terminal_constraints, evaluate_transition_constraints, Terminals,
};
use quartz_air::deep::{deep_combine_row, num_deep_weights};
use quartz_air::parameters::{ParameterError, StarkParameters};
use quartz_air::proof::{Proof, RowOpening};
use quartz_air::CLAIM_VERSION;
use quartz_core::hash::hash_varlen;
use quartz_core::merkle::MerkleError;
use quartz_core::polynomial::{coset_evaluate, coset_interpolate};
use quartz_core::{batch_inverse, Felt, MerkleTree, Polynomial, Transcript, ONE, ZERO};
use quartz_fri::{FriParameters, FriProver};
use quartz_processor::{AetError, AlgebraicExecutionTrace};

// ERRORS
// ================================================================================================

/// An internal failure during proof generation; no proof is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProverError {
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error(transparent)]
    Trace(#[from] AetError),
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    #[error("the claimed program digest does not match the executed program")]
    ClaimDigestMismatch,
    #[error("a sampled point collapsed a quotient denominator")]
    DegenerateSample,
}

// PROVER
// ================================================================================================

/// Produces a proof that the recorded execution satisfies the claim.
///
/// # Errors
/// Returns an error on malformed parameters, an unusable trace, or an
/// internal witness failure. A failed attempt produces no partial proof.
#[tracing::instrument(skip_all)]
pub fn prove(
    claim: &Claim,
    aet: &AlgebraicExecutionTrace,
    parameters: &StarkParameters,
) -> Result<Proof, ProverError> {
    parameters.validate()?;
    if claim.program_digest != aet.program.hash() {
        return Err(ProverError::ClaimDigestMismatch);
    }

    // trace and low-degree-extension domains
    let main = aet.to_master_main()?;
    let padded_height = main.padded_height;
    let log2_padded_height = padded_height.trailing_zeros();
    if log2_padded_height > StarkParameters::MAX_LOG2_PADDED_HEIGHT {
        return Err(ParameterError::PaddedHeightTooLarge(log2_padded_height).into());
    }
    let lde_domain_size = padded_height * parameters.blowup_factor;
    let lde_offset = Felt::GENERATOR;
    let omega = Felt::primitive_root_of_unity(log2_padded_height);

    let mut transcript = Transcript::new(&claim.encode());
    transcript.absorb(&[Felt::new(log2_padded_height as u64)]);

    // main-trace commitment
    let main_columns: Vec<Vec<Felt>> =
        (0..main.rows[0].len()).map(|column| main.column(column)).collect();
    let (main_polynomials, main_lde_rows) =
        extend_columns(&main_columns, lde_offset, lde_domain_size);
    let main_tree = commit_rows(&main_lde_rows)?;
    transcript.absorb_digest(&main_tree.root());

    // challenges and auxiliary-trace commitment
    let challenges = Challenges::sample(&mut transcript);
    let aux = aet.build_aux_columns(&main, &challenges)?;
    let aux_columns: Vec<Vec<Felt>> =
        (0..aux[0].len()).map(|column| aux.iter().map(|row| row[column]).collect()).collect();
    let (aux_polynomials, aux_lde_rows) = extend_columns(&aux_columns, lde_offset, lde_domain_size);
    let aux_tree = commit_rows(&aux_lde_rows)?;
    transcript.absorb_digest(&aux_tree.root());

    // constraint aggregation weights
    let weights = transcript.sample_vec(constraint_counts().total());

    // composition codeword
    let terminals = Terminals::derive(claim, &challenges);
    let composition_codeword = compose(
        &main_lde_rows,
        &aux_lde_rows,
        &challenges,
        &terminals,
        &weights,
        parameters,
        padded_height,
    );
    let composition_tree = commit_values(&composition_codeword)?;
    transcript.absorb_digest(&composition_tree.root());

    // out-of-domain openings
    let zeta = transcript.sample();
    let ood_main_row = evaluate_all(&main_polynomials, zeta);
    let ood_main_next_row = evaluate_all(&main_polynomials, omega * zeta);
    let ood_aux_row = evaluate_all(&aux_polynomials, zeta);
    let ood_aux_next_row = evaluate_all(&aux_polynomials, omega * zeta);
    let composition_polynomial =
        Polynomial::new(coset_interpolate(lde_offset, &composition_codeword));
    let ood_composition_value = composition_polynomial.evaluate(zeta);

    transcript.absorb(&ood_main_row);
    transcript.absorb(&ood_main_next_row);
    transcript.absorb(&ood_aux_row);
    transcript.absorb(&ood_aux_next_row);
    transcript.absorb(&[ood_composition_value]);

    // the DEEP combination codeword
    let deep_weights =
        transcript.sample_vec(num_deep_weights(main_columns.len(), aux_columns.len()));
    let deep_codeword = deep_combine(
        &main_lde_rows,
        &aux_lde_rows,
        &composition_codeword,
        &ood_main_row,
        &ood_main_next_row,
        &ood_aux_row,
        &ood_aux_next_row,
        ood_composition_value,
        zeta,
        omega,
        lde_offset,
        lde_domain_size,
        &deep_weights,
    )?;

    let fri_parameters = FriParameters {
        domain_size: lde_domain_size,
        domain_offset: lde_offset,
        degree_bound: parameters.composition_degree_bound(padded_height),
        num_queries: parameters.num_queries,
    };
    let (fri_proof, query_indices) =
        FriProver::prove(deep_codeword, &fri_parameters, &mut transcript);

    // authenticated row openings at the queried positions
    let openings = query_indices
        .iter()
        .map(|&index| {
            Ok(RowOpening {
                main_row: main_lde_rows[index].clone(),
                main_path: main_tree.open(index)?,
                aux_row: aux_lde_rows[index].clone(),
                aux_path: aux_tree.open(index)?,
                composition_value: composition_codeword[index],
                composition_path: composition_tree.open(index)?,
            })
        })
        .collect::<Result<Vec<_>, MerkleError>>()?;

    Ok(Proof {
        version: CLAIM_VERSION,
        log2_padded_height,
        main_root: main_tree.root(),
        aux_root: aux_tree.root(),
        composition_root: composition_tree.root(),
        ood_main_row,
        ood_main_next_row,
        ood_aux_row,
        ood_aux_next_row,
        ood_composition_value,
        fri: fri_proof,
        openings,
    })
}

// LOW-DEGREE EXTENSION
// ================================================================================================

/// Interpolates every column over the trace domain and evaluates it over the
/// low-degree-extension coset; returns the interpolants and the row-major
/// extension.
fn extend_columns(
    columns: &[Vec<Felt>],
    offset: Felt,
    domain_size: usize,
) -> (Vec<Polynomial>, Vec<Vec<Felt>>) {
    let polynomials: Vec<Polynomial> = columns
        .iter()
        .map(|column| Polynomial::new(coset_interpolate(ONE, column)))
        .collect();
    let extended: Vec<Vec<Felt>> = polynomials
        .iter()
        .map(|polynomial| coset_evaluate(&polynomial.coefficients, offset, domain_size))
        .collect();

    let rows = (0..domain_size)
        .map(|row| extended.iter().map(|column| column[row]).collect())
        .collect();
    (polynomials, rows)
}

fn commit_rows(rows: &[Vec<Felt>]) -> Result<MerkleTree, MerkleError> {
    MerkleTree::build(rows.iter().map(|row| hash_varlen(row)).collect())
}

fn commit_values(values: &[Felt]) -> Result<MerkleTree, MerkleError> {
    MerkleTree::build(values.iter().map(|value| hash_varlen(&[*value])).collect())
}

fn evaluate_all(polynomials: &[Polynomial], point: Felt) -> Vec<Felt> {
    polynomials.iter().map(|polynomial| polynomial.evaluate(point)).collect()
}

// COMPOSITION
// ================================================================================================

/// Evaluates the random linear combination of all zerofier-divided
/// constraints over the low-degree-extension domain.
#[allow(clippy::too_many_arguments)]
fn compose(
    main_rows: &[Vec<Felt>],
    aux_rows: &[Vec<Felt>],
    challenges: &Challenges,
    terminals: &Terminals,
    weights: &[Felt],
    parameters: &StarkParameters,
    padded_height: usize,
) -> Vec<Felt> {
    let domain_size = main_rows.len();
    let offset = Felt::GENERATOR;
    let omega_lde = Felt::primitive_root_of_unity(domain_size.trailing_zeros());
    let omega_trace = Felt::primitive_root_of_unity(padded_height.trailing_zeros());
    let last_row_point = omega_trace.pow(padded_height as u64 - 1);
    let counts = constraint_counts();

    // zerofier inverses for all four groups, batched per point
    let mut points = Vec::with_capacity(domain_size);
    let mut point = offset;
    for _ in 0..domain_size {
        points.push(point);
        point *= omega_lde;
    }
    let initial_zerofiers: Vec<Felt> = points.iter().map(|&x| x - ONE).collect();
    let subgroup_zerofiers: Vec<Felt> =
        points.iter().map(|&x| x.pow(padded_height as u64) - ONE).collect();
    let terminal_zerofiers: Vec<Felt> = points.iter().map(|&x| x - last_row_point).collect();
    let initial_inverses = batch_inverse(&initial_zerofiers);
    let subgroup_inverses = batch_inverse(&subgroup_zerofiers);
    let terminal_inverses = batch_inverse(&terminal_zerofiers);

    let mut composition = Vec::with_capacity(domain_size);
    for row in 0..domain_size {
        // ω·x on the extension domain is `blowup` steps ahead
        let next = (row + parameters.blowup_factor) % domain_size;

        let initial =
            evaluate_initial_constraints(&main_rows[row], &aux_rows[row], challenges, terminals);
        let consistency =
            evaluate_consistency_constraints(&main_rows[row], &aux_rows[row], challenges);
        let transition = evaluate_transition_constraints(
            &main_rows[row],
            &aux_rows[row],
            &main_rows[next],
            &aux_rows[next],
            challenges,
        );
        let terminal =
            evaluate_terminal_constraints(&main_rows[row], &aux_rows[row], challenges, terminals);

        // the transition zerofier vanishes on all trace rows but the last
        let transition_inverse = subgroup_inverses[row] * terminal_zerofiers[row];

        let mut weight_iter = weights.iter();
        let mut acc = ZERO;
        for value in initial {
            acc += *weight_iter.next().expect("weight per constraint") * value
                * initial_inverses[row];
        }
        for value in consistency {
            acc += *weight_iter.next().expect("weight per constraint") * value
                * subgroup_inverses[row];
        }
        for value in transition {
            acc += *weight_iter.next().expect("weight per constraint") * value
                * transition_inverse;
        }
        for value in terminal {
            acc += *weight_iter.next().expect("weight per constraint") * value
                * terminal_inverses[row];
        }
        debug_assert_eq!(weight_iter.next(), None);
        composition.push(acc);
    }

    debug_assert_eq!(counts.total(), weights.len());
    composition
}

// DEEP COMBINATION
// ================================================================================================

/// Folds all committed codewords and their out-of-domain openings into the
/// single codeword handed to FRI.
#[allow(clippy::too_many_arguments)]
fn deep_combine(
    main_rows: &[Vec<Felt>],
    aux_rows: &[Vec<Felt>],
    composition: &[Felt],
    ood_main_row: &[Felt],
    ood_main_next_row: &[Felt],
    ood_aux_row: &[Felt],
    ood_aux_next_row: &[Felt],
    ood_composition_value: Felt,
    zeta: Felt,
    omega: Felt,
    offset: Felt,
    domain_size: usize,
    weights: &[Felt],
) -> Result<Vec<Felt>, ProverError> {
    let omega_lde = Felt::primitive_root_of_unity(domain_size.trailing_zeros());

    let mut current_denominators = Vec::with_capacity(domain_size);
    let mut next_denominators = Vec::with_capacity(domain_size);
    let mut point = offset;
    for _ in 0..domain_size {
        current_denominators.push(point - zeta);
        next_denominators.push(point - omega * zeta);
        point *= omega_lde;
    }
    if current_denominators.iter().chain(&next_denominators).any(Felt::is_zero) {
        return Err(ProverError::DegenerateSample);
    }
    let current_inverses = batch_inverse(&current_denominators);
    let next_inverses = batch_inverse(&next_denominators);

    let codeword = (0..domain_size)
        .map(|row| {
            deep_combine_row(
                &main_rows[row],
                &aux_rows[row],
                composition[row],
                ood_main_row,
                ood_main_next_row,
                ood_aux_row,
                ood_aux_next_row,
                ood_composition_value,
                current_inverses[row],
                next_inverses[row],
                weights,
            )
        })
        .collect();
    Ok(codeword)
}
