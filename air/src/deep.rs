//! The DEEP combination: folds every committed column and the composition
//! polynomial, together with their out-of-domain openings, into a single
//! value per domain point. The prover evaluates it across the whole
//! low-degree-extension domain; the verifier recomputes it at each queried
//! position and matches it against the first FRI layer.

use itertools::Itertools;
use quartz_core::{Felt, ZERO};

/// Number of combination weights for the given column counts.
pub fn num_deep_weights(num_main_columns: usize, num_aux_columns: usize) -> usize {
    2 * (num_main_columns + num_aux_columns) + 1
}

/// The DEEP combination at one domain point.
///
/// Weight order: main at ζ, aux at ζ, main at ω·ζ, aux at ω·ζ, composition.
///
/// # Panics
/// Panics if the weight or opening counts do not line up.
#[allow(clippy::too_many_arguments)]
pub fn deep_combine_row(
    main_row: &[Felt],
    aux_row: &[Felt],
    composition_value: Felt,
    ood_main_row: &[Felt],
    ood_main_next_row: &[Felt],
    ood_aux_row: &[Felt],
    ood_aux_next_row: &[Felt],
    ood_composition_value: Felt,
    current_denominator_inverse: Felt,
    next_denominator_inverse: Felt,
    weights: &[Felt],
) -> Felt {
    let mut weight_iter = weights.iter().copied();
    let mut acc = ZERO;
    for (&value, &ood) in main_row.iter().zip_eq(ood_main_row) {
        acc += weight_iter.next().expect("weight per opening")
            * (value - ood)
            * current_denominator_inverse;
    }
    for (&value, &ood) in aux_row.iter().zip_eq(ood_aux_row) {
        acc += weight_iter.next().expect("weight per opening")
            * (value - ood)
            * current_denominator_inverse;
    }
    for (&value, &ood) in main_row.iter().zip_eq(ood_main_next_row) {
        acc += weight_iter.next().expect("weight per opening")
            * (value - ood)
            * next_denominator_inverse;
    }
    for (&value, &ood) in aux_row.iter().zip_eq(ood_aux_next_row) {
        acc += weight_iter.next().expect("weight per opening")
            * (value - ood)
            * next_denominator_inverse;
    }
    acc += weight_iter.next().expect("weight for the composition")
        * (composition_value - ood_composition_value)
        * current_denominator_inverse;
    assert!(weight_iter.next().is_none(), "all weights must be consumed");
    acc
}
