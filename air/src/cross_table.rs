//! Cross-table argument kernels: permutation running products, evaluation
//! running sums, log-derivative lookups, and the row compressions shared by
//! both endpoints of every linkage.

use quartz_core::{batch_inverse, Felt, ONE, ZERO};

use crate::challenges::Challenges;

// ARGUMENT KERNELS
// ================================================================================================

/// A permutation argument: both sides accumulate
/// `RP ← RP · (α − compressed_row)` and must end at the same terminal.
pub struct PermArg;

impl PermArg {
    pub const fn default_initial() -> Felt {
        ONE
    }

    /// Evaluates `initial · Π (challenge − symbol)`.
    pub fn compute_terminal(symbols: &[Felt], initial: Felt, challenge: Felt) -> Felt {
        symbols.iter().fold(initial, |acc, &symbol| acc * (challenge - symbol))
    }
}

/// An evaluation argument: both sides accumulate
/// `RE ← α · RE + symbol` and must end at the same terminal.
pub struct EvalArg;

impl EvalArg {
    pub const fn default_initial() -> Felt {
        ONE
    }

    /// Evaluates `initial · αⁿ + Σ symbols[i] · α^(n−1−i)`.
    pub fn compute_terminal(symbols: &[Felt], initial: Felt, challenge: Felt) -> Felt {
        symbols.iter().fold(initial, |acc, &symbol| acc * challenge + symbol)
    }
}

/// A log-derivative lookup argument: clients and server accumulate
/// `LD ← LD + multiplicity / (α − compressed_row)` and must end at the same
/// terminal.
pub struct LookupArg;

impl LookupArg {
    pub const fn default_initial() -> Felt {
        ZERO
    }

    pub fn compute_terminal(symbols: &[Felt], initial: Felt, challenge: Felt) -> Felt {
        let denominators: Vec<Felt> = symbols.iter().map(|&symbol| challenge - symbol).collect();
        batch_inverse(&denominators).into_iter().fold(initial, |acc, inv| acc + inv)
    }

    pub fn compute_terminal_with_multiplicities(
        symbols: &[Felt],
        multiplicities: &[u64],
        initial: Felt,
        challenge: Felt,
    ) -> Felt {
        let denominators: Vec<Felt> = symbols.iter().map(|&symbol| challenge - symbol).collect();
        batch_inverse(&denominators)
            .into_iter()
            .zip(multiplicities)
            .fold(initial, |acc, (inv, &m)| acc + inv * Felt::new(m))
    }
}

// ROW COMPRESSIONS
// ================================================================================================

/// Compression of one instruction-lookup triple `(address, instruction, next
/// instruction or argument)`.
pub fn compress_instruction(
    challenges: &Challenges,
    address: Felt,
    instruction: Felt,
    next_instruction: Felt,
) -> Felt {
    challenges.program_address_weight * address
        + challenges.program_instruction_weight * instruction
        + challenges.program_next_instruction_weight * next_instruction
}

/// Compression of one op-stack underflow event.
pub fn compress_op_stack_row(
    challenges: &Challenges,
    clk: Felt,
    ib1_shrink: Felt,
    stack_pointer: Felt,
    first_underflow_element: Felt,
) -> Felt {
    challenges.op_stack_clk_weight * clk
        + challenges.op_stack_ib1_weight * ib1_shrink
        + challenges.op_stack_pointer_weight * stack_pointer
        + challenges.op_stack_first_underflow_weight * first_underflow_element
}

/// Compression of one RAM access.
pub fn compress_ram_row(
    challenges: &Challenges,
    clk: Felt,
    instruction_type: Felt,
    ram_pointer: Felt,
    ram_value: Felt,
) -> Felt {
    challenges.ram_clk_weight * clk
        + challenges.ram_instruction_type_weight * instruction_type
        + challenges.ram_pointer_weight * ram_pointer
        + challenges.ram_value_weight * ram_value
}

/// Compression of one jump-stack event.
pub fn compress_jump_stack_row(
    challenges: &Challenges,
    clk: Felt,
    ci: Felt,
    jsp: Felt,
    jso: Felt,
    jsd: Felt,
) -> Felt {
    challenges.jump_stack_clk_weight * clk
        + challenges.jump_stack_ci_weight * ci
        + challenges.jump_stack_jsp_weight * jsp
        + challenges.jump_stack_jso_weight * jso
        + challenges.jump_stack_jsd_weight * jsd
}

/// Compression of one hash co-processor invocation: the invoking instruction
/// together with the rate portion of the initial sponge state.
pub fn compress_hash_invocation(challenges: &Challenges, ci: Felt, rate: &[Felt]) -> Felt {
    debug_assert_eq!(rate.len(), challenges.hash_state_weights.len());
    let mut acc = challenges.hash_ci_weight * ci;
    for (&weight, &element) in challenges.hash_state_weights.iter().zip(rate) {
        acc += weight * element;
    }
    acc
}

/// Compression of one u32 co-processor entry.
pub fn compress_u32_row(
    challenges: &Challenges,
    ci: Felt,
    lhs: Felt,
    rhs: Felt,
    result: Felt,
) -> Felt {
    challenges.u32_ci_weight * ci
        + challenges.u32_lhs_weight * lhs
        + challenges.u32_rhs_weight * rhs
        + challenges.u32_result_weight * result
}

/// Compression of one cascade-table row: a 16-bit limb split into bytes,
/// together with the per-byte lookup outputs.
pub fn compress_cascade_row(
    challenges: &Challenges,
    look_in_hi: Felt,
    look_in_lo: Felt,
    look_out_hi: Felt,
    look_out_lo: Felt,
) -> Felt {
    challenges.cascade_in_hi_weight * look_in_hi
        + challenges.cascade_in_lo_weight * look_in_lo
        + challenges.cascade_out_hi_weight * look_out_hi
        + challenges.cascade_out_lo_weight * look_out_lo
}

/// Compression of one 8-bit lookup-table row.
pub fn compress_lookup_row(challenges: &Challenges, look_in: Felt, look_out: Felt) -> Felt {
    challenges.lookup_in_weight * look_in + challenges.lookup_out_weight * look_out
}

/// The lookup-table function `L(x) = (x + 1)³ − 1`.
pub fn lookup_function(x: Felt) -> Felt {
    let shifted = x + ONE;
    shifted * shifted * shifted - ONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_terminal_is_order_independent() {
        let challenge = Felt::new(0xdead_beef);
        let symbols = [Felt::new(3), Felt::new(17), Felt::new(99)];
        let reversed = [Felt::new(99), Felt::new(17), Felt::new(3)];
        assert_eq!(
            PermArg::compute_terminal(&symbols, PermArg::default_initial(), challenge),
            PermArg::compute_terminal(&reversed, PermArg::default_initial(), challenge),
        );
    }

    #[test]
    fn evaluation_terminal_is_order_dependent() {
        let challenge = Felt::new(0xdead_beef);
        let symbols = [Felt::new(3), Felt::new(17)];
        let reversed = [Felt::new(17), Felt::new(3)];
        assert_ne!(
            EvalArg::compute_terminal(&symbols, EvalArg::default_initial(), challenge),
            EvalArg::compute_terminal(&reversed, EvalArg::default_initial(), challenge),
        );
    }

    #[test]
    fn lookup_terminal_with_multiplicities_matches_repeated_symbols() {
        let challenge = Felt::new(123_456_789);
        let with_repeats =
            [Felt::new(5), Felt::new(5), Felt::new(5), Felt::new(9), Felt::new(9)];
        let distinct = [Felt::new(5), Felt::new(9)];
        let multiplicities = [3, 2];
        assert_eq!(
            LookupArg::compute_terminal(&with_repeats, LookupArg::default_initial(), challenge),
            LookupArg::compute_terminal_with_multiplicities(
                &distinct,
                &multiplicities,
                LookupArg::default_initial(),
                challenge,
            ),
        );
    }

    #[test]
    fn lookup_function_has_the_advertised_form() {
        assert_eq!(lookup_function(ZERO), ZERO);
        assert_eq!(lookup_function(ONE), Felt::new(7));
        assert_eq!(lookup_function(Felt::new(255)), Felt::new(256u64.pow(3) - 1));
    }
}
