//! The four AIR constraint groups over the master tables.
//!
//! Every function evaluates its constraint group on concrete row values; the
//! prover calls them pointwise over the low-degree-extension domain, the
//! verifier calls them once on the out-of-domain openings. Constraints are
//! polynomial in the row values and the challenges; no constraint divides.
//!
//! Conventions, shared with the trace builders:
//! - auxiliary columns are running values; a column is either *inclusive*
//!   (row i's value contains row i's contribution) or *deferred* (row i's
//!   value contains the contributions of rows before i),
//! - padding rows never contribute to any accumulator.

use quartz_core::hash::RATE;
use quartz_core::{Felt, Instruction, ONE, ZERO};

use crate::challenges::Challenges;
use crate::claim::Claim;
use crate::columns::{
    CascadeAuxColumn, CascadeMainColumn, HashMainColumn, JumpStackAuxColumn, LookupAuxColumn,
    LookupMainColumn, OpStackAuxColumn, OpStackMainColumn, ProcessorAuxColumn,
    ProcessorMainColumn, ProgramAuxColumn, ProgramHashAuxColumn, ProgramHashMainColumn,
    ProgramMainColumn, RamAuxColumn, RamMainColumn, U32AuxColumn, U32MainColumn,
    NUM_AUX_COLUMNS, NUM_MAIN_COLUMNS,
};
use crate::cross_table::{
    compress_cascade_row, compress_instruction, compress_lookup_row, compress_op_stack_row,
    compress_ram_row, compress_u32_row, lookup_function, EvalArg,
};

/// Inverse of two, for the `x(x−1)/2` padding indicators.
const TWO_INV: Felt = Felt::new(9_223_372_034_707_292_161);

// TERMINALS
// ================================================================================================

/// Claim-derived values entering boundary and terminal constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminals {
    pub program_digest: [Felt; 5],
    pub input_terminal: Felt,
    pub output_terminal: Felt,
}

impl Terminals {
    /// Computes the claim-dependent terminal values under the given
    /// challenges; prover and verifier derive identical values from the
    /// public claim.
    pub fn derive(claim: &Claim, challenges: &Challenges) -> Self {
        Self {
            program_digest: *claim.program_digest.elements(),
            input_terminal: EvalArg::compute_terminal(
                &claim.input,
                EvalArg::default_initial(),
                challenges.input_indeterminate,
            ),
            output_terminal: EvalArg::compute_terminal(
                &claim.output,
                EvalArg::default_initial(),
                challenges.output_indeterminate,
            ),
        }
    }
}

// INDICATORS
// ================================================================================================

/// 1 iff the ternary flag equals 2, i.e. marks a padding row.
fn ternary_padding_indicator(flag: Felt) -> Felt {
    flag * (flag - ONE) * TWO_INV
}

// INITIAL CONSTRAINTS
// ================================================================================================

/// Constraints that must vanish on the first row.
pub fn evaluate_initial_constraints(
    main: &[Felt],
    aux: &[Felt],
    challenges: &Challenges,
    terminals: &Terminals,
) -> Vec<Felt> {
    debug_assert_eq!(main.len(), NUM_MAIN_COLUMNS);
    debug_assert_eq!(aux.len(), NUM_AUX_COLUMNS);

    let mut constraints = Vec::new();
    processor_initial(main, aux, challenges, terminals, &mut constraints);
    op_stack_initial(main, aux, challenges, &mut constraints);
    ram_initial(main, aux, challenges, &mut constraints);
    program_initial(main, aux, challenges, &mut constraints);
    program_hash_initial(main, aux, challenges, &mut constraints);
    hash_initial(main, &mut constraints);
    u32_initial(main, aux, challenges, &mut constraints);
    cascade_initial(main, aux, challenges, &mut constraints);
    lookup_initial(main, aux, challenges, &mut constraints);
    constraints
}

fn processor_initial(
    main: &[Felt],
    aux: &[Felt],
    ch: &Challenges,
    t: &Terminals,
    out: &mut Vec<Felt>,
) {
    use ProcessorAuxColumn as A;
    use ProcessorMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let a = |c: A| aux[c.master_index()];

    out.push(m(M::Clk));
    out.push(m(M::Ip));
    out.push(m(M::Jsp));
    out.push(m(M::Jso));
    out.push(m(M::Jsd));
    out.push(m(M::IsPadding));
    out.push(m(M::OpStackPointer) - Felt::new(5));

    // the stack is pre-loaded with the program digest in reverse
    out.push(m(M::St0) - t.program_digest[4]);
    out.push(m(M::St1) - t.program_digest[3]);
    out.push(m(M::St2) - t.program_digest[2]);
    out.push(m(M::St3) - t.program_digest[1]);
    out.push(m(M::St4) - t.program_digest[0]);
    for c in [
        M::St5,
        M::St6,
        M::St7,
        M::St8,
        M::St9,
        M::St10,
        M::St11,
        M::St12,
        M::St13,
        M::St14,
        M::St15,
    ] {
        out.push(m(c));
    }

    out.push(a(A::InputEvalArg) - ONE);

    // the output evaluation starts at the evaluation of the digest, which is
    // sitting in st0..st4 in reverse
    let alpha = ch.output_indeterminate;
    let mut digest_eval = ONE;
    for c in [M::St4, M::St3, M::St2, M::St1, M::St0] {
        digest_eval = digest_eval * alpha + m(c);
    }
    out.push(a(A::OutputEvalArg) - digest_eval);

    let compressed = compress_instruction(ch, m(M::Ip), m(M::Ci), m(M::Nia));
    out.push(
        a(A::InstructionLookupClientLogDerivative)
            * (ch.instruction_lookup_indeterminate - compressed)
            - ONE,
    );

    out.push(
        a(A::ClockJumpDifferenceLookupServerLogDerivative)
            * (ch.clock_jump_indeterminate - m(M::Clk))
            - m(M::ClockJumpDifferenceLookupMultiplicity),
    );

    out.push(a(A::RuntimePermutationRunningProduct) - ONE);
}

fn op_stack_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use OpStackAuxColumn as A;
    use OpStackMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let a = |c: A| aux[c.master_index()];

    let pad = ternary_padding_indicator(m(M::Ib1Shrink));
    let compressed = compress_op_stack_row(
        ch,
        m(M::Clk),
        m(M::Ib1Shrink),
        m(M::StackPointer),
        m(M::FirstUnderflowElement),
    );
    out.push(
        a(A::RunningProductPermArg)
            - (pad + (ONE - pad) * (ch.op_stack_indeterminate - compressed)),
    );
    out.push(a(A::ClockJumpDifferenceLookupClientLogDerivative));
}

fn ram_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use RamAuxColumn as A;
    use RamMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let a = |c: A| aux[c.master_index()];

    let pad = ternary_padding_indicator(m(M::InstructionType));
    let beta = ch.ram_bezout_indeterminate;

    out.push(a(A::PointerRunningProduct) - (pad + (ONE - pad) * (beta - m(M::RamPointer))));
    out.push(a(A::FormalDerivative) - (ONE - pad));
    out.push(a(A::BezoutAccumulator0) - (pad + (ONE - pad) * m(M::BezoutCoefficient0)));
    out.push(a(A::BezoutAccumulator1) - (ONE - pad) * m(M::BezoutCoefficient1));

    let compressed =
        compress_ram_row(ch, m(M::Clk), m(M::InstructionType), m(M::RamPointer), m(M::RamValue));
    out.push(
        a(A::RunningProductPermArg) - (pad + (ONE - pad) * (ch.ram_indeterminate - compressed)),
    );
    out.push(a(A::ClockJumpDifferenceLookupClientLogDerivative));
}

fn program_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use ProgramAuxColumn as A;
    use ProgramMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let a = |c: A| aux[c.master_index()];

    out.push(m(M::Address));
    out.push(m(M::IndexInChunk));
    out.push(m(M::IsHashInputPadding));
    out.push(a(A::InstructionLookupServerLogDerivative));
    out.push(
        a(A::PrepareChunkRunningEvaluation)
            - (ch.program_chunk_inner_indeterminate + m(M::Instruction)),
    );
    out.push(a(A::SendChunkRunningEvaluation) - ONE);
}

fn program_hash_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use ProgramHashAuxColumn as A;
    use ProgramHashMainColumn as M;
    let m = |c: M| main[c.master_index()];

    out.push(m(M::RoundNumber));
    out.push(m(M::Mode) - ONE);
    out.push(m(M::IsPadding));

    // the first chunk is absorbed into the all-zero state, so the rate
    // portion of the first row is the first chunk itself
    let mut chunk_eval = ONE;
    for c in [
        M::State0,
        M::State1,
        M::State2,
        M::State3,
        M::State4,
        M::State5,
        M::State6,
        M::State7,
        M::State8,
        M::State9,
    ] {
        chunk_eval = chunk_eval * ch.program_chunk_inner_indeterminate + m(c);
    }
    out.push(
        aux[A::ReceiveChunkRunningEvaluation.master_index()]
            - (ch.program_chunk_outer_indeterminate + chunk_eval),
    );
}

fn hash_initial(main: &[Felt], out: &mut Vec<Felt>) {
    out.push(main[HashMainColumn::RoundNumber.master_index()]);
}

fn u32_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use U32MainColumn as M;
    let m = |c: M| main[c.master_index()];

    let compressed = compress_u32_row(ch, m(M::Ci), m(M::Lhs), m(M::Rhs), m(M::Result));
    out.push(
        aux[U32AuxColumn::ProcessorLookupServerLogDerivative.master_index()]
            * (ch.u32_indeterminate - compressed)
            - m(M::CopyFlag) * m(M::LookupMultiplicity),
    );
}

fn cascade_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use CascadeAuxColumn as A;
    use CascadeMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let a = |c: A| aux[c.master_index()];

    let not_pad = ONE - m(M::IsPadding);
    let compressed =
        compress_cascade_row(ch, m(M::LookInHi), m(M::LookInLo), m(M::LookOutHi), m(M::LookOutLo));
    out.push(
        a(A::U32LookupServerLogDerivative) * (ch.cascade_indeterminate - compressed)
            - not_pad * m(M::LookupMultiplicity),
    );

    let hi = ch.lookup_indeterminate - compress_lookup_row(ch, m(M::LookInHi), m(M::LookOutHi));
    let lo = ch.lookup_indeterminate - compress_lookup_row(ch, m(M::LookInLo), m(M::LookOutLo));
    out.push(a(A::ByteLookupClientLogDerivative) * hi * lo - not_pad * (hi + lo));
}

fn lookup_initial(main: &[Felt], aux: &[Felt], ch: &Challenges, out: &mut Vec<Felt>) {
    use LookupMainColumn as M;
    let m = |c: M| main[c.master_index()];

    out.push(m(M::LookIn));
    let compressed = compress_lookup_row(ch, m(M::LookIn), m(M::LookOut));
    out.push(
        aux[LookupAuxColumn::CascadeLookupServerLogDerivative.master_index()]
            * (ch.lookup_indeterminate - compressed)
            - m(M::LookupMultiplicity),
    );
}

// CONSISTENCY CONSTRAINTS
// ================================================================================================

/// Constraints that must vanish on every row.
pub fn evaluate_consistency_constraints(
    main: &[Felt],
    _aux: &[Felt],
    _challenges: &Challenges,
) -> Vec<Felt> {
    debug_assert_eq!(main.len(), NUM_MAIN_COLUMNS);

    let mut constraints = Vec::new();
    let boolean = |x: Felt| x * (x - ONE);
    let ternary = |x: Felt| x * (x - ONE) * (x - Felt::new(2));
    // an exact inverse witness: both vanish iff `inv = d⁻¹`, or `d = 0 ∧ inv = 0`
    let inverse_pair = |d: Felt, inv: Felt| [d * (d * inv - ONE), inv * (d * inv - ONE)];

    // processor
    {
        use ProcessorMainColumn as M;
        let m = |c: M| main[c.master_index()];
        constraints.push(boolean(m(M::Ib0)));
        constraints.push(boolean(m(M::Ib1)));
        constraints.push(boolean(m(M::Ib2)));
        constraints.push(boolean(m(M::IsPadding)));
    }

    // op stack
    constraints.push(ternary(main[OpStackMainColumn::Ib1Shrink.master_index()]));

    // ram
    constraints.push(ternary(main[RamMainColumn::InstructionType.master_index()]));

    // program
    {
        use ProgramMainColumn as M;
        let m = |c: M| main[c.master_index()];
        constraints.push(boolean(m(M::IsHashInputPadding)));
        constraints.push(boolean(m(M::IsTablePadding)));
        let d = Felt::new(RATE as u64 - 1) - m(M::IndexInChunk);
        constraints.extend(inverse_pair(d, m(M::MaxMinusIndexInv)));
        constraints.push(m(M::IsHashInputPadding) * m(M::LookupMultiplicity));
    }

    // program hash
    {
        use ProgramHashMainColumn as M;
        let m = |c: M| main[c.master_index()];
        constraints.push(boolean(m(M::Mode)));
        constraints.push(boolean(m(M::IsPadding)));
        constraints.push(m(M::Mode) + m(M::IsPadding) - ONE);
    }

    // u32
    {
        use U32MainColumn as M;
        let m = |c: M| main[c.master_index()];
        constraints.push(boolean(m(M::CopyFlag)));
        constraints.extend(inverse_pair(m(M::Bits) - Felt::new(33), m(M::BitsMinus33Inv)));
        constraints.extend(inverse_pair(m(M::Lhs), m(M::LhsInv)));
        constraints.extend(inverse_pair(m(M::Rhs), m(M::RhsInv)));
        constraints.push((ONE - m(M::CopyFlag)) * m(M::LookupMultiplicity));
    }

    // cascade
    {
        use CascadeMainColumn as M;
        let m = |c: M| main[c.master_index()];
        let not_pad = ONE - m(M::IsPadding);
        constraints.push(boolean(m(M::IsPadding)));
        constraints.push(not_pad * (lookup_function(m(M::LookInHi)) - m(M::LookOutHi)));
        constraints.push(not_pad * (lookup_function(m(M::LookInLo)) - m(M::LookOutLo)));
        constraints.push(m(M::IsPadding) * m(M::LookupMultiplicity));
    }

    // lookup
    {
        use LookupMainColumn as M;
        let m = |c: M| main[c.master_index()];
        constraints.push(boolean(m(M::IsPadding)));
        constraints
            .push((ONE - m(M::IsPadding)) * (lookup_function(m(M::LookIn)) - m(M::LookOut)));
        constraints.push(m(M::IsPadding) * m(M::LookupMultiplicity));
    }

    constraints
}

// TRANSITION CONSTRAINTS
// ================================================================================================

/// Constraints that must vanish on every pair of consecutive rows.
pub fn evaluate_transition_constraints(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    challenges: &Challenges,
) -> Vec<Felt> {
    let mut constraints = Vec::new();
    processor_transition(main, aux, next_main, next_aux, challenges, &mut constraints);
    op_stack_transition(main, aux, next_main, next_aux, challenges, &mut constraints);
    ram_transition(main, aux, next_main, next_aux, challenges, &mut constraints);
    program_transition(main, aux, next_main, next_aux, challenges, &mut constraints);
    program_hash_transition(main, next_main, &mut constraints);
    u32_transition(aux, next_main, next_aux, challenges, &mut constraints);
    cascade_transition(main, aux, next_main, next_aux, challenges, &mut constraints);
    lookup_transition(main, aux, next_main, next_aux, challenges, &mut constraints);
    constraints
}

fn processor_transition(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use ProcessorAuxColumn as A;
    use ProcessorMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let m1 = |c: M| next_main[c.master_index()];
    let a = |c: A| aux[c.master_index()];
    let a1 = |c: A| next_aux[c.master_index()];

    let pad1 = m1(M::IsPadding);

    // the clock increments on real rows and stalls on padding rows
    out.push((ONE - pad1) * (m1(M::Clk) - m(M::Clk) - ONE));
    out.push(pad1 * (m1(M::Clk) - m(M::Clk)));
    // once padding starts it never stops
    out.push(m(M::IsPadding) * (ONE - pad1));

    // every real row looks up its own instruction
    let compressed = compress_instruction(ch, m1(M::Ip), m1(M::Ci), m1(M::Nia));
    let ld_delta = a1(A::InstructionLookupClientLogDerivative)
        - a(A::InstructionLookupClientLogDerivative);
    out.push(
        (ONE - pad1) * (ld_delta * (ch.instruction_lookup_indeterminate - compressed) - ONE),
    );
    out.push(pad1 * ld_delta);

    // the clock-jump-difference server adds its multiplicity at every row
    let cjd_delta = a1(A::ClockJumpDifferenceLookupServerLogDerivative)
        - a(A::ClockJumpDifferenceLookupServerLogDerivative);
    out.push(
        cjd_delta * (ch.clock_jump_indeterminate - m1(M::Clk))
            - m1(M::ClockJumpDifferenceLookupMultiplicity),
    );
}

fn op_stack_transition(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use OpStackAuxColumn as A;
    use OpStackMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let m1 = |c: M| next_main[c.master_index()];

    let pad = ternary_padding_indicator(m(M::Ib1Shrink));
    let pad1 = ternary_padding_indicator(m1(M::Ib1Shrink));

    out.push(pad * (ONE - pad1));

    let compressed = compress_op_stack_row(
        ch,
        m1(M::Clk),
        m1(M::Ib1Shrink),
        m1(M::StackPointer),
        m1(M::FirstUnderflowElement),
    );
    let rp = aux[A::RunningProductPermArg.master_index()];
    let rp1 = next_aux[A::RunningProductPermArg.master_index()];
    out.push(
        pad1 * (rp1 - rp) + (ONE - pad1) * (rp1 - rp * (ch.op_stack_indeterminate - compressed)),
    );
}

fn ram_transition(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use RamAuxColumn as A;
    use RamMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let m1 = |c: M| next_main[c.master_index()];
    let a = |c: A| aux[c.master_index()];
    let a1 = |c: A| next_aux[c.master_index()];

    let beta = ch.ram_bezout_indeterminate;
    let pad1 = ternary_padding_indicator(m1(M::InstructionType));
    let diff = m1(M::RamPointer) - m(M::RamPointer);
    let inv = m(M::InversePointerDiff);

    // the inverse witness refers to the pointer difference to the next row
    out.push(diff * (diff * inv - ONE));
    out.push(inv * (diff * inv - ONE));

    // contiguity: the running product, formal derivative, and Bezout
    // accumulators advance exactly when the pointer changes
    let changed = diff * inv;
    let unchanged = ONE - changed;
    out.push(
        a1(A::PointerRunningProduct)
            - changed * a(A::PointerRunningProduct) * (beta - m1(M::RamPointer))
            - unchanged * a(A::PointerRunningProduct),
    );
    out.push(
        a1(A::FormalDerivative)
            - changed
                * (a(A::PointerRunningProduct) + (beta - m1(M::RamPointer)) * a(A::FormalDerivative))
            - unchanged * a(A::FormalDerivative),
    );
    out.push(
        a1(A::BezoutAccumulator0)
            - changed * (beta * a(A::BezoutAccumulator0) + m1(M::BezoutCoefficient0))
            - unchanged * a(A::BezoutAccumulator0),
    );
    out.push(
        a1(A::BezoutAccumulator1)
            - changed * (beta * a(A::BezoutAccumulator1) + m1(M::BezoutCoefficient1))
            - unchanged * a(A::BezoutAccumulator1),
    );

    let compressed = compress_ram_row(
        ch,
        m1(M::Clk),
        m1(M::InstructionType),
        m1(M::RamPointer),
        m1(M::RamValue),
    );
    let rp = a(A::RunningProductPermArg);
    let rp1 = a1(A::RunningProductPermArg);
    out.push(pad1 * (rp1 - rp) + (ONE - pad1) * (rp1 - rp * (ch.ram_indeterminate - compressed)));

    // a clock-jump difference is looked up whenever the pointer region
    // continues into a real row
    let cjd_delta = a1(A::ClockJumpDifferenceLookupClientLogDerivative)
        - a(A::ClockJumpDifferenceLookupClientLogDerivative);
    out.push(
        cjd_delta * (ch.clock_jump_indeterminate - m1(M::Clk) + m(M::Clk))
            - unchanged * (ONE - pad1),
    );
}

fn program_transition(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use ProgramAuxColumn as A;
    use ProgramMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let m1 = |c: M| next_main[c.master_index()];
    let a = |c: A| aux[c.master_index()];
    let a1 = |c: A| next_aux[c.master_index()];

    out.push(m1(M::Address) - m(M::Address) - ONE);
    out.push(m(M::IsHashInputPadding) * (ONE - m1(M::IsHashInputPadding)));
    out.push(m(M::IsTablePadding) * (ONE - m1(M::IsTablePadding)));

    // the chunk index cycles 0, 1, …, RATE − 1 outside table padding and is
    // pinned to 0 inside it
    let d = Felt::new(RATE as u64 - 1) - m(M::IndexInChunk);
    let continuing = d * m(M::MaxMinusIndexInv);
    let pad1 = m1(M::IsTablePadding);
    out.push(
        (ONE - pad1)
            * (continuing * (m1(M::IndexInChunk) - m(M::IndexInChunk) - ONE)
                + (ONE - continuing) * m1(M::IndexInChunk)),
    );
    out.push(pad1 * m1(M::IndexInChunk));

    // instruction lookup: row i's contribution lands between rows i and i+1
    let compressed = compress_instruction(ch, m(M::Address), m(M::Instruction), m1(M::Instruction));
    out.push(
        (a1(A::InstructionLookupServerLogDerivative)
            - a(A::InstructionLookupServerLogDerivative))
            * (ch.instruction_lookup_indeterminate - compressed)
            - m(M::LookupMultiplicity),
    );

    // chunk preparation: restart after a completed chunk, extend otherwise
    let alpha_inner = ch.program_chunk_inner_indeterminate;
    let prep = a(A::PrepareChunkRunningEvaluation);
    let prep1 = a1(A::PrepareChunkRunningEvaluation);
    out.push(
        (ONE - pad1)
            * ((ONE - continuing) * (prep1 - alpha_inner - m1(M::Instruction))
                + continuing * (prep1 - alpha_inner * prep - m1(M::Instruction))),
    );
    out.push(pad1 * (prep1 - prep));

    // a completed chunk is sent to the program-hash table
    let d1 = Felt::new(RATE as u64 - 1) - m1(M::IndexInChunk);
    let continuing1 = d1 * m1(M::MaxMinusIndexInv);
    let send = a(A::SendChunkRunningEvaluation);
    let send1 = a1(A::SendChunkRunningEvaluation);
    out.push(
        (ONE - continuing1) * (send1 - ch.program_chunk_outer_indeterminate * send - prep1)
            + continuing1 * (send1 - send),
    );
}

fn program_hash_transition(main: &[Felt], next_main: &[Felt], out: &mut Vec<Felt>) {
    use ProgramHashMainColumn as M;
    out.push(
        (ONE - main[M::Mode.master_index()]) * next_main[M::Mode.master_index()],
    );
}

fn u32_transition(
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use U32MainColumn as M;
    let m1 = |c: M| next_main[c.master_index()];

    let compressed = compress_u32_row(ch, m1(M::Ci), m1(M::Lhs), m1(M::Rhs), m1(M::Result));
    let ld = aux[U32AuxColumn::ProcessorLookupServerLogDerivative.master_index()];
    let ld1 = next_aux[U32AuxColumn::ProcessorLookupServerLogDerivative.master_index()];
    out.push(
        (ld1 - ld) * (ch.u32_indeterminate - compressed)
            - m1(M::CopyFlag) * m1(M::LookupMultiplicity),
    );
}

fn cascade_transition(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use CascadeAuxColumn as A;
    use CascadeMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let m1 = |c: M| next_main[c.master_index()];
    let a = |c: A| aux[c.master_index()];
    let a1 = |c: A| next_aux[c.master_index()];

    let not_pad1 = ONE - m1(M::IsPadding);
    out.push(m(M::IsPadding) * not_pad1);

    let compressed = compress_cascade_row(
        ch,
        m1(M::LookInHi),
        m1(M::LookInLo),
        m1(M::LookOutHi),
        m1(M::LookOutLo),
    );
    out.push(
        (a1(A::U32LookupServerLogDerivative) - a(A::U32LookupServerLogDerivative))
            * (ch.cascade_indeterminate - compressed)
            - not_pad1 * m1(M::LookupMultiplicity),
    );

    let hi = ch.lookup_indeterminate - compress_lookup_row(ch, m1(M::LookInHi), m1(M::LookOutHi));
    let lo = ch.lookup_indeterminate - compress_lookup_row(ch, m1(M::LookInLo), m1(M::LookOutLo));
    out.push(
        (a1(A::ByteLookupClientLogDerivative) - a(A::ByteLookupClientLogDerivative)) * hi * lo
            - not_pad1 * (hi + lo),
    );
}

fn lookup_transition(
    main: &[Felt],
    aux: &[Felt],
    next_main: &[Felt],
    next_aux: &[Felt],
    ch: &Challenges,
    out: &mut Vec<Felt>,
) {
    use LookupMainColumn as M;
    let m = |c: M| main[c.master_index()];
    let m1 = |c: M| next_main[c.master_index()];

    let not_pad1 = ONE - m1(M::IsPadding);
    out.push(m(M::IsPadding) * not_pad1);
    out.push(not_pad1 * (m1(M::LookIn) - m(M::LookIn) - ONE));

    let compressed = compress_lookup_row(ch, m1(M::LookIn), m1(M::LookOut));
    let ld = aux[LookupAuxColumn::CascadeLookupServerLogDerivative.master_index()];
    let ld1 = next_aux[LookupAuxColumn::CascadeLookupServerLogDerivative.master_index()];
    out.push(
        (ld1 - ld) * (ch.lookup_indeterminate - compressed) - not_pad1 * m1(M::LookupMultiplicity),
    );
}

// TERMINAL CONSTRAINTS
// ================================================================================================

/// Constraints that must vanish on the last row; this is where the
/// cross-table arguments meet.
pub fn evaluate_terminal_constraints(
    main: &[Felt],
    aux: &[Felt],
    _challenges: &Challenges,
    terminals: &Terminals,
) -> Vec<Felt> {
    use ProcessorAuxColumn as PA;
    let pa = |c: PA| aux[c.master_index()];

    let mut constraints = Vec::new();

    // the last executed instruction is Halt
    constraints.push(
        main[ProcessorMainColumn::Ci.master_index()] - Instruction::Halt.opcode_felt(),
    );

    // public input and output
    constraints.push(pa(PA::InputEvalArg) - terminals.input_terminal);
    constraints.push(pa(PA::OutputEvalArg) - terminals.output_terminal);

    // every linkage's two endpoints agree
    constraints.push(
        pa(PA::InstructionLookupClientLogDerivative)
            - aux[ProgramAuxColumn::InstructionLookupServerLogDerivative.master_index()],
    );
    constraints.push(
        pa(PA::OpStackTablePermArg)
            - aux[OpStackAuxColumn::RunningProductPermArg.master_index()],
    );
    constraints.push(
        pa(PA::RamTablePermArg) - aux[RamAuxColumn::RunningProductPermArg.master_index()],
    );
    constraints.push(
        pa(PA::JumpStackTablePermArg)
            - aux[JumpStackAuxColumn::RunningProductPermArg.master_index()],
    );
    constraints
        .push(pa(PA::HashEvalArg) - aux[crate::columns::HashAuxColumn::RunningEvaluation.master_index()]);
    constraints.push(
        pa(PA::U32LookupClientLogDerivative)
            - aux[U32AuxColumn::ProcessorLookupServerLogDerivative.master_index()],
    );
    constraints.push(
        aux[U32AuxColumn::CascadeLookupClientLogDerivative.master_index()]
            - aux[CascadeAuxColumn::U32LookupServerLogDerivative.master_index()],
    );
    constraints.push(
        aux[CascadeAuxColumn::ByteLookupClientLogDerivative.master_index()]
            - aux[LookupAuxColumn::CascadeLookupServerLogDerivative.master_index()],
    );
    constraints.push(
        pa(PA::ClockJumpDifferenceLookupServerLogDerivative)
            - aux[OpStackAuxColumn::ClockJumpDifferenceLookupClientLogDerivative.master_index()]
            - aux[RamAuxColumn::ClockJumpDifferenceLookupClientLogDerivative.master_index()]
            - aux[JumpStackAuxColumn::ClockJumpDifferenceLookupClientLogDerivative.master_index()],
    );

    // program attestation: all chunks arrived, and hashing them produced the
    // claimed program digest
    constraints.push(
        aux[ProgramAuxColumn::SendChunkRunningEvaluation.master_index()]
            - aux[ProgramHashAuxColumn::ReceiveChunkRunningEvaluation.master_index()],
    );
    for (i, digest_element) in terminals.program_digest.iter().enumerate() {
        let state = [
            ProgramHashMainColumn::State0,
            ProgramHashMainColumn::State1,
            ProgramHashMainColumn::State2,
            ProgramHashMainColumn::State3,
            ProgramHashMainColumn::State4,
        ][i];
        constraints.push(main[state.master_index()] - *digest_element);
    }

    // ram contiguity: the Bezout relation certifies a squarefree pointer
    // polynomial
    constraints.push(
        aux[RamAuxColumn::BezoutAccumulator0.master_index()]
            * aux[RamAuxColumn::PointerRunningProduct.master_index()]
            + aux[RamAuxColumn::BezoutAccumulator1.master_index()]
                * aux[RamAuxColumn::FormalDerivative.master_index()]
            - ONE,
    );

    constraints
}

// CONSTRAINT COUNTS
// ================================================================================================

/// Numbers of constraints per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintCounts {
    pub initial: usize,
    pub consistency: usize,
    pub transition: usize,
    pub terminal: usize,
}

impl ConstraintCounts {
    pub fn total(&self) -> usize {
        self.initial + self.consistency + self.transition + self.terminal
    }
}

/// Counts the constraints in every group by evaluating them on placeholder
/// rows.
pub fn constraint_counts() -> ConstraintCounts {
    let main = vec![ZERO; NUM_MAIN_COLUMNS];
    let aux = vec![ZERO; NUM_AUX_COLUMNS];
    let mut transcript = quartz_core::Transcript::new(&[]);
    let challenges = Challenges::sample(&mut transcript);
    let terminals =
        Terminals { program_digest: [ZERO; 5], input_terminal: ZERO, output_terminal: ZERO };

    ConstraintCounts {
        initial: evaluate_initial_constraints(&main, &aux, &challenges, &terminals).len(),
        consistency: evaluate_consistency_constraints(&main, &aux, &challenges).len(),
        transition: evaluate_transition_constraints(&main, &aux, &main, &aux, &challenges).len(),
        terminal: evaluate_terminal_constraints(&main, &aux, &challenges, &terminals).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_counts_are_stable() {
        let counts = constraint_counts();
        assert!(counts.initial > 0);
        assert!(counts.consistency > 0);
        assert!(counts.transition > 0);
        assert!(counts.terminal > 0);
        assert_eq!(counts, constraint_counts());
    }

    #[test]
    fn two_inverse_is_correct() {
        assert_eq!(TWO_INV * Felt::new(2), ONE);
    }
}
