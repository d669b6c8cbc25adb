//! The Algebraic Execution Trace: the tabular witness of one program run,
//! and its assembly into the master main table common to all ten tables.

use std::collections::HashMap;

use quartz_air::columns::{
    CascadeMainColumn, HashMainColumn, JumpStackMainColumn, LookupMainColumn, OpStackMainColumn,
    ProcessorMainColumn, ProgramHashMainColumn, ProgramMainColumn, RamMainColumn, U32MainColumn,
    NUM_MAIN_COLUMNS, STACK_REGISTERS,
};
use quartz_air::cross_table::lookup_function;
use quartz_core::hash::{hash_input_pad, PERMUTATION_TRACE_LEN, RATE, STATE_SIZE};
use quartz_core::polynomial::Polynomial;
use quartz_core::{Felt, Instruction, Program, SpongeState, ONE, ZERO};

use crate::errors::{AetError, ExecutionError};
use crate::op_stack::OpStackUnderflowEvent;
use crate::vm::{
    CoProcessorCall, HashEvent, JumpStackEvent, RamOp, RamTableCall, U32TableEntry, VmState,
};

/// Number of rows in the 8-bit lookup table.
pub const LOOKUP_TABLE_HEIGHT: usize = 1 << 8;

// PROCESSOR SNAPSHOT
// ================================================================================================

/// The processor state immediately before one instruction executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorTraceRow {
    pub clk: u64,
    pub ip: u64,
    pub ci: Instruction,
    pub nia: Felt,
    pub jsp: u64,
    pub jso: Felt,
    pub jsd: Felt,
    pub op_stack_pointer: u64,
    pub stack: [Felt; 16],
}

// ALGEBRAIC EXECUTION TRACE
// ================================================================================================

/// The complete witness of one execution: the processor trace plus all
/// co-processor side effects and lookup multiplicities.
#[derive(Debug, Clone)]
pub struct AlgebraicExecutionTrace {
    pub program: Program,
    /// How often the instruction at each program-memory address was executed.
    pub instruction_multiplicities: Vec<u32>,
    pub processor_rows: Vec<ProcessorTraceRow>,
    pub op_stack_events: Vec<OpStackUnderflowEvent>,
    pub ram_calls: Vec<RamTableCall>,
    pub jump_stack_events: Vec<JumpStackEvent>,
    pub hash_events: Vec<HashEvent>,
    /// The rate-sized chunks of the padded program hashed for attestation,
    /// with the permutation trace of each absorption.
    pub program_hash_chunks: Vec<[Felt; RATE]>,
    pub program_hash_traces: Vec<[[Felt; STATE_SIZE]; PERMUTATION_TRACE_LEN]>,
    /// Chronological u32 co-processor invocations.
    pub u32_calls: Vec<(u64, U32TableEntry)>,
    /// Public-input symbols consumed per clock cycle.
    pub input_reads: Vec<(u64, Vec<Felt>)>,
    /// Public-output symbols produced per clock cycle.
    pub output_writes: Vec<(u64, Vec<Felt>)>,
}

impl AlgebraicExecutionTrace {
    pub fn new(program: Program) -> Self {
        let program_len = program.len_words();
        let hash_input = hash_input_pad(&program.to_words());

        let mut sponge = SpongeState::init();
        let mut program_hash_chunks = Vec::new();
        let mut program_hash_traces = Vec::new();
        for chunk in hash_input.chunks(RATE) {
            let chunk: [Felt; RATE] = chunk.try_into().expect("padded input is chunked by rate");
            for (state_element, element) in sponge.state.iter_mut().zip(&chunk) {
                *state_element += *element;
            }
            program_hash_chunks.push(chunk);
            program_hash_traces.push(sponge.permute_with_trace());
        }
        debug_assert_eq!(sponge.digest(), program.hash());

        Self {
            program,
            instruction_multiplicities: vec![0; program_len],
            processor_rows: Vec::new(),
            op_stack_events: Vec::new(),
            ram_calls: Vec::new(),
            jump_stack_events: Vec::new(),
            hash_events: Vec::new(),
            program_hash_chunks,
            program_hash_traces,
            u32_calls: Vec::new(),
            input_reads: Vec::new(),
            output_writes: Vec::new(),
        }
    }

    /// Snapshots the processor state before a step and counts the
    /// instruction lookup.
    pub fn record_state(&mut self, state: &VmState) -> Result<(), ExecutionError> {
        let ci = state.current_instruction()?;
        let multiplicity = self
            .instruction_multiplicities
            .get_mut(state.ip)
            .ok_or(ExecutionError::InstructionPointerOutOfBounds(state.ip))?;
        *multiplicity = multiplicity
            .checked_add(1)
            .ok_or(ExecutionError::Aet(AetError::MultiplicityOverflow(state.ip)))?;

        let (jso, jsd) = state.jump_stack.last().copied().unwrap_or((ZERO, ZERO));
        self.processor_rows.push(ProcessorTraceRow {
            clk: state.cycle,
            ip: state.ip as u64,
            ci,
            nia: state.next_instruction_or_argument(),
            jsp: state.jump_stack.len() as u64,
            jso,
            jsd,
            op_stack_pointer: state.op_stack.len() as u64,
            stack: state.op_stack.registers(),
        });
        Ok(())
    }

    pub fn record_call(&mut self, call: CoProcessorCall) {
        match call {
            CoProcessorCall::OpStack(event) => self.op_stack_events.push(event),
            CoProcessorCall::Ram(call) => self.ram_calls.push(call),
            CoProcessorCall::JumpStack(event) => self.jump_stack_events.push(event),
            CoProcessorCall::Sponge(event) => self.hash_events.push(event),
            CoProcessorCall::U32 { clk, entry } => self.u32_calls.push((clk, entry)),
        }
    }

    pub fn record_input_read(&mut self, clk: u64, symbols: Vec<Felt>) {
        if !symbols.is_empty() {
            self.input_reads.push((clk, symbols));
        }
    }

    pub fn record_output_write(&mut self, clk: u64, symbols: Vec<Felt>) {
        if !symbols.is_empty() {
            self.output_writes.push((clk, symbols));
        }
    }

    // HEIGHTS
    // --------------------------------------------------------------------------------------------

    pub fn processor_table_height(&self) -> usize {
        self.processor_rows.len()
    }

    pub fn op_stack_table_height(&self) -> usize {
        self.op_stack_events.len()
    }

    pub fn ram_table_height(&self) -> usize {
        self.ram_calls.len()
    }

    pub fn jump_stack_table_height(&self) -> usize {
        self.jump_stack_events.len()
    }

    pub fn program_table_height(&self) -> usize {
        hash_input_pad(&self.program.to_words()).len()
    }

    pub fn program_hash_table_height(&self) -> usize {
        self.program_hash_traces.len() * PERMUTATION_TRACE_LEN
    }

    pub fn hash_table_height(&self) -> usize {
        self.hash_events.iter().map(|event| event.trace.len()).sum()
    }

    pub fn u32_table_height(&self) -> usize {
        self.aggregate_u32_entries().iter().map(|(entry, _)| u32_section_height(entry)).sum()
    }

    pub fn cascade_table_height(&self) -> usize {
        self.cascade_multiplicities().len()
    }

    pub fn lookup_table_height(&self) -> usize {
        LOOKUP_TABLE_HEIGHT
    }

    /// The common padded height: the next power of two of the tallest table.
    pub fn padded_height(&self) -> usize {
        [
            self.processor_table_height(),
            self.op_stack_table_height(),
            self.ram_table_height(),
            self.jump_stack_table_height(),
            self.program_table_height(),
            self.program_hash_table_height(),
            self.hash_table_height(),
            self.u32_table_height(),
            self.cascade_table_height(),
            self.lookup_table_height(),
        ]
        .into_iter()
        .max()
        .expect("the table list is non-empty")
        .next_power_of_two()
    }

    // DERIVED MULTIPLICITIES
    // --------------------------------------------------------------------------------------------

    /// The u32 entries with their execution counts, in order of first
    /// occurrence.
    pub fn aggregate_u32_entries(&self) -> Vec<(U32TableEntry, u64)> {
        let mut order: Vec<(U32TableEntry, u64)> = Vec::new();
        let mut index: HashMap<U32TableEntry, usize> = HashMap::new();
        for &(_, entry) in &self.u32_calls {
            match index.get(&entry) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(entry, order.len());
                    order.push((entry, 1));
                },
            }
        }
        order
    }

    /// The distinct 16-bit limbs queried by u32 entries with their lookup
    /// counts, in order of first occurrence.
    pub fn cascade_multiplicities(&self) -> Vec<(u16, u64)> {
        let mut order: Vec<(u16, u64)> = Vec::new();
        let mut index: HashMap<u16, usize> = HashMap::new();
        for (entry, multiplicity) in self.aggregate_u32_entries() {
            for limb in u32_entry_limbs(&entry) {
                match index.get(&limb) {
                    Some(&i) => order[i].1 += multiplicity,
                    None => {
                        index.insert(limb, order.len());
                        order.push((limb, multiplicity));
                    },
                }
            }
        }
        order
    }

    /// How often each byte value is looked up by the cascade table: once per
    /// cascade row containing it.
    pub fn lookup_multiplicities(&self) -> [u64; LOOKUP_TABLE_HEIGHT] {
        let mut multiplicities = [0u64; LOOKUP_TABLE_HEIGHT];
        for (limb, _) in self.cascade_multiplicities() {
            multiplicities[(limb >> 8) as usize] += 1;
            multiplicities[(limb & 0xff) as usize] += 1;
        }
        multiplicities
    }

    // MASTER MAIN TABLE
    // --------------------------------------------------------------------------------------------

    /// Assembles and pads the master main table.
    ///
    /// # Errors
    /// Returns an error if the processor trace is empty.
    pub fn to_master_main(&self) -> Result<MasterMainTable, AetError> {
        if self.processor_rows.is_empty() {
            return Err(AetError::EmptyProcessorTrace);
        }

        let padded_height = self.padded_height();
        let mut rows = vec![vec![ZERO; NUM_MAIN_COLUMNS]; padded_height];

        self.fill_processor_columns(&mut rows);
        self.fill_op_stack_columns(&mut rows);
        self.fill_ram_columns(&mut rows);
        self.fill_jump_stack_columns(&mut rows);
        self.fill_program_columns(&mut rows);
        self.fill_program_hash_columns(&mut rows);
        self.fill_hash_columns(&mut rows);
        self.fill_u32_columns(&mut rows);
        self.fill_cascade_columns(&mut rows);
        self.fill_lookup_columns(&mut rows);
        self.fill_clock_jump_multiplicities(&mut rows);

        Ok(MasterMainTable { padded_height, rows })
    }

    fn fill_processor_columns(&self, rows: &mut [Vec<Felt>]) {
        use ProcessorMainColumn as C;
        for (i, row) in rows.iter_mut().enumerate() {
            let source = &self.processor_rows[i.min(self.processor_rows.len() - 1)];
            let is_padding = i >= self.processor_rows.len();
            row[C::Clk.master_index()] = Felt::new(source.clk);
            row[C::Ip.master_index()] = Felt::new(source.ip);
            row[C::Ci.master_index()] = source.ci.opcode_felt();
            row[C::Nia.master_index()] = source.nia;
            row[C::Ib0.master_index()] = source.ci.ib(0);
            row[C::Ib1.master_index()] = source.ci.ib(1);
            row[C::Ib2.master_index()] = source.ci.ib(2);
            row[C::Jsp.master_index()] = Felt::new(source.jsp);
            row[C::Jso.master_index()] = source.jso;
            row[C::Jsd.master_index()] = source.jsd;
            row[C::OpStackPointer.master_index()] = Felt::new(source.op_stack_pointer);
            for (register, &value) in STACK_REGISTERS.iter().zip(&source.stack) {
                row[register.master_index()] = value;
            }
            row[C::IsPadding.master_index()] = Felt::from(is_padding);
        }
    }

    fn sorted_op_stack_events(&self) -> Vec<OpStackUnderflowEvent> {
        let mut events = self.op_stack_events.clone();
        events.sort_by_key(|event| (event.stack_pointer, event.clk));
        events
    }

    fn fill_op_stack_columns(&self, rows: &mut [Vec<Felt>]) {
        use OpStackMainColumn as C;
        let events = self.sorted_op_stack_events();
        for (i, row) in rows.iter_mut().enumerate() {
            match events.get(i).or(events.last()) {
                Some(event) => {
                    row[C::Clk.master_index()] = Felt::new(event.clk);
                    row[C::Ib1Shrink.master_index()] = if i < events.len() {
                        Felt::from(event.shrinks)
                    } else {
                        Felt::new(2)
                    };
                    row[C::StackPointer.master_index()] = Felt::new(event.stack_pointer);
                    row[C::FirstUnderflowElement.master_index()] = event.first_underflow_element;
                },
                None => row[C::Ib1Shrink.master_index()] = Felt::new(2),
            }
        }
    }

    fn sorted_ram_calls(&self) -> Vec<RamTableCall> {
        let mut calls = self.ram_calls.clone();
        calls.sort_by_key(|call| (call.pointer, call.clk));
        calls
    }

    fn fill_ram_columns(&self, rows: &mut [Vec<Felt>]) {
        use RamMainColumn as C;
        let calls = self.sorted_ram_calls();

        // Bezout coefficients certifying that the distinct pointers form a
        // squarefree polynomial, laid out in Horner order at pointer changes
        let mut pointers: Vec<Felt> = Vec::new();
        for call in &calls {
            if pointers.last() != Some(&call.pointer) {
                pointers.push(call.pointer);
            }
        }
        let (bezout_0, bezout_1) = bezout_coefficient_columns(&pointers);

        let mut change_index = 0;
        for (i, row) in rows.iter_mut().enumerate() {
            match calls.get(i).or(calls.last()) {
                Some(call) => {
                    if i > 0 && i < calls.len() && calls[i].pointer != calls[i - 1].pointer {
                        change_index += 1;
                    }
                    row[C::Clk.master_index()] = Felt::new(call.clk);
                    row[C::InstructionType.master_index()] = if i < calls.len() {
                        match call.op {
                            RamOp::Write => ZERO,
                            RamOp::Read => ONE,
                        }
                    } else {
                        Felt::new(2)
                    };
                    row[C::RamPointer.master_index()] = call.pointer;
                    row[C::RamValue.master_index()] = call.value;
                    let pointer_diff = match calls.get(i + 1) {
                        Some(next) => next.pointer - call.pointer,
                        None => ZERO,
                    };
                    row[C::InversePointerDiff.master_index()] =
                        pointer_diff.try_inverse().unwrap_or(ZERO);
                    row[C::BezoutCoefficient0.master_index()] = bezout_0[change_index];
                    row[C::BezoutCoefficient1.master_index()] = bezout_1[change_index];
                },
                None => row[C::InstructionType.master_index()] = Felt::new(2),
            }
        }
    }

    fn sorted_jump_stack_events(&self) -> Vec<JumpStackEvent> {
        let mut events = self.jump_stack_events.clone();
        events.sort_by_key(|event| (event.jsp, event.clk));
        events
    }

    fn fill_jump_stack_columns(&self, rows: &mut [Vec<Felt>]) {
        use JumpStackMainColumn as C;
        let events = self.sorted_jump_stack_events();
        for (i, row) in rows.iter_mut().enumerate() {
            let Some(event) = events.get(i).or(events.last()) else { continue };
            row[C::Clk.master_index()] = Felt::new(event.clk);
            row[C::Ci.master_index()] = event.ci.opcode_felt();
            row[C::Jsp.master_index()] = Felt::new(event.jsp);
            row[C::Jso.master_index()] = event.jso;
            row[C::Jsd.master_index()] = event.jsd;
        }
    }

    fn fill_program_columns(&self, rows: &mut [Vec<Felt>]) {
        use ProgramMainColumn as C;
        let hash_input = hash_input_pad(&self.program.to_words());
        let num_words = self.program.len_words();
        let rate_max_inv = |index: u64| {
            (Felt::new(RATE as u64 - 1) - Felt::new(index)).try_inverse().unwrap_or(ZERO)
        };

        for (i, row) in rows.iter_mut().enumerate() {
            row[C::Address.master_index()] = Felt::new(i as u64);
            if i < hash_input.len() {
                let index_in_chunk = (i % RATE) as u64;
                row[C::Instruction.master_index()] = hash_input[i];
                row[C::LookupMultiplicity.master_index()] = self
                    .instruction_multiplicities
                    .get(i)
                    .map(|&m| Felt::new(m as u64))
                    .unwrap_or(ZERO);
                row[C::IndexInChunk.master_index()] = Felt::new(index_in_chunk);
                row[C::MaxMinusIndexInv.master_index()] = rate_max_inv(index_in_chunk);
                row[C::IsHashInputPadding.master_index()] = Felt::from(i >= num_words);
            } else {
                row[C::IndexInChunk.master_index()] = ZERO;
                row[C::MaxMinusIndexInv.master_index()] = rate_max_inv(0);
                row[C::IsHashInputPadding.master_index()] = ONE;
                row[C::IsTablePadding.master_index()] = ONE;
            }
        }
    }

    fn fill_program_hash_columns(&self, rows: &mut [Vec<Felt>]) {
        use ProgramHashMainColumn as C;
        let state_columns = program_hash_state_columns();
        let mut i = 0;
        for trace in &self.program_hash_traces {
            for (round, state) in trace.iter().enumerate() {
                let row = &mut rows[i];
                row[C::RoundNumber.master_index()] = Felt::new(round as u64);
                row[C::Mode.master_index()] = ONE;
                for (column, &value) in state_columns.iter().zip(state.iter()) {
                    row[column.master_index()] = value;
                }
                i += 1;
            }
        }
        // padding replicates the final state so the digest stays visible in
        // the last row
        let last_real = i.saturating_sub(1);
        for padding_index in i..rows.len() {
            let (head, tail) = rows.split_at_mut(padding_index);
            let template = &head[last_real];
            let row = &mut tail[0];
            row[C::RoundNumber.master_index()] = template[C::RoundNumber.master_index()];
            for column in state_columns {
                row[column.master_index()] = template[column.master_index()];
            }
            row[C::IsPadding.master_index()] = ONE;
        }
    }

    fn fill_hash_columns(&self, rows: &mut [Vec<Felt>]) {
        use HashMainColumn as C;
        let state_columns = hash_state_columns();
        let mut i = 0;
        for event in &self.hash_events {
            for (round, state) in event.trace.iter().enumerate() {
                let row = &mut rows[i];
                row[C::RoundNumber.master_index()] = Felt::new(round as u64);
                row[C::Ci.master_index()] = event.ci.opcode_felt();
                for (column, &value) in state_columns.iter().zip(state.iter()) {
                    row[column.master_index()] = value;
                }
                i += 1;
            }
        }
        if i == 0 {
            return;
        }
        for padding_index in i..rows.len() {
            let (head, tail) = rows.split_at_mut(padding_index);
            let template = &head[i - 1];
            let row = &mut tail[0];
            row[C::RoundNumber.master_index()] = template[C::RoundNumber.master_index()];
            row[C::Ci.master_index()] = template[C::Ci.master_index()];
            for column in state_columns {
                row[column.master_index()] = template[column.master_index()];
            }
        }
    }

    fn fill_u32_columns(&self, rows: &mut [Vec<Felt>]) {
        use U32MainColumn as C;
        let mut i = 0;
        for (entry, multiplicity) in self.aggregate_u32_entries() {
            let mut lhs = entry.lhs;
            let mut rhs = entry.rhs;
            let mut bits = 0u64;
            loop {
                let row = &mut rows[i];
                row[C::CopyFlag.master_index()] = Felt::from(bits == 0);
                row[C::Bits.master_index()] = Felt::new(bits);
                row[C::BitsMinus33Inv.master_index()] =
                    (Felt::new(bits) - Felt::new(33)).inverse();
                row[C::Ci.master_index()] = entry.ci.opcode_felt();
                row[C::Lhs.master_index()] = Felt::new(lhs);
                row[C::LhsInv.master_index()] = Felt::new(lhs).try_inverse().unwrap_or(ZERO);
                row[C::Rhs.master_index()] = Felt::new(rhs);
                row[C::RhsInv.master_index()] = Felt::new(rhs).try_inverse().unwrap_or(ZERO);
                row[C::Result.master_index()] = Felt::new(entry.result);
                if bits == 0 {
                    row[C::LookupMultiplicity.master_index()] = Felt::new(multiplicity);
                }
                i += 1;
                if lhs == 0 && rhs == 0 {
                    break;
                }
                lhs >>= 1;
                rhs >>= 1;
                bits += 1;
            }
        }
        // padding rows are all-zero except for the exact inverse witness
        for row in rows[i..].iter_mut() {
            row[C::BitsMinus33Inv.master_index()] = (ZERO - Felt::new(33)).inverse();
        }
    }

    fn fill_cascade_columns(&self, rows: &mut [Vec<Felt>]) {
        use CascadeMainColumn as C;
        let multiplicities = self.cascade_multiplicities();
        for (i, row) in rows.iter_mut().enumerate() {
            match multiplicities.get(i) {
                Some(&(limb, multiplicity)) => {
                    let in_hi = Felt::new((limb >> 8) as u64);
                    let in_lo = Felt::new((limb & 0xff) as u64);
                    row[C::LookInHi.master_index()] = in_hi;
                    row[C::LookInLo.master_index()] = in_lo;
                    row[C::LookOutHi.master_index()] = lookup_function(in_hi);
                    row[C::LookOutLo.master_index()] = lookup_function(in_lo);
                    row[C::LookupMultiplicity.master_index()] = Felt::new(multiplicity);
                },
                None => row[C::IsPadding.master_index()] = ONE,
            }
        }
    }

    fn fill_lookup_columns(&self, rows: &mut [Vec<Felt>]) {
        use LookupMainColumn as C;
        let multiplicities = self.lookup_multiplicities();
        for (i, row) in rows.iter_mut().enumerate() {
            if i < LOOKUP_TABLE_HEIGHT {
                let look_in = Felt::new(i as u64);
                row[C::LookIn.master_index()] = look_in;
                row[C::LookOut.master_index()] = lookup_function(look_in);
                row[C::LookupMultiplicity.master_index()] = Felt::new(multiplicities[i]);
            } else {
                row[C::IsPadding.master_index()] = ONE;
            }
        }
    }

    /// Counts, for every clock-jump difference in the op-stack, RAM, and
    /// jump-stack tables, how often it is looked up in the processor's clock
    /// column.
    fn fill_clock_jump_multiplicities(&self, rows: &mut [Vec<Felt>]) {
        let column = ProcessorMainColumn::ClockJumpDifferenceLookupMultiplicity.master_index();
        let mut bump = |difference: u64| {
            rows[difference as usize][column] += ONE;
        };

        let op_stack = self.sorted_op_stack_events();
        for pair in op_stack.windows(2) {
            if pair[0].stack_pointer == pair[1].stack_pointer {
                bump(pair[1].clk - pair[0].clk);
            }
        }
        let ram = self.sorted_ram_calls();
        for pair in ram.windows(2) {
            if pair[0].pointer == pair[1].pointer {
                bump(pair[1].clk - pair[0].clk);
            }
        }
        let jump_stack = self.sorted_jump_stack_events();
        for pair in jump_stack.windows(2) {
            if pair[0].jsp == pair[1].jsp {
                bump(pair[1].clk - pair[0].clk);
            }
        }
    }
}

// MASTER MAIN TABLE
// ================================================================================================

/// The padded, row-major master main table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterMainTable {
    pub padded_height: usize,
    pub rows: Vec<Vec<Felt>>,
}

impl MasterMainTable {
    pub fn row(&self, index: usize) -> &[Felt] {
        &self.rows[index]
    }

    /// Extracts one column as an owned vector.
    pub fn column(&self, column: usize) -> Vec<Felt> {
        self.rows.iter().map(|row| row[column]).collect()
    }
}

// HELPERS
// ================================================================================================

pub(crate) fn u32_section_height(entry: &U32TableEntry) -> usize {
    let bit_length = 64 - entry.lhs.max(entry.rhs).leading_zeros() as usize;
    bit_length + 1
}

pub(crate) fn u32_entry_limbs(entry: &U32TableEntry) -> [u16; 4] {
    [
        (entry.lhs >> 16) as u16,
        (entry.lhs & 0xffff) as u16,
        (entry.rhs >> 16) as u16,
        (entry.rhs & 0xffff) as u16,
    ]
}

pub(crate) fn program_hash_state_columns() -> [ProgramHashMainColumn; STATE_SIZE] {
    use ProgramHashMainColumn as C;
    [
        C::State0,
        C::State1,
        C::State2,
        C::State3,
        C::State4,
        C::State5,
        C::State6,
        C::State7,
        C::State8,
        C::State9,
        C::State10,
        C::State11,
        C::State12,
        C::State13,
        C::State14,
        C::State15,
    ]
}

pub(crate) fn hash_state_columns() -> [HashMainColumn; STATE_SIZE] {
    use HashMainColumn as C;
    [
        C::State0,
        C::State1,
        C::State2,
        C::State3,
        C::State4,
        C::State5,
        C::State6,
        C::State7,
        C::State8,
        C::State9,
        C::State10,
        C::State11,
        C::State12,
        C::State13,
        C::State14,
        C::State15,
    ]
}

/// Computes the Bezout coefficient columns for the contiguity argument: with
/// `P` the monic polynomial vanishing on the distinct pointers and `P′` its
/// formal derivative, finds `b₀·P + b₁·P′ = 1` and lays the coefficients out
/// high-to-low for Horner accumulation, one per pointer change.
fn bezout_coefficient_columns(pointers: &[Felt]) -> (Vec<Felt>, Vec<Felt>) {
    let n = pointers.len();
    if n == 0 {
        return (vec![ZERO], vec![ZERO]);
    }

    let zerofier = Polynomial::zerofier(pointers);
    let derivative = zerofier.formal_derivative();
    let (gcd, b0, b1) = zerofier.xgcd(&derivative);
    debug_assert_eq!(gcd, Polynomial::one(), "pointers are distinct");

    let coefficient_at = |polynomial: &Polynomial, degree: usize| {
        polynomial.coefficients.get(degree).copied().unwrap_or(ZERO)
    };
    let b0_column = (0..n).map(|k| coefficient_at(&b0, n - 1 - k)).collect();
    let b1_column = (0..n).map(|k| coefficient_at(&b1, n - 1 - k)).collect();
    (b0_column, b1_column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_section_heights_cover_the_bit_length() {
        let entry = |lhs, rhs| U32TableEntry { ci: Instruction::And, lhs, rhs, result: 0 };
        assert_eq!(u32_section_height(&entry(0, 0)), 1);
        assert_eq!(u32_section_height(&entry(1, 0)), 2);
        assert_eq!(u32_section_height(&entry(0b1010, 1)), 5);
        assert_eq!(u32_section_height(&entry(u32::MAX as u64, 0)), 33);
    }

    #[test]
    fn u32_limbs_split_both_operands() {
        let entry =
            U32TableEntry { ci: Instruction::Xor, lhs: 0xdead_beef, rhs: 0x0102_0304, result: 0 };
        assert_eq!(u32_entry_limbs(&entry), [0xdead, 0xbeef, 0x0102, 0x0304]);
    }

    #[test]
    fn bezout_columns_satisfy_the_relation_after_horner_accumulation() {
        let pointers: Vec<Felt> = [3u64, 8, 21, 55].iter().map(|&p| Felt::new(p)).collect();
        let (b0, b1) = bezout_coefficient_columns(&pointers);
        let beta = Felt::new(0xabcdef);

        let horner = |column: &[Felt]| column.iter().fold(ZERO, |acc, &c| acc * beta + c);
        let zerofier = Polynomial::zerofier(&pointers);
        let derivative = zerofier.formal_derivative();
        assert_eq!(
            horner(&b0) * zerofier.evaluate(beta) + horner(&b1) * derivative.evaluate(beta),
            ONE,
        );
    }
}
