//! The virtual machine: registers, memory, and the step-wise interpreter.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use quartz_core::hash::{PERMUTATION_TRACE_LEN, RATE, STATE_SIZE};
use quartz_core::{Digest, Felt, Instruction, Program, SpongeState, XFelt, ONE, ZERO};

use crate::errors::ExecutionError;
use crate::op_stack::{OpStack, OpStackUnderflowEvent};

/// Upper bound on the number of cycles before a run is aborted.
pub const CYCLE_LIMIT: u64 = 1 << 22;

/// Digest length in stack words.
const DIGEST_LEN: usize = quartz_core::DIGEST_LEN;

// RUN-TIME PERMUTATION PARAMETERS
// ================================================================================================

/// The deterministic challenge point used by the run-time permutation check
/// during execution; proof generation replaces it with a transcript-derived
/// challenge.
pub const RUNTIME_PERM_ALPHA: Felt = Felt::new(1_000_003);

/// The deterministic weights of the run-time permutation check during
/// execution.
pub const RUNTIME_PERM_WEIGHTS: [Felt; 5] =
    [Felt::new(2), Felt::new(3), Felt::new(5), Felt::new(7), Felt::new(11)];

// CO-PROCESSOR CALLS
// ================================================================================================

/// Whether a RAM access reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamOp {
    Write,
    Read,
}

/// One logged RAM access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamTableCall {
    pub clk: u64,
    pub op: RamOp,
    pub pointer: Felt,
    pub value: Felt,
}

/// One logged jump-stack push, pop, or peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpStackEvent {
    pub clk: u64,
    pub ci: Instruction,
    pub jsp: u64,
    pub jso: Felt,
    pub jsd: Felt,
}

/// One invocation of the sponge co-processor. `SpongeInit` contributes a
/// single state row; every other invocation contributes a full permutation
/// trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEvent {
    pub clk: u64,
    pub ci: Instruction,
    pub trace: Vec<[Felt; STATE_SIZE]>,
}

impl HashEvent {
    /// The rate portion of the initial state, the symbol of the hash
    /// evaluation argument.
    pub fn rate(&self) -> [Felt; RATE] {
        self.trace[0][..RATE].try_into().expect("rate fits in state")
    }
}

/// One invocation of the u32 co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct U32TableEntry {
    pub ci: Instruction,
    pub lhs: u64,
    pub rhs: u64,
    pub result: u64,
}

/// Everything a single step may hand off to the co-processors; the trace
/// recorder turns these into table rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoProcessorCall {
    OpStack(OpStackUnderflowEvent),
    Ram(RamTableCall),
    JumpStack(JumpStackEvent),
    Sponge(HashEvent),
    U32 { clk: u64, entry: U32TableEntry },
}

// VM STATE
// ================================================================================================

/// The complete machine state.
#[derive(Debug, Clone)]
pub struct VmState {
    pub program: Program,
    pub ip: usize,
    pub cycle: u64,
    pub halting: bool,
    pub op_stack: OpStack,
    pub ram: BTreeMap<Felt, Felt>,
    /// `(origin, destination)` frames for `Call`/`Return`.
    pub jump_stack: Vec<(Felt, Felt)>,
    pub sponge: Option<SpongeState>,
    pub public_input: VecDeque<Felt>,
    pub secret_input: VecDeque<Felt>,
    pub public_output: Vec<Felt>,
    /// Run-time permutation running product under the deterministic
    /// parameters.
    pub perm_rp: Felt,
}

impl VmState {
    /// Sets up the machine: the stack is pre-loaded with the program digest
    /// in reverse, and the digest forms the first five public outputs.
    pub fn new(program: Program, public_input: Vec<Felt>, secret_input: Vec<Felt>) -> Self {
        let digest = program.hash();
        let mut initial_stack = Vec::with_capacity(DIGEST_LEN);
        for &element in digest.elements() {
            initial_stack.push(element);
        }
        // pushing digest[0] first leaves st0 = digest[4]
        Self {
            program,
            ip: 0,
            cycle: 0,
            halting: false,
            op_stack: OpStack::new(initial_stack),
            ram: BTreeMap::new(),
            jump_stack: Vec::new(),
            sponge: None,
            public_input: public_input.into(),
            secret_input: secret_input.into(),
            public_output: digest.elements().to_vec(),
            perm_rp: ONE,
        }
    }

    pub fn program_digest(&self) -> Digest {
        self.program.hash()
    }

    /// The instruction about to be executed.
    pub fn current_instruction(&self) -> Result<Instruction, ExecutionError> {
        self.program
            .instruction_at(self.ip)
            .ok_or(ExecutionError::InstructionPointerOutOfBounds(self.ip))
    }

    /// The next instruction or argument: the program-memory word following
    /// the current instruction pointer.
    pub fn next_instruction_or_argument(&self) -> Felt {
        let current = self.program.instruction_at(self.ip);
        match current.and_then(|instruction| instruction.arg()) {
            Some(arg) => arg,
            None => self.next_word(),
        }
    }

    fn next_word(&self) -> Felt {
        // one past the end of the program reads the hash-input padding marker
        if self.ip + 1 == self.program.len_words() {
            ONE
        } else {
            self.program.word_at(self.ip + 1)
        }
    }

    /// Executes one instruction.
    ///
    /// # Errors
    /// Returns an execution error on any precondition violation; the machine
    /// state must then be considered poisoned.
    pub fn step(&mut self) -> Result<Vec<CoProcessorCall>, ExecutionError> {
        let instruction = self.current_instruction()?;
        self.ensure_stack_depth(&instruction)?;

        let clk = self.cycle;
        let mut calls = Vec::new();
        self.dispatch(instruction, clk, &mut calls)?;

        for event in self.op_stack.take_events() {
            calls.push(CoProcessorCall::OpStack(event));
        }
        self.cycle += 1;
        Ok(calls)
    }

    fn ensure_stack_depth(&self, instruction: &Instruction) -> Result<(), ExecutionError> {
        let needed = (-instruction.op_stack_delta().min(0)) as usize;
        let available = self.op_stack.len();
        if available < needed {
            return Err(ExecutionError::OpStackTooShallow {
                instruction: instruction.name(),
                needed,
                available,
            });
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        instruction: Instruction,
        clk: u64,
        calls: &mut Vec<CoProcessorCall>,
    ) -> Result<(), ExecutionError> {
        let mut next_ip = self.ip + instruction.size();

        match instruction {
            Instruction::Push(value) => self.op_stack.push(clk, value),
            Instruction::Pop(n) => {
                for _ in 0..n.get() {
                    self.op_stack.pop(clk, "Pop")?;
                }
            },
            Instruction::Divine(n) => {
                for _ in 0..n.get() {
                    let value = self
                        .secret_input
                        .pop_front()
                        .ok_or(ExecutionError::SecretInputExhausted)?;
                    self.op_stack.push(clk, value);
                }
            },
            Instruction::Pick(i) | Instruction::Dup(i) => {
                let value = self
                    .op_stack
                    .get(i.get())
                    .ok_or(ExecutionError::OpStackUnderflow(instruction.name()))?;
                self.op_stack.push(clk, value);
            },
            Instruction::Place(i) => self.op_stack.place(i.get())?,
            Instruction::Swap(i) => self.op_stack.swap(i.get())?,

            Instruction::Halt => self.halting = true,
            Instruction::Nop => (),
            Instruction::Skiz => {
                let condition = self.op_stack.pop(clk, "Skiz")?;
                if condition == ZERO {
                    let skipped = self
                        .program
                        .instruction_at(next_ip)
                        .ok_or(ExecutionError::InstructionPointerOutOfBounds(next_ip))?;
                    next_ip += skipped.size();
                }
            },
            Instruction::Call(target) => {
                let origin = Felt::new(self.ip as u64 + 2);
                self.jump_stack.push((origin, target));
                calls.push(CoProcessorCall::JumpStack(JumpStackEvent {
                    clk,
                    ci: instruction,
                    jsp: self.jump_stack.len() as u64 - 1,
                    jso: origin,
                    jsd: target,
                }));
                next_ip = target.value() as usize;
            },
            Instruction::Return => {
                let (origin, destination) =
                    self.jump_stack.pop().ok_or(ExecutionError::JumpStackEmpty)?;
                calls.push(CoProcessorCall::JumpStack(JumpStackEvent {
                    clk,
                    ci: instruction,
                    jsp: self.jump_stack.len() as u64,
                    jso: origin,
                    jsd: destination,
                }));
                next_ip = origin.value() as usize;
            },
            Instruction::Recurse => {
                let &(origin, destination) =
                    self.jump_stack.last().ok_or(ExecutionError::JumpStackEmpty)?;
                calls.push(CoProcessorCall::JumpStack(JumpStackEvent {
                    clk,
                    ci: instruction,
                    jsp: self.jump_stack.len() as u64 - 1,
                    jso: origin,
                    jsd: destination,
                }));
                next_ip = destination.value() as usize;
            },
            Instruction::RecurseOrReturn => {
                if self.jump_stack.is_empty() {
                    return Err(ExecutionError::JumpStackEmpty);
                }
                if self.jump_stack.len() > 1 {
                    let &(origin, destination) =
                        self.jump_stack.last().expect("jump stack is non-empty");
                    calls.push(CoProcessorCall::JumpStack(JumpStackEvent {
                        clk,
                        ci: instruction,
                        jsp: self.jump_stack.len() as u64 - 1,
                        jso: origin,
                        jsd: destination,
                    }));
                    next_ip = destination.value() as usize;
                } else {
                    let (origin, destination) =
                        self.jump_stack.pop().expect("jump stack is non-empty");
                    calls.push(CoProcessorCall::JumpStack(JumpStackEvent {
                        clk,
                        ci: instruction,
                        jsp: self.jump_stack.len() as u64,
                        jso: origin,
                        jsd: destination,
                    }));
                    next_ip = origin.value() as usize;
                }
            },
            Instruction::Assert => {
                let value = self.op_stack.pop(clk, "Assert")?;
                if value != ONE {
                    return Err(ExecutionError::AssertionFailed(value));
                }
            },

            Instruction::ReadMem(n) => {
                let address = self.op_stack.pop(clk, "ReadMem")?;
                for offset in 0..n.get() {
                    let pointer = address + Felt::new(offset as u64);
                    let value = self.ram_read(clk, pointer, calls);
                    self.op_stack.push(clk, value);
                }
            },
            Instruction::WriteMem(n) => {
                let mut values = Vec::with_capacity(n.get());
                for _ in 0..n.get() {
                    values.push(self.op_stack.pop(clk, "WriteMem")?);
                }
                let address = self.op_stack.pop(clk, "WriteMem")?;
                for (offset, value) in values.into_iter().rev().enumerate() {
                    let pointer = address + Felt::new(offset as u64);
                    self.ram_write(clk, pointer, value, calls);
                }
            },

            Instruction::Add => {
                let x = self.op_stack.pop(clk, "Add")?;
                let y = self.op_stack.pop(clk, "Add")?;
                self.op_stack.push(clk, y + x);
            },
            Instruction::AddI(constant) => {
                let x = self.op_stack.pop(clk, "AddI")?;
                self.op_stack.push(clk, x + constant);
            },
            Instruction::Mul => {
                let x = self.op_stack.pop(clk, "Mul")?;
                let y = self.op_stack.pop(clk, "Mul")?;
                self.op_stack.push(clk, y * x);
            },
            Instruction::Invert => {
                let x = self.op_stack.pop(clk, "Invert")?;
                let inverse = x.try_inverse().ok_or(ExecutionError::InverseOfZero)?;
                self.op_stack.push(clk, inverse);
            },
            Instruction::Eq => {
                let x = self.op_stack.pop(clk, "Eq")?;
                let y = self.op_stack.pop(clk, "Eq")?;
                self.op_stack.push(clk, Felt::from(x == y));
            },

            Instruction::Split => {
                let value = self.op_stack.pop(clk, "Split")?;
                let hi = value.value() >> 32;
                let lo = value.value() & 0xffff_ffff;
                self.op_stack.push(clk, Felt::new(hi));
                self.op_stack.push(clk, Felt::new(lo));
                self.record_u32(clk, instruction, lo, hi, 0, calls);
            },
            Instruction::Lt => {
                let x = self.pop_u32(clk, "Lt")?;
                let y = self.pop_u32(clk, "Lt")?;
                let result = (y < x) as u64;
                self.op_stack.push(clk, Felt::new(result));
                self.record_u32(clk, instruction, x, y, result, calls);
            },
            Instruction::And => {
                let x = self.pop_u32(clk, "And")?;
                let y = self.pop_u32(clk, "And")?;
                let result = x & y;
                self.op_stack.push(clk, Felt::new(result));
                self.record_u32(clk, instruction, x, y, result, calls);
            },
            Instruction::Xor => {
                let x = self.pop_u32(clk, "Xor")?;
                let y = self.pop_u32(clk, "Xor")?;
                let result = x ^ y;
                self.op_stack.push(clk, Felt::new(result));
                self.record_u32(clk, instruction, x, y, result, calls);
            },
            Instruction::Log2Floor => {
                let x = self.pop_u32(clk, "Log2Floor")?;
                if x == 0 {
                    return Err(ExecutionError::LogarithmOfZero);
                }
                let result = x.ilog2() as u64;
                self.op_stack.push(clk, Felt::new(result));
                self.record_u32(clk, instruction, x, 0, result, calls);
            },
            Instruction::Pow => {
                let exponent = self.pop_u32(clk, "Pow")?;
                let base = self.op_stack.pop(clk, "Pow")?;
                self.op_stack.push(clk, base.pow(exponent));
                self.record_u32(clk, instruction, exponent, 0, 0, calls);
            },
            Instruction::DivMod => {
                let divisor = self.pop_u32(clk, "DivMod")?;
                let numerator = self.pop_u32(clk, "DivMod")?;
                if divisor == 0 {
                    return Err(ExecutionError::DivisionByZero);
                }
                let quotient = numerator / divisor;
                let remainder = numerator % divisor;
                self.op_stack.push(clk, Felt::new(remainder));
                self.op_stack.push(clk, Felt::new(quotient));
                self.record_u32(clk, instruction, quotient, remainder, 0, calls);
                self.record_u32(clk, Instruction::Lt, remainder, divisor, 1, calls);
            },
            Instruction::PopCount => {
                let x = self.pop_u32(clk, "PopCount")?;
                let result = x.count_ones() as u64;
                self.op_stack.push(clk, Felt::new(result));
                self.record_u32(clk, instruction, x, 0, result, calls);
            },

            Instruction::XxAdd => {
                let x = self.pop_xfelt(clk, "XxAdd")?;
                let y = self.pop_xfelt(clk, "XxAdd")?;
                self.push_xfelt(clk, y + x);
            },
            Instruction::XxMul => {
                let x = self.pop_xfelt(clk, "XxMul")?;
                let y = self.pop_xfelt(clk, "XxMul")?;
                self.push_xfelt(clk, y * x);
            },
            Instruction::XInvert => {
                let x = self.pop_xfelt(clk, "XInvert")?;
                let inverse = x.try_inverse().ok_or(ExecutionError::InverseOfZero)?;
                self.push_xfelt(clk, inverse);
            },
            Instruction::XbMul => {
                let scalar = self.op_stack.pop(clk, "XbMul")?;
                let x = self.pop_xfelt(clk, "XbMul")?;
                self.push_xfelt(clk, x * scalar);
            },

            Instruction::ReadIo(n) => {
                for _ in 0..n.get() {
                    let value = self
                        .public_input
                        .pop_front()
                        .ok_or(ExecutionError::PublicInputExhausted)?;
                    self.op_stack.push(clk, value);
                }
            },
            Instruction::WriteIo(n) => {
                for _ in 0..n.get() {
                    let value = self.op_stack.pop(clk, "WriteIo")?;
                    self.public_output.push(value);
                }
            },

            Instruction::Hash => {
                let mut input = [ZERO; RATE];
                for element in input.iter_mut() {
                    *element = self.op_stack.pop(clk, "Hash")?;
                }
                let mut sponge = SpongeState::init();
                sponge.state[..RATE].copy_from_slice(&input);
                let trace = sponge.permute_with_trace();
                let digest = sponge.digest();
                for &element in digest.elements().iter().rev() {
                    self.op_stack.push(clk, element);
                }
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace: trace.to_vec(),
                }));
            },
            Instruction::AssertVector => {
                for position in 0..DIGEST_LEN {
                    let lhs = self.op_stack.pop(clk, "AssertVector")?;
                    let rhs = self
                        .op_stack
                        .get(DIGEST_LEN - 1)
                        .ok_or(ExecutionError::OpStackUnderflow("AssertVector"))?;
                    if lhs != rhs {
                        return Err(ExecutionError::VectorAssertionFailed { position, lhs, rhs });
                    }
                }
            },
            Instruction::SpongeInit => {
                let sponge = SpongeState::init();
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace: vec![sponge.state],
                }));
                self.sponge = Some(sponge);
            },
            Instruction::SpongeAbsorb => {
                if self.sponge.is_none() {
                    return Err(ExecutionError::SpongeNotInitialized);
                }
                let mut chunk = [ZERO; RATE];
                for element in chunk.iter_mut() {
                    *element = self.op_stack.pop(clk, "SpongeAbsorb")?;
                }
                let sponge = self.sponge.as_mut().expect("sponge is initialized");
                for (state_element, element) in sponge.state.iter_mut().zip(&chunk) {
                    *state_element += *element;
                }
                let trace = sponge.permute_with_trace();
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace: trace.to_vec(),
                }));
            },
            Instruction::SpongeAbsorbMem => {
                if self.sponge.is_none() {
                    return Err(ExecutionError::SpongeNotInitialized);
                }
                let address = self.op_stack.pop(clk, "SpongeAbsorbMem")?;
                let mut chunk = [ZERO; RATE];
                for (offset, element) in chunk.iter_mut().enumerate() {
                    let pointer = address + Felt::new(offset as u64);
                    *element = self.ram_read(clk, pointer, calls);
                }
                let sponge = self.sponge.as_mut().expect("sponge is initialized");
                for (state_element, element) in sponge.state.iter_mut().zip(&chunk) {
                    *state_element += *element;
                }
                let trace = sponge.permute_with_trace();
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace: trace.to_vec(),
                }));
            },
            Instruction::SpongeSqueeze => {
                let sponge = self.sponge.as_mut().ok_or(ExecutionError::SpongeNotInitialized)?;
                let trace = sponge.permute_with_trace();
                let produced: Vec<Felt> = sponge.state[..RATE].to_vec();
                for &element in produced.iter().rev() {
                    self.op_stack.push(clk, element);
                }
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace: trace.to_vec(),
                }));
            },
            Instruction::MerkleStep => {
                let node = self.pop_digest(clk, "MerkleStep")?;
                let sibling = self.pop_digest(clk, "MerkleStep")?;
                let index = self.op_stack.pop(clk, "MerkleStep")?;
                let (parent, trace) = merkle_parent(&node, &sibling, index);
                self.op_stack.push(clk, Felt::new(index.value() >> 1));
                self.push_digest(clk, parent);
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace,
                }));
            },
            Instruction::MerkleStepMem => {
                let node = self.pop_digest(clk, "MerkleStepMem")?;
                let index = self.op_stack.pop(clk, "MerkleStepMem")?;
                let pointer = self.op_stack.pop(clk, "MerkleStepMem")?;
                let mut sibling = [ZERO; DIGEST_LEN];
                for (offset, element) in sibling.iter_mut().enumerate() {
                    *element = self.ram_read(clk, pointer + Felt::new(offset as u64), calls);
                }
                let (parent, trace) = merkle_parent(&node, &sibling, index);
                self.op_stack.push(clk, pointer + Felt::new(DIGEST_LEN as u64));
                self.op_stack.push(clk, Felt::new(index.value() >> 1));
                self.push_digest(clk, parent);
                calls.push(CoProcessorCall::Sponge(HashEvent {
                    clk,
                    ci: instruction,
                    trace,
                }));
            },

            Instruction::XxDotStep => {
                let acc = self.pop_xfelt(clk, "XxDotStep")?;
                let lhs_pointer = self.op_stack.pop(clk, "XxDotStep")?;
                let rhs_pointer = self.op_stack.pop(clk, "XxDotStep")?;
                let lhs = self.ram_read_xfelt(clk, lhs_pointer, calls);
                let rhs = self.ram_read_xfelt(clk, rhs_pointer, calls);
                self.op_stack.push(clk, rhs_pointer + Felt::new(3));
                self.op_stack.push(clk, lhs_pointer + Felt::new(3));
                self.push_xfelt(clk, acc + lhs * rhs);
            },
            Instruction::XbDotStep => {
                let acc = self.pop_xfelt(clk, "XbDotStep")?;
                let base_pointer = self.op_stack.pop(clk, "XbDotStep")?;
                let ext_pointer = self.op_stack.pop(clk, "XbDotStep")?;
                let base = self.ram_read(clk, base_pointer, calls);
                let ext = self.ram_read_xfelt(clk, ext_pointer, calls);
                self.op_stack.push(clk, ext_pointer + Felt::new(3));
                self.op_stack.push(clk, base_pointer + ONE);
                self.push_xfelt(clk, acc + ext * base);
            },

            Instruction::PushPerm => {
                let mut point = ZERO;
                for weight in RUNTIME_PERM_WEIGHTS {
                    let value = self.op_stack.pop(clk, "PushPerm")?;
                    point += weight * value;
                }
                self.perm_rp *= RUNTIME_PERM_ALPHA - point;
            },
            Instruction::PopPerm => {
                let mut point = ZERO;
                for (depth, weight) in RUNTIME_PERM_WEIGHTS.iter().enumerate() {
                    let value = self
                        .op_stack
                        .get(depth)
                        .ok_or(ExecutionError::OpStackUnderflow("PopPerm"))?;
                    point += *weight * value;
                }
                let factor = (RUNTIME_PERM_ALPHA - point)
                    .try_inverse()
                    .ok_or(ExecutionError::RuntimePermutationDivisionByZero)?;
                self.perm_rp *= factor;
            },
            Instruction::AssertPerm => {
                if self.perm_rp != ONE {
                    return Err(ExecutionError::RuntimePermutationAssertionFailed(self.perm_rp));
                }
            },
        }

        if !self.halting {
            self.ip = next_ip;
        }
        Ok(())
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    fn ram_read(&mut self, clk: u64, pointer: Felt, calls: &mut Vec<CoProcessorCall>) -> Felt {
        let value = self.ram.get(&pointer).copied().unwrap_or(ZERO);
        calls.push(CoProcessorCall::Ram(RamTableCall { clk, op: RamOp::Read, pointer, value }));
        value
    }

    fn ram_write(
        &mut self,
        clk: u64,
        pointer: Felt,
        value: Felt,
        calls: &mut Vec<CoProcessorCall>,
    ) {
        self.ram.insert(pointer, value);
        calls.push(CoProcessorCall::Ram(RamTableCall { clk, op: RamOp::Write, pointer, value }));
    }

    fn ram_read_xfelt(
        &mut self,
        clk: u64,
        pointer: Felt,
        calls: &mut Vec<CoProcessorCall>,
    ) -> XFelt {
        let c0 = self.ram_read(clk, pointer, calls);
        let c1 = self.ram_read(clk, pointer + ONE, calls);
        let c2 = self.ram_read(clk, pointer + Felt::new(2), calls);
        XFelt::new([c0, c1, c2])
    }

    fn pop_u32(&mut self, clk: u64, instruction: &'static str) -> Result<u64, ExecutionError> {
        let value = self.op_stack.pop(clk, instruction)?;
        if value.value() > u32::MAX as u64 {
            return Err(ExecutionError::NotU32(value));
        }
        Ok(value.value())
    }

    fn pop_xfelt(&mut self, clk: u64, instruction: &'static str) -> Result<XFelt, ExecutionError> {
        let c0 = self.op_stack.pop(clk, instruction)?;
        let c1 = self.op_stack.pop(clk, instruction)?;
        let c2 = self.op_stack.pop(clk, instruction)?;
        Ok(XFelt::new([c0, c1, c2]))
    }

    fn push_xfelt(&mut self, clk: u64, value: XFelt) {
        let [c0, c1, c2] = value.coefficients;
        self.op_stack.push(clk, c2);
        self.op_stack.push(clk, c1);
        self.op_stack.push(clk, c0);
    }

    fn pop_digest(
        &mut self,
        clk: u64,
        instruction: &'static str,
    ) -> Result<[Felt; DIGEST_LEN], ExecutionError> {
        let mut digest = [ZERO; DIGEST_LEN];
        for element in digest.iter_mut() {
            *element = self.op_stack.pop(clk, instruction)?;
        }
        Ok(digest)
    }

    fn push_digest(&mut self, clk: u64, digest: [Felt; DIGEST_LEN]) {
        for &element in digest.iter().rev() {
            self.op_stack.push(clk, element);
        }
    }

    fn record_u32(
        &self,
        clk: u64,
        ci: Instruction,
        lhs: u64,
        rhs: u64,
        result: u64,
        calls: &mut Vec<CoProcessorCall>,
    ) {
        calls.push(CoProcessorCall::U32 {
            clk,
            entry: U32TableEntry { ci, lhs, rhs, result },
        });
    }
}

/// Hashes a Merkle node with its sibling; the node index's parity decides
/// which of the two is the left child.
fn merkle_parent(
    node: &[Felt; DIGEST_LEN],
    sibling: &[Felt; DIGEST_LEN],
    index: Felt,
) -> ([Felt; DIGEST_LEN], Vec<[Felt; STATE_SIZE]>) {
    let (left, right) = if index.value() & 1 == 0 { (node, sibling) } else { (sibling, node) };
    let mut sponge = SpongeState::init();
    sponge.state[..DIGEST_LEN].copy_from_slice(left);
    sponge.state[DIGEST_LEN..RATE].copy_from_slice(right);
    let trace = sponge.permute_with_trace();
    let digest = sponge.digest();
    debug_assert_eq!(trace.len(), PERMUTATION_TRACE_LEN);
    (*digest.elements(), trace.to_vec())
}
