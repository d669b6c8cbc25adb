//! The instruction set of the Quartz VM.
//!
//! Every instruction occupies one or two words in program memory: its opcode,
//! followed by its argument iff it has one. The three low bits of each opcode
//! are semantic indicators:
//!
//! - bit 0 is set iff the instruction carries an argument,
//! - bit 1 is set iff the instruction shrinks the operational stack,
//! - bit 2 is set iff the instruction invokes the u32 co-processor.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::errors::ProgramError;
use crate::field::Felt;

// INSTRUCTION ARGUMENTS
// ================================================================================================

/// A word count argument in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumWords(u8);

impl NumWords {
    pub const fn get(&self) -> usize {
        self.0 as usize
    }
}

impl Default for NumWords {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u64> for NumWords {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, u64> {
        match value {
            1..=5 => Ok(Self(value as u8)),
            _ => Err(value),
        }
    }
}

impl From<NumWords> for Felt {
    fn from(value: NumWords) -> Self {
        Felt::new(value.0 as u64)
    }
}

impl fmt::Display for NumWords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An operational-stack register index in `0..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StackIdx(u8);

impl StackIdx {
    pub const fn get(&self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u64> for StackIdx {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, u64> {
        match value {
            0..=15 => Ok(Self(value as u8)),
            _ => Err(value),
        }
    }
}

impl From<StackIdx> for Felt {
    fn from(value: StackIdx) -> Self {
        Felt::new(value.0 as u64)
    }
}

impl fmt::Display for StackIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// INSTRUCTION
// ================================================================================================

/// One instruction of the Quartz VM.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, Serialize, Deserialize,
)]
pub enum Instruction {
    // operational stack
    Push(Felt),
    Pop(NumWords),
    Divine(NumWords),
    Pick(StackIdx),
    Place(StackIdx),
    Dup(StackIdx),
    Swap(StackIdx),

    // control flow
    Halt,
    Nop,
    Skiz,
    Call(Felt),
    Return,
    Recurse,
    RecurseOrReturn,
    Assert,

    // memory
    ReadMem(NumWords),
    WriteMem(NumWords),

    // base field arithmetic
    Add,
    AddI(Felt),
    Mul,
    Invert,
    Eq,

    // u32 co-processor
    Split,
    Lt,
    And,
    Xor,
    Log2Floor,
    Pow,
    DivMod,
    PopCount,

    // extension field arithmetic
    XxAdd,
    XxMul,
    XInvert,
    XbMul,

    // input / output
    ReadIo(NumWords),
    WriteIo(NumWords),

    // hashing
    Hash,
    AssertVector,
    SpongeInit,
    SpongeAbsorb,
    SpongeAbsorbMem,
    SpongeSqueeze,
    MerkleStep,
    MerkleStepMem,

    // dot products
    XxDotStep,
    XbDotStep,

    // run-time permutation check
    PushPerm,
    PopPerm,
    AssertPerm,
}

impl Instruction {
    /// The unique opcode of this instruction.
    pub const fn opcode(&self) -> u32 {
        match self {
            Instruction::Halt => 0,
            Instruction::Push(_) => 1,
            Instruction::Skiz => 2,
            Instruction::Pop(_) => 3,
            Instruction::Split => 4,
            Instruction::Lt => 6,
            Instruction::Nop => 8,
            Instruction::Divine(_) => 9,
            Instruction::Assert => 10,
            Instruction::WriteMem(_) => 11,
            Instruction::Log2Floor => 12,
            Instruction::And => 14,
            Instruction::Return => 16,
            Instruction::Pick(_) => 17,
            Instruction::Add => 18,
            Instruction::WriteIo(_) => 19,
            Instruction::DivMod => 20,
            Instruction::Xor => 22,
            Instruction::Recurse => 24,
            Instruction::Place(_) => 25,
            Instruction::Mul => 26,
            Instruction::PopCount => 28,
            Instruction::Pow => 30,
            Instruction::RecurseOrReturn => 32,
            Instruction::Dup(_) => 33,
            Instruction::Eq => 34,
            Instruction::Invert => 40,
            Instruction::Swap(_) => 41,
            Instruction::XxAdd => 42,
            Instruction::XInvert => 48,
            Instruction::Call(_) => 49,
            Instruction::XxMul => 50,
            Instruction::SpongeInit => 56,
            Instruction::ReadMem(_) => 57,
            Instruction::XbMul => 58,
            Instruction::SpongeSqueeze => 64,
            Instruction::ReadIo(_) => 65,
            Instruction::Hash => 66,
            Instruction::MerkleStepMem => 72,
            Instruction::AddI(_) => 73,
            Instruction::AssertVector => 74,
            Instruction::XxDotStep => 80,
            Instruction::SpongeAbsorb => 82,
            Instruction::XbDotStep => 88,
            Instruction::SpongeAbsorbMem => 90,
            Instruction::PopPerm => 96,
            Instruction::MerkleStep => 98,
            Instruction::AssertPerm => 104,
            Instruction::PushPerm => 106,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Instruction::Push(_) => "Push",
            Instruction::Pop(_) => "Pop",
            Instruction::Divine(_) => "Divine",
            Instruction::Pick(_) => "Pick",
            Instruction::Place(_) => "Place",
            Instruction::Dup(_) => "Dup",
            Instruction::Swap(_) => "Swap",
            Instruction::Halt => "Halt",
            Instruction::Nop => "Nop",
            Instruction::Skiz => "Skiz",
            Instruction::Call(_) => "Call",
            Instruction::Return => "Return",
            Instruction::Recurse => "Recurse",
            Instruction::RecurseOrReturn => "RecurseOrReturn",
            Instruction::Assert => "Assert",
            Instruction::ReadMem(_) => "ReadMem",
            Instruction::WriteMem(_) => "WriteMem",
            Instruction::Add => "Add",
            Instruction::AddI(_) => "AddI",
            Instruction::Mul => "Mul",
            Instruction::Invert => "Invert",
            Instruction::Eq => "Eq",
            Instruction::Split => "Split",
            Instruction::Lt => "Lt",
            Instruction::And => "And",
            Instruction::Xor => "Xor",
            Instruction::Log2Floor => "Log2Floor",
            Instruction::Pow => "Pow",
            Instruction::DivMod => "DivMod",
            Instruction::PopCount => "PopCount",
            Instruction::XxAdd => "XxAdd",
            Instruction::XxMul => "XxMul",
            Instruction::XInvert => "XInvert",
            Instruction::XbMul => "XbMul",
            Instruction::ReadIo(_) => "ReadIo",
            Instruction::WriteIo(_) => "WriteIo",
            Instruction::Hash => "Hash",
            Instruction::AssertVector => "AssertVector",
            Instruction::SpongeInit => "SpongeInit",
            Instruction::SpongeAbsorb => "SpongeAbsorb",
            Instruction::SpongeAbsorbMem => "SpongeAbsorbMem",
            Instruction::SpongeSqueeze => "SpongeSqueeze",
            Instruction::MerkleStep => "MerkleStep",
            Instruction::MerkleStepMem => "MerkleStepMem",
            Instruction::XxDotStep => "XxDotStep",
            Instruction::XbDotStep => "XbDotStep",
            Instruction::PushPerm => "PushPerm",
            Instruction::PopPerm => "PopPerm",
            Instruction::AssertPerm => "AssertPerm",
        }
    }

    pub fn opcode_felt(&self) -> Felt {
        Felt::new(self.opcode() as u64)
    }

    /// The argument of this instruction, if it has one.
    pub fn arg(&self) -> Option<Felt> {
        match *self {
            Instruction::Push(arg) | Instruction::Call(arg) | Instruction::AddI(arg) => Some(arg),
            Instruction::Pop(n)
            | Instruction::Divine(n)
            | Instruction::ReadMem(n)
            | Instruction::WriteMem(n)
            | Instruction::ReadIo(n)
            | Instruction::WriteIo(n) => Some(n.into()),
            Instruction::Pick(i)
            | Instruction::Place(i)
            | Instruction::Dup(i)
            | Instruction::Swap(i) => Some(i.into()),
            _ => None,
        }
    }

    /// `true` iff the instruction carries an argument.
    pub fn has_arg(&self) -> bool {
        self.opcode() & 1 == 1
    }

    /// The size of the instruction in program memory words.
    pub fn size(&self) -> usize {
        if self.has_arg() { 2 } else { 1 }
    }

    /// The i-th bit of the opcode, as a field element.
    pub fn ib(&self, bit: usize) -> Felt {
        Felt::new(((self.opcode() >> bit) & 1) as u64)
    }

    /// `true` iff the instruction shrinks the operational stack.
    pub fn shrinks_stack(&self) -> bool {
        self.opcode() & 2 == 2
    }

    /// `true` iff the instruction invokes the u32 co-processor.
    pub fn is_u32_instruction(&self) -> bool {
        self.opcode() & 4 == 4
    }

    /// The net change this instruction applies to the stack height.
    pub fn op_stack_delta(&self) -> i64 {
        match *self {
            Instruction::Push(_) | Instruction::Pick(_) | Instruction::Dup(_) => 1,
            Instruction::Pop(n) => -(n.get() as i64),
            Instruction::Divine(n) | Instruction::ReadIo(n) => n.get() as i64,
            Instruction::WriteIo(n) => -(n.get() as i64),
            Instruction::ReadMem(n) => n.get() as i64 - 1,
            Instruction::WriteMem(n) => -(n.get() as i64 + 1),
            Instruction::Skiz | Instruction::Assert => -1,
            Instruction::Add | Instruction::Mul | Instruction::Eq => -1,
            Instruction::Lt | Instruction::And | Instruction::Xor | Instruction::Pow => -1,
            Instruction::Split => 1,
            Instruction::XxAdd | Instruction::XxMul => -3,
            Instruction::XbMul => -1,
            Instruction::Hash | Instruction::AssertVector | Instruction::MerkleStep => -5,
            Instruction::SpongeAbsorb => -10,
            Instruction::SpongeAbsorbMem => -1,
            Instruction::SpongeSqueeze => 10,
            Instruction::PushPerm => -5,
            _ => 0,
        }
    }

    /// Reconstructs an instruction from an opcode and an optional argument.
    ///
    /// # Errors
    /// Returns an error if the opcode is unknown, the argument is missing, or
    /// the argument is out of range for the instruction.
    pub fn try_from_opcode(opcode: u64, arg: Option<Felt>) -> Result<Self, ProgramError> {
        let template = Self::template_for_opcode(opcode)?;
        if !template.has_arg() {
            return Ok(template);
        }
        let arg = arg.ok_or(ProgramError::MissingArgument(template.name()))?;
        template.with_arg(arg)
    }

    /// The instruction with the given opcode, carrying its default argument.
    ///
    /// # Errors
    /// Returns an error if no instruction has the given opcode.
    pub fn template_for_opcode(opcode: u64) -> Result<Self, ProgramError> {
        Self::iter()
            .find(|instruction| instruction.opcode() as u64 == opcode)
            .ok_or(ProgramError::UnknownOpcode(opcode))
    }

    /// Replaces the argument of this instruction.
    ///
    /// # Errors
    /// Returns an error if the instruction takes no argument or the argument
    /// is out of range.
    pub fn with_arg(&self, arg: Felt) -> Result<Self, ProgramError> {
        let out_of_range = || ProgramError::ArgumentOutOfRange {
            instruction: self.name(),
            arg: arg.value(),
        };
        let num_words = || NumWords::try_from(arg.value()).map_err(|_| out_of_range());
        let stack_idx = || StackIdx::try_from(arg.value()).map_err(|_| out_of_range());
        match self {
            Instruction::Push(_) => Ok(Instruction::Push(arg)),
            Instruction::Call(_) => Ok(Instruction::Call(arg)),
            Instruction::AddI(_) => Ok(Instruction::AddI(arg)),
            Instruction::Pop(_) => Ok(Instruction::Pop(num_words()?)),
            Instruction::Divine(_) => Ok(Instruction::Divine(num_words()?)),
            Instruction::ReadMem(_) => Ok(Instruction::ReadMem(num_words()?)),
            Instruction::WriteMem(_) => Ok(Instruction::WriteMem(num_words()?)),
            Instruction::ReadIo(_) => Ok(Instruction::ReadIo(num_words()?)),
            Instruction::WriteIo(_) => Ok(Instruction::WriteIo(num_words()?)),
            Instruction::Pick(_) => Ok(Instruction::Pick(stack_idx()?)),
            Instruction::Place(_) => Ok(Instruction::Place(stack_idx()?)),
            Instruction::Dup(_) => Ok(Instruction::Dup(stack_idx()?)),
            Instruction::Swap(_) => Ok(Instruction::Swap(stack_idx()?)),
            _ => Err(ProgramError::UnexpectedArgument(self.name())),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg() {
            Some(arg) => write!(f, "{}({})", self.name(), arg),
            None => write!(f, "{}", self.name()),
        }
    }
}

impl FromStr for Instruction {
    type Err = ProgramError;

    /// Parses the rendered form: a bare name like `Halt`, or `Name(arg)` with
    /// a decimal argument.
    fn from_str(s: &str) -> Result<Self, ProgramError> {
        let (name, arg) = match s.find('(') {
            Some(open) => {
                let close = s
                    .strip_suffix(')')
                    .ok_or_else(|| ProgramError::UnknownInstruction(s.to_string()))?;
                let arg = close[open + 1..]
                    .parse::<u64>()
                    .map_err(|_| ProgramError::UnknownInstruction(s.to_string()))?;
                (&s[..open], Some(Felt::new(arg)))
            },
            None => (s, None),
        };

        let template = Self::iter()
            .find(|instruction| instruction.name() == name)
            .ok_or_else(|| ProgramError::UnknownInstruction(s.to_string()))?;
        match (template.has_arg(), arg) {
            (true, Some(arg)) => template.with_arg(arg),
            (true, None) => Err(ProgramError::MissingArgument(template.name())),
            (false, None) => Ok(template),
            (false, Some(_)) => Err(ProgramError::UnexpectedArgument(template.name())),
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn opcodes_are_unique() {
        let mut seen = HashMap::new();
        for instruction in Instruction::iter() {
            if let Some(other) = seen.insert(instruction.opcode(), instruction) {
                panic!(
                    "{other} and {instruction} share opcode {}",
                    instruction.opcode()
                );
            }
        }
    }

    #[test]
    fn argument_indicator_bit_matches_argument_presence() {
        for instruction in Instruction::iter() {
            assert_eq!(instruction.has_arg(), instruction.arg().is_some(), "{instruction}");
            assert_eq!(instruction.size(), if instruction.has_arg() { 2 } else { 1 });
        }
    }

    #[test]
    fn shrink_indicator_bit_matches_stack_delta() {
        for instruction in Instruction::iter() {
            assert_eq!(
                instruction.shrinks_stack(),
                instruction.op_stack_delta() < 0,
                "{instruction}"
            );
        }
    }

    #[test]
    fn u32_indicator_bit_marks_exactly_the_u32_instructions() {
        let u32_instructions = [
            Instruction::Split,
            Instruction::Lt,
            Instruction::And,
            Instruction::Xor,
            Instruction::Log2Floor,
            Instruction::Pow,
            Instruction::DivMod,
            Instruction::PopCount,
        ];
        for instruction in Instruction::iter() {
            assert_eq!(
                instruction.is_u32_instruction(),
                u32_instructions.contains(&instruction),
                "{instruction}"
            );
        }
    }

    #[test]
    fn rendered_instructions_parse_back() {
        for instruction in Instruction::iter() {
            let rendered = instruction.to_string();
            assert_eq!(rendered.parse::<Instruction>().unwrap(), instruction);
        }
        assert_eq!("Push(100)".parse::<Instruction>().unwrap(), Instruction::Push(Felt::new(100)));
        assert_eq!(
            "Dup(3)".parse::<Instruction>().unwrap(),
            Instruction::Dup(StackIdx::try_from(3).unwrap())
        );
    }

    #[test]
    fn malformed_instruction_strings_are_rejected()  {
        assert!("Frobnicate".parse::<Instruction>().is_err());
        assert!("Push".parse::<Instruction>().is_err());
        assert!("Halt(1)".parse::<Instruction>().is_err());
        assert!("Dup(16)".parse::<Instruction>().is_err());
        assert!("Pop(0)".parse::<Instruction>().is_err());
        assert!("Pop(6)".parse::<Instruction>().is_err());
    }

    #[test]
    fn opcode_round_trips_through_decoding() {
        for instruction in Instruction::iter() {
            let decoded =
                Instruction::try_from_opcode(instruction.opcode() as u64, instruction.arg())
                    .unwrap();
            assert_eq!(decoded, instruction);
        }
    }
}
