//! Column layout of the master tables.
//!
//! All ten tables of the algebraic execution trace live side by side in two
//! master matrices of a common padded height: one for the main columns
//! (committed before any challenge is sampled) and one for the auxiliary
//! columns (running products and log-derivatives, computed with challenges).
//! The enums below give every column a name; `master_index` maps it to its
//! offset in the corresponding master matrix.

use core::ops::Range;

use strum::EnumCount;

macro_rules! impl_master_index {
    ($column:ident, $offset:expr) => {
        impl $column {
            pub const fn master_index(self) -> usize {
                $offset + self as usize
            }
        }
    };
}

// TABLE KINDS
// ================================================================================================

/// The ten tables of the algebraic execution trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, strum::EnumIter)]
pub enum TableKind {
    Processor,
    OpStack,
    Ram,
    JumpStack,
    Program,
    ProgramHash,
    Hash,
    U32,
    Cascade,
    Lookup,
}

pub const NUM_TABLES: usize = TableKind::COUNT;

impl TableKind {
    /// The columns this table occupies in the master main matrix.
    pub const fn main_column_range(self) -> Range<usize> {
        match self {
            TableKind::Processor => PROCESSOR_MAIN_OFFSET..OP_STACK_MAIN_OFFSET,
            TableKind::OpStack => OP_STACK_MAIN_OFFSET..RAM_MAIN_OFFSET,
            TableKind::Ram => RAM_MAIN_OFFSET..JUMP_STACK_MAIN_OFFSET,
            TableKind::JumpStack => JUMP_STACK_MAIN_OFFSET..PROGRAM_MAIN_OFFSET,
            TableKind::Program => PROGRAM_MAIN_OFFSET..PROGRAM_HASH_MAIN_OFFSET,
            TableKind::ProgramHash => PROGRAM_HASH_MAIN_OFFSET..HASH_MAIN_OFFSET,
            TableKind::Hash => HASH_MAIN_OFFSET..U32_MAIN_OFFSET,
            TableKind::U32 => U32_MAIN_OFFSET..CASCADE_MAIN_OFFSET,
            TableKind::Cascade => CASCADE_MAIN_OFFSET..LOOKUP_MAIN_OFFSET,
            TableKind::Lookup => LOOKUP_MAIN_OFFSET..NUM_MAIN_COLUMNS,
        }
    }

    /// The columns this table occupies in the master auxiliary matrix.
    pub const fn aux_column_range(self) -> Range<usize> {
        match self {
            TableKind::Processor => PROCESSOR_AUX_OFFSET..OP_STACK_AUX_OFFSET,
            TableKind::OpStack => OP_STACK_AUX_OFFSET..RAM_AUX_OFFSET,
            TableKind::Ram => RAM_AUX_OFFSET..JUMP_STACK_AUX_OFFSET,
            TableKind::JumpStack => JUMP_STACK_AUX_OFFSET..PROGRAM_AUX_OFFSET,
            TableKind::Program => PROGRAM_AUX_OFFSET..PROGRAM_HASH_AUX_OFFSET,
            TableKind::ProgramHash => PROGRAM_HASH_AUX_OFFSET..HASH_AUX_OFFSET,
            TableKind::Hash => HASH_AUX_OFFSET..U32_AUX_OFFSET,
            TableKind::U32 => U32_AUX_OFFSET..CASCADE_AUX_OFFSET,
            TableKind::Cascade => CASCADE_AUX_OFFSET..LOOKUP_AUX_OFFSET,
            TableKind::Lookup => LOOKUP_AUX_OFFSET..NUM_AUX_COLUMNS,
        }
    }
}

// PROCESSOR TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum ProcessorMainColumn {
    Clk,
    Ip,
    Ci,
    Nia,
    Ib0,
    Ib1,
    Ib2,
    Jsp,
    Jso,
    Jsd,
    OpStackPointer,
    St0,
    St1,
    St2,
    St3,
    St4,
    St5,
    St6,
    St7,
    St8,
    St9,
    St10,
    St11,
    St12,
    St13,
    St14,
    St15,
    ClockJumpDifferenceLookupMultiplicity,
    IsPadding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum ProcessorAuxColumn {
    InputEvalArg,
    OutputEvalArg,
    InstructionLookupClientLogDerivative,
    OpStackTablePermArg,
    RamTablePermArg,
    JumpStackTablePermArg,
    HashEvalArg,
    U32LookupClientLogDerivative,
    ClockJumpDifferenceLookupServerLogDerivative,
    RuntimePermutationRunningProduct,
}

/// The stack register columns, in order.
pub const STACK_REGISTERS: [ProcessorMainColumn; 16] = [
    ProcessorMainColumn::St0,
    ProcessorMainColumn::St1,
    ProcessorMainColumn::St2,
    ProcessorMainColumn::St3,
    ProcessorMainColumn::St4,
    ProcessorMainColumn::St5,
    ProcessorMainColumn::St6,
    ProcessorMainColumn::St7,
    ProcessorMainColumn::St8,
    ProcessorMainColumn::St9,
    ProcessorMainColumn::St10,
    ProcessorMainColumn::St11,
    ProcessorMainColumn::St12,
    ProcessorMainColumn::St13,
    ProcessorMainColumn::St14,
    ProcessorMainColumn::St15,
];

// OP STACK TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum OpStackMainColumn {
    Clk,
    /// 0 = the stack grows, 1 = the stack shrinks, 2 = padding.
    Ib1Shrink,
    StackPointer,
    FirstUnderflowElement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum OpStackAuxColumn {
    RunningProductPermArg,
    ClockJumpDifferenceLookupClientLogDerivative,
}

// RAM TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum RamMainColumn {
    Clk,
    /// 0 = write, 1 = read, 2 = padding.
    InstructionType,
    RamPointer,
    RamValue,
    /// Inverse of the pointer difference to the next row, or 0 if the pointer
    /// does not change.
    InversePointerDiff,
    BezoutCoefficient0,
    BezoutCoefficient1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum RamAuxColumn {
    PointerRunningProduct,
    FormalDerivative,
    BezoutAccumulator0,
    BezoutAccumulator1,
    RunningProductPermArg,
    ClockJumpDifferenceLookupClientLogDerivative,
}

// JUMP STACK TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum JumpStackMainColumn {
    Clk,
    Ci,
    Jsp,
    Jso,
    Jsd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum JumpStackAuxColumn {
    RunningProductPermArg,
    ClockJumpDifferenceLookupClientLogDerivative,
}

// PROGRAM TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum ProgramMainColumn {
    Address,
    Instruction,
    LookupMultiplicity,
    IndexInChunk,
    /// Inverse of `RATE − 1 − IndexInChunk`, or 0 at the end of a chunk.
    MaxMinusIndexInv,
    IsHashInputPadding,
    IsTablePadding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum ProgramAuxColumn {
    InstructionLookupServerLogDerivative,
    PrepareChunkRunningEvaluation,
    SendChunkRunningEvaluation,
}

// PROGRAM HASH TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum ProgramHashMainColumn {
    RoundNumber,
    /// 1 while absorbing program chunks, 0 on padding rows.
    Mode,
    State0,
    State1,
    State2,
    State3,
    State4,
    State5,
    State6,
    State7,
    State8,
    State9,
    State10,
    State11,
    State12,
    State13,
    State14,
    State15,
    IsPadding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum ProgramHashAuxColumn {
    ReceiveChunkRunningEvaluation,
}

// HASH TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum HashMainColumn {
    RoundNumber,
    /// Opcode of the instruction that invoked the hash co-processor.
    Ci,
    State0,
    State1,
    State2,
    State3,
    State4,
    State5,
    State6,
    State7,
    State8,
    State9,
    State10,
    State11,
    State12,
    State13,
    State14,
    State15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum HashAuxColumn {
    RunningEvaluation,
}

// U32 TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum U32MainColumn {
    CopyFlag,
    Bits,
    BitsMinus33Inv,
    Ci,
    Lhs,
    LhsInv,
    Rhs,
    RhsInv,
    Result,
    LookupMultiplicity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum U32AuxColumn {
    ProcessorLookupServerLogDerivative,
    CascadeLookupClientLogDerivative,
}

// CASCADE TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum CascadeMainColumn {
    LookInHi,
    LookInLo,
    LookOutHi,
    LookOutLo,
    LookupMultiplicity,
    IsPadding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum CascadeAuxColumn {
    U32LookupServerLogDerivative,
    ByteLookupClientLogDerivative,
}

// LOOKUP TABLE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum LookupMainColumn {
    IsPadding,
    LookIn,
    LookOut,
    LookupMultiplicity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum LookupAuxColumn {
    CascadeLookupServerLogDerivative,
}

// MASTER TABLE OFFSETS
// ================================================================================================

pub const PROCESSOR_MAIN_OFFSET: usize = 0;
pub const OP_STACK_MAIN_OFFSET: usize = PROCESSOR_MAIN_OFFSET + ProcessorMainColumn::COUNT;
pub const RAM_MAIN_OFFSET: usize = OP_STACK_MAIN_OFFSET + OpStackMainColumn::COUNT;
pub const JUMP_STACK_MAIN_OFFSET: usize = RAM_MAIN_OFFSET + RamMainColumn::COUNT;
pub const PROGRAM_MAIN_OFFSET: usize = JUMP_STACK_MAIN_OFFSET + JumpStackMainColumn::COUNT;
pub const PROGRAM_HASH_MAIN_OFFSET: usize = PROGRAM_MAIN_OFFSET + ProgramMainColumn::COUNT;
pub const HASH_MAIN_OFFSET: usize = PROGRAM_HASH_MAIN_OFFSET + ProgramHashMainColumn::COUNT;
pub const U32_MAIN_OFFSET: usize = HASH_MAIN_OFFSET + HashMainColumn::COUNT;
pub const CASCADE_MAIN_OFFSET: usize = U32_MAIN_OFFSET + U32MainColumn::COUNT;
pub const LOOKUP_MAIN_OFFSET: usize = CASCADE_MAIN_OFFSET + CascadeMainColumn::COUNT;

/// Total width of the master main matrix.
pub const NUM_MAIN_COLUMNS: usize = LOOKUP_MAIN_OFFSET + LookupMainColumn::COUNT;

pub const PROCESSOR_AUX_OFFSET: usize = 0;
pub const OP_STACK_AUX_OFFSET: usize = PROCESSOR_AUX_OFFSET + ProcessorAuxColumn::COUNT;
pub const RAM_AUX_OFFSET: usize = OP_STACK_AUX_OFFSET + OpStackAuxColumn::COUNT;
pub const JUMP_STACK_AUX_OFFSET: usize = RAM_AUX_OFFSET + RamAuxColumn::COUNT;
pub const PROGRAM_AUX_OFFSET: usize = JUMP_STACK_AUX_OFFSET + JumpStackAuxColumn::COUNT;
pub const PROGRAM_HASH_AUX_OFFSET: usize = PROGRAM_AUX_OFFSET + ProgramAuxColumn::COUNT;
pub const HASH_AUX_OFFSET: usize = PROGRAM_HASH_AUX_OFFSET + ProgramHashAuxColumn::COUNT;
pub const U32_AUX_OFFSET: usize = HASH_AUX_OFFSET + HashAuxColumn::COUNT;
pub const CASCADE_AUX_OFFSET: usize = U32_AUX_OFFSET + U32AuxColumn::COUNT;
pub const LOOKUP_AUX_OFFSET: usize = CASCADE_AUX_OFFSET + CascadeAuxColumn::COUNT;

/// Total width of the master auxiliary matrix.
pub const NUM_AUX_COLUMNS: usize = LOOKUP_AUX_OFFSET + LookupAuxColumn::COUNT;

impl_master_index!(ProcessorMainColumn, PROCESSOR_MAIN_OFFSET);
impl_master_index!(OpStackMainColumn, OP_STACK_MAIN_OFFSET);
impl_master_index!(RamMainColumn, RAM_MAIN_OFFSET);
impl_master_index!(JumpStackMainColumn, JUMP_STACK_MAIN_OFFSET);
impl_master_index!(ProgramMainColumn, PROGRAM_MAIN_OFFSET);
impl_master_index!(ProgramHashMainColumn, PROGRAM_HASH_MAIN_OFFSET);
impl_master_index!(HashMainColumn, HASH_MAIN_OFFSET);
impl_master_index!(U32MainColumn, U32_MAIN_OFFSET);
impl_master_index!(CascadeMainColumn, CASCADE_MAIN_OFFSET);
impl_master_index!(LookupMainColumn, LOOKUP_MAIN_OFFSET);

impl_master_index!(ProcessorAuxColumn, PROCESSOR_AUX_OFFSET);
impl_master_index!(OpStackAuxColumn, OP_STACK_AUX_OFFSET);
impl_master_index!(RamAuxColumn, RAM_AUX_OFFSET);
impl_master_index!(JumpStackAuxColumn, JUMP_STACK_AUX_OFFSET);
impl_master_index!(ProgramAuxColumn, PROGRAM_AUX_OFFSET);
impl_master_index!(ProgramHashAuxColumn, PROGRAM_HASH_AUX_OFFSET);
impl_master_index!(HashAuxColumn, HASH_AUX_OFFSET);
impl_master_index!(U32AuxColumn, U32_AUX_OFFSET);
impl_master_index!(CascadeAuxColumn, CASCADE_AUX_OFFSET);
impl_master_index!(LookupAuxColumn, LOOKUP_AUX_OFFSET);

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn table_column_ranges_tile_the_master_matrices() {
        let mut next_main = 0;
        let mut next_aux = 0;
        for kind in TableKind::iter() {
            assert_eq!(kind.main_column_range().start, next_main, "{kind:?}");
            assert_eq!(kind.aux_column_range().start, next_aux, "{kind:?}");
            next_main = kind.main_column_range().end;
            next_aux = kind.aux_column_range().end;
        }
        assert_eq!(next_main, NUM_MAIN_COLUMNS);
        assert_eq!(next_aux, NUM_AUX_COLUMNS);
    }

    #[test]
    fn stack_registers_are_contiguous() {
        for (i, register) in STACK_REGISTERS.iter().enumerate() {
            assert_eq!(
                register.master_index(),
                ProcessorMainColumn::St0.master_index() + i
            );
        }
    }
}
