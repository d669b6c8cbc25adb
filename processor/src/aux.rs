//! Construction of the auxiliary columns: every running product,
//! running evaluation, and log-derivative of the cross-table arguments,
//! computed from the main table and the recorded side effects under
//! transcript-derived challenges.
//!
//! Each column is produced as a new owned vector; nothing is edited in
//! place. The update rules here mirror the transition constraints evaluated
//! by the AIR, column for column.

use quartz_air::challenges::Challenges;
use quartz_air::columns::{
    CascadeAuxColumn, CascadeMainColumn, HashAuxColumn, HashMainColumn, JumpStackAuxColumn,
    JumpStackMainColumn, LookupAuxColumn, LookupMainColumn, OpStackAuxColumn, OpStackMainColumn,
    ProcessorAuxColumn, ProcessorMainColumn, ProgramAuxColumn, ProgramHashAuxColumn,
    ProgramHashMainColumn, ProgramMainColumn, RamAuxColumn, RamMainColumn, U32AuxColumn,
    U32MainColumn, NUM_AUX_COLUMNS,
};
use quartz_air::cross_table::{
    compress_cascade_row, compress_hash_invocation, compress_instruction, compress_jump_stack_row,
    compress_lookup_row, compress_op_stack_row, compress_ram_row, compress_u32_row,
    lookup_function, EvalArg, LookupArg, PermArg,
};
use quartz_core::hash::RATE;
use quartz_core::{Felt, Instruction, ONE, ZERO};

use crate::aet::{u32_entry_limbs, AlgebraicExecutionTrace, MasterMainTable};
use crate::errors::AetError;

impl AlgebraicExecutionTrace {
    /// Builds the padded master auxiliary table.
    ///
    /// # Errors
    /// Returns an error if any accumulator denominator degenerates, which for
    /// honestly sampled challenges happens with negligible probability.
    pub fn build_aux_columns(
        &self,
        main: &MasterMainTable,
        challenges: &Challenges,
    ) -> Result<Vec<Vec<Felt>>, AetError> {
        let height = main.padded_height;
        let mut aux = vec![vec![ZERO; NUM_AUX_COLUMNS]; height];

        self.build_processor_aux(main, challenges, &mut aux)?;
        build_op_stack_aux(main, challenges, self.op_stack_table_height(), &mut aux)?;
        build_ram_aux(main, challenges, &mut aux)?;
        build_jump_stack_aux(main, challenges, self.jump_stack_table_height(), &mut aux)?;
        build_program_aux(main, challenges, &mut aux)?;
        self.build_program_hash_aux(main, challenges, &mut aux)?;
        build_hash_aux(main, challenges, self.hash_table_height(), &mut aux)?;
        self.build_u32_aux(main, challenges, &mut aux)?;
        build_cascade_aux(main, challenges, &mut aux)?;
        build_lookup_aux(main, challenges, &mut aux)?;

        Ok(aux)
    }

    fn build_processor_aux(
        &self,
        main: &MasterMainTable,
        ch: &Challenges,
        aux: &mut [Vec<Felt>],
    ) -> Result<(), AetError> {
        use ProcessorAuxColumn as A;
        use ProcessorMainColumn as M;
        let num_real_rows = self.processor_rows.len();

        // per-cycle side effects
        let mut input_reads = vec![Vec::new(); num_real_rows];
        for (clk, symbols) in &self.input_reads {
            input_reads[*clk as usize].extend_from_slice(symbols);
        }
        let mut output_writes = vec![Vec::new(); num_real_rows];
        for (clk, symbols) in &self.output_writes {
            output_writes[*clk as usize].extend_from_slice(symbols);
        }
        let mut op_stack_by_clk = vec![Vec::new(); num_real_rows];
        for event in &self.op_stack_events {
            op_stack_by_clk[event.clk as usize].push(*event);
        }
        let mut ram_by_clk = vec![Vec::new(); num_real_rows];
        for call in &self.ram_calls {
            ram_by_clk[call.clk as usize].push(*call);
        }
        let mut jump_stack_by_clk = vec![Vec::new(); num_real_rows];
        for event in &self.jump_stack_events {
            jump_stack_by_clk[event.clk as usize].push(*event);
        }
        let mut hash_by_clk = vec![Vec::new(); num_real_rows];
        for event in &self.hash_events {
            hash_by_clk[event.clk as usize].push(event.clone());
        }
        let mut u32_by_clk = vec![Vec::new(); num_real_rows];
        for (clk, entry) in &self.u32_calls {
            u32_by_clk[*clk as usize].push(*entry);
        }

        let mut input_eval = EvalArg::default_initial();
        let mut output_eval = EvalArg::compute_terminal(
            &self.program.hash().elements()[..],
            EvalArg::default_initial(),
            ch.output_indeterminate,
        );
        let mut instruction_ld = LookupArg::default_initial();
        let mut op_stack_rp = PermArg::default_initial();
        let mut ram_rp = PermArg::default_initial();
        let mut jump_stack_rp = PermArg::default_initial();
        let mut hash_eval = EvalArg::default_initial();
        let mut u32_ld = LookupArg::default_initial();
        let mut cjd_ld = LookupArg::default_initial();
        let mut runtime_rp = PermArg::default_initial();

        for (i, aux_row) in aux.iter_mut().enumerate() {
            let row = main.row(i);
            let real = i < num_real_rows;

            // deferred columns carry the value accumulated before this row
            aux_row[A::InputEvalArg.master_index()] = input_eval;
            aux_row[A::OutputEvalArg.master_index()] = output_eval;
            aux_row[A::RuntimePermutationRunningProduct.master_index()] = runtime_rp;

            if real {
                for &symbol in &input_reads[i] {
                    input_eval = input_eval * ch.input_indeterminate + symbol;
                }
                for &symbol in &output_writes[i] {
                    output_eval = output_eval * ch.output_indeterminate + symbol;
                }

                let compressed = compress_instruction(
                    ch,
                    row[M::Ip.master_index()],
                    row[M::Ci.master_index()],
                    row[M::Nia.master_index()],
                );
                instruction_ld += invert(ch.instruction_lookup_indeterminate - compressed)?;

                for event in &op_stack_by_clk[i] {
                    let compressed = compress_op_stack_row(
                        ch,
                        Felt::new(event.clk),
                        Felt::from(event.shrinks),
                        Felt::new(event.stack_pointer),
                        event.first_underflow_element,
                    );
                    op_stack_rp *= ch.op_stack_indeterminate - compressed;
                }
                for call in &ram_by_clk[i] {
                    let compressed = compress_ram_row(
                        ch,
                        Felt::new(call.clk),
                        ram_op_type(call.op),
                        call.pointer,
                        call.value,
                    );
                    ram_rp *= ch.ram_indeterminate - compressed;
                }
                for event in &jump_stack_by_clk[i] {
                    let compressed = compress_jump_stack_row(
                        ch,
                        Felt::new(event.clk),
                        event.ci.opcode_felt(),
                        Felt::new(event.jsp),
                        event.jso,
                        event.jsd,
                    );
                    jump_stack_rp *= ch.jump_stack_indeterminate - compressed;
                }
                for event in &hash_by_clk[i] {
                    let symbol =
                        compress_hash_invocation(ch, event.ci.opcode_felt(), &event.rate());
                    hash_eval = hash_eval * ch.hash_input_indeterminate + symbol;
                }
                for entry in &u32_by_clk[i] {
                    let compressed = compress_u32_row(
                        ch,
                        entry.ci.opcode_felt(),
                        Felt::new(entry.lhs),
                        Felt::new(entry.rhs),
                        Felt::new(entry.result),
                    );
                    u32_ld += invert(ch.u32_indeterminate - compressed)?;
                }

                // the run-time permutation product, re-accumulated under the
                // transcript-derived challenge in place of the deterministic
                // in-VM parameters
                let ci = self.processor_rows[i].ci;
                if matches!(ci, Instruction::PushPerm | Instruction::PopPerm) {
                    let mut point = ZERO;
                    for (weight, register) in ch
                        .runtime_perm_weights
                        .iter()
                        .zip(quartz_air::columns::STACK_REGISTERS)
                    {
                        point += *weight * row[register.master_index()];
                    }
                    let factor = ch.runtime_perm_indeterminate - point;
                    match ci {
                        Instruction::PushPerm => runtime_rp *= factor,
                        _ => runtime_rp *= invert(factor)?,
                    }
                }
            }

            cjd_ld += row[M::ClockJumpDifferenceLookupMultiplicity.master_index()]
                * invert(ch.clock_jump_indeterminate - row[M::Clk.master_index()])?;

            // inclusive columns carry the value accumulated through this row
            aux_row[A::InstructionLookupClientLogDerivative.master_index()] = instruction_ld;
            aux_row[A::OpStackTablePermArg.master_index()] = op_stack_rp;
            aux_row[A::RamTablePermArg.master_index()] = ram_rp;
            aux_row[A::JumpStackTablePermArg.master_index()] = jump_stack_rp;
            aux_row[A::HashEvalArg.master_index()] = hash_eval;
            aux_row[A::U32LookupClientLogDerivative.master_index()] = u32_ld;
            aux_row[A::ClockJumpDifferenceLookupServerLogDerivative.master_index()] = cjd_ld;
        }
        Ok(())
    }

    fn build_program_hash_aux(
        &self,
        main: &MasterMainTable,
        ch: &Challenges,
        aux: &mut [Vec<Felt>],
    ) -> Result<(), AetError> {
        use ProgramHashMainColumn as M;
        let num_real_rows = self.program_hash_table_height();

        let mut receive = EvalArg::default_initial();
        let mut chunk_index = 0;
        for (i, aux_row) in aux.iter_mut().enumerate() {
            let row = main.row(i);
            if i < num_real_rows && row[M::RoundNumber.master_index()] == ZERO {
                let chunk = &self.program_hash_chunks[chunk_index];
                let chunk_eval = EvalArg::compute_terminal(
                    chunk,
                    EvalArg::default_initial(),
                    ch.program_chunk_inner_indeterminate,
                );
                receive = receive * ch.program_chunk_outer_indeterminate + chunk_eval;
                chunk_index += 1;
            }
            aux_row[ProgramHashAuxColumn::ReceiveChunkRunningEvaluation.master_index()] = receive;
        }
        Ok(())
    }

    fn build_u32_aux(
        &self,
        main: &MasterMainTable,
        ch: &Challenges,
        aux: &mut [Vec<Felt>],
    ) -> Result<(), AetError> {
        use U32MainColumn as M;
        let entries = self.aggregate_u32_entries();
        let mut entry_iter = entries.iter();

        let mut processor_ld = LookupArg::default_initial();
        let mut cascade_ld = LookupArg::default_initial();
        for (i, aux_row) in aux.iter_mut().enumerate() {
            let row = main.row(i);
            let copy = row[M::CopyFlag.master_index()];
            if copy == ONE {
                let compressed = compress_u32_row(
                    ch,
                    row[M::Ci.master_index()],
                    row[M::Lhs.master_index()],
                    row[M::Rhs.master_index()],
                    row[M::Result.master_index()],
                );
                let multiplicity = row[M::LookupMultiplicity.master_index()];
                processor_ld += multiplicity * invert(ch.u32_indeterminate - compressed)?;

                let (entry, _) = entry_iter.next().expect("one entry per copy row");
                for limb in u32_entry_limbs(entry) {
                    let in_hi = Felt::new((limb >> 8) as u64);
                    let in_lo = Felt::new((limb & 0xff) as u64);
                    let compressed = compress_cascade_row(
                        ch,
                        in_hi,
                        in_lo,
                        lookup_function(in_hi),
                        lookup_function(in_lo),
                    );
                    cascade_ld +=
                        multiplicity * invert(ch.cascade_indeterminate - compressed)?;
                }
            }
            aux_row[U32AuxColumn::ProcessorLookupServerLogDerivative.master_index()] =
                processor_ld;
            aux_row[U32AuxColumn::CascadeLookupClientLogDerivative.master_index()] = cascade_ld;
        }
        Ok(())
    }
}

// SIDE TABLES
// ================================================================================================

fn build_op_stack_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    num_real_rows: usize,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use OpStackMainColumn as M;

    let mut perm = PermArg::default_initial();
    let mut cjd = LookupArg::default_initial();
    for (i, aux_row) in aux.iter_mut().enumerate() {
        let row = main.row(i);
        if i < num_real_rows {
            let compressed = compress_op_stack_row(
                ch,
                row[M::Clk.master_index()],
                row[M::Ib1Shrink.master_index()],
                row[M::StackPointer.master_index()],
                row[M::FirstUnderflowElement.master_index()],
            );
            perm *= ch.op_stack_indeterminate - compressed;

            if i > 0 {
                let previous = main.row(i - 1);
                if previous[M::StackPointer.master_index()] == row[M::StackPointer.master_index()]
                {
                    let difference =
                        row[M::Clk.master_index()] - previous[M::Clk.master_index()];
                    cjd += invert(ch.clock_jump_indeterminate - difference)?;
                }
            }
        }
        aux_row[OpStackAuxColumn::RunningProductPermArg.master_index()] = perm;
        aux_row[OpStackAuxColumn::ClockJumpDifferenceLookupClientLogDerivative.master_index()] =
            cjd;
    }
    Ok(())
}

fn build_ram_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use RamAuxColumn as A;
    use RamMainColumn as M;
    let beta = ch.ram_bezout_indeterminate;

    let mut pointer_rp = PermArg::default_initial();
    let mut formal_derivative = ZERO;
    let mut bezout_0 = ZERO;
    let mut bezout_1 = ZERO;
    let mut perm = PermArg::default_initial();
    let mut cjd = LookupArg::default_initial();

    for (i, aux_row) in aux.iter_mut().enumerate() {
        let row = main.row(i);
        let padding = row[M::InstructionType.master_index()] == Felt::new(2);
        let pointer = row[M::RamPointer.master_index()];

        if i == 0 {
            if !padding {
                pointer_rp = beta - pointer;
                formal_derivative = ONE;
                bezout_0 = row[M::BezoutCoefficient0.master_index()];
                bezout_1 = row[M::BezoutCoefficient1.master_index()];
            } else {
                // an empty table certifies the constant polynomial 1
                bezout_0 = ONE;
            }
        } else {
            let previous = main.row(i - 1);
            let changed = previous[M::RamPointer.master_index()] != pointer;
            if changed {
                formal_derivative = pointer_rp + (beta - pointer) * formal_derivative;
                pointer_rp *= beta - pointer;
                bezout_0 = beta * bezout_0 + row[M::BezoutCoefficient0.master_index()];
                bezout_1 = beta * bezout_1 + row[M::BezoutCoefficient1.master_index()];
            } else if !padding {
                let difference = row[M::Clk.master_index()] - previous[M::Clk.master_index()];
                cjd += invert(ch.clock_jump_indeterminate - difference)?;
            }
        }

        if !padding {
            let compressed = compress_ram_row(
                ch,
                row[M::Clk.master_index()],
                row[M::InstructionType.master_index()],
                pointer,
                row[M::RamValue.master_index()],
            );
            perm *= ch.ram_indeterminate - compressed;
        }

        aux_row[A::PointerRunningProduct.master_index()] = pointer_rp;
        aux_row[A::FormalDerivative.master_index()] = formal_derivative;
        aux_row[A::BezoutAccumulator0.master_index()] = bezout_0;
        aux_row[A::BezoutAccumulator1.master_index()] = bezout_1;
        aux_row[A::RunningProductPermArg.master_index()] = perm;
        aux_row[A::ClockJumpDifferenceLookupClientLogDerivative.master_index()] = cjd;
    }
    Ok(())
}

fn build_jump_stack_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    num_real_rows: usize,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use JumpStackMainColumn as M;

    let mut perm = PermArg::default_initial();
    let mut cjd = LookupArg::default_initial();
    for (i, aux_row) in aux.iter_mut().enumerate() {
        let row = main.row(i);
        if i < num_real_rows {
            let compressed = compress_jump_stack_row(
                ch,
                row[M::Clk.master_index()],
                row[M::Ci.master_index()],
                row[M::Jsp.master_index()],
                row[M::Jso.master_index()],
                row[M::Jsd.master_index()],
            );
            perm *= ch.jump_stack_indeterminate - compressed;

            if i > 0 {
                let previous = main.row(i - 1);
                if previous[M::Jsp.master_index()] == row[M::Jsp.master_index()] {
                    let difference =
                        row[M::Clk.master_index()] - previous[M::Clk.master_index()];
                    cjd += invert(ch.clock_jump_indeterminate - difference)?;
                }
            }
        }
        aux_row[JumpStackAuxColumn::RunningProductPermArg.master_index()] = perm;
        aux_row[JumpStackAuxColumn::ClockJumpDifferenceLookupClientLogDerivative.master_index()] =
            cjd;
    }
    Ok(())
}

fn build_program_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use ProgramAuxColumn as A;
    use ProgramMainColumn as M;
    let chunk_end = Felt::new(RATE as u64 - 1);

    let mut lookup_ld = LookupArg::default_initial();
    let mut prepare = ZERO;
    let mut send = EvalArg::default_initial();

    for i in 0..aux.len() {
        let row = main.row(i);
        let table_padding = row[M::IsTablePadding.master_index()] == ONE;

        if i == 0 {
            prepare = ch.program_chunk_inner_indeterminate + row[M::Instruction.master_index()];
        } else {
            let previous = main.row(i - 1);
            // row i−1's instruction lookup contribution lands here
            let compressed = compress_instruction(
                ch,
                previous[M::Address.master_index()],
                previous[M::Instruction.master_index()],
                row[M::Instruction.master_index()],
            );
            lookup_ld += previous[M::LookupMultiplicity.master_index()]
                * invert(ch.instruction_lookup_indeterminate - compressed)?;

            if !table_padding {
                prepare = if previous[M::IndexInChunk.master_index()] == chunk_end {
                    ch.program_chunk_inner_indeterminate + row[M::Instruction.master_index()]
                } else {
                    ch.program_chunk_inner_indeterminate * prepare
                        + row[M::Instruction.master_index()]
                };
            }
        }
        if row[M::IndexInChunk.master_index()] == chunk_end && !table_padding {
            send = send * ch.program_chunk_outer_indeterminate + prepare;
        }

        aux[i][A::InstructionLookupServerLogDerivative.master_index()] = lookup_ld;
        aux[i][A::PrepareChunkRunningEvaluation.master_index()] = prepare;
        aux[i][A::SendChunkRunningEvaluation.master_index()] = send;
    }
    Ok(())
}

fn build_hash_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    num_real_rows: usize,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use HashMainColumn as M;

    let mut eval = EvalArg::default_initial();
    for (i, aux_row) in aux.iter_mut().enumerate() {
        let row = main.row(i);
        if i < num_real_rows && row[M::RoundNumber.master_index()] == ZERO {
            let rate: Vec<Felt> = crate::aet::hash_state_columns()[..RATE]
                .iter()
                .map(|column| row[column.master_index()])
                .collect();
            let symbol = compress_hash_invocation(ch, row[M::Ci.master_index()], &rate);
            eval = eval * ch.hash_input_indeterminate + symbol;
        }
        aux_row[HashAuxColumn::RunningEvaluation.master_index()] = eval;
    }
    Ok(())
}

fn build_cascade_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use CascadeAuxColumn as A;
    use CascadeMainColumn as M;

    let mut server_ld = LookupArg::default_initial();
    let mut client_ld = LookupArg::default_initial();
    for (i, aux_row) in aux.iter_mut().enumerate() {
        let row = main.row(i);
        if row[M::IsPadding.master_index()] == ZERO {
            let compressed = compress_cascade_row(
                ch,
                row[M::LookInHi.master_index()],
                row[M::LookInLo.master_index()],
                row[M::LookOutHi.master_index()],
                row[M::LookOutLo.master_index()],
            );
            server_ld += row[M::LookupMultiplicity.master_index()]
                * invert(ch.cascade_indeterminate - compressed)?;

            let hi = compress_lookup_row(
                ch,
                row[M::LookInHi.master_index()],
                row[M::LookOutHi.master_index()],
            );
            let lo = compress_lookup_row(
                ch,
                row[M::LookInLo.master_index()],
                row[M::LookOutLo.master_index()],
            );
            client_ld += invert(ch.lookup_indeterminate - hi)?;
            client_ld += invert(ch.lookup_indeterminate - lo)?;
        }
        aux_row[A::U32LookupServerLogDerivative.master_index()] = server_ld;
        aux_row[A::ByteLookupClientLogDerivative.master_index()] = client_ld;
    }
    Ok(())
}

fn build_lookup_aux(
    main: &MasterMainTable,
    ch: &Challenges,
    aux: &mut [Vec<Felt>],
) -> Result<(), AetError> {
    use LookupMainColumn as M;

    let mut server_ld = LookupArg::default_initial();
    for (i, aux_row) in aux.iter_mut().enumerate() {
        let row = main.row(i);
        if row[M::IsPadding.master_index()] == ZERO {
            let compressed = compress_lookup_row(
                ch,
                row[M::LookIn.master_index()],
                row[M::LookOut.master_index()],
            );
            server_ld += row[M::LookupMultiplicity.master_index()]
                * invert(ch.lookup_indeterminate - compressed)?;
        }
        aux_row[LookupAuxColumn::CascadeLookupServerLogDerivative.master_index()] = server_ld;
    }
    Ok(())
}

// HELPERS
// ================================================================================================

fn ram_op_type(op: crate::vm::RamOp) -> Felt {
    match op {
        crate::vm::RamOp::Write => ZERO,
        crate::vm::RamOp::Read => ONE,
    }
}

fn invert(value: Felt) -> Result<Felt, AetError> {
    value.try_inverse().ok_or(AetError::NonInvertibleWitness)
}
