//! I/O tabling.
//!
//! Makes the I/O actions of foreign primitives replayable by the debugger.
//! Inside the window of tabled actions the runtime numbers every action;
//! the first time action `N` runs its outputs are saved under `N`, and when
//! the debugger retries across it they are restored instead of performing
//! the action again:
//!
//! ```text
//! ( if table_io_in_range(T0, Counter, Start) then
//!     table_lookup_insert_start_int(T0, Counter, Start, T),
//!     ( if table_io_has_answer(T) then
//!         restore the outputs, IO = IO0
//!     else
//!         G, save the outputs
//!     )
//! else
//!     G
//! )
//! ```

use log::debug;

use super::{TabledArgs, Transformed, cloned_pred, info::TableInfo};
use crate::middle::{
    diag::{Severity, report},
    hlds::{
        builtins::{self, RuntimePrimitive, TableHandle},
        goal::{ArgMode, ConsId, Goal, GoalExpr, TabledForIo},
        goal_util::{CallShape, assign, conj, construct, ite, plain_call},
        id::{PredProcId, ProgVar},
        module::{ModuleInfo, PredMarker, PredOrigin, ProcInfo},
        table::{EvalMethod, ProcTableInfo, TableArgInfo, TableIoDecl, TableIoUnitize},
    },
};

/// Gives every foreign I/O primitive of the module that is tabled for I/O
/// the matching I/O tabling evaluation method
pub fn annotate_io_procs(module_info: &mut ModuleInfo) {
    for id in module_info.all_procs() {
        let pred = module_info.pred(id.pred_id);
        if pred.is_imported() || pred.origin != PredOrigin::User {
            continue;
        }
        let proc_info = module_info.proc(id);
        if proc_info.eval_method.is_tabled() || !has_io_state_pair(proc_info) {
            continue;
        }
        let GoalExpr::ForeignProc(foreign) = &proc_info.body.expr else {
            continue;
        };

        let unitize = match foreign.attributes.tabled_for_io {
            Some(TabledForIo::TabledForIo) => TableIoUnitize::Alone,
            Some(TabledForIo::TabledForIoUnitize) => TableIoUnitize::Unitize,
            Some(TabledForIo::TabledForDescendantIo) => continue,
            Some(TabledForIo::NotTabledForIo) | None => {
                // Foreign code that calls back into the program has its I/O tabled
                // by the procedures it calls
                if module_info.options.trace_table_io_require && !foreign.attributes.may_call_mercury {
                    let desc = pred.describe();
                    let context = proc_info.context;
                    report!(
                        module_info,
                        Severity::Error,
                        context,
                        Some(desc),
                        "missing `tabled_for_io` annotation on a foreign procedure with an I/O state pair"
                    );
                }
                continue;
            }
        };

        let options = &module_info.options;
        let decl = if (options.trace_table_io_all || pred.is_exported()) && !options.trace_table_io_only_retry {
            TableIoDecl::Decl
        } else {
            TableIoDecl::Proc
        };

        if pred.has_marker(PredMarker::NoInline) {
            outline_io_proc(module_info, id);
        }
        debug!("table_gen: {} tabled for I/O ({decl}, {unitize})", module_info.pred(id.pred_id).describe());
        module_info.proc_mut(id).eval_method = EvalMethod::TableIo(decl, unitize);
    }
}

fn has_io_state_pair(proc_info: &ProcInfo) -> bool {
    let io_state = builtins::io_state_type();
    let io_modes: Vec<ArgMode> = proc_info
        .head_vars
        .iter()
        .zip(&proc_info.arg_modes)
        .filter(|(var, _)| *proc_info.var_table.ty(**var) == io_state)
        .map(|(_, mode)| *mode)
        .collect();
    io_modes.iter().any(|mode| mode.is_input()) && io_modes.iter().any(|mode| mode.is_output())
}

/// Moves the body of a `no_inline` primitive into a new predicate and makes
/// the original call it, so that the tabling code is not duplicated at
/// every place the foreign code would be inlined
fn outline_io_proc(module_info: &mut ModuleInfo, id: PredProcId) {
    let pred = module_info.pred(id.pred_id);
    let proc_info = module_info.proc(id);
    let outlined_id = PredProcId::new(module_info.preds.next_index(), id.proc_id);

    let mut outlined = proc_info.clone();
    if let GoalExpr::ForeignProc(foreign) = &mut outlined.body.expr {
        foreign.callee = outlined_id;
    }

    let body = &proc_info.body;
    let outputs: Vec<_> = proc_info
        .head_vars
        .iter()
        .zip(&proc_info.arg_modes)
        .filter(|(_, mode)| mode.is_output())
        .map(|(var, _)| *var)
        .collect();
    let name = format!("OutlinedForIOTablingFrom_{}", pred.name);
    let outlined_pred = cloned_pred(module_info, pred, &name, outlined);
    let call = plain_call(
        outlined_id,
        outlined_pred.sym_name(),
        proc_info.head_vars.clone(),
        outputs,
        CallShape::det()
            .with_determinism(body.info.determinism)
            .with_purity(body.info.purity),
        body.info.context,
    );

    module_info.add_pred(outlined_pred);
    module_info.proc_mut(id).body = call;
}

impl TableInfo<'_> {
    pub fn table_io(
        &mut self,
        body: Goal,
        decl: TableIoDecl,
        unitize: TableIoUnitize,
        args: &TabledArgs,
    ) -> Transformed {
        let context = self.context;
        let io_state = builtins::io_state_type();
        let is_io_state = |var: &ProgVar| self.var_type(*var) == io_state;
        let (io_inputs, inputs): (Vec<_>, Vec<_>) = args.inputs.iter().copied().partition(is_io_state);
        let (io_outputs, outputs): (Vec<_>, Vec<_>) = args.outputs.iter().copied().partition(is_io_state);
        let states_tabled = self.module_info().options.trace_table_io_states;

        // Slot 0 of a decl answer block describes the action, followed by
        // the inputs; then come the outputs and, if tabled, the final state
        let first_output = match decl {
            TableIoDecl::Decl => 1 + inputs.len(),
            TableIoDecl::Proc => 0,
        };
        let state_slot = first_output + outputs.len();
        let block_size = state_slot + usize::from(states_tabled && !io_outputs.is_empty());

        let root = self.new_handle_var("T0", TableHandle::MlTrieNode);
        let counter = self.new_var("Counter", builtins::int_type());
        let start = self.new_var("Start", builtins::int_type());
        let in_range = self.call(RuntimePrimitive::TableIoInRange, vec![root, counter, start]);
        let tip = self.new_handle_var("T", TableHandle::MlTrieNode);
        let lookup = self.call(RuntimePrimitive::TableLookupInsertStartInt, vec![root, counter, start, tip]);
        let has_answer = self.call(RuntimePrimitive::TableIoHasAnswer, vec![tip]);

        // Replay
        let block = self.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
        let mut restore = vec![self.call(RuntimePrimitive::TableMemoGetAnswerBlock, vec![tip, block])];
        for (i, &var) in outputs.iter().enumerate() {
            self.restore_answer(block, first_output + i, var, &mut restore);
        }
        for (&io, &io0) in io_outputs.iter().zip(io_inputs.iter().cycle()) {
            if states_tabled {
                let slot = self.int_var("Slot", state_slot, &mut restore);
                restore.push(self.call(RuntimePrimitive::TableRestoreIoStateAnswer, vec![block, slot, io]));
            } else {
                restore.push(assign(io, io0, context));
            }
        }

        // Record
        let mut record = Vec::new();
        let traced = (unitize == TableIoUnitize::Unitize).then(|| {
            let traced = self.new_var("TraceEnabled", builtins::int_type());
            record.push(self.call(RuntimePrimitive::TableIoLeftBracketUnitizedGoal, vec![traced]));
            traced
        });
        record.push(body.clone());
        if let Some(traced) = traced {
            record.push(self.call(RuntimePrimitive::TableIoRightBracketUnitizedGoal, vec![traced]));
        }
        let size = self.int_var("BlockSize", block_size, &mut record);
        let new_block = self.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
        record.push(self.call(RuntimePrimitive::TableMemoCreateAnswerBlock, vec![tip, size, new_block]));
        if decl == TableIoDecl::Decl {
            let entry = self.new_handle_var("TableIoEntry", TableHandle::MlTableIoEntry);
            record.push(construct(entry, ConsId::TableIoEntryConst(self.id), Vec::new(), context));
            let slot = self.int_var("Slot", 0, &mut record);
            record.push(self.call(RuntimePrimitive::TableSaveIoEntryAnswer, vec![new_block, slot, entry]));
            for (i, &var) in inputs.iter().enumerate() {
                self.save_answer(new_block, 1 + i, var, &mut record);
            }
        }
        for (i, &var) in outputs.iter().enumerate() {
            self.save_answer(new_block, first_output + i, var, &mut record);
        }
        if states_tabled {
            for &io in &io_outputs {
                let slot = self.int_var("Slot", state_slot, &mut record);
                record.push(self.call(RuntimePrimitive::TableSaveIoStateAnswer, vec![new_block, slot, io]));
            }
        }

        let tabled = conj(
            vec![
                lookup,
                ite(has_answer, conj(restore, context), conj(record, context), context),
            ],
            context,
        );
        let arg_info = |slot: usize, var: ProgVar| TableArgInfo {
            var,
            slot,
            ty: self.var_type(var),
        };
        let input_infos = inputs
            .iter()
            .enumerate()
            .map(|(i, &var)| arg_info(if decl == TableIoDecl::Decl { 1 + i } else { i }, var))
            .collect();
        let output_infos = outputs
            .iter()
            .enumerate()
            .map(|(i, &var)| arg_info(first_output + i, var))
            .collect();

        Transformed {
            body: ite(in_range, tabled, body, context),
            table_info: ProcTableInfo::IoTable {
                decl,
                unitize,
                inputs: input_infos,
                outputs: output_infos,
            },
            call_table_tip: None,
            generator: None,
        }
    }
}
