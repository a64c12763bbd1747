//! Loop checking and memoing.
//!
//! ```text
//! loop_check, det:       lookup, table_loop_setup(T, Status),
//!                        ( Status = loop_inactive, G, table_loop_mark_as_inactive(T)
//!                        ; Status = loop_active, table_error("...") )
//! memo, det:             lookup, table_memo_det_setup(T, Status),
//!                        ( Status = memo_det_inactive, G, save answer
//!                        ; Status = memo_det_succeeded, restore answer
//!                        ; Status = memo_det_active, table_error("...") )
//! ```
//!
//! The semidet and nondet variants differ in how the inactive arm records
//! failure and further solutions.

use super::{CodeModel, TabledArgs, Transformed, info::TableInfo, trie::CallTableLookup};
use crate::middle::{
    diag::internal_error,
    hlds::{
        builtins::{
            LoopStatus, MemoDetStatus, MemoNonStatus, MemoSemiStatus, RuntimePrimitive, TableHandle, TableStatus,
        },
        goal::{Case, Determinism, Goal},
        goal_util::{conj, disj, fail_goal, ite, switch, true_goal},
        id::ProgVar,
        table::{ProcTableInfo, TableAttributes},
    },
};

pub const INFINITE_RECURSION: &str = "detected infinite recursion";
pub const NEED_MINIMAL_MODEL: &str = "detected need for minimal model";

impl TableInfo<'_> {
    /// `switch Status { ... }` with one arm per constructor of the status
    /// type, in declaration order
    pub fn status_switch<S: TableStatus>(&mut self, status: ProgVar, mut arm: impl FnMut(&mut Self, S) -> Goal) -> Goal {
        let cases = S::iter()
            .map(|constant| Case {
                cons_id: constant.cons_id(),
                goal: arm(self, constant),
            })
            .collect();
        switch(status, cases, false, self.context)
    }

    pub fn new_status_var<S: TableStatus>(&mut self) -> ProgVar {
        self.new_var("Status", S::status_type())
    }

    /// Moves the original body into the one arm that runs it
    pub fn take_body(&self, body: &mut Option<Goal>) -> Goal {
        match body.take() {
            Some(goal) => goal,
            None => internal_error!(self.pred_desc(), "original body placed in two arms"),
        }
    }

    pub fn call_table_info(&self, lookup: CallTableLookup, outputs: &[ProgVar]) -> ProcTableInfo {
        ProcTableInfo::CallTable {
            steps: lookup.steps,
            inputs: lookup.inputs,
            outputs: self.output_arg_infos(outputs),
        }
    }

    pub fn loop_check(
        &mut self,
        body: Goal,
        determinism: Determinism,
        args: &TabledArgs,
        attributes: &TableAttributes,
    ) -> Transformed {
        let mut lookup = self.call_table_lookup(&args.inputs, attributes);
        let tip = lookup.tip;
        let mut goals = std::mem::take(&mut lookup.goals);

        let status = self.new_status_var::<LoopStatus>();
        goals.push(self.call(RuntimePrimitive::TableLoopSetup, vec![tip, status]));

        let mut body = Some(body);
        let model = CodeModel::of(determinism);
        goals.push(self.status_switch(status, |info, constant| match constant {
            LoopStatus::Inactive => {
                let body = info.take_body(&mut body);
                info.loop_inactive(body, model, tip)
            }
            LoopStatus::Active => info.table_error(INFINITE_RECURSION),
        }));

        Transformed {
            body: conj(goals, self.context),
            table_info: self.call_table_info(lookup, &args.outputs),
            call_table_tip: Some(tip),
            generator: None,
        }
    }

    /// The call is running from here on, and must be marked inactive again on
    /// every way out of `body`
    fn loop_inactive(&mut self, body: Goal, model: CodeModel, tip: ProgVar) -> Goal {
        let context = self.context;
        let mark_inactive = self.call(RuntimePrimitive::TableLoopMarkAsInactive, vec![tip]);
        let mark_inactive_and_fail = self.call(RuntimePrimitive::TableLoopMarkAsInactiveAndFail, vec![tip]);

        match model {
            CodeModel::Det => conj(vec![body, mark_inactive], context),
            CodeModel::Semi => ite(body, mark_inactive, mark_inactive_and_fail, context),
            CodeModel::Non => {
                // On backtracking into a solution the call is active again
                let mark_active_and_fail = self.call(RuntimePrimitive::TableLoopMarkAsActiveAndFail, vec![tip]);
                disj(
                    vec![
                        conj(vec![body, disj(vec![mark_inactive, mark_active_and_fail], context)], context),
                        mark_inactive_and_fail,
                    ],
                    context,
                )
            }
        }
    }

    pub fn memo(
        &mut self,
        body: Goal,
        determinism: Determinism,
        args: &TabledArgs,
        attributes: &TableAttributes,
    ) -> Transformed {
        let mut lookup = self.call_table_lookup(&args.inputs, attributes);
        let tip = lookup.tip;
        let mut goals = std::mem::take(&mut lookup.goals);

        let outputs = &args.outputs;
        let switch = match CodeModel::of(determinism) {
            CodeModel::Det => self.memo_det(body, tip, outputs, &mut goals),
            CodeModel::Semi => self.memo_semi(body, tip, outputs, &mut goals),
            CodeModel::Non => self.memo_non(body, determinism, tip, outputs, &mut goals),
        };
        goals.push(switch);

        Transformed {
            body: conj(goals, self.context),
            table_info: self.call_table_info(lookup, outputs),
            call_table_tip: Some(tip),
            generator: None,
        }
    }

    fn memo_det(&mut self, body: Goal, tip: ProgVar, outputs: &[ProgVar], goals: &mut Vec<Goal>) -> Goal {
        let status = self.new_status_var::<MemoDetStatus>();
        goals.push(self.call(RuntimePrimitive::TableMemoDetSetup, vec![tip, status]));

        let mut body = Some(body);
        self.status_switch(status, |info, constant| match constant {
            MemoDetStatus::Inactive => {
                let body = info.take_body(&mut body);
                let save = info.memo_save(tip, outputs);
                conj(vec![body, save], info.context)
            }
            MemoDetStatus::Active => info.table_error(INFINITE_RECURSION),
            MemoDetStatus::Succeeded => info.memo_restore(tip, outputs),
        })
    }

    fn memo_semi(&mut self, body: Goal, tip: ProgVar, outputs: &[ProgVar], goals: &mut Vec<Goal>) -> Goal {
        let status = self.new_status_var::<MemoSemiStatus>();
        goals.push(self.call(RuntimePrimitive::TableMemoSemiSetup, vec![tip, status]));

        let mut body = Some(body);
        self.status_switch(status, |info, constant| match constant {
            MemoSemiStatus::Inactive => {
                let context = info.context;
                let body = info.take_body(&mut body);
                let save = info.memo_save(tip, outputs);
                let mark_failed = info.call(RuntimePrimitive::TableMemoMarkAsFailed, vec![tip]);
                ite(body, save, conj(vec![mark_failed, fail_goal(context)], context), context)
            }
            MemoSemiStatus::Active => info.table_error(INFINITE_RECURSION),
            MemoSemiStatus::Succeeded => info.memo_restore(tip, outputs),
            MemoSemiStatus::Failed => fail_goal(info.context),
        })
    }

    fn memo_non(
        &mut self,
        body: Goal,
        determinism: Determinism,
        tip: ProgVar,
        outputs: &[ProgVar],
        goals: &mut Vec<Goal>,
    ) -> Goal {
        let record = self.new_handle_var("Record", TableHandle::MlMemoNonRecord);
        let status = self.new_status_var::<MemoNonStatus>();
        goals.push(self.call(RuntimePrimitive::TableMemoNonSetup, vec![tip, record, status]));

        let mut body = Some(body);
        self.status_switch(status, |info, constant| match constant {
            MemoNonStatus::Inactive => {
                let context = info.context;
                let body = info.take_body(&mut body);
                let (mut answer, _) = info.new_answer(
                    body,
                    record,
                    outputs,
                    RuntimePrimitive::TableMemoNonGetAnswerTable,
                    RuntimePrimitive::TableMemoNonAnswerIsNotDuplicate,
                    RuntimePrimitive::TableMemoNonCreateAnswerBlock,
                );
                answer.push(info.call(RuntimePrimitive::TableMemoMarkAsIncomplete, vec![record]));

                let complete = info.call(RuntimePrimitive::TableMemoMarkAsCompleteAndFail, vec![record]);
                disj(vec![conj(answer, context), complete], context)
            }
            MemoNonStatus::Active => info.table_error(INFINITE_RECURSION),
            MemoNonStatus::Complete => {
                let prim = if determinism == Determinism::Multi {
                    RuntimePrimitive::TableMemoReturnAllAnswersMulti
                } else {
                    RuntimePrimitive::TableMemoReturnAllAnswersNondet
                };
                let block = info.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
                let mut restore = vec![info.call(prim, vec![record, block])];
                info.restore_answers(block, outputs, &mut restore);
                conj(restore, info.context)
            }
            MemoNonStatus::Incomplete => info.table_error(NEED_MINIMAL_MODEL),
        })
    }

    /// Records the answer of a successful call, or only its success when
    /// there are no outputs
    fn memo_save(&mut self, tip: ProgVar, outputs: &[ProgVar]) -> Goal {
        if outputs.is_empty() {
            return self.call(RuntimePrimitive::TableMemoMarkAsSucceeded, vec![tip]);
        }
        let mut goals = Vec::new();
        self.create_and_save_answer(RuntimePrimitive::TableMemoCreateAnswerBlock, tip, outputs, &mut goals);
        conj(goals, self.context)
    }

    fn memo_restore(&mut self, tip: ProgVar, outputs: &[ProgVar]) -> Goal {
        if outputs.is_empty() {
            return true_goal(self.context);
        }
        let block = self.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
        let mut goals = vec![self.call(RuntimePrimitive::TableMemoGetAnswerBlock, vec![tip, block])];
        self.restore_answers(block, outputs, &mut goals);
        conj(goals, self.context)
    }
}
