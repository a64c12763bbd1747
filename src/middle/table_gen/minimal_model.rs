//! Minimal model tabling.
//!
//! With stack copying the first call of a subgoal runs `G` as its generator
//! and later calls suspend as consumers until the generator has found all
//! answers. With own stacks the generator is a separate predicate run by the
//! runtime on a stack of its own; the procedure itself only registers as a
//! consumer of it and pulls answers one at a time.

use super::{ProcClone, TabledArgs, Transformed, info::TableInfo};
use crate::{
    index::Index,
    middle::hlds::{
        builtins::{self, MmStatus, RuntimePrimitive, TableHandle},
        goal::{ArgMode, ConsId, Determinism, Goal},
        goal_util::{conj, construct, disj, fail_goal, string_const},
        id::{PredProcId, ProcId, ProgVar},
        table::TableAttributes,
        types::{PredOrFunc, Type},
    },
};

impl TableInfo<'_> {
    pub fn minimal_model_stack_copy(
        &mut self,
        body: Goal,
        args: &TabledArgs,
        attributes: &TableAttributes,
    ) -> Transformed {
        let mut lookup = self.call_table_lookup(&args.inputs, attributes);
        let tip = lookup.tip;
        let mut goals = std::mem::take(&mut lookup.goals);
        let outputs = &args.outputs;

        let subgoal = self.new_handle_var("Subgoal", TableHandle::MlSubgoal);
        let status = self.new_status_var::<MmStatus>();
        goals.push(self.call(RuntimePrimitive::TableMmSetup, vec![tip, subgoal, status]));

        let mut body = Some(body);
        goals.push(self.status_switch(status, |info, constant| match constant {
            MmStatus::Inactive => {
                let context = info.context;
                let body = info.take_body(&mut body);
                let (answer, _) = info.new_answer(
                    body,
                    subgoal,
                    outputs,
                    RuntimePrimitive::TableMmGetAnswerTable,
                    RuntimePrimitive::TableMmAnswerIsNotDuplicate,
                    RuntimePrimitive::TableMmCreateAnswerBlock,
                );
                let completion = conj(
                    vec![
                        info.call(RuntimePrimitive::TableMmCompletion, vec![subgoal]),
                        fail_goal(context),
                    ],
                    context,
                );
                disj(vec![conj(answer, context), completion], context)
            }
            MmStatus::Active => info.return_answers(RuntimePrimitive::TableMmSuspendConsumer, subgoal, outputs),
            MmStatus::Complete => info.return_answers(RuntimePrimitive::TableMmReturnAllNondet, subgoal, outputs),
        }));

        Transformed {
            body: conj(goals, self.context),
            table_info: self.call_table_info(lookup, outputs),
            call_table_tip: Some(tip),
            generator: None,
        }
    }

    pub fn minimal_model_own_stacks(&mut self, body: Goal, args: &TabledArgs, attributes: &TableAttributes) -> Transformed {
        let context = self.context;
        let mut lookup = self.call_table_lookup(&args.inputs, attributes);
        let tip = lookup.tip;
        let mut goals = std::mem::take(&mut lookup.goals);
        let outputs = &args.outputs;

        let inputs_in = args.inputs.iter().map(|var| self.foreign_arg(*var, ArgMode::In)).collect();
        goals.push(self.call_with_extra_args(RuntimePrimitive::TableMmosSaveInputs, Vec::new(), inputs_in));

        let pred = self.module_info().pred(self.pred_id());
        let generator_id = PredProcId::new(self.module_info().preds.next_index(), ProcId::new(0));
        let name = self.new_var("Name", builtins::string_type());
        goals.push(string_const(name, &format!("{}/{}", pred.sym_name(), pred.orig_arity), context));
        let closure_type = Type::HigherOrder {
            pred_or_func: PredOrFunc::Predicate,
            args: Vec::new(),
        };
        let closure = self.new_var("GeneratorClosure", closure_type);
        goals.push(construct(closure, ConsId::Closure(generator_id), Vec::new(), context));

        let consumer = self.new_handle_var("Consumer", TableHandle::MlConsumer);
        goals.push(self.call(RuntimePrimitive::TableMmosSetupConsumer, vec![tip, closure, name, consumer]));
        let block = self.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
        goals.push(self.call(RuntimePrimitive::TableMmosConsumeNextAnswerNondet, vec![consumer, block]));
        self.restore_answers(block, outputs, &mut goals);

        let generator = self.own_stacks_generator(body, args, &pred.name.to_string());
        Transformed {
            body: conj(goals, context),
            table_info: self.call_table_info(lookup, outputs),
            call_table_tip: Some(tip),
            generator: Some(generator),
        }
    }

    /// The procedure producing the answers of an own-stacks table. It only
    /// has the outputs as arguments; the inputs are picked up from the
    /// runtime, which saved them when the consumer was set up.
    fn own_stacks_generator(&mut self, body: Goal, args: &TabledArgs, pred_name: &str) -> ProcClone {
        let context = self.context;
        let outputs = &args.outputs;
        let generator = self.new_handle_var("Generator", TableHandle::MlGenerator);
        let inputs_out = args.inputs.iter().map(|var| self.foreign_arg(*var, ArgMode::Out)).collect();
        let pickup = self.call_with_extra_args(RuntimePrimitive::TableMmosPickupInputs, vec![generator], inputs_out);

        let (mut answer, block) = self.new_answer(
            body,
            generator,
            outputs,
            RuntimePrimitive::TableMmosGetAnswerTable,
            RuntimePrimitive::TableMmosAnswerIsNotDuplicate,
            RuntimePrimitive::TableMmosCreateAnswerBlock,
        );
        answer.push(self.call(RuntimePrimitive::TableMmosReturnAnswer, vec![generator, block]));
        let completion = self.call(RuntimePrimitive::TableMmosCompletion, vec![generator]);

        ProcClone {
            name: format!("GeneratorFor_{pred_name}"),
            head_vars: outputs.clone(),
            arg_modes: vec![ArgMode::Out; outputs.len()],
            determinism: Determinism::Nondet,
            body: conj(vec![pickup, disj(vec![conj(answer, context), completion], context)], context),
        }
    }

    /// `G`, then the duplicate check of its answer against the answer table
    /// of `owner`, then the answer saved in a new block, which is returned
    /// with the goals
    pub(super) fn new_answer(
        &mut self,
        body: Goal,
        owner: ProgVar,
        outputs: &[ProgVar],
        get_answer_table: RuntimePrimitive,
        is_not_duplicate: RuntimePrimitive,
        create_answer_block: RuntimePrimitive,
    ) -> (Vec<Goal>, ProgVar) {
        let mut answer = vec![body];
        let answer_table = self.new_handle_var("AT0", TableHandle::MlTrieNode);
        answer.push(self.call(get_answer_table, vec![owner, answer_table]));
        let node = self.answer_table_lookup(answer_table, outputs, &mut answer);
        answer.push(self.call(is_not_duplicate, vec![node]));
        let block = self.create_and_save_answer(create_answer_block, owner, outputs, &mut answer);
        (answer, block)
    }

    /// Every answer of `owner`, as it is returned by `prim`
    fn return_answers(&mut self, prim: RuntimePrimitive, owner: ProgVar, outputs: &[ProgVar]) -> Goal {
        let block = self.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
        let mut goals = vec![self.call(prim, vec![owner, block])];
        self.restore_answers(block, outputs, &mut goals);
        conj(goals, self.context)
    }
}
