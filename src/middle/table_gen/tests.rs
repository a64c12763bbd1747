use super::{CodeModel, fresh_pred_name, process_module};
use crate::{
    frontend::demos,
    index::Index,
    middle::{
        diag::Severity,
        hlds::{
            builtins::{
                LoopStatus, MemoDetStatus, MemoNonStatus, MemoSemiStatus, MmStatus, RuntimePrimitive, TableStatus,
                int_type,
            },
            goal::{ArgMode, ConsId, Determinism, Goal, GoalExpr, Purity, ScopeReason, Switch, Unification, UnifyRhs},
            id::{PredProcId, ProcId},
            module::{ModuleInfo, PredOrigin, ProcInfo},
            table::{
                EvalMethod, MinimalModelMethod, ProcTableInfo, Strictness, TableAttributes,
                TableIoDecl, TableIoUnitize, TableTrieStep,
            },
            types::Type,
        },
        options::{GcMethod, Options, Target},
        polymorphism,
    },
};

fn compile(module_info: &mut ModuleInfo) {
    polymorphism::process_module(module_info);
    process_module(module_info);
}

fn tabled_module(options: Options) -> ModuleInfo {
    let (mut module_info, _) = demos::tabling(options);
    compile(&mut module_info);
    module_info
}

fn io_module(options: Options) -> ModuleInfo {
    let (mut module_info, _) = demos::io_tabling(Options {
        trace_table_io: true,
        ..options
    });
    compile(&mut module_info);
    module_info
}

fn proc_of(module_info: &ModuleInfo, name: &str) -> PredProcId {
    let pred_id = module_info
        .preds
        .enumerate()
        .find_map(|(pred_id, pred)| (pred.name.value() == name).then_some(pred_id))
        .unwrap_or_else(|| panic!("no predicate {name}"));
    PredProcId::new(pred_id, ProcId::new(0))
}

fn goals(goal: &Goal) -> Vec<&Goal> {
    let mut goals = Vec::new();
    goal.walk(&mut |goal| goals.push(goal));
    goals
}

/// Whether `goal` invokes `prim`, as a call or as inline foreign code
fn invokes(module_info: &ModuleInfo, goal: &Goal, prim: RuntimePrimitive) -> bool {
    let callee = module_info.primitive(prim);
    match &goal.expr {
        GoalExpr::PlainCall(call) => call.callee == callee,
        GoalExpr::ForeignProc(foreign) => foreign.callee == callee,
        _ => false,
    }
}

fn count_invocations(module_info: &ModuleInfo, goal: &Goal, prim: RuntimePrimitive) -> usize {
    goals(goal)
        .into_iter()
        .filter(|goal| invokes(module_info, goal, prim))
        .count()
}

fn status_switch(proc_info: &ProcInfo) -> &Switch {
    goals(&proc_info.body)
        .into_iter()
        .find_map(|goal| match &goal.expr {
            GoalExpr::Switch(switch) => Some(switch),
            _ => None,
        })
        .expect("tabled body switches on the call's status")
}

fn arm<'a>(switch: &'a Switch, status: impl TableStatus) -> &'a Goal {
    let cons_id = status.cons_id();
    &switch
        .cases
        .iter()
        .find(|case| case.cons_id == cons_id)
        .expect("status has an arm")
        .goal
}

fn status_cons_ids<S: TableStatus>() -> Vec<ConsId> {
    S::iter().map(S::cons_id).collect()
}

fn string_constants(goal: &Goal) -> Vec<String> {
    goals(goal)
        .into_iter()
        .filter_map(|goal| match &goal.expr {
            GoalExpr::Unify(unify) => match &unify.rhs {
                UnifyRhs::Functor {
                    cons_id: ConsId::String(text),
                    ..
                } => Some(text.value().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn constructs(goal: &Goal, cons_id: &ConsId) -> bool {
    goals(goal).into_iter().any(|goal| {
        matches!(
            &goal.expr,
            GoalExpr::Unify(unify) if matches!(&unify.kind, Unification::Construct { cons_id: c, .. } if c == cons_id)
        )
    })
}

fn call_table(proc_info: &ProcInfo) -> &[TableTrieStep] {
    match &proc_info.table_info {
        Some(ProcTableInfo::CallTable { steps, .. }) => steps,
        other => panic!("expected a call table, found {other:?}"),
    }
}

#[test]
fn loop_check_looks_up_the_call_before_switching_on_its_status() {
    let module_info = tabled_module(Options::default());
    let walk = proc_of(&module_info, "walk");
    let proc_info = module_info.proc(walk);

    let GoalExpr::Scope(ScopeReason::Promise(Purity::Pure), inner) = &proc_info.body.expr else {
        panic!("tabled body is promised pure: {:?}", proc_info.body.expr);
    };
    let GoalExpr::Conj(_, conjuncts) = &inner.expr else {
        panic!("tabled body is a conjunction");
    };
    assert!(constructs(&conjuncts[0], &ConsId::TablingInfoConst(walk)));
    assert!(invokes(&module_info, &conjuncts[1], RuntimePrimitive::TableLookupInsertInt));
    assert!(invokes(&module_info, &conjuncts[2], RuntimePrimitive::TableLoopSetup));
    assert!(matches!(conjuncts[3].expr, GoalExpr::Switch(_)));

    assert_eq!(call_table(proc_info), [TableTrieStep::Int]);
    let GoalExpr::PlainCall(lookup) = &conjuncts[1].expr else {
        unreachable!()
    };
    assert_eq!(proc_info.call_table_tip, Some(lookup.args[2]));
}

#[test]
fn loop_check_arms_follow_the_code_model() {
    let module_info = tabled_module(Options::default());

    let walk = module_info.proc(proc_of(&module_info, "walk"));
    let inactive = arm(status_switch(walk), LoopStatus::Inactive);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableLoopMarkAsInactive), 1);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableLoopMarkAsInactiveAndFail), 0);

    let check = module_info.proc(proc_of(&module_info, "check"));
    let inactive = arm(status_switch(check), LoopStatus::Inactive);
    assert!(matches!(inactive.expr, GoalExpr::IfThenElse(_)));
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableLoopMarkAsInactiveAndFail), 1);

    let explore = module_info.proc(proc_of(&module_info, "explore"));
    let inactive = arm(status_switch(explore), LoopStatus::Inactive);
    let GoalExpr::Disj(disjuncts) = &inactive.expr else {
        panic!("nondet inactive arm is a disjunction");
    };
    assert_eq!(disjuncts.len(), 2);
    assert_eq!(count_invocations(&module_info, &disjuncts[0], RuntimePrimitive::TableLoopMarkAsActiveAndFail), 1);
    assert!(invokes(&module_info, &disjuncts[1], RuntimePrimitive::TableLoopMarkAsInactiveAndFail));

    let active = arm(status_switch(explore), LoopStatus::Active);
    assert_eq!(count_invocations(&module_info, active, RuntimePrimitive::TableError), 1);
    assert_eq!(
        string_constants(active),
        ["detected infinite recursion in predicate `tabled.explore/2`"]
    );
}

#[test]
fn every_status_has_exactly_one_arm() {
    let module_info = tabled_module(Options::default());

    let mut switches = 0;
    for id in module_info.all_procs() {
        let proc_info = module_info.proc(id);
        let expected = match &proc_info.eval_method {
            EvalMethod::LoopCheck(_) => status_cons_ids::<LoopStatus>(),
            EvalMethod::Memo(_) => match CodeModel::of(proc_info.determinism) {
                CodeModel::Det => status_cons_ids::<MemoDetStatus>(),
                CodeModel::Semi => status_cons_ids::<MemoSemiStatus>(),
                CodeModel::Non => status_cons_ids::<MemoNonStatus>(),
            },
            EvalMethod::MinimalModel(MinimalModelMethod::StackCopy, _) => status_cons_ids::<MmStatus>(),
            _ => continue,
        };

        let switch = status_switch(proc_info);
        let arms: Vec<_> = switch.cases.iter().map(|case| case.cons_id.clone()).collect();
        assert_eq!(arms, expected, "{}", module_info.pred(id.pred_id).describe());
        assert!(!switch.can_fail);
        switches += 1;
    }

    assert_eq!(switches, 8);
}

#[test]
fn nondet_memo_checks_answers_for_duplicates() {
    let module_info = tabled_module(Options::default());
    let choose = module_info.proc(proc_of(&module_info, "choose"));
    let switch = status_switch(choose);

    let GoalExpr::Disj(disjuncts) = &arm(switch, MemoNonStatus::Inactive).expr else {
        panic!("inactive arm is a disjunction");
    };
    let GoalExpr::Conj(_, answer) = &disjuncts[0].expr else {
        panic!("first disjunct is a conjunction");
    };
    let order: Vec<_> = [
        RuntimePrimitive::TableMemoNonGetAnswerTable,
        RuntimePrimitive::TableLookupInsertInt,
        RuntimePrimitive::TableMemoNonAnswerIsNotDuplicate,
        RuntimePrimitive::TableMemoNonCreateAnswerBlock,
        RuntimePrimitive::TableSaveIntAnswer,
        RuntimePrimitive::TableMemoMarkAsIncomplete,
    ]
    .into_iter()
    .map(|prim| {
        answer
            .iter()
            .position(|goal| invokes(&module_info, goal, prim))
            .unwrap_or_else(|| panic!("no {prim} in the answer conjunction"))
    })
    .collect();
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "{order:?}");
    // The original body comes first
    assert!(order[0] > 0);
    assert!(invokes(&module_info, &disjuncts[1], RuntimePrimitive::TableMemoMarkAsCompleteAndFail));

    let complete = arm(switch, MemoNonStatus::Complete);
    assert_eq!(count_invocations(&module_info, complete, RuntimePrimitive::TableMemoReturnAllAnswersNondet), 1);
    assert_eq!(count_invocations(&module_info, complete, RuntimePrimitive::TableRestoreIntAnswer), 1);

    assert_eq!(
        string_constants(arm(switch, MemoNonStatus::Incomplete)),
        ["detected need for minimal model in predicate `tabled.choose/2`"]
    );
    assert_eq!(count_invocations(&module_info, arm(switch, MemoNonStatus::Active), RuntimePrimitive::TableError), 1);
}

#[test]
fn memo_without_outputs_only_records_success() {
    let module_info = tabled_module(Options::default());
    let is_small = module_info.proc(proc_of(&module_info, "is_small"));
    let switch = status_switch(is_small);

    let inactive = arm(switch, MemoSemiStatus::Inactive);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableMemoMarkAsSucceeded), 1);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableMemoMarkAsFailed), 1);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableMemoCreateAnswerBlock), 0);

    let failed = arm(switch, MemoSemiStatus::Failed);
    assert!(matches!(&failed.expr, GoalExpr::Disj(disjuncts) if disjuncts.is_empty()));
    let succeeded = arm(switch, MemoSemiStatus::Succeeded);
    assert!(matches!(&succeeded.expr, GoalExpr::Conj(_, goals) if goals.is_empty()));
}

#[test]
fn det_memo_saves_and_restores_its_answer() {
    let module_info = tabled_module(Options::default());
    let fib = module_info.proc(proc_of(&module_info, "fib"));
    let switch = status_switch(fib);

    let inactive = arm(switch, MemoDetStatus::Inactive);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableMemoCreateAnswerBlock), 1);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableSaveIntAnswer), 1);
    let succeeded = arm(switch, MemoDetStatus::Succeeded);
    assert_eq!(count_invocations(&module_info, succeeded, RuntimePrimitive::TableMemoGetAnswerBlock), 1);
    assert_eq!(count_invocations(&module_info, succeeded, RuntimePrimitive::TableRestoreIntAnswer), 1);

    match &fib.table_info {
        Some(ProcTableInfo::CallTable { inputs, outputs, .. }) => {
            assert_eq!(inputs.len(), 1);
            assert_eq!(outputs.len(), 1);
            assert_eq!(outputs[0].var, fib.head_vars[1]);
            assert_eq!(outputs[0].ty, int_type());
        }
        other => panic!("expected a call table, found {other:?}"),
    }
}

#[test]
fn polymorphic_inputs_are_looked_up_through_their_type_info() {
    let module_info = tabled_module(Options::default());
    let size = module_info.proc(proc_of(&module_info, "size"));
    let type_info = size.head_vars[0];

    let steps = call_table(size);
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0], TableTrieStep::TypeInfo);
    assert!(matches!(
        &steps[1],
        TableTrieStep::General {
            ty: Type::Variable(_),
            is_poly: true,
            by_addr: false
        }
    ));

    let poly_lookup = goals(&size.body)
        .into_iter()
        .find_map(|goal| match &goal.expr {
            GoalExpr::PlainCall(call) if call.callee == module_info.primitive(RuntimePrimitive::TableLookupInsertPoly) => {
                Some(call.args.clone())
            }
            _ => None,
        })
        .expect("polymorphic lookup");
    assert_eq!(poly_lookup[0], type_info);
    assert_eq!(poly_lookup[2], size.head_vars[1]);
}

#[test]
fn strictness_selects_the_lookup_of_each_input() {
    let (mut module_info, id) = demos::table_strictness(Options::default());
    compile(&mut module_info);

    let proc_info = module_info.proc(id);
    assert_eq!(
        call_table(proc_info),
        [
            TableTrieStep::PromiseImplied,
            TableTrieStep::General {
                ty: Type::Tuple(vec![int_type(), int_type()]),
                is_poly: false,
                by_addr: true
            }
        ]
    );
    assert_eq!(count_invocations(&module_info, &proc_info.body, RuntimePrimitive::TableLookupInsertString), 0);
    assert_eq!(count_invocations(&module_info, &proc_info.body, RuntimePrimitive::TableLookupInsertUserAddr), 1);
}

#[test]
fn equivalence_types_are_looked_up_as_their_expansion() {
    let (mut module_info, _) = demos::table_strictness(Options::default());
    compile(&mut module_info);

    let tally = module_info.proc(proc_of(&module_info, "tally"));
    assert_eq!(
        tally.eval_method,
        EvalMethod::Memo(TableAttributes {
            strictness: Strictness::AllFastLoose
        })
    );
    // Integers are always tabled by value, whatever the strictness
    assert_eq!(call_table(tally), [TableTrieStep::Int]);
    assert_eq!(count_invocations(&module_info, &tally.body, RuntimePrimitive::TableLookupInsertInt), 1);

    let unify = module_info.proc(proc_of(&module_info, "__Unify__"));
    assert!(unify.table_info.is_none());
    assert_eq!(module_info.num_errors, 0);
}

#[test]
fn stack_copy_consumers_suspend_on_active_subgoals() {
    let module_info = tabled_module(Options::default());
    let path = module_info.proc(proc_of(&module_info, "path"));
    let switch = status_switch(path);

    let inactive = arm(switch, MmStatus::Inactive);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableMmAnswerIsNotDuplicate), 1);
    assert_eq!(count_invocations(&module_info, inactive, RuntimePrimitive::TableMmCompletion), 1);
    let active = arm(switch, MmStatus::Active);
    assert_eq!(count_invocations(&module_info, active, RuntimePrimitive::TableMmSuspendConsumer), 1);
    let complete = arm(switch, MmStatus::Complete);
    assert_eq!(count_invocations(&module_info, complete, RuntimePrimitive::TableMmReturnAllNondet), 1);
}

#[test]
fn own_stacks_clones_a_generator_taking_only_outputs() {
    let module_info = tabled_module(Options::default());
    let reach_id = proc_of(&module_info, "reach");
    let generator_id = proc_of(&module_info, "GeneratorFor_reach");
    let reach = module_info.proc(reach_id);
    let generator_pred = module_info.pred(generator_id.pred_id);
    let generator = module_info.proc(generator_id);

    assert_eq!(generator_pred.origin, PredOrigin::CreatedForTabling);
    assert_eq!(generator.head_vars, [reach.head_vars[1]]);
    assert_eq!(generator.arg_modes, [ArgMode::Out]);
    assert_eq!(generator.determinism, Determinism::Nondet);
    assert_eq!(generator_pred.arg_types, [int_type()]);

    assert!(constructs(&reach.body, &ConsId::Closure(generator_id)));
    assert_eq!(count_invocations(&module_info, &reach.body, RuntimePrimitive::TableMmosConsumeNextAnswerNondet), 1);
    // The consumer never runs the original body
    assert_eq!(count_invocations(&module_info, &reach.body, RuntimePrimitive::TableMmosReturnAnswer), 0);

    let pickup = goals(&generator.body)
        .into_iter()
        .find_map(|goal| match &goal.expr {
            GoalExpr::ForeignProc(foreign)
                if foreign.callee == module_info.primitive(RuntimePrimitive::TableMmosPickupInputs) =>
            {
                Some(foreign)
            }
            _ => None,
        })
        .expect("generator picks up its inputs");
    assert_eq!(pickup.extra_args.len(), 1);
    assert_eq!(pickup.extra_args[0].var, reach.head_vars[0]);
    assert_eq!(pickup.extra_args[0].mode, ArgMode::Out);
    assert_eq!(count_invocations(&module_info, &generator.body, RuntimePrimitive::TableMmosReturnAnswer), 1);
    assert_eq!(count_invocations(&module_info, &generator.body, RuntimePrimitive::TableMmosCompletion), 1);
}

#[test]
fn clone_names_avoid_existing_predicates() {
    let module_info = tabled_module(Options::default());

    assert_eq!(fresh_pred_name(&module_info, "GeneratorFor_path"), "GeneratorFor_path");
    assert_eq!(fresh_pred_name(&module_info, "walk"), "walk_2");
    assert_eq!(fresh_pred_name(&module_info, "GeneratorFor_reach"), "GeneratorFor_reach_2");
}

#[test]
fn unsupported_targets_downgrade_tabling_to_a_warning() {
    for options in [
        Options {
            target: Target::Java,
            ..Options::default()
        },
        Options {
            gc: GcMethod::Accurate,
            ..Options::default()
        },
    ] {
        let module_info = tabled_module(options);

        assert_eq!(module_info.num_errors, 0);
        assert_eq!(module_info.diagnostics.len(), 9);
        assert!(module_info
            .diagnostics
            .iter()
            .all(|diagnostic| diagnostic.severity == Severity::Warning));
        for id in module_info.all_procs() {
            let proc_info = module_info.proc(id);
            assert_eq!(proc_info.eval_method, EvalMethod::Normal);
            assert!(proc_info.table_info.is_none());
        }
    }

    let module_info = tabled_module(Options {
        target: Target::Java,
        ..Options::default()
    });
    assert_eq!(
        module_info.diagnostics[0].message,
        "`pragma loop_check(all_strict)` ignored: tabling is not supported when targeting java"
    );
}

#[test]
fn primitives_become_foreign_code_when_requested() {
    let module_info = tabled_module(Options {
        tabling_via_extra_args: true,
        ..Options::default()
    });
    let fib = module_info.proc(proc_of(&module_info, "fib"));

    let codes: Vec<_> = goals(&fib.body)
        .into_iter()
        .filter_map(|goal| match &goal.expr {
            GoalExpr::ForeignProc(foreign) => Some(foreign.code.clone()),
            _ => None,
        })
        .collect();
    assert!(codes.iter().any(|code| code.starts_with("MR_tbl_lookup_insert_int(")));
    assert!(codes.iter().any(|code| code.starts_with("MR_tbl_memo_det_setup(")));
    assert!(!goals(&fib.body).into_iter().any(|goal| matches!(
        &goal.expr,
        GoalExpr::PlainCall(call) if call.callee == module_info.primitive(RuntimePrimitive::TableMemoDetSetup)
    )));
}

#[test]
fn io_primitives_are_tabled_by_their_annotation() {
    let module_info = io_module(Options::default());
    let method = |name| module_info.proc(proc_of(&module_info, name)).eval_method.clone();

    assert_eq!(method("write_int"), EvalMethod::TableIo(TableIoDecl::Proc, TableIoUnitize::Alone));
    assert_eq!(method("read_line"), EvalMethod::TableIo(TableIoDecl::Decl, TableIoUnitize::Unitize));
    assert_eq!(method("write_char"), EvalMethod::TableIo(TableIoDecl::Proc, TableIoUnitize::Alone));
    for name in ["flush", "log_child", "unmarked", "main"] {
        assert_eq!(method(name), EvalMethod::Normal, "{name}");
    }
    assert!(module_info.diagnostics.is_empty());
}

#[test]
fn io_tabling_needs_trace_table_io() {
    let (mut module_info, write_int) = demos::io_tabling(Options::default());
    compile(&mut module_info);

    assert_eq!(module_info.proc(write_int).eval_method, EvalMethod::Normal);
    assert!(matches!(module_info.proc(write_int).body.expr, GoalExpr::ForeignProc(_)));
}

#[test]
fn missing_io_annotations_are_errors_when_required() {
    let module_info = io_module(Options {
        trace_table_io_require: true,
        ..Options::default()
    });

    assert_eq!(module_info.num_errors, 2);
    let preds: Vec<_> = module_info
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.pred.clone().unwrap_or_default())
        .collect();
    assert_eq!(preds, ["predicate `io_prims.flush/2`", "predicate `io_prims.unmarked/2`"]);
    assert!(module_info.diagnostics[0].message.contains("missing `tabled_for_io` annotation"));
}

#[test]
fn decl_tables_describe_the_action() {
    let module_info = io_module(Options {
        trace_table_io_all: true,
        ..Options::default()
    });
    let id = proc_of(&module_info, "write_int");
    let write_int = module_info.proc(id);

    assert_eq!(write_int.eval_method, EvalMethod::TableIo(TableIoDecl::Decl, TableIoUnitize::Alone));
    assert!(constructs(&write_int.body, &ConsId::TableIoEntryConst(id)));
    assert_eq!(count_invocations(&module_info, &write_int.body, RuntimePrimitive::TableSaveIoEntryAnswer), 1);
    // The input is saved for the debugger after the entry
    assert_eq!(count_invocations(&module_info, &write_int.body, RuntimePrimitive::TableSaveIntAnswer), 1);
    match &write_int.table_info {
        Some(ProcTableInfo::IoTable { decl, inputs, outputs, .. }) => {
            assert_eq!(*decl, TableIoDecl::Decl);
            assert_eq!(inputs.len(), 1);
            assert_eq!(inputs[0].slot, 1);
            assert!(outputs.is_empty());
        }
        other => panic!("expected an I/O table, found {other:?}"),
    }

    let only_retry = io_module(Options {
        trace_table_io_all: true,
        trace_table_io_only_retry: true,
        ..Options::default()
    });
    assert_eq!(
        only_retry.proc(proc_of(&only_retry, "write_int")).eval_method,
        EvalMethod::TableIo(TableIoDecl::Proc, TableIoUnitize::Alone)
    );
}

#[test]
fn io_answers_replay_outputs_and_pass_the_state_through() {
    let module_info = io_module(Options::default());
    let read_line = module_info.proc(proc_of(&module_info, "read_line"));

    let GoalExpr::Scope(_, inner) = &read_line.body.expr else {
        panic!("tabled body is promised pure");
    };
    let GoalExpr::IfThenElse(window) = &inner.expr else {
        panic!("tabled body checks the I/O window");
    };
    assert!(invokes(&module_info, &window.cond, RuntimePrimitive::TableIoInRange));
    assert!(matches!(window.else_.expr, GoalExpr::ForeignProc(_)));

    let body = &window.then;
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableLookupInsertStartInt), 1);
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableIoHasAnswer), 1);
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableRestoreStringAnswer), 1);
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableSaveStringAnswer), 1);
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableIoLeftBracketUnitizedGoal), 1);
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableIoRightBracketUnitizedGoal), 1);
    assert_eq!(count_invocations(&module_info, body, RuntimePrimitive::TableRestoreIoStateAnswer), 0);

    let [_, io0, io] = read_line.head_vars[..] else {
        panic!("read_line has three arguments");
    };
    assert!(goals(body).into_iter().any(|goal| matches!(
        &goal.expr,
        GoalExpr::Unify(unify) if matches!(unify.kind, Unification::Assign { to, from } if to == io && from == io0)
    )));
    assert_eq!(read_line.call_table_tip, None);
}

#[test]
fn io_states_are_saved_when_requested() {
    let module_info = io_module(Options {
        trace_table_io_states: true,
        ..Options::default()
    });
    let write_int = module_info.proc(proc_of(&module_info, "write_int"));

    assert_eq!(count_invocations(&module_info, &write_int.body, RuntimePrimitive::TableSaveIoStateAnswer), 1);
    assert_eq!(count_invocations(&module_info, &write_int.body, RuntimePrimitive::TableRestoreIoStateAnswer), 1);
    assert!(!goals(&write_int.body).into_iter().any(|goal| matches!(
        &goal.expr,
        GoalExpr::Unify(unify) if matches!(unify.kind, Unification::Assign { .. })
    )));
}

#[test]
fn no_inline_primitives_are_outlined_before_tabling() {
    let module_info = io_module(Options::default());
    let write_char = module_info.proc(proc_of(&module_info, "write_char"));
    let outlined_id = proc_of(&module_info, "OutlinedForIOTablingFrom_write_char");
    let outlined = module_info.proc(outlined_id);

    let GoalExpr::ForeignProc(foreign) = &outlined.body.expr else {
        panic!("outlined predicate keeps the foreign code");
    };
    assert_eq!(foreign.callee, outlined_id);
    assert_eq!(outlined.eval_method, EvalMethod::Normal);
    assert_eq!(module_info.pred(outlined_id.pred_id).origin, PredOrigin::CreatedForTabling);

    let calls = goals(&write_char.body)
        .into_iter()
        .filter(|goal| matches!(&goal.expr, GoalExpr::PlainCall(call) if call.callee == outlined_id))
        .count();
    // Once when recording the action, once outside the window
    assert_eq!(calls, 2);
    assert!(!goals(&write_char.body)
        .into_iter()
        .any(|goal| matches!(goal.expr, GoalExpr::ForeignProc(_))));
}
