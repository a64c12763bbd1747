use proptest::prelude::*;

use super::{info::PolyInfo, process_module};
use crate::{
    frontend::{builder::ModuleBuilder, demos},
    index::Index,
    middle::{
        hlds::{
            builtins::{self, RuntimePrimitive, int_type},
            class::{ClassConstraint, ConstraintProof},
            goal::{ArgMode, ConsId, GenericCallKind, Goal, GoalExpr, RttiTypeCtor, ScopeReason, Unification, UnifyRhs},
            goal_util::{int_const, true_goal},
            id::{PredProcId, ProcId, ProgVar, TypeVar},
            module::{ImportStatus, ModuleInfo, PredOrigin, ProcInfo, SpecialPredKind, TypeInfoLocn},
            pretty_print::proc_to_string,
            types::{Type, TypeCtor, TypeVarSet},
        },
        options::Options,
    },
};

fn proc_of(module_info: &ModuleInfo, name: &str, arity: usize) -> PredProcId {
    let pred_id = module_info
        .preds
        .enumerate()
        .find_map(|(pred_id, pred)| (pred.name.value() == name && pred.orig_arity == arity).then_some(pred_id))
        .unwrap_or_else(|| panic!("no predicate {name}/{arity}"));
    PredProcId::new(pred_id, ProcId::new(0))
}

fn int_ctor() -> TypeCtor {
    let Type::Defined(ctor, _) = int_type() else {
        unreachable!()
    };
    ctor
}

fn tvar_named(tvarset: &TypeVarSet, name: &str) -> TypeVar {
    (0..tvarset.len())
        .map(TypeVar::new)
        .find(|tvar| tvarset.name(*tvar).is_some_and(|n| n.value() == name))
        .unwrap_or_else(|| panic!("no type variable {name}"))
}

fn goals(proc_info: &ProcInfo) -> Vec<&Goal> {
    let mut goals = Vec::new();
    proc_info.body.walk(&mut |goal| goals.push(goal));
    goals
}

/// Arguments of every call of `callee` in the procedure
fn call_args(module_info: &ModuleInfo, proc_info: &ProcInfo, callee: &str) -> Vec<Vec<ProgVar>> {
    goals(proc_info)
        .into_iter()
        .filter_map(|goal| match &goal.expr {
            GoalExpr::PlainCall(call) if module_info.pred(call.callee.pred_id).name.value() == callee => {
                Some(call.args.clone())
            }
            _ => None,
        })
        .collect()
}

/// The construction binding `var`, as functor and arguments
fn construction_of(proc_info: &ProcInfo, var: ProgVar) -> Option<(ConsId, Vec<ProgVar>)> {
    goals(proc_info).into_iter().find_map(|goal| match &goal.expr {
        GoalExpr::Unify(unify) => match &unify.kind {
            Unification::Construct { var: bound, cons_id, args } if *bound == var => {
                Some((cons_id.clone(), args.clone()))
            }
            _ => None,
        },
        _ => None,
    })
}

fn count_goals(proc_info: &ProcInfo, pred: impl Fn(&Goal) -> bool) -> usize {
    goals(proc_info).into_iter().filter(|goal| pred(goal)).count()
}

fn is_typeclass_info_cell(goal: &Goal) -> bool {
    matches!(
        &goal.expr,
        GoalExpr::Unify(unify) if matches!(
            unify.kind,
            Unification::Construct { cons_id: ConsId::TypeclassInfoCell, .. }
        )
    )
}

fn is_call_of(module_info: &ModuleInfo, prim: RuntimePrimitive) -> impl Fn(&Goal) -> bool + '_ {
    move |goal: &Goal| matches!(&goal.expr, GoalExpr::PlainCall(call) if call.callee == module_info.primitive(prim))
}

fn assert_arg_types_match_heads(module_info: &ModuleInfo) {
    for pred in module_info.preds.iter() {
        for proc_info in pred.procs.iter() {
            assert_eq!(
                pred.arg_types.len(),
                proc_info.head_vars.len(),
                "{} has mismatched argument types",
                pred.describe()
            );
            assert_eq!(proc_info.head_vars.len(), proc_info.arg_modes.len());
        }
    }
}

#[test]
fn forwards_received_witness_and_builds_instance_witness() {
    let (mut module_info, p) = demos::constraint_forwarding(Options::default());
    process_module(&mut module_info);

    let proc_info = module_info.proc(p);
    let foo_witness = proc_info.head_vars[0];
    assert_eq!(proc_info.var_table.ty(foo_witness), &builtins::typeclass_info_type());
    assert_eq!(proc_info.arg_modes[0], ArgMode::In);

    let q_calls = call_args(&module_info, proc_info, "q");
    assert_eq!(q_calls.len(), 1);
    let q_args = &q_calls[0];
    assert_eq!(q_args.len(), 4);
    assert_ne!(q_args[0], foo_witness);
    assert!(
        proc_info
            .var_table
            .source_name(q_args[2])
            .is_some_and(|name| name.value() == "Xs")
    );

    let (cons_id, cell_args) = construction_of(proc_info, q_args[1]).expect("bar witness is built");
    assert_eq!(cons_id, ConsId::TypeclassInfoCell);
    let (base, _) = construction_of(proc_info, cell_args[0]).expect("base typeclass-info is built");
    let ConsId::BaseTypeclassInfoConst {
        class_id, instance_num, ..
    } = base
    else {
        panic!("expected a base typeclass-info, got {base:?}");
    };
    assert_eq!(class_id.name.name.value(), "bar");
    assert_eq!(instance_num, 0);
    // base, then the type-info of int
    assert_eq!(cell_args.len(), 2);
    assert_eq!(
        construction_of(proc_info, cell_args[1]).map(|(cons_id, _)| cons_id),
        Some(ConsId::TypeCtorInfoConst(RttiTypeCtor::Defined(int_ctor())))
    );
}

#[test]
fn instance_witness_for_a_list_reuses_the_head_witness() {
    let (mut module_info, p) = demos::constraint_forwarding(Options::default());
    process_module(&mut module_info);

    let proc_info = module_info.proc(p);
    let foo_witness = proc_info.head_vars[0];
    let q_args = &call_args(&module_info, proc_info, "q")[0];

    let (cons_id, cell_args) = construction_of(proc_info, q_args[0]).expect("foo(list(T)) witness is built");
    assert_eq!(cons_id, ConsId::TypeclassInfoCell);
    let (base, _) = construction_of(proc_info, cell_args[0]).expect("base typeclass-info is built");
    assert!(matches!(base, ConsId::BaseTypeclassInfoConst { instance_num: 1, .. }));
    // base, the witness of foo(T), the type-info of list(T)
    assert_eq!(cell_args.len(), 3);
    assert_eq!(cell_args[1], foo_witness);
    assert!(construction_of(proc_info, foo_witness).is_none());

    // foo(list(T)) and bar(int) are the only witnesses built
    assert_eq!(count_goals(proc_info, is_typeclass_info_cell), 2);

    let (list_type_info, list_args) = construction_of(proc_info, cell_args[2]).expect("list type-info");
    assert!(matches!(list_type_info, ConsId::TypeInfoCell(RttiTypeCtor::Defined(_))));
    assert_eq!(list_args.len(), 2);
    assert!(count_goals(proc_info, is_call_of(&module_info, RuntimePrimitive::TypeInfoFromTypeclassInfo)) >= 1);
}

#[test]
fn unconstrained_callee_variable_gets_a_type_info() {
    let (mut module_info, p) = demos::constraint_forwarding(Options::default());
    process_module(&mut module_info);

    let proc_info = module_info.proc(p);
    let r_calls = call_args(&module_info, proc_info, "r");
    assert_eq!(r_calls.len(), 1);
    let r_args = &r_calls[0];

    assert_eq!(r_args.len(), 4);
    assert_eq!(r_args[0], proc_info.head_vars[0]);
    assert_eq!(proc_info.var_table.ty(r_args[1]), &builtins::type_info_type());
    assert_eq!(
        construction_of(proc_info, r_args[1]).map(|(cons_id, args)| (cons_id, args.len())),
        Some((ConsId::TypeCtorInfoConst(RttiTypeCtor::Defined(int_ctor())), 0))
    );
}

#[test]
fn witness_setup_precedes_the_call() {
    let (mut module_info, p) = demos::constraint_forwarding(Options::default());
    process_module(&mut module_info);

    let proc_info = module_info.proc(p);
    let GoalExpr::Conj(_, conjuncts) = &proc_info.body.expr else {
        panic!("body is not a conjunction");
    };
    let q_position = conjuncts
        .iter()
        .position(|goal| matches!(&goal.expr, GoalExpr::PlainCall(call) if call.name.name.value() == "q"))
        .expect("call of q");
    let q_args = &call_args(&module_info, proc_info, "q")[0];
    let cell_position = conjuncts
        .iter()
        .position(|goal| {
            matches!(&goal.expr, GoalExpr::Unify(unify) if matches!(
                unify.kind,
                Unification::Construct { var, .. } if var == q_args[1]
            ))
        })
        .expect("construction of the bar witness");

    assert!(cell_position < q_position);
}

#[test]
fn records_witness_locations_of_constrained_variables() {
    let (mut module_info, p) = demos::constraint_forwarding(Options::default());
    process_module(&mut module_info);

    let pred = module_info.pred(p.pred_id);
    let proc_info = module_info.proc(p);
    let tvar = pred.class_context.universal[0].type_vars()[0];

    assert_eq!(
        proc_info.rtti_varmaps.type_info_locations.get(&tvar),
        Some(&TypeInfoLocn::ViaTypeclassInfo(proc_info.head_vars[0], 1))
    );
    assert_eq!(
        proc_info
            .rtti_varmaps
            .typeclass_info_vars
            .get(&pred.class_context.universal[0]),
        Some(&proc_info.head_vars[0])
    );
}

#[test]
fn instance_with_constraint_nests_witnesses() {
    let (mut module_info, s) = demos::instance_chain(Options::default(), 1);
    process_module(&mut module_info);

    let proc_info = module_info.proc(s);
    let show_args = &call_args(&module_info, proc_info, "show")[0];
    let (cons_id, outer) = construction_of(proc_info, show_args[0]).expect("outer witness");
    assert_eq!(cons_id, ConsId::TypeclassInfoCell);
    // base, the witness of foo(int), the type-info of list(int)
    assert_eq!(outer.len(), 3);

    let (outer_base, _) = construction_of(proc_info, outer[0]).expect("outer base");
    assert!(matches!(outer_base, ConsId::BaseTypeclassInfoConst { instance_num: 1, .. }));

    let (inner_cons_id, inner) = construction_of(proc_info, outer[1]).expect("inner witness");
    assert_eq!(inner_cons_id, ConsId::TypeclassInfoCell);
    let (inner_base, _) = construction_of(proc_info, inner[0]).expect("inner base");
    assert!(matches!(inner_base, ConsId::BaseTypeclassInfoConst { instance_num: 0, .. }));

    let (list_type_info, list_args) = construction_of(proc_info, outer[2]).expect("list type-info");
    assert!(matches!(list_type_info, ConsId::TypeInfoCell(RttiTypeCtor::Defined(_))));
    assert_eq!(list_args.len(), 2);
}

#[test]
fn instance_proof_chain_builds_one_witness_per_level() {
    for depth in 1..=4 {
        let (mut module_info, s) = demos::instance_chain(Options::default(), depth);
        process_module(&mut module_info);

        let proc_info = module_info.proc(s);
        assert_eq!(
            count_goals(proc_info, is_typeclass_info_cell),
            depth + 1,
            "depth {depth}"
        );
    }
}

#[test]
fn superclass_proof_chain_extracts_one_witness_per_level() {
    for depth in 1..=5 {
        let (mut module_info, have) = demos::superclass_chain(Options::default(), depth);
        process_module(&mut module_info);

        let proc_info = module_info.proc(have);
        assert_eq!(
            count_goals(
                proc_info,
                is_call_of(&module_info, RuntimePrimitive::SuperclassFromTypeclassInfo)
            ),
            depth,
            "depth {depth}"
        );
        assert_eq!(count_goals(proc_info, is_typeclass_info_cell), 0);

        let need_args = &call_args(&module_info, proc_info, "need")[0];
        assert_eq!(need_args.len(), 2);
        assert_ne!(need_args[0], proc_info.head_vars[0]);
    }
}

#[test]
fn instance_witness_carries_its_superclass_witnesses() {
    let mut mb = ModuleBuilder::new("ordering", Options::default());
    let eq = mb.add_class("eq", &["T"], &[]);
    let ord = mb.add_class("ord", &["T"], &[("eq", &[0])]);
    let eq_int = mb.simple_instance(vec![int_type()], TypeVarSet::new());
    let eq_int = mb.add_instance(eq, eq_int);
    let mut ord_int = mb.simple_instance(vec![int_type()], TypeVarSet::new());
    ord_int.superclass_proofs.insert(
        ClassConstraint::new(eq.name, vec![int_type()]),
        ConstraintProof::ApplyInstance(eq_int),
    );
    let ord_int = mb.add_instance(ord, ord_int);

    let compare = {
        let mut pb = mb.pred("compare");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        let ord_t = pb.constraint(ord, vec![Type::Variable(t)]);
        pb.universal(ord_t);
        let context = pb.context(1);
        pb.build(true_goal(context))
    };
    let user = {
        let mut pb = mb.pred("user");
        let n = pb.arg("N", int_type(), ArgMode::In);
        let ord_int_constraint = pb.constraint(ord, vec![int_type()]);
        pb.proof(ord_int_constraint, ConstraintProof::ApplyInstance(ord_int));
        let context = pb.context(3);
        let body = pb.call(compare, vec![n], context);
        pb.build(body)
    };
    let mut module_info = mb.finish();
    process_module(&mut module_info);

    let proc_info = module_info.proc(user);
    let compare_args = &call_args(&module_info, proc_info, "compare")[0];
    let (cons_id, cell_args) = construction_of(proc_info, compare_args[0]).expect("ord witness is built");
    assert_eq!(cons_id, ConsId::TypeclassInfoCell);
    // base, the witness of eq(int), the type-info of int
    assert_eq!(cell_args.len(), 3);

    let (base, _) = construction_of(proc_info, cell_args[0]).expect("ord base");
    assert!(matches!(
        base,
        ConsId::BaseTypeclassInfoConst { class_id, instance_num: 0, .. } if class_id == ord
    ));

    let (eq_cons_id, eq_args) = construction_of(proc_info, cell_args[1]).expect("eq witness is built");
    assert_eq!(eq_cons_id, ConsId::TypeclassInfoCell);
    let (eq_base, _) = construction_of(proc_info, eq_args[0]).expect("eq base");
    assert!(matches!(
        eq_base,
        ConsId::BaseTypeclassInfoConst { class_id, instance_num: 0, .. } if class_id == eq
    ));

    assert_eq!(
        construction_of(proc_info, cell_args[2]).map(|(cons_id, _)| cons_id),
        Some(ConsId::TypeCtorInfoConst(RttiTypeCtor::Defined(int_ctor())))
    );
}

#[test]
#[should_panic(expected = "occurs only inside a non-variable argument")]
fn constraint_on_a_list_of_a_type_variable_is_an_internal_error() {
    let mut mb = ModuleBuilder::new("nested", Options::default());
    let foo = mb.add_class("foo", &["T"], &[]);
    {
        let mut pb = mb.pred("elems");
        let t = pb.type_var("T");
        let list_t = Type::defined("list", "list", vec![Type::Variable(t)]);
        pb.arg("Xs", list_t.clone(), ArgMode::In);
        let foo_list_t = pb.constraint(foo, vec![list_t]);
        pb.universal(foo_list_t);
        let context = pb.context(1);
        pb.build(true_goal(context));
    }
    let mut module_info = mb.finish();
    process_module(&mut module_info);
}

#[test]
#[should_panic(expected = "cyclic proof")]
fn cyclic_proofs_are_an_internal_error() {
    let mut mb = ModuleBuilder::new("cycle", Options::default());
    let a = mb.add_class("a", &["T"], &[]);
    let b = mb.add_class("b", &["T"], &[]);

    let need = {
        let mut pb = mb.pred("need");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        let a_t = pb.constraint(a, vec![Type::Variable(t)]);
        pb.universal(a_t);
        let context = pb.context(1);
        pb.build(true_goal(context))
    };
    {
        let mut pb = mb.pred("have");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let a_t = pb.constraint(a, vec![Type::Variable(t)]);
        let b_t = pb.constraint(b, vec![Type::Variable(t)]);
        pb.proof(a_t.clone(), ConstraintProof::Superclass(b_t.clone()))
            .proof(b_t, ConstraintProof::Superclass(a_t));
        let context = pb.context(2);
        let body = pb.call(need, vec![x], context);
        pb.build(body);
    }

    let mut module_info = mb.finish();
    process_module(&mut module_info);
}

#[test]
fn monomorphic_procedures_are_unchanged() {
    let (mut module_info, choose) = demos::tabling(Options::default());
    let before = proc_to_string(&module_info, choose);
    let head_vars = module_info.proc(choose).head_vars.clone();

    process_module(&mut module_info);

    assert_eq!(proc_to_string(&module_info, choose), before);
    assert_eq!(module_info.proc(choose).head_vars, head_vars);
    assert!(module_info.proc(choose).rtti_varmaps.is_empty());
}

#[test]
fn type_variable_witness_is_reused() {
    let (module_info, _) = demos::constraint_forwarding(Options::default());
    let r = proc_of(&module_info, "r", 2);
    let pred = module_info.pred(r.pred_id);
    let proc_info = module_info.proc(r);

    let mut info = PolyInfo::new(&module_info, pred, proc_info);
    let head = info.setup_headvars(pred, proc_info);
    let context = proc_info.context;
    let unconstrained = Type::Variable(tvar_named(&pred.tvarset, "T5"));

    let mut first_goals = Vec::new();
    let first = info.make_type_info_var(&unconstrained, context, &mut first_goals);
    let mut second_goals = Vec::new();
    let second = info.make_type_info_var(&unconstrained, context, &mut second_goals);

    assert_eq!(first, second);
    assert_eq!(first, head.head_vars[1]);
    assert!(first_goals.is_empty());
    assert!(second_goals.is_empty());

    let fresh = info.tvarset.new_named("U");
    let mut fresh_goals = Vec::new();
    let first = info.make_type_info_var(&Type::Variable(fresh), context, &mut fresh_goals);
    let second = info.make_type_info_var(&Type::Variable(fresh), context, &mut fresh_goals);
    assert_eq!(first, second);
    assert!(fresh_goals.is_empty());
}

#[test]
fn existential_outputs_are_produced_after_the_body() {
    let (mut module_info, _) = demos::existential(Options::default());
    process_module(&mut module_info);

    let mk = proc_of(&module_info, "mk", 1);
    let proc_info = module_info.proc(mk);
    assert_eq!(proc_info.head_vars.len(), 2);
    assert_eq!(proc_info.arg_modes, [ArgMode::Out, ArgMode::Out]);

    let GoalExpr::Conj(_, conjuncts) = &proc_info.body.expr else {
        panic!("body is not a conjunction");
    };
    let last = conjuncts.last().expect("non-empty body");
    assert!(matches!(
        &last.expr,
        GoalExpr::Unify(unify) if matches!(
            unify.kind,
            Unification::Assign { to, .. } if to == proc_info.head_vars[0]
        )
    ));
    assert!(matches!(
        &conjuncts[0].expr,
        GoalExpr::Unify(unify) if matches!(unify.rhs, UnifyRhs::Functor { cons_id: ConsId::Int(42), .. })
    ));

    let any = proc_of(&module_info, "any", 1);
    let proc_info = module_info.proc(any);
    assert_eq!(proc_info.var_table.ty(proc_info.head_vars[0]), &builtins::type_info_type());
    assert_eq!(proc_info.arg_modes[0], ArgMode::Out);
}

#[test]
fn existential_witness_of_a_call_is_reused_downstream() {
    let (mut module_info, use_mk) = demos::existential(Options::default());
    process_module(&mut module_info);

    let proc_info = module_info.proc(use_mk);
    let mk_args = &call_args(&module_info, proc_info, "mk")[0];
    let display_args = &call_args(&module_info, proc_info, "display")[0];

    assert_eq!(mk_args.len(), 2);
    assert_eq!(display_args.len(), 2);
    assert_eq!(mk_args[0], display_args[0]);
    assert_eq!(count_goals(proc_info, is_typeclass_info_cell), 0);
}

#[test]
fn existential_constructors_carry_witnesses() {
    let (mut module_info, _) = demos::existential(Options::default());
    process_module(&mut module_info);

    let boxing = module_info.proc(proc_of(&module_info, "boxing", 1));
    let constructed = goals(boxing).into_iter().find_map(|goal| match &goal.expr {
        GoalExpr::Unify(unify) => match &unify.kind {
            Unification::Construct {
                cons_id: ConsId::Cons(..),
                args,
                ..
            } => Some(args.clone()),
            _ => None,
        },
        _ => None,
    });
    let args = constructed.expect("construction of box");
    assert_eq!(args.len(), 2);
    assert_eq!(boxing.var_table.ty(args[0]), &builtins::type_info_type());

    let unboxing = module_info.proc(proc_of(&module_info, "unboxing", 1));
    let deconstructed = goals(unboxing).into_iter().find_map(|goal| match &goal.expr {
        GoalExpr::Unify(unify) => match &unify.kind {
            Unification::Deconstruct { args, .. } => Some(args.clone()),
            _ => None,
        },
        _ => None,
    });
    let args = deconstructed.expect("deconstruction of box");
    assert_eq!(args.len(), 2);
    assert!(
        unboxing
            .rtti_varmaps
            .type_info_locations
            .values()
            .any(|locn| *locn == TypeInfoLocn::Direct(args[0]))
    );
}

#[test]
fn closure_of_polymorphic_predicate_becomes_a_lambda() {
    let (mut module_info, apply_id) = demos::higher_order(Options::default());
    process_module(&mut module_info);

    let proc_info = module_info.proc(apply_id);
    let lambda = goals(proc_info).into_iter().find_map(|goal| match &goal.expr {
        GoalExpr::Unify(unify) => match &unify.rhs {
            UnifyRhs::Lambda(lambda) => Some(lambda.clone()),
            _ => None,
        },
        _ => None,
    });
    let lambda = lambda.expect("closure rewritten into a lambda");
    assert_eq!(lambda.args.len(), 2);
    assert_eq!(lambda.modes, [ArgMode::In, ArgMode::Out]);

    let id_args = &call_args(&module_info, proc_info, "id")[0];
    assert_eq!(id_args.len(), 3);
    assert_eq!(&id_args[1..], &lambda.args[..]);
    assert_eq!(proc_info.var_table.ty(id_args[0]), &builtins::type_info_type());
}

#[test]
fn complicated_unification_records_its_witness() {
    let (mut module_info, _) = demos::higher_order(Options::default());
    process_module(&mut module_info);

    let same = module_info.proc(proc_of(&module_info, "same", 2));
    let type_info_vars = goals(same).into_iter().find_map(|goal| match &goal.expr {
        GoalExpr::Unify(unify) => match &unify.kind {
            Unification::Complicated { type_info_vars, .. } => Some(type_info_vars.clone()),
            _ => None,
        },
        _ => None,
    });

    assert_eq!(type_info_vars, Some(vec![same.head_vars[0]]));
    assert!(same.body.info.nonlocals.contains(&same.head_vars[0]));
}

#[test]
fn calls_under_negation_receive_the_head_witness() {
    let (mut module_info, _) = demos::higher_order(Options::default());
    process_module(&mut module_info);

    let distinct = module_info.proc(proc_of(&module_info, "distinct", 2));
    let type_info = distinct.head_vars[0];
    assert_eq!(distinct.var_table.ty(type_info), &builtins::type_info_type());

    let GoalExpr::Negation(inner) = &distinct.body.expr else {
        panic!("body is not a negation");
    };
    let same_args = &call_args(&module_info, distinct, "same")[0];
    assert_eq!(same_args[0], type_info);
    assert!(inner.info.nonlocals.contains(&type_info));
    assert!(distinct.body.info.nonlocals.contains(&type_info));
}

#[test]
fn existential_scope_keeps_its_variable_local() {
    let (mut module_info, _) = demos::higher_order(Options::default());
    process_module(&mut module_info);

    let nonzero = module_info.proc(proc_of(&module_info, "nonzero", 1));
    let GoalExpr::Scope(ScopeReason::Exists(quantified), _) = &nonzero.body.expr else {
        panic!("body is not an existential scope");
    };
    assert_eq!(nonzero.body.info.nonlocals.iter().copied().collect::<Vec<_>>(), nonzero.head_vars);
    assert!(!nonzero.body.info.nonlocals.contains(&quantified[0]));
    assert_eq!(
        count_goals(nonzero, |goal| matches!(
            &goal.expr,
            GoalExpr::Unify(unify) if matches!(unify.kind, Unification::SimpleTest { .. })
        )),
        1
    );
}

#[test]
fn tuple_insertion_passes_type_infos_of_the_tuple() {
    let (mut module_info, _) = demos::higher_order(Options::default());
    process_module(&mut module_info);

    let store = module_info.proc(proc_of(&module_info, "store", 3));
    let insert = goals(store).into_iter().find_map(|goal| match &goal.expr {
        GoalExpr::GenericCall(call) if matches!(call.kind, GenericCallKind::TupleInsert { .. }) => {
            Some(call.clone())
        }
        _ => None,
    });
    let insert = insert.expect("tuple insertion");

    assert_eq!(insert.args.len(), 4);
    assert_eq!(insert.modes[0], ArgMode::In);
    assert_eq!(insert.args[0], store.head_vars[0]);

    let rel = proc_of(&module_info, "rel", 1);
    assert_eq!(module_info.proc(rel).head_vars.len(), 1);
}

#[test]
fn argument_types_cover_witness_parameters() {
    for scenario in [
        demos::constraint_forwarding(Options::default()).0,
        demos::instance_chain(Options::default(), 2).0,
        demos::superclass_chain(Options::default(), 2).0,
        demos::existential(Options::default()).0,
        demos::higher_order(Options::default()).0,
    ] {
        let mut module_info = scenario;
        process_module(&mut module_info);
        assert_arg_types_match_heads(&module_info);
    }
}

fn special_pred_with_mismatched_head(origin: PredOrigin) -> ModuleInfo {
    let mut mb = ModuleBuilder::new("eqv", Options::default());
    {
        let mut pb = mb.pred("__Unify__");
        let t = pb.type_var("T");
        let x = pb.arg_with_body_type(
            "X",
            Type::defined("list", "list", vec![Type::Variable(t)]),
            int_type(),
            ArgMode::Out,
        );
        pb.exist_tvar(t).origin(origin);
        let context = pb.context(1);
        pb.build(int_const(x, 0, context));
    }
    mb.finish()
}

#[test]
fn unification_procedures_tolerate_mismatched_heads() {
    let ctor = int_ctor();
    let mut module_info = special_pred_with_mismatched_head(PredOrigin::SpecialPred(SpecialPredKind::Unify, ctor));

    process_module(&mut module_info);

    let id = proc_of(&module_info, "__Unify__", 1);
    assert_eq!(module_info.proc(id).head_vars.len(), 2);
}

#[test]
#[should_panic(expected = "head types do not match")]
fn user_procedures_with_mismatched_heads_are_an_internal_error() {
    let mut module_info = special_pred_with_mismatched_head(PredOrigin::User);
    process_module(&mut module_info);
}

/// Each generated type variable is either constrained or not, and either
/// existentially or universally quantified
fn signature_shapes() -> impl Strategy<Value = Vec<(bool, bool)>> {
    prop::collection::vec((any::<bool>(), any::<bool>()), 1..6)
}

proptest! {
    #[test]
    fn witness_parameters_follow_the_canonical_order(shape in signature_shapes()) {
        let mut mb = ModuleBuilder::new("shapes", Options::default());
        let class = mb.add_class("c", &["T"], &[]);
        let id = {
            let mut pb = mb.pred("sig");
            pb.status(ImportStatus::Imported);
            for (i, (constrained, existential)) in shape.iter().enumerate() {
                let tvar = pb.type_var(&format!("T{i}"));
                let mode = if *existential { ArgMode::Out } else { ArgMode::In };
                pb.arg(&format!("X{i}"), Type::Variable(tvar), mode);
                if *existential {
                    pb.exist_tvar(tvar);
                }
                if *constrained {
                    let constraint = pb.constraint(class, vec![Type::Variable(tvar)]);
                    if *existential {
                        pb.existential(constraint);
                    } else {
                        pb.universal(constraint);
                    }
                }
            }
            let context = pb.context(1);
            pb.build(true_goal(context))
        };
        let mut module_info = mb.finish();
        let orig_arity = shape.len();

        process_module(&mut module_info);

        let count = |constrained: bool, existential: bool| {
            shape.iter().filter(|shape| **shape == (constrained, existential)).count()
        };
        let expected: Vec<(Type, ArgMode)> = std::iter::empty()
            .chain(std::iter::repeat_n((builtins::typeclass_info_type(), ArgMode::In), count(true, false)))
            .chain(std::iter::repeat_n((builtins::typeclass_info_type(), ArgMode::Out), count(true, true)))
            .chain(std::iter::repeat_n((builtins::type_info_type(), ArgMode::In), count(false, false)))
            .chain(std::iter::repeat_n((builtins::type_info_type(), ArgMode::Out), count(false, true)))
            .collect();

        let pred = module_info.pred(id.pred_id);
        let proc_info = module_info.proc(id);
        let num_extra = proc_info.head_vars.len() - orig_arity;
        let actual: Vec<(Type, ArgMode)> = proc_info.head_vars[..num_extra]
            .iter()
            .zip(&proc_info.arg_modes)
            .map(|(var, mode)| (proc_info.var_table.ty(*var).clone(), *mode))
            .collect();

        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(num_extra, shape.len());
        prop_assert_eq!(pred.arg_types.len() - pred.orig_arity, num_extra);
        let witness_types: Vec<Type> = expected.into_iter().map(|(ty, _)| ty).collect();
        prop_assert_eq!(&pred.arg_types[..num_extra], &witness_types[..]);
    }
}
