//! Small type-checked modules exercising the transformation passes.

use crate::{
    frontend::builder::ModuleBuilder,
    middle::{
        hlds::{
            builtins::{int_type, io_state_type, string_type},
            class::{ClassConstraint, ConstraintProof, ConstraintProofMap, InstanceDefn},
            goal::{
                ArgMode, ConsId, Determinism, ForeignAttributes, GenericCallKind, Purity, ScopeReason, TabledForIo,
            },
            goal_util::{
                CallShape, assign, complicated_unify, conj, construct, deconstruct, disj, generic_call,
                int_const, ite, negation, par_conj, scope, simple_test, string_const, true_goal,
            },
            id::{PredProcId, SymName},
            module::{
                CtorDefn, ImportStatus, ModuleInfo, PredMarker, PredOrigin, SpecialPredKind, TypeBody, TypeDefn,
            },
            table::{ArgTablingMethod, EvalMethod, MinimalModelMethod, Strictness, TableAttributes},
            types::{PredOrFunc, Type, TypeVarSet},
        },
        options::Options,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Scenario {
    /// Forwarding and building typeclass-infos at call sites
    ConstraintForwarding,
    /// An instance whose own constraint needs another instance
    InstanceChain,
    /// Typeclass-infos extracted through superclasses
    SuperclassChain,
    /// Existentially typed predicates and constructors
    Existential,
    /// Closures, complicated unifications and tuple insertion
    HigherOrder,
    /// Every call-table evaluation method
    Tabling,
    /// Per-argument table strictness over an equivalence type
    TableStrictness,
    /// I/O tabling of foreign primitives
    IoTabling,
    /// Automatic parallelisation candidates
    Parallel,
}

impl Scenario {
    pub fn build(self, options: Options) -> ModuleInfo {
        match self {
            Scenario::ConstraintForwarding => constraint_forwarding(options).0,
            Scenario::InstanceChain => instance_chain(options, 1).0,
            Scenario::SuperclassChain => superclass_chain(options, 3).0,
            Scenario::Existential => existential(options).0,
            Scenario::HigherOrder => higher_order(options).0,
            Scenario::Tabling => tabling(options).0,
            Scenario::TableStrictness => table_strictness(options).0,
            Scenario::IoTabling => io_tabling(options).0,
            Scenario::Parallel => parallel(options).0,
        }
    }
}

fn list_type(elem: Type) -> Type {
    Type::defined("list", "list", vec![elem])
}

/// Integer helpers every demo module imports
struct IntLib {
    gt: PredProcId,
    minus: PredProcId,
    plus: PredProcId,
}

fn add_int_lib(mb: &mut ModuleBuilder) -> IntLib {
    let mut binary = |name: &str, determinism: Determinism, has_result: bool| {
        let mut pb = mb.pred(name);
        pb.in_module("int").status(ImportStatus::Imported).determinism(determinism);
        pb.arg("A", int_type(), ArgMode::In);
        pb.arg("B", int_type(), ArgMode::In);
        if has_result {
            pb.arg("C", int_type(), ArgMode::Out);
        }
        let context = pb.context(1);
        pb.build(true_goal(context))
    };

    IntLib {
        gt: binary(">", Determinism::Semidet, false),
        minus: binary("-", Determinism::Det, true),
        plus: binary("+", Determinism::Det, true),
    }
}

/// ```text
/// :- instance foo(list(T)) <= foo(T).
/// :- pred q(T2, T3) <= (foo(T2), bar(T3)).
/// :- pred r(T4, T5) <= foo(T4).
/// :- pred p(T) <= foo(T).
/// p(X) :- q([X], 0), r(X, 0).
/// ```
///
/// Returns `p`.
pub fn constraint_forwarding(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("forwarding", options);
    let foo = mb.add_class("foo", &["T"], &[]);
    let bar = mb.add_class("bar", &["T"], &[]);
    let bar_int = mb.simple_instance(vec![int_type()], TypeVarSet::new());
    let bar_int = mb.add_instance(bar, bar_int);
    let foo_int = mb.simple_instance(vec![int_type()], TypeVarSet::new());
    mb.add_instance(foo, foo_int);
    let mut list_tvarset = TypeVarSet::new();
    let elem = list_tvarset.new_named("E");
    let foo_list = mb.add_instance(
        foo,
        InstanceDefn {
            module: SymName::unqualified("forwarding"),
            constraints: vec![ClassConstraint::new(foo.name, vec![Type::Variable(elem)])],
            types: vec![list_type(Type::Variable(elem))],
            tvarset: list_tvarset,
            superclass_proofs: ConstraintProofMap::new(),
        },
    );

    let q = {
        let mut pb = mb.pred("q");
        let t2 = pb.type_var("T2");
        let t3 = pb.type_var("T3");
        pb.arg("A", Type::Variable(t2), ArgMode::In);
        pb.arg("B", Type::Variable(t3), ArgMode::In);
        let foo_t2 = pb.constraint(foo, vec![Type::Variable(t2)]);
        let bar_t3 = pb.constraint(bar, vec![Type::Variable(t3)]);
        pb.universal(foo_t2).universal(bar_t3);
        let context = pb.context(2);
        pb.build(true_goal(context))
    };

    let r = {
        let mut pb = mb.pred("r");
        let t4 = pb.type_var("T4");
        let t5 = pb.type_var("T5");
        pb.arg("A", Type::Variable(t4), ArgMode::In);
        pb.arg("B", Type::Variable(t5), ArgMode::In);
        let foo_t4 = pb.constraint(foo, vec![Type::Variable(t4)]);
        pb.universal(foo_t4);
        let context = pb.context(5);
        pb.build(true_goal(context))
    };

    let p = {
        let mut pb = mb.pred("p");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let foo_t = pb.constraint(foo, vec![Type::Variable(t)]);
        let foo_list_t = pb.constraint(foo, vec![list_type(Type::Variable(t))]);
        let bar_int_constraint = pb.constraint(bar, vec![int_type()]);
        pb.universal(foo_t)
            .proof(foo_list_t, ConstraintProof::ApplyInstance(foo_list))
            .proof(bar_int_constraint, ConstraintProof::ApplyInstance(bar_int));

        let nil = pb.var("Nil", list_type(Type::Variable(t)));
        let singleton = pb.var("Xs", list_type(Type::Variable(t)));
        let zero = pb.var("Zero", int_type());
        let context = pb.context(9);
        let body = conj(
            vec![
                construct(nil, ConsId::Cons(SymName::qualified("list", "[]"), 0), Vec::new(), context),
                construct(
                    singleton,
                    ConsId::Cons(SymName::qualified("list", "[|]"), 2),
                    vec![x, nil],
                    context,
                ),
                int_const(zero, 0, context),
                pb.call(q, vec![singleton, zero], context),
                pb.call(r, vec![x, zero], pb.context(10)),
            ],
            context,
        );
        pb.build(body)
    };

    (mb.finish(), p)
}

/// ```text
/// :- instance foo(int).
/// :- instance foo(list(T)) <= foo(T).
/// :- pred show(T) <= foo(T).
/// :- pred s(list(...(list(int)))).
/// s(L) :- show(L).
/// ```
///
/// with `depth` levels of `list`. Returns `s`.
pub fn instance_chain(options: Options, depth: usize) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("chain", options);
    let foo = mb.add_class("foo", &["T"], &[]);

    let foo_int = mb.simple_instance(vec![int_type()], TypeVarSet::new());
    let foo_int = mb.add_instance(foo, foo_int);
    let mut tvarset = TypeVarSet::new();
    let t = tvarset.new_named("T");
    let foo_list = mb.add_instance(
        foo,
        InstanceDefn {
            module: SymName::unqualified("chain"),
            constraints: vec![ClassConstraint::new(foo.name, vec![Type::Variable(t)])],
            types: vec![list_type(Type::Variable(t))],
            tvarset,
            superclass_proofs: ConstraintProofMap::new(),
        },
    );

    let show = {
        let mut pb = mb.pred("show");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        let foo_t = pb.constraint(foo, vec![Type::Variable(t)]);
        pb.universal(foo_t);
        let context = pb.context(3);
        pb.build(true_goal(context))
    };

    let s = {
        let mut pb = mb.pred("s");
        let mut ty = int_type();
        let foo_int_constraint = pb.constraint(foo, vec![ty.clone()]);
        pb.proof(foo_int_constraint, ConstraintProof::ApplyInstance(foo_int));
        for _ in 0..depth {
            ty = list_type(ty);
            let constraint = pb.constraint(foo, vec![ty.clone()]);
            pb.proof(constraint, ConstraintProof::ApplyInstance(foo_list));
        }
        let l = pb.arg("L", ty, ArgMode::In);
        let context = pb.context(6);
        let body = pb.call(show, vec![l], context);
        pb.build(body)
    };

    (mb.finish(), s)
}

/// ```text
/// :- typeclass c0(T).
/// :- typeclass c1(T) <= c0(T).
/// ...
/// :- pred need(T) <= c0(T).
/// :- pred have(T) <= cN(T).
/// have(X) :- need(X).
/// ```
///
/// Returns `have`.
pub fn superclass_chain(options: Options, depth: usize) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("supers", options);
    let mut classes = vec![mb.add_class("c0", &["T"], &[])];
    for i in 1..=depth {
        let parent = format!("c{}", i - 1);
        classes.push(mb.add_class(&format!("c{i}"), &["T"], &[(parent.as_str(), &[0])]));
    }

    let need = {
        let mut pb = mb.pred("need");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        let c0 = pb.constraint(classes[0], vec![Type::Variable(t)]);
        pb.universal(c0);
        let context = pb.context(1);
        pb.build(true_goal(context))
    };

    let have = {
        let mut pb = mb.pred("have");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let top = pb.constraint(classes[depth], vec![Type::Variable(t)]);
        pb.universal(top);
        for i in 0..depth {
            let constraint = pb.constraint(classes[i], vec![Type::Variable(t)]);
            let parent = pb.constraint(classes[i + 1], vec![Type::Variable(t)]);
            pb.proof(constraint, ConstraintProof::Superclass(parent));
        }
        let context = pb.context(4);
        let body = pb.call(need, vec![x], context);
        pb.build(body)
    };

    (mb.finish(), have)
}

/// ```text
/// :- some [T] pred mk(T::out) => show(T).
/// mk(42).
/// :- some [U] pred any(U::out).
/// any("any").
/// :- pred display(T::in) <= show(T).
/// :- pred use_mk.
/// use_mk :- mk(X), display(X).
/// :- type box ---> some [T] box(T).
/// boxing(B) :- N = 7, B = box(N).
/// unboxing(B) :- B = box(_).
/// ```
///
/// Returns `use_mk`.
pub fn existential(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("exist", options);
    let show = mb.add_class("show", &["T"], &[]);
    let show_int = mb.simple_instance(vec![int_type()], TypeVarSet::new());
    let show_int = mb.add_instance(show, show_int);

    let mut box_tvarset = TypeVarSet::new();
    let box_t = box_tvarset.new_named("T");
    let box_name = mb.qualify("box");
    let box_ctor = mb.add_type(
        "box",
        TypeDefn {
            tvarset: box_tvarset,
            params: Vec::new(),
            body: TypeBody::Du(vec![CtorDefn {
                name: box_name,
                exist_tvars: vec![box_t],
                constraints: Vec::new(),
                args: vec![Type::Variable(box_t)],
            }]),
        },
    );
    let box_type = Type::Defined(box_ctor, Vec::new());

    let mk = {
        let mut pb = mb.pred("mk");
        let t = pb.type_var("T");
        let x = pb.arg_with_body_type("X", Type::Variable(t), int_type(), ArgMode::Out);
        let show_t = pb.constraint(show, vec![Type::Variable(t)]);
        let show_int_constraint = pb.constraint(show, vec![int_type()]);
        pb.exist_tvar(t)
            .existential(show_t)
            .proof(show_int_constraint, ConstraintProof::ApplyInstance(show_int));
        let context = pb.context(2);
        pb.build(int_const(x, 42, context))
    };

    {
        let mut pb = mb.pred("any");
        let u = pb.type_var("U");
        let x = pb.arg_with_body_type("X", Type::Variable(u), string_type(), ArgMode::Out);
        pb.exist_tvar(u);
        let context = pb.context(4);
        pb.build(string_const(x, "any", context));
    }

    let display = {
        let mut pb = mb.pred("display");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        let show_t = pb.constraint(show, vec![Type::Variable(t)]);
        pb.universal(show_t);
        let context = pb.context(6);
        pb.build(true_goal(context))
    };

    let use_mk = {
        let mut pb = mb.pred("use_mk");
        let a = pb.type_var("A");
        let x = pb.var("X", Type::Variable(a));
        let context = pb.context(8);
        let body = conj(
            vec![pb.call(mk, vec![x], context), pb.call(display, vec![x], context)],
            context,
        );
        pb.build(body)
    };

    {
        let mut pb = mb.pred("boxing");
        let b = pb.arg("B", box_type.clone(), ArgMode::Out);
        let n = pb.var("N", int_type());
        let context = pb.context(11);
        let body = conj(
            vec![
                int_const(n, 7, context),
                construct(b, ConsId::Cons(box_name, 1), vec![n], context),
            ],
            context,
        );
        pb.build(body);
    }

    {
        let mut pb = mb.pred("unboxing");
        let b = pb.arg("B", box_type, ArgMode::In);
        let e = pb.type_var("E");
        let y = pb.var("Y", Type::Variable(e));
        let context = pb.context(12);
        pb.build(deconstruct(b, ConsId::Cons(box_name, 1), vec![y], false, context));
    }

    (mb.finish(), use_mk)
}

/// ```text
/// :- pred id(T::in, T::out).
/// id(X, X).
/// :- pred apply_id(int::in, int::out).
/// apply_id(A, B) :- F = id, call(F, A, B).
/// :- pred same(T::in, T::in) is semidet.
/// same(X, Y) :- X = Y.
/// :- pred distinct(T::in, T::in) is semidet.
/// distinct(X, Y) :- \+ same(X, Y).
/// :- pred nonzero(int::in) is semidet.
/// nonzero(N) :- some [Zero] (Zero = 0, \+ N == Zero).
/// :- pred store(T::in, relation::in, relation::out).
/// store(X, S0, S) :- aditi_insert(rel(X), S0, S).
/// ```
///
/// Returns `apply_id`.
pub fn higher_order(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("ho", options);
    let relation_ctor = mb.add_type("relation", TypeDefn::abstract_type());
    let relation_type = Type::Defined(relation_ctor, Vec::new());

    let id = {
        let mut pb = mb.pred("id");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let y = pb.arg("Y", Type::Variable(t), ArgMode::Out);
        let context = pb.context(2);
        pb.build(assign(y, x, context))
    };

    let apply_id = {
        let mut pb = mb.pred("apply_id");
        let a = pb.arg("A", int_type(), ArgMode::In);
        let b = pb.arg("B", int_type(), ArgMode::Out);
        let f = pb.var(
            "F",
            Type::HigherOrder {
                pred_or_func: PredOrFunc::Predicate,
                args: vec![int_type(), int_type()],
            },
        );
        let context = pb.context(4);
        let body = conj(
            vec![
                construct(f, ConsId::Closure(id), Vec::new(), context),
                generic_call(
                    GenericCallKind::HigherOrder { closure: f },
                    vec![a, b],
                    vec![ArgMode::In, ArgMode::Out],
                    CallShape::det(),
                    context,
                ),
            ],
            context,
        );
        pb.build(body)
    };

    let same = {
        let mut pb = mb.pred("same");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let y = pb.arg("Y", Type::Variable(t), ArgMode::In);
        pb.determinism(Determinism::Semidet);
        let context = pb.context(6);
        pb.build(complicated_unify(x, y, context))
    };

    {
        let mut pb = mb.pred("distinct");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let y = pb.arg("Y", Type::Variable(t), ArgMode::In);
        pb.determinism(Determinism::Semidet);
        let context = pb.context(10);
        let body = negation(pb.call(same, vec![x, y], context), context);
        pb.build(body);
    }

    {
        let mut pb = mb.pred("nonzero");
        let n = pb.arg("N", int_type(), ArgMode::In);
        pb.determinism(Determinism::Semidet);
        let zero = pb.var("Zero", int_type());
        let context = pb.context(11);
        let body = scope(
            ScopeReason::Exists(vec![zero]),
            conj(
                vec![
                    int_const(zero, 0, context),
                    negation(simple_test(n, zero, context), context),
                ],
                context,
            ),
            context,
        );
        pb.build(body);
    }

    let rel = {
        let mut pb = mb.pred("rel");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        pb.marker(PredMarker::Aditi);
        let context = pb.context(8);
        pb.build(true_goal(context))
    };

    {
        let mut pb = mb.pred("store");
        let t = pb.type_var("T");
        let x = pb.arg("X", Type::Variable(t), ArgMode::In);
        let s0 = pb.arg("S0", relation_type.clone(), ArgMode::In);
        let s = pb.arg("S", relation_type, ArgMode::Out);
        let context = pb.context(9);
        pb.build(generic_call(
            GenericCallKind::TupleInsert { relation: rel },
            vec![x, s0, s],
            vec![ArgMode::In, ArgMode::In, ArgMode::Out],
            CallShape::det(),
            context,
        ));
    }

    (mb.finish(), apply_id)
}

/// One tabled predicate per evaluation method:
///
/// ```text
/// :- pragma loop_check(walk/1).      walk(N) :- ( N > 0 -> walk(N - 1) ; true ).
/// :- pragma loop_check(check/1).     check(N) :- N > 0.
/// :- pragma loop_check(explore/2).   explore(N, M) :- ( M = N ; explore(N - 1, M) ).
/// :- pragma memo(fib/2).             fib(N, F) :- ( N > 1 -> ... ; F = N ).
/// :- pragma memo(is_small/1).        is_small(N) :- 10 > N.
/// :- pragma memo(choose/2).          choose(N, M) :- ( M = N ; M = N - 1 ).
/// :- pragma memo(size/2).            size(_, 1).
/// :- pragma minimal_model(path/2).   path(X, Y) :- edge(X, Y) ; edge(X, Z), path(Z, Y).
/// :- pragma minimal_model(reach/2).  (own stacks) the same as path
/// ```
///
/// Returns `choose`.
pub fn tabling(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("tabled", options);
    let int_lib = add_int_lib(&mut mb);
    let strict = TableAttributes::default;

    {
        let mut pb = mb.pred("walk");
        let n = pb.arg("N", int_type(), ArgMode::In);
        pb.eval_method(EvalMethod::LoopCheck(strict()));
        let zero = pb.var("Zero", int_type());
        let one = pb.var("One", int_type());
        let m = pb.var("M", int_type());
        let context = pb.context(1);
        let body = ite(
            conj(
                vec![int_const(zero, 0, context), pb.call(int_lib.gt, vec![n, zero], context)],
                context,
            ),
            conj(
                vec![
                    int_const(one, 1, context),
                    pb.call(int_lib.minus, vec![n, one, m], context),
                    pb.call_self(vec![m], context),
                ],
                context,
            ),
            true_goal(context),
            context,
        );
        pb.build(body);
    }

    {
        let mut pb = mb.pred("check");
        let n = pb.arg("N", int_type(), ArgMode::In);
        pb.eval_method(EvalMethod::LoopCheck(strict()))
            .determinism(Determinism::Semidet);
        let zero = pb.var("Zero", int_type());
        let context = pb.context(2);
        let body = conj(
            vec![int_const(zero, 0, context), pb.call(int_lib.gt, vec![n, zero], context)],
            context,
        );
        pb.build(body);
    }

    {
        let mut pb = mb.pred("explore");
        let n = pb.arg("N", int_type(), ArgMode::In);
        let m = pb.arg("M", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::LoopCheck(strict()))
            .determinism(Determinism::Nondet);
        let one = pb.var("One", int_type());
        let n1 = pb.var("N1", int_type());
        let context = pb.context(3);
        let body = disj(
            vec![
                assign(m, n, context),
                conj(
                    vec![
                        int_const(one, 1, context),
                        pb.call(int_lib.minus, vec![n, one, n1], context),
                        pb.call_self(vec![n1, m], context),
                    ],
                    context,
                ),
            ],
            context,
        );
        pb.build(body);
    }

    {
        let mut pb = mb.pred("fib");
        let n = pb.arg("N", int_type(), ArgMode::In);
        let f = pb.arg("F", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::Memo(strict()));
        let [one, two, n1, n2, f1, f2] =
            ["One", "Two", "N1", "N2", "F1", "F2"].map(|name| pb.var(name, int_type()));
        let context = pb.context(4);
        let body = ite(
            conj(
                vec![int_const(one, 1, context), pb.call(int_lib.gt, vec![n, one], context)],
                context,
            ),
            conj(
                vec![
                    pb.call(int_lib.minus, vec![n, one, n1], context),
                    int_const(two, 2, context),
                    pb.call(int_lib.minus, vec![n, two, n2], context),
                    pb.call_self(vec![n1, f1], context),
                    pb.call_self(vec![n2, f2], context),
                    pb.call(int_lib.plus, vec![f1, f2, f], context),
                ],
                context,
            ),
            assign(f, n, context),
            context,
        );
        pb.build(body);
    }

    {
        let mut pb = mb.pred("is_small");
        let n = pb.arg("N", int_type(), ArgMode::In);
        pb.eval_method(EvalMethod::Memo(strict()))
            .determinism(Determinism::Semidet);
        let ten = pb.var("Ten", int_type());
        let context = pb.context(5);
        let body = conj(
            vec![int_const(ten, 10, context), pb.call(int_lib.gt, vec![ten, n], context)],
            context,
        );
        pb.build(body);
    }

    let choose = {
        let mut pb = mb.pred("choose");
        let n = pb.arg("N", int_type(), ArgMode::In);
        let m = pb.arg("M", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::Memo(strict()))
            .determinism(Determinism::Nondet);
        let one = pb.var("One", int_type());
        let context = pb.context(6);
        let body = disj(
            vec![
                assign(m, n, context),
                conj(
                    vec![
                        int_const(one, 1, context),
                        pb.call(int_lib.minus, vec![n, one, m], context),
                    ],
                    context,
                ),
            ],
            context,
        );
        pb.build(body)
    };

    {
        let mut pb = mb.pred("size");
        let t = pb.type_var("T");
        pb.arg("X", Type::Variable(t), ArgMode::In);
        let n = pb.arg("N", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::Memo(strict()));
        let context = pb.context(7);
        pb.build(int_const(n, 1, context));
    }

    let edge = {
        let mut pb = mb.pred("edge");
        pb.status(ImportStatus::Imported)
            .determinism(Determinism::Nondet);
        pb.arg("X", int_type(), ArgMode::In);
        pb.arg("Y", int_type(), ArgMode::Out);
        let context = pb.context(8);
        pb.build(true_goal(context))
    };

    for (name, method) in [
        ("path", MinimalModelMethod::StackCopy),
        ("reach", MinimalModelMethod::OwnStacks),
    ] {
        let mut pb = mb.pred(name);
        let x = pb.arg("X", int_type(), ArgMode::In);
        let y = pb.arg("Y", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::MinimalModel(method, strict()))
            .determinism(Determinism::Nondet);
        let z = pb.var("Z", int_type());
        let context = pb.context(9);
        let body = disj(
            vec![
                pb.call(edge, vec![x, y], context),
                conj(
                    vec![pb.call(edge, vec![x, z], context), pb.call_self(vec![z, y], context)],
                    context,
                ),
            ],
            context,
        );
        pb.build(body);
    }

    (mb.finish(), choose)
}

/// Tabling with per-argument strictness, over an equivalence type:
///
/// ```text
/// :- type count == int.
/// :- pragma memo(pick/3, [promise_implied, addr]).
/// pick(Key, Pair, Out) :- Out = 0.
/// :- pragma memo(tally/2, fast_loose).
/// tally(C, N) :- N = C.
/// use_pick(Out) :- Pair = {1, 2}, pick("key", Pair, Out).
/// ```
///
/// along with the unification predicate the compiler generates for `count`.
/// Returns `pick`.
pub fn table_strictness(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("strict", options);
    let count_ctor = mb.add_type(
        "count",
        TypeDefn {
            tvarset: TypeVarSet::new(),
            params: Vec::new(),
            body: TypeBody::Eqv(int_type()),
        },
    );
    let count_type = Type::Defined(count_ctor, Vec::new());
    let pair_type = Type::Tuple(vec![int_type(), int_type()]);

    let pick = {
        let mut pb = mb.pred("pick");
        pb.arg("Key", string_type(), ArgMode::In);
        pb.arg("Pair", pair_type.clone(), ArgMode::In);
        let out = pb.arg("Out", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::Memo(TableAttributes {
            strictness: Strictness::Specified(vec![ArgTablingMethod::PromiseImplied, ArgTablingMethod::Addr]),
        }));
        let context = pb.context(2);
        pb.build(int_const(out, 0, context))
    };

    {
        let mut pb = mb.pred("tally");
        let c = pb.arg("C", count_type.clone(), ArgMode::In);
        let n = pb.arg("N", int_type(), ArgMode::Out);
        pb.eval_method(EvalMethod::Memo(TableAttributes {
            strictness: Strictness::AllFastLoose,
        }));
        let context = pb.context(4);
        pb.build(assign(n, c, context));
    }

    {
        let mut pb = mb.pred("use_pick");
        let out = pb.arg("Out", int_type(), ArgMode::Out);
        let [one, two] = ["One", "Two"].map(|name| pb.var(name, int_type()));
        let key = pb.var("Key", string_type());
        let pair = pb.var("Pair", pair_type);
        let context = pb.context(6);
        let body = conj(
            vec![
                int_const(one, 1, context),
                int_const(two, 2, context),
                construct(pair, ConsId::Tuple(2), vec![one, two], context),
                string_const(key, "key", context),
                pb.call(pick, vec![key, pair, out], context),
            ],
            context,
        );
        pb.build(body);
    }

    {
        let mut pb = mb.pred("__Unify__");
        let x = pb.arg("X", count_type.clone(), ArgMode::In);
        let y = pb.arg("Y", count_type, ArgMode::In);
        pb.origin(PredOrigin::SpecialPred(SpecialPredKind::Unify, count_ctor))
            .determinism(Determinism::Semidet);
        let context = pb.context(1);
        pb.build(simple_test(x, y, context));
    }

    (mb.finish(), pick)
}

/// Foreign I/O primitives with each tabled-for-I/O annotation:
///
/// ```text
/// :- pred write_int(int::in, io::di, io::uo) is det.           tabled_for_io
/// :- pred read_line(string::out, io::di, io::uo) is det.       tabled_for_io_unitize, exported
/// :- pred flush(io::di, io::uo) is det.                        not_tabled_for_io
/// :- pred log_child(io::di, io::uo) is det.                    tabled_for_descendant_io
/// :- pred write_char(int::in, io::di, io::uo) is det.          tabled_for_io, no_inline
/// :- pred unmarked(io::di, io::uo) is det.                     no annotation
/// main(IO0, IO) :- write_int(42, IO0, IO).
/// ```
///
/// Returns `write_int`.
pub fn io_tabling(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("io_prims", options);
    let io = io_state_type;

    let mut primitive = |name: &str, value: Option<Type>, tabled: Option<TabledForIo>, code: &str| {
        let mut pb = mb.pred(name);
        if let Some(ty) = value {
            let mode = if ty == string_type() { ArgMode::Out } else { ArgMode::In };
            pb.arg("V", ty, mode);
        }
        pb.arg("IO0", io(), ArgMode::In);
        pb.arg("IO", io(), ArgMode::Out);
        match name {
            "read_line" => {
                pb.status(ImportStatus::Exported);
            }
            "write_char" => {
                pb.marker(PredMarker::NoInline);
            }
            _ => {}
        }
        let attributes = ForeignAttributes {
            tabled_for_io: tabled,
            may_call_mercury: false,
        };
        let context = pb.context(1);
        let body = pb.foreign_body(attributes, code, Purity::Pure, context);
        pb.build(body)
    };

    let write_int = primitive(
        "write_int",
        Some(int_type()),
        Some(TabledForIo::TabledForIo),
        "printf(\"%ld\", (long) V); IO = IO0;",
    );
    primitive(
        "read_line",
        Some(string_type()),
        Some(TabledForIo::TabledForIoUnitize),
        "V = MR_read_line(); IO = IO0;",
    );
    primitive("flush", None, Some(TabledForIo::NotTabledForIo), "fflush(stdout); IO = IO0;");
    primitive(
        "log_child",
        None,
        Some(TabledForIo::TabledForDescendantIo),
        "MR_log_child(); IO = IO0;",
    );
    primitive(
        "write_char",
        Some(int_type()),
        Some(TabledForIo::TabledForIo),
        "putchar((int) V); IO = IO0;",
    );
    primitive("unmarked", None, None, "IO = IO0;");

    {
        let mut pb = mb.pred("main");
        let io0 = pb.arg("IO0", io(), ArgMode::In);
        let io1 = pb.arg("IO", io(), ArgMode::Out);
        let n = pb.var("N", int_type());
        let context = pb.context(9);
        let body = conj(
            vec![int_const(n, 42, context), pb.call(write_int, vec![n, io0, io1], context)],
            context,
        );
        pb.build(body);
    }

    (mb.finish(), write_int)
}

/// ```text
/// :- pred dup(int::in, int::out, int::out).
/// dup(X, Y, Z) :- Y = X & Z = X.          (explicit parallel conjunction)
/// :- pred split(int::in, int::out, int::out).
/// split(X, Y, Z) :- Y = X, Z = X.
/// ```
///
/// with both bodies selected for parallelisation, plus a selection whose goal
/// path no longer exists. Returns `split`.
pub fn parallel(options: Options) -> (ModuleInfo, PredProcId) {
    let mut mb = ModuleBuilder::new("par", options);

    let mut build = |name: &str, explicit: bool| {
        let mut pb = mb.pred(name);
        let x = pb.arg("X", int_type(), ArgMode::In);
        let y = pb.arg("Y", int_type(), ArgMode::Out);
        let z = pb.arg("Z", int_type(), ArgMode::Out);
        if explicit {
            pb.marker(PredMarker::ParallelConjunctions);
        }
        let context = pb.context(2);
        let goals = vec![assign(y, x, context), assign(z, x, context)];
        let body = if explicit {
            par_conj(goals, context)
        } else {
            conj(goals, context)
        };
        pb.build(body)
    };

    let dup = build("dup", true);
    let split = build("split", false);
    mb.parallelise(dup, Vec::new());
    mb.parallelise(split, Vec::new());
    mb.parallelise(split, vec![5]);

    (mb.finish(), split)
}
