//! Constructors for synthesized goals.
//!
//! Every constructor fills in the goal info from its parts: determinism and
//! purity are combined bottom-up, the instmap delta records the variables the
//! goal binds, and the non-locals are set to the goal's free variables. The
//! last one is an over-approximation that [`requantify`] narrows when the
//! enclosing procedure is requantified.
//!
//! [`requantify`]: super::quantification::requantify

use std::collections::BTreeSet;

use super::{
    goal::{
        ArgMode, Case, ConjKind, ConsId, Determinism, ForeignArg,
        ForeignAttributes, ForeignProc, GenericCall, GenericCallKind, Goal, GoalExpr, GoalInfo,
        IfThenElse, InstmapDelta, MaxSolutions, PlainCall, Purity, ScopeReason, Switch,
        Unification, Unify, UnifyRhs,
    },
    id::{Context, PredProcId, ProgVar, SymName},
    quantification::free_vars,
};

fn finish(expr: GoalExpr, mut info: GoalInfo) -> Goal {
    let mut goal = Goal {
        expr,
        info: info.clone(),
    };
    info.nonlocals = free_vars(&goal);
    goal.info = info;
    goal
}

pub fn true_goal(context: Context) -> Goal {
    Goal {
        expr: GoalExpr::Conj(ConjKind::Plain, Vec::new()),
        info: GoalInfo::new(Determinism::Det, context),
    }
}

pub fn fail_goal(context: Context) -> Goal {
    let mut info = GoalInfo::new(Determinism::Failure, context);
    info.instmap_delta = InstmapDelta::unreachable();
    Goal {
        expr: GoalExpr::Disj(Vec::new()),
        info,
    }
}

fn combine_sequential(goals: &[Goal], context: Context) -> GoalInfo {
    let mut info = GoalInfo::new(Determinism::Det, context);
    for goal in goals {
        info.determinism = info.determinism.conjoin(goal.info.determinism);
        info.purity = info.purity.worst(goal.info.purity);
        info.instmap_delta
            .bound
            .extend(goal.info.instmap_delta.bound.iter().copied());
        info.instmap_delta.unreachable |= goal.info.instmap_delta.unreachable;
    }
    info
}

/// The variables bound on every reachable branch
fn common_bound<'a>(branches: impl IntoIterator<Item = &'a Goal>) -> InstmapDelta {
    let mut bound: Option<BTreeSet<ProgVar>> = None;
    for branch in branches {
        if branch.info.instmap_delta.unreachable {
            continue;
        }
        let branch_bound = &branch.info.instmap_delta.bound;
        bound = Some(match bound {
            None => branch_bound.clone(),
            Some(bound) => bound.intersection(branch_bound).copied().collect(),
        });
    }

    match bound {
        Some(bound) => InstmapDelta {
            bound,
            unreachable: false,
        },
        None => InstmapDelta::unreachable(),
    }
}

/// Plain conjunction; nested plain conjunctions are flattened and a
/// single conjunct is returned as is
pub fn conj(goals: Vec<Goal>, context: Context) -> Goal {
    let mut flat = Vec::with_capacity(goals.len());
    for goal in goals {
        match goal.expr {
            GoalExpr::Conj(ConjKind::Plain, inner) => flat.extend(inner),
            expr => flat.push(Goal {
                expr,
                info: goal.info,
            }),
        }
    }

    if flat.len() == 1 {
        return flat.pop().unwrap_or_else(|| true_goal(context));
    }

    let info = combine_sequential(&flat, context);
    finish(GoalExpr::Conj(ConjKind::Plain, flat), info)
}

pub fn par_conj(goals: Vec<Goal>, context: Context) -> Goal {
    let info = combine_sequential(&goals, context);
    finish(GoalExpr::Conj(ConjKind::Parallel, goals), info)
}

pub fn disj(goals: Vec<Goal>, context: Context) -> Goal {
    if goals.is_empty() {
        return fail_goal(context);
    }

    let mut info = GoalInfo::new(Determinism::Failure, context);
    for goal in &goals {
        info.determinism = info.determinism.disjoin(goal.info.determinism);
        info.purity = info.purity.worst(goal.info.purity);
    }
    info.instmap_delta = common_bound(&goals);
    finish(GoalExpr::Disj(goals), info)
}

pub fn negation(goal: Goal, context: Context) -> Goal {
    let mut info = GoalInfo::new(Determinism::Semidet, context);
    info.purity = goal.info.purity;
    finish(GoalExpr::Negation(Box::new(goal)), info)
}

pub fn ite(cond: Goal, then: Goal, else_: Goal, context: Context) -> Goal {
    let then_det = cond.info.determinism.conjoin(then.info.determinism);
    let can_fail = then.info.determinism.can_fail() || else_.info.determinism.can_fail();
    let max = then_det
        .max_solutions()
        .max(else_.info.determinism.max_solutions());

    let mut info = GoalInfo::new(Determinism::from_components(can_fail, max), context);
    info.purity = cond
        .info
        .purity
        .worst(then.info.purity)
        .worst(else_.info.purity);

    let mut then_branch = then.clone();
    then_branch
        .info
        .instmap_delta
        .bound
        .extend(cond.info.instmap_delta.bound.iter().copied());
    info.instmap_delta = common_bound([&then_branch, &else_]);

    finish(
        GoalExpr::IfThenElse(Box::new(IfThenElse {
            vars: Vec::new(),
            cond,
            then,
            else_,
        })),
        info,
    )
}

pub fn switch(var: ProgVar, cases: Vec<Case>, can_fail: bool, context: Context) -> Goal {
    let determinism = cases
        .iter()
        .map(|case| case.goal.info.determinism)
        .reduce(Determinism::switch_join)
        .unwrap_or(Determinism::Failure);
    let determinism = if can_fail {
        Determinism::from_components(true, determinism.max_solutions())
    } else {
        determinism
    };

    let mut info = GoalInfo::new(determinism, context);
    for case in &cases {
        info.purity = info.purity.worst(case.goal.info.purity);
    }
    info.instmap_delta = common_bound(cases.iter().map(|case| &case.goal));

    finish(
        GoalExpr::Switch(Switch {
            var,
            can_fail,
            cases,
        }),
        info,
    )
}

pub fn scope(reason: ScopeReason, goal: Goal, context: Context) -> Goal {
    let mut info = goal.info.clone();
    info.context = context;
    match &reason {
        ScopeReason::Promise(purity) => info.purity = *purity,
        ScopeReason::Exists(_) => {}
    }
    finish(GoalExpr::Scope(reason, Box::new(goal)), info)
}

/// `var = cons_id(args)`, constructing `var`
pub fn construct(var: ProgVar, cons_id: ConsId, args: Vec<ProgVar>, context: Context) -> Goal {
    let mut info = GoalInfo::new(Determinism::Det, context);
    info.instmap_delta = InstmapDelta::binding([var]);
    finish(
        GoalExpr::Unify(Unify {
            lhs: var,
            rhs: UnifyRhs::Functor {
                cons_id: cons_id.clone(),
                args: args.clone(),
            },
            kind: Unification::Construct { var, cons_id, args },
        }),
        info,
    )
}

/// `var = cons_id(args)`, testing an already bound `var` and binding `args`
pub fn deconstruct(
    var: ProgVar,
    cons_id: ConsId,
    args: Vec<ProgVar>,
    can_fail: bool,
    context: Context,
) -> Goal {
    let determinism = if can_fail {
        Determinism::Semidet
    } else {
        Determinism::Det
    };
    let mut info = GoalInfo::new(determinism, context);
    info.instmap_delta = InstmapDelta::binding(args.iter().copied());
    finish(
        GoalExpr::Unify(Unify {
            lhs: var,
            rhs: UnifyRhs::Functor {
                cons_id: cons_id.clone(),
                args: args.clone(),
            },
            kind: Unification::Deconstruct {
                var,
                cons_id,
                args,
                can_fail,
            },
        }),
        info,
    )
}

/// `to := from`
pub fn assign(to: ProgVar, from: ProgVar, context: Context) -> Goal {
    let mut info = GoalInfo::new(Determinism::Det, context);
    info.instmap_delta = InstmapDelta::binding([to]);
    finish(
        GoalExpr::Unify(Unify {
            lhs: to,
            rhs: UnifyRhs::Var(from),
            kind: Unification::Assign { to, from },
        }),
        info,
    )
}

/// `left == right`, comparing two bound values of an atomic type
pub fn simple_test(left: ProgVar, right: ProgVar, context: Context) -> Goal {
    finish(
        GoalExpr::Unify(Unify {
            lhs: left,
            rhs: UnifyRhs::Var(right),
            kind: Unification::SimpleTest { left, right },
        }),
        GoalInfo::new(Determinism::Semidet, context),
    )
}

pub fn int_const(var: ProgVar, value: i64, context: Context) -> Goal {
    construct(var, ConsId::int(value), Vec::new(), context)
}

pub fn string_const(var: ProgVar, value: &str, context: Context) -> Goal {
    construct(var, ConsId::string(value), Vec::new(), context)
}

pub struct CallShape {
    pub determinism: Determinism,
    pub purity: Purity,
}

impl CallShape {
    pub fn det() -> Self {
        Self {
            determinism: Determinism::Det,
            purity: Purity::Pure,
        }
    }

    pub fn with_determinism(mut self, determinism: Determinism) -> Self {
        self.determinism = determinism;
        self
    }

    pub fn with_purity(mut self, purity: Purity) -> Self {
        self.purity = purity;
        self
    }
}

pub fn plain_call(
    callee: PredProcId,
    name: SymName,
    args: Vec<ProgVar>,
    outputs: impl IntoIterator<Item = ProgVar>,
    shape: CallShape,
    context: Context,
) -> Goal {
    let mut info = GoalInfo::new(shape.determinism, context);
    info.purity = shape.purity;
    info.instmap_delta = InstmapDelta::binding(outputs);
    if shape.determinism.max_solutions() == MaxSolutions::Zero {
        info.instmap_delta.unreachable = true;
    }
    finish(
        GoalExpr::PlainCall(PlainCall {
            callee,
            name,
            args,
        }),
        info,
    )
}

pub fn foreign_call(
    callee: PredProcId,
    attributes: ForeignAttributes,
    args: Vec<ForeignArg>,
    code: String,
    shape: CallShape,
    context: Context,
) -> Goal {
    let mut info = GoalInfo::new(shape.determinism, context);
    info.purity = shape.purity;
    info.instmap_delta =
        InstmapDelta::binding(args.iter().filter(|arg| arg.mode.is_output()).map(|arg| arg.var));
    finish(
        GoalExpr::ForeignProc(ForeignProc {
            callee,
            attributes,
            args,
            extra_args: Vec::new(),
            code,
        }),
        info,
    )
}

pub fn generic_call(
    kind: GenericCallKind,
    args: Vec<ProgVar>,
    modes: Vec<ArgMode>,
    shape: CallShape,
    context: Context,
) -> Goal {
    let mut info = GoalInfo::new(shape.determinism, context);
    info.purity = shape.purity;
    info.instmap_delta = InstmapDelta::binding(
        args.iter()
            .zip(&modes)
            .filter(|(_, mode)| mode.is_output())
            .map(|(var, _)| *var),
    );
    finish(GoalExpr::GenericCall(GenericCall { kind, args, modes }), info)
}

/// `lhs = rhs` on values of a type that needs its own unification predicate
pub fn complicated_unify(lhs: ProgVar, rhs: ProgVar, context: Context) -> Goal {
    finish(
        GoalExpr::Unify(Unify {
            lhs,
            rhs: UnifyRhs::Var(rhs),
            kind: Unification::Complicated {
                can_fail: true,
                type_info_vars: Vec::new(),
            },
        }),
        GoalInfo::new(Determinism::Semidet, context),
    )
}

/// Conjoins setup goals in front of `goal`. The result keeps `goal`'s
/// context, and its non-locals are those of `goal` plus whatever the setup
/// goals need from outside, minus the variables the setup goals bind.
pub fn conj_with_setup(setup: Vec<Goal>, goal: Goal) -> Goal {
    if setup.is_empty() {
        return goal;
    }

    let context = goal.info.context;
    let mut setup_bound = BTreeSet::new();
    let mut setup_needs = BTreeSet::new();
    for setup_goal in &setup {
        for var in &setup_goal.info.nonlocals {
            if !setup_bound.contains(var) {
                setup_needs.insert(*var);
            }
        }
        setup_bound.extend(setup_goal.info.instmap_delta.bound.iter().copied());
    }

    let mut nonlocals = goal.info.nonlocals.clone();
    for var in &setup_bound {
        nonlocals.remove(var);
    }
    nonlocals.extend(setup_needs.difference(&setup_bound).copied());

    let mut goals = setup;
    goals.push(goal);
    let mut result = conj(goals, context);
    result.info.nonlocals = nonlocals;
    result
}
