//! Quantification: which variables of a goal are free, and which of those are
//! visible outside it (the goal's non-locals).
//!
//! The transformation passes keep non-local sets up to date incrementally
//! where they can. When a rewrite may have introduced variables in places the
//! incremental update can't see (witnesses captured by lambdas, witnesses of
//! existential types produced after a body), the whole body is requantified
//! with [`requantify`] against the procedure's head variables.

use std::collections::BTreeSet;

use super::{
    goal::{GenericCallKind, Goal, GoalExpr, ScopeReason, Unification, UnifyRhs},
    id::ProgVar,
};

/// Variables occurring free in a goal: everything it mentions that isn't
/// explicitly quantified inside it (lambda arguments, `some` scopes, the
/// local variables of an if-then-else)
pub fn free_vars(goal: &Goal) -> BTreeSet<ProgVar> {
    let mut vars = BTreeSet::new();
    collect_free_vars(goal, &mut vars);
    vars
}

fn collect_free_vars(goal: &Goal, vars: &mut BTreeSet<ProgVar>) {
    match &goal.expr {
        GoalExpr::Conj(_, goals) | GoalExpr::Disj(goals) => {
            for goal in goals {
                collect_free_vars(goal, vars);
            }
        }
        GoalExpr::Switch(switch) => {
            vars.insert(switch.var);
            for case in &switch.cases {
                collect_free_vars(&case.goal, vars);
            }
        }
        GoalExpr::Negation(goal) => collect_free_vars(goal, vars),
        GoalExpr::IfThenElse(ite) => {
            let mut local = free_vars(&ite.cond);
            local.extend(free_vars(&ite.then));
            for var in &ite.vars {
                local.remove(var);
            }
            vars.extend(local);
            collect_free_vars(&ite.else_, vars);
        }
        GoalExpr::Scope(ScopeReason::Exists(quantified), goal) => {
            let mut inner = free_vars(goal);
            for var in quantified {
                inner.remove(var);
            }
            vars.extend(inner);
        }
        GoalExpr::Scope(_, goal) => collect_free_vars(goal, vars),
        GoalExpr::PlainCall(call) => vars.extend(call.args.iter().copied()),
        GoalExpr::GenericCall(call) => {
            if let GenericCallKind::HigherOrder { closure } = call.kind {
                vars.insert(closure);
            }
            vars.extend(call.args.iter().copied());
        }
        GoalExpr::ForeignProc(foreign) => {
            vars.extend(foreign.args.iter().map(|arg| arg.var));
            vars.extend(foreign.extra_args.iter().map(|arg| arg.var));
        }
        GoalExpr::Unify(unify) => {
            vars.insert(unify.lhs);
            match &unify.rhs {
                UnifyRhs::Var(var) => {
                    vars.insert(*var);
                }
                UnifyRhs::Functor { args, .. } => vars.extend(args.iter().copied()),
                UnifyRhs::Lambda(lambda) => {
                    let mut inner = free_vars(&lambda.body);
                    for arg in &lambda.args {
                        inner.remove(arg);
                    }
                    vars.extend(inner);
                }
            }
            if let Unification::Complicated { type_info_vars, .. } = &unify.kind {
                vars.extend(type_info_vars.iter().copied());
            }
        }
    }
}

/// Recomputes the non-local set of `goal` and of every goal inside it, given
/// the variables visible outside of it
pub fn requantify(goal: Goal, outside: &BTreeSet<ProgVar>) -> Goal {
    let Goal { expr, mut info } = goal;

    let expr = match expr {
        GoalExpr::Conj(kind, goals) => {
            let frees: Vec<_> = goals.iter().map(free_vars).collect();
            let goals = goals
                .into_iter()
                .enumerate()
                .map(|(i, goal)| {
                    let mut goal_outside = outside.clone();
                    for (j, free) in frees.iter().enumerate() {
                        if i != j {
                            goal_outside.extend(free.iter().copied());
                        }
                    }
                    requantify(goal, &goal_outside)
                })
                .collect();
            GoalExpr::Conj(kind, goals)
        }
        GoalExpr::Disj(goals) => GoalExpr::Disj(
            goals
                .into_iter()
                .map(|goal| requantify(goal, outside))
                .collect(),
        ),
        GoalExpr::Switch(mut switch) => {
            let mut case_outside = outside.clone();
            case_outside.insert(switch.var);
            switch.cases = switch
                .cases
                .into_iter()
                .map(|mut case| {
                    case.goal = requantify(case.goal, &case_outside);
                    case
                })
                .collect();
            GoalExpr::Switch(switch)
        }
        GoalExpr::Negation(goal) => GoalExpr::Negation(Box::new(requantify(*goal, outside))),
        GoalExpr::IfThenElse(mut ite) => {
            // The local variables shadow any outer variable of the same
            // name in the condition and the then branch, but not in the else
            let mut local_outside = outside.clone();
            for var in &ite.vars {
                local_outside.remove(var);
            }

            let mut cond_outside = local_outside.clone();
            cond_outside.extend(free_vars(&ite.then));

            let mut then_outside = local_outside;
            then_outside.extend(free_vars(&ite.cond));

            ite.cond = requantify(ite.cond, &cond_outside);
            ite.then = requantify(ite.then, &then_outside);
            ite.else_ = requantify(ite.else_, outside);
            GoalExpr::IfThenElse(ite)
        }
        GoalExpr::Scope(reason, goal) => {
            let mut inner_outside = outside.clone();
            if let ScopeReason::Exists(quantified) = &reason {
                for var in quantified {
                    inner_outside.remove(var);
                }
            }
            GoalExpr::Scope(reason, Box::new(requantify(*goal, &inner_outside)))
        }
        GoalExpr::Unify(mut unify) => {
            if let UnifyRhs::Lambda(lambda) = &mut unify.rhs {
                let mut captured = free_vars(&lambda.body);
                for arg in &lambda.args {
                    captured.remove(arg);
                }
                lambda.nonlocals = captured.iter().copied().collect();

                let mut body_outside = captured;
                body_outside.extend(lambda.args.iter().copied());
                let body = std::mem::replace(&mut lambda.body, placeholder_goal());
                lambda.body = requantify(body, &body_outside);
            }
            GoalExpr::Unify(unify)
        }
        atomic @ (GoalExpr::PlainCall(_) | GoalExpr::GenericCall(_) | GoalExpr::ForeignProc(_)) => {
            atomic
        }
    };

    let goal = Goal { expr, info: info.clone() };
    info.nonlocals = free_vars(&goal)
        .intersection(outside)
        .copied()
        .collect();

    Goal {
        expr: goal.expr,
        info,
    }
}

fn placeholder_goal() -> Goal {
    super::goal_util::true_goal(super::id::Context::dummy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::Index,
        middle::hlds::{
            goal::ConsId,
            goal::ScopeReason,
            goal_util::{conj, construct, ite, negation, scope, simple_test},
            id::Context,
        },
    };

    fn var(n: usize) -> ProgVar {
        ProgVar::new(n)
    }

    #[test]
    fn conjunct_nonlocals_include_variables_shared_with_siblings() {
        let context = Context::dummy();
        let body = conj(
            vec![
                construct(var(2), ConsId::int(1), vec![], context),
                construct(var(0), ConsId::Tuple(1), vec![var(2)], context),
            ],
            context,
        );

        let body = requantify(body, &BTreeSet::from([var(0)]));

        let GoalExpr::Conj(_, goals) = &body.expr else {
            panic!("expected conjunction");
        };
        assert_eq!(body.info.nonlocals, BTreeSet::from([var(0)]));
        assert_eq!(goals[0].info.nonlocals, BTreeSet::from([var(2)]));
        assert_eq!(goals[1].info.nonlocals, BTreeSet::from([var(0), var(2)]));
    }

    #[test]
    fn if_then_else_locals_are_not_free() {
        let context = Context::dummy();
        let mut goal = ite(
            construct(var(5), ConsId::int(1), vec![], context),
            construct(var(0), ConsId::Tuple(1), vec![var(5)], context),
            construct(var(0), ConsId::int(2), vec![], context),
            context,
        );
        if let GoalExpr::IfThenElse(ite) = &mut goal.expr {
            ite.vars = vec![var(5)];
        }

        assert_eq!(free_vars(&goal), BTreeSet::from([var(0)]));
    }

    #[test]
    fn condition_does_not_export_variables_only_the_else_branch_uses() {
        let context = Context::dummy();
        let goal = ite(
            conj(
                vec![
                    construct(var(7), ConsId::int(3), vec![], context),
                    construct(var(5), ConsId::Tuple(1), vec![var(7)], context),
                ],
                context,
            ),
            construct(var(0), ConsId::Tuple(1), vec![var(5)], context),
            conj(
                vec![
                    construct(var(7), ConsId::int(4), vec![], context),
                    construct(var(0), ConsId::Tuple(1), vec![var(7)], context),
                ],
                context,
            ),
            context,
        );

        let goal = requantify(goal, &BTreeSet::from([var(0)]));

        let GoalExpr::IfThenElse(ite) = &goal.expr else {
            panic!("expected if-then-else");
        };
        assert_eq!(ite.cond.info.nonlocals, BTreeSet::from([var(5)]));
        assert_eq!(ite.then.info.nonlocals, BTreeSet::from([var(0), var(5)]));
        assert_eq!(ite.else_.info.nonlocals, BTreeSet::from([var(0)]));
    }

    #[test]
    fn if_then_else_locals_shadow_outer_variables() {
        let context = Context::dummy();
        let mut goal = ite(
            construct(var(5), ConsId::int(1), vec![], context),
            construct(var(0), ConsId::int(2), vec![], context),
            construct(var(0), ConsId::int(3), vec![], context),
            context,
        );
        if let GoalExpr::IfThenElse(ite) = &mut goal.expr {
            ite.vars = vec![var(5)];
        }

        let goal = requantify(goal, &BTreeSet::from([var(0), var(5)]));

        let GoalExpr::IfThenElse(ite) = &goal.expr else {
            panic!("expected if-then-else");
        };
        assert!(ite.cond.info.nonlocals.is_empty());
        assert_eq!(goal.info.nonlocals, BTreeSet::from([var(0)]));
    }

    #[test]
    fn existential_scope_hides_its_variables_from_the_outside() {
        let context = Context::dummy();
        let goal = scope(
            ScopeReason::Exists(vec![var(1)]),
            conj(
                vec![
                    construct(var(1), ConsId::int(0), vec![], context),
                    negation(simple_test(var(0), var(1), context), context),
                ],
                context,
            ),
            context,
        );
        assert_eq!(free_vars(&goal), BTreeSet::from([var(0)]));

        let goal = requantify(goal, &BTreeSet::from([var(0), var(1)]));

        let GoalExpr::Scope(_, inner) = &goal.expr else {
            panic!("expected scope");
        };
        assert_eq!(goal.info.nonlocals, BTreeSet::from([var(0)]));
        assert_eq!(inner.info.nonlocals, BTreeSet::from([var(0)]));
        let GoalExpr::Conj(_, goals) = &inner.expr else {
            panic!("expected conjunction");
        };
        assert_eq!(goals[1].info.nonlocals, BTreeSet::from([var(0), var(1)]));
    }
}
