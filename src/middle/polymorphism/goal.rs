//! The goal transformer: threads witness synthesis through a procedure body.
//!
//! Compound goals are rebuilt around their transformed children and pick up
//! whichever witnesses of the enclosing procedure the children started to
//! refer to. Calls, foreign code, tuple insertions and unifications with
//! existentially typed constructors get witness arguments, with the goals
//! building them conjoined in front.

use std::collections::BTreeSet;

use log::trace;

use super::{info::PolyInfo, signature::num_extra_args};
use crate::{
    frontend::intern::InternedSymbol,
    middle::{
        diag::internal_error,
        hlds::{
            class::{ClassConstraint, constraint_list_type_vars},
            goal::{
                ArgMode, Case, ConjKind, ConsId, ForeignArg, ForeignProc, GenericCall,
                GenericCallKind, Goal, GoalExpr, GoalInfo, IfThenElse, Lambda, PlainCall,
                Unification, Unify, UnifyRhs,
            },
            goal_util::{CallShape, conj_with_setup, plain_call},
            id::{Context, PredProcId, ProgVar, SymName, TypeVar},
            module::TypeInfoLocn,
            quantification::free_vars,
            types::{Type, type_list_subsumes},
        },
    },
};

impl PolyInfo<'_> {
    pub fn transform_goal(&mut self, goal: Goal) -> Goal {
        let Goal { expr, mut info } = goal;
        let expr = match expr {
            GoalExpr::Conj(kind, goals) => {
                let mut conjuncts = Vec::with_capacity(goals.len());
                for goal in goals {
                    let goal = self.transform_goal(goal);
                    self.absorb_witnesses(&mut info.nonlocals, &goal);
                    match goal.expr {
                        GoalExpr::Conj(ConjKind::Plain, inner) if kind == ConjKind::Plain => {
                            conjuncts.extend(inner)
                        }
                        expr => conjuncts.push(Goal {
                            expr,
                            info: goal.info,
                        }),
                    }
                }
                GoalExpr::Conj(kind, conjuncts)
            }
            GoalExpr::Disj(goals) => GoalExpr::Disj(
                goals
                    .into_iter()
                    .map(|goal| self.transform_child(goal, &mut info.nonlocals))
                    .collect(),
            ),
            GoalExpr::Switch(mut switch) => {
                switch.cases = switch
                    .cases
                    .into_iter()
                    .map(|case| Case {
                        cons_id: case.cons_id,
                        goal: self.transform_child(case.goal, &mut info.nonlocals),
                    })
                    .collect();
                GoalExpr::Switch(switch)
            }
            GoalExpr::Negation(goal) => {
                GoalExpr::Negation(Box::new(self.transform_child(*goal, &mut info.nonlocals)))
            }
            GoalExpr::IfThenElse(ite) => {
                let IfThenElse {
                    vars,
                    cond,
                    then,
                    else_,
                } = *ite;
                GoalExpr::IfThenElse(Box::new(IfThenElse {
                    vars,
                    cond: self.transform_child(cond, &mut info.nonlocals),
                    then: self.transform_child(then, &mut info.nonlocals),
                    else_: self.transform_child(else_, &mut info.nonlocals),
                }))
            }
            GoalExpr::Scope(reason, goal) => {
                GoalExpr::Scope(reason, Box::new(self.transform_child(*goal, &mut info.nonlocals)))
            }
            GoalExpr::PlainCall(call) => return self.transform_plain_call(call, info),
            GoalExpr::GenericCall(call) => return self.transform_generic_call(call, info),
            GoalExpr::ForeignProc(foreign) => return self.transform_foreign_proc(foreign, info),
            GoalExpr::Unify(unify) => return self.transform_unify(unify, info),
        };
        Goal { expr, info }
    }

    fn transform_child(&mut self, goal: Goal, nonlocals: &mut BTreeSet<ProgVar>) -> Goal {
        let goal = self.transform_goal(goal);
        self.absorb_witnesses(nonlocals, &goal);
        goal
    }

    fn absorb_witnesses(&self, nonlocals: &mut BTreeSet<ProgVar>, child: &Goal) {
        nonlocals.extend(
            child
                .info
                .nonlocals
                .iter()
                .copied()
                .filter(|var| self.is_outer_witness(*var)),
        );
    }

    fn transform_plain_call(&mut self, mut call: PlainCall, mut info: GoalInfo) -> Goal {
        let module_info = self.module_info;
        let callee = module_info.pred(call.callee.pred_id);
        if callee.is_exempt_from_polymorphism() || num_extra_args(callee) == 0 {
            return Goal {
                expr: GoalExpr::PlainCall(call),
                info,
            };
        }

        let witnesses = self.call_witnesses(callee, &call.args, info.context);
        trace!("call of {}: witnesses {:?}", call.name, witnesses.vars);

        let mut args = witnesses.vars.clone();
        args.append(&mut call.args);
        call.args = args;
        info.nonlocals.extend(witnesses.vars.iter().copied());
        info.instmap_delta.bound.extend(witnesses.outputs.iter().copied());

        conj_with_setup(
            witnesses.setup,
            Goal {
                expr: GoalExpr::PlainCall(call),
                info,
            },
        )
    }

    fn transform_generic_call(&mut self, mut call: GenericCall, mut info: GoalInfo) -> Goal {
        // Closures and method tables carry their own witnesses; only tuple
        // insertion needs the types of the tuple's values
        let GenericCallKind::TupleInsert { .. } = call.kind else {
            return Goal {
                expr: GoalExpr::GenericCall(call),
                info,
            };
        };

        let Some(num_values) = call.args.len().checked_sub(2) else {
            internal_error!(self.pred_desc(), "tuple insertion without a relation state");
        };
        let types = self.var_types(&call.args[..num_values]);
        let (type_infos, setup) = self.make_type_info_vars(&types, info.context);

        let mut args = type_infos.clone();
        args.append(&mut call.args);
        call.args = args;
        let mut modes = vec![ArgMode::In; type_infos.len()];
        modes.append(&mut call.modes);
        call.modes = modes;
        info.nonlocals.extend(type_infos);

        conj_with_setup(
            setup,
            Goal {
                expr: GoalExpr::GenericCall(call),
                info,
            },
        )
    }

    fn transform_foreign_proc(&mut self, mut foreign: ForeignProc, mut info: GoalInfo) -> Goal {
        let module_info = self.module_info;
        let callee = module_info.pred(foreign.callee.pred_id);
        if callee.is_exempt_from_polymorphism() || num_extra_args(callee) == 0 {
            return Goal {
                expr: GoalExpr::ForeignProc(foreign),
                info,
            };
        }

        let arg_vars: Vec<_> = foreign.args.iter().map(|arg| arg.var).collect();
        let witnesses = self.call_witnesses(callee, &arg_vars, info.context);

        let mut args: Vec<_> = witnesses
            .vars
            .iter()
            .zip(&witnesses.foreign_names)
            .map(|(var, name)| {
                let is_output = witnesses.outputs.contains(var);
                ForeignArg {
                    var: *var,
                    name: Some(InternedSymbol::new(name)),
                    mode: if is_output { ArgMode::Out } else { ArgMode::In },
                }
            })
            .collect();
        args.append(&mut foreign.args);
        foreign.args = args;
        info.nonlocals.extend(witnesses.vars.iter().copied());
        info.instmap_delta.bound.extend(witnesses.outputs.iter().copied());

        conj_with_setup(
            witnesses.setup,
            Goal {
                expr: GoalExpr::ForeignProc(foreign),
                info,
            },
        )
    }

    fn transform_unify(&mut self, mut unify: Unify, mut info: GoalInfo) -> Goal {
        match unify.rhs {
            UnifyRhs::Var(_) => {
                if let Unification::Complicated { type_info_vars, .. } = &mut unify.kind {
                    // Lowering the unification to a call of the type's
                    // unification predicate will pass these
                    let ty = self.var_table.ty(unify.lhs).clone();
                    *type_info_vars = ty
                        .type_vars()
                        .into_iter()
                        .map(|tvar| self.type_var_witness_holder(tvar))
                        .collect();
                    info.nonlocals.extend(type_info_vars.iter().copied());
                }
                Goal {
                    expr: GoalExpr::Unify(unify),
                    info,
                }
            }
            UnifyRhs::Lambda(lambda) => {
                let lambda = self.transform_lambda(*lambda);
                info.nonlocals.extend(lambda.nonlocals.iter().copied());
                unify.rhs = UnifyRhs::Lambda(Box::new(lambda));
                Goal {
                    expr: GoalExpr::Unify(unify),
                    info,
                }
            }
            UnifyRhs::Functor {
                cons_id: ConsId::Closure(callee),
                ref args,
                ..
            } if self.closure_needs_witnesses(callee) => {
                let lambda = self.closure_to_lambda(unify.lhs, callee, args.clone(), info.context);
                unify.rhs = UnifyRhs::Lambda(Box::new(lambda));
                self.transform_unify(unify, info)
            }
            UnifyRhs::Functor {
                cons_id: ConsId::Cons(name, arity),
                ..
            } => self.transform_functor_unify(unify, name, arity, info),
            UnifyRhs::Functor { .. } => Goal {
                expr: GoalExpr::Unify(unify),
                info,
            },
        }
    }

    /// The variable to pass for the type-info of `tvar`: either the type-info
    /// itself or the typeclass-info it lives in
    fn type_var_witness_holder(&mut self, tvar: TypeVar) -> ProgVar {
        match self.rtti_varmaps.type_info_locations.get(&tvar) {
            Some(locn) => locn.var(),
            // A miss allocates the head variable and emits no goals
            None => self.make_type_info_var(&Type::Variable(tvar), Context::dummy(), &mut Vec::new()),
        }
    }

    fn transform_lambda(&mut self, lambda: Lambda) -> Lambda {
        let Lambda {
            purity,
            pred_or_func,
            nonlocals,
            args,
            modes,
            determinism,
            body,
        } = lambda;
        let body = self.transform_goal(body);

        let mut captured = nonlocals;
        for var in free_vars(&body) {
            if !args.contains(&var) && !captured.contains(&var) && self.is_outer_witness(var) {
                captured.push(var);
            }
        }

        Lambda {
            purity,
            pred_or_func,
            nonlocals: captured,
            args,
            modes,
            determinism,
            body,
        }
    }

    fn closure_needs_witnesses(&self, callee: PredProcId) -> bool {
        num_extra_args(self.module_info.pred(callee.pred_id)) > 0
    }

    /// Rewrites `Var = p(Captured...)` into an explicit lambda calling `p`,
    /// so that the call inside it can be given witness arguments
    fn closure_to_lambda(
        &mut self,
        var: ProgVar,
        callee: PredProcId,
        captured: Vec<ProgVar>,
        context: Context,
    ) -> Lambda {
        let module_info = self.module_info;
        let callee_pred = module_info.pred(callee.pred_id);
        let callee_proc = module_info.proc(callee);

        let Type::HigherOrder { pred_or_func, args } = self.var_table.ty(var).clone() else {
            internal_error!(
                self.pred_desc(),
                "closure of {} assigned to {} of a first-order type",
                callee_pred.describe(),
                self.var_table.name(var)
            );
        };

        let lambda_args: Vec<_> = args
            .iter()
            .enumerate()
            .map(|(i, ty)| self.var_table.new_named(&format!("LambdaArg{}", i + 1), ty.clone()))
            .collect();
        let Some(num_captured) = callee_proc.arg_modes.len().checked_sub(lambda_args.len()) else {
            internal_error!(self.pred_desc(), "closure of {} has too many arguments", callee_pred.describe());
        };
        let modes = callee_proc.arg_modes[num_captured..].to_vec();
        let outputs: Vec<_> = lambda_args
            .iter()
            .zip(&modes)
            .filter(|(_, mode)| mode.is_output())
            .map(|(var, _)| *var)
            .collect();

        let mut call_args = captured.clone();
        call_args.extend(&lambda_args);
        let body = plain_call(
            callee,
            callee_pred.sym_name(),
            call_args,
            outputs,
            CallShape::det().with_determinism(callee_proc.determinism),
            context,
        );

        trace!("closure of {} becomes a lambda", callee_pred.describe());
        Lambda {
            purity: body.info.purity,
            pred_or_func,
            nonlocals: captured,
            args: lambda_args,
            modes,
            determinism: callee_proc.determinism,
            body,
        }
    }

    fn transform_functor_unify(
        &mut self,
        mut unify: Unify,
        name: SymName,
        arity: usize,
        mut info: GoalInfo,
    ) -> Goal {
        let module_info = self.module_info;
        let lhs_type = self.var_table.ty(unify.lhs).clone();
        let Some((defn, ctor)) = module_info
            .find_ctor(&lhs_type, name, arity)
            .filter(|(_, ctor)| !ctor.exist_tvars.is_empty() || !ctor.constraints.is_empty())
        else {
            return Goal {
                expr: GoalExpr::Unify(unify),
                info,
            };
        };
        let UnifyRhs::Functor { args, .. } = &unify.rhs else {
            return Goal {
                expr: GoalExpr::Unify(unify),
                info,
            };
        };

        // Solve the constructor's type variables against the actual types
        let renaming = self.tvarset.merge(&defn.tvarset);
        let mut general: Vec<_> = defn
            .params
            .iter()
            .map(|param| Type::Variable(*param).apply_renaming(&renaming))
            .collect();
        general.extend(ctor.args.iter().map(|ty| ty.apply_renaming(&renaming)));
        let mut specific = lhs_type.args().to_vec();
        specific.extend(self.var_types(args));
        let subst = type_list_subsumes(&general, &specific).unwrap_or_else(|err| {
            internal_error!(
                self.pred_desc(),
                "arguments of {} do not match its declaration: {err}",
                ctor.name
            )
        });

        let constraints: Vec<_> = ctor
            .constraints
            .iter()
            .map(|constraint| constraint.apply_renaming(&renaming).apply_subst(&subst))
            .collect();
        let constrained = constraint_list_type_vars(&ctor.constraints);
        let exist_types: Vec<_> = ctor
            .exist_tvars
            .iter()
            .filter(|tvar| !constrained.contains(tvar))
            .map(|tvar| Type::Variable(*tvar).apply_renaming(&renaming).apply_subst(&subst))
            .collect();

        let is_construction = matches!(unify.kind, Unification::Construct { .. });
        let (extra_args, setup) = if is_construction {
            self.produce_functor_witnesses(&exist_types, &constraints, info.context)
        } else {
            let extra_args = self.consume_functor_witnesses(&exist_types, &constraints);
            info.instmap_delta.bound.extend(extra_args.iter().copied());
            (extra_args, Vec::new())
        };
        trace!("unification with {}: witnesses {extra_args:?}", ctor.name);

        let prepend = |args: &mut Vec<ProgVar>| {
            let mut new_args = extra_args.clone();
            new_args.append(args);
            *args = new_args;
        };
        if let UnifyRhs::Functor { args, .. } = &mut unify.rhs {
            prepend(args);
        }
        match &mut unify.kind {
            Unification::Construct { args, .. } | Unification::Deconstruct { args, .. } => prepend(args),
            _ => {}
        }
        info.nonlocals.extend(extra_args.iter().copied());

        conj_with_setup(
            setup,
            Goal {
                expr: GoalExpr::Unify(unify),
                info,
            },
        )
    }

    /// Constructions pass the witnesses of the types the arguments actually
    /// have: type-infos first, then typeclass-infos
    fn produce_functor_witnesses(
        &mut self,
        exist_types: &[Type],
        constraints: &[ClassConstraint],
        context: Context,
    ) -> (Vec<ProgVar>, Vec<Goal>) {
        let (mut vars, mut setup) = self.make_type_info_vars(exist_types, context);
        let (typeclass_infos, goals) = self.make_typeclass_info_vars(constraints, context);
        vars.extend(typeclass_infos);
        setup.extend(goals);
        (vars, setup)
    }

    /// Deconstructions bind fresh witness variables, which become the
    /// witnesses of the types the arguments were found to have
    fn consume_functor_witnesses(
        &mut self,
        exist_types: &[Type],
        constraints: &[ClassConstraint],
    ) -> Vec<ProgVar> {
        let mut vars = Vec::new();
        for ty in exist_types {
            let name = match ty {
                Type::Variable(tvar) => self.tvarset.var_name(*tvar),
                _ => "exist".to_string(),
            };
            let var = self.new_type_info_var(&format!("TypeInfo_for_{name}"));
            if let Type::Variable(tvar) = ty {
                self.rtti_varmaps
                    .type_info_locations
                    .entry(*tvar)
                    .or_insert(TypeInfoLocn::Direct(var));
            }
            vars.push(var);
        }
        for constraint in constraints {
            let var = self.new_typeclass_info_var(&format!("TypeClassInfo_for_{}", constraint.class.name));
            self.record_typeclass_info(constraint, var);
            vars.push(var);
        }
        vars
    }
}
