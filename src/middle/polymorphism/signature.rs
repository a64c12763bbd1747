//! Extra witness parameters of procedure signatures and call sites.
//!
//! Every polymorphic procedure takes its witnesses in front of its declared
//! arguments, in this order:
//!
//! 1. typeclass-infos for the universal constraints
//! 2. typeclass-infos for the existential constraints
//! 3. type-infos for the unconstrained universal type variables
//! 4. type-infos for the unconstrained existential type variables
//!
//! Universal witnesses are inputs and existential witnesses are outputs.
//! Declarations and call sites compute this list independently, so both go
//! through [`extra_arg_tvars`].

use log::trace;

use super::info::PolyInfo;
use crate::middle::{
    diag::internal_error,
    hlds::{
        class::{ClassConstraint, ClassContext, constraint_list_type_vars},
        goal::{ArgMode, Goal},
        goal_util::assign,
        id::{Context, ProgVar, TypeVar},
        module::{PredInfo, PredOrigin, ProcInfo, TypeInfoLocn},
        types::{Type, TypeSubst, type_list_subsumes, type_list_vars},
    },
};

/// Type variables needing a type-info of their own because no constraint
/// carries one for them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraArgTvars {
    pub universal: Vec<TypeVar>,
    pub existential: Vec<TypeVar>,
}

impl ExtraArgTvars {
    pub fn len(&self) -> usize {
        self.universal.len() + self.existential.len()
    }
}

pub fn extra_arg_tvars(
    arg_types: &[Type],
    exist_qvars: &[TypeVar],
    class_context: &ClassContext,
) -> ExtraArgTvars {
    let mut constrained = constraint_list_type_vars(&class_context.universal);
    constrained.extend(constraint_list_type_vars(&class_context.existential));

    let (existential, universal) = type_list_vars(arg_types)
        .into_iter()
        .filter(|tvar| !constrained.contains(tvar))
        .partition(|tvar| exist_qvars.contains(tvar));

    ExtraArgTvars {
        universal,
        existential,
    }
}

/// The number of witness arguments the procedures of `pred` take
pub fn num_extra_args(pred: &PredInfo) -> usize {
    if pred.is_exempt_from_polymorphism() {
        return 0;
    }
    pred.class_context.num_constraints() + extra_arg_tvars(&pred.arg_types, &pred.exist_qvars, &pred.class_context).len()
}

/// The head of a procedure after its witness parameters were added
#[derive(Debug, Clone)]
pub struct HeadWitnesses {
    pub head_vars: Vec<ProgVar>,
    pub arg_modes: Vec<ArgMode>,
    /// Witnesses the body must bind before the procedure exits
    pub exist_typeclass_info_vars: Vec<ProgVar>,
    pub exist_type_info_vars: Vec<ProgVar>,
    pub exist_tvars: Vec<TypeVar>,
}

/// Witnesses passed at one call site, in argument order
#[derive(Debug, Clone, Default)]
pub struct CallWitnesses {
    pub vars: Vec<ProgVar>,
    pub setup: Vec<Goal>,
    /// Existential witnesses bound by the call
    pub outputs: Vec<ProgVar>,
    /// Names the callee's foreign code uses for the witnesses
    pub foreign_names: Vec<String>,
}

impl PolyInfo<'_> {
    pub fn setup_headvars(&mut self, pred: &PredInfo, proc_info: &ProcInfo) -> HeadWitnesses {
        let tvars = extra_arg_tvars(&pred.arg_types, &pred.exist_qvars, &pred.class_context);

        // Existential typeclass-infos are allocated first so that the
        // universal ones, which the body reads, are numbered after them
        let exist_typeclass_info_vars: Vec<_> = pred
            .class_context
            .existential
            .iter()
            .map(|constraint| self.new_typeclass_info_var(&format!("TypeClassInfo_for_{}", constraint.class.name)))
            .collect();
        let univ_typeclass_info_vars: Vec<_> = pred
            .class_context
            .universal
            .iter()
            .map(|constraint| {
                let var = self.new_typeclass_info_var(&format!("TypeClassInfo_for_{}", constraint.class.name));
                self.record_typeclass_info(constraint, var);
                var
            })
            .collect();
        self.check_constrained_tvars_located(&pred.class_context.universal);

        let univ_type_info_vars: Vec<_> = tvars
            .universal
            .iter()
            .map(|tvar| {
                let var = self.new_type_info_var(&format!("TypeInfo_for_{}", self.tvarset.var_name(*tvar)));
                self.rtti_varmaps
                    .type_info_locations
                    .insert(*tvar, TypeInfoLocn::Direct(var));
                var
            })
            .collect();
        let exist_type_info_vars: Vec<_> = tvars
            .existential
            .iter()
            .map(|tvar| self.new_type_info_var(&format!("TypeInfo_for_{}", self.tvarset.var_name(*tvar))))
            .collect();

        let mut head_vars = univ_typeclass_info_vars.clone();
        head_vars.extend(&exist_typeclass_info_vars);
        head_vars.extend(&univ_type_info_vars);
        head_vars.extend(&exist_type_info_vars);
        self.head_witnesses.extend(head_vars.iter().copied());
        head_vars.extend(&proc_info.head_vars);

        let mut arg_modes = vec![ArgMode::In; univ_typeclass_info_vars.len()];
        arg_modes.extend(vec![ArgMode::Out; exist_typeclass_info_vars.len()]);
        arg_modes.extend(vec![ArgMode::In; univ_type_info_vars.len()]);
        arg_modes.extend(vec![ArgMode::Out; exist_type_info_vars.len()]);
        arg_modes.extend(&proc_info.arg_modes);

        trace!(
            "{}: {} witness parameters",
            self.pred_desc(),
            head_vars.len() - proc_info.head_vars.len()
        );

        HeadWitnesses {
            head_vars,
            arg_modes,
            exist_typeclass_info_vars,
            exist_type_info_vars,
            exist_tvars: tvars.existential,
        }
    }

    /// Records `var` as the witness of `constraint`, along with where the
    /// type-infos of its type variable arguments are found inside it
    pub(super) fn record_typeclass_info(&mut self, constraint: &ClassConstraint, var: ProgVar) {
        let class_id = constraint.class_id();
        let Some(class) = self.module_info.class_defn(&class_id) else {
            internal_error!(self.pred_desc(), "class {class_id} does not exist");
        };
        let num_superclasses = class.superclasses.len();

        self.rtti_varmaps
            .typeclass_info_vars
            .entry(constraint.clone())
            .or_insert(var);
        for (i, arg) in constraint.args.iter().enumerate() {
            if let Type::Variable(tvar) = arg {
                self.rtti_varmaps
                    .type_info_locations
                    .entry(*tvar)
                    .or_insert(TypeInfoLocn::ViaTypeclassInfo(var, num_superclasses + i + 1));
            }
        }
    }

    /// A typeclass-info only holds the type-infos of its constraint's
    /// arguments, so a type variable occurring solely inside a non-variable
    /// argument would have no witness anywhere
    fn check_constrained_tvars_located(&self, constraints: &[ClassConstraint]) {
        for constraint in constraints {
            for tvar in constraint.type_vars() {
                if !self.rtti_varmaps.type_info_locations.contains_key(&tvar) {
                    internal_error!(
                        self.pred_desc(),
                        "type variable {} of constraint {} occurs only inside a non-variable argument",
                        self.tvarset.var_name(tvar),
                        constraint.to_string_with(&self.tvarset)
                    );
                }
            }
        }
    }

    /// The witnesses `callee` needs when called with `args`
    pub fn call_witnesses(&mut self, callee: &PredInfo, args: &[ProgVar], context: Context) -> CallWitnesses {
        let renaming = self.tvarset.merge(&callee.tvarset);
        let callee_types: Vec<_> = callee
            .arg_types
            .iter()
            .map(|ty| ty.apply_renaming(&renaming))
            .collect();
        let actual_types = self.var_types(args);
        let subst = type_list_subsumes(&callee_types, &actual_types).unwrap_or_else(|err| {
            internal_error!(
                self.pred_desc(),
                "call of {} does not match its declaration: {err}",
                callee.describe()
            )
        });
        let instantiate = |constraint: &ClassConstraint| constraint.apply_renaming(&renaming).apply_subst(&subst);

        let tvars = extra_arg_tvars(&callee.arg_types, &callee.exist_qvars, &callee.class_context);
        let mut witnesses = CallWitnesses::default();

        let univ_constraints: Vec<_> = callee.class_context.universal.iter().map(instantiate).collect();
        let (univ_typeclass_infos, goals) = self.make_typeclass_info_vars(&univ_constraints, context);
        witnesses.vars.extend(univ_typeclass_infos);
        witnesses.setup.extend(goals);

        let exist_constraints: Vec<_> = callee.class_context.existential.iter().map(instantiate).collect();
        let exist_typeclass_infos: Vec<_> = exist_constraints
            .iter()
            .map(|constraint| self.new_typeclass_info_var(&format!("TypeClassInfo_for_{}", constraint.class.name)))
            .collect();
        witnesses.vars.extend(&exist_typeclass_infos);

        let univ_types: Vec<_> = tvars
            .universal
            .iter()
            .map(|tvar| Type::Variable(*tvar).apply_renaming(&renaming).apply_subst(&subst))
            .collect();
        let (univ_type_infos, goals) = self.make_type_info_vars(&univ_types, context);
        witnesses.vars.extend(univ_type_infos);
        witnesses.setup.extend(goals);

        let exist_types: Vec<_> = tvars
            .existential
            .iter()
            .map(|tvar| Type::Variable(*tvar).apply_renaming(&renaming).apply_subst(&subst))
            .collect();
        let exist_type_infos: Vec<_> = tvars
            .existential
            .iter()
            .map(|tvar| self.new_type_info_var(&format!("TypeInfo_for_{}", callee.tvarset.var_name(*tvar))))
            .collect();
        witnesses.vars.extend(&exist_type_infos);

        // The existential witnesses are available to everything after the call
        for (constraint, var) in exist_constraints.iter().zip(&exist_typeclass_infos) {
            self.record_typeclass_info(constraint, *var);
        }
        for (ty, var) in exist_types.iter().zip(&exist_type_infos) {
            if let Type::Variable(tvar) = ty {
                self.rtti_varmaps
                    .type_info_locations
                    .entry(*tvar)
                    .or_insert(TypeInfoLocn::Direct(*var));
            }
        }
        witnesses.outputs.extend(&exist_typeclass_infos);
        witnesses.outputs.extend(&exist_type_infos);

        witnesses.foreign_names = foreign_witness_names(callee, &tvars);
        witnesses
    }

    /// Goals binding the existential witness parameters of a procedure from
    /// the types its body gave the head variables. They run after the body.
    pub fn produce_existq_tvars(
        &mut self,
        pred: &PredInfo,
        orig_head_vars: &[ProgVar],
        head: &HeadWitnesses,
        context: Context,
    ) -> Vec<Goal> {
        if pred.class_context.existential.is_empty() && head.exist_tvars.is_empty() {
            return Vec::new();
        }

        let actual_types = self.var_types(orig_head_vars);
        let subst = match type_list_subsumes(&pred.arg_types, &actual_types) {
            Ok(subst) => subst,
            // Unification procedures of equivalence types see the expanded
            // types of their arguments
            Err(_) if matches!(pred.origin, PredOrigin::SpecialPred(..)) => TypeSubst::new(),
            Err(err) => internal_error!(
                self.pred_desc(),
                "head types do not match the declaration: {err}"
            ),
        };

        let constraints: Vec<_> = pred
            .class_context
            .existential
            .iter()
            .map(|constraint| constraint.apply_subst(&subst))
            .collect();
        let (typeclass_infos, mut goals) = self.make_typeclass_info_vars(&constraints, context);
        for (head_var, var) in head.exist_typeclass_info_vars.iter().zip(typeclass_infos) {
            goals.push(assign(*head_var, var, context));
        }

        let types: Vec<_> = head
            .exist_tvars
            .iter()
            .map(|tvar| Type::Variable(*tvar).apply_subst(&subst))
            .collect();
        let (type_infos, type_info_goals) = self.make_type_info_vars(&types, context);
        goals.extend(type_info_goals);
        for (head_var, var) in head.exist_type_info_vars.iter().zip(type_infos) {
            goals.push(assign(*head_var, var, context));
        }

        goals
    }
}

fn foreign_witness_names(callee: &PredInfo, tvars: &ExtraArgTvars) -> Vec<String> {
    let typeclass_info_name = |constraint: &ClassConstraint| {
        let mut name = format!("TypeClassInfo_for_{}", constraint.class.name);
        for tvar in constraint.type_vars() {
            name.push('_');
            name.push_str(&callee.tvarset.var_name(tvar));
        }
        name
    };
    let type_info_name = |tvar: &TypeVar| format!("TypeInfo_for_{}", callee.tvarset.var_name(*tvar));

    let context = &callee.class_context;
    context
        .universal
        .iter()
        .chain(&context.existential)
        .map(typeclass_info_name)
        .chain(tvars.universal.iter().chain(&tvars.existential).map(type_info_name))
        .collect()
}

