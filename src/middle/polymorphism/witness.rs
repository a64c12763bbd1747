//! Synthesis of runtime witnesses: type-infos for types and typeclass-infos
//! for class constraints.
//!
//! Each synthesis returns the witness variables together with the goals that
//! bind them; the caller splices those goals immediately before the goal that
//! needs the witnesses.

use log::trace;

use super::info::PolyInfo;
use crate::{
    frontend::intern::InternedSymbol,
    middle::{
        diag::internal_error,
        hlds::{
            builtins::{self, RuntimePrimitive},
            class::{ClassConstraint, ClassDefn, ConstraintProof, make_instance_string, rename_proofs, subst_proofs},
            goal::{ConsId, Goal, RttiTypeCtor},
            goal_util::{construct, int_const},
            id::{Context, ProgVar, TypeVar},
            module::TypeInfoLocn,
            types::{PredOrFunc, Type, TypeSubst, type_list_subsumes},
        },
    },
};

impl PolyInfo<'_> {
    pub fn make_type_info_vars(&mut self, types: &[Type], context: Context) -> (Vec<ProgVar>, Vec<Goal>) {
        let mut goals = Vec::new();
        let vars = types
            .iter()
            .map(|ty| self.make_type_info_var(ty, context, &mut goals))
            .collect();
        (vars, goals)
    }

    pub fn make_type_info_var(&mut self, ty: &Type, context: Context, goals: &mut Vec<Goal>) -> ProgVar {
        match ty {
            Type::Variable(tvar) => self.type_var_witness(*tvar, context, goals),
            Type::Defined(ctor, args) => {
                self.init_type_info_var(RttiTypeCtor::Defined(*ctor), &ctor.name.name.to_string(), args, context, goals)
            }
            Type::Tuple(args) => self.init_type_info_var(RttiTypeCtor::Tuple, "tuple", args, context, goals),
            Type::HigherOrder { pred_or_func, args } => {
                let name = match pred_or_func {
                    PredOrFunc::Predicate => "pred",
                    PredOrFunc::Function => "func",
                };
                self.init_type_info_var(RttiTypeCtor::HigherOrder(*pred_or_func), name, args, context, goals)
            }
        }
    }

    fn type_var_witness(&mut self, tvar: TypeVar, context: Context, goals: &mut Vec<Goal>) -> ProgVar {
        match self.rtti_varmaps.type_info_locations.get(&tvar).copied() {
            Some(TypeInfoLocn::Direct(var)) => var,
            Some(TypeInfoLocn::ViaTypeclassInfo(typeclass_info, slot)) => {
                let name = self.tvarset.var_name(tvar);
                let slot_var = self.new_var(&format!("Slot_for_{name}"), builtins::int_type());
                let type_info = self.new_type_info_var(&format!("TypeInfo_for_{name}"));
                goals.push(int_const(slot_var, slot as i64, context));
                goals.push(self.primitive_call(
                    RuntimePrimitive::TypeInfoFromTypeclassInfo,
                    vec![typeclass_info, slot_var, type_info],
                    [type_info],
                    context,
                ));
                trace!("extracted type_info for {name} from slot {slot} of {typeclass_info}");
                type_info
            }
            None => {
                // Only the procedure's own quantified variables can get here;
                // the variable is bound by the head
                let var = self.new_type_info_var(&format!("TypeInfo_for_{}", self.tvarset.var_name(tvar)));
                self.rtti_varmaps
                    .type_info_locations
                    .insert(tvar, TypeInfoLocn::Direct(var));
                var
            }
        }
    }

    fn init_type_info_var(
        &mut self,
        ctor: RttiTypeCtor,
        name: &str,
        args: &[Type],
        context: Context,
        goals: &mut Vec<Goal>,
    ) -> ProgVar {
        let arg_vars: Vec<_> = args
            .iter()
            .map(|arg| self.make_type_info_var(arg, context, goals))
            .collect();

        let ctor_info = self.new_var(&format!("TypeCtorInfo_for_{name}"), builtins::type_ctor_info_type());
        goals.push(construct(ctor_info, ConsId::TypeCtorInfoConst(ctor), Vec::new(), context));

        if !ctor.has_variable_arity() && arg_vars.is_empty() {
            // The type-ctor-info doubles as the type-info of a zero-arity type
            self.var_table.set_type(ctor_info, builtins::type_info_type());
            return ctor_info;
        }

        let mut cell_args = vec![ctor_info];
        if ctor.has_variable_arity() {
            let arity = self.new_var("Arity", builtins::int_type());
            goals.push(int_const(arity, args.len() as i64, context));
            cell_args.push(arity);
        }
        cell_args.extend(arg_vars);

        let type_info = self.new_type_info_var(&format!("TypeInfo_for_{name}"));
        goals.push(construct(type_info, ConsId::TypeInfoCell(ctor), cell_args, context));
        trace!("built type_info for {ctor} in {type_info}");
        type_info
    }

    /// Witnesses for a list of constraints.
    ///
    /// Witnesses built while resolving one list are shared between its
    /// members, but not beyond it, since the goals binding them are placed
    /// at this one call site. The proof map must be acyclic; a cycle is
    /// reported as an internal error.
    pub fn make_typeclass_info_vars(
        &mut self,
        constraints: &[ClassConstraint],
        context: Context,
    ) -> (Vec<ProgVar>, Vec<Goal>) {
        let saved_vars = self.rtti_varmaps.typeclass_info_vars.clone();
        let saved_proofs = self.proofs.clone();

        let mut goals = Vec::new();
        let mut in_progress = Vec::new();
        let vars = constraints
            .iter()
            .map(|constraint| self.make_typeclass_info_var(constraint, context, &mut goals, &mut in_progress))
            .collect();

        self.rtti_varmaps.typeclass_info_vars = saved_vars;
        self.proofs = saved_proofs;
        (vars, goals)
    }

    fn make_typeclass_info_var(
        &mut self,
        constraint: &ClassConstraint,
        context: Context,
        goals: &mut Vec<Goal>,
        in_progress: &mut Vec<ClassConstraint>,
    ) -> ProgVar {
        if let Some(var) = self.rtti_varmaps.typeclass_info_vars.get(constraint) {
            return *var;
        }

        if in_progress.contains(constraint) {
            internal_error!(
                self.pred_desc(),
                "cyclic proof for constraint {}",
                constraint.to_string_with(&self.tvarset)
            );
        }

        let Some(proof) = self.proofs.get(constraint).cloned() else {
            internal_error!(
                self.pred_desc(),
                "no witness or proof for constraint {}",
                constraint.to_string_with(&self.tvarset)
            );
        };

        in_progress.push(constraint.clone());
        let var = match proof {
            ConstraintProof::ApplyInstance(instance_num) => {
                self.apply_instance(constraint, instance_num, context, goals, in_progress)
            }
            ConstraintProof::Superclass(parent) => {
                self.extract_superclass(constraint, &parent, context, goals, in_progress)
            }
        };
        in_progress.pop();

        self.rtti_varmaps
            .typeclass_info_vars
            .insert(constraint.clone(), var);
        var
    }

    fn apply_instance(
        &mut self,
        constraint: &ClassConstraint,
        instance_num: usize,
        context: Context,
        goals: &mut Vec<Goal>,
        in_progress: &mut Vec<ClassConstraint>,
    ) -> ProgVar {
        let module_info = self.module_info;
        let class_id = constraint.class_id();
        let Some(instance) = module_info
            .instances
            .get(&class_id)
            .and_then(|instances| instances.get(instance_num))
        else {
            internal_error!(self.pred_desc(), "instance {instance_num} of {class_id} does not exist");
        };
        let Some(class) = module_info.class_defn(&class_id) else {
            internal_error!(self.pred_desc(), "class {class_id} does not exist");
        };

        let renaming = self.tvarset.merge(&instance.tvarset);
        let instance_types: Vec<_> = instance
            .types
            .iter()
            .map(|ty| ty.apply_renaming(&renaming))
            .collect();
        let subst = type_list_subsumes(&instance_types, &constraint.args).unwrap_or_else(|err| {
            internal_error!(
                self.pred_desc(),
                "instance {instance_num} of {class_id} does not match {}: {err}",
                constraint.to_string_with(&self.tvarset)
            )
        });

        let instance_proofs = subst_proofs(&rename_proofs(&instance.superclass_proofs, &renaming), &subst);
        self.proofs.extend(instance_proofs);

        let instance_constraints: Vec<_> = instance
            .constraints
            .iter()
            .map(|c| c.apply_renaming(&renaming).apply_subst(&subst))
            .collect();
        let instance_vars: Vec<_> = instance_constraints
            .iter()
            .map(|c| self.make_typeclass_info_var(c, context, goals, in_progress))
            .collect();

        let superclass_vars: Vec<_> = self
            .superclasses_of(class, &constraint.args)
            .iter()
            .map(|superclass| self.make_typeclass_info_var(superclass, context, goals, in_progress))
            .collect();

        let type_info_vars: Vec<_> = constraint
            .args
            .iter()
            .map(|ty| self.make_type_info_var(ty, context, goals))
            .collect();

        let class_name = class_id.name.name;
        let base = self.new_var(
            &format!("BaseTypeClassInfo_for_{class_name}"),
            builtins::base_typeclass_info_type(),
        );
        goals.push(construct(
            base,
            ConsId::BaseTypeclassInfoConst {
                module: instance.module,
                class_id,
                instance_num,
                instance_string: InternedSymbol::new(&make_instance_string(&instance.types)),
            },
            Vec::new(),
            context,
        ));

        let typeclass_info = self.new_typeclass_info_var(&format!("TypeClassInfo_for_{class_name}"));
        let mut cell_args = vec![base];
        cell_args.extend(instance_vars);
        cell_args.extend(superclass_vars);
        cell_args.extend(type_info_vars);
        goals.push(construct(typeclass_info, ConsId::TypeclassInfoCell, cell_args, context));

        trace!(
            "built typeclass_info for {} from instance {instance_num}",
            constraint.to_string_with(&self.tvarset)
        );
        typeclass_info
    }

    /// The superclass constraints of `class` applied to `args`, in slot order
    fn superclasses_of(&self, class: &ClassDefn, args: &[Type]) -> Vec<ClassConstraint> {
        // The class's own variables are renamed apart first so that binding
        // them cannot capture variables of the procedure
        let mut scratch = self.tvarset.clone();
        let renaming = scratch.merge(&class.tvarset);
        let subst = TypeSubst::from_pairs(
            class
                .params
                .iter()
                .map(|param| renaming.get(param).copied().unwrap_or(*param))
                .zip(args.iter().cloned()),
        );
        class
            .superclasses
            .iter()
            .map(|superclass| superclass.apply_renaming(&renaming).apply_subst(&subst))
            .collect()
    }

    fn extract_superclass(
        &mut self,
        constraint: &ClassConstraint,
        parent: &ClassConstraint,
        context: Context,
        goals: &mut Vec<Goal>,
        in_progress: &mut Vec<ClassConstraint>,
    ) -> ProgVar {
        let parent_var = self.make_typeclass_info_var(parent, context, goals, in_progress);

        let module_info = self.module_info;
        let parent_id = parent.class_id();
        let Some(parent_class) = module_info.class_defn(&parent_id) else {
            internal_error!(self.pred_desc(), "class {parent_id} does not exist");
        };
        let Some(position) = self
            .superclasses_of(parent_class, &parent.args)
            .iter()
            .position(|superclass| superclass == constraint)
        else {
            internal_error!(
                self.pred_desc(),
                "{} is not a superclass of {}",
                constraint.to_string_with(&self.tvarset),
                parent.to_string_with(&self.tvarset)
            );
        };

        let class_name = constraint.class.name;
        let slot_var = self.new_var(&format!("Slot_for_{class_name}"), builtins::int_type());
        let typeclass_info = self.new_typeclass_info_var(&format!("TypeClassInfo_for_{class_name}"));
        goals.push(int_const(slot_var, (position + 1) as i64, context));
        goals.push(self.primitive_call(
            RuntimePrimitive::SuperclassFromTypeclassInfo,
            vec![parent_var, slot_var, typeclass_info],
            [typeclass_info],
            context,
        ));
        typeclass_info
    }
}
