use std::collections::BTreeSet;

use crate::middle::hlds::{
    builtins::{self, RuntimePrimitive},
    class::ConstraintProofMap,
    goal::{Goal, Purity},
    goal_util::{CallShape, plain_call},
    id::{Context, ProgVar},
    module::{ModuleInfo, PredInfo, ProcInfo, RttiVarMaps, VarTable},
    types::{Type, TypeVarSet},
};

/// The state threaded through the transformation of one procedure.
///
/// Created from the procedure's tables, updated as witnesses are synthesized,
/// and split back into the procedure's tables once its body is done. The
/// module itself is only read.
pub struct PolyInfo<'a> {
    pub module_info: &'a ModuleInfo,
    pub var_table: VarTable,
    pub tvarset: TypeVarSet,
    pub rtti_varmaps: RttiVarMaps,
    pub proofs: ConstraintProofMap,
    pred_desc: String,
    /// Witness variables bound by the procedure's head
    pub head_witnesses: BTreeSet<ProgVar>,
}

impl<'a> PolyInfo<'a> {
    pub fn new(module_info: &'a ModuleInfo, pred: &PredInfo, proc_info: &ProcInfo) -> Self {
        Self {
            module_info,
            var_table: proc_info.var_table.clone(),
            tvarset: pred.tvarset.clone(),
            rtti_varmaps: proc_info.rtti_varmaps.clone(),
            proofs: pred.constraint_proofs.clone(),
            pred_desc: pred.describe(),
            head_witnesses: BTreeSet::new(),
        }
    }

    pub fn into_parts(self) -> (VarTable, TypeVarSet, RttiVarMaps) {
        (self.var_table, self.tvarset, self.rtti_varmaps)
    }

    /// Description of the procedure's predicate, for internal error messages
    pub fn pred_desc(&self) -> &str {
        &self.pred_desc
    }

    pub fn new_var(&mut self, name: &str, ty: Type) -> ProgVar {
        self.var_table.new_named(name, ty)
    }

    pub fn new_type_info_var(&mut self, name: &str) -> ProgVar {
        self.new_var(name, builtins::type_info_type())
    }

    pub fn new_typeclass_info_var(&mut self, name: &str) -> ProgVar {
        self.new_var(name, builtins::typeclass_info_type())
    }

    pub fn var_types(&self, vars: &[ProgVar]) -> Vec<Type> {
        vars.iter().map(|var| self.var_table.ty(*var).clone()).collect()
    }

    /// A call of one of the private builtin witness accessors
    pub fn primitive_call(
        &self,
        prim: RuntimePrimitive,
        args: Vec<ProgVar>,
        outputs: impl IntoIterator<Item = ProgVar>,
        context: Context,
    ) -> Goal {
        let sig = prim.signature();
        plain_call(
            self.module_info.primitive(prim),
            prim.sym_name(),
            args,
            outputs,
            CallShape::det()
                .with_determinism(sig.determinism)
                .with_purity(Purity::Pure),
            context,
        )
    }

    /// Variables visible to the whole body that a transformed subgoal may
    /// have started to refer to
    pub fn is_outer_witness(&self, var: ProgVar) -> bool {
        self.head_witnesses.contains(&var)
            || self
                .rtti_varmaps
                .type_info_locations
                .values()
                .any(|locn| locn.var() == var)
            || self.rtti_varmaps.typeclass_info_vars.values().any(|v| *v == var)
    }
}
