use itertools::Itertools;

use crate::middle::{
    hlds::{
        builtins::{self, RuntimePrimitive, TableHandle},
        goal::{ArgMode, ConsId, ForeignArg, ForeignAttributes, Goal, GoalExpr, Purity, ScopeReason},
        goal_util::{CallShape, conj, construct, foreign_call, int_const, plain_call, scope, string_const},
        id::{Context, PredId, PredProcId, ProgVar},
        module::{ModuleInfo, PredInfo, ProcInfo, RttiVarMaps, VarTable},
        types::{Type, TypeVarSet},
    },
    polymorphism::PolyInfo,
};

/// The state threaded through the tabling of one procedure.
///
/// Type-infos for polymorphic arguments come from the witness maps the
/// polymorphism pass left on the procedure, so the table synthesizer reuses
/// its witness machinery.
pub struct TableInfo<'a> {
    pub poly: PolyInfo<'a>,
    pub id: PredProcId,
    pub context: Context,
    /// Arity as written, for error messages
    pred_desc: String,
    via_foreign_code: bool,
}

impl<'a> TableInfo<'a> {
    pub fn new(module_info: &'a ModuleInfo, id: PredProcId, pred: &PredInfo, proc_info: &ProcInfo) -> Self {
        Self {
            poly: PolyInfo::new(module_info, pred, proc_info),
            id,
            context: proc_info.body.info.context,
            pred_desc: pred.describe(),
            via_foreign_code: module_info.options.tabling_via_extra_args,
        }
    }

    pub fn module_info(&self) -> &'a ModuleInfo {
        self.poly.module_info
    }

    pub fn pred_id(&self) -> PredId {
        self.id.pred_id
    }

    pub fn pred_desc(&self) -> &str {
        &self.pred_desc
    }

    pub fn into_parts(self) -> (VarTable, TypeVarSet, RttiVarMaps) {
        self.poly.into_parts()
    }

    pub fn var_type(&self, var: ProgVar) -> Type {
        self.poly.var_table.ty(var).clone()
    }

    pub fn new_var(&mut self, name: &str, ty: Type) -> ProgVar {
        self.poly.new_var(name, ty)
    }

    pub fn new_handle_var(&mut self, name: &str, handle: TableHandle) -> ProgVar {
        self.new_var(name, handle.to_type())
    }

    /// `Var = N` for a fresh integer variable
    pub fn int_var(&mut self, name: &str, value: usize, goals: &mut Vec<Goal>) -> ProgVar {
        let var = self.new_var(name, builtins::int_type());
        goals.push(int_const(var, value as i64, self.context));
        var
    }

    /// A call of a tabling primitive, as a plain call or as inline foreign
    /// code depending on the options
    pub fn call(&self, prim: RuntimePrimitive, args: Vec<ProgVar>) -> Goal {
        self.call_with_extra_args(prim, args, Vec::new())
    }

    /// Like [`Self::call`], with values passed to the runtime macro outside
    /// the primitive's declared arguments. Such calls are always foreign code.
    pub fn call_with_extra_args(&self, prim: RuntimePrimitive, args: Vec<ProgVar>, extra_args: Vec<ForeignArg>) -> Goal {
        let sig = prim.signature();
        let shape = CallShape::det()
            .with_determinism(sig.determinism)
            .with_purity(sig.purity);
        let module_info = self.module_info();

        if !self.via_foreign_code && extra_args.is_empty() {
            let outputs: Vec<_> = args
                .iter()
                .zip(sig.args)
                .filter(|(_, (mode, _))| mode.is_output())
                .map(|(var, _)| *var)
                .collect();
            return plain_call(module_info.primitive(prim), prim.sym_name(), args, outputs, shape, self.context);
        }

        let foreign_args: Vec<_> = args
            .iter()
            .zip(sig.args)
            .map(|(var, (mode, _))| self.foreign_arg(*var, *mode))
            .collect();
        let code = format!(
            "{}({});",
            prim.c_macro(),
            foreign_args
                .iter()
                .chain(&extra_args)
                .map(|arg| self.poly.var_table.name(arg.var))
                .join(", ")
        );
        let mut goal = foreign_call(
            module_info.primitive(prim),
            ForeignAttributes::default(),
            foreign_args,
            code,
            shape,
            self.context,
        );

        goal.info.nonlocals.extend(extra_args.iter().map(|arg| arg.var));
        goal.info.instmap_delta.bound.extend(
            extra_args
                .iter()
                .filter(|arg| arg.mode.is_output())
                .map(|arg| arg.var),
        );
        if let GoalExpr::ForeignProc(foreign) = &mut goal.expr {
            foreign.extra_args = extra_args;
        }
        goal
    }

    pub fn foreign_arg(&self, var: ProgVar, mode: ArgMode) -> ForeignArg {
        ForeignArg {
            var,
            name: self.poly.var_table.source_name(var),
            mode,
        }
    }

    /// `table_error(Message)` naming the procedure, which aborts at runtime
    pub fn table_error(&mut self, problem: &str) -> Goal {
        let message = self.new_var("Message", builtins::string_type());
        let text = format!("{problem} in {}", self.pred_desc);
        conj(
            vec![
                string_const(message, &text, self.context),
                self.call(RuntimePrimitive::TableError, vec![message]),
            ],
            self.context,
        )
    }

    /// `Var = Constant` for the root of the procedure's call table
    pub fn call_table_root(&mut self, goals: &mut Vec<Goal>) -> ProgVar {
        let root = self.new_handle_var("T0", TableHandle::MlTrieNode);
        goals.push(construct(root, ConsId::TablingInfoConst(self.id), Vec::new(), self.context));
        root
    }

    /// Purity of the procedure as its callers see it. The primitives are
    /// impure, but the tabled procedure as a whole is not.
    pub fn wrap_promise_pure(&self, goal: Goal, purity: Purity) -> Goal {
        if purity == Purity::Pure && goal.info.purity != Purity::Pure {
            let mut scoped = scope(ScopeReason::Promise(Purity::Pure), goal, self.context);
            scoped.info.purity = Purity::Pure;
            scoped
        } else {
            goal
        }
    }
}
