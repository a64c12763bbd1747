//! Programmatic construction of type-checked modules.
//!
//! Stands where the parser, type checker and mode checker would: everything a
//! [`ModuleBuilder`] produces is fully typed, carries determinism and modes,
//! and has the constraint proofs of every predicate filled in.

use std::collections::BTreeSet;

use crate::{
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec},
    middle::{
        hlds::{
            class::{ClassConstraint, ClassContext, ClassDefn, ClassId, ConstraintProof, ConstraintProofMap, InstanceDefn},
            goal::{ArgMode, Determinism, ForeignArg, ForeignAttributes, Goal, Purity},
            goal_util::{CallShape, foreign_call, plain_call},
            id::{Context, PredId, PredProcId, ProcId, ProgVar, SymName, TypeVar},
            module::{
                ImportStatus, ModuleInfo, ParalleliseCandidate, PredInfo, PredMarker, PredOrigin,
                ProcInfo, TypeDefn, VarTable,
            },
            table::EvalMethod,
            types::{PredOrFunc, Type, TypeCtor, TypeVarSet},
        },
        options::Options,
    },
};

pub struct ModuleBuilder {
    module_info: ModuleInfo,
}

impl ModuleBuilder {
    pub fn new(name: &str, options: Options) -> Self {
        Self {
            module_info: ModuleInfo::new(name, options),
        }
    }

    pub fn finish(self) -> ModuleInfo {
        self.module_info
    }

    pub fn qualify(&self, name: &str) -> SymName {
        SymName::qualified(self.module_info.name.value(), name)
    }

    pub fn context(&self, line: u32) -> Context {
        Context::new(&format!("{}.m", self.module_info.name), line)
    }

    pub fn add_type(&mut self, name: &str, defn: TypeDefn) -> TypeCtor {
        let ctor = TypeCtor::new(self.module_info.name.value(), name, defn.params.len());
        self.module_info.types.insert(ctor, defn);
        ctor
    }

    /// Declares `:- typeclass name(params) <= superclasses`, where each
    /// superclass names a class of this module and the parameters it is
    /// applied to
    pub fn add_class(&mut self, name: &str, params: &[&str], superclasses: &[(&str, &[usize])]) -> ClassId {
        let mut tvarset = TypeVarSet::new();
        let params: Vec<_> = params.iter().map(|param| tvarset.new_named(param)).collect();
        let superclasses = superclasses
            .iter()
            .map(|(class, args)| {
                ClassConstraint::new(
                    self.qualify(class),
                    args.iter().map(|i| Type::Variable(params[*i])).collect(),
                )
            })
            .collect();

        let class_id = ClassId {
            name: self.qualify(name),
            arity: params.len(),
        };
        self.module_info.classes.insert(
            class_id,
            ClassDefn {
                params,
                superclasses,
                tvarset,
            },
        );
        class_id
    }

    /// Declares an instance, returning its number within its class
    pub fn add_instance(&mut self, class_id: ClassId, instance: InstanceDefn) -> usize {
        let instances = self.module_info.instances.entry(class_id).or_default();
        instances.push(instance);
        instances.len() - 1
    }

    /// An instance of this module without constraints on its type variables
    pub fn simple_instance(&self, types: Vec<Type>, tvarset: TypeVarSet) -> InstanceDefn {
        InstanceDefn {
            module: SymName::unqualified(self.module_info.name.value()),
            constraints: Vec::new(),
            types,
            tvarset,
            superclass_proofs: ConstraintProofMap::new(),
        }
    }

    pub fn pred(&mut self, name: &str) -> PredBuilder<'_> {
        let context = self.context(1);
        PredBuilder {
            id: PredProcId::new(self.module_info.preds.next_index(), ProcId::new(0)),
            pred: PredInfo {
                module: self.module_info.name,
                name: InternedSymbol::new(name),
                orig_arity: 0,
                pred_or_func: PredOrFunc::Predicate,
                origin: PredOrigin::User,
                status: ImportStatus::Local,
                markers: Vec::new(),
                context,
                tvarset: TypeVarSet::new(),
                arg_types: Vec::new(),
                exist_qvars: Vec::new(),
                class_context: ClassContext::default(),
                constraint_proofs: ConstraintProofMap::new(),
                procs: IndexVec::new(),
            },
            var_table: VarTable::new(),
            head_vars: Vec::new(),
            arg_modes: Vec::new(),
            determinism: Determinism::Det,
            eval_method: EvalMethod::Normal,
            module: self,
        }
    }

    /// Selects a conjunction for automatic parallelisation, as profiling
    /// feedback would
    pub fn parallelise(&mut self, proc: PredProcId, goal_path: Vec<usize>) {
        self.module_info
            .parallelise_candidates
            .push(ParalleliseCandidate { proc, goal_path });
    }

    /// `callee(args)`, with the outputs and determinism of its only procedure
    pub fn call(&self, callee: PredProcId, args: Vec<ProgVar>, context: Context) -> Goal {
        let pred = self.module_info.pred(callee.pred_id);
        let proc_info = self.module_info.proc(callee);
        let outputs: Vec<_> = args
            .iter()
            .zip(&proc_info.arg_modes)
            .filter(|(_, mode)| mode.is_output())
            .map(|(var, _)| *var)
            .collect();
        plain_call(
            callee,
            pred.sym_name(),
            args,
            outputs,
            CallShape::det().with_determinism(proc_info.determinism),
            context,
        )
    }
}

/// Builds one predicate with a single procedure
pub struct PredBuilder<'a> {
    module: &'a mut ModuleBuilder,
    id: PredProcId,
    pred: PredInfo,
    var_table: VarTable,
    head_vars: Vec<ProgVar>,
    arg_modes: Vec<ArgMode>,
    determinism: Determinism,
    eval_method: EvalMethod,
}

impl PredBuilder<'_> {
    pub fn context(&self, line: u32) -> Context {
        self.module.context(line)
    }

    /// Declares the predicate in another module
    pub fn in_module(&mut self, module: &str) -> &mut Self {
        self.pred.module = InternedSymbol::new(module);
        self
    }

    pub fn type_var(&mut self, name: &str) -> TypeVar {
        self.pred.tvarset.new_named(name)
    }

    /// Adds a head variable, declaring an argument of type `ty`
    pub fn arg(&mut self, name: &str, ty: Type, mode: ArgMode) -> ProgVar {
        let var = self.var_table.new_named(name, ty.clone());
        self.pred.arg_types.push(ty);
        self.pred.orig_arity += 1;
        self.head_vars.push(var);
        self.arg_modes.push(mode);
        var
    }

    /// Adds a head variable whose type in the body is more specific than the
    /// declared one, as for existentially typed outputs
    pub fn arg_with_body_type(&mut self, name: &str, declared: Type, actual: Type, mode: ArgMode) -> ProgVar {
        let var = self.arg(name, declared, mode);
        self.var_table.set_type(var, actual);
        var
    }

    pub fn var(&mut self, name: &str, ty: Type) -> ProgVar {
        self.var_table.new_named(name, ty)
    }

    pub fn constraint(&self, class: ClassId, args: Vec<Type>) -> ClassConstraint {
        ClassConstraint::new(class.name, args)
    }

    pub fn universal(&mut self, constraint: ClassConstraint) -> &mut Self {
        self.pred.class_context.universal.push(constraint);
        self
    }

    pub fn existential(&mut self, constraint: ClassConstraint) -> &mut Self {
        self.pred.class_context.existential.push(constraint);
        self
    }

    pub fn exist_tvar(&mut self, tvar: TypeVar) -> &mut Self {
        self.pred.exist_qvars.push(tvar);
        self
    }

    pub fn proof(&mut self, constraint: ClassConstraint, proof: ConstraintProof) -> &mut Self {
        self.pred.constraint_proofs.insert(constraint, proof);
        self
    }

    pub fn determinism(&mut self, determinism: Determinism) -> &mut Self {
        self.determinism = determinism;
        self
    }

    pub fn eval_method(&mut self, eval_method: EvalMethod) -> &mut Self {
        self.eval_method = eval_method;
        self
    }

    pub fn marker(&mut self, marker: PredMarker) -> &mut Self {
        self.pred.markers.push(marker);
        self
    }

    pub fn status(&mut self, status: ImportStatus) -> &mut Self {
        self.pred.status = status;
        self
    }

    pub fn origin(&mut self, origin: PredOrigin) -> &mut Self {
        self.pred.origin = origin;
        self
    }

    pub fn call(&self, callee: PredProcId, args: Vec<ProgVar>, context: Context) -> Goal {
        self.module.call(callee, args, context)
    }

    /// A recursive call of the predicate being built
    pub fn call_self(&self, args: Vec<ProgVar>, context: Context) -> Goal {
        let outputs: Vec<_> = args
            .iter()
            .zip(&self.arg_modes)
            .filter(|(_, mode)| mode.is_output())
            .map(|(var, _)| *var)
            .collect();
        plain_call(
            self.id,
            self.pred.sym_name(),
            args,
            outputs,
            CallShape::det().with_determinism(self.determinism),
            context,
        )
    }

    /// A body consisting of foreign code operating on the head variables
    pub fn foreign_body(&self, attributes: ForeignAttributes, code: &str, purity: Purity, context: Context) -> Goal {
        let args = self
            .head_vars
            .iter()
            .zip(&self.arg_modes)
            .map(|(var, mode)| ForeignArg {
                var: *var,
                name: self.var_table.source_name(*var),
                mode: *mode,
            })
            .collect();
        foreign_call(
            self.id,
            attributes,
            args,
            code.to_string(),
            CallShape::det()
                .with_determinism(self.determinism)
                .with_purity(purity),
            context,
        )
    }

    pub fn build(self, body: Goal) -> PredProcId {
        let PredBuilder {
            module,
            id,
            mut pred,
            var_table,
            head_vars,
            arg_modes,
            determinism,
            eval_method,
        } = self;

        let mut body = body;
        // The clause head is the boundary of the body's non-locals
        let head: BTreeSet<_> = head_vars.iter().copied().collect();
        body.info.nonlocals = body.info.nonlocals.intersection(&head).copied().collect();

        let mut proc_info = ProcInfo::new(var_table, head_vars, arg_modes, determinism, body);
        proc_info.eval_method = eval_method;
        proc_info.context = pred.context;
        pred.procs.push(proc_info);

        let pred_id: PredId = module.module_info.add_pred(pred);
        debug_assert_eq!(pred_id, id.pred_id);
        id
    }
}
