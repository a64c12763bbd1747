//! The module: predicate and procedure tables, the type, class and instance
//! tables, per-procedure variable tables and witness maps.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use strum::IntoEnumIterator;

use super::{
    builtins::{self, RuntimePrimitive, status_types},
    class::{ClassConstraint, ClassContext, ClassDefn, ClassId, ConstraintProofMap, InstanceDefn},
    goal::{ArgMode, Determinism, Goal},
    goal_util::true_goal,
    id::{Context, PredId, PredProcId, ProcId, ProgVar, SymName, TypeVar},
    table::{EvalMethod, ProcTableInfo},
    types::{PredOrFunc, Type, TypeCtor, TypeSubst, TypeVarSet},
};
use crate::{
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec},
    middle::{
        diag::{Diagnostic, Severity},
        options::Options,
    },
};

#[derive(Debug, Clone)]
pub struct VarEntry {
    pub name: Option<InternedSymbol>,
    pub ty: Type,
}

/// Names and types of the variables of one procedure
#[derive(Debug, Clone, Default)]
pub struct VarTable {
    vars: IndexVec<ProgVar, VarEntry>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_var(&mut self, name: Option<&str>, ty: Type) -> ProgVar {
        self.vars.push(VarEntry {
            name: name.map(InternedSymbol::new),
            ty,
        })
    }

    pub fn new_named(&mut self, name: &str, ty: Type) -> ProgVar {
        self.new_var(Some(name), ty)
    }

    pub fn ty(&self, var: ProgVar) -> &Type {
        &self.vars[var].ty
    }

    pub fn set_type(&mut self, var: ProgVar, ty: Type) {
        self.vars[var].ty = ty;
    }

    /// The name the variable had in the source, if any
    pub fn source_name(&self, var: ProgVar) -> Option<InternedSymbol> {
        self.vars[var].name
    }

    pub fn name(&self, var: ProgVar) -> String {
        match self.vars[var].name {
            Some(name) => format!("{name}_{}", var.index()),
            None => var.to_string(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProgVar, &VarEntry)> {
        self.vars.enumerate()
    }
}

/// Where the type-info of a type variable can be found at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeInfoLocn {
    Direct(ProgVar),
    /// In the given slot of a typeclass-info
    ViaTypeclassInfo(ProgVar, usize),
}

impl TypeInfoLocn {
    pub fn var(self) -> ProgVar {
        match self {
            TypeInfoLocn::Direct(var) | TypeInfoLocn::ViaTypeclassInfo(var, _) => var,
        }
    }
}

/// The two witness location maps of a procedure
#[derive(Debug, Clone, Default)]
pub struct RttiVarMaps {
    pub type_info_locations: BTreeMap<TypeVar, TypeInfoLocn>,
    pub typeclass_info_vars: BTreeMap<ClassConstraint, ProgVar>,
}

impl RttiVarMaps {
    pub fn is_empty(&self) -> bool {
        self.type_info_locations.is_empty() && self.typeclass_info_vars.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProcInfo {
    pub context: Context,
    pub var_table: VarTable,
    pub head_vars: Vec<ProgVar>,
    pub arg_modes: Vec<ArgMode>,
    pub body: Goal,
    pub determinism: Determinism,
    pub eval_method: EvalMethod,
    pub rtti_varmaps: RttiVarMaps,
    pub table_info: Option<ProcTableInfo>,
    /// The variable holding the call table node of the current call, which
    /// the debugger needs to reset the table on retry
    pub call_table_tip: Option<ProgVar>,
}

impl ProcInfo {
    pub fn new(
        var_table: VarTable,
        head_vars: Vec<ProgVar>,
        arg_modes: Vec<ArgMode>,
        determinism: Determinism,
        body: Goal,
    ) -> Self {
        Self {
            context: body.info.context,
            var_table,
            head_vars,
            arg_modes,
            body,
            determinism,
            eval_method: EvalMethod::Normal,
            rtti_varmaps: RttiVarMaps::default(),
            table_info: None,
            call_table_tip: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ImportStatus {
    Local,
    Exported,
    Imported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SpecialPredKind {
    Unify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredOrigin {
    User,
    /// Compiler-generated unification predicate of a type
    SpecialPred(SpecialPredKind, TypeCtor),
    /// Clone made by the tabling transformation
    CreatedForTabling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PredMarker {
    /// A relation of the aggregate subsystem, kept monomorphic
    Aditi,
    NoInline,
    /// The body was written with explicit parallel conjunctions
    ParallelConjunctions,
}

#[derive(Debug, Clone)]
pub struct PredInfo {
    pub module: InternedSymbol,
    pub name: InternedSymbol,
    /// Arity as declared, before any witness arguments are added
    pub orig_arity: usize,
    pub pred_or_func: PredOrFunc,
    pub origin: PredOrigin,
    pub status: ImportStatus,
    pub markers: Vec<PredMarker>,
    pub context: Context,
    pub tvarset: TypeVarSet,
    pub arg_types: Vec<Type>,
    /// The existentially quantified type variables of the declaration
    pub exist_qvars: Vec<TypeVar>,
    pub class_context: ClassContext,
    pub constraint_proofs: ConstraintProofMap,
    pub procs: IndexVec<ProcId, ProcInfo>,
}

impl PredInfo {
    pub fn sym_name(&self) -> SymName {
        SymName {
            module: Some(self.module),
            name: self.name,
        }
    }

    pub fn has_marker(&self, marker: PredMarker) -> bool {
        self.markers.contains(&marker)
    }

    pub fn is_imported(&self) -> bool {
        self.status == ImportStatus::Imported
    }

    pub fn is_exported(&self) -> bool {
        self.status == ImportStatus::Exported
    }

    /// Description used in diagnostics: ``predicate `m.p/2` ``
    pub fn describe(&self) -> String {
        format!("{} `{}/{}`", self.pred_or_func, self.sym_name(), self.orig_arity)
    }

    /// Predicates whose signatures are never given witness arguments
    pub fn is_exempt_from_polymorphism(&self) -> bool {
        builtins::no_type_info_builtin(self.module.value(), self.name.value(), self.orig_arity)
            || self.has_marker(PredMarker::Aditi)
    }
}

#[derive(Debug, Clone)]
pub struct CtorDefn {
    pub name: SymName,
    /// Type variables quantified on the constructor itself
    pub exist_tvars: Vec<TypeVar>,
    pub constraints: Vec<ClassConstraint>,
    pub args: Vec<Type>,
}

#[derive(Debug, Clone)]
pub enum TypeBody {
    Du(Vec<CtorDefn>),
    Eqv(Type),
    /// Defined by the runtime or in another module without exporting its
    /// representation
    Abstract,
}

#[derive(Debug, Clone)]
pub struct TypeDefn {
    pub tvarset: TypeVarSet,
    pub params: Vec<TypeVar>,
    pub body: TypeBody,
}

impl TypeDefn {
    pub fn abstract_type() -> Self {
        Self {
            tvarset: TypeVarSet::new(),
            params: Vec::new(),
            body: TypeBody::Abstract,
        }
    }

    pub fn enumeration(module: &str, ctors: &[&str]) -> Self {
        Self {
            tvarset: TypeVarSet::new(),
            params: Vec::new(),
            body: TypeBody::Du(
                ctors
                    .iter()
                    .map(|name| CtorDefn {
                        name: SymName::qualified(module, name),
                        exist_tvars: Vec::new(),
                        constraints: Vec::new(),
                        args: Vec::new(),
                    })
                    .collect(),
            ),
        }
    }
}

/// Coarse classification of a type, selecting how values of it are tabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TypeCategory {
    Int,
    Char,
    String,
    Float,
    Void,
    /// A type with a single constant, which needs no representation
    Dummy,
    Enum(usize),
    HigherOrder,
    Tuple,
    TypeInfo,
    TypeCtorInfo,
    TypeclassInfo,
    BaseTypeclassInfo,
    Variable,
    User,
}

/// A conjunction selected by profiling feedback to be run in parallel
#[derive(Debug, Clone)]
pub struct ParalleliseCandidate {
    pub proc: PredProcId,
    /// Child indexes leading from the body to the conjunction
    pub goal_path: Vec<usize>,
}

#[derive(Debug)]
pub struct ModuleInfo {
    pub name: InternedSymbol,
    pub options: Options,
    pub preds: IndexVec<PredId, PredInfo>,
    pub types: HashMap<TypeCtor, TypeDefn>,
    pub classes: HashMap<ClassId, ClassDefn>,
    pub instances: HashMap<ClassId, Vec<InstanceDefn>>,
    pub diagnostics: Vec<Diagnostic>,
    pub num_errors: usize,
    pub parallelise_candidates: Vec<ParalleliseCandidate>,
    primitives: HashMap<RuntimePrimitive, PredProcId>,
}

impl ModuleInfo {
    pub fn new(name: &str, options: Options) -> Self {
        let mut module_info = Self {
            name: InternedSymbol::new(name),
            options,
            preds: IndexVec::new(),
            types: HashMap::new(),
            classes: HashMap::new(),
            instances: HashMap::new(),
            diagnostics: Vec::new(),
            num_errors: 0,
            parallelise_candidates: Vec::new(),
            primitives: HashMap::new(),
        };
        module_info.add_builtin_types();
        module_info.add_runtime_primitives();
        module_info
    }

    fn add_builtin_types(&mut self) {
        for ty in [
            builtins::int_type(),
            builtins::char_type(),
            builtins::string_type(),
            builtins::float_type(),
            builtins::void_type(),
            builtins::type_info_type(),
            builtins::type_ctor_info_type(),
            builtins::typeclass_info_type(),
            builtins::base_typeclass_info_type(),
        ] {
            if let Type::Defined(ctor, _) = ty {
                self.types.insert(ctor, TypeDefn::abstract_type());
            }
        }

        self.types.insert(
            builtins::io_state_ctor(),
            TypeDefn::enumeration("io", &["state"]),
        );

        for handle in builtins::TableHandle::iter() {
            if let Type::Defined(ctor, _) = handle.to_type() {
                self.types.insert(ctor, TypeDefn::abstract_type());
            }
        }

        for (type_name, ctors) in status_types() {
            self.types.insert(
                TypeCtor::new(builtins::TABLE_BUILTIN_MODULE, type_name, 0),
                TypeDefn::enumeration(builtins::TABLE_BUILTIN_MODULE, &ctors),
            );
        }
    }

    fn add_runtime_primitives(&mut self) {
        for prim in RuntimePrimitive::iter() {
            let (tvarset, poly) = prim.tvarset();
            let arg_types = prim.arg_types(poly);
            let sig = prim.signature();

            let mut var_table = VarTable::new();
            let head_vars = arg_types
                .iter()
                .map(|ty| var_table.new_var(None, ty.clone()))
                .collect();
            let proc_info = ProcInfo::new(
                var_table,
                head_vars,
                prim.arg_modes(),
                sig.determinism,
                true_goal(Context::dummy()),
            );

            let pred_id = self.add_pred(PredInfo {
                module: InternedSymbol::new(prim.module()),
                name: InternedSymbol::new(prim.name()),
                orig_arity: arg_types.len(),
                pred_or_func: PredOrFunc::Predicate,
                origin: PredOrigin::User,
                status: ImportStatus::Imported,
                markers: Vec::new(),
                context: Context::dummy(),
                tvarset,
                arg_types,
                exist_qvars: Vec::new(),
                class_context: ClassContext::default(),
                constraint_proofs: ConstraintProofMap::new(),
                procs: IndexVec::from_raw(vec![proc_info]),
            });
            self.primitives
                .insert(prim, PredProcId::new(pred_id, ProcId::new(0)));
        }
    }

    pub fn add_pred(&mut self, pred: PredInfo) -> PredId {
        self.preds.push(pred)
    }

    pub fn pred(&self, pred_id: PredId) -> &PredInfo {
        &self.preds[pred_id]
    }

    pub fn pred_mut(&mut self, pred_id: PredId) -> &mut PredInfo {
        &mut self.preds[pred_id]
    }

    pub fn proc(&self, id: PredProcId) -> &ProcInfo {
        &self.preds[id.pred_id].procs[id.proc_id]
    }

    pub fn proc_mut(&mut self, id: PredProcId) -> &mut ProcInfo {
        &mut self.preds[id.pred_id].procs[id.proc_id]
    }

    pub fn all_procs(&self) -> Vec<PredProcId> {
        self.preds
            .enumerate()
            .flat_map(|(pred_id, pred)| {
                pred.procs
                    .indices()
                    .map(move |proc_id| PredProcId::new(pred_id, proc_id))
            })
            .collect()
    }

    /// Whether `name` is already taken by a predicate of this module
    pub fn is_pred_name_taken(&self, name: &str) -> bool {
        self.preds
            .iter()
            .any(|pred| pred.module == self.name && pred.name.value() == name)
    }

    pub fn primitive(&self, prim: RuntimePrimitive) -> PredProcId {
        self.primitives[&prim]
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.num_errors += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn type_defn(&self, ctor: &TypeCtor) -> Option<&TypeDefn> {
        self.types.get(ctor)
    }

    pub fn class_defn(&self, class_id: &ClassId) -> Option<&ClassDefn> {
        self.classes.get(class_id)
    }

    /// The constructor `name/arity` of the type `ty`, with the type's
    /// parameters as declared
    pub fn find_ctor(&self, ty: &Type, name: SymName, arity: usize) -> Option<(&TypeDefn, &CtorDefn)> {
        let Type::Defined(ctor, _) = ty else {
            return None;
        };
        let defn = self.type_defn(ctor)?;
        let TypeBody::Du(ctors) = &defn.body else {
            return None;
        };
        ctors
            .iter()
            .find(|ctor| ctor.name.name == name.name && ctor.args.len() == arity)
            .map(|ctor| (defn, ctor))
    }

    pub fn classify_type(&self, ty: &Type) -> TypeCategory {
        let (ctor, args) = match ty {
            Type::Variable(_) => return TypeCategory::Variable,
            Type::Tuple(_) => return TypeCategory::Tuple,
            Type::HigherOrder { .. } => return TypeCategory::HigherOrder,
            Type::Defined(ctor, args) => (ctor, args),
        };

        let builtin_category = [
            (builtins::int_type(), TypeCategory::Int),
            (builtins::char_type(), TypeCategory::Char),
            (builtins::string_type(), TypeCategory::String),
            (builtins::float_type(), TypeCategory::Float),
            (builtins::void_type(), TypeCategory::Void),
            (builtins::type_info_type(), TypeCategory::TypeInfo),
            (builtins::type_ctor_info_type(), TypeCategory::TypeCtorInfo),
            (builtins::typeclass_info_type(), TypeCategory::TypeclassInfo),
            (builtins::base_typeclass_info_type(), TypeCategory::BaseTypeclassInfo),
        ]
        .into_iter()
        .find_map(|(builtin, category)| (builtin == *ty).then_some(category));
        if let Some(category) = builtin_category {
            return category;
        }

        let Some(defn) = self.type_defn(ctor) else {
            return TypeCategory::User;
        };
        match &defn.body {
            TypeBody::Du(ctors) if ctors.iter().all(|ctor| ctor.args.is_empty()) => {
                match ctors.len() {
                    1 => TypeCategory::Dummy,
                    n => TypeCategory::Enum(n),
                }
            }
            TypeBody::Du(_) | TypeBody::Abstract => TypeCategory::User,
            TypeBody::Eqv(expansion) => {
                let subst = TypeSubst::from_pairs(defn.params.iter().copied().zip(args.iter().cloned()));
                self.classify_type(&expansion.apply_subst(&subst))
            }
        }
    }
}
