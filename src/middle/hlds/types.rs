//! Type expressions, type variable sets and substitutions.
//!
//! Types reaching the transformation passes are fully checked, so the only
//! unification performed here is structural: matching a declared (general)
//! signature against the actual types at a call site, instance head or
//! constructor, and merging type variable sets so that those declarations can
//! be renamed apart from the procedure being transformed.

use hashbrown::HashMap;
use itertools::Itertools;
use thiserror::Error;

use super::id::{SymName, TypeVar};
use crate::{
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PredOrFunc {
    Predicate,
    Function,
}

/// A type constructor: a qualified name plus the number of parameters it takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeCtor {
    pub name: SymName,
    pub arity: usize,
}

impl TypeCtor {
    pub fn new(module: &str, name: &str, arity: usize) -> Self {
        Self {
            name: SymName::qualified(module, name),
            arity,
        }
    }
}

impl core::fmt::Display for TypeCtor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    /// T
    Variable(TypeVar),
    /// list(T), int, io.state
    Defined(TypeCtor, Vec<Type>),
    /// {T1, T2, ...}
    ///
    /// All tuple arities share one type constructor at runtime
    Tuple(Vec<Type>),
    /// pred(T1, T2) or func(T1) = T2 (the return type is the last element)
    ///
    /// All higher-order types share the `pred` or `func` type constructor at
    /// runtime, so their type-infos carry the real arity
    HigherOrder {
        pred_or_func: PredOrFunc,
        args: Vec<Type>,
    },
}

impl Type {
    pub fn defined(module: &str, name: &str, args: Vec<Type>) -> Self {
        let ctor = TypeCtor::new(module, name, args.len());
        Type::Defined(ctor, args)
    }

    pub fn args(&self) -> &[Type] {
        match self {
            Type::Variable(_) => &[],
            Type::Defined(_, args) | Type::Tuple(args) | Type::HigherOrder { args, .. } => args,
        }
    }

    /// The type variables occurring in this type, in order of first
    /// occurrence and without duplicates
    pub fn type_vars(&self) -> Vec<TypeVar> {
        let mut vars = Vec::new();
        self.collect_type_vars(&mut vars);
        vars
    }

    pub fn collect_type_vars(&self, vars: &mut Vec<TypeVar>) {
        match self {
            Type::Variable(var) => {
                if !vars.contains(var) {
                    vars.push(*var);
                }
            }
            _ => {
                for arg in self.args() {
                    arg.collect_type_vars(vars);
                }
            }
        }
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Type::Variable(_) => false,
            _ => self.args().iter().all(Type::is_ground),
        }
    }

    /// Applies the substitution repeatedly until no bound variable is left
    pub fn apply_subst(&self, subst: &TypeSubst) -> Type {
        match self {
            Type::Variable(var) => match subst.get(*var) {
                // Bindings of a variable to itself are produced when matching a
                // signature against itself and must not loop
                Some(Type::Variable(bound)) if bound == var => self.clone(),
                Some(ty) => ty.apply_subst(subst),
                None => self.clone(),
            },
            _ => self.map_args(|arg| arg.apply_subst(subst)),
        }
    }

    pub fn apply_renaming(&self, renaming: &TypeRenaming) -> Type {
        match self {
            Type::Variable(var) => Type::Variable(renaming.get(var).copied().unwrap_or(*var)),
            _ => self.map_args(|arg| arg.apply_renaming(renaming)),
        }
    }

    fn map_args(&self, mut f: impl FnMut(&Type) -> Type) -> Type {
        match self {
            Type::Variable(_) => self.clone(),
            Type::Defined(ctor, args) => Type::Defined(*ctor, args.iter().map(&mut f).collect()),
            Type::Tuple(args) => Type::Tuple(args.iter().map(&mut f).collect()),
            Type::HigherOrder { pred_or_func, args } => Type::HigherOrder {
                pred_or_func: *pred_or_func,
                args: args.iter().map(&mut f).collect(),
            },
        }
    }

    fn same_constructor(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Defined(a, _), Type::Defined(b, _)) => a == b,
            (Type::Tuple(a), Type::Tuple(b)) => a.len() == b.len(),
            (
                Type::HigherOrder {
                    pred_or_func: pf_a,
                    args: a,
                },
                Type::HigherOrder {
                    pred_or_func: pf_b,
                    args: b,
                },
            ) => pf_a == pf_b && a.len() == b.len(),
            _ => false,
        }
    }
}

pub fn type_list_vars(types: &[Type]) -> Vec<TypeVar> {
    let mut vars = Vec::new();
    for ty in types {
        ty.collect_type_vars(&mut vars);
    }
    vars
}

/// Names (if any) of the type variables of one predicate, constructor, class
/// or instance declaration
#[derive(Debug, Clone, Default)]
pub struct TypeVarSet {
    names: IndexVec<TypeVar, Option<InternedSymbol>>,
}

/// Maps type variables of a merged set onto their new identity
pub type TypeRenaming = HashMap<TypeVar, TypeVar>;

impl TypeVarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_var(&mut self, name: Option<&str>) -> TypeVar {
        self.names.push(name.map(InternedSymbol::new))
    }

    pub fn new_named(&mut self, name: &str) -> TypeVar {
        self.new_var(Some(name))
    }

    pub fn name(&self, var: TypeVar) -> Option<InternedSymbol> {
        self.names.get(var).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Name used for this variable in generated identifiers: the source name
    /// when there is one, otherwise a numbered placeholder
    pub fn var_name(&self, var: TypeVar) -> String {
        match self.name(var) {
            Some(name) => name.to_string(),
            None => format!("T{}", var.index()),
        }
    }

    /// Appends the variables of `other` to this set, returning how the
    /// variables of `other` were renumbered
    pub fn merge(&mut self, other: &TypeVarSet) -> TypeRenaming {
        other
            .names
            .enumerate()
            .map(|(var, name)| (var, self.names.push(*name)))
            .collect()
    }

    pub fn type_to_string(&self, ty: &Type) -> String {
        match ty {
            Type::Variable(var) => self.var_name(*var),
            Type::Defined(ctor, args) if args.is_empty() => ctor.name.name.to_string(),
            Type::Defined(ctor, args) => format!(
                "{}({})",
                ctor.name.name,
                args.iter().map(|arg| self.type_to_string(arg)).join(", ")
            ),
            Type::Tuple(args) => format!(
                "{{{}}}",
                args.iter().map(|arg| self.type_to_string(arg)).join(", ")
            ),
            Type::HigherOrder {
                pred_or_func: PredOrFunc::Predicate,
                args,
            } => format!(
                "pred({})",
                args.iter().map(|arg| self.type_to_string(arg)).join(", ")
            ),
            Type::HigherOrder {
                pred_or_func: PredOrFunc::Function,
                args,
            } => match args.split_last() {
                Some((ret, params)) => format!(
                    "func({}) = {}",
                    params.iter().map(|arg| self.type_to_string(arg)).join(", "),
                    self.type_to_string(ret)
                ),
                None => "func".to_string(),
            },
        }
    }
}

/// A binding of type variables to types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSubst {
    bindings: HashMap<TypeVar, Type>,
}

impl TypeSubst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (TypeVar, Type)>) -> Self {
        Self {
            bindings: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, var: TypeVar) -> Option<&Type> {
        self.bindings.get(&var)
    }

    pub fn insert(&mut self, var: TypeVar, ty: Type) {
        self.bindings.insert(var, ty);
    }

    pub fn apply_to_list(&self, types: &[Type]) -> Vec<Type> {
        types.iter().map(|ty| ty.apply_subst(self)).collect()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeUnifyError {
    #[error("type mismatch between {0:?} and {1:?}")]
    Mismatch(Type, Type),
    #[error("type lists differ in length ({0} vs {1})")]
    LengthMismatch(usize, usize),
}

/// One-way matching: finds the substitution that instantiates `general` to
/// exactly `specific`, binding only variables of `general`
pub fn type_list_subsumes(general: &[Type], specific: &[Type]) -> Result<TypeSubst, TypeUnifyError> {
    if general.len() != specific.len() {
        return Err(TypeUnifyError::LengthMismatch(general.len(), specific.len()));
    }

    let mut subst = TypeSubst::new();
    for (g, s) in general.iter().zip(specific) {
        match_type(g, s, &mut subst)?;
    }

    Ok(subst)
}

fn match_type(general: &Type, specific: &Type, subst: &mut TypeSubst) -> Result<(), TypeUnifyError> {
    match general {
        Type::Variable(var) => match subst.get(*var) {
            Some(bound) if bound == specific => Ok(()),
            Some(bound) => Err(TypeUnifyError::Mismatch(bound.clone(), specific.clone())),
            None => {
                subst.insert(*var, specific.clone());
                Ok(())
            }
        },
        _ if general.same_constructor(specific) => {
            for (g, s) in general.args().iter().zip(specific.args()) {
                match_type(g, s, subst)?;
            }
            Ok(())
        }
        _ => Err(TypeUnifyError::Mismatch(general.clone(), specific.clone())),
    }
}
