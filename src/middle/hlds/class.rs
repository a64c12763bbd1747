//! Type classes, instances, constraints and the proofs the type checker
//! records for them.

use hashbrown::HashMap;
use itertools::Itertools;

use super::{
    id::SymName,
    types::{Type, TypeRenaming, TypeSubst, TypeVarSet, type_list_vars},
};
use crate::middle::hlds::id::TypeVar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId {
    pub name: SymName,
    pub arity: usize,
}

impl core::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// `foo(list(T))`: a class applied to the types it constrains
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassConstraint {
    pub class: SymName,
    pub args: Vec<Type>,
}

impl ClassConstraint {
    pub fn new(class: SymName, args: Vec<Type>) -> Self {
        Self { class, args }
    }

    pub fn class_id(&self) -> ClassId {
        ClassId {
            name: self.class,
            arity: self.args.len(),
        }
    }

    pub fn type_vars(&self) -> Vec<TypeVar> {
        type_list_vars(&self.args)
    }

    pub fn apply_subst(&self, subst: &TypeSubst) -> ClassConstraint {
        ClassConstraint {
            class: self.class,
            args: subst.apply_to_list(&self.args),
        }
    }

    pub fn apply_renaming(&self, renaming: &TypeRenaming) -> ClassConstraint {
        ClassConstraint {
            class: self.class,
            args: self.args.iter().map(|ty| ty.apply_renaming(renaming)).collect(),
        }
    }

    pub fn to_string_with(&self, tvarset: &TypeVarSet) -> String {
        format!(
            "{}({})",
            self.class.name,
            self.args.iter().map(|ty| tvarset.type_to_string(ty)).join(", ")
        )
    }
}

pub fn constraint_list_type_vars(constraints: &[ClassConstraint]) -> Vec<TypeVar> {
    let mut vars = Vec::new();
    for constraint in constraints {
        for ty in &constraint.args {
            ty.collect_type_vars(&mut vars);
        }
    }
    vars
}

/// How to obtain the witness of a constraint that is not a parameter of the
/// current procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintProof {
    /// Build it from the nth (0-based) instance declaration of the class
    ApplyInstance(usize),
    /// Extract it from the witness of a constraint whose class has this one as
    /// a superclass
    Superclass(ClassConstraint),
}

pub type ConstraintProofMap = HashMap<ClassConstraint, ConstraintProof>;

pub fn rename_proofs(proofs: &ConstraintProofMap, renaming: &TypeRenaming) -> ConstraintProofMap {
    proofs
        .iter()
        .map(|(constraint, proof)| {
            let proof = match proof {
                ConstraintProof::ApplyInstance(n) => ConstraintProof::ApplyInstance(*n),
                ConstraintProof::Superclass(parent) => {
                    ConstraintProof::Superclass(parent.apply_renaming(renaming))
                }
            };
            (constraint.apply_renaming(renaming), proof)
        })
        .collect()
}

pub fn subst_proofs(proofs: &ConstraintProofMap, subst: &TypeSubst) -> ConstraintProofMap {
    proofs
        .iter()
        .map(|(constraint, proof)| {
            let proof = match proof {
                ConstraintProof::ApplyInstance(n) => ConstraintProof::ApplyInstance(*n),
                ConstraintProof::Superclass(parent) => {
                    ConstraintProof::Superclass(parent.apply_subst(subst))
                }
            };
            (constraint.apply_subst(subst), proof)
        })
        .collect()
}

/// The universal and existential constraints of a predicate declaration
#[derive(Debug, Clone, Default)]
pub struct ClassContext {
    pub universal: Vec<ClassConstraint>,
    pub existential: Vec<ClassConstraint>,
}

impl ClassContext {
    pub fn num_constraints(&self) -> usize {
        self.universal.len() + self.existential.len()
    }
}

#[derive(Debug, Clone)]
pub struct ClassDefn {
    pub params: Vec<TypeVar>,
    /// Order is significant: the superclass witnesses of every typeclass-info
    /// of this class are stored in this order
    pub superclasses: Vec<ClassConstraint>,
    pub tvarset: TypeVarSet,
}

#[derive(Debug, Clone)]
pub struct InstanceDefn {
    pub module: SymName,
    pub constraints: Vec<ClassConstraint>,
    pub types: Vec<Type>,
    pub tvarset: TypeVarSet,
    /// Proofs of the class's superclass constraints instantiated to this
    /// instance's types, in the instance's type variables
    pub superclass_proofs: ConstraintProofMap,
}

/// Stable textual key distinguishing the instances of one class, used to
/// name base typeclass-infos (`list__list__arity1`)
pub fn make_instance_string(types: &[Type]) -> String {
    types
        .iter()
        .map(|ty| match ty {
            Type::Variable(_) => "var".to_string(),
            Type::Defined(ctor, _) => {
                let module = ctor
                    .name
                    .module
                    .map(|module| module.to_string())
                    .unwrap_or_default();
                format!("{module}__{}__arity{}", ctor.name.name, ctor.arity)
            }
            Type::Tuple(args) => format!("tuple__arity{}", args.len()),
            Type::HigherOrder { pred_or_func, args } => {
                format!("{pred_or_func}__arity{}", args.len())
            }
        })
        .join("__")
}
