//! Builtin types and the catalogue of runtime primitives the transformation
//! passes emit calls to.
//!
//! The names and arities below are a contract with the runtime support
//! library: the code generator resolves them by name, so renaming one is a
//! breaking change.

use strum::IntoEnumIterator;

use super::{
    goal::{ArgMode, ConsId, Determinism, Purity},
    id::SymName,
    types::{Type, TypeCtor, TypeVarSet},
};
use crate::middle::hlds::id::TypeVar;

pub const BUILTIN_MODULE: &str = "builtin";
pub const PRIVATE_BUILTIN_MODULE: &str = "private_builtin";
pub const TABLE_BUILTIN_MODULE: &str = "table_builtin";

pub fn int_type() -> Type {
    Type::defined(BUILTIN_MODULE, "int", vec![])
}

pub fn char_type() -> Type {
    Type::defined(BUILTIN_MODULE, "character", vec![])
}

pub fn string_type() -> Type {
    Type::defined(BUILTIN_MODULE, "string", vec![])
}

pub fn float_type() -> Type {
    Type::defined(BUILTIN_MODULE, "float", vec![])
}

pub fn void_type() -> Type {
    Type::defined(BUILTIN_MODULE, "void", vec![])
}

pub fn io_state_type() -> Type {
    Type::defined("io", "state", vec![])
}

pub fn type_info_type() -> Type {
    Type::defined(PRIVATE_BUILTIN_MODULE, "type_info", vec![])
}

pub fn type_ctor_info_type() -> Type {
    Type::defined(PRIVATE_BUILTIN_MODULE, "type_ctor_info", vec![])
}

pub fn typeclass_info_type() -> Type {
    Type::defined(PRIVATE_BUILTIN_MODULE, "typeclass_info", vec![])
}

pub fn base_typeclass_info_type() -> Type {
    Type::defined(PRIVATE_BUILTIN_MODULE, "base_typeclass_info", vec![])
}

pub fn io_state_ctor() -> TypeCtor {
    TypeCtor::new("io", "state", 0)
}

/// Opaque handles owned by the tabling runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TableHandle {
    MlTrieNode,
    MlAnswerBlock,
    MlMemoNonRecord,
    MlSubgoal,
    MlConsumer,
    MlGenerator,
    MlTableIoEntry,
}

impl TableHandle {
    pub fn to_type(self) -> Type {
        Type::defined(TABLE_BUILTIN_MODULE, self.into(), vec![])
    }
}

/// Status constants returned by the setup primitives. Every variant is one
/// constructor of the corresponding `table_builtin` enum type.
pub trait TableStatus: IntoEnumIterator + Copy + Into<&'static str> {
    const TYPE_NAME: &'static str;

    fn status_type() -> Type {
        Type::defined(TABLE_BUILTIN_MODULE, Self::TYPE_NAME, vec![])
    }

    fn cons_id(self) -> ConsId {
        ConsId::Cons(SymName::qualified(TABLE_BUILTIN_MODULE, self.into()), 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
pub enum LoopStatus {
    #[strum(serialize = "loop_inactive")]
    Inactive,
    #[strum(serialize = "loop_active")]
    Active,
}

impl TableStatus for LoopStatus {
    const TYPE_NAME: &'static str = "loop_status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
pub enum MemoDetStatus {
    #[strum(serialize = "memo_det_inactive")]
    Inactive,
    #[strum(serialize = "memo_det_active")]
    Active,
    #[strum(serialize = "memo_det_succeeded")]
    Succeeded,
}

impl TableStatus for MemoDetStatus {
    const TYPE_NAME: &'static str = "memo_det_status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
pub enum MemoSemiStatus {
    #[strum(serialize = "memo_semi_inactive")]
    Inactive,
    #[strum(serialize = "memo_semi_active")]
    Active,
    #[strum(serialize = "memo_semi_succeeded")]
    Succeeded,
    #[strum(serialize = "memo_semi_failed")]
    Failed,
}

impl TableStatus for MemoSemiStatus {
    const TYPE_NAME: &'static str = "memo_semi_status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
pub enum MemoNonStatus {
    #[strum(serialize = "memo_non_inactive")]
    Inactive,
    #[strum(serialize = "memo_non_active")]
    Active,
    #[strum(serialize = "memo_non_complete")]
    Complete,
    #[strum(serialize = "memo_non_incomplete")]
    Incomplete,
}

impl TableStatus for MemoNonStatus {
    const TYPE_NAME: &'static str = "memo_non_status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
pub enum MmStatus {
    #[strum(serialize = "mm_inactive")]
    Inactive,
    #[strum(serialize = "mm_active")]
    Active,
    #[strum(serialize = "mm_complete")]
    Complete,
}

impl TableStatus for MmStatus {
    const TYPE_NAME: &'static str = "mm_status";
}

/// Constructor names of every status type, keyed by type name
pub fn status_types() -> Vec<(&'static str, Vec<&'static str>)> {
    fn names<S: TableStatus>() -> (&'static str, Vec<&'static str>) {
        (S::TYPE_NAME, S::iter().map(Into::into).collect())
    }

    vec![
        names::<LoopStatus>(),
        names::<MemoDetStatus>(),
        names::<MemoSemiStatus>(),
        names::<MemoNonStatus>(),
        names::<MmStatus>(),
    ]
}

/// The type of one primitive argument. `Poly` is the primitive's single type
/// parameter; primitives that take one receive its type-info explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimType {
    Int,
    Char,
    String,
    Float,
    IoState,
    TypeInfo,
    TypeclassInfo,
    Handle(TableHandle),
    LoopStatus,
    MemoDetStatus,
    MemoSemiStatus,
    MemoNonStatus,
    MmStatus,
    /// A closure of the generator procedure of an own-stacks table
    GeneratorClosure,
    Poly,
}

impl PrimType {
    fn to_type(self, poly: Option<TypeVar>) -> Type {
        match self {
            PrimType::Int => int_type(),
            PrimType::Char => char_type(),
            PrimType::String => string_type(),
            PrimType::Float => float_type(),
            PrimType::IoState => io_state_type(),
            PrimType::TypeInfo => type_info_type(),
            PrimType::TypeclassInfo => typeclass_info_type(),
            PrimType::Handle(handle) => handle.to_type(),
            PrimType::LoopStatus => LoopStatus::status_type(),
            PrimType::MemoDetStatus => MemoDetStatus::status_type(),
            PrimType::MemoSemiStatus => MemoSemiStatus::status_type(),
            PrimType::MemoNonStatus => MemoNonStatus::status_type(),
            PrimType::MmStatus => MmStatus::status_type(),
            PrimType::GeneratorClosure => Type::HigherOrder {
                pred_or_func: super::types::PredOrFunc::Predicate,
                args: Vec::new(),
            },
            PrimType::Poly => match poly {
                Some(var) => Type::Variable(var),
                None => void_type(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum RuntimePrimitive {
    // private_builtin
    TypeInfoFromTypeclassInfo,
    SuperclassFromTypeclassInfo,
    InstanceConstraintFromTypeclassInfo,
    UnsafeTypeCast,

    // call table lookups
    TableLookupInsertInt,
    TableLookupInsertStartInt,
    TableLookupInsertChar,
    TableLookupInsertString,
    TableLookupInsertFloat,
    TableLookupInsertEnum,
    TableLookupInsertUser,
    TableLookupInsertUserAddr,
    TableLookupInsertPoly,
    TableLookupInsertPolyAddr,
    TableLookupInsertTypeinfo,
    TableLookupInsertTypeclassinfo,

    // answer blocks
    TableSaveIntAnswer,
    TableSaveCharAnswer,
    TableSaveStringAnswer,
    TableSaveFloatAnswer,
    TableSaveIoStateAnswer,
    TableSaveAnyAnswer,
    TableSaveIoEntryAnswer,
    TableRestoreIntAnswer,
    TableRestoreCharAnswer,
    TableRestoreStringAnswer,
    TableRestoreFloatAnswer,
    TableRestoreIoStateAnswer,
    TableRestoreAnyAnswer,

    // loop check
    TableLoopSetup,
    TableLoopMarkAsInactive,
    TableLoopMarkAsInactiveAndFail,
    TableLoopMarkAsActiveAndFail,

    // memo
    TableMemoDetSetup,
    TableMemoSemiSetup,
    TableMemoNonSetup,
    TableMemoMarkAsSucceeded,
    TableMemoMarkAsFailed,
    TableMemoCreateAnswerBlock,
    TableMemoGetAnswerBlock,
    TableMemoNonGetAnswerTable,
    TableMemoNonAnswerIsNotDuplicate,
    TableMemoNonCreateAnswerBlock,
    TableMemoMarkAsIncomplete,
    TableMemoMarkAsCompleteAndFail,
    TableMemoReturnAllAnswersNondet,
    TableMemoReturnAllAnswersMulti,

    // minimal model, stack copy
    TableMmSetup,
    TableMmSuspendConsumer,
    TableMmReturnAllNondet,
    TableMmGetAnswerTable,
    TableMmAnswerIsNotDuplicate,
    TableMmCreateAnswerBlock,
    TableMmCompletion,

    // minimal model, own stacks
    TableMmosSaveInputs,
    TableMmosSetupConsumer,
    TableMmosConsumeNextAnswerNondet,
    TableMmosPickupInputs,
    TableMmosGetAnswerTable,
    TableMmosAnswerIsNotDuplicate,
    TableMmosCreateAnswerBlock,
    TableMmosReturnAnswer,
    TableMmosCompletion,

    // I/O
    TableIoInRange,
    TableIoHasAnswer,
    TableIoLeftBracketUnitizedGoal,
    TableIoRightBracketUnitizedGoal,
    TableIoCopyIoState,

    TableError,
}

/// Argument list, determinism and purity of a primitive
pub struct PrimitiveSig {
    pub args: &'static [(ArgMode, PrimType)],
    pub determinism: Determinism,
    pub purity: Purity,
}

const fn sig(
    args: &'static [(ArgMode, PrimType)],
    determinism: Determinism,
    purity: Purity,
) -> PrimitiveSig {
    PrimitiveSig {
        args,
        determinism,
        purity,
    }
}

use ArgMode::{In, Out};
use Determinism::{Det, Erroneous, Failure, Multi, Nondet, Semidet};
use PrimType as P;
use Purity::{Impure, Pure, Semipure};

const TRIE: PrimType = P::Handle(TableHandle::MlTrieNode);
const BLOCK: PrimType = P::Handle(TableHandle::MlAnswerBlock);
const RECORD: PrimType = P::Handle(TableHandle::MlMemoNonRecord);
const SUBGOAL: PrimType = P::Handle(TableHandle::MlSubgoal);
const CONSUMER: PrimType = P::Handle(TableHandle::MlConsumer);
const GENERATOR: PrimType = P::Handle(TableHandle::MlGenerator);
const IO_ENTRY: PrimType = P::Handle(TableHandle::MlTableIoEntry);

impl RuntimePrimitive {
    pub fn module(self) -> &'static str {
        match self {
            RuntimePrimitive::TypeInfoFromTypeclassInfo
            | RuntimePrimitive::SuperclassFromTypeclassInfo
            | RuntimePrimitive::InstanceConstraintFromTypeclassInfo
            | RuntimePrimitive::UnsafeTypeCast => PRIVATE_BUILTIN_MODULE,
            _ => TABLE_BUILTIN_MODULE,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn sym_name(self) -> SymName {
        SymName::qualified(self.module(), self.name())
    }

    pub fn arity(self) -> usize {
        self.signature().args.len()
    }

    pub fn signature(self) -> PrimitiveSig {
        match self {
            RuntimePrimitive::TypeInfoFromTypeclassInfo => {
                sig(&[(In, P::TypeclassInfo), (In, P::Int), (Out, P::TypeInfo)], Det, Pure)
            }
            RuntimePrimitive::SuperclassFromTypeclassInfo
            | RuntimePrimitive::InstanceConstraintFromTypeclassInfo => sig(
                &[(In, P::TypeclassInfo), (In, P::Int), (Out, P::TypeclassInfo)],
                Det,
                Pure,
            ),
            RuntimePrimitive::UnsafeTypeCast => sig(&[(In, P::Poly), (Out, P::Poly)], Det, Pure),

            RuntimePrimitive::TableLookupInsertInt => {
                sig(&[(In, TRIE), (In, P::Int), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertStartInt => {
                sig(&[(In, TRIE), (In, P::Int), (In, P::Int), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertChar => {
                sig(&[(In, TRIE), (In, P::Char), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertString => {
                sig(&[(In, TRIE), (In, P::String), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertFloat => {
                sig(&[(In, TRIE), (In, P::Float), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertEnum => {
                sig(&[(In, TRIE), (In, P::Int), (In, P::Poly), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertUser
            | RuntimePrimitive::TableLookupInsertUserAddr
            | RuntimePrimitive::TableLookupInsertPoly
            | RuntimePrimitive::TableLookupInsertPolyAddr => sig(
                &[(In, P::TypeInfo), (In, TRIE), (In, P::Poly), (Out, TRIE)],
                Det,
                Impure,
            ),
            RuntimePrimitive::TableLookupInsertTypeinfo => {
                sig(&[(In, TRIE), (In, P::TypeInfo), (Out, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableLookupInsertTypeclassinfo => {
                sig(&[(In, TRIE), (In, P::TypeclassInfo), (Out, TRIE)], Det, Impure)
            }

            RuntimePrimitive::TableSaveIntAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (In, P::Int)], Det, Impure)
            }
            RuntimePrimitive::TableSaveCharAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (In, P::Char)], Det, Impure)
            }
            RuntimePrimitive::TableSaveStringAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (In, P::String)], Det, Impure)
            }
            RuntimePrimitive::TableSaveFloatAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (In, P::Float)], Det, Impure)
            }
            RuntimePrimitive::TableSaveIoStateAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (In, P::IoState)], Det, Impure)
            }
            RuntimePrimitive::TableSaveAnyAnswer => sig(
                &[(In, P::TypeInfo), (In, BLOCK), (In, P::Int), (In, P::Poly)],
                Det,
                Impure,
            ),
            RuntimePrimitive::TableSaveIoEntryAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (In, IO_ENTRY)], Det, Impure)
            }
            RuntimePrimitive::TableRestoreIntAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (Out, P::Int)], Det, Semipure)
            }
            RuntimePrimitive::TableRestoreCharAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (Out, P::Char)], Det, Semipure)
            }
            RuntimePrimitive::TableRestoreStringAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (Out, P::String)], Det, Semipure)
            }
            RuntimePrimitive::TableRestoreFloatAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (Out, P::Float)], Det, Semipure)
            }
            RuntimePrimitive::TableRestoreIoStateAnswer => {
                sig(&[(In, BLOCK), (In, P::Int), (Out, P::IoState)], Det, Semipure)
            }
            RuntimePrimitive::TableRestoreAnyAnswer => sig(
                &[(In, P::TypeInfo), (In, BLOCK), (In, P::Int), (Out, P::Poly)],
                Det,
                Semipure,
            ),

            RuntimePrimitive::TableLoopSetup => {
                sig(&[(In, TRIE), (Out, P::LoopStatus)], Det, Impure)
            }
            RuntimePrimitive::TableLoopMarkAsInactive => sig(&[(In, TRIE)], Det, Impure),
            RuntimePrimitive::TableLoopMarkAsInactiveAndFail
            | RuntimePrimitive::TableLoopMarkAsActiveAndFail => {
                sig(&[(In, TRIE)], Failure, Impure)
            }

            RuntimePrimitive::TableMemoDetSetup => {
                sig(&[(In, TRIE), (Out, P::MemoDetStatus)], Det, Impure)
            }
            RuntimePrimitive::TableMemoSemiSetup => {
                sig(&[(In, TRIE), (Out, P::MemoSemiStatus)], Det, Impure)
            }
            RuntimePrimitive::TableMemoNonSetup => sig(
                &[(In, TRIE), (Out, RECORD), (Out, P::MemoNonStatus)],
                Det,
                Impure,
            ),
            RuntimePrimitive::TableMemoMarkAsSucceeded | RuntimePrimitive::TableMemoMarkAsFailed => {
                sig(&[(In, TRIE)], Det, Impure)
            }
            RuntimePrimitive::TableMemoCreateAnswerBlock => {
                sig(&[(In, TRIE), (In, P::Int), (Out, BLOCK)], Det, Impure)
            }
            RuntimePrimitive::TableMemoGetAnswerBlock => {
                sig(&[(In, TRIE), (Out, BLOCK)], Det, Semipure)
            }
            RuntimePrimitive::TableMemoNonGetAnswerTable => {
                sig(&[(In, RECORD), (Out, TRIE)], Det, Semipure)
            }
            RuntimePrimitive::TableMemoNonAnswerIsNotDuplicate => {
                sig(&[(In, TRIE)], Semidet, Impure)
            }
            RuntimePrimitive::TableMemoNonCreateAnswerBlock => {
                sig(&[(In, RECORD), (In, P::Int), (Out, BLOCK)], Det, Impure)
            }
            RuntimePrimitive::TableMemoMarkAsIncomplete => sig(&[(In, RECORD)], Det, Impure),
            RuntimePrimitive::TableMemoMarkAsCompleteAndFail => {
                sig(&[(In, RECORD)], Failure, Impure)
            }
            RuntimePrimitive::TableMemoReturnAllAnswersNondet => {
                sig(&[(In, RECORD), (Out, BLOCK)], Nondet, Semipure)
            }
            RuntimePrimitive::TableMemoReturnAllAnswersMulti => {
                sig(&[(In, RECORD), (Out, BLOCK)], Multi, Semipure)
            }

            RuntimePrimitive::TableMmSetup => sig(
                &[(In, TRIE), (Out, SUBGOAL), (Out, P::MmStatus)],
                Det,
                Impure,
            ),
            RuntimePrimitive::TableMmSuspendConsumer => {
                sig(&[(In, SUBGOAL), (Out, BLOCK)], Nondet, Impure)
            }
            RuntimePrimitive::TableMmReturnAllNondet => {
                sig(&[(In, SUBGOAL), (Out, BLOCK)], Nondet, Semipure)
            }
            RuntimePrimitive::TableMmGetAnswerTable => {
                sig(&[(In, SUBGOAL), (Out, TRIE)], Det, Semipure)
            }
            RuntimePrimitive::TableMmAnswerIsNotDuplicate => sig(&[(In, TRIE)], Semidet, Impure),
            RuntimePrimitive::TableMmCreateAnswerBlock => {
                sig(&[(In, SUBGOAL), (In, P::Int), (Out, BLOCK)], Det, Impure)
            }
            RuntimePrimitive::TableMmCompletion => sig(&[(In, SUBGOAL)], Det, Impure),

            // The input values travel as extra foreign arguments
            RuntimePrimitive::TableMmosSaveInputs => sig(&[], Det, Impure),
            RuntimePrimitive::TableMmosSetupConsumer => sig(
                &[(In, TRIE), (In, P::GeneratorClosure), (In, P::String), (Out, CONSUMER)],
                Det,
                Impure,
            ),
            RuntimePrimitive::TableMmosConsumeNextAnswerNondet => {
                sig(&[(In, CONSUMER), (Out, BLOCK)], Nondet, Impure)
            }
            RuntimePrimitive::TableMmosPickupInputs => sig(&[(Out, GENERATOR)], Det, Impure),
            RuntimePrimitive::TableMmosGetAnswerTable => {
                sig(&[(In, GENERATOR), (Out, TRIE)], Det, Semipure)
            }
            RuntimePrimitive::TableMmosAnswerIsNotDuplicate => {
                sig(&[(In, TRIE)], Semidet, Impure)
            }
            RuntimePrimitive::TableMmosCreateAnswerBlock => {
                sig(&[(In, GENERATOR), (In, P::Int), (Out, BLOCK)], Det, Impure)
            }
            RuntimePrimitive::TableMmosReturnAnswer => {
                sig(&[(In, GENERATOR), (In, BLOCK)], Det, Impure)
            }
            RuntimePrimitive::TableMmosCompletion => sig(&[(In, GENERATOR)], Failure, Impure),

            RuntimePrimitive::TableIoInRange => {
                sig(&[(Out, TRIE), (Out, P::Int), (Out, P::Int)], Semidet, Impure)
            }
            RuntimePrimitive::TableIoHasAnswer => sig(&[(In, TRIE)], Semidet, Semipure),
            RuntimePrimitive::TableIoLeftBracketUnitizedGoal => sig(&[(Out, P::Int)], Det, Impure),
            RuntimePrimitive::TableIoRightBracketUnitizedGoal => sig(&[(In, P::Int)], Det, Impure),
            RuntimePrimitive::TableIoCopyIoState => {
                sig(&[(In, P::IoState), (Out, P::IoState)], Det, Pure)
            }

            RuntimePrimitive::TableError => sig(&[(In, P::String)], Erroneous, Pure),
        }
    }

    pub fn is_polymorphic(self) -> bool {
        self.signature().args.iter().any(|(_, ty)| *ty == P::Poly)
    }

    /// Declared argument types, with `Poly` bound to the given variable
    pub fn arg_types(self, poly: Option<TypeVar>) -> Vec<Type> {
        self.signature()
            .args
            .iter()
            .map(|(_, ty)| ty.to_type(poly))
            .collect()
    }

    pub fn arg_modes(self) -> Vec<ArgMode> {
        self.signature().args.iter().map(|(mode, _)| *mode).collect()
    }

    /// Name of the runtime macro implementing the primitive, used when the
    /// primitive is emitted as inline foreign code
    pub fn c_macro(self) -> String {
        let name = self.name();
        match name.strip_prefix("table_") {
            Some(rest) => format!("MR_tbl_{rest}"),
            None => format!("MR_{name}"),
        }
    }

    /// A fresh type variable set for the primitive's declaration
    pub fn tvarset(self) -> (TypeVarSet, Option<TypeVar>) {
        let mut tvarset = TypeVarSet::new();
        let poly = self.is_polymorphic().then(|| tvarset.new_named("T"));
        (tvarset, poly)
    }
}

/// Whether calls of `module.name/arity` are left alone by the polymorphism
/// transformation: the type-info and typeclass-info manipulators take their
/// witnesses as ordinary arguments
pub fn no_type_info_builtin(module: &str, name: &str, arity: usize) -> bool {
    (module == PRIVATE_BUILTIN_MODULE || module == TABLE_BUILTIN_MODULE)
        && RuntimePrimitive::iter()
            .any(|prim| prim.module() == module && prim.name() == name && prim.arity() == arity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names_follow_the_runtime_convention() {
        assert_eq!(
            RuntimePrimitive::TableLookupInsertInt.name(),
            "table_lookup_insert_int"
        );
        assert_eq!(
            RuntimePrimitive::TableMemoNonAnswerIsNotDuplicate.name(),
            "table_memo_non_answer_is_not_duplicate"
        );
        assert_eq!(
            RuntimePrimitive::TableMmosConsumeNextAnswerNondet.c_macro(),
            "MR_tbl_mmos_consume_next_answer_nondet"
        );
        assert_eq!(
            RuntimePrimitive::TypeInfoFromTypeclassInfo.sym_name().to_string(),
            "private_builtin.type_info_from_typeclass_info"
        );
    }

    #[test]
    fn every_primitive_is_exempt_from_witness_passing() {
        for prim in RuntimePrimitive::iter() {
            assert!(
                no_type_info_builtin(prim.module(), prim.name(), prim.arity()),
                "{prim} is not exempt"
            );
        }
        assert!(!no_type_info_builtin(TABLE_BUILTIN_MODULE, "table_loop_setup", 3));
        assert!(!no_type_info_builtin("list", "append", 3));
    }

    #[test]
    fn status_constructors_are_prefixed_by_table_kind() {
        let names: Vec<&str> = MemoNonStatus::iter().map(Into::into).collect();

        assert_eq!(
            names,
            [
                "memo_non_inactive",
                "memo_non_active",
                "memo_non_complete",
                "memo_non_incomplete"
            ]
        );
    }
}
