//! Goals: a tagged union of goal kinds (`GoalExpr`) plus a positional
//! annotation record (`GoalInfo`). Passes never mutate a goal in place; they
//! take goals by value and return rebuilt ones.

use std::collections::BTreeSet;

use super::{
    class::ClassId,
    id::{Context, PredProcId, ProgVar, SymName},
    types::{PredOrFunc, TypeCtor},
};
use crate::frontend::intern::InternedSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Determinism {
    Det,
    Semidet,
    Multi,
    Nondet,
    CcMulti,
    CcNondet,
    Erroneous,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MaxSolutions {
    Zero,
    One,
    Many,
}

impl Determinism {
    pub fn can_fail(self) -> bool {
        matches!(
            self,
            Determinism::Semidet | Determinism::Nondet | Determinism::CcNondet | Determinism::Failure
        )
    }

    pub fn max_solutions(self) -> MaxSolutions {
        match self {
            Determinism::Erroneous | Determinism::Failure => MaxSolutions::Zero,
            Determinism::Det | Determinism::Semidet | Determinism::CcMulti | Determinism::CcNondet => {
                MaxSolutions::One
            }
            Determinism::Multi | Determinism::Nondet => MaxSolutions::Many,
        }
    }

    pub fn from_components(can_fail: bool, max_solutions: MaxSolutions) -> Self {
        match (can_fail, max_solutions) {
            (false, MaxSolutions::Zero) => Determinism::Erroneous,
            (true, MaxSolutions::Zero) => Determinism::Failure,
            (false, MaxSolutions::One) => Determinism::Det,
            (true, MaxSolutions::One) => Determinism::Semidet,
            (false, MaxSolutions::Many) => Determinism::Multi,
            (true, MaxSolutions::Many) => Determinism::Nondet,
        }
    }

    /// Determinism of `a, b`
    pub fn conjoin(self, other: Self) -> Self {
        let max = match (self.max_solutions(), other.max_solutions()) {
            (MaxSolutions::Zero, _) | (_, MaxSolutions::Zero) => MaxSolutions::Zero,
            (a, b) => a.max(b),
        };
        Self::from_components(self.can_fail() || other.can_fail(), max)
    }

    /// Determinism of `a ; b`
    pub fn disjoin(self, other: Self) -> Self {
        let max = match (self.max_solutions(), other.max_solutions()) {
            (MaxSolutions::Zero, x) | (x, MaxSolutions::Zero) => x,
            _ => MaxSolutions::Many,
        };
        Self::from_components(self.can_fail() && other.can_fail(), max)
    }

    /// Determinism of a choice between alternatives of which at most one is
    /// taken (switch arms, if-then-else branches)
    pub fn switch_join(self, other: Self) -> Self {
        Self::from_components(
            self.can_fail() || other.can_fail(),
            self.max_solutions().max(other.max_solutions()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Purity {
    Pure,
    Semipure,
    Impure,
}

impl Purity {
    pub fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Purity::Impure, _) | (_, Purity::Impure) => Purity::Impure,
            (Purity::Semipure, _) | (_, Purity::Semipure) => Purity::Semipure,
            _ => Purity::Pure,
        }
    }
}

/// Argument modes are reduced to the direction of data flow; instantiation
/// states beyond that are the business of mode analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArgMode {
    In,
    Out,
    Unused,
}

impl ArgMode {
    pub fn is_input(self) -> bool {
        self == ArgMode::In
    }

    pub fn is_output(self) -> bool {
        self == ArgMode::Out
    }
}

/// Which variables a goal binds, and whether it can succeed at all
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstmapDelta {
    pub bound: BTreeSet<ProgVar>,
    pub unreachable: bool,
}

impl InstmapDelta {
    pub fn binding(vars: impl IntoIterator<Item = ProgVar>) -> Self {
        Self {
            bound: vars.into_iter().collect(),
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            bound: BTreeSet::new(),
            unreachable: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoalInfo {
    pub nonlocals: BTreeSet<ProgVar>,
    pub instmap_delta: InstmapDelta,
    pub determinism: Determinism,
    pub purity: Purity,
    pub context: Context,
}

impl GoalInfo {
    pub fn new(determinism: Determinism, context: Context) -> Self {
        Self {
            nonlocals: BTreeSet::new(),
            instmap_delta: InstmapDelta::default(),
            determinism,
            purity: Purity::Pure,
            context,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Goal {
    pub expr: GoalExpr,
    pub info: GoalInfo,
}

impl Goal {
    /// The direct subgoal at `index` of a goal path step. Lambda bodies are
    /// not subgoals.
    pub fn child_mut(&mut self, index: usize) -> Option<&mut Goal> {
        match &mut self.expr {
            GoalExpr::Conj(_, goals) | GoalExpr::Disj(goals) => goals.get_mut(index),
            GoalExpr::Switch(switch) => switch.cases.get_mut(index).map(|case| &mut case.goal),
            GoalExpr::Negation(goal) | GoalExpr::Scope(_, goal) => (index == 0).then_some(&mut **goal),
            GoalExpr::IfThenElse(ite) => match index {
                0 => Some(&mut ite.cond),
                1 => Some(&mut ite.then),
                2 => Some(&mut ite.else_),
                _ => None,
            },
            GoalExpr::PlainCall(_)
            | GoalExpr::GenericCall(_)
            | GoalExpr::ForeignProc(_)
            | GoalExpr::Unify(_) => None,
        }
    }
}

#[cfg(test)]
impl Goal {
    /// The direct subgoals, in the order goal paths number them. Lambda
    /// bodies are not subgoals.
    pub fn children(&self) -> Vec<&Goal> {
        match &self.expr {
            GoalExpr::Conj(_, goals) | GoalExpr::Disj(goals) => goals.iter().collect(),
            GoalExpr::Switch(switch) => switch.cases.iter().map(|case| &case.goal).collect(),
            GoalExpr::Negation(goal) | GoalExpr::Scope(_, goal) => vec![&**goal],
            GoalExpr::IfThenElse(ite) => vec![&ite.cond, &ite.then, &ite.else_],
            GoalExpr::PlainCall(_)
            | GoalExpr::GenericCall(_)
            | GoalExpr::ForeignProc(_)
            | GoalExpr::Unify(_) => Vec::new(),
        }
    }

    /// Visits the goal and every goal inside it, lambda bodies included,
    /// in pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Goal)) {
        visit(self);
        if let GoalExpr::Unify(Unify {
            rhs: UnifyRhs::Lambda(lambda),
            ..
        }) = &self.expr
        {
            lambda.body.walk(visit);
        }
        for child in self.children() {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConjKind {
    Plain,
    Parallel,
}

#[derive(Debug, Clone)]
pub enum GoalExpr {
    Conj(ConjKind, Vec<Goal>),
    Disj(Vec<Goal>),
    Switch(Switch),
    Negation(Box<Goal>),
    IfThenElse(Box<IfThenElse>),
    Scope(ScopeReason, Box<Goal>),
    PlainCall(PlainCall),
    GenericCall(GenericCall),
    ForeignProc(ForeignProc),
    Unify(Unify),
}

#[derive(Debug, Clone)]
pub struct Switch {
    pub var: ProgVar,
    pub can_fail: bool,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub cons_id: ConsId,
    pub goal: Goal,
}

#[derive(Debug, Clone)]
pub struct IfThenElse {
    /// Variables quantified over the condition and then branch
    pub vars: Vec<ProgVar>,
    pub cond: Goal,
    pub then: Goal,
    pub else_: Goal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeReason {
    Exists(Vec<ProgVar>),
    Promise(Purity),
}

#[derive(Debug, Clone)]
pub struct PlainCall {
    pub callee: PredProcId,
    pub name: SymName,
    pub args: Vec<ProgVar>,
}

#[derive(Debug, Clone)]
pub enum GenericCallKind {
    /// Call of a closure
    HigherOrder { closure: ProgVar },
    /// Insertion of a tuple into a relation of the aggregate subsystem. The
    /// arguments are the tuple's values followed by the relation state pair.
    TupleInsert { relation: PredProcId },
}

#[derive(Debug, Clone)]
pub struct GenericCall {
    pub kind: GenericCallKind,
    pub args: Vec<ProgVar>,
    pub modes: Vec<ArgMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TabledForIo {
    NotTabledForIo,
    TabledForIo,
    TabledForIoUnitize,
    TabledForDescendantIo,
}

#[derive(Debug, Clone, Default)]
pub struct ForeignAttributes {
    /// `None` when the foreign code made no claim either way
    pub tabled_for_io: Option<TabledForIo>,
    pub may_call_mercury: bool,
}

#[derive(Debug, Clone)]
pub struct ForeignArg {
    pub var: ProgVar,
    /// The name the foreign code uses for the argument
    pub name: Option<InternedSymbol>,
    pub mode: ArgMode,
}

#[derive(Debug, Clone)]
pub struct ForeignProc {
    pub callee: PredProcId,
    pub attributes: ForeignAttributes,
    pub args: Vec<ForeignArg>,
    /// Arguments the foreign code needs that are not arguments of the callee
    pub extra_args: Vec<ForeignArg>,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct Unify {
    pub lhs: ProgVar,
    pub rhs: UnifyRhs,
    pub kind: Unification,
}

#[derive(Debug, Clone)]
pub enum UnifyRhs {
    Var(ProgVar),
    Functor {
        cons_id: ConsId,
        args: Vec<ProgVar>,
    },
    Lambda(Box<Lambda>),
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub purity: Purity,
    pub pred_or_func: PredOrFunc,
    /// Variables captured from the enclosing clause
    pub nonlocals: Vec<ProgVar>,
    pub args: Vec<ProgVar>,
    pub modes: Vec<ArgMode>,
    pub determinism: Determinism,
    pub body: Goal,
}

#[derive(Debug, Clone)]
pub enum Unification {
    Construct {
        var: ProgVar,
        cons_id: ConsId,
        args: Vec<ProgVar>,
    },
    Deconstruct {
        var: ProgVar,
        cons_id: ConsId,
        args: Vec<ProgVar>,
        can_fail: bool,
    },
    Assign {
        to: ProgVar,
        from: ProgVar,
    },
    SimpleTest {
        left: ProgVar,
        right: ProgVar,
    },
    /// A unification that will later be turned into a call of the type's
    /// unification predicate, which needs these witnesses
    Complicated {
        can_fail: bool,
        type_info_vars: Vec<ProgVar>,
    },
}

/// The runtime type constructor a type-ctor-info describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RttiTypeCtor {
    Defined(TypeCtor),
    Tuple,
    HigherOrder(PredOrFunc),
}

impl RttiTypeCtor {
    pub fn has_variable_arity(self) -> bool {
        !matches!(self, RttiTypeCtor::Defined(_))
    }
}

impl core::fmt::Display for RttiTypeCtor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RttiTypeCtor::Defined(ctor) => write!(f, "{ctor}"),
            RttiTypeCtor::Tuple => write!(f, "builtin.tuple/0"),
            RttiTypeCtor::HigherOrder(pred_or_func) => write!(f, "builtin.{pred_or_func}/0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConsId {
    Cons(SymName, usize),
    Tuple(usize),
    Int(i64),
    String(InternedSymbol),
    /// The address of a procedure, with no captured arguments yet
    Closure(PredProcId),
    /// Reference to the statically allocated type-ctor-info of a type
    TypeCtorInfoConst(RttiTypeCtor),
    /// Reference to the statically allocated method table of an instance
    BaseTypeclassInfoConst {
        module: SymName,
        class_id: ClassId,
        instance_num: usize,
        instance_string: InternedSymbol,
    },
    TypeInfoCell(RttiTypeCtor),
    TypeclassInfoCell,
    /// The root of the call table of a tabled procedure
    TablingInfoConst(PredProcId),
    /// The descriptor of an I/O tabled procedure, saved with its answers
    TableIoEntryConst(PredProcId),
}

impl ConsId {
    pub fn int(value: i64) -> Self {
        ConsId::Int(value)
    }

    pub fn string(value: &str) -> Self {
        ConsId::String(InternedSymbol::new(value))
    }
}
