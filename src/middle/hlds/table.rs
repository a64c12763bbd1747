//! Evaluation methods of procedures and the table layout records the tabling
//! transformation attaches to the procedures it rewrites.

use itertools::Itertools;

use super::{id::ProgVar, types::Type};

/// How each input argument is looked up in the call table
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ArgTablingMethod {
    Value,
    Addr,
    /// The caller promises the argument is implied by the others; it is not
    /// looked up at all
    PromiseImplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strictness {
    AllStrict,
    AllFastLoose,
    /// One entry per input argument, in argument order
    Specified(Vec<ArgTablingMethod>),
}

impl Strictness {
    pub fn method_for_input(&self, input_num: usize) -> ArgTablingMethod {
        match self {
            Strictness::AllStrict => ArgTablingMethod::Value,
            Strictness::AllFastLoose => ArgTablingMethod::Addr,
            Strictness::Specified(methods) => methods
                .get(input_num)
                .copied()
                .unwrap_or(ArgTablingMethod::Value),
        }
    }
}

impl core::fmt::Display for Strictness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strictness::AllStrict => write!(f, "all_strict"),
            Strictness::AllFastLoose => write!(f, "all_fast_loose"),
            Strictness::Specified(methods) => write!(f, "specified([{}])", methods.iter().join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAttributes {
    pub strictness: Strictness,
}

impl Default for TableAttributes {
    fn default() -> Self {
        Self {
            strictness: Strictness::AllStrict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MinimalModelMethod {
    StackCopy,
    OwnStacks,
}

/// Whether the answers of an I/O tabled procedure are described well
/// enough for the declarative debugger, or only for retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TableIoDecl {
    Proc,
    Decl,
}

/// Whether I/O actions performed inside the procedure are tabled on their
/// own or the whole call is treated as one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TableIoUnitize {
    Alone,
    Unitize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EvalMethod {
    #[default]
    Normal,
    LoopCheck(TableAttributes),
    Memo(TableAttributes),
    MinimalModel(MinimalModelMethod, TableAttributes),
    TableIo(TableIoDecl, TableIoUnitize),
}

impl EvalMethod {
    pub fn is_tabled(&self) -> bool {
        !matches!(self, EvalMethod::Normal)
    }
}

impl core::fmt::Display for EvalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalMethod::Normal => write!(f, "normal"),
            EvalMethod::LoopCheck(attrs) => write!(f, "loop_check({})", attrs.strictness),
            EvalMethod::Memo(attrs) => write!(f, "memo({})", attrs.strictness),
            EvalMethod::MinimalModel(method, _) => write!(f, "minimal_model_{method}"),
            EvalMethod::TableIo(decl, unitize) => write!(f, "table_io({decl}, {unitize})"),
        }
    }
}

/// The lookup performed for one input argument of a call table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableTrieStep {
    Dummy,
    Int,
    Char,
    String,
    Float,
    /// An enumeration with this many constants
    Enum(usize),
    /// Any other type, tabled through its type-info
    General {
        ty: Type,
        is_poly: bool,
        by_addr: bool,
    },
    TypeInfo,
    TypeclassInfo,
    PromiseImplied,
}

impl core::fmt::Display for TableTrieStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableTrieStep::Dummy => write!(f, "dummy"),
            TableTrieStep::Int => write!(f, "int"),
            TableTrieStep::Char => write!(f, "char"),
            TableTrieStep::String => write!(f, "string"),
            TableTrieStep::Float => write!(f, "float"),
            TableTrieStep::Enum(n) => write!(f, "enum({n})"),
            TableTrieStep::General { is_poly, by_addr, .. } => write!(
                f,
                "general({}, {})",
                if *is_poly { "poly" } else { "mono" },
                if *by_addr { "addr" } else { "value" }
            ),
            TableTrieStep::TypeInfo => write!(f, "typeinfo"),
            TableTrieStep::TypeclassInfo => write!(f, "typeclassinfo"),
            TableTrieStep::PromiseImplied => write!(f, "promise_implied"),
        }
    }
}

/// One tabled argument: its variable, its slot in the call table (inputs) or
/// answer block (outputs), and its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArgInfo {
    pub var: ProgVar,
    pub slot: usize,
    pub ty: Type,
}

/// Table layout of a tabled procedure, read by the code generator and by the
/// debugger's introspection tables
#[derive(Debug, Clone)]
pub enum ProcTableInfo {
    CallTable {
        steps: Vec<TableTrieStep>,
        inputs: Vec<TableArgInfo>,
        outputs: Vec<TableArgInfo>,
    },
    IoTable {
        decl: TableIoDecl,
        unitize: TableIoUnitize,
        inputs: Vec<TableArgInfo>,
        outputs: Vec<TableArgInfo>,
    },
}

impl ProcTableInfo {
    pub fn num_inputs(&self) -> usize {
        match self {
            ProcTableInfo::CallTable { inputs, .. } | ProcTableInfo::IoTable { inputs, .. } => {
                inputs.len()
            }
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self {
            ProcTableInfo::CallTable { outputs, .. } | ProcTableInfo::IoTable { outputs, .. } => {
                outputs.len()
            }
        }
    }
}
