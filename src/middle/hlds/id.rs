use crate::{frontend::intern::InternedSymbol, index::simple_index};

simple_index! {
    /// A program variable within one procedure's variable table
    pub struct ProgVar = "V_";
}

simple_index! {
    /// A type variable within one predicate's type variable set
    pub struct TypeVar = "T";
}

simple_index! {
    /// Identifies a predicate (or function) in the module's predicate table
    pub struct PredId = "pred";
}

simple_index! {
    /// Identifies one mode of a predicate
    pub struct ProcId = "proc";
}

/// Fully identifies a procedure within a module.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct PredProcId {
    pub pred_id: PredId,
    pub proc_id: ProcId,
}

impl PredProcId {
    pub fn new(pred_id: PredId, proc_id: ProcId) -> Self {
        Self { pred_id, proc_id }
    }
}

/// Source position a goal was derived from. Synthesized goals inherit the
/// context of the goal they were made for.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Context {
    pub file: InternedSymbol,
    pub line: u32,
}

impl Context {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: InternedSymbol::new(file),
            line,
        }
    }

    /// Context used for goals that have no source counterpart
    pub fn dummy() -> Self {
        Self::new("", 0)
    }
}

impl core::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A possibly module-qualified name (`list.append`, `private_builtin.type_info`)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct SymName {
    pub module: Option<InternedSymbol>,
    pub name: InternedSymbol,
}

impl SymName {
    pub fn qualified(module: &str, name: &str) -> Self {
        Self {
            module: Some(InternedSymbol::new(module)),
            name: InternedSymbol::new(name),
        }
    }

    pub fn unqualified(name: &str) -> Self {
        Self {
            module: None,
            name: InternedSymbol::new(name),
        }
    }
}

impl core::fmt::Display for SymName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.module {
            Some(module) => write!(f, "{module}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
