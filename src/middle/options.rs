//! The compiler options the transformation passes consult.

/// Target language of code generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Target {
    #[default]
    C,
    Java,
    Csharp,
    Erlang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum GcMethod {
    None,
    #[default]
    Boehm,
    Accurate,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct Options {
    /// Language the module will be compiled to
    #[arg(long, value_enum, default_value_t = Target::C)]
    pub target: Target,

    /// Garbage collector of the generated program
    #[arg(long, value_enum, default_value_t = GcMethod::Boehm)]
    pub gc: GcMethod,

    /// Table the I/O actions of primitives annotated as tabled for I/O
    #[arg(long)]
    pub trace_table_io: bool,

    /// Table I/O for the declarative debugger, not just for retry
    #[arg(long)]
    pub trace_table_io_all: bool,

    /// Require every I/O primitive to carry a tabled-for-I/O annotation
    #[arg(long)]
    pub trace_table_io_require: bool,

    /// Also save and restore the I/O states themselves
    #[arg(long)]
    pub trace_table_io_states: bool,

    /// Only table I/O for retry, even for exported predicates
    #[arg(long)]
    pub trace_table_io_only_retry: bool,

    /// Emit tabling primitives as inline foreign code instead of calls
    #[arg(long)]
    pub tabling_via_extra_args: bool,
}

impl Options {
    /// Whether the target and runtime can support tabled evaluation at all
    pub fn tabling_supported(&self) -> Result<(), String> {
        if self.target != Target::C {
            return Err(format!("tabling is not supported when targeting {}", self.target));
        }
        if self.gc == GcMethod::Accurate {
            return Err("tabling is incompatible with accurate garbage collection".to_string());
        }
        Ok(())
    }
}
