//! Diagnostics collected while transforming a module.
//!
//! Problems in the user's program are accumulated on the module in emission
//! order through [`report!`]. Violations of what earlier passes guarantee are
//! compiler bugs and abort through [`internal_error!`] instead.

use colored::Colorize;

use super::hlds::id::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Informational,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub context: Context,
    /// Description of the predicate the diagnostic is about
    pub pred: Option<String>,
    pub message: String,
    /// Where in the compiler the diagnostic was emitted
    pub backtrace: Option<String>,
}

impl core::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(backtrace) = &self.backtrace {
            writeln!(f, "{}: {}", "backtrace".blue(), backtrace)?;
        }

        let severity = match self.severity {
            Severity::Error => "error".red(),
            Severity::Warning => "warning".yellow(),
            Severity::Informational => "info".cyan(),
        };
        write!(f, "{}: {severity}: ", self.context)?;
        if let Some(pred) = &self.pred {
            write!(f, "In {pred}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        type_name_of(f)
            .rsplit("::")
            .find(|&part| part != "f" && part != "{{closure}}")
            .unwrap_or("?")
    }};
}

pub(crate) use function;

/// Appends a diagnostic to the module's list
macro_rules! report {
    ($module_info:expr, $severity:expr, $context:expr, $pred:expr, $($message:tt)+) => {{
        #[cfg(feature = "error-backtrace")]
        let backtrace = Some(format!(
            "{}::{} (at {}:{}:{})",
            module_path!(),
            $crate::middle::diag::function!(),
            file!(),
            line!(),
            column!()
        ));
        #[cfg(not(feature = "error-backtrace"))]
        let backtrace = None;

        $module_info.add_diagnostic($crate::middle::diag::Diagnostic {
            severity: $severity,
            context: $context,
            pred: $pred,
            message: format!($($message)+),
            backtrace,
        })
    }};
}

pub(crate) use report;

/// Aborts compilation on a broken invariant of an earlier pass
macro_rules! internal_error {
    ($pred:expr, $($message:tt)+) => {
        panic!(
            "internal compiler error in {}: {} ({}::{})",
            $pred,
            format!($($message)+),
            module_path!(),
            $crate::middle::diag::function!()
        )
    };
}

pub(crate) use internal_error;
