//! The HLDS and the passes run over it. Polymorphism makes type information
//! explicit first; the tabling transformation then treats the new witness
//! arguments like any other input, and auto-parallelisation runs last on the
//! final bodies.

pub mod auto_par;
pub mod diag;
pub mod hlds;
pub mod options;
pub mod polymorphism;
pub mod table_gen;

use log::info;
use thiserror::Error;

use hlds::module::ModuleInfo;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("compilation of module failed with {0} error(s)")]
    Errors(usize),
}

pub fn compile_module(module_info: &mut ModuleInfo) -> Result<(), CompileError> {
    info!("compiling module `{}`", module_info.name);

    polymorphism::process_module(module_info);
    table_gen::process_module(module_info);
    auto_par::process_module(module_info);

    match module_info.num_errors {
        0 => Ok(()),
        errors => Err(CompileError::Errors(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::{CompileError, compile_module};
    use crate::{
        frontend::demos::{self, Scenario},
        middle::options::Options,
    };

    #[test]
    fn every_scenario_compiles() {
        use strum::IntoEnumIterator;

        for scenario in Scenario::iter() {
            let mut module_info = scenario.build(Options::default());
            assert_eq!(compile_module(&mut module_info), Ok(()), "{scenario}");
        }
    }

    #[test]
    fn required_io_annotations_fail_the_module() {
        let (mut module_info, _) = demos::io_tabling(Options {
            trace_table_io: true,
            trace_table_io_require: true,
            ..Options::default()
        });

        assert_eq!(compile_module(&mut module_info), Err(CompileError::Errors(2)));
    }
}
