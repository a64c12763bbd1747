use clap::Parser as ClapParser;
use colored::Colorize;

use crate::{
    frontend::demos::Scenario,
    middle::{diag::Severity, hlds::pretty_print::pretty_print_module, options::Options},
};

mod frontend;
mod index;
mod middle;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Demonstration module to compile
    #[arg(long, value_enum)]
    scenario: Scenario,

    /// Only print the diagnostics, not the transformed module
    #[arg(long)]
    quiet: bool,

    #[command(flatten)]
    options: Options,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut module_info = args.scenario.build(args.options);
    let result = middle::compile_module(&mut module_info);

    if !args.quiet {
        pretty_print_module(&module_info);
    }
    for diagnostic in &module_info.diagnostics {
        eprintln!("{diagnostic}");
    }

    if let Err(err) = result {
        eprintln!("{}: {err}", "error".red().bold());
        std::process::exit(1);
    }

    let warnings = module_info
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .count();
    if warnings > 0 {
        eprintln!("{}: {warnings} warning(s)", "note".cyan());
    }
}
