//! The tabling transformation.
//!
//! Rewrites the body `G` of every procedure with a tabled evaluation method
//! into a wrapper that looks the call up in the procedure's call table,
//! switches on the status the runtime keeps for that call, and runs `G` only
//! when no usable answer exists yet. The wrappers for each method live in
//! [`loop_memo`], [`minimal_model`] and [`io`]; the trie and answer-block
//! plumbing they share is in [`trie`].
//!
//! Runs after polymorphism, so the type-infos and typeclass-infos of a
//! polymorphic procedure are ordinary head variables by now and are tabled
//! like any other input.

mod info;
mod io;
mod loop_memo;
mod minimal_model;
mod trie;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use log::debug;

pub use info::TableInfo;

use crate::{
    frontend::intern::InternedSymbol,
    index::IndexVec,
    middle::{
        diag::{Severity, report},
        hlds::{
            class::{ClassContext, ConstraintProofMap},
            goal::{ArgMode, Determinism, Goal, MaxSolutions},
            id::{PredProcId, ProgVar},
            module::{ImportStatus, ModuleInfo, PredInfo, PredOrigin, ProcInfo},
            quantification::requantify,
            table::{EvalMethod, MinimalModelMethod, ProcTableInfo},
            types::PredOrFunc,
        },
    },
};

/// How many solutions the code of a procedure produces, which decides the
/// shape of each wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeModel {
    Det,
    Semi,
    Non,
}

impl CodeModel {
    pub fn of(determinism: Determinism) -> Self {
        match (determinism.can_fail(), determinism.max_solutions()) {
            (_, MaxSolutions::Many) => CodeModel::Non,
            (true, _) => CodeModel::Semi,
            (false, _) => CodeModel::Det,
        }
    }
}

/// The head variables of a tabled procedure split by mode
pub struct TabledArgs {
    pub inputs: Vec<ProgVar>,
    pub outputs: Vec<ProgVar>,
}

impl TabledArgs {
    fn of(proc_info: &ProcInfo) -> Self {
        let mut args = TabledArgs {
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        for (&var, mode) in proc_info.head_vars.iter().zip(&proc_info.arg_modes) {
            match mode {
                ArgMode::In => args.inputs.push(var),
                ArgMode::Out => args.outputs.push(var),
                ArgMode::Unused => {}
            }
        }
        args
    }
}

/// A procedure made by the transformation to run part of a tabled one
pub struct ProcClone {
    pub name: String,
    pub head_vars: Vec<ProgVar>,
    pub arg_modes: Vec<ArgMode>,
    pub determinism: Determinism,
    pub body: Goal,
}

/// The result of transforming one procedure
pub struct Transformed {
    pub body: Goal,
    pub table_info: ProcTableInfo,
    pub call_table_tip: Option<ProgVar>,
    /// The generator of an own-stacks table, which shares the variable
    /// table of the procedure
    pub generator: Option<ProcClone>,
}

pub fn process_module(module_info: &mut ModuleInfo) {
    if module_info.options.trace_table_io && module_info.options.tabling_supported().is_ok() {
        io::annotate_io_procs(module_info);
    }

    for id in module_info.all_procs() {
        let eval_method = module_info.proc(id).eval_method.clone();
        if !eval_method.is_tabled() {
            continue;
        }

        if let Err(reason) = module_info.options.tabling_supported() {
            let pred = module_info.pred(id.pred_id);
            let desc = pred.describe();
            let context = pred.context;
            report!(
                module_info,
                Severity::Warning,
                context,
                Some(desc),
                "`pragma {eval_method}` ignored: {reason}"
            );
            module_info.proc_mut(id).eval_method = EvalMethod::Normal;
            continue;
        }

        transform_proc(module_info, id, &eval_method);
    }
}

fn transform_proc(module_info: &mut ModuleInfo, id: PredProcId, eval_method: &EvalMethod) {
    let pred = module_info.pred(id.pred_id);
    let proc_info = module_info.proc(id);
    debug!("table_gen: {} ({}) as {eval_method}", pred.describe(), id.proc_id);

    let args = TabledArgs::of(proc_info);
    let determinism = proc_info.determinism;
    let purity = proc_info.body.info.purity;
    let body = proc_info.body.clone();
    let head: BTreeSet<_> = proc_info.head_vars.iter().copied().collect();

    let mut info = TableInfo::new(module_info, id, pred, proc_info);
    let transformed = match eval_method {
        EvalMethod::Normal => return,
        EvalMethod::LoopCheck(attributes) => info.loop_check(body, determinism, &args, attributes),
        EvalMethod::Memo(attributes) => info.memo(body, determinism, &args, attributes),
        EvalMethod::MinimalModel(MinimalModelMethod::StackCopy, attributes) => {
            info.minimal_model_stack_copy(body, &args, attributes)
        }
        EvalMethod::MinimalModel(MinimalModelMethod::OwnStacks, attributes) => {
            info.minimal_model_own_stacks(body, &args, attributes)
        }
        EvalMethod::TableIo(decl, unitize) => info.table_io(body, *decl, *unitize, &args),
    };

    let new_body = info.wrap_promise_pure(requantify(transformed.body, &head), purity);
    let generator = transformed.generator.map(|clone| {
        let outside: BTreeSet<_> = clone.head_vars.iter().copied().collect();
        ProcClone {
            body: info.wrap_promise_pure(requantify(clone.body, &outside), purity),
            ..clone
        }
    });
    let (var_table, tvarset, rtti_varmaps) = info.into_parts();

    let generator = generator.map(|clone| {
        let pred = module_info.pred(id.pred_id);
        let mut proc_info = ProcInfo::new(
            var_table.clone(),
            clone.head_vars,
            clone.arg_modes,
            clone.determinism,
            clone.body,
        );
        proc_info.rtti_varmaps = rtti_varmaps.clone();
        let mut generator = cloned_pred(module_info, pred, &clone.name, proc_info);
        generator.tvarset = tvarset.clone();
        generator
    });

    module_info.pred_mut(id.pred_id).tvarset = tvarset;
    let proc_info = module_info.proc_mut(id);
    proc_info.var_table = var_table;
    proc_info.rtti_varmaps = rtti_varmaps;
    proc_info.body = new_body;
    proc_info.table_info = Some(transformed.table_info);
    proc_info.call_table_tip = transformed.call_table_tip;

    // The consumer's closure names the next free predicate id
    if let Some(generator) = generator {
        module_info.add_pred(generator);
    }
}

/// A local predicate with the single procedure `proc_info`, made from
/// `original` by the transformation
fn cloned_pred(module_info: &ModuleInfo, original: &PredInfo, name: &str, proc_info: ProcInfo) -> PredInfo {
    let arg_types = proc_info
        .head_vars
        .iter()
        .map(|var| proc_info.var_table.ty(*var).clone())
        .collect();
    PredInfo {
        module: module_info.name,
        name: InternedSymbol::new(&fresh_pred_name(module_info, name)),
        orig_arity: proc_info.head_vars.len(),
        pred_or_func: PredOrFunc::Predicate,
        origin: PredOrigin::CreatedForTabling,
        status: ImportStatus::Local,
        markers: Vec::new(),
        context: original.context,
        tvarset: original.tvarset.clone(),
        arg_types,
        exist_qvars: Vec::new(),
        class_context: ClassContext::default(),
        constraint_proofs: ConstraintProofMap::new(),
        procs: IndexVec::from_raw(vec![proc_info]),
    }
}

/// `base`, or `base_N` for the first `N` that no predicate of the module
/// is called
fn fresh_pred_name(module_info: &ModuleInfo, base: &str) -> String {
    if !module_info.is_pred_name_taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|name| !module_info.is_pred_name_taken(name))
        .unwrap_or_else(|| base.to_string())
}
