//! The polymorphism transformation.
//!
//! Makes runtime type information explicit: every procedure with type
//! variables or class constraints in its signature gets extra parameters for
//! the type-infos and typeclass-infos describing them (see [`signature`]),
//! and every call of such a procedure gets matching arguments, built by the
//! goals of [`witness`] where the caller doesn't already have them.
//!
//! The pass runs over the module twice. The first run transforms procedure
//! heads and bodies. Call sites are transformed against the callee's declared
//! argument types, so those are only extended with the witness types in the
//! second run, once no body is left to transform.

mod goal;
mod info;
mod signature;
mod witness;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use log::debug;

pub use info::PolyInfo;
use signature::num_extra_args;

use crate::middle::hlds::{
    goal_util::conj,
    id::{PredId, PredProcId},
    module::ModuleInfo,
    quantification::requantify,
};

pub fn process_module(module_info: &mut ModuleInfo) {
    let pred_ids: Vec<PredId> = module_info.preds.indices().collect();

    for &pred_id in &pred_ids {
        if module_info.pred(pred_id).is_exempt_from_polymorphism() {
            continue;
        }
        let proc_ids: Vec<_> = module_info.pred(pred_id).procs.indices().collect();
        for proc_id in proc_ids {
            process_proc(module_info, PredProcId::new(pred_id, proc_id));
        }
    }

    for &pred_id in &pred_ids {
        fixup_pred_arg_types(module_info, pred_id);
    }
}

fn process_proc(module_info: &mut ModuleInfo, id: PredProcId) {
    let pred = module_info.pred(id.pred_id);
    let proc_info = module_info.proc(id);
    debug!("polymorphism: {} ({})", pred.describe(), id.proc_id);

    let mut info = PolyInfo::new(module_info, pred, proc_info);
    let head = info.setup_headvars(pred, proc_info);

    // Imported procedures only need their heads to match their callers
    let body = if pred.is_imported() {
        proc_info.body.clone()
    } else {
        let context = proc_info.body.info.context;
        let body = info.transform_goal(proc_info.body.clone());
        let produce_existq = info.produce_existq_tvars(pred, &proc_info.head_vars, &head, context);

        let has_exist = !pred.exist_qvars.is_empty() || !pred.class_context.existential.is_empty();
        let body = if produce_existq.is_empty() {
            body
        } else {
            let mut goals = vec![body];
            goals.extend(produce_existq);
            conj(goals, context)
        };

        if has_exist || !info.rtti_varmaps.is_empty() {
            let outside: BTreeSet<_> = head.head_vars.iter().copied().collect();
            requantify(body, &outside)
        } else {
            body
        }
    };

    let (var_table, tvarset, rtti_varmaps) = info.into_parts();

    module_info.pred_mut(id.pred_id).tvarset = tvarset;
    let proc_info = module_info.proc_mut(id);
    proc_info.var_table = var_table;
    proc_info.head_vars = head.head_vars;
    proc_info.arg_modes = head.arg_modes;
    proc_info.body = body;
    proc_info.rtti_varmaps = rtti_varmaps;
}

/// Puts the types of the witness parameters in front of the declared
/// argument types of a predicate, taking them from its first procedure
fn fixup_pred_arg_types(module_info: &mut ModuleInfo, pred_id: PredId) {
    let pred = module_info.pred(pred_id);
    let num_extra = num_extra_args(pred);
    if num_extra == 0 {
        return;
    }
    let Some(proc_info) = pred.procs.iter().next() else {
        return;
    };

    let mut arg_types: Vec<_> = proc_info.head_vars[..num_extra]
        .iter()
        .map(|var| proc_info.var_table.ty(*var).clone())
        .collect();
    arg_types.extend(pred.arg_types.iter().cloned());
    module_info.pred_mut(pred_id).arg_types = arg_types;
}
