//! Automatic parallelisation of the conjunctions selected by profiling
//! feedback.
//!
//! A candidate names a procedure and the path of child indexes from its body
//! to a conjunction. The conjunction is turned into a parallel one unless the
//! procedure already has explicit parallel goals, or the program changed
//! since the feedback was collected and the path no longer leads to a
//! sequential conjunction.

use log::debug;

use crate::middle::{
    diag::{Severity, report},
    hlds::{
        goal::{ConjKind, Goal, GoalExpr},
        module::{ModuleInfo, PredMarker},
    },
};

pub fn process_module(module_info: &mut ModuleInfo) {
    let candidates = std::mem::take(&mut module_info.parallelise_candidates);

    for candidate in &candidates {
        let pred = module_info.pred(candidate.proc.pred_id);
        let desc = pred.describe();
        let context = module_info.proc(candidate.proc).context;

        if pred.has_marker(PredMarker::ParallelConjunctions) {
            report!(
                module_info,
                Severity::Informational,
                context,
                Some(desc),
                "procedure already contains explicit parallel goals, skipping auto-parallelization"
            );
            continue;
        }

        let body = &mut module_info.proc_mut(candidate.proc).body;
        match follow_path(body, &candidate.goal_path) {
            Some(Goal {
                expr: GoalExpr::Conj(kind @ ConjKind::Plain, conjuncts),
                ..
            }) if conjuncts.len() > 1 => {
                debug!("auto_par: {desc} parallelised at {:?}", candidate.goal_path);
                *kind = ConjKind::Parallel;
            }
            _ => report!(
                module_info,
                Severity::Warning,
                context,
                Some(desc),
                "goal path {:?} of the parallelisation feedback does not lead to a conjunction, skipping it",
                candidate.goal_path
            ),
        }
    }

    module_info.parallelise_candidates = candidates;
}

fn follow_path<'a>(goal: &'a mut Goal, path: &[usize]) -> Option<&'a mut Goal> {
    path.iter()
        .try_fold(goal, |goal, &index| goal.child_mut(index))
}

#[cfg(test)]
mod tests {
    use super::process_module;
    use crate::{
        frontend::demos,
        middle::{
            diag::Severity,
            hlds::goal::{ConjKind, GoalExpr},
            options::Options,
        },
    };

    #[test]
    fn selected_conjunctions_become_parallel() {
        let (mut module_info, split) = demos::parallel(Options::default());
        process_module(&mut module_info);

        assert!(matches!(
            module_info.proc(split).body.expr,
            GoalExpr::Conj(ConjKind::Parallel, _)
        ));
        assert_eq!(module_info.num_errors, 0);
    }

    #[test]
    fn explicit_parallelism_and_stale_paths_are_reported() {
        let (mut module_info, _) = demos::parallel(Options::default());
        process_module(&mut module_info);

        let reported: Vec<_> = module_info
            .diagnostics
            .iter()
            .map(|diagnostic| (diagnostic.severity, diagnostic.pred.clone().unwrap_or_default()))
            .collect();
        assert_eq!(
            reported,
            [
                (Severity::Informational, "predicate `par.dup/3`".to_string()),
                (Severity::Warning, "predicate `par.split/3`".to_string()),
            ]
        );
        assert_eq!(
            module_info.diagnostics[0].message,
            "procedure already contains explicit parallel goals, skipping auto-parallelization"
        );
    }
}
