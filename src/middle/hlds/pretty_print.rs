use colored::Colorize;
use itertools::Itertools;

use super::{
    goal::{
        ConjKind, ConsId, GenericCallKind, Goal, GoalExpr, Purity, ScopeReason, Unification,
        UnifyRhs,
    },
    id::{PredProcId, ProgVar},
    module::{ModuleInfo, ProcInfo, TypeInfoLocn},
    table::{EvalMethod, ProcTableInfo},
    types::TypeVarSet,
};

pub fn pretty_print_module(module_info: &ModuleInfo) {
    for pred_proc_id in module_info.all_procs() {
        let pred = module_info.pred(pred_proc_id.pred_id);
        if pred.module != module_info.name {
            continue;
        }
        println!("{}", proc_to_string(module_info, pred_proc_id));
    }
}

/// Renders one procedure as declaration, table annotations, witness maps and
/// clause
pub fn proc_to_string(module_info: &ModuleInfo, pred_proc_id: PredProcId) -> String {
    let pred = module_info.pred(pred_proc_id.pred_id);
    let proc_info = module_info.proc(pred_proc_id);
    let mut printer = GoalPrinter {
        module_info,
        proc_info,
        tvarset: &pred.tvarset,
        out: String::new(),
    };

    let args = proc_info
        .head_vars
        .iter()
        .zip(&proc_info.arg_modes)
        .map(|(var, mode)| {
            format!(
                "{} :: {}",
                printer.var(*var),
                mode.to_string().cyan()
            )
        })
        .join(", ");
    printer.out += &format!(
        "{} {}({args}) {} {}.\n",
        format!(":- {}", pred.pred_or_func).magenta(),
        pred.sym_name().to_string().blue(),
        "is".magenta(),
        proc_info.determinism
    );

    if proc_info.eval_method != EvalMethod::Normal {
        printer.out += &format!(
            "{} {}.\n",
            ":- pragma".magenta(),
            proc_info.eval_method
        );
    }

    printer.rtti_comments();
    printer.table_comments();

    let head = proc_info.head_vars.iter().map(|var| printer.var(*var)).join(", ");
    printer.out += &format!("{}({head}) {}\n", pred.name.to_string().blue(), ":-".white());
    printer.goal(&proc_info.body, 1);
    printer.out += ".";
    printer.out
}

struct GoalPrinter<'a> {
    module_info: &'a ModuleInfo,
    proc_info: &'a ProcInfo,
    tvarset: &'a TypeVarSet,
    out: String,
}

impl GoalPrinter<'_> {
    fn var(&self, var: ProgVar) -> String {
        self.proc_info.var_table.name(var)
    }

    fn vars(&self, vars: &[ProgVar]) -> String {
        vars.iter().map(|var| self.var(*var)).join(", ")
    }

    fn pred_name(&self, pred_proc_id: PredProcId) -> String {
        self.module_info.pred(pred_proc_id.pred_id).name.to_string()
    }

    fn rtti_comments(&mut self) {
        let maps = &self.proc_info.rtti_varmaps;
        let tvarset = self.tvarset;
        for (tvar, locn) in &maps.type_info_locations {
            let locn = match locn {
                TypeInfoLocn::Direct(var) => self.var(*var),
                TypeInfoLocn::ViaTypeclassInfo(var, slot) => {
                    format!("{}[{slot}]", self.var(*var))
                }
            };
            self.out += &format!(
                "{}\n",
                format!("% type_info for {}: {locn}", tvarset.var_name(*tvar)).bright_black()
            );
        }
        for (constraint, var) in &maps.typeclass_info_vars {
            self.out += &format!(
                "{}\n",
                format!(
                    "% typeclass_info for {}: {}",
                    constraint.to_string_with(tvarset),
                    self.var(*var)
                )
                .bright_black()
            );
        }
    }

    fn table_comments(&mut self) {
        let Some(table_info) = &self.proc_info.table_info else {
            return;
        };
        let line = match table_info {
            ProcTableInfo::CallTable { steps, .. } => {
                format!("% call table steps: [{}]", steps.iter().join(", "))
            }
            ProcTableInfo::IoTable { decl, unitize, .. } => {
                format!("% io table: {decl}, {unitize}")
            }
        };
        self.out += &format!(
            "{}\n{}\n",
            line.bright_black(),
            format!(
                "% inputs: {}, outputs: {}",
                table_info.num_inputs(),
                table_info.num_outputs()
            )
            .bright_black()
        );
    }

    fn cons_id(&self, cons_id: &ConsId) -> String {
        match cons_id {
            ConsId::Cons(name, _) => name.name.to_string(),
            ConsId::Tuple(_) => "{}".to_string(),
            ConsId::Int(value) => value.to_string().purple().to_string(),
            ConsId::String(value) => format!("{:?}", value.value()).green().to_string(),
            ConsId::Closure(id) => format!("closure({})", self.pred_name(*id)),
            ConsId::TypeCtorInfoConst(ctor) => format!("type_ctor_info({ctor})"),
            ConsId::BaseTypeclassInfoConst {
                class_id,
                instance_string,
                ..
            } => format!("base_typeclass_info({class_id}, {instance_string})"),
            ConsId::TypeInfoCell(_) => "type_info".to_string(),
            ConsId::TypeclassInfoCell => "typeclass_info".to_string(),
            ConsId::TablingInfoConst(id) => format!("tabling_info({})", self.pred_name(*id)),
            ConsId::TableIoEntryConst(id) => format!("table_io_entry({})", self.pred_name(*id)),
        }
    }

    fn functor(&self, cons_id: &ConsId, args: &[ProgVar]) -> String {
        let name = self.cons_id(cons_id);
        if args.is_empty() {
            name
        } else if matches!(cons_id, ConsId::Tuple(_)) {
            format!("{{{}}}", self.vars(args))
        } else {
            format!("{name}({})", self.vars(args))
        }
    }

    fn purity_prefix(purity: Purity) -> String {
        match purity {
            Purity::Pure => String::new(),
            impure => format!("{} ", impure.to_string().red()),
        }
    }

    fn atomic(&self, goal: &Goal, depth: usize) -> String {
        match &goal.expr {
            GoalExpr::PlainCall(call) => format!(
                "{}{}({})",
                Self::purity_prefix(goal.info.purity),
                call.name.name.to_string().blue(),
                self.vars(&call.args)
            ),
            GoalExpr::GenericCall(call) => {
                let args = self.vars(&call.args);
                match &call.kind {
                    GenericCallKind::HigherOrder { closure } => {
                        format!("{}({}, {args})", "call".blue(), self.var(*closure))
                    }
                    GenericCallKind::TupleInsert { relation } => format!(
                        "{}({}, {args})",
                        "tuple_insert".blue(),
                        self.pred_name(*relation)
                    ),
                }
            }
            GoalExpr::ForeignProc(foreign) => {
                let args = foreign
                    .args
                    .iter()
                    .chain(&foreign.extra_args)
                    .map(|arg| match arg.name {
                        Some(name) => format!("{}/{name}", self.var(arg.var)),
                        None => self.var(arg.var),
                    })
                    .join(", ");
                format!(
                    "{}{}({args}, {:?})",
                    Self::purity_prefix(goal.info.purity),
                    "foreign_proc".blue(),
                    foreign.code
                )
            }
            GoalExpr::Unify(unify) => {
                let lhs = self.var(unify.lhs);
                match (&unify.kind, &unify.rhs) {
                    (_, UnifyRhs::Lambda(lambda)) => {
                        let mut inner = GoalPrinter {
                            module_info: self.module_info,
                            proc_info: self.proc_info,
                            tvarset: self.tvarset,
                            out: String::new(),
                        };
                        inner.goal(&lambda.body, depth + 1);
                        format!(
                            "{lhs} = ({}({}) {} {} :-\n{}\n{})",
                            lambda.pred_or_func,
                            self.vars(&lambda.args),
                            "is".magenta(),
                            lambda.determinism,
                            inner.out,
                            "    ".repeat(depth)
                        )
                    }
                    (Unification::Construct { cons_id, args, .. }, _) => {
                        format!("{lhs} := {}", self.functor(cons_id, args))
                    }
                    (
                        Unification::Deconstruct {
                            cons_id,
                            args,
                            can_fail,
                            ..
                        },
                        _,
                    ) => {
                        let op = if *can_fail { "?=" } else { "=>" };
                        format!("{lhs} {op} {}", self.functor(cons_id, args))
                    }
                    (Unification::Assign { to, from }, _) => {
                        format!("{} := {}", self.var(*to), self.var(*from))
                    }
                    (Unification::SimpleTest { left, right }, _) => {
                        format!("{} == {}", self.var(*left), self.var(*right))
                    }
                    (Unification::Complicated { type_info_vars, .. }, rhs) => {
                        let rhs = match rhs {
                            UnifyRhs::Var(var) => self.var(*var),
                            UnifyRhs::Functor { cons_id, args, .. } => self.functor(cons_id, args),
                            UnifyRhs::Lambda(_) => unreachable!(),
                        };
                        if type_info_vars.is_empty() {
                            format!("{lhs} = {rhs}")
                        } else {
                            format!("{lhs} = {rhs} {{{}}}", self.vars(type_info_vars))
                        }
                    }
                }
            }
            _ => unreachable!("not an atomic goal"),
        }
    }

    fn goal(&mut self, goal: &Goal, depth: usize) {
        let pad = "    ".repeat(depth);

        let block = |printer: &mut Self, open: String, goals: &[&Goal], sep: &str| {
            printer.out += &format!("{pad}{open}\n");
            for (i, goal) in goals.iter().enumerate() {
                if i > 0 {
                    printer.out += &format!("\n{pad}{sep}\n");
                }
                printer.goal(goal, depth + 1);
            }
            printer.out += &format!("\n{pad})");
        };

        match &goal.expr {
            GoalExpr::Conj(ConjKind::Plain, goals) if goals.is_empty() => {
                self.out += &format!("{pad}{}", "true".magenta());
            }
            GoalExpr::Conj(ConjKind::Plain, goals) => {
                for (i, goal) in goals.iter().enumerate() {
                    if i > 0 {
                        self.out += ",\n";
                    }
                    self.goal(goal, depth);
                }
            }
            GoalExpr::Conj(ConjKind::Parallel, goals) => {
                block(self, "(".to_string(), &goals.iter().collect_vec(), "&");
            }
            GoalExpr::Disj(goals) if goals.is_empty() => {
                self.out += &format!("{pad}{}", "fail".magenta());
            }
            GoalExpr::Disj(goals) => {
                block(self, "(".to_string(), &goals.iter().collect_vec(), ";");
            }
            GoalExpr::Switch(switch) => {
                let can_fail = if switch.can_fail { ", can fail" } else { "" };
                self.out += &format!(
                    "{pad}( {}\n",
                    format!("% switch on `{}`{can_fail}", self.var(switch.var)).bright_black()
                );
                for (i, case) in switch.cases.iter().enumerate() {
                    if i > 0 {
                        self.out += &format!("\n{pad};\n");
                    }
                    self.out += &format!(
                        "{pad}    {}\n",
                        format!(
                            "% {} has functor {}",
                            self.var(switch.var),
                            strip(&self.cons_id(&case.cons_id))
                        )
                        .bright_black()
                    );
                    self.goal(&case.goal, depth + 1);
                }
                self.out += &format!("\n{pad})");
            }
            GoalExpr::Negation(inner) => {
                block(self, format!("{} (", "not".magenta()), &[&**inner], "");
            }
            GoalExpr::IfThenElse(ite) => {
                self.out += &format!("{pad}( {}\n", "if".magenta());
                self.goal(&ite.cond, depth + 1);
                self.out += &format!("\n{pad}{}\n", "then".magenta());
                self.goal(&ite.then, depth + 1);
                self.out += &format!("\n{pad}{}\n", "else".magenta());
                self.goal(&ite.else_, depth + 1);
                self.out += &format!("\n{pad})");
            }
            GoalExpr::Scope(reason, inner) => {
                let open = match reason {
                    ScopeReason::Exists(vars) => {
                        format!("{} [{}] (", "some".magenta(), self.vars(vars))
                    }
                    ScopeReason::Promise(purity) => {
                        format!("{} (", format!("promise_{purity}").magenta())
                    }
                };
                block(self, open, &[&**inner], "");
            }
            GoalExpr::PlainCall(_)
            | GoalExpr::GenericCall(_)
            | GoalExpr::ForeignProc(_)
            | GoalExpr::Unify(_) => {
                let text = self.atomic(goal, depth);
                self.out += &format!("{pad}{text}");
            }
        }
    }
}

fn strip(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::{
        frontend::{builder::ModuleBuilder, demos},
        middle::{
            hlds::{builtins::int_type, goal::ArgMode, goal_util::assign, table::EvalMethod},
            options::Options,
            polymorphism, table_gen,
        },
    };

    fn plain(text: String) -> String {
        strip_ansi_escapes::strip_str(text)
    }

    #[test]
    fn prints_loop_check_skeleton() {
        let mut mb = ModuleBuilder::new("loop", Options::default());
        let id = {
            let mut pb = mb.pred("count");
            let n = pb.arg("N", int_type(), ArgMode::In);
            let m = pb.arg("M", int_type(), ArgMode::Out);
            pb.eval_method(EvalMethod::LoopCheck(Default::default()));
            let context = pb.context(1);
            pb.build(assign(m, n, context))
        };
        let mut module_info = mb.finish();
        polymorphism::process_module(&mut module_info);
        table_gen::process_module(&mut module_info);

        let text = plain(proc_to_string(&module_info, id));

        assert_eq!(
            text,
            indoc! {"
                :- predicate loop.count(N_0 :: in, M_1 :: out) is det.
                :- pragma loop_check(all_strict).
                % call table steps: [int]
                % inputs: 1, outputs: 1
                count(N_0, M_1) :-
                    promise_pure (
                        T0_2 := tabling_info(count),
                        impure table_lookup_insert_int(T0_2, N_0, T1_3),
                        impure table_loop_setup(T1_3, Status_4),
                        ( % switch on `Status_4`
                            % Status_4 has functor loop_inactive
                            M_1 := N_0,
                            impure table_loop_mark_as_inactive(T1_3)
                        ;
                            % Status_4 has functor loop_active
                            Message_5 := \"detected infinite recursion in predicate `loop.count/2`\",
                            table_error(Message_5)
                        )
                    )."
            }
        );
    }

    #[test]
    fn prints_polymorphic_heads_with_witness_comments() {
        let (mut module_info, id) = demos::constraint_forwarding(Options::default());
        polymorphism::process_module(&mut module_info);

        let text = plain(proc_to_string(&module_info, id));

        assert!(text.contains("% typeclass_info for "), "{text}");
        assert!(text.lines().next().is_some_and(|line| line.starts_with(":- predicate ")));
    }
}
