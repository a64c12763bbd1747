//! Call-table lookups and answer blocks.
//!
//! Every tabled procedure starts at the root of its call table and threads a
//! trie node through one `table_lookup_insert_*` call per input argument. The
//! primitive is chosen from the argument's type category; polymorphic
//! arguments are looked up through a type-info made by the polymorphism
//! machinery. Answers are saved into and restored from answer blocks slot by
//! slot in the same way.

use log::trace;

use super::info::TableInfo;
use crate::middle::{
    diag::internal_error,
    hlds::{
        builtins::{RuntimePrimitive, TableHandle},
        goal::{ConsId, Goal},
        goal_util::construct,
        id::ProgVar,
        module::{ModuleInfo, TypeBody, TypeCategory},
        table::{ArgTablingMethod, TableArgInfo, TableAttributes, TableTrieStep},
        types::{Type, TypeSubst},
    },
};

/// The goals walking the call table down to the node of one call
pub struct CallTableLookup {
    pub goals: Vec<Goal>,
    /// The node reached after the last input
    pub tip: ProgVar,
    pub steps: Vec<TableTrieStep>,
    pub inputs: Vec<TableArgInfo>,
}

impl TableInfo<'_> {
    pub fn call_table_lookup(&mut self, inputs: &[ProgVar], attributes: &TableAttributes) -> CallTableLookup {
        let mut goals = Vec::new();
        let mut tip = self.call_table_root(&mut goals);
        let mut steps = Vec::with_capacity(inputs.len());
        let mut arg_infos = Vec::with_capacity(inputs.len());

        for (slot, &var) in inputs.iter().enumerate() {
            let step = match attributes.strictness.method_for_input(slot) {
                ArgTablingMethod::PromiseImplied => TableTrieStep::PromiseImplied,
                method => {
                    let by_addr = method == ArgTablingMethod::Addr;
                    let (step, next) = self.lookup_insert(tip, var, by_addr, &format!("T{}", slot + 1), &mut goals);
                    tip = next;
                    step
                }
            };
            trace!("{}: input {slot} tabled as {step}", self.pred_desc());
            steps.push(step);
            arg_infos.push(TableArgInfo {
                var,
                slot,
                ty: self.var_type(var),
            });
        }

        CallTableLookup {
            goals,
            tip,
            steps,
            inputs: arg_infos,
        }
    }

    /// Looks the outputs of an answer up in the answer table rooted at
    /// `table`, returning the node the duplicate check is made on
    pub fn answer_table_lookup(&mut self, table: ProgVar, outputs: &[ProgVar], goals: &mut Vec<Goal>) -> ProgVar {
        outputs.iter().enumerate().fold(table, |node, (i, &var)| {
            let (_, next) = self.lookup_insert(node, var, false, &format!("AT{}", i + 1), goals);
            next
        })
    }

    /// One step down the trie from `table` on the value of `var`
    fn lookup_insert(
        &mut self,
        table: ProgVar,
        var: ProgVar,
        by_addr: bool,
        next_name: &str,
        goals: &mut Vec<Goal>,
    ) -> (TableTrieStep, ProgVar) {
        let ty = self.var_type(var);
        let category = self.module_info().classify_type(&ty);

        let (step, prim) = match category {
            // Every value is the same, so the node is the same
            TypeCategory::Dummy | TypeCategory::Void => return (TableTrieStep::Dummy, table),
            TypeCategory::Int => (TableTrieStep::Int, RuntimePrimitive::TableLookupInsertInt),
            TypeCategory::Char => (TableTrieStep::Char, RuntimePrimitive::TableLookupInsertChar),
            TypeCategory::String => (TableTrieStep::String, RuntimePrimitive::TableLookupInsertString),
            TypeCategory::Float => (TableTrieStep::Float, RuntimePrimitive::TableLookupInsertFloat),
            TypeCategory::TypeInfo => (TableTrieStep::TypeInfo, RuntimePrimitive::TableLookupInsertTypeinfo),
            TypeCategory::TypeclassInfo => (
                TableTrieStep::TypeclassInfo,
                RuntimePrimitive::TableLookupInsertTypeclassinfo,
            ),
            TypeCategory::Enum(size) => {
                let next = self.new_handle_var(next_name, TableHandle::MlTrieNode);
                let size_var = self.int_var("EnumSize", size, goals);
                goals.push(self.call(
                    RuntimePrimitive::TableLookupInsertEnum,
                    vec![table, size_var, var, next],
                ));
                return (TableTrieStep::Enum(size), next);
            }
            TypeCategory::HigherOrder
            | TypeCategory::TypeCtorInfo
            | TypeCategory::BaseTypeclassInfo
            | TypeCategory::Variable
            | TypeCategory::Tuple
            | TypeCategory::User => {
                // Closures and static runtime data have no structure to
                // compare, so they are only ever tabled by address
                let by_addr = by_addr
                    || matches!(
                        category,
                        TypeCategory::HigherOrder | TypeCategory::TypeCtorInfo | TypeCategory::BaseTypeclassInfo
                    );
                return self.lookup_insert_general(table, var, ty, by_addr, next_name, goals);
            }
        };

        let next = self.new_handle_var(next_name, TableHandle::MlTrieNode);
        goals.push(self.call(prim, vec![table, var, next]));
        (step, next)
    }

    fn lookup_insert_general(
        &mut self,
        table: ProgVar,
        var: ProgVar,
        ty: Type,
        by_addr: bool,
        next_name: &str,
        goals: &mut Vec<Goal>,
    ) -> (TableTrieStep, ProgVar) {
        let is_poly = !ty.is_ground();
        let prim = match (is_poly, by_addr) {
            (false, false) => RuntimePrimitive::TableLookupInsertUser,
            (false, true) => RuntimePrimitive::TableLookupInsertUserAddr,
            (true, false) => RuntimePrimitive::TableLookupInsertPoly,
            (true, true) => RuntimePrimitive::TableLookupInsertPolyAddr,
        };

        let context = self.context;
        let type_info = self.poly.make_type_info_var(&ty, context, goals);
        let next = self.new_handle_var(next_name, TableHandle::MlTrieNode);
        goals.push(self.call(prim, vec![type_info, table, var, next]));
        (TableTrieStep::General { ty, is_poly, by_addr }, next)
    }

    /// Saves each output into its slot of `block`
    pub fn save_answers(&mut self, block: ProgVar, outputs: &[ProgVar], goals: &mut Vec<Goal>) {
        for (slot, &var) in outputs.iter().enumerate() {
            self.save_answer(block, slot, var, goals);
        }
    }

    /// Binds each output from its slot of `block`
    pub fn restore_answers(&mut self, block: ProgVar, outputs: &[ProgVar], goals: &mut Vec<Goal>) {
        for (slot, &var) in outputs.iter().enumerate() {
            self.restore_answer(block, slot, var, goals);
        }
    }

    pub fn save_answer(&mut self, block: ProgVar, slot: usize, var: ProgVar, goals: &mut Vec<Goal>) {
        let ty = self.var_type(var);
        let prim = match self.module_info().classify_type(&ty) {
            // Restored by construction
            TypeCategory::Dummy => return,
            TypeCategory::Int => RuntimePrimitive::TableSaveIntAnswer,
            TypeCategory::Char => RuntimePrimitive::TableSaveCharAnswer,
            TypeCategory::String => RuntimePrimitive::TableSaveStringAnswer,
            TypeCategory::Float => RuntimePrimitive::TableSaveFloatAnswer,
            _ => {
                let context = self.context;
                let type_info = self.poly.make_type_info_var(&ty, context, goals);
                let slot_var = self.int_var("Slot", slot, goals);
                goals.push(self.call(
                    RuntimePrimitive::TableSaveAnyAnswer,
                    vec![type_info, block, slot_var, var],
                ));
                return;
            }
        };
        let slot_var = self.int_var("Slot", slot, goals);
        goals.push(self.call(prim, vec![block, slot_var, var]));
    }

    pub fn restore_answer(&mut self, block: ProgVar, slot: usize, var: ProgVar, goals: &mut Vec<Goal>) {
        let ty = self.var_type(var);
        let prim = match self.module_info().classify_type(&ty) {
            TypeCategory::Dummy => {
                goals.push(self.dummy_value(var, &ty));
                return;
            }
            TypeCategory::Int => RuntimePrimitive::TableRestoreIntAnswer,
            TypeCategory::Char => RuntimePrimitive::TableRestoreCharAnswer,
            TypeCategory::String => RuntimePrimitive::TableRestoreStringAnswer,
            TypeCategory::Float => RuntimePrimitive::TableRestoreFloatAnswer,
            _ => {
                let context = self.context;
                let type_info = self.poly.make_type_info_var(&ty, context, goals);
                let slot_var = self.int_var("Slot", slot, goals);
                goals.push(self.call(
                    RuntimePrimitive::TableRestoreAnyAnswer,
                    vec![type_info, block, slot_var, var],
                ));
                return;
            }
        };
        let slot_var = self.int_var("Slot", slot, goals);
        goals.push(self.call(prim, vec![block, slot_var, var]));
    }

    /// `Block` for an answer of `outputs.len()` slots, created by `prim`
    /// from `owner` and filled with the outputs
    pub fn create_and_save_answer(
        &mut self,
        prim: RuntimePrimitive,
        owner: ProgVar,
        outputs: &[ProgVar],
        goals: &mut Vec<Goal>,
    ) -> ProgVar {
        let size = self.int_var("BlockSize", outputs.len(), goals);
        let block = self.new_handle_var("AnswerBlock", TableHandle::MlAnswerBlock);
        goals.push(self.call(prim, vec![owner, size, block]));
        self.save_answers(block, outputs, goals);
        block
    }

    pub fn output_arg_infos(&self, outputs: &[ProgVar]) -> Vec<TableArgInfo> {
        outputs
            .iter()
            .enumerate()
            .map(|(slot, &var)| TableArgInfo {
                var,
                slot,
                ty: self.var_type(var),
            })
            .collect()
    }

    fn dummy_value(&self, var: ProgVar, ty: &Type) -> Goal {
        match dummy_constant(self.module_info(), ty) {
            Some(cons_id) => construct(var, cons_id, Vec::new(), self.context),
            None => internal_error!(self.pred_desc(), "no constant for dummy type of {var}"),
        }
    }
}

/// The only constant of a dummy type, looking through equivalences
fn dummy_constant(module_info: &ModuleInfo, ty: &Type) -> Option<ConsId> {
    let Type::Defined(ctor, args) = ty else {
        return None;
    };
    let defn = module_info.type_defn(ctor)?;
    match &defn.body {
        TypeBody::Du(ctors) => match ctors.as_slice() {
            [only] if only.args.is_empty() => Some(ConsId::Cons(only.name, 0)),
            _ => None,
        },
        TypeBody::Eqv(expansion) => {
            let subst = TypeSubst::from_pairs(defn.params.iter().copied().zip(args.iter().cloned()));
            dummy_constant(module_info, &expansion.apply_subst(&subst))
        }
        TypeBody::Abstract => None,
    }
}
