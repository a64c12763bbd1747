//! The high-level data structure: the typed, mode- and determinism-annotated
//! representation of a module that the transformation passes consume and
//! produce.

pub mod builtins;
pub mod class;
pub mod goal;
pub mod goal_util;
pub mod id;
pub mod module;
pub mod pretty_print;
pub mod quantification;
pub mod table;
pub mod types;
