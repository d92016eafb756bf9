//! Built-in analyzers.
//!
//! - `header`: hand-built or unsafely derived slice/string headers (UCAST001)
//! - `structcast`: struct reinterpretation with mismatched native-width fields (UCAST002)

use cast_ir::{CompilationUnit, NodeId};

use crate::Analyzer;

pub mod header;
pub mod structcast;

pub use header::HeaderMisuseAnalyzer;
pub use structcast::StructCastAnalyzer;

/// Every built-in analyzer, in the order the engine runs them.
pub static BUILTIN_ANALYZERS: &[&dyn Analyzer] =
    &[&header::HEADER_MISUSE, &structcast::STRUCT_CAST];

/// Innermost function among `ancestors` that has a control-flow graph.
pub(crate) fn enclosing_function_with_cfg(
    unit: &CompilationUnit,
    ancestors: &[NodeId],
) -> Option<NodeId> {
    ancestors.iter().rev().copied().find(|&id| {
        unit.tree.kind(id).is_some_and(|kind| kind.is_function()) && unit.cfg_for(id).is_some()
    })
}
