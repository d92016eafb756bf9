//! UCAST002: struct reinterpretation casts whose layouts change differently
//! across 32- and 64-bit targets.

use cast_ir::{CompilationUnit, NodeKind};
use tracing::trace;

use crate::idiom::{match_record_cast, RecordCast};
use crate::shape::platform_dependent_field_count;
use crate::{Analyzer, AnalyzerMetadata, Pass, Requirement, Severity};

pub const STRUCT_CAST_MESSAGE: &str =
    "unsafe cast between structs with mismatching platform-dependent field counts";

pub static STRUCT_CAST_METADATA: AnalyzerMetadata = AnalyzerMetadata {
    id: "UCAST002",
    name: "struct-cast",
    doc: "reports unsafe struct casts where the source and target differ in their number \
          of architecture-sized fields",
    requires: &[Requirement::SyntaxTree, Requirement::TypeInfo],
    run_despite_errors: true,
    default_severity: Severity::Warning,
};

/// Reports `(*T)(unsafe.Pointer(&x))` between structs whose counts of
/// platform-sized fields differ.
pub struct StructCastAnalyzer;

/// Instance registered in [`super::BUILTIN_ANALYZERS`].
pub static STRUCT_CAST: StructCastAnalyzer = StructCastAnalyzer;

/// Platform-dependent field counts of (source, destination) when both sides
/// of the cast are structs.
pub fn platform_field_counts(unit: &CompilationUnit, cast: &RecordCast) -> Option<(usize, usize)> {
    let table = &unit.info.types;
    let source = table.struct_fields(unit.info.type_of(cast.source))?;
    let dest = table.struct_fields(unit.info.type_of(cast.dest))?;
    Some((
        platform_dependent_field_count(table, source),
        platform_dependent_field_count(table, dest),
    ))
}

impl Analyzer for StructCastAnalyzer {
    fn metadata(&self) -> &'static AnalyzerMetadata {
        &STRUCT_CAST_METADATA
    }

    fn run(&self, pass: &mut Pass<'_>) {
        let unit = pass.unit();
        unit.tree.preorder(|id, node| {
            if !matches!(node.kind, NodeKind::Call { .. }) {
                return;
            }
            let Some(cast) = match_record_cast(unit, id) else {
                return;
            };
            let Some((source, dest)) = platform_field_counts(unit, &cast) else {
                return;
            };
            trace!(call = id.0, source, dest, "struct cast");
            if source != dest {
                pass.report(id, STRUCT_CAST_MESSAGE);
            }
        });
    }
}
