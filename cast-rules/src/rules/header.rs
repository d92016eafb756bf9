//! UCAST001: slice and string header misuse.
//!
//! Two checks share one pre-order walk:
//! - header-shaped composite literals, which describe memory nothing owns;
//! - field writes through a header-shaped variable whose nearest definition
//!   on the control-flow path is not `(*H)(unsafe.Pointer(&x))` over a real
//!   slice or string.

use cast_ir::{BindingId, CompilationUnit, NodeId, NodeKind, PathSearch};
use tracing::{debug, trace};

use super::enclosing_function_with_cfg;
use crate::idiom::match_header_derivation;
use crate::shape::{is_genuine_reference, is_header_shaped};
use crate::{Analyzer, AnalyzerMetadata, Pass, Requirement, Severity};

pub const LITERAL_MESSAGE: &str = "header literal construction found";
pub const ASSIGNMENT_MESSAGE: &str = "assignment to unsafely derived header object";

pub static HEADER_MISUSE_METADATA: AnalyzerMetadata = AnalyzerMetadata {
    id: "UCAST001",
    name: "header-misuse",
    doc: "reports slice and string headers that are built by hand or written to \
          without being derived from a real slice or string",
    requires: &[
        Requirement::SyntaxTree,
        Requirement::TypeInfo,
        Requirement::ControlFlow,
    ],
    run_despite_errors: true,
    default_severity: Severity::Warning,
};

/// Reports header literals and writes through headers not derived from a
/// real slice or string.
pub struct HeaderMisuseAnalyzer;

/// Instance registered in [`super::BUILTIN_ANALYZERS`].
pub static HEADER_MISUSE: HeaderMisuseAnalyzer = HeaderMisuseAnalyzer;

// ============================================================================
// Assignment classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not a write through a header-shaped variable.
    NotCandidate,
    Safe,
    Unsafe(UnsafeReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafeReason {
    /// Selector base is a header-shaped expression other than a variable
    OpaqueBase,
    UnresolvedBinding,
    /// No function CFG leads to the statement
    NoPath,
    BudgetExhausted,
    NoDefinition,
    /// Defined by a multi-value assignment or a declaration without a value
    OpaqueDefinition,
    /// Defined by something other than the derivation idiom
    NotDerived,
    /// Derived from a nil pointer, a header or anything that is not a real slice or string
    NotGenuine,
}

enum Definition {
    Value(NodeId),
    Opaque,
}

/// Classifies the assignment `stmt`.
///
/// `ancestors` is the chain of nodes enclosing `stmt`, outermost first.
/// Targets are checked left to right; the first unsafe target decides the
/// statement.
pub fn classify_assignment(
    unit: &CompilationUnit,
    stmt: NodeId,
    ancestors: &[NodeId],
    budget: usize,
) -> Verdict {
    let Some(NodeKind::Assign { lhs, .. }) = unit.tree.kind(stmt) else {
        return Verdict::NotCandidate;
    };
    let table = &unit.info.types;
    let mut verdict = Verdict::NotCandidate;

    for &target in lhs {
        let Some(NodeKind::Selector { base, .. }) = unit.tree.kind(target) else {
            return Verdict::NotCandidate;
        };
        if !matches!(unit.tree.kind(*base), Some(NodeKind::Ident { .. })) {
            if is_header_shaped(table, unit.info.type_of(*base)) {
                return Verdict::Unsafe(UnsafeReason::OpaqueBase);
            }
            continue;
        }
        let Some((binding_id, binding)) = unit.info.binding_of(*base) else {
            return Verdict::Unsafe(UnsafeReason::UnresolvedBinding);
        };
        if !is_header_shaped(table, binding.ty) {
            continue;
        }

        match classify_derivation(unit, stmt, ancestors, binding_id, budget) {
            Verdict::Safe => verdict = Verdict::Safe,
            unsafe_verdict => return unsafe_verdict,
        }
    }
    verdict
}

fn classify_derivation(
    unit: &CompilationUnit,
    stmt: NodeId,
    ancestors: &[NodeId],
    binding: BindingId,
    budget: usize,
) -> Verdict {
    let Some(function) = enclosing_function_with_cfg(unit, ancestors) else {
        return Verdict::Unsafe(UnsafeReason::NoPath);
    };
    let Some(cfg) = unit.cfg_for(function) else {
        return Verdict::Unsafe(UnsafeReason::NoPath);
    };

    let path = match cfg.path_to(stmt, budget) {
        PathSearch::Found(path) => path,
        PathSearch::NotFound => return Verdict::Unsafe(UnsafeReason::NoPath),
        PathSearch::BudgetExhausted => {
            debug!(stmt = stmt.0, function = function.0, budget, "path search budget exhausted");
            return Verdict::Unsafe(UnsafeReason::BudgetExhausted);
        }
    };
    let Some((_, before)) = path.split_last() else {
        return Verdict::Unsafe(UnsafeReason::NoPath);
    };

    let expr = match find_definition(unit, before, binding) {
        None => return Verdict::Unsafe(UnsafeReason::NoDefinition),
        Some(Definition::Opaque) => return Verdict::Unsafe(UnsafeReason::OpaqueDefinition),
        Some(Definition::Value(expr)) => expr,
    };
    match match_header_derivation(unit, expr) {
        None => Verdict::Unsafe(UnsafeReason::NotDerived),
        Some(operand) if is_genuine_reference(&unit.info.types, operand) => Verdict::Safe,
        Some(_) => Verdict::Unsafe(UnsafeReason::NotGenuine),
    }
}

/// Most recent statement on `path` that assigns or declares `binding`.
fn find_definition(
    unit: &CompilationUnit,
    path: &[NodeId],
    binding: BindingId,
) -> Option<Definition> {
    let defines = |name: NodeId| {
        matches!(unit.tree.kind(name), Some(NodeKind::Ident { .. }))
            && unit.info.resolutions.get(&name) == Some(&binding)
    };

    path.iter().rev().find_map(|&node| {
        let (names, values) = match unit.tree.kind(node)? {
            NodeKind::Assign { lhs, rhs, .. } => (lhs, rhs),
            NodeKind::VarDecl { names, values, .. } => (names, values),
            _ => return None,
        };
        let idx = names.iter().position(|&name| defines(name))?;
        if names.len() == values.len() {
            Some(Definition::Value(values[idx]))
        } else {
            Some(Definition::Opaque)
        }
    })
}

// ============================================================================
// Analyzer
// ============================================================================

impl Analyzer for HeaderMisuseAnalyzer {
    fn metadata(&self) -> &'static AnalyzerMetadata {
        &HEADER_MISUSE_METADATA
    }

    fn run(&self, pass: &mut Pass<'_>) {
        let unit = pass.unit();
        let budget = pass.config().path_search_budget;
        let table = &unit.info.types;

        unit.tree.walk_with_ancestors(|id, node, ancestors| match &node.kind {
            NodeKind::CompositeLit { .. } => {
                if is_header_shaped(table, unit.info.type_of(id)) {
                    pass.report(id, LITERAL_MESSAGE);
                }
            }
            NodeKind::Assign { .. } => {
                let verdict = classify_assignment(unit, id, ancestors, budget);
                trace!(stmt = id.0, ?verdict, "header assignment");
                if matches!(verdict, Verdict::Unsafe(_)) {
                    pass.report(id, ASSIGNMENT_MESSAGE);
                }
            }
            _ => {}
        });
    }
}
