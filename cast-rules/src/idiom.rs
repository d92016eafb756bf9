//! Syntactic recognizers for the two-step pointer reinterpretation idiom
//! `(*T)(unsafe.Pointer(arg))`.

use cast_ir::{BasicKind, CompilationUnit, NodeId, NodeKind, TypeId, UnaryOp};

use crate::shape::is_header_shaped;

/// A `(*dest)(unsafe.Pointer(&source))` cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCast {
    /// Operand of the opaque conversion, with one `&` removed
    pub source: NodeId,
    /// Type expression under the star
    pub dest: NodeId,
}

/// Argument of `unsafe.Pointer(x)`: a single-argument call whose callee
/// denotes the opaque pointer type itself.
fn opaque_operand(unit: &CompilationUnit, expr: NodeId) -> Option<NodeId> {
    let NodeKind::Call { callee, args } = unit.tree.kind(expr)? else {
        return None;
    };
    let [arg] = args.as_slice() else {
        return None;
    };
    let denoted = unit.info.denoted_type(*callee)?;
    (unit.info.types.basic_kind(denoted) == Some(BasicKind::UnsafePointer)).then_some(*arg)
}

/// Splits `(*T)(unsafe.Pointer(arg))` into `T` and `arg`.
fn split_pointer_cast(unit: &CompilationUnit, call: NodeId) -> Option<(NodeId, NodeId)> {
    let NodeKind::Call { callee, args } = unit.tree.kind(call)? else {
        return None;
    };
    let [inner] = args.as_slice() else {
        return None;
    };
    let NodeKind::Paren { inner: star } = unit.tree.kind(*callee)? else {
        return None;
    };
    let NodeKind::Star { operand: target } = unit.tree.kind(*star)? else {
        return None;
    };
    let operand = opaque_operand(unit, *inner)?;
    Some((*target, operand))
}

/// Looks through a single `*` applied to a call.
fn strip_deref(unit: &CompilationUnit, expr: NodeId) -> NodeId {
    match unit.tree.kind(expr) {
        Some(NodeKind::Star { operand })
            if matches!(unit.tree.kind(*operand), Some(NodeKind::Call { .. })) =>
        {
            *operand
        }
        _ => expr,
    }
}

/// Recognizes `(*H)(unsafe.Pointer(&x))`, `(*H)(unsafe.Pointer(x))` and the
/// same under one dereference, where `H` names a header-shaped type.
///
/// Returns the resolved type of the conversion's operand (`&x` or `x`).
pub fn match_header_derivation(unit: &CompilationUnit, expr: NodeId) -> Option<TypeId> {
    let call = strip_deref(unit, expr);
    let (target, operand) = split_pointer_cast(unit, call)?;
    let target_ty = unit.info.denoted_type(target)?;
    if !is_header_shaped(&unit.info.types, target_ty) {
        return None;
    }
    Some(unit.info.type_of(operand))
}

/// Recognizes `(*T)(unsafe.Pointer(&x))` for any `T`, optionally under one
/// dereference.
pub fn match_record_cast(unit: &CompilationUnit, expr: NodeId) -> Option<RecordCast> {
    let call = strip_deref(unit, expr);
    let (dest, operand) = split_pointer_cast(unit, call)?;
    let source = match unit.tree.kind(operand) {
        Some(NodeKind::Unary {
            op: UnaryOp::AddressOf,
            operand: inner,
        }) => *inner,
        _ => operand,
    };
    Some(RecordCast { source, dest })
}
