//! Structural predicates over resolved types.
//!
//! Header shapes are matched field by field against precomputed
//! [`ShapeSpec`]s, so any declared name or alias of the layout counts.

use cast_ir::{BasicKind, Field, Type, TypeId, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: BasicKind,
}

/// Ordered field list a record must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeSpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

pub static SLICE_HEADER_SHAPE: ShapeSpec = ShapeSpec {
    name: "slice header",
    fields: &[
        FieldSpec {
            name: "Data",
            kind: BasicKind::Uintptr,
        },
        FieldSpec {
            name: "Len",
            kind: BasicKind::Int,
        },
        FieldSpec {
            name: "Cap",
            kind: BasicKind::Int,
        },
    ],
};

pub static STRING_HEADER_SHAPE: ShapeSpec = ShapeSpec {
    name: "string header",
    fields: &[
        FieldSpec {
            name: "Data",
            kind: BasicKind::Uintptr,
        },
        FieldSpec {
            name: "Len",
            kind: BasicKind::Int,
        },
    ],
};

pub static HEADER_SHAPES: [&ShapeSpec; 2] = [&SLICE_HEADER_SHAPE, &STRING_HEADER_SHAPE];

/// True if the underlying type of `ty` is a record laid out exactly as `spec`.
///
/// Field types must be the basic kinds themselves; a named type over `int`
/// does not match `int`.
pub fn matches_shape(table: &TypeTable, ty: TypeId, spec: &ShapeSpec) -> bool {
    let Some(fields) = table.struct_fields(ty) else {
        return false;
    };
    fields.len() == spec.fields.len()
        && fields.iter().zip(spec.fields).all(|(field, expected)| {
            !field.embedded
                && field.name == expected.name
                && table.basic_kind(field.ty) == Some(expected.kind)
        })
}

/// The header shape `ty` has, looking through one level of pointer.
pub fn header_shape(table: &TypeTable, ty: TypeId) -> Option<&'static ShapeSpec> {
    if !table.is_valid(ty) {
        return None;
    }
    let effective = table.pointee(ty).unwrap_or(ty);
    HEADER_SHAPES
        .iter()
        .copied()
        .find(|spec| matches_shape(table, effective, spec))
}

/// True for the slice or string header layout, or a pointer to one.
pub fn is_header_shaped(table: &TypeTable, ty: TypeId) -> bool {
    header_shape(table, ty).is_some()
}

/// A pointer to text or to a slice, which is the only thing a header may be
/// derived from. Headers themselves never qualify.
pub fn is_genuine_reference(table: &TypeTable, ty: TypeId) -> bool {
    if is_header_shaped(table, ty) {
        return false;
    }
    let Some(elem) = table.pointee(ty) else {
        return false;
    };
    matches!(
        table.get(table.underlying(elem)),
        Type::Basic {
            kind: BasicKind::String
        } | Type::Slice { .. }
    )
}

/// `int`, `uint` and `uintptr` change width with the target; fixed-width
/// kinds and named types do not count.
pub fn is_platform_dependent_field(table: &TypeTable, field: &Field) -> bool {
    matches!(
        table.basic_kind(field.ty),
        Some(BasicKind::Int | BasicKind::Uint | BasicKind::Uintptr)
    )
}

/// Number of fields in `fields` whose size follows the target word size.
pub fn platform_dependent_field_count(table: &TypeTable, fields: &[Field]) -> usize {
    fields
        .iter()
        .filter(|field| is_platform_dependent_field(table, field))
        .count()
}
