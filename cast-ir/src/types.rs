//! Resolved type information: the type table, per-expression types and
//! identifier bindings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::syntax::{NodeId, Pos};

/// Handle into a [`TypeTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into [`TypeInfo::bindings`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scalar kinds. `Int`, `Uint` and `Uintptr` have the target's native width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    String,
    /// The opaque pointer type every pointer converts to and from.
    UnsafePointer,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedNil => "untyped nil",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    #[serde(default)]
    pub embedded: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Type {
    /// Stand-in for anything the type checker could not resolve.
    Invalid,
    Basic {
        kind: BasicKind,
    },
    Pointer {
        elem: TypeId,
    },
    Slice {
        elem: TypeId,
    },
    Array {
        len: u64,
        elem: TypeId,
    },
    Struct {
        fields: Vec<Field>,
    },
    /// A declared type; distinct entries stay distinct even over the same
    /// underlying record.
    Named {
        name: String,
        underlying: TypeId,
    },
}

static INVALID_TYPE: Type = Type::Invalid;

/// Named chains longer than this are treated as unresolved.
const MAX_NAMED_CHAIN: usize = 32;
/// Nesting limit when rendering type strings.
const MAX_DISPLAY_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    types: Vec<Type>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Slot 0 always holds [`Type::Invalid`].
    pub const INVALID: TypeId = TypeId(0);

    pub fn new() -> Self {
        Self {
            types: vec![Type::Invalid],
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.types.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .map(|(idx, ty)| (TypeId(idx as u32), ty))
    }

    pub fn add(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Returns the existing entry for `kind`, adding one if needed.
    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        let existing = self
            .types
            .iter()
            .position(|ty| matches!(ty, Type::Basic { kind: k } if *k == kind));
        match existing {
            Some(idx) => TypeId(idx as u32),
            None => self.add(Type::Basic { kind }),
        }
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.add(Type::Pointer { elem })
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.add(Type::Slice { elem })
    }

    pub fn array(&mut self, len: u64, elem: TypeId) -> TypeId {
        self.add(Type::Array { len, elem })
    }

    pub fn structure(&mut self, fields: Vec<Field>) -> TypeId {
        self.add(Type::Struct { fields })
    }

    pub fn named(&mut self, name: impl Into<String>, underlying: TypeId) -> TypeId {
        self.add(Type::Named {
            name: name.into(),
            underlying,
        })
    }

    /// Unknown ids read as [`Type::Invalid`].
    pub fn get(&self, id: TypeId) -> &Type {
        self.types.get(id.index()).unwrap_or(&INVALID_TYPE)
    }

    pub fn is_valid(&self, id: TypeId) -> bool {
        !matches!(self.get(self.underlying(id)), Type::Invalid)
    }

    /// Exact basic kind of `id`; a named type over a basic type is not basic.
    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.get(id) {
            Type::Basic { kind } => Some(*kind),
            _ => None,
        }
    }

    /// Follows named types to the first unnamed one.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..MAX_NAMED_CHAIN {
            match self.get(current) {
                Type::Named { underlying, .. } => current = *underlying,
                _ => return current,
            }
        }
        Self::INVALID
    }

    /// Element type when the underlying type of `id` is a pointer.
    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.get(self.underlying(id)) {
            Type::Pointer { elem } => Some(*elem),
            _ => None,
        }
    }

    pub fn struct_fields(&self, id: TypeId) -> Option<&[Field]> {
        match self.get(self.underlying(id)) {
            Type::Struct { fields } => Some(fields),
            _ => None,
        }
    }

    /// Type string in the notation the front end uses (`*[]uint8`, `struct{Data uintptr; Len int}`).
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(id, &mut out, 0);
        out
    }

    fn write_type(&self, id: TypeId, out: &mut String, depth: usize) {
        if depth > MAX_DISPLAY_DEPTH {
            out.push_str("...");
            return;
        }
        match self.get(id) {
            Type::Invalid => out.push_str("invalid type"),
            Type::Basic { kind } => out.push_str(kind.name()),
            Type::Named { name, .. } => out.push_str(name),
            Type::Pointer { elem } => {
                out.push('*');
                self.write_type(*elem, out, depth + 1);
            }
            Type::Slice { elem } => {
                out.push_str("[]");
                self.write_type(*elem, out, depth + 1);
            }
            Type::Array { len, elem } => {
                out.push_str(&format!("[{len}]"));
                self.write_type(*elem, out, depth + 1);
            }
            Type::Struct { fields } => {
                out.push_str("struct{");
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        out.push_str("; ");
                    }
                    if !field.embedded {
                        out.push_str(&field.name);
                        out.push(' ');
                    }
                    self.write_type(field.ty, out, depth + 1);
                }
                out.push('}');
            }
        }
    }
}

/// Whether an expression denotes a value or a type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprMode {
    #[default]
    Value,
    Type,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedExpr {
    pub ty: TypeId,
    #[serde(default)]
    pub mode: ExprMode,
}

/// A declared name. Bindings are compared by [`BindingId`], never by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub decl: Pos,
    pub ty: TypeId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub types: TypeTable,
    /// Types of expressions, type expressions included.
    #[serde(default)]
    pub exprs: HashMap<NodeId, TypedExpr>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Identifier node to the binding it defines or uses.
    #[serde(default)]
    pub resolutions: HashMap<NodeId, BindingId>,
}

impl TypeInfo {
    /// Resolved type of `expr`; [`TypeTable::INVALID`] when the checker recorded none.
    pub fn type_of(&self, expr: NodeId) -> TypeId {
        self.exprs
            .get(&expr)
            .map(|typed| typed.ty)
            .unwrap_or(TypeTable::INVALID)
    }

    /// The type `expr` names, if it is a type expression.
    pub fn denoted_type(&self, expr: NodeId) -> Option<TypeId> {
        self.exprs
            .get(&expr)
            .filter(|typed| typed.mode == ExprMode::Type)
            .map(|typed| typed.ty)
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.index())
    }

    pub fn binding_of(&self, ident: NodeId) -> Option<(BindingId, &Binding)> {
        let id = *self.resolutions.get(&ident)?;
        self.binding(id).map(|binding| (id, binding))
    }
}
