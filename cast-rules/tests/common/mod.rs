//! Fixture programs for the analyzer tests.
//!
//! Each fixture builds the unit a Go front end would hand over for a small
//! source file (shown above each builder) and lists the diagnostics the
//! analyzers are expected to produce, as `(node, message)` pairs in report
//! order.

#![allow(dead_code)]

use cast_ir::{
    BasicBlock, BasicKind, BindingId, CompilationUnit, Field, NodeId, TypeId, TypeTable,
    UnitBuilder,
};
use cast_rules::rules::header::{ASSIGNMENT_MESSAGE, LITERAL_MESSAGE};
use cast_rules::rules::structcast::STRUCT_CAST_MESSAGE;
use cast_rules::Diagnostic;

pub struct Case {
    pub unit: CompilationUnit,
    pub expected: Vec<(NodeId, &'static str)>,
}

/// `(node, message)` pairs of `diagnostics`, for comparison with [`Case::expected`].
pub fn reported(diagnostics: &[Diagnostic]) -> Vec<(NodeId, &str)> {
    diagnostics
        .iter()
        .map(|diag| (diag.node, diag.message.as_str()))
        .collect()
}

pub struct Fixture {
    pub b: UnitBuilder,
    pub bool_ty: TypeId,
    pub int: TypeId,
    pub int64: TypeId,
    pub uint8: TypeId,
    pub uintptr: TypeId,
    pub string: TypeId,
    pub bytes: TypeId,
    pub slice_header: TypeId,
    pub string_header: TypeId,
    line: u32,
}

impl Fixture {
    pub fn new(package: &str) -> Self {
        let mut b = UnitBuilder::new(format!("example.com/{package}"));
        b.file(format!("{package}.go"));
        let bool_ty = b.types().basic(BasicKind::Bool);
        let int = b.types().basic(BasicKind::Int);
        let int64 = b.types().basic(BasicKind::Int64);
        let uint8 = b.types().basic(BasicKind::Uint8);
        let uintptr = b.types().basic(BasicKind::Uintptr);
        let string = b.types().basic(BasicKind::String);
        let bytes = b.types().slice(uint8);
        let slice_raw = b.types().structure(vec![
            Field::new("Data", uintptr),
            Field::new("Len", int),
            Field::new("Cap", int),
        ]);
        let slice_header = b.types().named("reflect.SliceHeader", slice_raw);
        let string_raw = b
            .types()
            .structure(vec![Field::new("Data", uintptr), Field::new("Len", int)]);
        let string_header = b.types().named("reflect.StringHeader", string_raw);

        Self {
            b,
            bool_ty,
            int,
            int64,
            uint8,
            uintptr,
            string,
            bytes,
            slice_header,
            string_header,
            line: 1,
        }
    }

    /// Places the following nodes on a fresh source line.
    pub fn next_line(&mut self) -> u32 {
        self.line += 1;
        self.b.at(self.line, 2);
        self.line
    }

    pub fn pointer_to(&mut self, ty: TypeId) -> TypeId {
        self.b.types().pointer(ty)
    }

    pub fn declare(&mut self, name: &str, ty: TypeId) -> BindingId {
        self.b.declare(name, ty)
    }

    pub fn slice_header_type(&mut self) -> NodeId {
        let ty = self.slice_header;
        self.b.qualified_type("reflect", "SliceHeader", ty)
    }

    pub fn string_header_type(&mut self) -> NodeId {
        let ty = self.string_header;
        self.b.qualified_type("reflect", "StringHeader", ty)
    }

    pub fn addr_of(&mut self, binding: BindingId) -> NodeId {
        let var = self.b.var(binding);
        self.b.address_of(var)
    }

    /// `(*target)(unsafe.Pointer(arg))`
    pub fn opaque_cast(&mut self, target: NodeId, arg: NodeId) -> NodeId {
        let opaque = self.b.opaque(arg);
        self.b.pointer_cast(target, opaque)
    }

    /// `(*reflect.SliceHeader)(unsafe.Pointer(arg))`
    pub fn slice_header_cast(&mut self, arg: NodeId) -> NodeId {
        let target = self.slice_header_type();
        self.opaque_cast(target, arg)
    }

    /// `(*reflect.SliceHeader)(unsafe.Pointer(nil))`
    pub fn nil_slice_header_cast(&mut self) -> NodeId {
        let nil = self.b.nil();
        self.slice_header_cast(nil)
    }

    /// `name := value`
    pub fn define(&mut self, binding: BindingId, value: NodeId) -> NodeId {
        let lhs = self.b.var(binding);
        self.b.define(vec![lhs], vec![value])
    }

    /// `name = value`
    pub fn assign(&mut self, binding: BindingId, value: NodeId) -> NodeId {
        let lhs = self.b.var(binding);
        self.b.assign(vec![lhs], vec![value])
    }

    pub fn read_field(&mut self, binding: BindingId, field: &str) -> NodeId {
        let base = self.b.var(binding);
        self.b.selector(base, field)
    }

    /// `target.field = value`
    pub fn write_field(&mut self, target: BindingId, field: &str, value: NodeId) -> NodeId {
        let lhs = self.read_field(target, field);
        self.b.assign(vec![lhs], vec![value])
    }

    /// `target.field = source.source_field`
    pub fn copy_field(
        &mut self,
        target: BindingId,
        field: &str,
        source: BindingId,
        source_field: &str,
    ) -> NodeId {
        let value = self.read_field(source, source_field);
        self.write_field(target, field, value)
    }

    /// `runtime.KeepAlive(binding)`
    pub fn keep_alive(&mut self, binding: BindingId) -> NodeId {
        let pkg = self.b.ident("runtime");
        let callee = self.b.selector(pkg, "KeepAlive");
        let arg = self.b.var(binding);
        let call = self.b.call(callee, vec![arg], TypeTable::INVALID);
        self.b.expr_stmt(call)
    }

    /// `Field: value` pairs for a header literal built from `string_header`.
    pub fn header_fields(&mut self, str_h: BindingId, with_cap: bool) -> Vec<NodeId> {
        let mut fields = Vec::new();
        let data = self.read_field(str_h, "Data");
        fields.push(self.b.key_value("Data", data));
        if with_cap {
            let cap = self.read_field(str_h, "Len");
            fields.push(self.b.key_value("Cap", cap));
        }
        let len = self.read_field(str_h, "Len");
        fields.push(self.b.key_value("Len", len));
        fields
    }

    /// `strH := (*reflect.StringHeader)(unsafe.Pointer(&str))`
    pub fn string_header_of(&mut self, str_h: BindingId, str_b: BindingId) -> NodeId {
        let addr = self.addr_of(str_b);
        let target = self.string_header_type();
        let cast = self.opaque_cast(target, addr);
        self.define(str_h, cast)
    }

    /// Wraps `stmts` in a function with a single-block CFG.
    pub fn finish(self, func_name: &str, stmts: Vec<NodeId>) -> CompilationUnit {
        self.finish_with(func_name, stmts, |_, _| None)
    }

    /// Wraps `stmts` in a function; `blocks` gets the function node and the
    /// body and may return a custom CFG.
    pub fn finish_with<F>(mut self, func_name: &str, stmts: Vec<NodeId>, blocks: F) -> CompilationUnit
    where
        F: FnOnce(&mut UnitBuilder, NodeId) -> Option<Vec<BasicBlock>>,
    {
        self.next_line();
        let ret = self.b.ret(Vec::new());
        let mut all = stmts;
        all.push(ret);
        let body = self.b.block(all);
        self.b.at(1, 1);
        let func = self.b.func_decl(func_name, body);
        self.b.source_file(vec![func]);
        match blocks(&mut self.b, func) {
            Some(blocks) => self.b.cfg(func, blocks),
            None => self.b.straight_line_cfg(func),
        }
        self.b.finish()
    }
}

// ============================================================================
// Header literals
// ============================================================================

/// ```go
/// func UnsafeCastString(str string) []byte {
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&str))
///     sH := &reflect.SliceHeader{Data: strH.Data, Cap: strH.Len, Len: strH.Len}
///     return *(*[]byte)(unsafe.Pointer(sH))
/// }
/// ```
pub fn composite_literal() -> Case {
    let mut f = Fixture::new("composite_literal");
    let str_b = f.declare("str", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);

    f.next_line();
    let s1 = f.string_header_of(str_h, str_b);

    f.next_line();
    let ty = f.slice_header_type();
    let fields = f.header_fields(str_h, true);
    let lit = f.b.composite_lit(ty, fields);
    let addr = f.b.address_of(lit);
    let s2 = f.define(sh, addr);

    f.next_line();
    let bytes_ty = f.bytes;
    let target = f.b.type_ref("[]byte", bytes_ty);
    let sh_ref = f.b.var(sh);
    let cast = f.opaque_cast(target, sh_ref);
    let deref = f.b.deref(cast);
    let s3 = f.b.expr_stmt(deref);

    Case {
        unit: f.finish("UnsafeCastString", vec![s1, s2, s3]),
        expected: vec![(lit, LITERAL_MESSAGE)],
    }
}

/// ```go
/// type Foo struct { Bar *reflect.SliceHeader }
///
/// func UnsafeCastString(str string) []byte {
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&str))
///     foo := Foo{Bar: &reflect.SliceHeader{Data: strH.Data, Cap: strH.Len, Len: strH.Len}}
///     return *(*[]byte)(unsafe.Pointer(foo.Bar))
/// }
/// ```
pub fn composite_in_composite() -> Case {
    let mut f = Fixture::new("composite_in_composite");
    let str_b = f.declare("str", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);
    let sh_ptr = f.pointer_to(f.slice_header);
    let foo_raw = f.b.types().structure(vec![Field::new("Bar", sh_ptr)]);
    let foo_ty = f.b.types().named("Foo", foo_raw);
    let foo = f.declare("foo", foo_ty);

    f.next_line();
    let s1 = f.string_header_of(str_h, str_b);

    f.next_line();
    let outer_ty = f.b.type_ref("Foo", foo_ty);
    f.next_line();
    let inner_ty = f.slice_header_type();
    let fields = f.header_fields(str_h, true);
    let inner = f.b.composite_lit(inner_ty, fields);
    let inner_addr = f.b.address_of(inner);
    let bar = f.b.key_value("Bar", inner_addr);
    let outer = f.b.composite_lit(outer_ty, vec![bar]);
    let s2 = f.define(foo, outer);

    f.next_line();
    let bytes_ty = f.bytes;
    let target = f.b.type_ref("[]byte", bytes_ty);
    let bar_read = f.read_field(foo, "Bar");
    let cast = f.opaque_cast(target, bar_read);
    let deref = f.b.deref(cast);
    let s3 = f.b.ret(vec![deref]);

    Case {
        unit: f.finish("UnsafeCastString", vec![s1, s2, s3]),
        expected: vec![(inner, LITERAL_MESSAGE)],
    }
}

/// ```go
/// type Header reflect.SliceHeader
///
/// func LiteralDefinition(s string) {
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&s))
///     sH := &Header{Data: strH.Data, Len: strH.Len, Cap: strH.Len}
///     _ = sH
/// }
/// ```
pub fn type_alias() -> Case {
    let mut f = Fixture::new("type_alias");
    let str_b = f.declare("s", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);
    let raw = f.b.types().underlying(f.slice_header);
    let alias = f.b.types().named("Header", raw);
    let alias_ptr = f.pointer_to(alias);
    let sh = f.declare("sH", alias_ptr);

    f.next_line();
    let s1 = f.string_header_of(str_h, str_b);

    f.next_line();
    let ty = f.b.type_ref("Header", alias);
    let fields = f.header_fields(str_h, true);
    let lit = f.b.composite_lit(ty, fields);
    let addr = f.b.address_of(lit);
    let s2 = f.define(sh, addr);

    f.next_line();
    let blank = f.b.ident("_");
    let sh_ref = f.b.var(sh);
    let s3 = f.b.assign(vec![blank], vec![sh_ref]);

    Case {
        unit: f.finish("LiteralDefinition", vec![s1, s2, s3]),
        expected: vec![(lit, LITERAL_MESSAGE)],
    }
}

/// ```go
/// func Headers(str string) []reflect.StringHeader {
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&str))
///     return []reflect.StringHeader{{Data: strH.Data, Len: strH.Len}, {}}
/// }
/// ```
pub fn elided_literal_elements() -> Case {
    let mut f = Fixture::new("elided");
    let str_b = f.declare("str", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);
    let string_header = f.string_header;
    let headers = f.b.types().slice(string_header);

    f.next_line();
    let s1 = f.string_header_of(str_h, str_b);

    f.next_line();
    let outer_ty = f.b.type_ref("[]reflect.StringHeader", headers);
    let fields = f.header_fields(str_h, false);
    let first = f.b.elided_composite_lit(string_header, fields);
    let second = f.b.elided_composite_lit(string_header, Vec::new());
    let outer = f.b.composite_lit(outer_ty, vec![first, second]);
    let s2 = f.b.ret(vec![outer]);

    Case {
        unit: f.finish("Headers", vec![s1, s2]),
        expected: vec![(first, LITERAL_MESSAGE), (second, LITERAL_MESSAGE)],
    }
}

// ============================================================================
// Header assignments
// ============================================================================

/// ```go
/// func SaferCastString(str string) (b []byte) {
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&str))
///     sH := (*reflect.SliceHeader)(unsafe.Pointer(&b))
///     sH.Len = strH.Len
///     sH.Cap = strH.Len
///     sH.Data = strH.Data
///     runtime.KeepAlive(str)
///     return
/// }
/// ```
///
/// With `dereferenced`, both casts are wrapped in `*(...)` and the headers
/// are values rather than pointers.
pub fn safe_cast(dereferenced: bool) -> Case {
    let mut f = Fixture::new("safe_cast");
    let str_b = f.declare("str", f.string);
    let bytes = f.bytes;
    let b_b = f.declare("b", bytes);
    let (str_h_ty, sh_ty) = if dereferenced {
        (f.string_header, f.slice_header)
    } else {
        (f.pointer_to(f.string_header), f.pointer_to(f.slice_header))
    };
    let str_h = f.declare("strH", str_h_ty);
    let sh = f.declare("sH", sh_ty);

    f.next_line();
    let addr = f.addr_of(str_b);
    let target = f.string_header_type();
    let mut cast = f.opaque_cast(target, addr);
    if dereferenced {
        cast = f.b.deref(cast);
    }
    let s1 = f.define(str_h, cast);

    f.next_line();
    let addr = f.addr_of(b_b);
    let mut cast = f.slice_header_cast(addr);
    if dereferenced {
        cast = f.b.deref(cast);
    }
    let s2 = f.define(sh, cast);

    f.next_line();
    let w1 = f.copy_field(sh, "Len", str_h, "Len");
    f.next_line();
    let w2 = f.copy_field(sh, "Cap", str_h, "Len");
    f.next_line();
    let w3 = f.copy_field(sh, "Data", str_h, "Data");
    f.next_line();
    let keep = f.keep_alive(str_b);

    Case {
        unit: f.finish("SaferCastString", vec![s1, s2, w1, w2, w3, keep]),
        expected: Vec::new(),
    }
}

/// Same shape as [`safe_cast`], but the slice header comes from
/// `(*reflect.SliceHeader)(unsafe.Pointer(nil))`, or from
/// `(*reflect.SliceHeader)(nil)` when `through_opaque` is false.
pub fn nil_cast(through_opaque: bool) -> Case {
    let mut f = Fixture::new("nil_cast");
    let str_b = f.declare("str", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);

    f.next_line();
    let s1 = f.string_header_of(str_h, str_b);

    f.next_line();
    let cast = if through_opaque {
        f.nil_slice_header_cast()
    } else {
        let nil = f.b.nil();
        let target = f.slice_header_type();
        f.b.pointer_cast(target, nil)
    };
    let s2 = f.define(sh, cast);

    f.next_line();
    let w1 = f.copy_field(sh, "Len", str_h, "Len");
    f.next_line();
    let w2 = f.copy_field(sh, "Cap", str_h, "Len");
    f.next_line();
    let w3 = f.copy_field(sh, "Data", str_h, "Data");
    f.next_line();
    let keep = f.keep_alive(str_b);

    Case {
        unit: f.finish("SaferCastString", vec![s1, s2, w1, w2, w3, keep]),
        expected: vec![
            (w1, ASSIGNMENT_MESSAGE),
            (w2, ASSIGNMENT_MESSAGE),
            (w3, ASSIGNMENT_MESSAGE),
        ],
    }
}

/// ```go
/// type Protocol struct {
///     Foo int
///     Sh  *reflect.SliceHeader
/// }
///
/// func UnsafeStringIntoProtocol(str string) []byte {
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&str))
///     protocol := Protocol{}
///     protocol.Sh.Len = strH.Len
///     protocol.Sh.Cap = strH.Len
///     protocol.Sh.Data = strH.Data
///     return *(*[]byte)(unsafe.Pointer(protocol.Sh))
/// }
/// ```
pub fn header_in_struct() -> Case {
    let mut f = Fixture::new("header_in_struct");
    let str_b = f.declare("str", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);
    let sh_ptr = f.pointer_to(f.slice_header);
    let int = f.int;
    let raw = f
        .b
        .types()
        .structure(vec![Field::new("Foo", int), Field::new("Sh", sh_ptr)]);
    let protocol_ty = f.b.types().named("Protocol", raw);
    let protocol = f.declare("protocol", protocol_ty);

    f.next_line();
    let s1 = f.string_header_of(str_h, str_b);

    f.next_line();
    let ty = f.b.type_ref("Protocol", protocol_ty);
    let lit = f.b.composite_lit(ty, Vec::new());
    let s2 = f.define(protocol, lit);

    let mut writes = Vec::new();
    for (field, source_field) in [("Len", "Len"), ("Cap", "Len"), ("Data", "Data")] {
        f.next_line();
        let sh = f.read_field(protocol, "Sh");
        let lhs = f.b.selector(sh, field);
        let value = f.read_field(str_h, source_field);
        writes.push(f.b.assign(vec![lhs], vec![value]));
    }

    f.next_line();
    let bytes_ty = f.bytes;
    let target = f.b.type_ref("[]byte", bytes_ty);
    let sh = f.read_field(protocol, "Sh");
    let cast = f.opaque_cast(target, sh);
    let deref = f.b.deref(cast);
    let ret = f.b.ret(vec![deref]);

    let mut stmts = vec![s1, s2];
    stmts.extend(&writes);
    stmts.push(ret);
    Case {
        unit: f.finish("UnsafeStringIntoProtocol", stmts),
        expected: writes
            .into_iter()
            .map(|write| (write, ASSIGNMENT_MESSAGE))
            .collect(),
    }
}

/// ```go
/// type Point struct{ X, Y int }
///
/// func Move() {
///     p := Point{}
///     p.X = 1
///     q := &p
///     q.Y = 2
/// }
/// ```
pub fn unrelated_selector() -> Case {
    let mut f = Fixture::new("unrelated");
    let int = f.int;
    let raw = f
        .b
        .types()
        .structure(vec![Field::new("X", int), Field::new("Y", int)]);
    let point = f.b.types().named("Point", raw);
    let point_ptr = f.pointer_to(point);
    let p = f.declare("p", point);
    let q = f.declare("q", point_ptr);

    f.next_line();
    let ty = f.b.type_ref("Point", point);
    let lit = f.b.composite_lit(ty, Vec::new());
    let s1 = f.define(p, lit);
    f.next_line();
    let one = f.b.int_lit(1);
    let s2 = f.write_field(p, "X", one);
    f.next_line();
    let addr = f.addr_of(p);
    let s3 = f.define(q, addr);
    f.next_line();
    let two = f.b.int_lit(2);
    let s4 = f.write_field(q, "Y", two);

    Case {
        unit: f.finish("Move", vec![s1, s2, s3, s4]),
        expected: Vec::new(),
    }
}

/// ```go
/// func Declared(b []byte) {
///     var sH *reflect.SliceHeader = (*reflect.SliceHeader)(unsafe.Pointer(&b))
///     sH.Len = 0
///     var zero *reflect.SliceHeader
///     zero.Len = 0
/// }
/// ```
pub fn var_declarations() -> Case {
    let mut f = Fixture::new("var_decl");
    let bytes = f.bytes;
    let b_b = f.declare("b", bytes);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);
    let zero = f.declare("zero", sh_ty);

    f.next_line();
    let name = f.b.var(sh);
    let ty_expr = f.slice_header_type();
    let ptr_ty = f.b.pointer_type(ty_expr);
    let addr = f.addr_of(b_b);
    let cast = f.slice_header_cast(addr);
    let d1 = f.b.var_decl(vec![name], Some(ptr_ty), vec![cast]);
    f.next_line();
    let v1 = f.b.int_lit(0);
    let w1 = f.write_field(sh, "Len", v1);

    f.next_line();
    let name = f.b.var(zero);
    let ty_expr = f.slice_header_type();
    let ptr_ty = f.b.pointer_type(ty_expr);
    let d2 = f.b.var_decl(vec![name], Some(ptr_ty), Vec::new());
    f.next_line();
    let v2 = f.b.int_lit(0);
    let w2 = f.write_field(zero, "Len", v2);

    Case {
        unit: f.finish("Declared", vec![d1, w1, d2, w2]),
        expected: vec![(w2, ASSIGNMENT_MESSAGE)],
    }
}

/// ```go
/// func Redefined(b []byte) {
///     sH := (*reflect.SliceHeader)(unsafe.Pointer(&b))
///     sH.Len = 1
///     sH = (*reflect.SliceHeader)(unsafe.Pointer(nil))
///     sH.Len = 2
///     other := (*reflect.SliceHeader)(unsafe.Pointer(sH))
///     other.Len = 3
/// }
/// ```
pub fn redefinitions() -> Case {
    let mut f = Fixture::new("redefined");
    let bytes = f.bytes;
    let b_b = f.declare("b", bytes);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);
    let other = f.declare("other", sh_ty);

    f.next_line();
    let addr = f.addr_of(b_b);
    let cast = f.slice_header_cast(addr);
    let s1 = f.define(sh, cast);
    f.next_line();
    let one = f.b.int_lit(1);
    let w1 = f.write_field(sh, "Len", one);
    f.next_line();
    let nil_cast = f.nil_slice_header_cast();
    let s2 = f.assign(sh, nil_cast);
    f.next_line();
    let two = f.b.int_lit(2);
    let w2 = f.write_field(sh, "Len", two);
    f.next_line();
    let sh_ref = f.b.var(sh);
    let from_header = f.slice_header_cast(sh_ref);
    let s3 = f.define(other, from_header);
    f.next_line();
    let three = f.b.int_lit(3);
    let w3 = f.write_field(other, "Len", three);

    Case {
        unit: f.finish("Redefined", vec![s1, w1, s2, w2, s3, w3]),
        expected: vec![(w2, ASSIGNMENT_MESSAGE), (w3, ASSIGNMENT_MESSAGE)],
    }
}

/// ```go
/// func Branch(b []byte, ok bool) {
///     sH := (*reflect.SliceHeader)(unsafe.Pointer(nil))
///     if ok {
///         sH = (*reflect.SliceHeader)(unsafe.Pointer(&b))
///     }
///     sH.Len = 1
/// }
/// ```
///
/// CFG: `0 [def, ok] -> {1 [redef], 2 [write]}`, `1 -> 2`. The search follows
/// successors in order, so with `then_first` the path runs through the
/// re-definition and the write is accepted.
pub fn branch(then_first: bool) -> Case {
    let mut f = Fixture::new("branch");
    let bytes = f.bytes;
    let b_b = f.declare("b", bytes);
    let ok_ty = f.bool_ty;
    let ok = f.declare("ok", ok_ty);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);

    f.next_line();
    let nil_cast = f.nil_slice_header_cast();
    let def = f.define(sh, nil_cast);
    f.next_line();
    let cond = f.b.var(ok);
    f.next_line();
    let addr = f.addr_of(b_b);
    let cast = f.slice_header_cast(addr);
    let redef = f.assign(sh, cast);
    let then = f.b.block(vec![redef]);
    let if_stmt = f.b.if_stmt(cond, then, None);
    f.next_line();
    let one = f.b.int_lit(1);
    let write = f.write_field(sh, "Len", one);

    let succs = if then_first { vec![1, 2] } else { vec![2, 1] };
    let unit = f.finish_with("Branch", vec![def, if_stmt, write], |_, _| {
        Some(vec![
            BasicBlock::new(vec![def, cond], succs),
            BasicBlock::new(vec![redef], vec![2]),
            BasicBlock::new(vec![write], Vec::new()),
        ])
    });
    Case {
        unit,
        expected: if then_first {
            Vec::new()
        } else {
            vec![(write, ASSIGNMENT_MESSAGE)]
        },
    }
}

/// ```go
/// func Loop(b []byte, ok bool) {
///     sH := (*reflect.SliceHeader)(unsafe.Pointer(&b))
///     for ok {
///         sH.Len = 1
///     }
///     sH.Cap = 2
/// }
/// ```
///
/// CFG: `0 [def] -> 1 [ok] -> {2 [write in loop] -> 1, 3 [write after]}`.
pub fn loop_with_back_edge() -> Case {
    let mut f = Fixture::new("loop");
    let bytes = f.bytes;
    let b_b = f.declare("b", bytes);
    let ok_ty = f.bool_ty;
    let ok = f.declare("ok", ok_ty);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);

    f.next_line();
    let addr = f.addr_of(b_b);
    let cast = f.slice_header_cast(addr);
    let def = f.define(sh, cast);
    f.next_line();
    let cond = f.b.var(ok);
    f.next_line();
    let one = f.b.int_lit(1);
    let in_loop = f.write_field(sh, "Len", one);
    let loop_body = f.b.block(vec![in_loop]);
    let for_stmt = f.b.for_stmt(Some(cond), loop_body);
    f.next_line();
    let two = f.b.int_lit(2);
    let after = f.write_field(sh, "Cap", two);

    let unit = f.finish_with("Loop", vec![def, for_stmt, after], |_, _| {
        Some(vec![
            BasicBlock::new(vec![def], vec![1]),
            BasicBlock::new(vec![cond], vec![2, 3]),
            BasicBlock::new(vec![in_loop], vec![1]),
            BasicBlock::new(vec![after], Vec::new()),
        ])
    });
    Case {
        unit,
        expected: Vec::new(),
    }
}

/// The writes of [`loop_with_back_edge`] when the search budget is too small
/// to reach them.
pub fn loop_writes(case: &Case) -> Vec<NodeId> {
    let cfg = case.unit.cfgs.values().next().expect("loop fixture has a cfg");
    vec![cfg.blocks[2].nodes[0], cfg.blocks[3].nodes[0]]
}

/// ```go
/// func Outer(b []byte) {
///     fn := func() {
///         sH := (*reflect.SliceHeader)(unsafe.Pointer(&b))
///         sH.Len = 1
///     }
///     fn()
/// }
/// ```
///
/// Without `literal_cfg` only `Outer` has a graph, and it does not contain the
/// literal's statements.
pub fn function_literal(literal_cfg: bool) -> Case {
    let mut f = Fixture::new("closure");
    let bytes = f.bytes;
    let b_b = f.declare("b", bytes);
    let sh_ty = f.pointer_to(f.slice_header);
    let sh = f.declare("sH", sh_ty);
    let fn_b = f.declare("fn", TypeTable::INVALID);

    f.next_line();
    f.next_line();
    let addr = f.addr_of(b_b);
    let cast = f.slice_header_cast(addr);
    let def = f.define(sh, cast);
    f.next_line();
    let one = f.b.int_lit(1);
    let write = f.write_field(sh, "Len", one);
    let lit_body = f.b.block(vec![def, write]);
    let lit = f.b.func_lit(lit_body);
    let bind = f.define(fn_b, lit);
    f.next_line();
    let callee = f.b.var(fn_b);
    let call = f.b.call(callee, Vec::new(), TypeTable::INVALID);
    let call_stmt = f.b.expr_stmt(call);

    if literal_cfg {
        f.b.cfg(lit, vec![BasicBlock::new(vec![def, write], Vec::new())]);
    }
    Case {
        unit: f.finish("Outer", vec![bind, call_stmt]),
        expected: if literal_cfg {
            Vec::new()
        } else {
            vec![(write, ASSIGNMENT_MESSAGE)]
        },
    }
}

/// A unit whose header types failed to resolve: literals and writes carry
/// the invalid type and nothing is reported.
///
/// ```go
/// func Broken() {
///     sH := &reflect.SliceHeader{}  // reflect not imported
///     sH.Len = 1
/// }
/// ```
pub fn unresolved_types() -> Case {
    let mut f = Fixture::new("broken");
    let sh = f.declare("sH", TypeTable::INVALID);

    f.next_line();
    let ty = f.b.qualified_type("reflect", "SliceHeader", TypeTable::INVALID);
    let lit = f.b.composite_lit(ty, Vec::new());
    let addr = f.b.address_of(lit);
    let s1 = f.define(sh, addr);
    f.next_line();
    let one = f.b.int_lit(1);
    let w1 = f.write_field(sh, "Len", one);
    f.b.upstream_error("broken.go:2:8: undefined: reflect");

    Case {
        unit: f.finish("Broken", vec![s1, w1]),
        expected: Vec::new(),
    }
}

// ============================================================================
// Struct casts
// ============================================================================

/// ```go
/// type PinkStruct struct { A uint8; B <pink_b>; C int64 }
/// type VioletStruct struct { <violet fields> }
///
/// func UnsafeCast() {
///     pink := PinkStruct{A: 1, B: 42, C: 9000}
///     violet := *(*VioletStruct)(unsafe.Pointer(&pink))
///     _ = violet
/// }
/// ```
fn pink_to_violet(pink_b: BasicKind, violet: [(&str, BasicKind); 3]) -> (Fixture, Vec<NodeId>, NodeId) {
    let mut f = Fixture::new("structcast");
    let uint8 = f.uint8;
    let int64 = f.int64;
    let pink_b = f.b.types().basic(pink_b);
    let pink_raw = f.b.types().structure(vec![
        Field::new("A", uint8),
        Field::new("B", pink_b),
        Field::new("C", int64),
    ]);
    let pink_ty = f.b.types().named("PinkStruct", pink_raw);
    let mut violet_fields = Vec::new();
    for (name, kind) in violet {
        let ty = f.b.types().basic(kind);
        violet_fields.push(Field::new(name, ty));
    }
    let violet_raw = f.b.types().structure(violet_fields);
    let violet_ty = f.b.types().named("VioletStruct", violet_raw);
    let pink = f.declare("pink", pink_ty);
    let violet = f.declare("violet", violet_ty);

    f.next_line();
    let ty = f.b.type_ref("PinkStruct", pink_ty);
    let mut elements = Vec::new();
    for (name, value) in [("A", 1), ("B", 42), ("C", 9000)] {
        let lit = f.b.int_lit(value);
        elements.push(f.b.key_value(name, lit));
    }
    let lit = f.b.composite_lit(ty, elements);
    let s1 = f.define(pink, lit);

    f.next_line();
    let target = f.b.type_ref("VioletStruct", violet_ty);
    let addr = f.addr_of(pink);
    let cast = f.opaque_cast(target, addr);
    let deref = f.b.deref(cast);
    let s2 = f.define(violet, deref);

    f.next_line();
    let blank = f.b.ident("_");
    let violet_ref = f.b.var(violet);
    let s3 = f.b.assign(vec![blank], vec![violet_ref]);

    (f, vec![s1, s2, s3], cast)
}

/// Scenario with one platform-dependent field cast to a record with none.
pub fn architecture_sized_variable() -> Case {
    let (f, stmts, cast) = pink_to_violet(
        BasicKind::Int,
        [
            ("A", BasicKind::Uint8),
            ("B", BasicKind::Int64),
            ("C", BasicKind::Int64),
        ],
    );
    Case {
        unit: f.finish("UnsafeCast", stmts),
        expected: vec![(cast, STRUCT_CAST_MESSAGE)],
    }
}

pub fn strictly_sized_struct() -> Case {
    let (f, stmts, _) = pink_to_violet(
        BasicKind::Int64,
        [
            ("A", BasicKind::Uint8),
            ("B", BasicKind::Int64),
            ("C", BasicKind::Int64),
        ],
    );
    Case {
        unit: f.finish("UnsafeCast", stmts),
        expected: Vec::new(),
    }
}

/// One platform-dependent field on each side, in different positions and
/// under different names.
pub fn equal_platform_counts() -> Case {
    let (f, stmts, _) = pink_to_violet(
        BasicKind::Int,
        [
            ("X", BasicKind::Uintptr),
            ("Y", BasicKind::Uint8),
            ("Z", BasicKind::Int64),
        ],
    );
    Case {
        unit: f.finish("UnsafeCast", stmts),
        expected: Vec::new(),
    }
}

/// ```go
/// func NoCast() {
///     pink := PinkStruct{}
///     violet := VioletStruct{}
///     n := 7
///     arr := (*[8]byte)(unsafe.Pointer(&n))
/// }
/// ```
pub fn no_struct_cast() -> Case {
    let mut f = Fixture::new("no_cast");
    let uint8 = f.uint8;
    let int = f.int;
    let int64 = f.int64;
    let pink_raw = f.b.types().structure(vec![
        Field::new("A", uint8),
        Field::new("B", int),
        Field::new("C", int64),
    ]);
    let pink_ty = f.b.types().named("PinkStruct", pink_raw);
    let violet_raw = f.b.types().structure(vec![
        Field::new("A", uint8),
        Field::new("B", int64),
        Field::new("C", int64),
    ]);
    let violet_ty = f.b.types().named("VioletStruct", violet_raw);
    let arr_ty = f.b.types().array(8, uint8);
    let arr_ptr = f.pointer_to(arr_ty);
    let pink = f.declare("pink", pink_ty);
    let violet = f.declare("violet", violet_ty);
    let n = f.declare("n", int);
    let arr = f.declare("arr", arr_ptr);

    f.next_line();
    let ty = f.b.type_ref("PinkStruct", pink_ty);
    let lit = f.b.composite_lit(ty, Vec::new());
    let s1 = f.define(pink, lit);
    f.next_line();
    let ty = f.b.type_ref("VioletStruct", violet_ty);
    let lit = f.b.composite_lit(ty, Vec::new());
    let s2 = f.define(violet, lit);
    f.next_line();
    let seven = f.b.int_lit(7);
    let s3 = f.define(n, seven);
    f.next_line();
    let target = f.b.type_ref("[8]byte", arr_ty);
    let addr = f.addr_of(n);
    let cast = f.opaque_cast(target, addr);
    let s4 = f.define(arr, cast);

    Case {
        unit: f.finish("NoCast", vec![s1, s2, s3, s4]),
        expected: Vec::new(),
    }
}

/// ```go
/// func Mixed(str string) {
///     pink := PinkStruct{A: 1, B: 42, C: 9000}
///     violet := *(*VioletStruct)(unsafe.Pointer(&pink))
///     _ = violet
///     strH := (*reflect.StringHeader)(unsafe.Pointer(&str))
///     _ = reflect.SliceHeader{Data: strH.Data, Cap: strH.Len, Len: strH.Len}
/// }
/// ```
///
/// The struct cast comes first in the source, the header literal second.
pub fn struct_cast_then_literal() -> Case {
    let (mut f, mut stmts, cast) = pink_to_violet(
        BasicKind::Int,
        [
            ("A", BasicKind::Uint8),
            ("B", BasicKind::Int64),
            ("C", BasicKind::Int64),
        ],
    );
    let str_b = f.declare("str", f.string);
    let str_h_ty = f.pointer_to(f.string_header);
    let str_h = f.declare("strH", str_h_ty);

    f.next_line();
    stmts.push(f.string_header_of(str_h, str_b));

    f.next_line();
    let ty = f.slice_header_type();
    let fields = f.header_fields(str_h, true);
    let lit = f.b.composite_lit(ty, fields);
    let blank = f.b.ident("_");
    stmts.push(f.b.assign(vec![blank], vec![lit]));

    Case {
        unit: f.finish("Mixed", stmts),
        expected: vec![(cast, STRUCT_CAST_MESSAGE), (lit, LITERAL_MESSAGE)],
    }
}

/// Every fixture that should produce no diagnostics at all.
pub fn clean_cases() -> Vec<(&'static str, Case)> {
    vec![
        ("safe_cast", safe_cast(false)),
        ("safe_cast_dereferenced_header", safe_cast(true)),
        ("unrelated_selector", unrelated_selector()),
        ("loop_with_back_edge", loop_with_back_edge()),
        ("strictly_sized_struct", strictly_sized_struct()),
        ("equal_platform_counts", equal_platform_counts()),
        ("no_struct_cast", no_struct_cast()),
        ("unresolved_types", unresolved_types()),
    ]
}
