//! In-process construction of compilation units.
//!
//! Front ends written in Rust and the test suites use [`UnitBuilder`] instead
//! of emitting JSON. Every constructor records the type information a checker
//! would have produced for the node it creates.

use std::collections::BTreeMap;

use crate::cfg::{BasicBlock, ControlFlowGraph};
use crate::syntax::{Node, NodeId, NodeKind, Pos, SyntaxTree, UnaryOp};
use crate::types::{
    BasicKind, Binding, BindingId, ExprMode, TypeId, TypeInfo, TypeTable, TypedExpr,
};
use crate::CompilationUnit;

#[derive(Debug, Default)]
pub struct UnitBuilder {
    name: String,
    files: Vec<String>,
    tree: SyntaxTree,
    info: TypeInfo,
    cfgs: BTreeMap<NodeId, ControlFlowGraph>,
    upstream_errors: Vec<String>,
    pos: Pos,
}

impl UnitBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Starts a new file; following nodes are placed in it at 1:1.
    pub fn file(&mut self, name: impl Into<String>) -> u32 {
        let idx = self.files.len() as u32;
        self.files.push(name.into());
        self.pos = Pos {
            file: idx,
            line: 1,
            column: 1,
        };
        idx
    }

    /// Sets the position given to nodes created from now on.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.pos.line = line;
        self.pos.column = column;
        self
    }

    pub fn types(&mut self) -> &mut TypeTable {
        &mut self.info.types
    }

    pub fn type_of(&self, expr: NodeId) -> TypeId {
        self.info.type_of(expr)
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: TypeId) -> BindingId {
        let id = BindingId(self.info.bindings.len() as u32);
        self.info.bindings.push(Binding {
            name: name.into(),
            decl: self.pos,
            ty,
        });
        id
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.tree.nodes.len() as u32);
        self.tree.nodes.push(Node {
            pos: self.pos,
            kind,
        });
        id
    }

    fn record(&mut self, expr: NodeId, ty: TypeId, mode: ExprMode) {
        self.info.exprs.insert(expr, TypedExpr { ty, mode });
    }

    fn denoted(&self, type_expr: NodeId) -> TypeId {
        self.info
            .denoted_type(type_expr)
            .unwrap_or(TypeTable::INVALID)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Identifier the checker could not resolve.
    pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Ident { name: name.into() })
    }

    /// Identifier that uses or defines `binding`.
    pub fn var(&mut self, binding: BindingId) -> NodeId {
        let (name, ty) = match self.info.binding(binding) {
            Some(decl) => (decl.name.clone(), decl.ty),
            None => (format!("_{}", binding.0), TypeTable::INVALID),
        };
        let id = self.ident(name);
        self.info.resolutions.insert(id, binding);
        self.record(id, ty, ExprMode::Value);
        id
    }

    pub fn nil(&mut self) -> NodeId {
        let nil_ty = self.info.types.basic(BasicKind::UntypedNil);
        let id = self.ident("nil");
        self.record(id, nil_ty, ExprMode::Value);
        id
    }

    pub fn int_lit(&mut self, value: i64) -> NodeId {
        let int = self.info.types.basic(BasicKind::Int);
        let id = self.push(NodeKind::BasicLit {
            value: value.to_string(),
        });
        self.record(id, int, ExprMode::Value);
        id
    }

    /// Identifier naming the type `ty`.
    pub fn type_ref(&mut self, name: impl Into<String>, ty: TypeId) -> NodeId {
        let id = self.ident(name);
        self.record(id, ty, ExprMode::Type);
        id
    }

    /// `pkg.Name` in type position.
    pub fn qualified_type(
        &mut self,
        pkg: impl Into<String>,
        name: impl Into<String>,
        ty: TypeId,
    ) -> NodeId {
        let base = self.ident(pkg);
        let id = self.push(NodeKind::Selector {
            base,
            field: name.into(),
        });
        self.record(id, ty, ExprMode::Type);
        id
    }

    /// `*T` in type position.
    pub fn pointer_type(&mut self, elem: NodeId) -> NodeId {
        let elem_ty = self.denoted(elem);
        let ty = self.info.types.pointer(elem_ty);
        let id = self.push(NodeKind::Star { operand: elem });
        self.record(id, ty, ExprMode::Type);
        id
    }

    /// `base.field`, typed from the struct (or pointer to struct) behind `base`.
    pub fn selector(&mut self, base: NodeId, field: impl Into<String>) -> NodeId {
        let field = field.into();
        let table = &self.info.types;
        let base_ty = self.info.type_of(base);
        let record = table.pointee(base_ty).unwrap_or(base_ty);
        let ty = table
            .struct_fields(record)
            .and_then(|fields| fields.iter().find(|f| f.name == field))
            .map(|f| f.ty)
            .unwrap_or(TypeTable::INVALID);
        let id = self.push(NodeKind::Selector { base, field });
        self.record(id, ty, ExprMode::Value);
        id
    }

    /// `&operand`
    pub fn address_of(&mut self, operand: NodeId) -> NodeId {
        let elem = self.info.type_of(operand);
        let ty = self.info.types.pointer(elem);
        let id = self.push(NodeKind::Unary {
            op: UnaryOp::AddressOf,
            operand,
        });
        self.record(id, ty, ExprMode::Value);
        id
    }

    /// `*operand` in value position.
    pub fn deref(&mut self, operand: NodeId) -> NodeId {
        let ty = self
            .info
            .types
            .pointee(self.info.type_of(operand))
            .unwrap_or(TypeTable::INVALID);
        let id = self.push(NodeKind::Star { operand });
        self.record(id, ty, ExprMode::Value);
        id
    }

    pub fn paren(&mut self, inner: NodeId) -> NodeId {
        let typed = self.info.exprs.get(&inner).copied();
        let id = self.push(NodeKind::Paren { inner });
        if let Some(typed) = typed {
            self.info.exprs.insert(id, typed);
        }
        id
    }

    /// Ordinary call with result type `result`.
    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>, result: TypeId) -> NodeId {
        let id = self.push(NodeKind::Call { callee, args });
        self.record(id, result, ExprMode::Value);
        id
    }

    /// Conversion `T(arg)`, typed as the type `type_expr` denotes.
    pub fn convert(&mut self, type_expr: NodeId, arg: NodeId) -> NodeId {
        let ty = self.denoted(type_expr);
        self.call(type_expr, vec![arg], ty)
    }

    /// `unsafe.Pointer(arg)`
    pub fn opaque(&mut self, arg: NodeId) -> NodeId {
        let unsafe_ptr = self.info.types.basic(BasicKind::UnsafePointer);
        let callee = self.qualified_type("unsafe", "Pointer", unsafe_ptr);
        self.convert(callee, arg)
    }

    /// `(*T)(arg)` where `target` is the type expression `T`.
    pub fn pointer_cast(&mut self, target: NodeId, arg: NodeId) -> NodeId {
        let star = self.pointer_type(target);
        let callee = self.paren(star);
        self.convert(callee, arg)
    }

    /// `T{elements...}`
    pub fn composite_lit(&mut self, type_expr: NodeId, elements: Vec<NodeId>) -> NodeId {
        let ty = self.denoted(type_expr);
        let id = self.push(NodeKind::CompositeLit {
            type_expr: Some(type_expr),
            elements,
        });
        self.record(id, ty, ExprMode::Value);
        id
    }

    /// `{elements...}` nested in another literal, where the type is implied.
    pub fn elided_composite_lit(&mut self, ty: TypeId, elements: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::CompositeLit {
            type_expr: None,
            elements,
        });
        self.record(id, ty, ExprMode::Value);
        id
    }

    /// `key: value` inside a composite literal; the key is a bare field name.
    pub fn key_value(&mut self, key: impl Into<String>, value: NodeId) -> NodeId {
        let key = self.ident(key);
        self.push(NodeKind::KeyValue { key, value })
    }

    pub fn binary(
        &mut self,
        op: impl Into<String>,
        lhs: NodeId,
        rhs: NodeId,
        ty: TypeId,
    ) -> NodeId {
        let id = self.push(NodeKind::Binary {
            op: op.into(),
            lhs,
            rhs,
        });
        self.record(id, ty, ExprMode::Value);
        id
    }

    // ------------------------------------------------------------------
    // Statements and declarations
    // ------------------------------------------------------------------

    /// `lhs = rhs`
    pub fn assign(&mut self, lhs: Vec<NodeId>, rhs: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Assign {
            lhs,
            rhs,
            define: false,
        })
    }

    /// `lhs := rhs`
    pub fn define(&mut self, lhs: Vec<NodeId>, rhs: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Assign {
            lhs,
            rhs,
            define: true,
        })
    }

    /// `var names [T] [= values]`
    pub fn var_decl(
        &mut self,
        names: Vec<NodeId>,
        type_expr: Option<NodeId>,
        values: Vec<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::VarDecl {
            names,
            type_expr,
            values,
        })
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::ExprStmt { expr })
    }

    pub fn ret(&mut self, results: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Return { results })
    }

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block { stmts })
    }

    pub fn if_stmt(&mut self, cond: NodeId, then: NodeId, els: Option<NodeId>) -> NodeId {
        self.push(NodeKind::If { cond, then, els })
    }

    pub fn for_stmt(&mut self, cond: Option<NodeId>, body: NodeId) -> NodeId {
        self.push(NodeKind::For { cond, body })
    }

    pub fn func_decl(&mut self, name: impl Into<String>, body: NodeId) -> NodeId {
        self.push(NodeKind::FuncDecl {
            name: name.into(),
            body: Some(body),
        })
    }

    pub fn func_lit(&mut self, body: NodeId) -> NodeId {
        self.push(NodeKind::FuncLit { body })
    }

    /// Adds a file root holding `decls`.
    pub fn source_file(&mut self, decls: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::SourceFile { decls });
        self.tree.roots.push(id);
        id
    }

    // ------------------------------------------------------------------
    // Control flow and finishing
    // ------------------------------------------------------------------

    pub fn cfg(&mut self, function: NodeId, blocks: Vec<BasicBlock>) {
        self.cfgs.insert(function, ControlFlowGraph::new(blocks));
    }

    /// One-block graph over the top-level statements of `function`'s body.
    pub fn straight_line_cfg(&mut self, function: NodeId) {
        let body = match self.tree.kind(function) {
            Some(NodeKind::FuncDecl { body: Some(body), .. }) => Some(*body),
            Some(NodeKind::FuncLit { body }) => Some(*body),
            _ => None,
        };
        let stmts = match body.and_then(|body| self.tree.kind(body)) {
            Some(NodeKind::Block { stmts }) => stmts.clone(),
            _ => Vec::new(),
        };
        self.cfgs
            .insert(function, ControlFlowGraph::straight_line(stmts));
    }

    pub fn upstream_error(&mut self, message: impl Into<String>) {
        self.upstream_errors.push(message.into());
    }

    pub fn finish(self) -> CompilationUnit {
        CompilationUnit {
            name: self.name,
            files: self.files,
            tree: self.tree,
            info: self.info,
            cfgs: self.cfgs,
            upstream_errors: self.upstream_errors,
        }
    }
}
