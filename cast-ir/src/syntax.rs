//! Syntax tree arena handed over by the front end.
//!
//! Nodes are immutable once the unit is built and are addressed by [`NodeId`].
//! Analyzers compare nodes by id only; two nodes with identical text are still
//! different nodes.

use serde::{Deserialize, Serialize};

/// Index of a node in [`SyntaxTree::nodes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source position: file index into [`crate::CompilationUnit::files`], 1-based line and column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `&x`
    AddressOf,
    Neg,
    Not,
    Complement,
    /// `<-ch`
    Receive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
    SourceFile {
        decls: Vec<NodeId>,
    },
    FuncDecl {
        name: String,
        body: Option<NodeId>,
    },
    FuncLit {
        body: NodeId,
    },

    // Statements
    Block {
        stmts: Vec<NodeId>,
    },
    /// `lhs = rhs` or, with `define`, `lhs := rhs`.
    Assign {
        lhs: Vec<NodeId>,
        rhs: Vec<NodeId>,
        #[serde(default)]
        define: bool,
    },
    VarDecl {
        names: Vec<NodeId>,
        #[serde(default)]
        type_expr: Option<NodeId>,
        #[serde(default)]
        values: Vec<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    Return {
        #[serde(default)]
        results: Vec<NodeId>,
    },
    If {
        cond: NodeId,
        then: NodeId,
        #[serde(default)]
        els: Option<NodeId>,
    },
    For {
        #[serde(default)]
        cond: Option<NodeId>,
        body: NodeId,
    },

    // Expressions
    Ident {
        name: String,
    },
    BasicLit {
        value: String,
    },
    CompositeLit {
        #[serde(default)]
        type_expr: Option<NodeId>,
        #[serde(default)]
        elements: Vec<NodeId>,
    },
    KeyValue {
        key: NodeId,
        value: NodeId,
    },
    Selector {
        base: NodeId,
        field: String,
    },
    Index {
        base: NodeId,
        index: NodeId,
    },
    Call {
        callee: NodeId,
        #[serde(default)]
        args: Vec<NodeId>,
    },
    Paren {
        inner: NodeId,
    },
    /// Pointer type `*T` in type position, dereference `*p` in value position.
    Star {
        operand: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: String,
        lhs: NodeId,
        rhs: NodeId,
    },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::SourceFile { decls } => decls.clone(),
            NodeKind::FuncDecl { body, .. } => body.iter().copied().collect(),
            NodeKind::FuncLit { body } => vec![*body],
            NodeKind::Block { stmts } => stmts.clone(),
            NodeKind::Assign { lhs, rhs, .. } => lhs.iter().chain(rhs).copied().collect(),
            NodeKind::VarDecl {
                names,
                type_expr,
                values,
            } => names
                .iter()
                .chain(type_expr)
                .chain(values)
                .copied()
                .collect(),
            NodeKind::ExprStmt { expr } => vec![*expr],
            NodeKind::Return { results } => results.clone(),
            NodeKind::If { cond, then, els } => {
                let mut out = vec![*cond, *then];
                out.extend(els);
                out
            }
            NodeKind::For { cond, body } => cond.iter().chain(Some(body)).copied().collect(),
            NodeKind::Ident { .. } | NodeKind::BasicLit { .. } => Vec::new(),
            NodeKind::CompositeLit {
                type_expr,
                elements,
            } => type_expr.iter().chain(elements).copied().collect(),
            NodeKind::KeyValue { key, value } => vec![*key, *value],
            NodeKind::Selector { base, .. } => vec![*base],
            NodeKind::Index { base, index } => vec![*base, *index],
            NodeKind::Call { callee, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(*callee);
                out.extend(args);
                out
            }
            NodeKind::Paren { inner } => vec![*inner],
            NodeKind::Star { operand } | NodeKind::Unary { operand, .. } => vec![*operand],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::FuncDecl { .. } | NodeKind::FuncLit { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::SourceFile { .. } => "source file",
            NodeKind::FuncDecl { .. } => "function declaration",
            NodeKind::FuncLit { .. } => "function literal",
            NodeKind::Block { .. } => "block",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::VarDecl { .. } => "variable declaration",
            NodeKind::ExprStmt { .. } => "expression statement",
            NodeKind::Return { .. } => "return",
            NodeKind::If { .. } => "if",
            NodeKind::For { .. } => "for",
            NodeKind::Ident { .. } => "identifier",
            NodeKind::BasicLit { .. } => "literal",
            NodeKind::CompositeLit { .. } => "composite literal",
            NodeKind::KeyValue { .. } => "key-value pair",
            NodeKind::Selector { .. } => "selector",
            NodeKind::Index { .. } => "index",
            NodeKind::Call { .. } => "call",
            NodeKind::Paren { .. } => "parenthesized expression",
            NodeKind::Star { .. } => "star expression",
            NodeKind::Unary { .. } => "unary expression",
            NodeKind::Binary { .. } => "binary expression",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub pos: Pos,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub nodes: Vec<Node>,
    /// Top-level nodes, normally one `SourceFile` per file.
    pub roots: Vec<NodeId>,
}

impl SyntaxTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    /// Visits every node reachable from the roots in pre-order.
    pub fn preorder<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &Node),
    {
        self.walk_with_ancestors(|id, node, _| visit(id, node));
    }

    /// Pre-order walk that also hands each visitor the chain of ancestors,
    /// outermost first, not including the node itself.
    ///
    /// Each node is visited at most once even if the arena shares a child
    /// between parents; references outside the arena are skipped.
    pub fn walk_with_ancestors<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &Node, &[NodeId]),
    {
        let mut seen = vec![false; self.nodes.len()];
        let mut ancestors: Vec<NodeId> = Vec::new();
        let mut frames: Vec<(Vec<NodeId>, usize)> = Vec::new();

        for &root in &self.roots {
            let Some(node) = self.claim(root, &mut seen) else {
                continue;
            };
            visit(root, node, &ancestors);
            ancestors.push(root);
            frames.push((node.kind.children(), 0));

            loop {
                let Some((children, next)) = frames.last_mut() else {
                    break;
                };
                let child = children.get(*next).copied();
                *next += 1;

                match child {
                    Some(child) => {
                        if let Some(node) = self.claim(child, &mut seen) {
                            visit(child, node, &ancestors);
                            ancestors.push(child);
                            frames.push((node.kind.children(), 0));
                        }
                    }
                    None => {
                        frames.pop();
                        ancestors.pop();
                    }
                }
            }
        }
    }

    fn claim<'a>(&'a self, id: NodeId, seen: &mut [bool]) -> Option<&'a Node> {
        let node = self.nodes.get(id.index())?;
        if std::mem::replace(&mut seen[id.index()], true) {
            return None;
        }
        Some(node)
    }
}
