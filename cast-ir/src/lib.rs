//! Input model for the cast analyzers: a type-checked compilation unit.
//!
//! A front end hands over one [`CompilationUnit`] per package: the syntax tree
//! arena, resolved types and bindings, and one control-flow graph per function
//! body. Units are immutable while analyzers run.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod cfg;
pub mod error;
pub mod syntax;
pub mod types;

pub use builder::UnitBuilder;
pub use cfg::{BasicBlock, ControlFlowGraph, PathSearch, DEFAULT_STEP_BUDGET};
pub use error::{IrError, Result};
pub use syntax::{Node, NodeId, NodeKind, Pos, SyntaxTree, UnaryOp};
pub use types::{
    BasicKind, Binding, BindingId, ExprMode, Field, Type, TypeId, TypeInfo, TypeTable, TypedExpr,
};

/// Resolved source position, suitable for reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Package path or any label the host uses for the unit.
    pub name: String,
    /// File names indexed by [`Pos::file`].
    #[serde(default)]
    pub files: Vec<String>,
    pub tree: SyntaxTree,
    pub info: TypeInfo,
    /// Keyed by the `FuncDecl` or `FuncLit` node owning the body.
    #[serde(default)]
    pub cfgs: BTreeMap<NodeId, ControlFlowGraph>,
    /// Errors the front end reported while checking this unit.
    #[serde(default)]
    pub upstream_errors: Vec<String>,
}

impl CompilationUnit {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let unit: CompilationUnit = serde_json::from_str(json)?;
        unit.validate()?;
        Ok(unit)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|err| IrError::io_with_path(err, path))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn cfg_for(&self, function: NodeId) -> Option<&ControlFlowGraph> {
        self.cfgs.get(&function)
    }

    pub fn has_upstream_errors(&self) -> bool {
        !self.upstream_errors.is_empty()
    }

    pub fn location(&self, node: NodeId) -> Option<Location> {
        let pos = self.tree.node(node)?.pos;
        Some(self.resolve_pos(pos))
    }

    pub fn resolve_pos(&self, pos: Pos) -> Location {
        let file = self
            .files
            .get(pos.file as usize)
            .cloned()
            .unwrap_or_else(|| format!("<file {}>", pos.file));
        Location {
            file,
            line: pos.line,
            column: pos.column,
        }
    }

    /// Checks that every id in the unit points at something that exists.
    ///
    /// Analyzers tolerate missing type information, but not references into
    /// the void, so loaders call this before handing a unit over.
    pub fn validate(&self) -> Result<()> {
        self.validate_tree()?;
        self.validate_types()?;
        self.validate_cfgs()
    }

    fn validate_tree(&self) -> Result<()> {
        let count = self.tree.len();
        for &root in &self.tree.roots {
            if root.index() >= count {
                return Err(IrError::MissingRoot(root));
            }
        }
        for (idx, node) in self.tree.nodes.iter().enumerate() {
            let parent = NodeId(idx as u32);
            if let Some(child) = node
                .kind
                .children()
                .into_iter()
                .find(|child| child.index() >= count)
            {
                return Err(IrError::DanglingNode { parent, child });
            }
            if !self.files.is_empty() && node.pos.file as usize >= self.files.len() {
                return Err(IrError::UnknownFile {
                    node: parent,
                    file: node.pos.file,
                    count: self.files.len(),
                });
            }
        }
        Ok(())
    }

    fn validate_types(&self) -> Result<()> {
        let table = &self.info.types;
        if table.is_empty() || !matches!(table.get(TypeTable::INVALID), Type::Invalid) {
            return Err(IrError::MissingInvalidSlot);
        }

        let unknown = |context: String, ty: TypeId| IrError::UnknownType { context, ty };
        for (id, ty) in table.iter() {
            let refs: Vec<TypeId> = match ty {
                Type::Invalid | Type::Basic { .. } => Vec::new(),
                Type::Pointer { elem } | Type::Slice { elem } | Type::Array { elem, .. } => {
                    vec![*elem]
                }
                Type::Struct { fields } => fields.iter().map(|field| field.ty).collect(),
                Type::Named { underlying, .. } => vec![*underlying],
            };
            if let Some(bad) = refs.into_iter().find(|r| !table.contains(*r)) {
                return Err(unknown(format!("type {}", id.0), bad));
            }
        }

        for (node, typed) in &self.info.exprs {
            if !table.contains(typed.ty) {
                return Err(unknown(format!("expression {}", node.0), typed.ty));
            }
        }
        for binding in &self.info.bindings {
            if !table.contains(binding.ty) {
                return Err(unknown(format!("binding `{}`", binding.name), binding.ty));
            }
        }
        for (&ident, &binding) in &self.info.resolutions {
            if self.info.binding(binding).is_none() {
                return Err(IrError::UnknownBinding { ident, binding });
            }
        }
        Ok(())
    }

    fn validate_cfgs(&self) -> Result<()> {
        for (&function, cfg) in &self.cfgs {
            let kind = self.tree.kind(function).ok_or(IrError::DanglingNode {
                parent: function,
                child: function,
            })?;
            if !kind.is_function() {
                return Err(IrError::NotAFunction {
                    node: function,
                    label: kind.label(),
                });
            }
            if cfg.blocks.is_empty() {
                return Err(IrError::EmptyCfg { function });
            }

            let count = cfg.block_count();
            for (block_idx, block) in cfg.blocks.iter().enumerate() {
                if let Some(&succ) = block.succs.iter().find(|&&succ| succ >= count) {
                    return Err(IrError::SuccessorOutOfRange {
                        function,
                        block: block_idx,
                        succ,
                        count,
                    });
                }
                for (pos, &node) in block.nodes.iter().enumerate() {
                    if node.index() >= self.tree.len() {
                        return Err(IrError::DanglingNode {
                            parent: function,
                            child: node,
                        });
                    }
                    if block.nodes[..pos].contains(&node) {
                        return Err(IrError::DuplicateBlockNode {
                            function,
                            block: block_idx,
                            node,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
