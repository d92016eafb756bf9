//! Errors raised while loading or validating a compilation unit.

use std::path::PathBuf;

use thiserror::Error;

use crate::syntax::NodeId;
use crate::types::{BindingId, TypeId};

#[derive(Error, Debug)]
pub enum IrError {
    /// A node refers to a child outside the arena
    #[error("node {parent:?} refers to missing node {child:?}")]
    DanglingNode { parent: NodeId, child: NodeId },

    #[error("root {0:?} is not in the syntax tree")]
    MissingRoot(NodeId),

    #[error("node {node:?} points at file {file}, but the unit has {count} files")]
    UnknownFile { node: NodeId, file: u32, count: usize },

    #[error("type table is missing the invalid type in slot 0")]
    MissingInvalidSlot,

    #[error("{context} refers to unknown type {ty:?}")]
    UnknownType { context: String, ty: TypeId },

    #[error("identifier {ident:?} resolves to unknown binding {binding:?}")]
    UnknownBinding { ident: NodeId, binding: BindingId },

    #[error("control-flow graph of {function:?} has no blocks")]
    EmptyCfg { function: NodeId },

    #[error("block {block} of {function:?} has successor {succ}, but the graph has {count} blocks")]
    SuccessorOutOfRange {
        function: NodeId,
        block: usize,
        succ: usize,
        count: usize,
    },

    #[error("node {node:?} appears more than once in block {block} of {function:?}")]
    DuplicateBlockNode {
        function: NodeId,
        block: usize,
        node: NodeId,
    },

    /// CFGs are keyed by function nodes only
    #[error("control-flow graph keyed by {node:?}, which is a {label}")]
    NotAFunction { node: NodeId, label: &'static str },

    #[error("IO error at {path}: {error}")]
    IoWithPath {
        error: std::io::Error,
        path: PathBuf,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IrError {
    pub fn io_with_path(error: std::io::Error, path: impl Into<PathBuf>) -> Self {
        IrError::IoWithPath {
            error,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IrError>;
