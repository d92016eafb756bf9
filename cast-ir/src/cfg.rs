//! Per-function control-flow graphs.
//!
//! Blocks hold syntax node ids in execution order; block 0 is the entry.
//! Successor edges may form cycles, so every traversal here is bounded.

use serde::{Deserialize, Serialize};

use crate::syntax::NodeId;

/// Default number of block expansions a path search may spend.
pub const DEFAULT_STEP_BUDGET: usize = 1000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub nodes: Vec<NodeId>,
    /// Indices into [`ControlFlowGraph::blocks`], in declaration order.
    #[serde(default)]
    pub succs: Vec<usize>,
}

impl BasicBlock {
    pub fn new(nodes: Vec<NodeId>, succs: Vec<usize>) -> Self {
        Self { nodes, succs }
    }

    /// Nodes up to and including the first occurrence of `target`.
    pub fn nodes_through(&self, target: NodeId) -> Option<&[NodeId]> {
        let idx = self.nodes.iter().position(|&node| node == target)?;
        Some(&self.nodes[..=idx])
    }
}

/// Outcome of [`ControlFlowGraph::path_to`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSearch {
    /// Every node executed on the discovered path, ending with the target.
    Found(Vec<NodeId>),
    NotFound,
    /// The step budget ran out before the target was reached.
    BudgetExhausted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    pub fn new(blocks: Vec<BasicBlock>) -> Self {
        Self { blocks }
    }

    /// A single block holding `nodes`.
    pub fn straight_line(nodes: Vec<NodeId>) -> Self {
        Self::new(vec![BasicBlock::new(nodes, Vec::new())])
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }


    /// Depth-first search from the entry block for a path reaching `target`.
    ///
    /// Successors are tried in declaration order and a block is expanded at
    /// most once, so the returned path is simple and deterministic. Each block
    /// expansion costs one step; once `budget` steps are spent the search
    /// stops with [`PathSearch::BudgetExhausted`].
    ///
    /// The path is the concatenation of the nodes of every block on the way,
    /// followed by the target block's nodes up to and including `target`.
    pub fn path_to(&self, target: NodeId, budget: usize) -> PathSearch {
        if self.blocks.is_empty() {
            return PathSearch::NotFound;
        }

        let mut expanded = vec![false; self.blocks.len()];
        // (block, index of the next successor to try)
        let mut frames: Vec<(usize, usize)> = Vec::new();
        let mut pending = Some(0usize);
        let mut steps = 0usize;

        loop {
            if let Some(block) = pending.take() {
                if steps >= budget {
                    return PathSearch::BudgetExhausted;
                }
                steps += 1;
                expanded[block] = true;

                if let Some(prefix) = self.blocks[block].nodes_through(target) {
                    let mut path: Vec<NodeId> = frames
                        .iter()
                        .flat_map(|&(on_path, _)| self.blocks[on_path].nodes.iter().copied())
                        .collect();
                    path.extend_from_slice(prefix);
                    return PathSearch::Found(path);
                }
                frames.push((block, 0));
            }

            let Some((block, next)) = frames.last_mut() else {
                return PathSearch::NotFound;
            };
            match self.blocks[*block].succs.get(*next).copied() {
                Some(succ) => {
                    *next += 1;
                    if succ < self.blocks.len() && !expanded[succ] {
                        pending = Some(succ);
                    }
                }
                None => {
                    frames.pop();
                }
            }
        }
    }
}
