//! Flow nodes and the per-scope flow arena.
//!
//! Nodes are backward-linked: each knows the antecedent(s) that execution
//! came from, which is the direction the evaluator walks. `Label` nodes
//! merge several antecedents; a `LoopBack` edge appended to a loop-header
//! label closes the cycle for loops, so every traversal must carry a
//! visited set.

use smallvec::SmallVec;

use tern_ir::ExprId;

use crate::{DeclId, FlowNodeId};

/// One point in a scope's possible execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowNode {
    /// Scope entry.
    Start,
    /// No execution path reaches this point.
    Unreachable,
    /// A name binding took effect.
    Assign {
        decl: DeclId,
        antecedent: FlowNodeId,
    },
    /// Execution passed a branch condition on its `assume` side.
    Branch {
        condition: ExprId,
        assume: bool,
        antecedent: FlowNodeId,
    },
    /// Merge point after branches or at a loop header.
    Label {
        antecedents: SmallVec<[FlowNodeId; 4]>,
    },
    /// Back edge from a loop body end into the loop-header label.
    LoopBack { antecedent: FlowNodeId },
    /// A call that may raise; also an exception edge source.
    Call {
        call: ExprId,
        antecedent: FlowNodeId,
    },
}

/// Flow node storage for one scope.
///
/// Nodes are exclusively owned by the scope that created them and referenced
/// by [`FlowNodeId`] handles only.
#[derive(Debug, Default)]
pub struct FlowArena {
    nodes: Vec<FlowNode>,
}

impl FlowArena {
    /// Create an arena seeded with `Start` and a shared `Unreachable` node.
    pub fn new() -> Self {
        let mut arena = FlowArena { nodes: Vec::new() };
        arena.alloc(FlowNode::Start);
        arena.alloc(FlowNode::Unreachable);
        arena
    }

    /// The scope-entry node.
    pub const START: FlowNodeId = FlowNodeId::new(0);
    /// The shared unreachable sink.
    pub const UNREACHABLE: FlowNodeId = FlowNodeId::new(1);

    /// Allocate a node.
    pub fn alloc(&mut self, node: FlowNode) -> FlowNodeId {
        let id = FlowNodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Look up a node.
    #[inline]
    pub fn get(&self, id: FlowNodeId) -> Option<&FlowNode> {
        self.nodes.get(id.index())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The arena always holds at least `Start` and `Unreachable`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether a node is the unreachable sink.
    #[inline]
    pub fn is_unreachable(&self, id: FlowNodeId) -> bool {
        matches!(self.get(id), Some(FlowNode::Unreachable))
    }

    /// Append an antecedent to a `Label` node, ignoring duplicates.
    ///
    /// Returns `false` when `label` does not name a `Label`.
    pub fn add_antecedent(&mut self, label: FlowNodeId, antecedent: FlowNodeId) -> bool {
        match self.nodes.get_mut(label.index()) {
            Some(FlowNode::Label { antecedents }) => {
                if !antecedents.contains(&antecedent) {
                    antecedents.push(antecedent);
                }
                true
            }
            _ => false,
        }
    }
}
