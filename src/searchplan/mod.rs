//! # Searchplan Generation
//!
//! Derives an ordered plan of matching operations from a rule's LHS
//! graph. Every LHS node and edge receives exactly one operation, and
//! connectivity is exploited so that an edge is always matched from an
//! already-bound endpoint whenever one exists.
//!
//! ```text
//! LHS graph -> [Searchplan] -> ordered SearchOps -> Matching codegen
//! ```
//!
//! The generator seeds the plan with root nodes (cheap to enumerate at
//! runtime), breadth-first walks each connected component, then picks
//! up any still-unvisited nodes as free-node matches. Tie-breaks are by
//! rising item index throughout, so plans are deterministic.

use crate::rule::RuleGraph;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// The kind of one matching operation.
///
/// The single-letter codes appear in generated matcher names and follow
/// the classic searchplan notation: `r` root node, `n` free node, `e`
/// free edge, `l` loop from a bound node, `s`/`t` edge from its bound
/// source/target, `i`/`o`/`b` node from a just-bound incoming, outgoing
/// or bidirectional edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    RootNode,
    Node,
    Edge,
    Loop,
    FromSource,
    FromTarget,
    NodeFromIn,
    NodeFromOut,
    NodeFromBi,
}

impl OpKind {
    /// The classic one-letter code used in generated function names.
    pub fn code(self) -> char {
        match self {
            OpKind::RootNode => 'r',
            OpKind::Node => 'n',
            OpKind::Edge => 'e',
            OpKind::Loop => 'l',
            OpKind::FromSource => 's',
            OpKind::FromTarget => 't',
            OpKind::NodeFromIn => 'i',
            OpKind::NodeFromOut => 'o',
            OpKind::NodeFromBi => 'b',
        }
    }

    /// True if the operation binds a node (as opposed to an edge).
    pub fn is_node(self) -> bool {
        matches!(
            self,
            OpKind::RootNode
                | OpKind::Node
                | OpKind::NodeFromIn
                | OpKind::NodeFromOut
                | OpKind::NodeFromBi
        )
    }
}

/// One operation: an op kind plus the LHS item index it binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOp {
    pub kind: OpKind,
    pub index: usize,
}

impl fmt::Display for SearchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.code(), self.index)
    }
}

/// The ordered operation sequence for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Searchplan {
    pub ops: Vec<SearchOp>,
}

impl Searchplan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Generate the searchplan for an LHS graph.
pub fn generate(lhs: &RuleGraph) -> Searchplan {
    let mut state = PlanState {
        lhs,
        node_visited: vec![false; lhs.nodes.len()],
        edge_visited: vec![false; lhs.edges.len()],
        ops: Vec::new(),
    };

    // Root nodes seed the plan: the runtime keeps a dedicated root list,
    // so these are the cheapest candidates to enumerate.
    for node in &lhs.nodes {
        if node.root && !state.node_visited[node.index] {
            state.node_visited[node.index] = true;
            state.push(OpKind::RootNode, node.index);
            state.traverse_component(node.index);
        }
    }

    // Any component without a root starts from a free node match.
    for node in &lhs.nodes {
        if !state.node_visited[node.index] {
            state.node_visited[node.index] = true;
            state.push(OpKind::Node, node.index);
            state.traverse_component(node.index);
        }
    }

    // Safety net for edges the walk never reached: match them freely
    // and bind their endpoints from the edge.
    for edge in &lhs.edges {
        if !state.edge_visited[edge.index] {
            state.edge_visited[edge.index] = true;
            state.push(OpKind::Edge, edge.index);
            if !state.node_visited[edge.source] {
                state.node_visited[edge.source] = true;
                let kind = if edge.bidirectional {
                    OpKind::NodeFromBi
                } else {
                    OpKind::NodeFromOut
                };
                state.push(kind, edge.source);
            }
            if !state.node_visited[edge.target] {
                state.node_visited[edge.target] = true;
                let kind = if edge.bidirectional {
                    OpKind::NodeFromBi
                } else {
                    OpKind::NodeFromIn
                };
                state.push(kind, edge.target);
            }
        }
    }

    Searchplan { ops: state.ops }
}

struct PlanState<'a> {
    lhs: &'a RuleGraph,
    node_visited: Vec<bool>,
    edge_visited: Vec<bool>,
    ops: Vec<SearchOp>,
}

impl PlanState<'_> {
    fn push(&mut self, kind: OpKind, index: usize) {
        self.ops.push(SearchOp { kind, index });
    }

    /// Breadth-first walk of the component containing `start`, which is
    /// already planned. Each edge is planned from its bound endpoint,
    /// immediately followed by the opposite node if it is still free.
    fn traverse_component(&mut self, start: usize) {
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for edge in &self.lhs.edges {
                if self.edge_visited[edge.index] {
                    continue;
                }
                if edge.source != current && edge.target != current {
                    continue;
                }
                self.edge_visited[edge.index] = true;
                if edge.is_loop() {
                    self.push(OpKind::Loop, edge.index);
                    continue;
                }
                let (edge_kind, other, other_kind) = if edge.source == current {
                    (
                        OpKind::FromSource,
                        edge.target,
                        if edge.bidirectional {
                            OpKind::NodeFromBi
                        } else {
                            OpKind::NodeFromIn
                        },
                    )
                } else {
                    (
                        OpKind::FromTarget,
                        edge.source,
                        if edge.bidirectional {
                            OpKind::NodeFromBi
                        } else {
                            OpKind::NodeFromOut
                        },
                    )
                };
                self.push(edge_kind, edge.index);
                if !self.node_visited[other] {
                    self.node_visited[other] = true;
                    self.push(other_kind, other);
                    queue.push_back(other);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::RuleLabel;
    use crate::rule::{RuleEdge, RuleNode};

    fn node(index: usize, root: bool) -> RuleNode {
        RuleNode {
            index,
            name: format!("n{index}"),
            root,
            label: RuleLabel::blank(),
            indegree: 0,
            outdegree: 0,
            bidegree: 0,
            interface: None,
            relabelled: false,
            remarked: false,
            root_changed: false,
            indegree_arg: false,
            outdegree_arg: false,
            predicates: Vec::new(),
        }
    }

    fn edge(index: usize, source: usize, target: usize, bidirectional: bool) -> RuleEdge {
        RuleEdge {
            index,
            name: format!("e{index}"),
            bidirectional,
            source,
            target,
            label: RuleLabel::blank(),
            interface: None,
            relabelled: false,
            remarked: false,
        }
    }

    fn codes(plan: &Searchplan) -> String {
        plan.ops.iter().map(|op| op.to_string()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_lhs_yields_empty_plan() {
        let plan = generate(&RuleGraph::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_single_node() {
        let lhs = RuleGraph {
            nodes: vec![node(0, false)],
            edges: vec![],
        };
        assert_eq!(codes(&generate(&lhs)), "n0");
    }

    #[test]
    fn test_root_node_seeds_plan() {
        let lhs = RuleGraph {
            nodes: vec![node(0, false), node(1, true)],
            edges: vec![edge(0, 1, 0, false)],
        };
        // Root node 1 first, then its outgoing edge, then node 0.
        assert_eq!(codes(&generate(&lhs)), "r1 s0 i0");
    }

    #[test]
    fn test_chain_is_walked_from_first_node() {
        let lhs = RuleGraph {
            nodes: vec![node(0, false), node(1, false), node(2, false)],
            edges: vec![edge(0, 0, 1, false), edge(1, 1, 2, false)],
        };
        assert_eq!(codes(&generate(&lhs)), "n0 s0 i1 s1 i2");
    }

    #[test]
    fn test_edge_into_planned_node_gets_no_node_op() {
        // Triangle: the closing edge finds both endpoints bound.
        let lhs = RuleGraph {
            nodes: vec![node(0, false), node(1, false), node(2, false)],
            edges: vec![
                edge(0, 0, 1, false),
                edge(1, 1, 2, false),
                edge(2, 2, 0, false),
            ],
        };
        let plan = generate(&lhs);
        let node_ops = plan.ops.iter().filter(|op| op.kind.is_node()).count();
        let edge_ops = plan.ops.iter().filter(|op| !op.kind.is_node()).count();
        assert_eq!(node_ops, 3);
        assert_eq!(edge_ops, 3);
        assert_eq!(codes(&plan), "n0 s0 i1 t2 o2 s1");
    }

    #[test]
    fn test_lone_loop_needs_node_first() {
        let lhs = RuleGraph {
            nodes: vec![node(0, false)],
            edges: vec![edge(0, 0, 0, false)],
        };
        assert_eq!(codes(&generate(&lhs)), "n0 l0");
    }

    #[test]
    fn test_incoming_edge_matched_from_target() {
        let lhs = RuleGraph {
            nodes: vec![node(0, true), node(1, false)],
            edges: vec![edge(0, 1, 0, false)],
        };
        // Edge 0 points at the root, so it is matched from its target.
        assert_eq!(codes(&generate(&lhs)), "r0 t0 o1");
    }

    #[test]
    fn test_bidirectional_edge_binds_node_from_bi() {
        let lhs = RuleGraph {
            nodes: vec![node(0, false), node(1, false)],
            edges: vec![edge(0, 0, 1, true)],
        };
        assert_eq!(codes(&generate(&lhs)), "n0 s0 b1");
    }

    #[test]
    fn test_disconnected_components() {
        let lhs = RuleGraph {
            nodes: vec![node(0, false), node(1, false), node(2, false), node(3, false)],
            edges: vec![edge(0, 2, 3, false)],
        };
        assert_eq!(codes(&generate(&lhs)), "n0 n1 n2 s0 i3");
    }

    #[test]
    fn test_every_item_planned_exactly_once() {
        let lhs = RuleGraph {
            nodes: vec![node(0, true), node(1, false), node(2, false)],
            edges: vec![
                edge(0, 0, 1, false),
                edge(1, 1, 2, true),
                edge(2, 2, 2, false),
            ],
        };
        let plan = generate(&lhs);
        for index in 0..lhs.nodes.len() {
            let count = plan
                .ops
                .iter()
                .filter(|op| op.kind.is_node() && op.index == index)
                .count();
            assert_eq!(count, 1, "node {index} planned {count} times");
        }
        for index in 0..lhs.edges.len() {
            let count = plan
                .ops
                .iter()
                .filter(|op| !op.kind.is_node() && op.index == index)
                .count();
            assert_eq!(count, 1, "edge {index} planned {count} times");
        }
    }
}
