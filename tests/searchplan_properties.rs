//! Property tests for searchplan generation: coverage, dependency
//! order and determinism over arbitrary small LHS graphs.

use gp2c::label::RuleLabel;
use gp2c::rule::{RuleEdge, RuleGraph, RuleNode};
use gp2c::searchplan::{self, OpKind};
use proptest::prelude::*;

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

fn arb_graph() -> impl Strategy<Value = RuleGraph> {
    (0usize..6).prop_flat_map(|node_count| {
        let roots = proptest::collection::vec(any::<bool>(), node_count);
        let edges = if node_count == 0 {
            Just(Vec::new()).boxed()
        } else {
            proptest::collection::vec(
                (0..node_count, 0..node_count, any::<bool>()),
                0..8,
            )
            .boxed()
        };
        (roots, edges).prop_map(|(roots, edge_specs)| RuleGraph {
            nodes: roots
                .iter()
                .enumerate()
                .map(|(index, &root)| node(index, root))
                .collect(),
            edges: edge_specs
                .iter()
                .enumerate()
                .map(|(index, &(source, target, bidirectional))| {
                    edge(index, source, target, bidirectional)
                })
                .collect(),
        })
    })
}

proptest! {
    #[test]
    fn every_item_planned_exactly_once(lhs in arb_graph()) {
        let plan = searchplan::generate(&lhs);
        prop_assert_eq!(plan.len(), lhs.nodes.len() + lhs.edges.len());
        for index in 0..lhs.nodes.len() {
            let count = plan
                .ops
                .iter()
                .filter(|op| op.kind.is_node() && op.index == index)
                .count();
            prop_assert_eq!(count, 1);
        }
        for index in 0..lhs.edges.len() {
            let count = plan
                .ops
                .iter()
                .filter(|op| !op.kind.is_node() && op.index == index)
                .count();
            prop_assert_eq!(count, 1);
        }
    }

    #[test]
    fn edge_operations_respect_dependencies(lhs in arb_graph()) {
        let plan = searchplan::generate(&lhs);
        let node_position = |target: usize| {
            plan.ops
                .iter()
                .position(|op| op.kind.is_node() && op.index == target)
        };
        for (position, op) in plan.ops.iter().enumerate() {
            match op.kind {
                OpKind::FromSource | OpKind::Loop => {
                    let source = lhs.edges[op.index].source;
                    prop_assert!(node_position(source).unwrap() < position);
                }
                OpKind::FromTarget => {
                    let target = lhs.edges[op.index].target;
                    prop_assert!(node_position(target).unwrap() < position);
                }
                OpKind::Edge => {
                    let edge = &lhs.edges[op.index];
                    prop_assert!(node_position(edge.source).unwrap() > position);
                    prop_assert!(node_position(edge.target).unwrap() > position);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn node_from_edge_follows_its_edge(lhs in arb_graph()) {
        let plan = searchplan::generate(&lhs);
        for (position, op) in plan.ops.iter().enumerate() {
            if matches!(op.kind, OpKind::NodeFromIn | OpKind::NodeFromOut | OpKind::NodeFromBi) {
                prop_assert!(position > 0);
                let previous = &plan.ops[position - 1];
                prop_assert!(!previous.kind.is_node());
                let edge = &lhs.edges[previous.index];
                prop_assert!(edge.source == op.index || edge.target == op.index);
            }
        }
    }

    #[test]
    fn root_nodes_are_seeded_first(lhs in arb_graph()) {
        let plan = searchplan::generate(&lhs);
        if lhs.nodes.iter().any(|n| n.root) {
            prop_assert_eq!(plan.ops[0].kind, OpKind::RootNode);
        }
    }

    #[test]
    fn plans_are_deterministic(lhs in arb_graph()) {
        let first = searchplan::generate(&lhs);
        let second = searchplan::generate(&lhs);
        prop_assert_eq!(first, second);
    }
}
