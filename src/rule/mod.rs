//! # Rule IR - Intermediate Representation
//!
//! The flat intermediate representation of one rule, produced by the
//! [`crate::transform`] module and consumed by the searchplan generator
//! and the code generator.
//!
//! ```text
//! AST rule -> [Transform] -> Rule IR -> Searchplan / Codegen
//! ```
//!
//! Nodes, edges, variables and predicates live in indexed arenas; the
//! condition tree and all back-references hold indices rather than
//! owning pointers, so the structure is cycle-free. LHS items point at
//! their preserved RHS counterpart (and vice versa) through `interface`
//! indices, with the relabel/remark/re-root annotations stored on the
//! RHS item as the rewrite decides them.

use crate::label::{RuleAtom, RuleLabel, VarType};
use serde::{Deserialize, Serialize};

/// A rule in intermediate representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub variables: Vec<Variable>,
    pub lhs: Option<RuleGraph>,
    pub rhs: Option<RuleGraph>,
    /// Predicate arena indexed by `bool_id`
    pub predicates: Vec<Predicate>,
    pub condition: Option<Condition>,
    /// True if the rule adds at least one node (RHS item with no interface)
    pub adds_nodes: bool,
    /// True if the rule adds at least one edge
    pub adds_edges: bool,
}

impl Rule {
    /// True iff the rule only tests for the existence of a match: it has
    /// an LHS and the rewrite neither adds, deletes nor modifies any
    /// item.
    pub fn is_predicate(&self) -> bool {
        let Some(lhs) = &self.lhs else {
            return false;
        };
        if self.adds_nodes || self.adds_edges {
            return false;
        }
        let deletes = lhs.nodes.iter().any(|n| n.interface.is_none())
            || lhs.edges.iter().any(|e| e.interface.is_none());
        if deletes {
            return false;
        }
        match &self.rhs {
            None => lhs.nodes.is_empty() && lhs.edges.is_empty(),
            Some(rhs) => {
                let modifies = rhs
                    .nodes
                    .iter()
                    .any(|n| n.relabelled || n.remarked || n.root_changed)
                    || rhs.edges.iter().any(|e| e.relabelled || e.remarked);
                !modifies
            }
        }
    }

    /// True if the rule's LHS is empty (the rule only builds a graph).
    pub fn empty_lhs(&self) -> bool {
        self.lhs.is_none()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// One side of a rule: indexed node and edge arenas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleGraph {
    pub nodes: Vec<RuleNode>,
    pub edges: Vec<RuleEdge>,
}

impl RuleGraph {
    pub fn node(&self, index: usize) -> &RuleNode {
        &self.nodes[index]
    }

    pub fn edge(&self, index: usize) -> &RuleEdge {
        &self.edges[index]
    }
}

/// A node in a rule graph.
///
/// The degree fields describe the *rule* graph: `indegree` and
/// `outdegree` count directed incident edges, `bidegree` counts
/// bidirectional incident edges (a loop contributes to both `indegree`
/// and `outdegree`, or twice to `bidegree` if bidirectional). These
/// drive the generated degree-compatibility check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleNode {
    pub index: usize,
    pub name: String,
    pub root: bool,
    pub label: RuleLabel,
    pub indegree: usize,
    pub outdegree: usize,
    pub bidegree: usize,
    /// Index of the paired node on the other side, if preserved
    pub interface: Option<usize>,
    /// RHS only: the list part of the label changes across the rewrite
    pub relabelled: bool,
    /// RHS only: the mark changes but the list part does not
    pub remarked: bool,
    /// RHS only: the root flag changes across the rewrite
    pub root_changed: bool,
    /// LHS only: the node's indegree is read by an RHS label
    pub indegree_arg: bool,
    /// LHS only: the node's outdegree is read by an RHS label
    pub outdegree_arg: bool,
    /// `bool_id`s of predicates that reference this node
    pub predicates: Vec<usize>,
}

/// An edge in a rule graph. Source and target are node indices within
/// the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEdge {
    pub index: usize,
    pub name: String,
    pub bidirectional: bool,
    pub source: usize,
    pub target: usize,
    pub label: RuleLabel,
    /// Index of the paired edge on the other side, if preserved
    pub interface: Option<usize>,
    /// RHS only: the list part of the label changes across the rewrite
    pub relabelled: bool,
    /// RHS only: the mark changes but the list part does not
    pub remarked: bool,
}

impl RuleEdge {
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}

/// A declared rule variable with its compile-time bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub var_type: VarType,
    /// True if rule application needs the variable's matched value
    pub used_by_rule: bool,
    /// `bool_id`s of predicates that reference this variable
    pub predicates: Vec<usize>,
}

/// A condition leaf with its runtime boolean identity.
///
/// `bool_id`s are dense and assigned in a pre-order traversal of the
/// condition tree; `negated` is true iff the leaf sits under an odd
/// number of `not` nodes, which decides the neutral initialisation of
/// its runtime boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub bool_id: usize,
    pub negated: bool,
    pub kind: PredicateKind,
}

/// The payload of a condition leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateKind {
    IntCheck { var: String },
    CharCheck { var: String },
    StringCheck { var: String },
    AtomCheck { var: String },
    /// Edge existence between two LHS nodes, optionally label-matched
    Edge {
        source: usize,
        target: usize,
        label: Option<RuleLabel>,
    },
    Equal { left: RuleLabel, right: RuleLabel },
    NotEqual { left: RuleLabel, right: RuleLabel },
    Greater { left: RuleAtom, right: RuleAtom },
    GreaterEqual { left: RuleAtom, right: RuleAtom },
    Less { left: RuleAtom, right: RuleAtom },
    LessEqual { left: RuleAtom, right: RuleAtom },
}

/// The condition tree. Leaves are indices into the rule's predicate
/// arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Predicate(usize),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Visit every predicate leaf in pre-order.
    pub fn for_each_predicate(&self, visit: &mut impl FnMut(usize)) {
        match self {
            Condition::Predicate(id) => visit(*id),
            Condition::Not(inner) => inner.for_each_predicate(visit),
            Condition::And(left, right) | Condition::Or(left, right) => {
                left.for_each_predicate(visit);
                right.for_each_predicate(visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Mark;

    fn bare_node(index: usize, interface: Option<usize>) -> RuleNode {
        RuleNode {
            index,
            name: format!("n{index}"),
            root: false,
            label: RuleLabel::blank(),
            indegree: 0,
            outdegree: 0,
            bidegree: 0,
            interface,
            relabelled: false,
            remarked: false,
            root_changed: false,
            indegree_arg: false,
            outdegree_arg: false,
            predicates: Vec::new(),
        }
    }

    #[test]
    fn test_predicate_rule_detection() {
        // One preserved, unmodified node on each side.
        let rule = Rule {
            name: "check".into(),
            variables: vec![],
            lhs: Some(RuleGraph {
                nodes: vec![bare_node(0, Some(0))],
                edges: vec![],
            }),
            rhs: Some(RuleGraph {
                nodes: vec![bare_node(0, Some(0))],
                edges: vec![],
            }),
            predicates: vec![],
            condition: None,
            adds_nodes: false,
            adds_edges: false,
        };
        assert!(rule.is_predicate());
    }

    #[test]
    fn test_deleting_rule_is_not_predicate() {
        let rule = Rule {
            name: "delete".into(),
            variables: vec![],
            lhs: Some(RuleGraph {
                nodes: vec![bare_node(0, None)],
                edges: vec![],
            }),
            rhs: Some(RuleGraph::default()),
            predicates: vec![],
            condition: None,
            adds_nodes: false,
            adds_edges: false,
        };
        assert!(!rule.is_predicate());
    }

    #[test]
    fn test_relabelling_rule_is_not_predicate() {
        let mut rhs_node = bare_node(0, Some(0));
        rhs_node.relabelled = true;
        let rule = Rule {
            name: "relabel".into(),
            variables: vec![],
            lhs: Some(RuleGraph {
                nodes: vec![bare_node(0, Some(0))],
                edges: vec![],
            }),
            rhs: Some(RuleGraph {
                nodes: vec![rhs_node],
                edges: vec![],
            }),
            predicates: vec![],
            condition: None,
            adds_nodes: false,
            adds_edges: false,
        };
        assert!(!rule.is_predicate());
    }

    #[test]
    fn test_empty_lhs_rule_is_not_predicate() {
        let rule = Rule {
            name: "build".into(),
            variables: vec![],
            lhs: None,
            rhs: Some(RuleGraph {
                nodes: vec![bare_node(0, None)],
                edges: vec![],
            }),
            predicates: vec![],
            condition: None,
            adds_nodes: true,
            adds_edges: false,
        };
        assert!(!rule.is_predicate());
        assert!(rule.empty_lhs());
    }

    #[test]
    fn test_loop_detection() {
        let edge = RuleEdge {
            index: 0,
            name: "e0".into(),
            bidirectional: false,
            source: 1,
            target: 1,
            label: RuleLabel {
                mark: Mark::None,
                atoms: vec![],
            },
            interface: None,
            relabelled: false,
            remarked: false,
        };
        assert!(edge.is_loop());
    }

    #[test]
    fn test_condition_preorder_visit() {
        let condition = Condition::And(
            Box::new(Condition::Not(Box::new(Condition::Predicate(0)))),
            Box::new(Condition::Or(
                Box::new(Condition::Predicate(1)),
                Box::new(Condition::Predicate(2)),
            )),
        );
        let mut seen = Vec::new();
        condition.for_each_predicate(&mut |id| seen.push(id));
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
