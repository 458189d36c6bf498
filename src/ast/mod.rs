//! # Rule AST - Abstract Syntax Tree Types
//!
//! Abstract syntax tree types for GP 2 rule declarations, as produced by
//! the [`crate::parser`] module and consumed by the AST-to-IR
//! transformation.
//!
//! At this stage variables are plain names (their declared types are
//! resolved during transformation), degree operators reference nodes by
//! name, and graphs are node/edge lists keyed by identifier.

use crate::label::Mark;
use serde::{Deserialize, Serialize};

// ============================================================================
// Declarations
// ============================================================================

/// A top-level declaration.
///
/// Procedures only matter to the rule compiler as containers: their
/// local rule declarations are compiled exactly like global ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Rule(RuleDecl),
    Procedure {
        name: String,
        local_decls: Vec<Declaration>,
    },
}

/// A parsed rule declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDecl {
    pub name: String,
    /// Declared variables, grouped per type as written in the source
    pub variables: Vec<VarDeclGroup>,
    pub lhs: AstGraph,
    pub rhs: AstGraph,
    /// Names of nodes preserved across the rewrite
    pub interface: Vec<String>,
    pub condition: Option<AstCondition>,
}

/// One `a, b, c : type` group from the variable declaration list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDeclGroup {
    pub names: Vec<String>,
    pub var_type: crate::label::VarType,
}

// ============================================================================
// Graphs
// ============================================================================

/// A pattern graph (LHS or RHS) as written in the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AstGraph {
    pub nodes: Vec<AstNode>,
    pub edges: Vec<AstEdge>,
}

impl AstGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Find a node by its identifier.
    pub fn node_named(&self, name: &str) -> Option<&AstNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub name: String,
    pub root: bool,
    pub label: AstLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstEdge {
    pub name: String,
    pub bidirectional: bool,
    pub source: String,
    pub target: String,
    pub label: AstLabel,
}

// ============================================================================
// Labels and atoms
// ============================================================================

/// A label as written: an atom list and a mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstLabel {
    pub mark: Mark,
    pub atoms: Vec<AstAtom>,
}

impl AstLabel {
    /// The `empty` label with no mark.
    pub fn empty() -> AstLabel {
        AstLabel {
            mark: Mark::None,
            atoms: Vec::new(),
        }
    }
}

/// An atom expression before variable types are resolved.
///
/// Degree operators hold node identifiers; the transformation resolves
/// them to LHS node indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstAtom {
    Integer(i32),
    String(String),
    Variable(String),
    Indegree(String),
    Outdegree(String),
    /// `length(x)` where `x` is a list or string variable
    Length(String),
    Neg(Box<AstAtom>),
    Add(Box<AstAtom>, Box<AstAtom>),
    Subtract(Box<AstAtom>, Box<AstAtom>),
    Multiply(Box<AstAtom>, Box<AstAtom>),
    Divide(Box<AstAtom>, Box<AstAtom>),
    Concat(Box<AstAtom>, Box<AstAtom>),
}

// ============================================================================
// Conditions
// ============================================================================

/// The `where` clause of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstCondition {
    /// `int(x)`
    IntCheck(String),
    /// `char(x)`
    CharCheck(String),
    /// `string(x)`
    StringCheck(String),
    /// `atom(x)`
    AtomCheck(String),
    /// `edge(s, t)` or `edge(s, t, label)`
    EdgePred {
        source: String,
        target: String,
        label: Option<AstLabel>,
    },
    /// List equality `l1 = l2`
    Equal(Vec<AstAtom>, Vec<AstAtom>),
    /// List inequality `l1 != l2`
    NotEqual(Vec<AstAtom>, Vec<AstAtom>),
    /// Integer comparisons
    Greater(AstAtom, AstAtom),
    GreaterEqual(AstAtom, AstAtom),
    Less(AstAtom, AstAtom),
    LessEqual(AstAtom, AstAtom),
    Not(Box<AstCondition>),
    And(Box<AstCondition>, Box<AstCondition>),
    Or(Box<AstCondition>, Box<AstCondition>),
}
