//! # Rule Labels
//!
//! The label data model shared by the AST, the rule IR and the code
//! generator: marks, typed atoms and atom lists.
//!
//! A label is an ordered list of atoms plus a mark. Two derived shapes
//! drive code generation:
//! - *blank*: zero atoms and no mark, matched and built via the runtime's
//!   `blank_label` constant;
//! - *integer-shaped*: exactly one integer-categorised atom, which lets
//!   comparison predicates compile to plain C integer expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GP 2 mark.
///
/// `Any` is a wildcard that may only appear on left-hand-side items; it
/// matches every host mark. The discriminant values are the ones the
/// generated C code compares against (the runtime's `MarkType` enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    None = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Grey = 4,
    Dashed = 5,
    Any = 6,
}

impl Mark {
    /// The integer value emitted into generated code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Parse a mark keyword as it appears in rule source text.
    pub fn from_keyword(word: &str) -> Option<Mark> {
        match word {
            "red" => Some(Mark::Red),
            "green" => Some(Mark::Green),
            "blue" => Some(Mark::Blue),
            "grey" => Some(Mark::Grey),
            "dashed" => Some(Mark::Dashed),
            "any" => Some(Mark::Any),
            _ => None,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mark::None => "none",
            Mark::Red => "red",
            Mark::Green => "green",
            Mark::Blue => "blue",
            Mark::Grey => "grey",
            Mark::Dashed => "dashed",
            Mark::Any => "any",
        };
        write!(f, "{name}")
    }
}

/// GP 2 variable types.
///
/// `Atom` admits an integer or a non-list string at match time. `List`
/// variables bind to a whole sublist of host atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    Integer,
    Character,
    String,
    Atom,
    List,
}

impl VarType {
    /// Parse a type keyword from a variable declaration list.
    pub fn from_keyword(word: &str) -> Option<VarType> {
        match word {
            "int" => Some(VarType::Integer),
            "char" => Some(VarType::Character),
            "string" => Some(VarType::String),
            "atom" => Some(VarType::Atom),
            "list" => Some(VarType::List),
            _ => None,
        }
    }
}

/// The inferred category of an atom expression.
///
/// `ListShaped` is reserved for bare list variables. Atom variables fall
/// into `String`: they are excluded from integer expressions, which is
/// all the category is consulted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomCategory {
    Integer,
    String,
    ListShaped,
}

/// An atom expression in a rule label or condition.
///
/// Variable references carry their declared type, resolved during the
/// AST-to-IR transformation. Degree operands carry the LHS node index
/// they were resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleAtom {
    Integer(i32),
    String(String),
    Variable { name: String, var_type: VarType },
    Indegree(usize),
    Outdegree(usize),
    /// Length of a list or string variable's assigned value
    Length { name: String, var_type: VarType },
    Neg(Box<RuleAtom>),
    Add(Box<RuleAtom>, Box<RuleAtom>),
    Subtract(Box<RuleAtom>, Box<RuleAtom>),
    Multiply(Box<RuleAtom>, Box<RuleAtom>),
    Divide(Box<RuleAtom>, Box<RuleAtom>),
    Concat(Box<RuleAtom>, Box<RuleAtom>),
}

impl RuleAtom {
    /// The category of this expression.
    pub fn category(&self) -> AtomCategory {
        match self {
            RuleAtom::Integer(_)
            | RuleAtom::Indegree(_)
            | RuleAtom::Outdegree(_)
            | RuleAtom::Length { .. }
            | RuleAtom::Neg(_)
            | RuleAtom::Add(..)
            | RuleAtom::Subtract(..)
            | RuleAtom::Multiply(..)
            | RuleAtom::Divide(..) => AtomCategory::Integer,
            RuleAtom::String(_) | RuleAtom::Concat(..) => AtomCategory::String,
            RuleAtom::Variable { var_type, .. } => match var_type {
                VarType::Integer => AtomCategory::Integer,
                VarType::List => AtomCategory::ListShaped,
                VarType::Character | VarType::String | VarType::Atom => AtomCategory::String,
            },
        }
    }

    /// True if this atom is a bare list-variable reference.
    pub fn is_list_variable(&self) -> bool {
        matches!(
            self,
            RuleAtom::Variable {
                var_type: VarType::List,
                ..
            }
        )
    }

    /// Collect the names of all variables referenced by this expression.
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            RuleAtom::Integer(_) | RuleAtom::String(_) => {}
            RuleAtom::Indegree(_) | RuleAtom::Outdegree(_) => {}
            RuleAtom::Variable { name, .. } | RuleAtom::Length { name, .. } => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            RuleAtom::Neg(inner) => inner.collect_variables(out),
            RuleAtom::Add(l, r)
            | RuleAtom::Subtract(l, r)
            | RuleAtom::Multiply(l, r)
            | RuleAtom::Divide(l, r)
            | RuleAtom::Concat(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
        }
    }

    /// Collect the LHS node indices referenced by degree operators.
    pub fn collect_degree_nodes(&self, out: &mut Vec<usize>) {
        match self {
            RuleAtom::Indegree(n) | RuleAtom::Outdegree(n) => {
                if !out.contains(n) {
                    out.push(*n);
                }
            }
            RuleAtom::Neg(inner) => inner.collect_degree_nodes(out),
            RuleAtom::Add(l, r)
            | RuleAtom::Subtract(l, r)
            | RuleAtom::Multiply(l, r)
            | RuleAtom::Divide(l, r)
            | RuleAtom::Concat(l, r) => {
                l.collect_degree_nodes(out);
                r.collect_degree_nodes(out);
            }
            _ => {}
        }
    }
}

/// An ordered list of atoms plus a mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleLabel {
    pub mark: Mark,
    pub atoms: Vec<RuleAtom>,
}

impl RuleLabel {
    /// The empty, unmarked label.
    pub fn blank() -> RuleLabel {
        RuleLabel {
            mark: Mark::None,
            atoms: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// True iff the label has no atoms and no mark.
    pub fn is_blank(&self) -> bool {
        self.atoms.is_empty() && self.mark == Mark::None
    }

    /// True iff the label is a single integer-categorised atom.
    ///
    /// Integer-shaped labels let equality and comparison predicates
    /// compile to direct integer expressions instead of structural
    /// host-list comparison.
    pub fn is_integer_shaped(&self) -> bool {
        self.atoms.len() == 1 && self.atoms[0].category() == AtomCategory::Integer
    }

    /// True iff the label contains a list-variable atom.
    pub fn has_list_variable(&self) -> bool {
        self.atoms.iter().any(RuleAtom::is_list_variable)
    }

    /// Position of the list variable within the atom list, if any.
    pub fn list_variable_position(&self) -> Option<usize> {
        self.atoms.iter().position(RuleAtom::is_list_variable)
    }

    /// Names of all variables referenced anywhere in the label.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        for atom in &self.atoms {
            atom.collect_variables(&mut names);
        }
        names
    }

    /// True iff the atom lists of the two labels coincide (marks ignored).
    pub fn same_list(&self, other: &RuleLabel) -> bool {
        self.atoms == other.atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_var(name: &str) -> RuleAtom {
        RuleAtom::Variable {
            name: name.to_string(),
            var_type: VarType::Integer,
        }
    }

    fn list_var(name: &str) -> RuleAtom {
        RuleAtom::Variable {
            name: name.to_string(),
            var_type: VarType::List,
        }
    }

    #[test]
    fn test_mark_codes_match_runtime_enum() {
        assert_eq!(Mark::None.code(), 0);
        assert_eq!(Mark::Red.code(), 1);
        assert_eq!(Mark::Green.code(), 2);
        assert_eq!(Mark::Blue.code(), 3);
        assert_eq!(Mark::Grey.code(), 4);
        assert_eq!(Mark::Dashed.code(), 5);
        assert_eq!(Mark::Any.code(), 6);
    }

    #[test]
    fn test_mark_keyword_round_trip() {
        for word in ["red", "green", "blue", "grey", "dashed", "any"] {
            let mark = Mark::from_keyword(word).unwrap();
            assert_eq!(mark.to_string(), word);
        }
        assert_eq!(Mark::from_keyword("cyan"), None);
    }

    #[test]
    fn test_integer_atom_categories() {
        assert_eq!(RuleAtom::Integer(3).category(), AtomCategory::Integer);
        assert_eq!(RuleAtom::Indegree(0).category(), AtomCategory::Integer);
        assert_eq!(
            RuleAtom::Neg(Box::new(int_var("x"))).category(),
            AtomCategory::Integer
        );
        assert_eq!(int_var("x").category(), AtomCategory::Integer);
    }

    #[test]
    fn test_string_and_list_categories() {
        assert_eq!(
            RuleAtom::String("a".into()).category(),
            AtomCategory::String
        );
        assert_eq!(list_var("l").category(), AtomCategory::ListShaped);
        let atom_var = RuleAtom::Variable {
            name: "a".into(),
            var_type: VarType::Atom,
        };
        assert_eq!(atom_var.category(), AtomCategory::String);
    }

    #[test]
    fn test_blank_label() {
        assert!(RuleLabel::blank().is_blank());
        let marked = RuleLabel {
            mark: Mark::Red,
            atoms: vec![],
        };
        assert!(!marked.is_blank());
    }

    #[test]
    fn test_integer_shaped() {
        let label = RuleLabel {
            mark: Mark::None,
            atoms: vec![RuleAtom::Integer(1)],
        };
        assert!(label.is_integer_shaped());

        let two_atoms = RuleLabel {
            mark: Mark::None,
            atoms: vec![RuleAtom::Integer(1), RuleAtom::Integer(2)],
        };
        assert!(!two_atoms.is_integer_shaped());

        let string_label = RuleLabel {
            mark: Mark::None,
            atoms: vec![RuleAtom::String("s".into())],
        };
        assert!(!string_label.is_integer_shaped());
    }

    #[test]
    fn test_list_variable_position() {
        let label = RuleLabel {
            mark: Mark::None,
            atoms: vec![RuleAtom::Integer(1), list_var("x"), RuleAtom::Integer(2)],
        };
        assert!(label.has_list_variable());
        assert_eq!(label.list_variable_position(), Some(1));
    }

    #[test]
    fn test_collect_variables_deduplicates() {
        let concat = RuleAtom::Concat(
            Box::new(RuleAtom::Variable {
                name: "s".into(),
                var_type: VarType::String,
            }),
            Box::new(RuleAtom::Variable {
                name: "s".into(),
                var_type: VarType::String,
            }),
        );
        let mut names = Vec::new();
        concat.collect_variables(&mut names);
        assert_eq!(names, vec!["s".to_string()]);
    }

    #[test]
    fn test_collect_degree_nodes() {
        let expr = RuleAtom::Add(
            Box::new(RuleAtom::Indegree(0)),
            Box::new(RuleAtom::Outdegree(2)),
        );
        let mut nodes = Vec::new();
        expr.collect_degree_nodes(&mut nodes);
        assert_eq!(nodes, vec![0, 2]);
    }

    #[test]
    fn test_same_list_ignores_mark() {
        let a = RuleLabel {
            mark: Mark::Red,
            atoms: vec![RuleAtom::Integer(1)],
        };
        let b = RuleLabel {
            mark: Mark::Blue,
            atoms: vec![RuleAtom::Integer(1)],
        };
        assert!(a.same_list(&b));
    }
}
