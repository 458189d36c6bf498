//! Compiler Error Types

use std::io;
use thiserror::Error;

/// Errors raised while compiling a rule declaration.
///
/// These are the fatal, compile-time failures. Backtracking inside the
/// generated matching code is ordinary control flow and never surfaces
/// here.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Rule source text could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// An edge endpoint names a node that does not exist in its graph
    #[error("rule '{rule}': edge '{edge}' references unknown node '{node}'")]
    UnresolvedEndpoint {
        rule: String,
        edge: String,
        node: String,
    },

    /// An interface entry names a node missing from the LHS or RHS
    #[error("rule '{rule}': interface node '{node}' does not appear in the {side}")]
    UnresolvedInterface {
        rule: String,
        node: String,
        side: &'static str,
    },

    /// A label or condition references an undeclared variable
    #[error("rule '{rule}': undeclared variable '{name}'")]
    UndeclaredVariable { rule: String, name: String },

    /// A condition references a node missing from the LHS
    #[error("rule '{rule}': condition references unknown node '{node}'")]
    UnresolvedConditionNode { rule: String, node: String },

    /// A degree operator names a node missing from the LHS
    #[error("rule '{rule}': degree operator references unknown left-hand-side node '{node}'")]
    UnresolvedDegreeOperand { rule: String, node: String },

    /// A right-hand-side label carries the wildcard mark
    #[error("rule '{rule}': the 'any' mark cannot appear on a right-hand-side label")]
    ApplySideWildcardMark { rule: String },

    /// The same variable name is declared twice
    #[error("rule '{rule}': variable '{name}' declared more than once")]
    DuplicateVariable { rule: String, name: String },

    /// A comparison predicate was given a non-integer operand
    #[error("rule '{rule}': type mismatch in condition: {detail}")]
    ConditionTypeMismatch { rule: String, detail: String },

    /// A label contains more than one list variable
    #[error("rule '{rule}': label contains more than one list variable")]
    MultipleListVariables { rule: String },

    /// A left-hand-side label contains an expression that cannot be matched
    #[error("rule '{rule}': unmatchable left-hand-side expression: {detail}")]
    UnmatchableLhsExpression { rule: String, detail: String },

    /// A string concatenation mixes in a non-string operand
    #[error("rule '{rule}': string concatenation may only contain string expressions")]
    InvalidConcatenation { rule: String },

    /// The searchplan generator produced no operations for a non-empty LHS
    #[error("rule '{rule}': empty searchplan")]
    EmptySearchplan { rule: String },

    /// Output files could not be written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for compilation operations
pub type CompileResult<T> = Result<T, CompileError>;
