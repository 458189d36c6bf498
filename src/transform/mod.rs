//! # Rule Transformation
//!
//! AST -> IR conversion. Builds a [`Rule`] from a parsed rule
//! declaration: resolves variable types and edge endpoints, computes
//! node degrees, pairs preserved items through the interface, annotates
//! relabel/remark/re-root changes, and numbers condition predicates.
//!
//! ```text
//! AST (RuleDecl) -> [Transform] -> Rule IR -> Searchplan / Codegen
//! ```
//!
//! Predicate numbering is a pre-order traversal of the condition tree;
//! a predicate's `negated` flag is the parity of `not` nodes above it.
//! Every predicate is back-linked from the rule nodes and variables it
//! references, so matchers know which predicates to evaluate after each
//! bind.

use crate::ast::{AstAtom, AstCondition, AstGraph, AstLabel, RuleDecl};
use crate::error::{CompileError, CompileResult};
use crate::label::{AtomCategory, Mark, RuleAtom, RuleLabel, VarType};
use crate::rule::{
    Condition, Predicate, PredicateKind, Rule, RuleEdge, RuleGraph, RuleNode, Variable,
};
use std::collections::HashMap;
use tracing::debug;

/// Transform a parsed rule declaration into rule IR.
pub fn transform_rule(decl: &RuleDecl) -> CompileResult<Rule> {
    Transformer::new(decl).run()
}

struct Transformer<'a> {
    decl: &'a RuleDecl,
    variables: Vec<Variable>,
    var_types: HashMap<String, VarType>,
}

impl<'a> Transformer<'a> {
    fn new(decl: &'a RuleDecl) -> Transformer<'a> {
        Transformer {
            decl,
            variables: Vec::new(),
            var_types: HashMap::new(),
        }
    }

    fn rule_name(&self) -> String {
        self.decl.name.clone()
    }

    fn run(mut self) -> CompileResult<Rule> {
        self.build_variables()?;

        // The LHS node name table is needed first: degree operators in
        // RHS labels and conditions resolve against it.
        let lhs_names = graph_node_names(&self.decl.lhs);
        let rhs_names = graph_node_names(&self.decl.rhs);

        let mut lhs = if self.decl.lhs.is_empty() {
            None
        } else {
            Some(self.build_graph(&self.decl.lhs, &lhs_names, true)?)
        };
        // An empty RHS stays unrepresented: the rule deletes everything
        // it matches and gets the specialised remove-LHS application.
        let mut rhs = if self.decl.rhs.is_empty() {
            None
        } else {
            Some(self.build_graph(&self.decl.rhs, &lhs_names, false)?)
        };

        if let (Some(lhs), Some(rhs)) = (lhs.as_mut(), rhs.as_mut()) {
            self.pair_interface(lhs, rhs, &rhs_names)?;
            self.pair_edges(lhs, rhs);
        } else if !self.decl.interface.is_empty() {
            let side = if lhs.is_none() {
                "left-hand side"
            } else {
                "right-hand side"
            };
            return Err(CompileError::UnresolvedInterface {
                rule: self.rule_name(),
                node: self.decl.interface[0].clone(),
                side,
            });
        }

        let adds_nodes = rhs
            .as_ref()
            .is_some_and(|g| g.nodes.iter().any(|n| n.interface.is_none()));
        let adds_edges = rhs
            .as_ref()
            .is_some_and(|g| g.edges.iter().any(|e| e.interface.is_none()));

        self.mark_used_variables(rhs.as_ref());
        if let (Some(lhs), Some(rhs)) = (lhs.as_mut(), rhs.as_ref()) {
            mark_degree_arguments(lhs, rhs);
        }

        let (predicates, condition) = match &self.decl.condition {
            Some(ast) => {
                let mut builder = ConditionBuilder {
                    rule_name: self.decl.name.clone(),
                    transformer: &self,
                    lhs_names: &lhs_names,
                    predicates: Vec::new(),
                };
                let tree = builder.build(ast, false)?;
                (builder.predicates, Some(tree))
            }
            None => (Vec::new(), None),
        };

        let mut rule = Rule {
            name: self.decl.name.clone(),
            variables: self.variables,
            lhs,
            rhs,
            predicates,
            condition,
            adds_nodes,
            adds_edges,
        };
        link_predicates(&mut rule);

        debug!(
            rule = %rule.name,
            lhs_nodes = rule.lhs.as_ref().map_or(0, |g| g.nodes.len()),
            lhs_edges = rule.lhs.as_ref().map_or(0, |g| g.edges.len()),
            predicates = rule.predicates.len(),
            "transformed rule"
        );
        Ok(rule)
    }

    fn build_variables(&mut self) -> CompileResult<()> {
        for group in &self.decl.variables {
            for name in &group.names {
                if self.var_types.contains_key(name) {
                    return Err(CompileError::DuplicateVariable {
                        rule: self.rule_name(),
                        name: name.clone(),
                    });
                }
                self.var_types.insert(name.clone(), group.var_type);
                self.variables.push(Variable {
                    name: name.clone(),
                    var_type: group.var_type,
                    used_by_rule: false,
                    predicates: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn build_graph(
        &self,
        ast: &AstGraph,
        lhs_names: &HashMap<String, usize>,
        is_lhs: bool,
    ) -> CompileResult<RuleGraph> {
        let mut graph = RuleGraph::default();
        let mut names = HashMap::new();
        for (index, node) in ast.nodes.iter().enumerate() {
            names.insert(node.name.clone(), index);
            let label = self.transform_label(&node.label, lhs_names, is_lhs)?;
            if !is_lhs && label.mark == Mark::Any {
                return Err(CompileError::ApplySideWildcardMark {
                    rule: self.rule_name(),
                });
            }
            graph.nodes.push(RuleNode {
                index,
                name: node.name.clone(),
                root: node.root,
                label,
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
            });
        }
        for (index, edge) in ast.edges.iter().enumerate() {
            let resolve = |node: &String| {
                names
                    .get(node)
                    .copied()
                    .ok_or_else(|| CompileError::UnresolvedEndpoint {
                        rule: self.rule_name(),
                        edge: edge.name.clone(),
                        node: node.clone(),
                    })
            };
            let source = resolve(&edge.source)?;
            let target = resolve(&edge.target)?;
            let label = self.transform_label(&edge.label, lhs_names, is_lhs)?;
            if !is_lhs && label.mark == Mark::Any {
                return Err(CompileError::ApplySideWildcardMark {
                    rule: self.rule_name(),
                });
            }
            if edge.bidirectional {
                graph.nodes[source].bidegree += 1;
                graph.nodes[target].bidegree += 1;
            } else {
                graph.nodes[source].outdegree += 1;
                graph.nodes[target].indegree += 1;
            }
            graph.edges.push(RuleEdge {
                index,
                name: edge.name.clone(),
                bidirectional: edge.bidirectional,
                source,
                target,
                label,
                interface: None,
                relabelled: false,
                remarked: false,
            });
        }
        Ok(graph)
    }

    fn transform_label(
        &self,
        label: &AstLabel,
        lhs_names: &HashMap<String, usize>,
        is_lhs: bool,
    ) -> CompileResult<RuleLabel> {
        let mut atoms = Vec::with_capacity(label.atoms.len());
        for atom in &label.atoms {
            atoms.push(self.transform_atom(atom, lhs_names)?);
        }
        let result = RuleLabel {
            mark: label.mark,
            atoms,
        };
        let list_vars = result
            .atoms
            .iter()
            .filter(|a| a.is_list_variable())
            .count();
        if list_vars > 1 {
            return Err(CompileError::MultipleListVariables {
                rule: self.rule_name(),
            });
        }
        for atom in &result.atoms {
            self.validate_concat(atom)?;
        }
        if is_lhs {
            self.validate_lhs_label(&result)?;
        }
        Ok(result)
    }

    /// Concatenations must be built from string expressions only, on
    /// either side of the rule.
    fn validate_concat(&self, atom: &RuleAtom) -> CompileResult<()> {
        if let RuleAtom::Concat(..) = atom {
            let mut elements = Vec::new();
            flatten_concat(atom, &mut elements);
            for element in elements {
                match element {
                    RuleAtom::String(_) => {}
                    RuleAtom::Variable {
                        var_type: VarType::Character | VarType::String,
                        ..
                    } => {}
                    _ => {
                        return Err(CompileError::InvalidConcatenation {
                            rule: self.rule_name(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn transform_atom(
        &self,
        atom: &AstAtom,
        lhs_names: &HashMap<String, usize>,
    ) -> CompileResult<RuleAtom> {
        let lookup_var = |name: &String| {
            self.var_types
                .get(name)
                .copied()
                .ok_or_else(|| CompileError::UndeclaredVariable {
                    rule: self.rule_name(),
                    name: name.clone(),
                })
        };
        let lookup_node = |name: &String| {
            lhs_names
                .get(name)
                .copied()
                .ok_or_else(|| CompileError::UnresolvedDegreeOperand {
                    rule: self.rule_name(),
                    node: name.clone(),
                })
        };
        Ok(match atom {
            AstAtom::Integer(value) => RuleAtom::Integer(*value),
            AstAtom::String(text) => RuleAtom::String(text.clone()),
            AstAtom::Variable(name) => RuleAtom::Variable {
                name: name.clone(),
                var_type: lookup_var(name)?,
            },
            AstAtom::Indegree(node) => RuleAtom::Indegree(lookup_node(node)?),
            AstAtom::Outdegree(node) => RuleAtom::Outdegree(lookup_node(node)?),
            AstAtom::Length(name) => RuleAtom::Length {
                name: name.clone(),
                var_type: lookup_var(name)?,
            },
            AstAtom::Neg(inner) => match self.transform_atom(inner, lhs_names)? {
                // Fold negative constants so LHS literals stay matchable.
                RuleAtom::Integer(value) => RuleAtom::Integer(-value),
                other => RuleAtom::Neg(Box::new(other)),
            },
            AstAtom::Add(l, r) => RuleAtom::Add(
                Box::new(self.transform_atom(l, lhs_names)?),
                Box::new(self.transform_atom(r, lhs_names)?),
            ),
            AstAtom::Subtract(l, r) => RuleAtom::Subtract(
                Box::new(self.transform_atom(l, lhs_names)?),
                Box::new(self.transform_atom(r, lhs_names)?),
            ),
            AstAtom::Multiply(l, r) => RuleAtom::Multiply(
                Box::new(self.transform_atom(l, lhs_names)?),
                Box::new(self.transform_atom(r, lhs_names)?),
            ),
            AstAtom::Divide(l, r) => RuleAtom::Divide(
                Box::new(self.transform_atom(l, lhs_names)?),
                Box::new(self.transform_atom(r, lhs_names)?),
            ),
            AstAtom::Concat(l, r) => RuleAtom::Concat(
                Box::new(self.transform_atom(l, lhs_names)?),
                Box::new(self.transform_atom(r, lhs_names)?),
            ),
        })
    }

    /// LHS labels must be matchable: constants, variables, and string
    /// concatenations of constants, character variables and at most one
    /// string variable. Arithmetic and degree operators only make sense
    /// on the apply side.
    fn validate_lhs_label(&self, label: &RuleLabel) -> CompileResult<()> {
        let fail = |detail: &str| {
            Err(CompileError::UnmatchableLhsExpression {
                rule: self.rule_name(),
                detail: detail.to_string(),
            })
        };
        for atom in &label.atoms {
            match atom {
                RuleAtom::Integer(_) | RuleAtom::String(_) | RuleAtom::Variable { .. } => {}
                RuleAtom::Concat(..) => {
                    let mut elements = Vec::new();
                    flatten_concat(atom, &mut elements);
                    let mut string_vars = 0;
                    for element in elements {
                        match element {
                            RuleAtom::String(_) => {}
                            RuleAtom::Variable {
                                var_type: VarType::Character,
                                ..
                            } => {}
                            RuleAtom::Variable {
                                var_type: VarType::String,
                                ..
                            } => string_vars += 1,
                            _ => {
                                return fail(
                                    "string concatenation may only contain string constants, \
                                     character variables and string variables",
                                )
                            }
                        }
                    }
                    if string_vars > 1 {
                        return fail("at most one string variable per concatenation");
                    }
                }
                _ => return fail("arithmetic expressions cannot appear in a left-hand-side label"),
            }
        }
        Ok(())
    }

    fn pair_interface(
        &self,
        lhs: &mut RuleGraph,
        rhs: &mut RuleGraph,
        rhs_names: &HashMap<String, usize>,
    ) -> CompileResult<()> {
        let lhs_names: HashMap<String, usize> = lhs
            .nodes
            .iter()
            .map(|n| (n.name.clone(), n.index))
            .collect();
        for name in &self.decl.interface {
            let left =
                *lhs_names
                    .get(name)
                    .ok_or_else(|| CompileError::UnresolvedInterface {
                        rule: self.rule_name(),
                        node: name.clone(),
                        side: "left-hand side",
                    })?;
            let right =
                *rhs_names
                    .get(name)
                    .ok_or_else(|| CompileError::UnresolvedInterface {
                        rule: self.rule_name(),
                        node: name.clone(),
                        side: "right-hand side",
                    })?;
            lhs.nodes[left].interface = Some(right);
            rhs.nodes[right].interface = Some(left);

            let (lhs_node, rhs_node) = (&lhs.nodes[left], &mut rhs.nodes[right]);
            rhs_node.relabelled = !lhs_node.label.same_list(&rhs_node.label);
            rhs_node.remarked = !rhs_node.relabelled && lhs_node.label.mark != rhs_node.label.mark;
            rhs_node.root_changed = lhs_node.root != rhs_node.root;
        }
        Ok(())
    }

    /// An edge is preserved when the same edge identifier appears on
    /// both sides and its endpoints are interface-paired with each
    /// other. Anything else is a delete on the left or an add on the
    /// right.
    fn pair_edges(&self, lhs: &mut RuleGraph, rhs: &mut RuleGraph) {
        for left_index in 0..lhs.edges.len() {
            let (name, left_source, left_target) = {
                let edge = &lhs.edges[left_index];
                (edge.name.clone(), edge.source, edge.target)
            };
            let paired = rhs.edges.iter().position(|candidate| {
                candidate.name == name
                    && rhs.nodes[candidate.source].interface == Some(left_source)
                    && rhs.nodes[candidate.target].interface == Some(left_target)
            });
            if let Some(right_index) = paired {
                lhs.edges[left_index].interface = Some(right_index);
                rhs.edges[right_index].interface = Some(left_index);
                let (lhs_edge, rhs_edge) = (&lhs.edges[left_index], &mut rhs.edges[right_index]);
                rhs_edge.relabelled = !lhs_edge.label.same_list(&rhs_edge.label);
                rhs_edge.remarked =
                    !rhs_edge.relabelled && lhs_edge.label.mark != rhs_edge.label.mark;
            }
        }
    }

    fn mark_used_variables(&mut self, rhs: Option<&RuleGraph>) {
        let Some(rhs) = rhs else { return };
        let mut used: Vec<String> = Vec::new();
        for node in &rhs.nodes {
            for atom in &node.label.atoms {
                atom.collect_variables(&mut used);
            }
        }
        for edge in &rhs.edges {
            for atom in &edge.label.atoms {
                atom.collect_variables(&mut used);
            }
        }
        for variable in &mut self.variables {
            if used.iter().any(|name| name == &variable.name) {
                variable.used_by_rule = true;
            }
        }
    }
}

fn graph_node_names(graph: &AstGraph) -> HashMap<String, usize> {
    graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.name.clone(), index))
        .collect()
}

fn flatten_concat<'a>(atom: &'a RuleAtom, out: &mut Vec<&'a RuleAtom>) {
    match atom {
        RuleAtom::Concat(left, right) => {
            flatten_concat(left, out);
            flatten_concat(right, out);
        }
        other => out.push(other),
    }
}

/// Record which LHS nodes have their degrees read by RHS labels, so the
/// application code fetches them before any mutation.
fn mark_degree_arguments(lhs: &mut RuleGraph, rhs: &RuleGraph) {
    let mut scan = |label: &RuleLabel, lhs: &mut RuleGraph| {
        for atom in &label.atoms {
            scan_degrees(atom, lhs);
        }
    };
    for node in &rhs.nodes {
        scan(&node.label, lhs);
    }
    for edge in &rhs.edges {
        scan(&edge.label, lhs);
    }
}

fn scan_degrees(atom: &RuleAtom, lhs: &mut RuleGraph) {
    match atom {
        RuleAtom::Indegree(index) => lhs.nodes[*index].indegree_arg = true,
        RuleAtom::Outdegree(index) => lhs.nodes[*index].outdegree_arg = true,
        RuleAtom::Neg(inner) => scan_degrees(inner, lhs),
        RuleAtom::Add(l, r)
        | RuleAtom::Subtract(l, r)
        | RuleAtom::Multiply(l, r)
        | RuleAtom::Divide(l, r)
        | RuleAtom::Concat(l, r) => {
            scan_degrees(l, lhs);
            scan_degrees(r, lhs);
        }
        _ => {}
    }
}

// ============================================================================
// Condition building
// ============================================================================

struct ConditionBuilder<'a, 'b> {
    rule_name: String,
    transformer: &'a Transformer<'b>,
    lhs_names: &'a HashMap<String, usize>,
    predicates: Vec<Predicate>,
}

impl ConditionBuilder<'_, '_> {
    /// Pre-order walk assigning dense `bool_id`s; `negated` tracks the
    /// parity of `not` ancestors.
    fn build(&mut self, ast: &AstCondition, negated: bool) -> CompileResult<Condition> {
        match ast {
            AstCondition::Not(inner) => {
                let tree = self.build(inner, !negated)?;
                Ok(Condition::Not(Box::new(tree)))
            }
            AstCondition::And(left, right) => {
                let l = self.build(left, negated)?;
                let r = self.build(right, negated)?;
                Ok(Condition::And(Box::new(l), Box::new(r)))
            }
            AstCondition::Or(left, right) => {
                let l = self.build(left, negated)?;
                let r = self.build(right, negated)?;
                Ok(Condition::Or(Box::new(l), Box::new(r)))
            }
            leaf => {
                let kind = self.build_predicate(leaf)?;
                let bool_id = self.predicates.len();
                self.predicates.push(Predicate {
                    bool_id,
                    negated,
                    kind,
                });
                Ok(Condition::Predicate(bool_id))
            }
        }
    }

    fn build_predicate(&self, ast: &AstCondition) -> CompileResult<PredicateKind> {
        let check_var = |name: &String| -> CompileResult<String> {
            if self.transformer.var_types.contains_key(name) {
                Ok(name.clone())
            } else {
                Err(CompileError::UndeclaredVariable {
                    rule: self.rule_name.clone(),
                    name: name.clone(),
                })
            }
        };
        let lookup_node = |name: &String| -> CompileResult<usize> {
            self.lhs_names.get(name).copied().ok_or_else(|| {
                CompileError::UnresolvedConditionNode {
                    rule: self.rule_name.clone(),
                    node: name.clone(),
                }
            })
        };
        let list_label = |atoms: &[AstAtom]| -> CompileResult<RuleLabel> {
            let mut transformed = Vec::with_capacity(atoms.len());
            for atom in atoms {
                transformed.push(self.transformer.transform_atom(atom, self.lhs_names)?);
            }
            Ok(RuleLabel {
                mark: Mark::None,
                atoms: transformed,
            })
        };
        let int_atom = |atom: &AstAtom, op: &str| -> CompileResult<RuleAtom> {
            let transformed = self.transformer.transform_atom(atom, self.lhs_names)?;
            if transformed.category() != AtomCategory::Integer {
                return Err(CompileError::ConditionTypeMismatch {
                    rule: self.rule_name.clone(),
                    detail: format!("operand of '{op}' is not an integer expression"),
                });
            }
            Ok(transformed)
        };

        Ok(match ast {
            AstCondition::IntCheck(var) => PredicateKind::IntCheck {
                var: check_var(var)?,
            },
            AstCondition::CharCheck(var) => PredicateKind::CharCheck {
                var: check_var(var)?,
            },
            AstCondition::StringCheck(var) => PredicateKind::StringCheck {
                var: check_var(var)?,
            },
            AstCondition::AtomCheck(var) => PredicateKind::AtomCheck {
                var: check_var(var)?,
            },
            AstCondition::EdgePred {
                source,
                target,
                label,
            } => PredicateKind::Edge {
                source: lookup_node(source)?,
                target: lookup_node(target)?,
                label: match label {
                    Some(ast_label) => Some(self.transformer.transform_label(
                        ast_label,
                        self.lhs_names,
                        false,
                    )?),
                    None => None,
                },
            },
            AstCondition::Equal(left, right) => PredicateKind::Equal {
                left: list_label(left)?,
                right: list_label(right)?,
            },
            AstCondition::NotEqual(left, right) => PredicateKind::NotEqual {
                left: list_label(left)?,
                right: list_label(right)?,
            },
            AstCondition::Greater(left, right) => PredicateKind::Greater {
                left: int_atom(left, ">")?,
                right: int_atom(right, ">")?,
            },
            AstCondition::GreaterEqual(left, right) => PredicateKind::GreaterEqual {
                left: int_atom(left, ">=")?,
                right: int_atom(right, ">=")?,
            },
            AstCondition::Less(left, right) => PredicateKind::Less {
                left: int_atom(left, "<")?,
                right: int_atom(right, "<")?,
            },
            AstCondition::LessEqual(left, right) => PredicateKind::LessEqual {
                left: int_atom(left, "<=")?,
                right: int_atom(right, "<=")?,
            },
            AstCondition::Not(_) | AstCondition::And(..) | AstCondition::Or(..) => {
                unreachable!("interior condition nodes are handled by build()")
            }
        })
    }
}

/// Back-link every predicate from the rule nodes and variables it
/// references.
fn link_predicates(rule: &mut Rule) {
    for predicate in &rule.predicates {
        let mut vars: Vec<String> = Vec::new();
        let mut nodes: Vec<usize> = Vec::new();
        match &predicate.kind {
            PredicateKind::IntCheck { var }
            | PredicateKind::CharCheck { var }
            | PredicateKind::StringCheck { var }
            | PredicateKind::AtomCheck { var } => vars.push(var.clone()),
            PredicateKind::Edge {
                source,
                target,
                label,
            } => {
                nodes.push(*source);
                if !nodes.contains(target) {
                    nodes.push(*target);
                }
                if let Some(label) = label {
                    for atom in &label.atoms {
                        atom.collect_variables(&mut vars);
                        atom.collect_degree_nodes(&mut nodes);
                    }
                }
            }
            PredicateKind::Equal { left, right } | PredicateKind::NotEqual { left, right } => {
                for atom in left.atoms.iter().chain(right.atoms.iter()) {
                    atom.collect_variables(&mut vars);
                    atom.collect_degree_nodes(&mut nodes);
                }
            }
            PredicateKind::Greater { left, right }
            | PredicateKind::GreaterEqual { left, right }
            | PredicateKind::Less { left, right }
            | PredicateKind::LessEqual { left, right } => {
                for atom in [left, right] {
                    atom.collect_variables(&mut vars);
                    atom.collect_degree_nodes(&mut nodes);
                }
            }
        }
        for name in vars {
            if let Some(variable) = rule.variables.iter_mut().find(|v| v.name == name) {
                if !variable.predicates.contains(&predicate.bool_id) {
                    variable.predicates.push(predicate.bool_id);
                }
            }
        }
        if let Some(lhs) = rule.lhs.as_mut() {
            for index in nodes {
                let node = &mut lhs.nodes[index];
                if !node.predicates.contains(&predicate.bool_id) {
                    node.predicates.push(predicate.bool_id);
                }
            }
        }
    }
}
