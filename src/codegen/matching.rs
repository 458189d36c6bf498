//! # Matching Code Generation
//!
//! Walks the searchplan and emits one matcher procedure per operation
//! plus the entry procedure `match<RuleName>`. Each matcher iterates
//! its candidate host items, applies the cheap filters first (already
//! matched, mark, node degrees) and label unification last, then chains
//! to the next operation's matcher. Failure anywhere is a backtracking
//! signal: maps, matched flags, predicate booleans and variable
//! assignments are unwound and the next candidate is tried.

use super::label::{generate_fixed_list_matching, generate_variable_list_matching};
use super::{CodeBuf, RuleModule, INDENT};
use crate::label::Mark;
use crate::rule::{Rule, RuleEdge, RuleNode};
use crate::searchplan::{OpKind, SearchOp, Searchplan};

/// Generate the entry procedure and all per-operation matchers.
pub fn generate_matching_code(
    rule: &Rule,
    plan: &Searchplan,
    predicate: bool,
    module: &mut RuleModule,
) {
    let lhs = rule.lhs.as_ref().expect("matching needs an LHS");

    module
        .header_decls
        .push(format!("bool match{}(Morphism *morphism);\n", rule.name));

    // Entry procedure: fail fast if the host is smaller than the LHS,
    // otherwise run the first matcher. Failed matches (and successful
    // predicate queries, which are never applied) reset the morphism.
    let first = &plan.ops[0];
    let mut body = CodeBuf::new();
    body.line(
        INDENT,
        &format!(
            "if({} > host->number_of_nodes || {} > host->number_of_edges) return false;",
            lhs.nodes.len(),
            lhs.edges.len()
        ),
    );
    let first_call = matcher_call(first);
    if predicate {
        body.line(INDENT, &format!("bool match = {first_call};"));
        body.line(INDENT, "initialiseMorphism(morphism, host);");
        body.line(INDENT, "return match;");
    } else {
        body.line(INDENT, &format!("if({first_call}) return true;"));
        body.line(INDENT, "else");
        body.line(INDENT, "{");
        body.line(2 * INDENT, "initialiseMorphism(morphism, host);");
        body.line(2 * INDENT, "return false;");
        body.line(INDENT, "}");
    }
    module.add_procedure(
        format!("match{}", rule.name),
        false,
        "bool",
        "Morphism *morphism",
        body,
    );

    for (position, op) in plan.ops.iter().enumerate() {
        let next = plan.ops.get(position + 1);
        match op.kind {
            OpKind::RootNode => {
                emit_root_node_matcher(rule, lhs.node(op.index), next, module);
            }
            OpKind::Node => {
                emit_node_matcher(rule, lhs.node(op.index), next, module);
            }
            OpKind::NodeFromIn | OpKind::NodeFromOut | OpKind::NodeFromBi => {
                emit_node_from_edge_matcher(rule, lhs.node(op.index), op.kind, next, module);
            }
            OpKind::Edge => {
                emit_edge_matcher(rule, lhs.edge(op.index), next, module);
            }
            OpKind::Loop => {
                emit_loop_edge_matcher(rule, lhs.edge(op.index), next, module);
            }
            OpKind::FromSource => {
                let edge = lhs.edge(op.index);
                let mut body = CodeBuf::new();
                if edge.bidirectional {
                    emit_edge_from_node_half(rule, edge, true, true, false, next, &mut body);
                    emit_edge_from_node_half(rule, edge, false, false, true, next, &mut body);
                } else {
                    emit_edge_from_node_half(rule, edge, true, true, true, next, &mut body);
                }
                module.add_procedure(
                    format!("match_e{}", edge.index),
                    true,
                    "bool",
                    "Morphism *morphism",
                    body,
                );
            }
            OpKind::FromTarget => {
                let edge = lhs.edge(op.index);
                let mut body = CodeBuf::new();
                if edge.bidirectional {
                    emit_edge_from_node_half(rule, edge, false, true, false, next, &mut body);
                    emit_edge_from_node_half(rule, edge, true, false, true, next, &mut body);
                } else {
                    emit_edge_from_node_half(rule, edge, false, true, true, next, &mut body);
                }
                module.add_procedure(
                    format!("match_e{}", edge.index),
                    true,
                    "bool",
                    "Morphism *morphism",
                    body,
                );
            }
        }
    }
}

/// The C call expression for an operation's matcher.
fn matcher_call(op: &SearchOp) -> String {
    match op.kind {
        OpKind::RootNode | OpKind::Node => format!("match_n{}(morphism)", op.index),
        OpKind::NodeFromIn | OpKind::NodeFromOut | OpKind::NodeFromBi => {
            format!("match_n{}(morphism, host_edge)", op.index)
        }
        OpKind::Edge | OpKind::Loop | OpKind::FromSource | OpKind::FromTarget => {
            format!("match_e{}(morphism)", op.index)
        }
    }
}

fn matcher_params(kind: OpKind) -> &'static str {
    match kind {
        OpKind::NodeFromIn | OpKind::NodeFromOut | OpKind::NodeFromBi => {
            "Morphism *morphism, Edge *host_edge"
        }
        _ => "Morphism *morphism",
    }
}


/// The predicates to evaluate once this item is bound: those that
/// reference the node directly plus those that reference a variable
/// bound by the item's label. Evaluators guard on their own
/// dependencies, so firing one early is harmless.
fn triggered_predicates(rule: &Rule, direct: &[usize], label: &crate::label::RuleLabel) -> Vec<usize> {
    let mut ids: Vec<usize> = direct.to_vec();
    for name in label.variables() {
        if let Some(variable) = rule.variable(&name) {
            for id in &variable.predicates {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
    }
    ids
}

/// The host node does not match the rule node if its indegree or
/// outdegree is too small, or if the total number of incident edges is
/// incompatible. For preserved nodes the host may have spare edges; for
/// deleted nodes the dangling condition demands an exact count, since
/// any extra incident edge would dangle after deletion.
fn emit_degree_check(node: &RuleNode, fail: &str, indent: usize, buf: &mut CodeBuf) {
    let comparison = if node.interface.is_none() { "!=" } else { "<" };
    buf.line(
        indent,
        &format!(
            "if(host_node->indegree < {} || host_node->outdegree < {} ||",
            node.indegree, node.outdegree
        ),
    );
    buf.line(
        indent,
        &format!(
            "   ((host_node->outdegree + host_node->indegree - {} - {} - {}) {} 0)) {}",
            node.outdegree, node.indegree, node.bidegree, comparison, fail
        ),
    );
}

fn emit_label_matching(node_label: &crate::label::RuleLabel, indent: usize, buf: &mut CodeBuf) {
    if node_label.has_list_variable() {
        generate_variable_list_matching(node_label, indent, buf);
    } else {
        generate_fixed_list_matching(node_label, indent, buf);
    }
}

/// Root nodes are matched against the host's root-node list.
fn emit_root_node_matcher(
    rule: &Rule,
    node: &RuleNode,
    next: Option<&SearchOp>,
    module: &mut RuleModule,
) {
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    buf.line(i1, "RootNodes *nodes;");
    buf.line(
        i1,
        "for(nodes = getRootNodeList(host); nodes != NULL; nodes = nodes->next)",
    );
    buf.line(i1, "{");
    buf.line(i2, "Node *host_node = getNode(host, nodes->index);");
    buf.line(i2, "if(host_node == NULL) continue;");
    buf.line(i2, "if(host_node->matched) continue;");
    if node.label.mark != Mark::Any {
        buf.line(
            i2,
            &format!(
                "if(host_node->label.mark != {}) continue;",
                node.label.mark.code()
            ),
        );
    }
    emit_degree_check(node, "continue;", i2, &mut buf);
    buf.blank();
    buf.line(i2, "HostLabel label = host_node->label;");
    buf.line(i2, "bool match = false;");
    emit_label_matching(&node.label, i2, &mut buf);
    emit_node_match_result(rule, node, next, i2, &mut buf);
    buf.line(i1, "}");
    buf.line(i1, "return false;");
    module.add_procedure(
        format!("match_n{}", node.index),
        true,
        "bool",
        matcher_params(OpKind::Node),
        buf,
    );
}

/// A free node is matched against the whole host node array.
fn emit_node_matcher(
    rule: &Rule,
    node: &RuleNode,
    next: Option<&SearchOp>,
    module: &mut RuleModule,
) {
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    buf.line(i1, "int host_index;");
    buf.line(
        i1,
        "for(host_index = 0; host_index < host->nodes.size; host_index++)",
    );
    buf.line(i1, "{");
    buf.line(i2, "Node *host_node = getNode(host, host_index);");
    buf.line(i2, "if(host_node == NULL || host_node->index == -1) continue;");
    buf.line(i2, "if(host_node->matched) continue;");
    if node.label.mark != Mark::Any {
        buf.line(
            i2,
            &format!(
                "if(host_node->label.mark != {}) continue;",
                node.label.mark.code()
            ),
        );
    }
    emit_degree_check(node, "continue;", i2, &mut buf);
    buf.blank();
    buf.line(i2, "HostLabel label = host_node->label;");
    buf.line(i2, "bool match = false;");
    emit_label_matching(&node.label, i2, &mut buf);
    emit_node_match_result(rule, node, next, i2, &mut buf);
    buf.line(i1, "}");
    buf.line(i1, "return false;");
    module.add_procedure(
        format!("match_n{}", node.index),
        true,
        "bool",
        matcher_params(OpKind::Node),
        buf,
    );
}

/// A node matched from the just-bound host edge: the candidate is the
/// edge's source or target (both, for a bidirectional rule edge).
fn emit_node_from_edge_matcher(
    rule: &Rule,
    node: &RuleNode,
    kind: OpKind,
    next: Option<&SearchOp>,
    module: &mut RuleModule,
) {
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    if kind == OpKind::NodeFromIn || kind == OpKind::NodeFromBi {
        buf.line(i1, "Node *host_node = getTarget(host, host_edge);");
    } else {
        buf.line(i1, "Node *host_node = getSource(host, host_edge);");
    }
    buf.blank();
    let bidirectional = kind == OpKind::NodeFromBi;
    let fail = if bidirectional {
        "candidate_node = false;"
    } else {
        "return false;"
    };
    if bidirectional {
        buf.line(i1, "bool candidate_node = true;");
    }
    buf.line(i1, &format!("if(host_node->matched) {fail}"));
    if node.root {
        buf.line(i1, &format!("if(!(host_node->root)) {fail}"));
    }
    if node.label.mark != Mark::Any {
        buf.line(
            i1,
            &format!(
                "if(host_node->label.mark != {}) {fail}",
                node.label.mark.code()
            ),
        );
    }
    emit_degree_check(node, fail, i1, &mut buf);
    buf.blank();

    if bidirectional {
        // The other endpoint of the host edge is the second candidate.
        buf.line(i1, "if(!candidate_node)");
        buf.line(i1, "{");
        buf.line(
            i2,
            "/* Matching from bidirectional edge: check the second incident node. */",
        );
        buf.line(i2, "host_node = getSource(host, host_edge);");
        buf.line(i2, "if(host_node->matched) return false;");
        if node.root {
            buf.line(i2, "if(!(host_node->root)) return false;");
        }
        if node.label.mark != Mark::Any {
            buf.line(
                i2,
                &format!(
                    "if(host_node->label.mark != {}) return false;",
                    node.label.mark.code()
                ),
            );
        }
        emit_degree_check(node, "return false;", i2, &mut buf);
        buf.line(i1, "}");
        buf.blank();
    }

    buf.line(i1, "HostLabel label = host_node->label;");
    buf.line(i1, "bool match = false;");
    emit_label_matching(&node.label, i1, &mut buf);
    emit_node_match_result(rule, node, next, i1, &mut buf);
    buf.line(i1, "return false;");
    module.add_procedure(
        format!("match_n{}", node.index),
        true,
        "bool",
        matcher_params(kind),
        buf,
    );
}

/// Result handling after node label matching: record the map entry,
/// evaluate the node's predicates, test the condition, and either chain
/// to the next matcher or unwind.
fn emit_node_match_result(
    rule: &Rule,
    node: &RuleNode,
    next: Option<&SearchOp>,
    indent: usize,
    buf: &mut CodeBuf,
) {
    let i1 = indent + INDENT;
    let i2 = indent + 2 * INDENT;
    let triggered = triggered_predicates(rule, &node.predicates, &node.label);
    buf.line(indent, "if(match)");
    buf.line(indent, "{");
    buf.line(
        i1,
        &format!(
            "addNodeMap(morphism, {}, host_node->index, new_assignments);",
            node.index
        ),
    );
    buf.line(i1, "host_node->matched = true;");
    if !triggered.is_empty() {
        buf.line(
            i1,
            "/* Update global booleans representing the node's predicates. */",
        );
        for bool_id in &triggered {
            buf.line(i1, &format!("evaluatePredicate{bool_id}(morphism);"));
        }
        match next {
            None => {
                buf.line(i1, "if(evaluateCondition())");
                buf.line(i1, "{");
                buf.line(i2, "/* All items matched! */");
                buf.line(i2, "return true;");
                buf.line(i1, "}");
            }
            Some(op) => {
                buf.line(i1, "bool next_match_result = false;");
                buf.line(
                    i1,
                    &format!("if(evaluateCondition()) next_match_result = {};", matcher_call(op)),
                );
                buf.line(i1, "if(next_match_result) return true;");
            }
        }
        buf.line(i1, "else");
        buf.line(i1, "{");
        buf.line(
            i2,
            "/* Reset the boolean variables in the predicates of this node. */",
        );
        for bool_id in &triggered {
            let predicate = &rule.predicates[*bool_id];
            let neutral = if predicate.negated { "false" } else { "true" };
            buf.line(i2, &format!("b{bool_id} = {neutral};"));
        }
        buf.line(i2, &format!("removeNodeMap(morphism, {});", node.index));
        buf.line(i2, "host_node->matched = false;");
        buf.line(i1, "}");
    } else {
        match next {
            None => {
                buf.line(i1, "/* All items matched! */");
                buf.line(i1, "return true;");
            }
            Some(op) => {
                buf.line(i1, &format!("if({}) return true;", matcher_call(op)));
                buf.line(i1, "else");
                buf.line(i1, "{");
                buf.line(i2, &format!("removeNodeMap(morphism, {});", node.index));
                buf.line(i2, "host_node->matched = false;");
                buf.line(i1, "}");
            }
        }
    }
    buf.line(indent, "}");
    buf.line(indent, "else removeAssignments(morphism, new_assignments);");
}

/// A free edge is matched against the whole host edge array.
fn emit_edge_matcher(
    rule: &Rule,
    edge: &RuleEdge,
    next: Option<&SearchOp>,
    module: &mut RuleModule,
) {
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    buf.line(i1, "int host_index;");
    buf.line(
        i1,
        "for(host_index = 0; host_index < host->edges.size; host_index++)",
    );
    buf.line(i1, "{");
    buf.line(i2, "Edge *host_edge = getEdge(host, host_index);");
    buf.line(i2, "if(host_edge == NULL || host_edge->index == -1) continue;");
    buf.line(i2, "if(host_edge->matched) continue;");
    if edge.label.mark != Mark::Any {
        buf.line(
            i2,
            &format!(
                "if(host_edge->label.mark != {}) continue;",
                edge.label.mark.code()
            ),
        );
        buf.blank();
    }
    buf.line(i2, "HostLabel label = host_edge->label;");
    buf.line(i2, "bool match = false;");
    emit_label_matching(&edge.label, i2, &mut buf);
    emit_edge_match_result(rule, edge, next, i2, &mut buf);
    buf.line(i1, "}");
    buf.line(i1, "return false;");
    module.add_procedure(
        format!("match_e{}", edge.index),
        true,
        "bool",
        "Morphism *morphism",
        buf,
    );
}

/// A loop is matched from its already-bound incident node.
fn emit_loop_edge_matcher(
    rule: &Rule,
    edge: &RuleEdge,
    next: Option<&SearchOp>,
    module: &mut RuleModule,
) {
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    buf.line(i1, "/* Matching a loop. */");
    buf.line(
        i1,
        &format!("int node_index = lookupNode(morphism, {});", edge.source),
    );
    buf.line(i1, "if(node_index < 0) return false;");
    buf.line(i1, "Node *host_node = getNode(host, node_index);");
    buf.blank();
    buf.line(i1, "int counter;");
    buf.line(
        i1,
        "for(counter = 0; counter < host_node->out_edges.size + 2; counter++)",
    );
    buf.line(i1, "{");
    buf.line(i2, "Edge *host_edge = getNthOutEdge(host, host_node, counter);");
    buf.line(i2, "if(host_edge == NULL) continue;");
    buf.line(i2, "if(host_edge->matched) continue;");
    buf.line(i2, "if(host_edge->source != host_edge->target) continue;");
    if edge.label.mark != Mark::Any {
        buf.line(
            i2,
            &format!(
                "if(host_edge->label.mark != {}) continue;",
                edge.label.mark.code()
            ),
        );
        buf.blank();
    }
    buf.line(i2, "HostLabel label = host_edge->label;");
    buf.line(i2, "bool match = false;");
    emit_label_matching(&edge.label, i2, &mut buf);
    emit_edge_match_result(rule, edge, next, i2, &mut buf);
    buf.line(i1, "}");
    buf.line(i1, "return false;");
    module.add_procedure(
        format!("match_e{}", edge.index),
        true,
        "bool",
        "Morphism *morphism",
        buf,
    );
}

/// One half of an edge-from-node matcher. Candidate edges come from the
/// bound endpoint's incidence list; the opposite endpoint must either
/// agree with the morphism or be unmatched. Bidirectional rule edges
/// emit this twice into one procedure, once per direction.
#[allow(clippy::fn_params_excessive_bools)]
fn emit_edge_from_node_half(
    rule: &Rule,
    edge: &RuleEdge,
    source: bool,
    initialise: bool,
    exit: bool,
    next: Option<&SearchOp>,
    buf: &mut CodeBuf,
) {
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    let i3 = 3 * INDENT;
    let start_index = if source { edge.source } else { edge.target };
    let end_index = if source { edge.target } else { edge.source };
    let end_node_type = if source { "target" } else { "source" };

    if initialise {
        buf.line(
            i1,
            "/* Start node is the already-matched node from which the candidate",
        );
        buf.line(
            i1,
            "   edges are drawn. End node may or may not have been matched already. */",
        );
        buf.line(
            i1,
            &format!("int start_index = lookupNode(morphism, {start_index});"),
        );
        buf.line(
            i1,
            &format!("int end_index = lookupNode(morphism, {end_index});"),
        );
        buf.line(i1, "if(start_index < 0) return false;");
        buf.line(i1, "Node *host_node = getNode(host, start_index);");
        buf.blank();
        buf.line(i1, "int counter;");
    }
    if source {
        buf.line(
            i1,
            "for(counter = 0; counter < host_node->out_edges.size + 2; counter++)",
        );
        buf.line(i1, "{");
        buf.line(i2, "Edge *host_edge = getNthOutEdge(host, host_node, counter);");
    } else {
        buf.line(
            i1,
            "for(counter = 0; counter < host_node->in_edges.size + 2; counter++)",
        );
        buf.line(i1, "{");
        buf.line(i2, "Edge *host_edge = getNthInEdge(host, host_node, counter);");
    }
    buf.line(i2, "if(host_edge == NULL) continue;");
    buf.line(i2, "if(host_edge->matched) continue;");
    buf.line(i2, "if(host_edge->source == host_edge->target) continue;");
    if edge.label.mark != Mark::Any {
        buf.line(
            i2,
            &format!(
                "if(host_edge->label.mark != {}) continue;",
                edge.label.mark.code()
            ),
        );
    }
    buf.blank();
    buf.line(
        i2,
        &format!("/* If the end node has been matched, check that the {end_node_type} of the"),
    );
    buf.line(i2, " * host edge is the image of the end node. */");
    buf.line(i2, "if(end_index >= 0)");
    buf.line(i2, "{");
    buf.line(
        i3,
        &format!("if(host_edge->{end_node_type} != end_index) continue;"),
    );
    buf.line(i2, "}");
    buf.line(
        i2,
        &format!("/* Otherwise, the {end_node_type} of the host edge should be unmatched. */"),
    );
    buf.line(i2, "else");
    buf.line(i2, "{");
    buf.line(
        i3,
        &format!("Node *end_node = getNode(host, host_edge->{end_node_type});"),
    );
    buf.line(i3, "if(end_node->matched) continue;");
    buf.line(i2, "}");
    buf.blank();
    buf.line(i2, "HostLabel label = host_edge->label;");
    buf.line(i2, "bool match = false;");
    emit_label_matching(&edge.label, i2, buf);
    emit_edge_match_result(rule, edge, next, i2, buf);
    buf.line(i1, "}");
    if exit {
        buf.line(i1, "return false;");
    }
}

/// Result handling after edge label matching. Mirrors the node result
/// code: predicates whose variables this edge's label binds are
/// evaluated before the condition is tested.
fn emit_edge_match_result(
    rule: &Rule,
    edge: &RuleEdge,
    next: Option<&SearchOp>,
    indent: usize,
    buf: &mut CodeBuf,
) {
    let i1 = indent + INDENT;
    let i2 = indent + 2 * INDENT;
    let index = edge.index;
    let triggered = triggered_predicates(rule, &[], &edge.label);
    buf.line(indent, "if(match)");
    buf.line(indent, "{");
    buf.line(
        i1,
        &format!("addEdgeMap(morphism, {index}, host_edge->index, new_assignments);"),
    );
    buf.line(i1, "host_edge->matched = true;");
    if !triggered.is_empty() {
        buf.line(
            i1,
            "/* Update global booleans representing the edge's predicates. */",
        );
        for bool_id in &triggered {
            buf.line(i1, &format!("evaluatePredicate{bool_id}(morphism);"));
        }
        match next {
            None => {
                buf.line(i1, "if(evaluateCondition())");
                buf.line(i1, "{");
                buf.line(i2, "/* All items matched! */");
                buf.line(i2, "return true;");
                buf.line(i1, "}");
            }
            Some(op) => {
                buf.line(i1, "bool next_match_result = false;");
                buf.line(
                    i1,
                    &format!(
                        "if(evaluateCondition()) next_match_result = {};",
                        matcher_call(op)
                    ),
                );
                buf.line(i1, "if(next_match_result) return true;");
            }
        }
        buf.line(i1, "else");
        buf.line(i1, "{");
        buf.line(
            i2,
            "/* Reset the boolean variables in the predicates of this edge. */",
        );
        for bool_id in &triggered {
            let predicate = &rule.predicates[*bool_id];
            let neutral = if predicate.negated { "false" } else { "true" };
            buf.line(i2, &format!("b{bool_id} = {neutral};"));
        }
        buf.line(i2, &format!("removeEdgeMap(morphism, {index});"));
        buf.line(i2, "host_edge->matched = false;");
        buf.line(i1, "}");
    } else {
        match next {
            None => {
                buf.line(i1, "/* All items matched! */");
                buf.line(i1, "return true;");
            }
            Some(op) => {
                buf.line(i1, &format!("if({}) return true;", matcher_call(op)));
                buf.line(i1, "else");
                buf.line(i1, "{");
                buf.line(i2, &format!("removeEdgeMap(morphism, {index});"));
                buf.line(i2, "host_edge->matched = false;");
                buf.line(i1, "}");
            }
        }
    }
    buf.line(indent, "}");
    buf.line(indent, "else removeAssignments(morphism, new_assignments);");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rule;
    use crate::searchplan;
    use crate::transform::transform_rule;

    fn module_for(source: &str) -> RuleModule {
        let rule = transform_rule(&parse_rule(source).unwrap()).unwrap();
        let plan = searchplan::generate(rule.lhs.as_ref().unwrap());
        let mut module = RuleModule::new(&rule.name);
        generate_matching_code(&rule, &plan, rule.is_predicate(), &mut module);
        module
    }

    #[test]
    fn test_entry_procedure_counts_guard() {
        let module = module_for(
            "r [ (a, empty) (b, empty) | (e1, a, b, empty) ] => [ | ]",
        );
        let entry = module.procedure("matchr").unwrap();
        assert!(entry
            .body
            .as_str()
            .contains("if(2 > host->number_of_nodes || 1 > host->number_of_edges) return false;"));
        assert!(entry.body.as_str().contains("initialiseMorphism(morphism, host);"));
    }

    #[test]
    fn test_predicate_entry_always_resets() {
        let module =
            module_for("p [ (a, empty # red) | ] => [ (a, empty # red) | ] interface = {a}");
        let entry = module.procedure("matchp").unwrap();
        let body = entry.body.as_str();
        let call = body.find("bool match = match_n0(morphism);").unwrap();
        let reset = body.find("initialiseMorphism(morphism, host);").unwrap();
        let ret = body.find("return match;").unwrap();
        assert!(call < reset && reset < ret);
    }

    #[test]
    fn test_dangling_degree_check_is_exact() {
        // Node a is deleted: its degree check must demand equality.
        let module = module_for(
            "r [ (a, empty) (b, empty) | (e1, a, b, empty) ] => [ (b, empty) | ] \
             interface = {b}",
        );
        let matcher = module.procedure("match_n0").unwrap();
        assert!(matcher.body.as_str().contains("- 1 - 0 - 0) != 0)) continue;"));
        let preserved = module.procedure("match_n1").unwrap();
        assert!(preserved.body.as_str().contains("< 0))"));
    }

    #[test]
    fn test_any_mark_omits_mark_filter() {
        let module = module_for("r [ (a, empty # any) | ] => [ | ]");
        let matcher = module.procedure("match_n0").unwrap();
        assert!(!matcher.body.as_str().contains("label.mark !="));
    }

    #[test]
    fn test_root_matcher_iterates_root_list() {
        let module = module_for("r [ (a (R), empty) | ] => [ | ]");
        let matcher = module.procedure("match_n0").unwrap();
        assert!(matcher.body.as_str().contains("getRootNodeList(host)"));
    }

    #[test]
    fn test_matchers_chain_in_plan_order() {
        let module = module_for(
            "r [ (a, empty) (b, empty) | (e1, a, b, empty) ] => [ | ]",
        );
        // Plan: n0, s0 (edge from source), i1 (node from edge).
        let n0 = module.procedure("match_n0").unwrap();
        assert!(n0.body.as_str().contains("if(match_e0(morphism)) return true;"));
        let e0 = module.procedure("match_e0").unwrap();
        assert!(e0
            .body
            .as_str()
            .contains("if(match_n1(morphism, host_edge)) return true;"));
        let n1 = module.procedure("match_n1").unwrap();
        assert_eq!(n1.params, "Morphism *morphism, Edge *host_edge");
        assert!(n1.body.as_str().contains("/* All items matched! */"));
    }

    #[test]
    fn test_injectivity_and_backtracking() {
        let module = module_for("r [ (a, empty) (b, empty) | (e1, a, b, empty) ] => [ | ]");
        let n0 = module.procedure("match_n0").unwrap();
        let body = n0.body.as_str();
        assert!(body.contains("if(host_node->matched) continue;"));
        assert!(body.contains("removeNodeMap(morphism, 0);"));
        assert!(body.contains("host_node->matched = false;"));
        assert!(body.contains("else removeAssignments(morphism, new_assignments);"));
    }

    #[test]
    fn test_loop_matcher_requires_loop_edges() {
        let module = module_for("r [ (a, empty) | (e1, a, a, empty) ] => [ | ]");
        let matcher = module.procedure("match_e0").unwrap();
        let body = matcher.body.as_str();
        assert!(body.contains("/* Matching a loop. */"));
        assert!(body.contains("if(host_edge->source != host_edge->target) continue;"));
    }

    #[test]
    fn test_bidirectional_edge_emits_both_directions() {
        let module = module_for("r [ (a, empty) (b, empty) | (e1 (B), a, b, empty) ] => [ | ]");
        let matcher = module.procedure("match_e0").unwrap();
        let body = matcher.body.as_str();
        assert!(body.contains("getNthOutEdge(host, host_node, counter)"));
        assert!(body.contains("getNthInEdge(host, host_node, counter)"));
        // The second half has no duplicate prologue.
        assert_eq!(body.matches("int start_index").count(), 1);
        assert_eq!(body.matches("return false;").count(), 2);
    }

    #[test]
    fn test_bidirectional_node_checks_both_endpoints() {
        let module = module_for("r [ (a, empty) (b, empty) | (e1 (B), a, b, empty) ] => [ | ]");
        let matcher = module.procedure("match_n1").unwrap();
        let body = matcher.body.as_str();
        assert!(body.contains("bool candidate_node = true;"));
        assert!(body.contains("if(!candidate_node)"));
        assert!(body.contains("host_node = getSource(host, host_edge);"));
    }

    #[test]
    fn test_edge_bound_variable_triggers_predicates() {
        let module = module_for(
            "r (x : int) [ (a, empty) (b, empty) | (e1, a, b, x) ] => \
             [ (a, empty) (b, empty) | (e1, a, b, x) ] interface = {a, b} where x > 0",
        );
        let matcher = module.procedure("match_e0").unwrap();
        let body = matcher.body.as_str();
        assert!(body.contains("evaluatePredicate0(morphism);"));
        assert!(body.contains("if(evaluateCondition()) next_match_result ="));
        assert!(body.contains("b0 = true;"));
        assert!(body.contains("removeEdgeMap(morphism, 0);"));
    }

    #[test]
    fn test_predicate_evaluation_after_bind() {
        let module = module_for(
            "r (x : int) [ (a, x) (b, empty) | ] => [ (a, x) (b, empty) | ] \
             interface = {a, b} where edge(a, b)",
        );
        // Node a participates in the edge predicate.
        let n0 = module.procedure("match_n0").unwrap();
        let body = n0.body.as_str();
        assert!(body.contains("evaluatePredicate0(morphism);"));
        assert!(body.contains("if(evaluateCondition()) next_match_result ="));
        assert!(body.contains("b0 = true;"));
    }
}
