//! # Application Code Generation
//!
//! Emits the `apply<RuleName>` procedure that realises a successful
//! match. Mutations follow a fixed order: delete LHS-only edges,
//! relabel/re-mark/re-root preserved items, delete LHS-only nodes, add
//! RHS-only nodes, add RHS-only edges, then reset the morphism. Edges
//! go before nodes on the delete side so no deletion can leave a
//! dangling edge, and nodes go before edges on the add side because an
//! added edge may be incident to an added node.
//!
//! When change recording is requested, a before-image is pushed to the
//! journal ahead of each mutation, sufficient to rebuild the pre-apply
//! host graph by replaying in reverse (index holes included).
//!
//! Rules with an empty RHS get the specialised remove-LHS procedure;
//! rules with an empty LHS get an `apply` that takes no morphism and
//! can be called any number of times.

use super::label::{emit_variable_retrieval, generate_label_evaluation, DegreeContext};
use super::{CodeBuf, RuleModule, INDENT};
use crate::config::Config;
use crate::rule::Rule;

/// Tracks which C locals have been declared so far in the generated
/// apply body; each is declared at its first use.
#[derive(Default)]
struct DeclaredLocals {
    label: bool,
    host_node_index: bool,
    host_edge_index: bool,
    source_target: bool,
}

impl DeclaredLocals {
    fn node_index(&mut self, index: usize, buf: &mut CodeBuf) {
        if self.host_node_index {
            buf.line(
                INDENT,
                &format!("host_node_index = lookupNode(morphism, {index});"),
            );
        } else {
            buf.line(
                INDENT,
                &format!("int host_node_index = lookupNode(morphism, {index});"),
            );
            self.host_node_index = true;
        }
    }

    fn edge_index(&mut self, index: usize, buf: &mut CodeBuf) {
        if self.host_edge_index {
            buf.line(
                INDENT,
                &format!("host_edge_index = lookupEdge(morphism, {index});"),
            );
        } else {
            buf.line(
                INDENT,
                &format!("int host_edge_index = lookupEdge(morphism, {index});"),
            );
            self.host_edge_index = true;
        }
    }

    fn label(&mut self, buf: &mut CodeBuf) {
        if !self.label {
            buf.line(INDENT, "HostLabel label;");
            self.label = true;
        }
    }
}

/// Standard application procedure for a rule with both sides.
pub fn generate_application_code(rule: &Rule, config: &Config, module: &mut RuleModule) {
    let name = &rule.name;
    let lhs = rule.lhs.as_ref().expect("standard rules have an LHS");
    let rhs = rule.rhs.as_ref().expect("standard rules have an RHS");
    module.header_decls.push(format!(
        "void apply{name}(Morphism *morphism, bool record_changes);"
    ));

    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    let highlights = config.codegen.highlights;
    if highlights {
        buf.line(i1, "added_node_count = 0;");
        buf.line(i1, "added_edge_count = 0;");
        buf.blank();
    }

    // Values assigned during matching, fetched before any mutation.
    if rule.variables.iter().any(|v| v.used_by_rule) {
        buf.line(i1, "/* Get the values of variables used in rule application. */");
        for variable in &rule.variables {
            if variable.used_by_rule {
                emit_variable_retrieval(&mut buf, i1, &variable.name, variable.var_type);
            }
        }
    }

    // Degrees read by RHS labels, also fetched up front.
    let mut node_index_declared = false;
    for node in &lhs.nodes {
        if node.indegree_arg || node.outdegree_arg {
            if node_index_declared {
                buf.line(
                    i1,
                    &format!("node_index = lookupNode(morphism, {});", node.index),
                );
            } else {
                buf.line(
                    i1,
                    &format!("int node_index = lookupNode(morphism, {});", node.index),
                );
                node_index_declared = true;
            }
            if node.indegree_arg {
                buf.line(
                    i1,
                    &format!(
                        "int indegree{} = getIndegree(host, node_index);",
                        node.index
                    ),
                );
            }
            if node.outdegree_arg {
                buf.line(
                    i1,
                    &format!(
                        "int outdegree{} = getOutdegree(host, node_index);",
                        node.index
                    ),
                );
            }
        }
    }

    let mut locals = DeclaredLocals::default();
    let mut list_count = 0;

    // (1) Delete LHS-only edges.
    for edge in &lhs.edges {
        if edge.interface.is_some() {
            continue;
        }
        locals.edge_index(edge.index, &mut buf);
        buf.line(i1, "if(record_changes)");
        buf.line(i1, "{");
        buf.line(i2, "Edge *edge = getEdge(host, host_edge_index);");
        buf.line(
            i2,
            "/* A hole is created if the edge is not at the right-most index of the array. */",
        );
        buf.line(
            i2,
            "pushRemovedEdge(edge->label, edge->source, edge->target, edge->index,",
        );
        buf.line(i2, "                edge->index < host->edges.size - 1);");
        buf.line(i1, "}");
        buf.line(i1, "removeEdge(host, host_edge_index);");
        buf.blank();
    }

    // (2) Relabel/re-mark preserved edges, then relabel/re-mark/re-root
    // preserved nodes. Before-images recorded here belong unambiguously
    // to surviving host items.
    for edge in &lhs.edges {
        let Some(rhs_index) = edge.interface else {
            continue;
        };
        let rhs_edge = rhs.edge(rhs_index);
        if !(rhs_edge.relabelled || rhs_edge.remarked) {
            continue;
        }
        locals.edge_index(edge.index, &mut buf);
        buf.line(
            i1,
            &format!(
                "HostLabel label_e{} = getEdgeLabel(host, host_edge_index);",
                edge.index
            ),
        );
        if rhs_edge.relabelled {
            locals.label(&mut buf);
            if rhs_edge.label.is_blank() {
                buf.line(i1, "label = blank_label;");
            } else {
                generate_label_evaluation(
                    &rhs_edge.label,
                    "label",
                    list_count,
                    DegreeContext::Apply,
                    i1,
                    &mut buf,
                );
                list_count += 1;
            }
            buf.line(
                i1,
                "/* Relabel the edge if its label is not equal to the RHS label. */",
            );
            buf.line(
                i1,
                &format!("if(equalHostLabels(label_e{}, label)) removeHostList(label.list);", edge.index),
            );
            buf.line(i1, "else");
            buf.line(i1, "{");
            buf.line(
                i2,
                &format!(
                    "if(record_changes) pushRelabelledEdge(host_edge_index, label_e{});",
                    edge.index
                ),
            );
            buf.line(i2, "relabelEdge(host, host_edge_index, label);");
            buf.line(i1, "}");
        } else {
            buf.line(
                i1,
                &format!(
                    "if(record_changes) pushRemarkedEdge(host_edge_index, label_e{}.mark);",
                    edge.index
                ),
            );
            buf.line(
                i1,
                &format!(
                    "changeEdgeMark(host, host_edge_index, {});",
                    rhs_edge.label.mark.code()
                ),
            );
            buf.blank();
        }
    }
    for node in &lhs.nodes {
        let Some(rhs_index) = node.interface else {
            continue;
        };
        let rhs_node = rhs.node(rhs_index);
        if rhs_node.relabelled || rhs_node.remarked {
            locals.node_index(node.index, &mut buf);
            buf.line(
                i1,
                &format!(
                    "HostLabel label_n{} = getNodeLabel(host, host_node_index);",
                    node.index
                ),
            );
            if rhs_node.relabelled {
                locals.label(&mut buf);
                if rhs_node.label.is_blank() {
                    buf.line(i1, "label = blank_label;");
                } else {
                    generate_label_evaluation(
                        &rhs_node.label,
                        "label",
                        list_count,
                        DegreeContext::Apply,
                        i1,
                        &mut buf,
                    );
                    list_count += 1;
                }
                buf.line(
                    i1,
                    "/* Relabel the node if its label is not equal to the RHS label. */",
                );
                buf.line(
                    i1,
                    &format!(
                        "if(equalHostLabels(label_n{}, label)) removeHostList(label.list);",
                        node.index
                    ),
                );
                buf.line(i1, "else");
                buf.line(i1, "{");
                buf.line(
                    i2,
                    &format!(
                        "if(record_changes) pushRelabelledNode(host_node_index, label_n{});",
                        node.index
                    ),
                );
                buf.line(i2, "relabelNode(host, host_node_index, label);");
                buf.line(i1, "}");
            } else {
                buf.line(
                    i1,
                    &format!(
                        "if(record_changes) pushRemarkedNode(host_node_index, label_n{}.mark);",
                        node.index
                    ),
                );
                buf.line(
                    i1,
                    &format!(
                        "changeNodeMark(host, host_node_index, {});",
                        rhs_node.label.mark.code()
                    ),
                );
                buf.blank();
            }
        }
        if rhs_node.root_changed {
            locals.node_index(node.index, &mut buf);
            // Unrooting is unconditional; rooting only applies if the
            // host node is not already a root.
            if node.root && !rhs_node.root {
                buf.line(i1, "if(record_changes) pushChangedRootNode(host_node_index);");
                buf.line(i1, "changeRoot(host, host_node_index);");
            }
            if !node.root && rhs_node.root {
                buf.line(
                    i1,
                    &format!("Node *node{} = getNode(host, host_node_index);", node.index),
                );
                buf.line(i1, &format!("if(!node{}->root)", node.index));
                buf.line(i1, "{");
                buf.line(i2, "if(record_changes) pushChangedRootNode(host_node_index);");
                buf.line(i2, "changeRoot(host, host_node_index);");
                buf.line(i1, "}");
            }
        }
    }

    // (3) Delete LHS-only nodes. The dangling degree check in matching
    // guarantees these have no incident edges left.
    for node in &lhs.nodes {
        if node.interface.is_some() {
            continue;
        }
        locals.node_index(node.index, &mut buf);
        buf.line(i1, "if(record_changes)");
        buf.line(i1, "{");
        buf.line(i2, "Node *node = getNode(host, host_node_index);");
        buf.line(
            i2,
            "/* A hole is created if the node is not at the right-most index of the array. */",
        );
        buf.line(i2, "pushRemovedNode(node->root, node->label, node->index,");
        buf.line(i2, "                node->index < host->nodes.size - 1);");
        buf.line(i1, "}");
        buf.line(i1, "removeNode(host, host_node_index);");
        buf.blank();
    }

    // (4) Add RHS-only nodes, remembering their host indices when added
    // edges will need them.
    if rule.adds_nodes && rule.adds_edges {
        buf.line(i1, "/* Array of host node indices indexed by RHS node index. */");
        buf.line(i1, &format!("int rhs_node_map[{}];", rhs.nodes.len()));
        buf.blank();
    }
    let mut added_nodes = false;
    for node in &rhs.nodes {
        if node.interface.is_some() {
            continue;
        }
        if !locals.host_node_index {
            buf.line(i1, "int host_node_index;");
            locals.host_node_index = true;
        }
        added_nodes = true;
        buf.line(
            i1,
            &format!("int node_array_size{} = host->nodes.size;", node.index),
        );
        let root = i32::from(node.root);
        if node.label.is_blank() {
            buf.line(
                i1,
                &format!("host_node_index = addNode(host, {root}, blank_label);"),
            );
        } else {
            locals.label(&mut buf);
            generate_label_evaluation(
                &node.label,
                "label",
                list_count,
                DegreeContext::Apply,
                i1,
                &mut buf,
            );
            list_count += 1;
            buf.line(i1, &format!("host_node_index = addNode(host, {root}, label);"));
        }
        if highlights {
            buf.line(
                i1,
                "node_highlights[added_node_count].host_index = host_node_index;",
            );
            buf.line(
                i1,
                "node_highlights[added_node_count].highlight = \"__new_node\";",
            );
            buf.line(i1, "added_node_count++;");
        }
        if rule.adds_edges {
            buf.line(
                i1,
                &format!("rhs_node_map[{}] = host_node_index;", node.index),
            );
        }
        buf.line(i1, "/* If the node array size has not increased after the node addition, then");
        buf.line(i1, "   the node was added to a hole in the array. */");
        buf.line(i1, "if(record_changes)");
        buf.line(
            i2,
            &format!(
                "pushAddedNode(host_node_index, node_array_size{} == host->nodes.size);",
                node.index
            ),
        );
    }
    if added_nodes {
        buf.blank();
    }

    // (5) Add RHS-only edges. Endpoints are either preserved nodes
    // (through the morphism) or nodes added above (through the map).
    for edge in &rhs.edges {
        if edge.interface.is_some() {
            continue;
        }
        if !locals.host_edge_index {
            buf.line(i1, "int host_edge_index;");
            locals.host_edge_index = true;
        }
        if !locals.source_target {
            buf.line(i1, "int source, target;");
            locals.source_target = true;
        }
        buf.line(
            i1,
            &format!("int edge_array_size{} = host->edges.size;", edge.index),
        );
        let source_node = rhs.node(edge.source);
        match source_node.interface {
            Some(lhs_index) => buf.line(
                i1,
                &format!("source = lookupNode(morphism, {lhs_index});"),
            ),
            None => buf.line(i1, &format!("source = rhs_node_map[{}];", edge.source)),
        }
        let target_node = rhs.node(edge.target);
        match target_node.interface {
            Some(lhs_index) => buf.line(
                i1,
                &format!("target = lookupNode(morphism, {lhs_index});"),
            ),
            None => buf.line(i1, &format!("target = rhs_node_map[{}];", edge.target)),
        }
        if edge.label.is_blank() {
            buf.line(
                i1,
                "host_edge_index = addEdge(host, blank_label, source, target);",
            );
        } else {
            locals.label(&mut buf);
            generate_label_evaluation(
                &edge.label,
                "label",
                list_count,
                DegreeContext::Apply,
                i1,
                &mut buf,
            );
            list_count += 1;
            buf.line(
                i1,
                "host_edge_index = addEdge(host, label, source, target);",
            );
        }
        if highlights {
            buf.line(
                i1,
                "edge_highlights[added_edge_count].host_index = host_edge_index;",
            );
            buf.line(
                i1,
                "edge_highlights[added_edge_count].highlight = \"__new_edge\";",
            );
            buf.line(i1, "added_edge_count++;");
        }
        buf.line(i1, "/* If the edge array size has not increased after the edge addition, then");
        buf.line(i1, "   the edge was added to a hole in the array. */");
        buf.line(i1, "if(record_changes)");
        buf.line(
            i2,
            &format!(
                "pushAddedEdge(host_edge_index, edge_array_size{} == host->edges.size);",
                edge.index
            ),
        );
    }

    buf.line(i1, "/* Reset the morphism. */");
    buf.line(i1, "initialiseMorphism(morphism, host);");
    module.add_procedure(
        format!("apply{name}"),
        false,
        "void",
        "Morphism *morphism, bool record_changes",
        buf,
    );
}

/// Specialised application for a rule whose RHS is empty: every matched
/// item is deleted, straight off the morphism's maps.
pub fn generate_remove_lhs_code(rule: &Rule, module: &mut RuleModule) {
    let name = &rule.name;
    module.header_decls.push(format!(
        "void apply{name}(Morphism *morphism, bool record_changes);"
    ));
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    let i3 = 3 * INDENT;
    buf.line(i1, "int count;");
    buf.line(i1, "for(count = 0; count < morphism->edges; count++)");
    buf.line(i1, "{");
    buf.line(i2, "if(record_changes)");
    buf.line(i2, "{");
    buf.line(
        i3,
        "Edge *edge = getEdge(host, morphism->edge_map[count].host_index);",
    );
    buf.line(
        i3,
        "/* A hole is created if the edge is not at the right-most index of the array. */",
    );
    buf.line(
        i3,
        "pushRemovedEdge(edge->label, edge->source, edge->target, edge->index,",
    );
    buf.line(i3, "                edge->index < host->edges.size - 1);");
    buf.line(i2, "}");
    buf.line(i2, "removeEdge(host, morphism->edge_map[count].host_index);");
    buf.line(i1, "}");
    buf.blank();
    buf.line(i1, "for(count = 0; count < morphism->nodes; count++)");
    buf.line(i1, "{");
    buf.line(i2, "if(record_changes)");
    buf.line(i2, "{");
    buf.line(
        i3,
        "Node *node = getNode(host, morphism->node_map[count].host_index);",
    );
    buf.line(
        i3,
        "/* A hole is created if the node is not at the right-most index of the array. */",
    );
    buf.line(i3, "pushRemovedNode(node->root, node->label, node->index,");
    buf.line(i3, "                node->index < host->nodes.size - 1);");
    buf.line(i2, "}");
    buf.line(i2, "removeNode(host, morphism->node_map[count].host_index);");
    buf.line(i1, "}");
    buf.line(i1, "initialiseMorphism(morphism, NULL);");
    module.add_procedure(
        format!("apply{name}"),
        false,
        "void",
        "Morphism *morphism, bool record_changes",
        buf,
    );
}

/// Application for a rule with an empty LHS: no morphism is consumed,
/// and each call adds a fresh copy of the RHS.
pub fn generate_add_rhs_code(rule: &Rule, module: &mut RuleModule) {
    let name = &rule.name;
    let rhs = rule.rhs.as_ref().expect("pure-add rules have an RHS");
    module
        .header_decls
        .push(format!("void apply{name}(bool record_changes);"));

    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let i2 = 2 * INDENT;
    buf.line(i1, "int index;");
    buf.line(i1, "HostLabel label;");
    buf.blank();
    if rule.variables.iter().any(|v| v.used_by_rule) {
        buf.line(i1, "/* Get the values of variables used in rule application. */");
        for variable in &rule.variables {
            if variable.used_by_rule {
                emit_variable_retrieval(&mut buf, i1, &variable.name, variable.var_type);
            }
        }
        buf.blank();
    }
    if rule.adds_edges {
        buf.line(i1, "/* Array of host node indices indexed by RHS node index. */");
        buf.line(i1, &format!("int map[{}];", rhs.nodes.len()));
        buf.blank();
    }
    let mut list_count = 0;
    let mut blank_label_set = false;
    for node in &rhs.nodes {
        if node.label.is_blank() {
            if !blank_label_set {
                buf.line(i1, "label = blank_label;");
                blank_label_set = true;
            }
        } else {
            generate_label_evaluation(
                &node.label,
                "label",
                list_count,
                DegreeContext::Apply,
                i1,
                &mut buf,
            );
            list_count += 1;
            blank_label_set = false;
        }
        buf.line(
            i1,
            &format!("int node_array_size{} = host->nodes.size;", node.index),
        );
        buf.line(
            i1,
            &format!("index = addNode(host, {}, label);", i32::from(node.root)),
        );
        if rule.adds_edges {
            buf.line(i1, &format!("map[{}] = index;", node.index));
        }
        buf.line(i1, "/* If the node array size has not increased after the node addition, then");
        buf.line(i1, "   the node was added to a hole in the array. */");
        buf.line(i1, "if(record_changes)");
        buf.line(
            i2,
            &format!(
                "pushAddedNode(index, node_array_size{} == host->nodes.size);",
                node.index
            ),
        );
    }
    buf.blank();
    for edge in &rhs.edges {
        if edge.label.is_blank() {
            if !blank_label_set {
                buf.line(i1, "label = blank_label;");
                blank_label_set = true;
            }
        } else {
            generate_label_evaluation(
                &edge.label,
                "label",
                list_count,
                DegreeContext::Apply,
                i1,
                &mut buf,
            );
            list_count += 1;
            blank_label_set = false;
        }
        buf.line(
            i1,
            &format!("int edge_array_size{} = host->edges.size;", edge.index),
        );
        buf.line(
            i1,
            &format!(
                "index = addEdge(host, label, map[{}], map[{}]);",
                edge.source, edge.target
            ),
        );
        buf.line(i1, "/* If the edge array size has not increased after the edge addition, then");
        buf.line(i1, "   the edge was added to a hole in the array. */");
        buf.line(i1, "if(record_changes)");
        buf.line(
            i2,
            &format!(
                "pushAddedEdge(index, edge_array_size{} == host->edges.size);",
                edge.index
            ),
        );
    }
    module.add_procedure(
        format!("apply{name}"),
        false,
        "void",
        "bool record_changes",
        buf,
    );
}

/// True when the rule's apply procedure consumes no morphism.
pub fn takes_no_morphism(rule: &Rule) -> bool {
    rule.lhs.is_none() && rule.rhs.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::RuleModule;
    use crate::config::Config;
    use crate::parser::parse_rule;
    use crate::transform::transform_rule;

    fn module_for(source: &str) -> RuleModule {
        let rule = transform_rule(&parse_rule(source).unwrap()).unwrap();
        let config = Config::default();
        let mut module = RuleModule::new(&rule.name);
        if rule.lhs.is_some() {
            if rule.rhs.is_none() {
                generate_remove_lhs_code(&rule, &mut module);
            } else {
                generate_application_code(&rule, &config, &mut module);
            }
        } else {
            generate_add_rhs_code(&rule, &mut module);
        }
        module
    }

    fn apply_body(module: &RuleModule, name: &str) -> String {
        module
            .procedure(&format!("apply{name}"))
            .unwrap()
            .body
            .as_str()
            .to_string()
    }

    #[test]
    fn test_mutation_order() {
        // Deletes an edge and a node, relabels a preserved node, adds a
        // node and an edge.
        let source = "r (x : int) \
                      [ (a, x) (b, empty) | (e1, a, b, empty) ] => \
                      [ (a, x + 1) (c, empty) | (e2, a, c, empty) ] \
                      interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        let delete_edge = body.find("removeEdge(host, host_edge_index);").unwrap();
        let relabel = body.find("relabelNode(host, host_node_index, label);").unwrap();
        let delete_node = body.find("removeNode(host, host_node_index);").unwrap();
        let add_node = body
            .find("host_node_index = addNode(host, 0, blank_label);")
            .unwrap();
        let add_edge = body
            .find("host_edge_index = addEdge(host, blank_label, source, target);")
            .unwrap();
        let reset = body.find("initialiseMorphism(morphism, host);").unwrap();
        assert!(delete_edge < relabel);
        assert!(relabel < delete_node);
        assert!(delete_node < add_node);
        assert!(add_node < add_edge);
        assert!(add_edge < reset);
    }

    #[test]
    fn test_journal_pushes_precede_mutations() {
        let source = "r [ (a, empty) (b, empty) | (e1, a, b, 1) ] => [ (a, empty) | ] \
                      interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        let push_edge = body.find("pushRemovedEdge(").unwrap();
        let remove_edge = body.find("removeEdge(host, host_edge_index);").unwrap();
        assert!(push_edge < remove_edge);
        let push_node = body.find("pushRemovedNode(").unwrap();
        let remove_node = body.find("removeNode(host, host_node_index);").unwrap();
        assert!(push_node < remove_node);
        assert!(body.contains("edge->index < host->edges.size - 1"));
        assert!(body.contains("node->index < host->nodes.size - 1"));
    }

    #[test]
    fn test_no_op_relabel_releases_list() {
        let source = "r (x : int) [ (a, x) | ] => [ (a, x + 1) | ] interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        assert!(body.contains("if(equalHostLabels(label_n0, label)) removeHostList(label.list);"));
        let push = body.find("pushRelabelledNode(host_node_index, label_n0);").unwrap();
        let relabel = body.find("relabelNode(host, host_node_index, label);").unwrap();
        assert!(push < relabel);
    }

    #[test]
    fn test_remark_without_relabel() {
        let source = "r [ (a, 1 # red) | ] => [ (a, 1 # blue) | ] interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        assert!(body.contains("pushRemarkedNode(host_node_index, label_n0.mark);"));
        assert!(body.contains("changeNodeMark(host, host_node_index, 3);"));
        assert!(!body.contains("relabelNode"));
    }

    #[test]
    fn test_root_change_cases() {
        let source = "r [ (a (R), empty) (b, empty) | ] => [ (a, empty) (b (R), empty) | ] \
                      interface = {a, b}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        // Unrooting a is unconditional; rooting b checks the host flag.
        let unroot = body.matches("changeRoot(host, host_node_index);").count();
        assert_eq!(unroot, 2);
        assert!(body.contains("if(!node1->root)"));
        assert!(body.contains("pushChangedRootNode(host_node_index);"));
    }

    #[test]
    fn test_added_edge_endpoints() {
        let source = "r [ (a, empty) | ] => [ (a, empty) (c, empty) | (e1, a, c, empty) ] \
                      interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        assert!(body.contains("int rhs_node_map[2];"));
        assert!(body.contains("rhs_node_map[1] = host_node_index;"));
        assert!(body.contains("source = lookupNode(morphism, 0);"));
        assert!(body.contains("target = rhs_node_map[1];"));
    }

    #[test]
    fn test_degree_arguments_fetched_before_mutations() {
        let source = "r [ (a, empty) (b, empty) | (e1, a, b, empty) ] => [ (a, outdeg(a)) | ] \
                      interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        let fetch = body.find("int outdegree0 = getOutdegree(host, node_index);").unwrap();
        let delete = body.find("removeEdge(host, host_edge_index);").unwrap();
        assert!(fetch < delete);
        assert!(body.contains("array0[index0++].num = outdegree0;"));
    }

    #[test]
    fn test_remove_lhs_shortcut() {
        let source = "clear [ (a, empty) (b, empty) | (e1, a, b, empty) ] => [ | ]";
        let module = module_for(source);
        let body = apply_body(&module, "clear");
        assert!(body.contains("for(count = 0; count < morphism->edges; count++)"));
        assert!(body.contains("for(count = 0; count < morphism->nodes; count++)"));
        let edges_loop = body.find("morphism->edges").unwrap();
        let nodes_loop = body.find("morphism->nodes").unwrap();
        assert!(edges_loop < nodes_loop);
        assert!(body.contains("initialiseMorphism(morphism, NULL);"));
    }

    #[test]
    fn test_add_rhs_takes_no_morphism() {
        let source = "build (x : int) [ | ] => [ (a, 1) (b, 2) | (e1, a, b, 3) ]";
        let rule = transform_rule(&parse_rule(source).unwrap()).unwrap();
        assert!(takes_no_morphism(&rule));
        let module = module_for(source);
        let procedure = module.procedure("applybuild").unwrap();
        assert_eq!(procedure.params, "bool record_changes");
        let body = procedure.body.as_str();
        assert!(body.contains("index = addEdge(host, label, map[0], map[1]);"));
        assert!(body.contains("pushAddedNode(index, node_array_size0 == host->nodes.size);"));
    }

    #[test]
    fn test_blank_label_shortcut_reused_only_while_valid() {
        let source = "build [ | ] => [ (a, empty) (b, empty) (c, 1) (d, empty) | ]";
        let module = module_for(source);
        let body = apply_body(&module, "build");
        // Two blank nodes share one assignment, the third re-assigns
        // after the non-blank label overwrote the local.
        assert_eq!(body.matches("label = blank_label;").count(), 2);
    }

    #[test]
    fn test_preserved_unchanged_items_emit_nothing() {
        let source = "r [ (a, 1) | (e1, a, a, 2) ] => [ (a, 1) | (e1, a, a, 2) ] \
                      interface = {a}";
        let module = module_for(source);
        let body = apply_body(&module, "r");
        assert!(!body.contains("relabel"));
        assert!(!body.contains("removeEdge"));
        assert!(!body.contains("addNode"));
        assert!(body.contains("initialiseMorphism(morphism, host);"));
    }
}
